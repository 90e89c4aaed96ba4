//! Durable, queryable storage for the event data model (component A) —
//! an embedded SQLite database with foreign-key cascade and a unique
//! conditional index enforcing the one-active-baseline-per-key invariant.
//!
//! The connection is guarded by a mutex because the embedded driver does
//! not support concurrent writers on one connection; individual operations
//! are short, so serializing on it is acceptable (§5).

mod aggregates;
mod baselines;
mod drift;
mod error;
mod profiles;
mod runs;
mod schema;

pub use aggregates::RunStats;
pub use drift::{DriftFilter, DriftSummary};
pub use error::StoreError;
pub use runs::RunFilter;

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fw_model::{AgentRun, RunId, RunStatus};

    fn sample_run() -> AgentRun {
        AgentRun {
            run_id: RunId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            status: RunStatus::Success,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            created_at: Utc::now(),
            steps: vec![],
            failure: None,
            decisions: vec![],
            quality_signals: vec![],
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let run = sample_run();
        store.put_run(&run).unwrap();

        let fetched = store.get_run(run.run_id).unwrap().unwrap();
        assert_eq!(fetched.run_id, run.run_id);
        assert_eq!(fetched.agent_id, run.agent_id);
    }

    #[test]
    fn duplicate_ingest_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let run = sample_run();
        let first = store.put_run(&run).unwrap();
        let second = store.put_run(&run).unwrap();
        assert_eq!(first.run_id, second.run_id);
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn failure_status_without_failure_record_rejected() {
        let store = Store::open_in_memory().unwrap();
        let mut run = sample_run();
        run.status = RunStatus::Failure;
        run.failure = None;
        let err = store.put_run(&run).unwrap_err();
        assert!(matches!(err, StoreError::MissingFailure));
    }

    #[test]
    fn missing_run_returns_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_run(RunId::new()).unwrap().is_none());
    }
}
