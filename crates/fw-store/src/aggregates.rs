// Aggregation primitives consumed by the Profile Builder (§4.A). These
// never construct `AgentRun`/`AgentDecision` values — they return bare
// counts and durations, which is all a profile needs.

use crate::error::StoreError;
use crate::runs::RunFilter;
use crate::Store;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

/// Run counts by status for `GET /v1/stats`, scoped by the same filters
/// as `Store::list_runs` (ignoring pagination).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunStats {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub partial: u64,
}

impl Store {
    pub fn run_stats(&self, filter: &RunFilter) -> Result<RunStats, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut sql = String::from("SELECT status, COUNT(*) FROM agent_runs WHERE 1=1");
        if filter.agent_id.is_some() {
            sql.push_str(" AND agent_id = :agent_id");
        }
        if filter.agent_version.is_some() {
            sql.push_str(" AND agent_version = :agent_version");
        }
        if filter.environment.is_some() {
            sql.push_str(" AND environment = :environment");
        }
        if filter.start_time.is_some() {
            sql.push_str(" AND started_at >= :start_time");
        }
        if filter.end_time.is_some() {
            sql.push_str(" AND started_at < :end_time");
        }
        sql.push_str(" GROUP BY status");

        let agent_id = filter.agent_id.clone();
        let agent_version = filter.agent_version.clone();
        let environment = filter.environment.clone();
        let start_time = filter.start_time.map(|t| t.to_rfc3339());
        let end_time = filter.end_time.map(|t| t.to_rfc3339());

        let mut stmt = conn.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = Vec::new();
        if let Some(v) = &agent_id {
            named.push((":agent_id", v));
        }
        if let Some(v) = &agent_version {
            named.push((":agent_version", v));
        }
        if let Some(v) = &environment {
            named.push((":environment", v));
        }
        if let Some(v) = &start_time {
            named.push((":start_time", v));
        }
        if let Some(v) = &end_time {
            named.push((":end_time", v));
        }

        let rows = stmt
            .query_map(named.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = RunStats::default();
        for (status, count) in rows {
            stats.total += count;
            match status.as_str() {
                "success" => stats.success = count,
                "failure" => stats.failure = count,
                _ => stats.partial = count,
            }
        }
        Ok(stats)
    }

    /// Number of runs with `started_at` in `[window_start, window_end)` for
    /// the given `(agent_id, agent_version, environment)` key.
    pub fn count_runs_in_window(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM agent_runs
             WHERE agent_id = ?1 AND agent_version = ?2 AND environment = ?3
               AND started_at >= ?4 AND started_at < ?5",
            params![
                agent_id,
                agent_version,
                environment,
                window_start.to_rfc3339(),
                window_end.to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// `(decision_type, selected) → count` over the window.
    pub fn decision_counts(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BTreeMap<(String, String), u64>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT d.decision_type, d.selected, COUNT(*)
             FROM agent_decisions d
             JOIN agent_runs r ON r.run_id = d.run_id
             WHERE r.agent_id = ?1 AND r.agent_version = ?2 AND r.environment = ?3
               AND r.started_at >= ?4 AND r.started_at < ?5
             GROUP BY d.decision_type, d.selected",
        )?;
        let rows = stmt.query_map(
            params![
                agent_id,
                agent_version,
                environment,
                window_start.to_rfc3339(),
                window_end.to_rfc3339(),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (decision_type, selected, count) = row?;
            counts.insert((decision_type, selected), count as u64);
        }
        Ok(counts)
    }

    /// `(signal_type, signal_code) → count` over the window.
    pub fn signal_counts(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BTreeMap<(String, String), u64>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT s.signal_type, s.signal_code, COUNT(*)
             FROM agent_quality_signals s
             JOIN agent_runs r ON r.run_id = s.run_id
             WHERE r.agent_id = ?1 AND r.agent_version = ?2 AND r.environment = ?3
               AND r.started_at >= ?4 AND r.started_at < ?5
             GROUP BY s.signal_type, s.signal_code",
        )?;
        let rows = stmt.query_map(
            params![
                agent_id,
                agent_version,
                environment,
                window_start.to_rfc3339(),
                window_end.to_rfc3339(),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (signal_type, signal_code, count) = row?;
            counts.insert((signal_type, signal_code), count as u64);
        }
        Ok(counts)
    }

    /// Run durations in milliseconds for completed runs (both timestamps
    /// present) in the window, ascending order.
    pub fn run_durations_ms(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT started_at, ended_at FROM agent_runs
             WHERE agent_id = ?1 AND agent_version = ?2 AND environment = ?3
               AND started_at >= ?4 AND started_at < ?5 AND ended_at IS NOT NULL",
        )?;
        let rows = stmt.query_map(
            params![
                agent_id,
                agent_version,
                environment,
                window_start.to_rfc3339(),
                window_end.to_rfc3339(),
            ],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut durations = Vec::new();
        for row in rows {
            let (started_at, ended_at) = row?;
            let started = DateTime::parse_from_rfc3339(&started_at)
                .expect("stored timestamp is valid rfc3339");
            let ended = DateTime::parse_from_rfc3339(&ended_at)
                .expect("stored timestamp is valid rfc3339");
            durations.push((ended - started).num_milliseconds());
        }
        durations.sort_unstable();
        Ok(durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_model::{AgentRun, RunId, RunStatus};

    fn run_with_status(status: RunStatus) -> AgentRun {
        let now = Utc::now();
        AgentRun {
            run_id: RunId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            status,
            started_at: now,
            ended_at: Some(now),
            created_at: now,
            steps: vec![],
            failure: status.eq(&RunStatus::Failure).then(|| fw_model::AgentFailure {
                failure_id: fw_model::FailureId::new(),
                step_id: None,
                failure_type: fw_model::FailureType::Tool,
                failure_code: "timeout".to_string(),
                message: "request timed out".to_string(),
            }),
            decisions: vec![],
            quality_signals: vec![],
        }
    }

    #[test]
    fn run_stats_counts_by_status() {
        let store = Store::open_in_memory().unwrap();
        store.put_run(&run_with_status(RunStatus::Success)).unwrap();
        store.put_run(&run_with_status(RunStatus::Success)).unwrap();
        store.put_run(&run_with_status(RunStatus::Failure)).unwrap();

        let stats = store.run_stats(&RunFilter::default()).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failure, 1);
    }
}
