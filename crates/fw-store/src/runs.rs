use crate::error::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fw_model::{
    metadata, AgentDecision, AgentFailure, AgentQualitySignal, AgentRun, AgentStep, DecisionType,
    FailureType, Metadata, RunStatus, SignalType, StepType,
};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use std::str::FromStr;
use uuid::Uuid;

/// Optional filters for `Store::list_runs`; all fields are ANDed together.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub agent_id: Option<String>,
    pub agent_version: Option<String>,
    pub environment: Option<String>,
    pub status: Option<RunStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

fn status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "success",
        RunStatus::Failure => "failure",
        RunStatus::Partial => "partial",
    }
}

fn status_from_str(s: &str) -> RunStatus {
    match s {
        "success" => RunStatus::Success,
        "failure" => RunStatus::Failure,
        _ => RunStatus::Partial,
    }
}

fn step_type_str(t: StepType) -> &'static str {
    match t {
        StepType::Plan => "plan",
        StepType::Retrieve => "retrieve",
        StepType::Tool => "tool",
        StepType::Respond => "respond",
        StepType::Other => "other",
    }
}

fn step_type_from_str(s: &str) -> StepType {
    match s {
        "plan" => StepType::Plan,
        "retrieve" => StepType::Retrieve,
        "tool" => StepType::Tool,
        "respond" => StepType::Respond,
        _ => StepType::Other,
    }
}

fn failure_type_str(t: FailureType) -> &'static str {
    match t {
        FailureType::Tool => "tool",
        FailureType::Model => "model",
        FailureType::Retrieval => "retrieval",
        FailureType::Orchestration => "orchestration",
    }
}

fn failure_type_from_str(s: &str) -> FailureType {
    match s {
        "tool" => FailureType::Tool,
        "model" => FailureType::Model,
        "retrieval" => FailureType::Retrieval,
        _ => FailureType::Orchestration,
    }
}

fn metadata_to_json(metadata: &Metadata) -> Result<String, StoreError> {
    Ok(serde_json::to_string(metadata)?)
}

fn metadata_from_json(raw: &str) -> Result<Metadata, StoreError> {
    if raw.is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_json::from_str(raw)?)
}

impl Store {
    /// Idempotent by `run_id`: if the run already exists, it (and its
    /// originally-stored children) is returned unchanged — the replayed
    /// request body's children are never merged in.
    pub fn put_run(&self, run: &AgentRun) -> Result<AgentRun, StoreError> {
        if let Some(existing) = self.get_run(run.run_id)? {
            tracing::info!(run_id = %run.run_id, "duplicate run_id, returning existing run");
            return Ok(existing);
        }

        if !run.has_contiguous_step_sequence() {
            return Err(StoreError::SchemaInvalid);
        }
        if run.status == RunStatus::Failure && run.failure.is_none() {
            return Err(StoreError::MissingFailure);
        }
        for step in &run.steps {
            metadata::validate_metadata(&step.metadata)?;
        }
        for decision in &run.decisions {
            metadata::validate_metadata(&decision.metadata)?;
        }
        for signal in &run.quality_signals {
            metadata::validate_metadata(&signal.metadata)?;
        }
        if let Some(failure) = &run.failure {
            metadata::validate_failure_message(&failure.message)?;
        }
        for decision in &run.decisions {
            if !decision.decision_type.is_valid_reason_code(&decision.reason_code) {
                return Err(StoreError::InvalidReasonCode {
                    decision_type: decision.decision_type.as_str(),
                    reason_code: decision.reason_code.clone(),
                });
            }
            if decision.confidence.is_some_and(|c| !(0.0..=1.0).contains(&c)) {
                return Err(StoreError::SchemaInvalid);
            }
        }
        for signal in &run.quality_signals {
            if !signal.signal_type.is_valid_signal_code(&signal.signal_code) {
                return Err(StoreError::InvalidSignalCode {
                    signal_type: signal.signal_type.as_str(),
                    signal_code: signal.signal_code.clone(),
                });
            }
        }

        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;
        insert_run(&tx, run)?;
        tx.commit()?;

        tracing::info!(
            run_id = %run.run_id,
            agent_id = %run.agent_id,
            steps = run.steps.len(),
            "ingested run"
        );
        Ok(run.clone())
    }

    pub fn get_run(&self, run_id: fw_model::RunId) -> Result<Option<AgentRun>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT run_id, agent_id, agent_version, environment, status, started_at, ended_at, created_at
             FROM agent_runs WHERE run_id = ?1",
        )?;
        let run = stmt
            .query_row(params![run_id.to_string()], row_to_run_shell)
            .optional()?;
        let Some(mut run) = run else {
            return Ok(None);
        };
        run.steps = load_steps(&conn, run_id)?;
        run.failure = load_failure(&conn, run_id)?;
        run.decisions = load_decisions(&conn, run_id)?;
        run.quality_signals = load_signals(&conn, run_id)?;
        Ok(Some(run))
    }

    pub fn list_runs(&self, filter: &RunFilter) -> Result<Vec<AgentRun>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut sql = String::from(
            "SELECT run_id, agent_id, agent_version, environment, status, started_at, ended_at, created_at
             FROM agent_runs WHERE 1=1",
        );
        if filter.agent_id.is_some() {
            sql.push_str(" AND agent_id = :agent_id");
        }
        if filter.agent_version.is_some() {
            sql.push_str(" AND agent_version = :agent_version");
        }
        if filter.environment.is_some() {
            sql.push_str(" AND environment = :environment");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = :status");
        }
        if filter.start_time.is_some() {
            sql.push_str(" AND started_at >= :start_time");
        }
        if filter.end_time.is_some() {
            sql.push_str(" AND started_at < :end_time");
        }
        sql.push_str(" ORDER BY started_at DESC LIMIT :limit OFFSET :offset");

        let mut stmt = conn.prepare(&sql)?;
        let agent_id = filter.agent_id.clone();
        let agent_version = filter.agent_version.clone();
        let environment = filter.environment.clone();
        let status = filter.status.map(status_str);
        let start_time = filter.start_time.map(|t| t.to_rfc3339());
        let end_time = filter.end_time.map(|t| t.to_rfc3339());
        let limit = if filter.limit == 0 { 100 } else { filter.limit };

        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = vec![
            (":limit", &limit),
            (":offset", &filter.offset),
        ];
        if let Some(v) = &agent_id {
            named.push((":agent_id", v));
        }
        if let Some(v) = &agent_version {
            named.push((":agent_version", v));
        }
        if let Some(v) = &environment {
            named.push((":environment", v));
        }
        if let Some(v) = &status {
            named.push((":status", v));
        }
        if let Some(v) = &start_time {
            named.push((":start_time", v));
        }
        if let Some(v) = &end_time {
            named.push((":end_time", v));
        }

        let shells = stmt
            .query_map(named.as_slice(), row_to_run_shell)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut runs = Vec::with_capacity(shells.len());
        for mut run in shells {
            let run_id = run.run_id;
            run.steps = load_steps(&conn, run_id)?;
            run.failure = load_failure(&conn, run_id)?;
            run.decisions = load_decisions(&conn, run_id)?;
            run.quality_signals = load_signals(&conn, run_id)?;
            runs.push(run);
        }
        Ok(runs)
    }
}

fn insert_run(tx: &Transaction, run: &AgentRun) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO agent_runs (run_id, agent_id, agent_version, environment, status, started_at, ended_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            run.run_id.to_string(),
            run.agent_id,
            run.agent_version,
            run.environment,
            status_str(run.status),
            run.started_at.to_rfc3339(),
            run.ended_at.map(|t| t.to_rfc3339()),
            run.created_at.to_rfc3339(),
        ],
    )?;

    for step in &run.steps {
        tx.execute(
            "INSERT INTO agent_steps (step_id, run_id, seq, step_type, name, latency_ms, started_at, ended_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                step.step_id.to_string(),
                run.run_id.to_string(),
                step.seq,
                step_type_str(step.step_type),
                step.name,
                step.latency_ms,
                step.started_at.to_rfc3339(),
                step.ended_at.to_rfc3339(),
                metadata_to_json(&step.metadata)?,
            ],
        )?;
    }

    if let Some(failure) = &run.failure {
        tx.execute(
            "INSERT INTO agent_failures (failure_id, run_id, step_id, failure_type, failure_code, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                failure.failure_id.to_string(),
                run.run_id.to_string(),
                failure.step_id.map(|id| id.to_string()),
                failure_type_str(failure.failure_type),
                failure.failure_code,
                failure.message,
            ],
        )?;
    }

    for decision in &run.decisions {
        tx.execute(
            "INSERT INTO agent_decisions (decision_id, run_id, step_id, decision_type, selected, reason_code, confidence, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                decision.decision_id.to_string(),
                run.run_id.to_string(),
                decision.step_id.map(|id| id.to_string()),
                decision.decision_type.as_str(),
                decision.selected,
                decision.reason_code,
                decision.confidence,
                metadata_to_json(&decision.metadata)?,
            ],
        )?;
    }

    for signal in &run.quality_signals {
        tx.execute(
            "INSERT INTO agent_quality_signals (signal_id, run_id, step_id, signal_type, signal_code, value, weight, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                signal.signal_id.to_string(),
                run.run_id.to_string(),
                signal.step_id.map(|id| id.to_string()),
                signal.signal_type.as_str(),
                signal.signal_code,
                signal.value as i64,
                signal.weight,
                metadata_to_json(&signal.metadata)?,
            ],
        )?;
    }

    Ok(())
}

fn row_to_run_shell(row: &Row) -> rusqlite::Result<AgentRun> {
    let run_id: String = row.get(0)?;
    let started_at: String = row.get(5)?;
    let ended_at: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(AgentRun {
        run_id: fw_model::RunId::from(Uuid::from_str(&run_id).expect("stored run_id is a valid uuid")),
        agent_id: row.get(1)?,
        agent_version: row.get(2)?,
        environment: row.get(3)?,
        status: status_from_str(&row.get::<_, String>(4)?),
        started_at: parse_ts(&started_at),
        ended_at: ended_at.as_deref().map(parse_ts),
        created_at: parse_ts(&created_at),
        steps: Vec::new(),
        failure: None,
        decisions: Vec::new(),
        quality_signals: Vec::new(),
    })
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("stored timestamp is valid rfc3339")
        .with_timezone(&Utc)
}

fn load_steps(
    conn: &rusqlite::Connection,
    run_id: fw_model::RunId,
) -> Result<Vec<AgentStep>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT step_id, seq, step_type, name, latency_ms, started_at, ended_at, metadata
         FROM agent_steps WHERE run_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![run_id.to_string()], |row| {
        let step_id: String = row.get(0)?;
        let step_type: String = row.get(2)?;
        let started_at: String = row.get(5)?;
        let ended_at: String = row.get(6)?;
        let metadata: String = row.get(7)?;
        Ok((step_id, row.get::<_, i64>(1)?, step_type, row.get::<_, String>(3)?, row.get::<_, i64>(4)?, started_at, ended_at, metadata))
    })?;

    let mut steps = Vec::new();
    for row in rows {
        let (step_id, seq, step_type, name, latency_ms, started_at, ended_at, metadata) = row?;
        steps.push(AgentStep {
            step_id: fw_model::StepId::from(Uuid::from_str(&step_id).expect("valid uuid")),
            seq: seq as u32,
            step_type: step_type_from_str(&step_type),
            name,
            latency_ms: latency_ms as u64,
            started_at: parse_ts(&started_at),
            ended_at: parse_ts(&ended_at),
            metadata: metadata_from_json(&metadata)?,
        });
    }
    Ok(steps)
}

fn load_failure(
    conn: &rusqlite::Connection,
    run_id: fw_model::RunId,
) -> Result<Option<AgentFailure>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT failure_id, step_id, failure_type, failure_code, message
         FROM agent_failures WHERE run_id = ?1",
    )?;
    stmt.query_row(params![run_id.to_string()], |row| {
        let failure_id: String = row.get(0)?;
        let step_id: Option<String> = row.get(1)?;
        let failure_type: String = row.get(2)?;
        Ok(AgentFailure {
            failure_id: fw_model::FailureId::from(Uuid::from_str(&failure_id).expect("valid uuid")),
            step_id: step_id.map(|s| fw_model::StepId::from(Uuid::from_str(&s).expect("valid uuid"))),
            failure_type: failure_type_from_str(&failure_type),
            failure_code: row.get(3)?,
            message: row.get(4)?,
        })
    })
    .optional()
    .map_err(StoreError::from)
}

fn load_decisions(
    conn: &rusqlite::Connection,
    run_id: fw_model::RunId,
) -> Result<Vec<AgentDecision>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT decision_id, step_id, decision_type, selected, reason_code, confidence, metadata
         FROM agent_decisions WHERE run_id = ?1",
    )?;
    let rows = stmt.query_map(params![run_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut decisions = Vec::new();
    for row in rows {
        let (decision_id, step_id, decision_type, selected, reason_code, confidence, metadata) =
            row?;
        decisions.push(AgentDecision {
            decision_id: fw_model::DecisionId::from(
                Uuid::from_str(&decision_id).expect("valid uuid"),
            ),
            step_id: step_id.map(|s| fw_model::StepId::from(Uuid::from_str(&s).expect("valid uuid"))),
            decision_type: decision_type_from_str(&decision_type),
            selected,
            reason_code,
            confidence,
            metadata: metadata_from_json(&metadata)?,
        });
    }
    Ok(decisions)
}

fn load_signals(
    conn: &rusqlite::Connection,
    run_id: fw_model::RunId,
) -> Result<Vec<AgentQualitySignal>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT signal_id, step_id, signal_type, signal_code, value, weight, metadata
         FROM agent_quality_signals WHERE run_id = ?1",
    )?;
    let rows = stmt.query_map(params![run_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut signals = Vec::new();
    for row in rows {
        let (signal_id, step_id, signal_type, signal_code, value, weight, metadata) = row?;
        signals.push(AgentQualitySignal {
            signal_id: fw_model::SignalId::from(Uuid::from_str(&signal_id).expect("valid uuid")),
            step_id: step_id.map(|s| fw_model::StepId::from(Uuid::from_str(&s).expect("valid uuid"))),
            signal_type: signal_type_from_str(&signal_type),
            signal_code,
            value: value != 0,
            weight,
            metadata: metadata_from_json(&metadata)?,
        });
    }
    Ok(signals)
}

fn decision_type_from_str(s: &str) -> DecisionType {
    match s {
        "tool_selection" => DecisionType::ToolSelection,
        "retrieval_strategy" => DecisionType::RetrievalStrategy,
        "response_mode" => DecisionType::ResponseMode,
        "retry_strategy" => DecisionType::RetryStrategy,
        _ => DecisionType::OrchestrationPath,
    }
}

fn signal_type_from_str(s: &str) -> SignalType {
    match s {
        "schema_valid" => SignalType::SchemaValid,
        "empty_retrieval" => SignalType::EmptyRetrieval,
        "tool_success" => SignalType::ToolSuccess,
        "tool_failure" => SignalType::ToolFailure,
        "retry_occurred" => SignalType::RetryOccurred,
        "latency_threshold" => SignalType::LatencyThreshold,
        _ => SignalType::TokenUsage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_model::{AgentDecision, AgentQualitySignal, DecisionId, RunId, SignalId};

    fn run_with_decision(decision_type: DecisionType, reason_code: &str) -> AgentRun {
        let now = Utc::now();
        AgentRun {
            run_id: RunId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            status: RunStatus::Success,
            started_at: now,
            ended_at: Some(now),
            created_at: now,
            steps: vec![],
            failure: None,
            decisions: vec![AgentDecision {
                decision_id: DecisionId::new(),
                step_id: None,
                decision_type,
                selected: "api".to_string(),
                reason_code: reason_code.to_string(),
                confidence: None,
                metadata: Default::default(),
            }],
            quality_signals: vec![],
        }
    }

    #[test]
    fn unrecognized_reason_code_rejected() {
        let store = Store::open_in_memory().unwrap();
        let run = run_with_decision(DecisionType::ToolSelection, "made_up_reason");
        let err = store.put_run(&run).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReasonCode { .. }));
    }

    #[test]
    fn out_of_range_confidence_rejected() {
        let store = Store::open_in_memory().unwrap();
        let mut run = run_with_decision(DecisionType::ToolSelection, "cost_optimization");
        run.decisions[0].confidence = Some(1.0001);
        let err = store.put_run(&run).unwrap_err();
        assert!(matches!(err, StoreError::SchemaInvalid));
    }

    #[test]
    fn boundary_confidence_accepted() {
        let store = Store::open_in_memory().unwrap();
        let mut run = run_with_decision(DecisionType::ToolSelection, "cost_optimization");
        run.decisions[0].confidence = Some(1.0);
        assert!(store.put_run(&run).is_ok());
    }

    #[test]
    fn recognized_reason_code_accepted() {
        let store = Store::open_in_memory().unwrap();
        let run = run_with_decision(DecisionType::ToolSelection, "cost_optimization");
        assert!(store.put_run(&run).is_ok());
    }

    #[test]
    fn unrecognized_signal_code_rejected() {
        let store = Store::open_in_memory().unwrap();
        let mut run = run_with_decision(DecisionType::ToolSelection, "cost_optimization");
        run.decisions.clear();
        run.quality_signals.push(AgentQualitySignal {
            signal_id: SignalId::new(),
            step_id: None,
            signal_type: SignalType::EmptyRetrieval,
            signal_code: "no_results_found_anywhere".to_string(),
            value: true,
            weight: None,
            metadata: Default::default(),
        });
        let err = store.put_run(&run).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignalCode { .. }));
    }
}
