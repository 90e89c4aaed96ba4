use crate::error::StoreError;
use crate::Store;
use chrono::{DateTime, Duration, Utc};
use fw_model::{BaselineId, BehaviorDrift, DriftId, DriftSeverity, DriftType, TestMethod};
use rusqlite::{params, OptionalExtension, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Optional filters for `Store::list_drift`; all fields are ANDed together.
#[derive(Debug, Clone, Default)]
pub struct DriftFilter {
    pub agent_id: Option<String>,
    pub agent_version: Option<String>,
    pub environment: Option<String>,
    pub drift_type: Option<DriftType>,
    pub severity: Option<DriftSeverity>,
    pub resolved: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

/// Counts by severity among drift events detected within the window,
/// for `GET /v1/drift/summary?days=N`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DriftSummary {
    pub total: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub unresolved: u64,
}

fn drift_type_str(t: DriftType) -> &'static str {
    match t {
        DriftType::Decision => "decision",
        DriftType::Signal => "signal",
        DriftType::Latency => "latency",
    }
}

fn drift_type_from_str(s: &str) -> DriftType {
    match s {
        "decision" => DriftType::Decision,
        "signal" => DriftType::Signal,
        _ => DriftType::Latency,
    }
}

fn test_method_str(t: TestMethod) -> &'static str {
    match t {
        TestMethod::ChiSquare => "chi_square",
        TestMethod::PercentThreshold => "percent_threshold",
    }
}

fn test_method_from_str(s: &str) -> TestMethod {
    match s {
        "chi_square" => TestMethod::ChiSquare,
        _ => TestMethod::PercentThreshold,
    }
}

fn severity_str(s: DriftSeverity) -> &'static str {
    match s {
        DriftSeverity::Low => "low",
        DriftSeverity::Medium => "medium",
        DriftSeverity::High => "high",
    }
}

fn severity_from_str(s: &str) -> DriftSeverity {
    match s {
        "low" => DriftSeverity::Low,
        "high" => DriftSeverity::High,
        _ => DriftSeverity::Medium,
    }
}

impl Store {
    /// Inserts every drift event from one `detect` call in a single
    /// transaction — if persistence fails partway, none of it is visible.
    pub fn put_drift_events(&self, events: &[BehaviorDrift]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;
        for event in events {
            insert_drift_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_drift_event(&self, drift_id: DriftId) -> Result<Option<BehaviorDrift>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            &format!("SELECT {COLS} FROM behavior_drift WHERE drift_id = ?1"),
            params![drift_id.to_string()],
            row_to_drift,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_drift_for_agent(&self, agent_id: &str) -> Result<Vec<BehaviorDrift>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM behavior_drift WHERE agent_id = ?1 ORDER BY detected_at DESC"
        ))?;
        let rows = stmt
            .query_map(params![agent_id], row_to_drift)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn resolve_drift_event(&self, drift_id: DriftId) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "UPDATE behavior_drift SET resolved_at = ?1 WHERE drift_id = ?2",
            params![Utc::now().to_rfc3339(), drift_id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_drift(&self, filter: &DriftFilter) -> Result<Vec<BehaviorDrift>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut sql = format!("SELECT {COLS} FROM behavior_drift WHERE 1=1");
        if filter.agent_id.is_some() {
            sql.push_str(" AND agent_id = :agent_id");
        }
        if filter.agent_version.is_some() {
            sql.push_str(" AND agent_version = :agent_version");
        }
        if filter.environment.is_some() {
            sql.push_str(" AND environment = :environment");
        }
        if filter.drift_type.is_some() {
            sql.push_str(" AND drift_type = :drift_type");
        }
        if filter.severity.is_some() {
            sql.push_str(" AND severity = :severity");
        }
        if let Some(resolved) = filter.resolved {
            sql.push_str(if resolved {
                " AND resolved_at IS NOT NULL"
            } else {
                " AND resolved_at IS NULL"
            });
        }
        if filter.start_time.is_some() {
            sql.push_str(" AND detected_at >= :start_time");
        }
        if filter.end_time.is_some() {
            sql.push_str(" AND detected_at < :end_time");
        }
        sql.push_str(" ORDER BY detected_at DESC LIMIT :limit OFFSET :offset");

        let agent_id = filter.agent_id.clone();
        let agent_version = filter.agent_version.clone();
        let environment = filter.environment.clone();
        let drift_type = filter.drift_type.map(drift_type_str);
        let severity = filter.severity.map(severity_str);
        let start_time = filter.start_time.map(|t| t.to_rfc3339());
        let end_time = filter.end_time.map(|t| t.to_rfc3339());
        let limit = if filter.limit == 0 { 100 } else { filter.limit };

        let mut stmt = conn.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> =
            vec![(":limit", &limit), (":offset", &filter.offset)];
        if let Some(v) = &agent_id {
            named.push((":agent_id", v));
        }
        if let Some(v) = &agent_version {
            named.push((":agent_version", v));
        }
        if let Some(v) = &environment {
            named.push((":environment", v));
        }
        if let Some(v) = &drift_type {
            named.push((":drift_type", v));
        }
        if let Some(v) = &severity {
            named.push((":severity", v));
        }
        if let Some(v) = &start_time {
            named.push((":start_time", v));
        }
        if let Some(v) = &end_time {
            named.push((":end_time", v));
        }

        let rows = stmt
            .query_map(named.as_slice(), row_to_drift)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn drift_summary(&self, days: i64) -> Result<DriftSummary, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let since = (Utc::now() - Duration::days(days)).to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT severity, resolved_at FROM behavior_drift WHERE detected_at >= ?1",
        )?;
        let rows = stmt
            .query_map(params![since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_severity: BTreeMap<&str, u64> = BTreeMap::new();
        let mut summary = DriftSummary::default();
        for (severity, resolved_at) in rows {
            summary.total += 1;
            if resolved_at.is_none() {
                summary.unresolved += 1;
            }
            *by_severity.entry(canonical_severity(&severity)).or_insert(0) += 1;
        }
        summary.low = *by_severity.get("low").unwrap_or(&0);
        summary.medium = *by_severity.get("medium").unwrap_or(&0);
        summary.high = *by_severity.get("high").unwrap_or(&0);
        Ok(summary)
    }
}

fn canonical_severity(s: &str) -> &'static str {
    match s {
        "low" => "low",
        "high" => "high",
        _ => "medium",
    }
}

const COLS: &str = "drift_id, baseline_id, agent_id, agent_version, environment, drift_type, metric, baseline_value, observed_value, delta, delta_percent, significance, test_method, severity, detected_at, observation_window_start, observation_window_end, observation_sample_size, resolved_at";

fn insert_drift_event(tx: &Transaction, event: &BehaviorDrift) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO behavior_drift (drift_id, baseline_id, agent_id, agent_version, environment, drift_type, metric, baseline_value, observed_value, delta, delta_percent, significance, test_method, severity, detected_at, observation_window_start, observation_window_end, observation_sample_size, resolved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            event.drift_id.to_string(),
            event.baseline_id.to_string(),
            event.agent_id,
            event.agent_version,
            event.environment,
            drift_type_str(event.drift_type),
            event.metric,
            event.baseline_value,
            event.observed_value,
            event.delta,
            event.delta_percent,
            event.significance,
            test_method_str(event.test_method),
            severity_str(event.severity),
            event.detected_at.to_rfc3339(),
            event.observation_window_start.to_rfc3339(),
            event.observation_window_end.to_rfc3339(),
            event.observation_sample_size,
            event.resolved_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn row_to_drift(row: &rusqlite::Row) -> rusqlite::Result<BehaviorDrift> {
    let drift_id: String = row.get(0)?;
    let baseline_id: String = row.get(1)?;
    let drift_type: String = row.get(5)?;
    let test_method: String = row.get(12)?;
    let severity: String = row.get(13)?;
    let detected_at: String = row.get(14)?;
    let observation_window_start: String = row.get(15)?;
    let observation_window_end: String = row.get(16)?;
    let resolved_at: Option<String> = row.get(18)?;

    Ok(BehaviorDrift {
        drift_id: DriftId::from(Uuid::from_str(&drift_id).expect("valid uuid")),
        baseline_id: BaselineId::from(Uuid::from_str(&baseline_id).expect("valid uuid")),
        agent_id: row.get(2)?,
        agent_version: row.get(3)?,
        environment: row.get(4)?,
        drift_type: drift_type_from_str(&drift_type),
        metric: row.get(6)?,
        baseline_value: row.get(7)?,
        observed_value: row.get(8)?,
        delta: row.get(9)?,
        delta_percent: row.get(10)?,
        significance: row.get(11)?,
        test_method: test_method_from_str(&test_method),
        severity: severity_from_str(&severity),
        detected_at: parse_ts(&detected_at),
        observation_window_start: parse_ts(&observation_window_start),
        observation_window_end: parse_ts(&observation_window_end),
        observation_sample_size: row.get::<_, i64>(17)? as u64,
        resolved_at: resolved_at.as_deref().map(parse_ts),
    })
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("stored timestamp is valid rfc3339")
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use fw_model::BaselineId;

    fn drift_event(agent_id: &str, severity: DriftSeverity) -> BehaviorDrift {
        BehaviorDrift {
            drift_id: DriftId::new(),
            baseline_id: BaselineId::new(),
            agent_id: agent_id.to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            drift_type: DriftType::Decision,
            metric: "tool_selection.api".to_string(),
            baseline_value: 0.65,
            observed_value: 0.40,
            delta: -0.25,
            delta_percent: -38.5,
            significance: 0.01,
            test_method: TestMethod::ChiSquare,
            severity,
            detected_at: Utc::now(),
            observation_window_start: Utc::now(),
            observation_window_end: Utc::now(),
            observation_sample_size: 100,
            resolved_at: None,
        }
    }

    #[test]
    fn list_drift_filters_by_agent_and_severity() {
        let store = Store::open_in_memory().unwrap();
        store
            .put_drift_events(&[
                drift_event("agent-1", DriftSeverity::High),
                drift_event("agent-1", DriftSeverity::Low),
                drift_event("agent-2", DriftSeverity::High),
            ])
            .unwrap();

        let filter = DriftFilter {
            agent_id: Some("agent-1".to_string()),
            severity: Some(DriftSeverity::High),
            ..Default::default()
        };
        let results = store.list_drift(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent_id, "agent-1");
    }

    #[test]
    fn drift_summary_counts_by_severity_and_unresolved() {
        let store = Store::open_in_memory().unwrap();
        store
            .put_drift_events(&[
                drift_event("agent-1", DriftSeverity::High),
                drift_event("agent-1", DriftSeverity::Medium),
                drift_event("agent-1", DriftSeverity::Low),
            ])
            .unwrap();

        let summary = store.drift_summary(7).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.unresolved, 3);
    }

    #[test]
    fn resolved_events_excluded_by_resolved_filter() {
        let store = Store::open_in_memory().unwrap();
        let event = drift_event("agent-1", DriftSeverity::High);
        store.put_drift_events(&[event.clone()]).unwrap();
        store.resolve_drift_event(event.drift_id).unwrap();

        let filter = DriftFilter {
            resolved: Some(false),
            ..Default::default()
        };
        assert!(store.list_drift(&filter).unwrap().is_empty());
    }
}
