use crate::error::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fw_model::{BehaviorProfile, Distribution, LatencyStats, ProfileId};
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;
use uuid::Uuid;

impl Store {
    pub fn put_profile(&self, profile: &BehaviorProfile) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO behavior_profiles (profile_id, agent_id, agent_version, environment, window_start, window_end, sample_size, decision_distributions, signal_distributions, latency_stats, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                profile.profile_id.to_string(),
                profile.agent_id,
                profile.agent_version,
                profile.environment,
                profile.window_start.to_rfc3339(),
                profile.window_end.to_rfc3339(),
                profile.sample_size,
                serde_json::to_string(&profile.decision_distributions)?,
                serde_json::to_string(&profile.signal_distributions)?,
                serde_json::to_string(&profile.latency_stats)?,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, profile_id: ProfileId) -> Result<Option<BehaviorProfile>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            "SELECT profile_id, agent_id, agent_version, environment, window_start, window_end, sample_size, decision_distributions, signal_distributions, latency_stats, created_at
             FROM behavior_profiles WHERE profile_id = ?1",
            params![profile_id.to_string()],
            row_to_profile,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_profiles(
        &self,
        agent_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BehaviorProfile>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let limit = if limit == 0 { 100 } else { limit };
        let mut sql = String::from(
            "SELECT profile_id, agent_id, agent_version, environment, window_start, window_end, sample_size, decision_distributions, signal_distributions, latency_stats, created_at
             FROM behavior_profiles WHERE 1=1",
        );
        if agent_id.is_some() {
            sql.push_str(" AND agent_id = :agent_id");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT :limit OFFSET :offset");

        let mut stmt = conn.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = vec![(":limit", &limit), (":offset", &offset)];
        if let Some(v) = &agent_id {
            named.push((":agent_id", v));
        }
        let rows = stmt
            .query_map(named.as_slice(), row_to_profile)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<BehaviorProfile> {
    let profile_id: String = row.get(0)?;
    let window_start: String = row.get(4)?;
    let window_end: String = row.get(5)?;
    let decision_distributions: String = row.get(7)?;
    let signal_distributions: String = row.get(8)?;
    let latency_stats: String = row.get(9)?;
    let created_at: String = row.get(10)?;

    let decision_distributions: Distribution = serde_json::from_str(&decision_distributions)
        .expect("stored decision_distributions is valid json");
    let signal_distributions: Distribution = serde_json::from_str(&signal_distributions)
        .expect("stored signal_distributions is valid json");
    let latency_stats: LatencyStats =
        serde_json::from_str(&latency_stats).expect("stored latency_stats is valid json");

    Ok(BehaviorProfile {
        profile_id: ProfileId::from(Uuid::from_str(&profile_id).expect("valid uuid")),
        agent_id: row.get(1)?,
        agent_version: row.get(2)?,
        environment: row.get(3)?,
        window_start: parse_ts(&window_start),
        window_end: parse_ts(&window_end),
        sample_size: row.get::<_, i64>(6)? as u64,
        decision_distributions,
        signal_distributions,
        latency_stats,
        created_at: parse_ts(&created_at),
    })
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("stored timestamp is valid rfc3339")
        .with_timezone(&Utc)
}
