use crate::error::StoreError;
use crate::Store;
use chrono::Utc;
use fw_model::{BaselineId, BaselineType, BehaviorBaseline, ProfileId};
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;
use uuid::Uuid;

impl Store {
    pub fn insert_baseline(&self, baseline: &BehaviorBaseline) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO behavior_baselines (baseline_id, profile_id, agent_id, agent_version, environment, baseline_type, approved_by, approved_at, description, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                baseline.baseline_id.to_string(),
                baseline.profile_id.to_string(),
                baseline.agent_id,
                baseline.agent_version,
                baseline.environment,
                baseline.baseline_type.as_str(),
                baseline.approved_by,
                baseline.approved_at.map(|t| t.to_rfc3339()),
                baseline.description,
                baseline.is_active as i64,
                baseline.created_at.to_rfc3339(),
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::IntegrityConflict(format!(
                    "baseline already exists for profile {}",
                    baseline.profile_id
                ))
            }
            other => StoreError::from(other),
        })?;
        Ok(())
    }

    pub fn get_baseline(&self, baseline_id: BaselineId) -> Result<Option<BehaviorBaseline>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            "SELECT baseline_id, profile_id, agent_id, agent_version, environment, baseline_type, approved_by, approved_at, description, is_active, created_at
             FROM behavior_baselines WHERE baseline_id = ?1",
            params![baseline_id.to_string()],
            row_to_baseline,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn get_active_baseline(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
    ) -> Result<Option<BehaviorBaseline>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(
            "SELECT baseline_id, profile_id, agent_id, agent_version, environment, baseline_type, approved_by, approved_at, description, is_active, created_at
             FROM behavior_baselines
             WHERE agent_id = ?1 AND agent_version = ?2 AND environment = ?3 AND is_active = 1",
            params![agent_id, agent_version, environment],
            row_to_baseline,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Atomically deactivates any baseline currently active for this
    /// baseline's `(agent_id, agent_version, environment)` key and
    /// activates the target, in a single transaction.
    pub fn activate_baseline(&self, baseline_id: BaselineId) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;

        let (agent_id, agent_version, environment): (String, String, String) = tx
            .query_row(
                "SELECT agent_id, agent_version, environment FROM behavior_baselines WHERE baseline_id = ?1",
                params![baseline_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::IntegrityConflict(format!("baseline {baseline_id} not found")))?;

        tx.execute(
            "UPDATE behavior_baselines SET is_active = 0
             WHERE agent_id = ?1 AND agent_version = ?2 AND environment = ?3 AND is_active = 1",
            params![agent_id, agent_version, environment],
        )?;
        tx.execute(
            "UPDATE behavior_baselines SET is_active = 1 WHERE baseline_id = ?1",
            params![baseline_id.to_string()],
        )?;
        tx.commit()?;
        tracing::info!(baseline_id = %baseline_id, "activated baseline");
        Ok(())
    }

    pub fn deactivate_baseline(&self, baseline_id: BaselineId) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "UPDATE behavior_baselines SET is_active = 0 WHERE baseline_id = ?1",
            params![baseline_id.to_string()],
        )?;
        Ok(())
    }

    /// Idempotent: always overwrites `approved_by`/`approved_at` with the
    /// latest call's values (§9 open-question decision).
    pub fn approve_baseline(&self, baseline_id: BaselineId, approved_by: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "UPDATE behavior_baselines SET approved_by = ?1, approved_at = ?2 WHERE baseline_id = ?3",
            params![approved_by, Utc::now().to_rfc3339(), baseline_id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_baselines(
        &self,
        agent_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BehaviorBaseline>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let limit = if limit == 0 { 100 } else { limit };
        let mut sql = String::from(
            "SELECT baseline_id, profile_id, agent_id, agent_version, environment, baseline_type, approved_by, approved_at, description, is_active, created_at
             FROM behavior_baselines WHERE 1=1",
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
            .query_map(named.as_slice(), row_to_baseline)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_baseline(row: &rusqlite::Row) -> rusqlite::Result<BehaviorBaseline> {
    let baseline_id: String = row.get(0)?;
    let profile_id: String = row.get(1)?;
    let baseline_type: String = row.get(5)?;
    let approved_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(10)?;

    Ok(BehaviorBaseline {
        baseline_id: BaselineId::from(Uuid::from_str(&baseline_id).expect("valid uuid")),
        profile_id: ProfileId::from(Uuid::from_str(&profile_id).expect("valid uuid")),
        agent_id: row.get(2)?,
        agent_version: row.get(3)?,
        environment: row.get(4)?,
        baseline_type: BaselineType::from_str_loose(&baseline_type)
            .expect("stored baseline_type is a recognized value"),
        approved_by: row.get(6)?,
        approved_at: approved_at.as_deref().map(parse_ts),
        description: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
        created_at: parse_ts(&created_at),
    })
}

fn parse_ts(raw: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .expect("stored timestamp is valid rfc3339")
        .with_timezone(&Utc)
}
