//! Baseline Manager (component C): the immutable-promotion state machine
//! and the "one active baseline per key" invariant.
//!
//! `CREATED (inactive) → [ACTIVE]`, with `deactivate` returning to
//! inactive. `approve` is an orthogonal, idempotent property write — it
//! does not gate activation.

mod error;

pub use error::BaselineError;

use chrono::Utc;
use fw_model::{metadata, BaselineId, BaselineType, BehaviorBaseline, ProfileId};
use fw_store::{Store, StoreError};

pub struct BaselineManager<'a> {
    store: &'a Store,
}

impl<'a> BaselineManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Creates a baseline, inactive by default. Validates `baseline_type`
    /// against the closed set and `description` against the length and
    /// forbidden-keyword rules. If `auto_activate`, atomically activates
    /// it as part of this call.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        profile_id: ProfileId,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
        baseline_type: &str,
        approved_by: Option<String>,
        description: Option<String>,
        auto_activate: bool,
    ) -> Result<BehaviorBaseline, BaselineError> {
        let baseline_type = BaselineType::from_str_loose(baseline_type)
            .ok_or_else(|| BaselineError::InvalidBaselineType(baseline_type.to_string()))?;
        if let Some(description) = &description {
            metadata::validate_description(description)?;
        }

        let now = Utc::now();
        let baseline = BehaviorBaseline {
            baseline_id: BaselineId::new(),
            profile_id,
            agent_id: agent_id.to_string(),
            agent_version: agent_version.to_string(),
            environment: environment.to_string(),
            baseline_type,
            approved_by,
            approved_at: None,
            description,
            is_active: false,
            created_at: now,
        };

        match self.store.insert_baseline(&baseline) {
            Ok(()) => {}
            Err(StoreError::IntegrityConflict(msg)) => {
                return Err(BaselineError::AlreadyExists(msg))
            }
            Err(err) => return Err(err.into()),
        }

        if auto_activate {
            self.store.activate_baseline(baseline.baseline_id)?;
            return Ok(BehaviorBaseline {
                is_active: true,
                ..baseline
            });
        }

        tracing::info!(baseline_id = %baseline.baseline_id, "created baseline");
        Ok(baseline)
    }

    /// Atomically deactivates any baseline currently active for the same
    /// `(agent_id, agent_version, environment)` key and activates `baseline_id`.
    pub fn activate(&self, baseline_id: BaselineId) -> Result<(), BaselineError> {
        self.store
            .activate_baseline(baseline_id)
            .map_err(|err| match err {
                StoreError::IntegrityConflict(msg) if msg.contains("not found") => {
                    BaselineError::NotFound(baseline_id.to_string())
                }
                other => other.into(),
            })
    }

    /// No-op if the baseline is already inactive.
    pub fn deactivate(&self, baseline_id: BaselineId) -> Result<(), BaselineError> {
        self.store.deactivate_baseline(baseline_id)?;
        Ok(())
    }

    /// Idempotent: repeated calls simply overwrite the approver/timestamp.
    pub fn approve(&self, baseline_id: BaselineId, approved_by: &str) -> Result<(), BaselineError> {
        self.store.approve_baseline(baseline_id, approved_by)?;
        Ok(())
    }

    pub fn get(&self, baseline_id: BaselineId) -> Result<BehaviorBaseline, BaselineError> {
        self.store
            .get_baseline(baseline_id)?
            .ok_or_else(|| BaselineError::NotFound(baseline_id.to_string()))
    }

    pub fn get_active(
        &self,
        agent_id: &str,
        agent_version: &str,
        environment: &str,
    ) -> Result<Option<BehaviorBaseline>, BaselineError> {
        Ok(self.store.get_active_baseline(agent_id, agent_version, environment)?)
    }
}
