//! Profile Builder (component B): turns raw events in a window into a
//! `BehaviorProfile` — grouped, normalized decision/signal distributions
//! plus latency percentiles. Pure function of the window: rebuilding
//! against an unchanged store yields identical results.

mod error;
mod percentile;

pub use error::ProfileError;

use chrono::{DateTime, Utc};
use fw_model::{BehaviorProfile, Distribution, ProfileId};
use fw_store::Store;
use std::collections::BTreeMap;

/// `build_profile(agent_id, agent_version, environment, window_start,
/// window_end, min_sample_size)` — §4.B's input contract.
pub fn build_profile(
    store: &Store,
    agent_id: &str,
    agent_version: &str,
    environment: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_sample_size: u64,
) -> Result<BehaviorProfile, ProfileError> {
    let sample_size =
        store.count_runs_in_window(agent_id, agent_version, environment, window_start, window_end)?;
    if sample_size < min_sample_size {
        return Err(ProfileError::InsufficientData {
            have: sample_size,
            need: min_sample_size,
        });
    }

    let decision_counts =
        store.decision_counts(agent_id, agent_version, environment, window_start, window_end)?;
    let signal_counts =
        store.signal_counts(agent_id, agent_version, environment, window_start, window_end)?;
    let durations =
        store.run_durations_ms(agent_id, agent_version, environment, window_start, window_end)?;

    let profile = BehaviorProfile {
        profile_id: ProfileId::new(),
        agent_id: agent_id.to_string(),
        agent_version: agent_version.to_string(),
        environment: environment.to_string(),
        window_start,
        window_end,
        sample_size,
        decision_distributions: normalize(decision_counts),
        signal_distributions: normalize(signal_counts),
        latency_stats: percentile::latency_stats(&durations),
        created_at: Utc::now(),
    };

    tracing::info!(
        agent_id,
        agent_version,
        environment,
        sample_size,
        "built behavior profile"
    );
    Ok(profile)
}

/// Groups `(tag, option) → count` by `tag` and normalizes each tag's inner
/// counts to probabilities summing to 1.0. A tag with no observed options
/// would have nothing to group, so it simply never appears — matching
/// §4.B's "empty tags are omitted".
fn normalize(counts: BTreeMap<(String, String), u64>) -> Distribution {
    let mut grouped: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for ((tag, option), count) in counts {
        *grouped.entry(tag).or_default().entry(option).or_insert(0) += count;
    }

    grouped
        .into_iter()
        .map(|(tag, options)| {
            let total: u64 = options.values().sum();
            let normalized = options
                .into_iter()
                .map(|(option, count)| (option, count as f64 / total as f64))
                .collect();
            (tag, normalized)
        })
        .collect()
}
