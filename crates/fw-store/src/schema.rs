// SQL schema for the event store. Foreign keys cascade from `agent_runs`
// outward; the unique conditional index on `behavior_baselines` is what
// enforces "at most one active baseline per key" at the storage layer,
// not just in application code.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS agent_runs (
    run_id          TEXT PRIMARY KEY,
    agent_id        TEXT NOT NULL,
    agent_version   TEXT NOT NULL,
    environment     TEXT NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('success', 'failure', 'partial')),
    started_at      TEXT NOT NULL,
    ended_at        TEXT,
    created_at      TEXT NOT NULL,
    CHECK (ended_at IS NULL OR ended_at >= started_at)
);

CREATE INDEX IF NOT EXISTS idx_agent_runs_filter
    ON agent_runs (agent_id, agent_version, environment, started_at);

CREATE TABLE IF NOT EXISTS agent_steps (
    step_id         TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
    seq             INTEGER NOT NULL CHECK (seq >= 0),
    step_type       TEXT NOT NULL CHECK (step_type IN ('plan', 'retrieve', 'tool', 'respond', 'other')),
    name            TEXT NOT NULL,
    latency_ms      INTEGER NOT NULL CHECK (latency_ms >= 0),
    started_at      TEXT NOT NULL,
    ended_at        TEXT NOT NULL,
    metadata        TEXT NOT NULL DEFAULT '{}',
    CHECK (ended_at >= started_at),
    UNIQUE (run_id, seq)
);

CREATE TABLE IF NOT EXISTS agent_failures (
    failure_id      TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
    step_id         TEXT REFERENCES agent_steps(step_id) ON DELETE SET NULL,
    failure_type    TEXT NOT NULL CHECK (failure_type IN ('tool', 'model', 'retrieval', 'orchestration')),
    failure_code    TEXT NOT NULL CHECK (failure_code != ''),
    message         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_decisions (
    decision_id     TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
    step_id         TEXT REFERENCES agent_steps(step_id) ON DELETE SET NULL,
    decision_type   TEXT NOT NULL,
    selected        TEXT NOT NULL,
    reason_code     TEXT NOT NULL,
    confidence      REAL CHECK (confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
    metadata        TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_agent_decisions_window
    ON agent_decisions (run_id, decision_type, selected);

CREATE TABLE IF NOT EXISTS agent_quality_signals (
    signal_id       TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL REFERENCES agent_runs(run_id) ON DELETE CASCADE,
    step_id         TEXT REFERENCES agent_steps(step_id) ON DELETE SET NULL,
    signal_type     TEXT NOT NULL,
    signal_code     TEXT NOT NULL,
    value           INTEGER NOT NULL CHECK (value IN (0, 1)),
    weight          REAL CHECK (weight IS NULL OR (weight >= 0.0 AND weight <= 1.0)),
    metadata        TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_agent_signals_window
    ON agent_quality_signals (run_id, signal_type, signal_code);

CREATE TABLE IF NOT EXISTS behavior_profiles (
    profile_id              TEXT PRIMARY KEY,
    agent_id                TEXT NOT NULL,
    agent_version           TEXT NOT NULL,
    environment              TEXT NOT NULL,
    window_start             TEXT NOT NULL,
    window_end               TEXT NOT NULL,
    sample_size              INTEGER NOT NULL,
    decision_distributions    TEXT NOT NULL,
    signal_distributions      TEXT NOT NULL,
    latency_stats             TEXT NOT NULL,
    created_at                TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS behavior_baselines (
    baseline_id     TEXT PRIMARY KEY,
    profile_id      TEXT NOT NULL REFERENCES behavior_profiles(profile_id),
    agent_id        TEXT NOT NULL,
    agent_version   TEXT NOT NULL,
    environment     TEXT NOT NULL,
    baseline_type   TEXT NOT NULL CHECK (baseline_type IN ('version', 'time_window', 'manual')),
    approved_by     TEXT,
    approved_at     TEXT,
    description     TEXT,
    is_active       INTEGER NOT NULL DEFAULT 0 CHECK (is_active IN (0, 1)),
    created_at      TEXT NOT NULL,
    UNIQUE (profile_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_behavior_baselines_one_active
    ON behavior_baselines (agent_id, agent_version, environment)
    WHERE is_active = 1;

CREATE TABLE IF NOT EXISTS behavior_drift (
    drift_id                    TEXT PRIMARY KEY,
    baseline_id                 TEXT NOT NULL REFERENCES behavior_baselines(baseline_id),
    agent_id                    TEXT NOT NULL,
    agent_version               TEXT NOT NULL,
    environment                 TEXT NOT NULL,
    drift_type                  TEXT NOT NULL CHECK (drift_type IN ('decision', 'signal', 'latency')),
    metric                      TEXT NOT NULL,
    baseline_value               REAL NOT NULL,
    observed_value                REAL NOT NULL,
    delta                        REAL NOT NULL,
    delta_percent                REAL NOT NULL,
    significance                 REAL NOT NULL CHECK (significance >= 0.0 AND significance <= 1.0),
    test_method                  TEXT NOT NULL CHECK (test_method IN ('chi_square', 'percent_threshold')),
    severity                     TEXT NOT NULL CHECK (severity IN ('low', 'medium', 'high')),
    detected_at                   TEXT NOT NULL,
    observation_window_start      TEXT NOT NULL,
    observation_window_end        TEXT NOT NULL,
    observation_sample_size       INTEGER NOT NULL,
    resolved_at                   TEXT
);

CREATE INDEX IF NOT EXISTS idx_behavior_drift_agent
    ON behavior_drift (agent_id, detected_at);
"#;
