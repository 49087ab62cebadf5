//! SQLite schema and migrations for `SqliteStore`.

use rusqlite::{Connection, Result as SqliteResult};

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize_schema(conn: &Connection) -> SqliteResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        apply_v1_schema(conn)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (1)",
            [],
        )?;
    }

    Ok(())
}

fn apply_v1_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS llm_configs (
            id TEXT PRIMARY KEY,
            endpoint_url TEXT NOT NULL,
            method TEXT NOT NULL,
            headers TEXT NOT NULL,
            payload_template TEXT NOT NULL,
            timeout_seconds INTEGER NOT NULL,
            max_retries INTEGER NOT NULL,
            environment_tag TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pipelines (
            id TEXT PRIMARY KEY,
            llm_config_id TEXT NOT NULL,
            libraries TEXT NOT NULL,
            test_categories TEXT NOT NULL,
            severity_thresholds TEXT,
            FOREIGN KEY(llm_config_id) REFERENCES llm_configs(id)
        )",
        [],
    )?;

    // `rowid` (implicit, monotonically increasing) doubles as the insertion
    // ordinal the baseline selector's `Previous` mode orders by (spec §4.7) —
    // no separate ordinal column needed.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            pipeline_id TEXT NOT NULL,
            llm_config_id TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT,
            error_message TEXT,
            FOREIGN KEY(pipeline_id) REFERENCES pipelines(id),
            FOREIGN KEY(llm_config_id) REFERENCES llm_configs(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS findings (
            id TEXT PRIMARY KEY,
            execution_id TEXT NOT NULL,
            library TEXT NOT NULL,
            test_category TEXT NOT NULL,
            severity TEXT NOT NULL,
            risk_type TEXT NOT NULL,
            evidence_prompt TEXT NOT NULL,
            evidence_response TEXT NOT NULL,
            confidence REAL,
            extra TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(execution_id) REFERENCES executions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_findings_execution ON findings(execution_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS embeddings (
            id TEXT PRIMARY KEY,
            finding_id TEXT NOT NULL UNIQUE,
            model_name TEXT NOT NULL,
            vector BLOB NOT NULL,
            FOREIGN KEY(finding_id) REFERENCES findings(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS agent_traces (
            finding_id TEXT PRIMARY KEY,
            calls TEXT NOT NULL,
            FOREIGN KEY(finding_id) REFERENCES findings(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS baselines (
            id TEXT PRIMARY KEY,
            execution_id TEXT NOT NULL,
            name TEXT NOT NULL,
            tag TEXT UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(execution_id) REFERENCES executions(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS drift_findings (
            id TEXT PRIMARY KEY,
            current_execution_id TEXT NOT NULL,
            baseline_execution_id TEXT NOT NULL,
            channel TEXT NOT NULL,
            metric TEXT NOT NULL,
            value REAL NOT NULL,
            threshold REAL NOT NULL,
            severity TEXT NOT NULL,
            confidence REAL,
            details TEXT NOT NULL,
            FOREIGN KEY(current_execution_id) REFERENCES executions(id),
            FOREIGN KEY(baseline_execution_id) REFERENCES executions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_drift_findings_pair
            ON drift_findings(current_execution_id, baseline_execution_id)",
        [],
    )?;

    Ok(())
}
