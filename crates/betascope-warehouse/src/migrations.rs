use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_searches",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS searches_id_seq START 1;

CREATE TABLE IF NOT EXISTS searches (
    id BIGINT PRIMARY KEY DEFAULT nextval('searches_id_seq'),
    request_id TEXT,
    ticker TEXT NOT NULL,
    exchange TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    beta DOUBLE,
    peers TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_searches_created_at_index",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_searches_created_at ON searches(created_at);
"#,
    },
];

/// Applies pending migrations in order; applied versions are skipped.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;
        if applied > 0 {
            continue;
        }

        connection.execute_batch(migration.sql)?;
        connection.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [migration.version],
        )?;
    }

    Ok(())
}

pub fn latest_version() -> &'static str {
    MIGRATIONS.last().map_or("", |migration| migration.version)
}
