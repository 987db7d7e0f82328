//! Versioned schema migrations
//!
//! Each migration runs once, inside its own transaction, and is recorded in
//! `schema_migrations`. Running `run` against an up-to-date database is a
//! no-op, so it is safe to call from `stowctl migrate` repeatedly.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{ServerError, ServerResult};

/// A single schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    sql: &'static str,
}

/// All migrations, in order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core_schema",
        sql: CORE_SCHEMA,
    },
    Migration {
        version: 2,
        name: "seed_states",
        sql: SEED_STATES,
    },
    Migration {
        version: 3,
        name: "items_fts",
        sql: ITEMS_FTS,
    },
];

const CORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS labels (
    label_id INTEGER PRIMARY KEY,
    creation_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS states (
    state_id INTEGER PRIMARY KEY,
    state_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id INTEGER PRIMARY KEY,
    tag_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    item_id INTEGER PRIMARY KEY,
    label_id INTEGER REFERENCES labels(label_id) ON DELETE SET NULL,
    parent_item_id INTEGER REFERENCES items(item_id) ON DELETE SET NULL,
    name TEXT NOT NULL,
    state_id INTEGER REFERENCES states(state_id),
    comment TEXT,
    image_lg_path TEXT,
    image_sm_path TEXT,
    creation_date TEXT NOT NULL,
    last_update TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    PRIMARY KEY (item_id, tag_id)
);

CREATE TABLE IF NOT EXISTS events (
    event_id INTEGER PRIMARY KEY,
    event_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    item_id INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    to_state INTEGER REFERENCES states(state_id),
    parent_item_id INTEGER REFERENCES items(item_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_item_id);
CREATE INDEX IF NOT EXISTS idx_items_label ON items(label_id);
CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(tag_name);
"#;

const SEED_STATES: &str = r#"
INSERT INTO states (state_name)
SELECT 'stored' WHERE NOT EXISTS (SELECT 1 FROM states WHERE state_name = 'stored');

INSERT INTO states (state_name)
SELECT 'not stored' WHERE NOT EXISTS (SELECT 1 FROM states WHERE state_name = 'not stored');
"#;

// External-content FTS5 table: the index holds only tokens, rows live in
// `items`. The triggers must replay the exact old values on delete.
const ITEMS_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS items_fts USING fts5(
    name,
    comment,
    content='items',
    content_rowid='item_id'
);

CREATE TRIGGER IF NOT EXISTS items_fts_ai AFTER INSERT ON items BEGIN
    INSERT INTO items_fts(rowid, name, comment) VALUES (NEW.item_id, NEW.name, NEW.comment);
END;

CREATE TRIGGER IF NOT EXISTS items_fts_ad AFTER DELETE ON items BEGIN
    INSERT INTO items_fts(items_fts, rowid, name, comment) VALUES ('delete', OLD.item_id, OLD.name, OLD.comment);
END;

CREATE TRIGGER IF NOT EXISTS items_fts_au AFTER UPDATE OF name, comment ON items BEGIN
    INSERT INTO items_fts(items_fts, rowid, name, comment) VALUES ('delete', OLD.item_id, OLD.name, OLD.comment);
    INSERT INTO items_fts(rowid, name, comment) VALUES (NEW.item_id, NEW.name, NEW.comment);
END;

INSERT INTO items_fts(items_fts) VALUES ('rebuild');
"#;

const MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)
"#;

/// Apply every pending migration. Returns the versions that were applied.
pub async fn run(pool: &SqlitePool) -> ServerResult<Vec<i64>> {
    sqlx::query(MIGRATIONS_TABLE).execute(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut newly_applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(pool, migration)
            .await
            .map_err(|source| ServerError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        newly_applied.push(migration.version);
    }

    if newly_applied.is_empty() {
        tracing::debug!("Schema already up to date");
    } else {
        tracing::info!(count = newly_applied.len(), "Migrations complete");
    }

    Ok(newly_applied)
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;

    sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Versions recorded in `schema_migrations`, or empty if the table is missing.
pub async fn applied_versions(pool: &SqlitePool) -> ServerResult<Vec<i64>> {
    let table_exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists.0 {
        return Ok(Vec::new());
    }

    let versions: Vec<(i64,)> =
        sqlx::query_as("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    Ok(versions.into_iter().map(|(v,)| v).collect())
}

/// Migrations not yet applied to this database
pub async fn pending(pool: &SqlitePool) -> ServerResult<Vec<&'static Migration>> {
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database_url_for;
    use crate::db::create_pool;

    async fn fresh_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&database_url_for(dir.path())).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn applies_all_then_nothing() {
        let (_dir, pool) = fresh_pool().await;

        assert_eq!(pending(&pool).await.unwrap().len(), MIGRATIONS.len());

        let first = run(&pool).await.unwrap();
        assert_eq!(first, vec![1, 2, 3]);

        let second = run(&pool).await.unwrap();
        assert!(second.is_empty());
        assert!(pending(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeds_states_once() {
        let (_dir, pool) = fresh_pool().await;
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();

        let names: Vec<(String,)> =
            sqlx::query_as("SELECT state_name FROM states ORDER BY state_id")
                .fetch_all(&pool)
                .await
                .unwrap();

        assert_eq!(
            names,
            vec![("stored".to_string(),), ("not stored".to_string(),)]
        );
    }

    #[tokio::test]
    async fn fts_index_follows_item_changes() {
        let (_dir, pool) = fresh_pool().await;
        run(&pool).await.unwrap();

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO items (name, comment, creation_date, last_update) VALUES ('spare fuses', 'blue box', ?1, ?1)",
        )
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        let count = |q: &'static str| {
            let pool = pool.clone();
            async move {
                let row: (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH ?1")
                        .bind(q)
                        .fetch_one(&pool)
                        .await
                        .unwrap();
                row.0
            }
        };

        assert_eq!(count("fuses").await, 1);

        sqlx::query("UPDATE items SET comment = 'red crate'")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(count("blue").await, 0);
        assert_eq!(count("red").await, 1);

        sqlx::query("DELETE FROM items").execute(&pool).await.unwrap();
        assert_eq!(count("fuses").await, 0);
    }

    #[tokio::test]
    async fn rebuild_indexes_rows_that_predate_fts() {
        let (_dir, pool) = fresh_pool().await;

        // Apply only the core schema, insert a row, then the rest.
        sqlx::query(MIGRATIONS_TABLE).execute(&pool).await.unwrap();
        apply(&pool, &MIGRATIONS[0]).await.unwrap();
        sqlx::query(
            "INSERT INTO items (name, creation_date, last_update) VALUES ('old ladder', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(run(&pool).await.unwrap(), vec![2, 3]);

        let hits: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM items_fts WHERE items_fts MATCH 'ladder'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(hits.0, 1);
    }
}
