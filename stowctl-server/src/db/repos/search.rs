//! Full-text search over item name and comment
//!
//! Queries the `items_fts` external-content index maintained by triggers
//! (see `db::migrations`). Scores are negated bm25 so that higher means more
//! relevant.

use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::{DbError, Item};
use crate::models::SearchQuery;

/// A matching item row plus its relevance score
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SearchHit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: Item,
    pub score: f64,
}

pub struct SearchRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SearchRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Matching items, most relevant first.
    pub async fn search(&mut self, query: &SearchQuery) -> Result<Vec<SearchHit>, DbError> {
        let hits = sqlx::query_as(
            r#"
            SELECT i.item_id, i.label_id, i.parent_item_id, i.name, i.state_id, i.comment,
                   i.image_lg_path, i.image_sm_path, i.creation_date, i.last_update,
                   -bm25(items_fts) AS score
            FROM items_fts
            JOIN items i ON i.item_id = items_fts.rowid
            WHERE items_fts MATCH ?1
            ORDER BY score DESC, i.item_id
            "#,
        )
        .bind(query.as_str())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(hits)
    }
}
