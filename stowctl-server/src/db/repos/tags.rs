//! Tag repository
//!
//! Tag names are not unique. Deleting a tag removes its item associations
//! first, inside the same transaction.

use serde::Serialize;
use sqlx::{Connection, FromRow, SqliteConnection};

use super::DbError;
use crate::models::TagName;

/// Tag record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Tag {
    pub tag_id: i64,
    pub tag_name: String,
}

/// Tag repository
pub struct TagRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TagRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a tag unconditionally (duplicate names allowed).
    pub async fn create(&mut self, name: TagName) -> Result<Tag, DbError> {
        let tag: Tag = sqlx::query_as(
            "INSERT INTO tags (tag_name) VALUES (?1) RETURNING tag_id, tag_name",
        )
        .bind(name.as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        tracing::info!(tag_id = tag.tag_id, "Created tag");
        Ok(tag)
    }

    pub async fn list(&mut self) -> Result<Vec<Tag>, DbError> {
        let tags = sqlx::query_as("SELECT tag_id, tag_name FROM tags ORDER BY tag_name, tag_id")
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(tags)
    }

    /// Delete a tag and all its item associations.
    ///
    /// If the tag doesn't exist the transaction is rolled back and
    /// `NotFound` is returned.
    pub async fn delete(&mut self, tag_id: i64) -> Result<(), DbError> {
        let mut tx = self.conn.begin().await?;

        let unlinked = sqlx::query("DELETE FROM item_tags WHERE tag_id = ?1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM tags WHERE tag_id = ?1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(DbError::not_found("Tag", tag_id));
        }

        tx.commit().await?;
        tracing::info!(tag_id, unlinked_items = unlinked, "Deleted tag");
        Ok(())
    }
}
