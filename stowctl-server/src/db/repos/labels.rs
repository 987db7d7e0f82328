//! Label repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::DbError;

/// Label record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Label {
    pub label_id: i64,
    pub creation_date: DateTime<Utc>,
}

/// Label repository
pub struct LabelRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> LabelRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self) -> Result<Label, DbError> {
        let label: Label = sqlx::query_as(
            "INSERT INTO labels (creation_date) VALUES (?1) RETURNING label_id, creation_date",
        )
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        tracing::info!(label_id = label.label_id, "Created label");
        Ok(label)
    }

    pub async fn list(&mut self) -> Result<Vec<Label>, DbError> {
        let labels = sqlx::query_as("SELECT label_id, creation_date FROM labels ORDER BY label_id")
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(labels)
    }

    pub async fn get(&mut self, label_id: i64) -> Result<Label, DbError> {
        sqlx::query_as("SELECT label_id, creation_date FROM labels WHERE label_id = ?1")
            .bind(label_id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Label", label_id))
    }
}
