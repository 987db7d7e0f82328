//! State repository (read-only; rows are seeded by migrations)

use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::DbError;

/// State record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct State {
    pub state_id: i64,
    pub state_name: String,
}

pub struct StateRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StateRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&mut self) -> Result<Vec<State>, DbError> {
        let states = sqlx::query_as("SELECT state_id, state_name FROM states ORDER BY state_id")
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(states)
    }
}
