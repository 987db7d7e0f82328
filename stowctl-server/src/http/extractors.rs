//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

use super::error::ApiError;
use super::server::AppState;
use crate::db::repos::DbError;
use crate::models::ValidationError;

/// Request-scoped database connection.
///
/// Checked out from the pool when the handler starts; returned to the pool
/// when the handler's future completes, whatever the outcome.
pub struct DbConn(pub PoolConnection<Sqlite>);

impl FromRequestParts<Arc<AppState>> for DbConn {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let conn = state.pool.acquire().await.map_err(DbError::from)?;
        Ok(Self(conn))
    }
}

/// Extract and validate a single integer id from the path
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<i64> = Path::from_request_parts(parts, state).await.map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "must be an integer",
            })
        })?;

        Ok(Self(id))
    }
}

/// Extract an `(item_id, tag_id)` pair from the path
pub struct ItemTagPath {
    pub item_id: i64,
    pub tag_id: i64,
}

impl<S> FromRequestParts<S> for ItemTagPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((item_id, tag_id)): Path<(i64, i64)> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                ApiError::Validation(ValidationError::InvalidFormat {
                    field: "id",
                    reason: "item and tag ids must be integers",
                })
            })?;

        Ok(Self { item_id, tag_id })
    }
}
