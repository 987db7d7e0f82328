//! Full-text search endpoint

use std::sync::Arc;

use axum::{extract::Query, routing::get, Json, Router};
use serde::Deserialize;

use crate::db::repos::{SearchHit, SearchRepo};
use crate::http::error::ApiError;
use crate::http::extractors::DbConn;
use crate::http::server::AppState;
use crate::models::SearchQuery;

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// GET /search/?query=... - flat item rows with a relevance score
async fn search(
    DbConn(mut conn): DbConn,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let query = SearchQuery::new(params.query.as_deref().unwrap_or_default())?;
    let hits = SearchRepo::new(&mut conn).search(&query).await?;

    tracing::debug!(query = %query.as_str(), hits = hits.len(), "Search");
    Ok(Json(hits))
}

/// Search routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search/", get(search))
}
