//! State endpoints - the seeded, read-only status list

use std::sync::Arc;

use axum::{routing::get, Json, Router};

use crate::db::repos::{State, StateRepo};
use crate::http::error::ApiError;
use crate::http::extractors::DbConn;
use crate::http::server::AppState;

/// GET /states/
async fn list_states(DbConn(mut conn): DbConn) -> Result<Json<Vec<State>>, ApiError> {
    let states = StateRepo::new(&mut conn).list().await?;
    Ok(Json(states))
}

/// State routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/states/", get(list_states))
}
