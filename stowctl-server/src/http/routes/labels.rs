//! Label endpoints

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db::repos::{Label, LabelRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{DbConn, IdPath};
use crate::http::server::AppState;

/// Label response
#[derive(Serialize)]
pub struct LabelResponse {
    pub label_id: i64,
    pub creation_date: String,
}

impl From<Label> for LabelResponse {
    fn from(l: Label) -> Self {
        Self {
            label_id: l.label_id,
            creation_date: l.creation_date.to_rfc3339(),
        }
    }
}

/// POST /labels/ - create a label
async fn create_label(
    DbConn(mut conn): DbConn,
) -> Result<(StatusCode, Json<LabelResponse>), ApiError> {
    let label = LabelRepo::new(&mut conn).create().await?;
    Ok((StatusCode::CREATED, Json(LabelResponse::from(label))))
}

/// GET /labels/
async fn list_labels(DbConn(mut conn): DbConn) -> Result<Json<Vec<LabelResponse>>, ApiError> {
    let labels = LabelRepo::new(&mut conn).list().await?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

/// GET /labels/{label_id}
async fn get_label(
    DbConn(mut conn): DbConn,
    IdPath(label_id): IdPath,
) -> Result<Json<LabelResponse>, ApiError> {
    let label = LabelRepo::new(&mut conn).get(label_id).await?;
    Ok(Json(LabelResponse::from(label)))
}

/// Label routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/labels/", get(list_labels).post(create_label))
        .route("/labels/{label_id}", get(get_label))
}
