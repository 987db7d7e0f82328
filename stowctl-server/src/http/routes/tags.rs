//! Tag endpoints

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::repos::{Tag, TagRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{DbConn, IdPath};
use crate::http::server::AppState;
use crate::models::TagName;

/// Create tag request
#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub tag_name: String,
}

/// POST /tags/ - create a tag. Duplicate names are allowed.
async fn create_tag(
    DbConn(mut conn): DbConn,
    Json(req): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let name = TagName::new(&req.tag_name)?;
    let tag = TagRepo::new(&mut conn).create(name).await?;

    Ok((StatusCode::CREATED, Json(tag)))
}

/// GET /tags/
async fn list_tags(DbConn(mut conn): DbConn) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = TagRepo::new(&mut conn).list().await?;
    Ok(Json(tags))
}

/// DELETE /tags/{tag_id} - delete a tag and its item associations
async fn delete_tag(
    DbConn(mut conn): DbConn,
    IdPath(tag_id): IdPath,
) -> Result<Json<Value>, ApiError> {
    TagRepo::new(&mut conn).delete(tag_id).await?;
    Ok(Json(json!({ "detail": "Tag deleted" })))
}

/// Tag routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags/", post(create_tag).get(list_tags))
        .route("/tags/{tag_id}", delete(delete_tag))
}

