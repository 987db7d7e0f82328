//! Hierarchy endpoints
//!
//! Two variants with identical responses: `children` counts grandchildren
//! with a LEFT JOIN + GROUP BY, `children_v2` with a correlated subquery.
//! A parent id of `0`, or no id at all, lists the root level.

use std::sync::Arc;

use axum::{routing::get, Json, Router};

use super::items::ItemResponse;
use crate::db::repos::items::ChildCount;
use crate::db::repos::ItemRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{DbConn, IdPath};
use crate::http::server::AppState;

/// Map the public parent id to the repository's notion of root.
fn parent_of(item_id: i64) -> Option<i64> {
    (item_id != 0).then_some(item_id)
}

async fn list_children(
    mut conn: DbConn,
    parent: Option<i64>,
    strategy: ChildCount,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let children = ItemRepo::new(&mut conn.0).children(parent, strategy).await?;
    Ok(Json(children.into_iter().map(ItemResponse::from).collect()))
}

/// GET /items/children/
async fn root_children(conn: DbConn) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_children(conn, None, ChildCount::Join).await
}

/// GET /items/children/{item_id}
async fn children(
    conn: DbConn,
    IdPath(item_id): IdPath,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_children(conn, parent_of(item_id), ChildCount::Join).await
}

/// GET /items/children_v2/
async fn root_children_v2(conn: DbConn) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_children(conn, None, ChildCount::Subquery).await
}

/// GET /items/children_v2/{item_id}
async fn children_v2(
    conn: DbConn,
    IdPath(item_id): IdPath,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    list_children(conn, parent_of(item_id), ChildCount::Subquery).await
}

/// Children routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/items/children/", get(root_children))
        .route("/items/children/{item_id}", get(children))
        .route("/items/children_v2/", get(root_children_v2))
        .route("/items/children_v2/{item_id}", get(children_v2))
}
