//! Item endpoints
//!
//! Create and update take multipart forms so an image can ride along.
//! Image files are written before the row; when the database step fails
//! they are discarded again.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::repos::{ChildItem, ItemChanges, ItemRepo, ItemWithTags, NewItem, Tag};
use crate::http::error::ApiError;
use crate::http::extractors::{DbConn, IdPath, ItemTagPath};
use crate::http::form::{ItemForm, Upload};
use crate::http::server::AppState;
use crate::images::{ImageStore, StoredImage};
use crate::models::ItemName;

/// Item response
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item_id: i64,
    pub name: String,
    pub comment: Option<String>,
    pub label_id: Option<i64>,
    pub parent_item_id: Option<i64>,
    pub state_id: Option<i64>,
    pub image_lg_path: Option<String>,
    pub image_sm_path: Option<String>,
    pub creation_date: String,
    pub last_update: String,
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<i64>,
}

impl From<ItemWithTags> for ItemResponse {
    fn from(ItemWithTags { item, tags }: ItemWithTags) -> Self {
        Self {
            item_id: item.item_id,
            name: item.name,
            comment: item.comment,
            label_id: item.label_id,
            parent_item_id: item.parent_item_id,
            state_id: item.state_id,
            image_lg_path: item.image_lg_path,
            image_sm_path: item.image_sm_path,
            creation_date: item.creation_date.to_rfc3339(),
            last_update: item.last_update.to_rfc3339(),
            tags,
            children_count: None,
        }
    }
}

impl From<ChildItem> for ItemResponse {
    fn from(child: ChildItem) -> Self {
        Self {
            children_count: Some(child.children_count),
            ..Self::from(child.item)
        }
    }
}

fn respond_all(items: Vec<ItemWithTags>) -> Json<Vec<ItemResponse>> {
    Json(items.into_iter().map(ItemResponse::from).collect())
}

async fn store_upload(
    images: &ImageStore,
    upload: Option<Upload>,
) -> Result<Option<StoredImage>, ApiError> {
    match upload {
        Some(upload) => Ok(Some(images.store(&upload.filename, &upload.bytes).await?)),
        None => Ok(None),
    }
}

/// POST /items/ - create an item (multipart)
async fn create_item(
    State(state): State<Arc<AppState>>,
    DbConn(mut conn): DbConn,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let form = ItemForm::from_multipart(multipart).await?;
    let name = ItemName::new(form.name.as_deref().unwrap_or_default())?;
    let image = store_upload(&state.images, form.image).await?;

    let new = NewItem {
        name,
        comment: form.comment,
        label_id: form.label_id,
        parent_item_id: form.parent_item_id,
        state_id: form.state_id,
        image: image.clone(),
    };

    match ItemRepo::new(&mut conn).create(new).await {
        Ok(item) => Ok((StatusCode::CREATED, Json(ItemResponse::from(item)))),
        Err(e) => {
            if let Some(image) = &image {
                state.images.discard(image).await;
            }
            Err(e.into())
        }
    }
}

/// GET /items/ - every item
async fn list_items(DbConn(mut conn): DbConn) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = ItemRepo::new(&mut conn).list().await?;
    Ok(respond_all(items))
}

/// GET /items/{item_id}
async fn get_item(
    DbConn(mut conn): DbConn,
    IdPath(item_id): IdPath,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = ItemRepo::new(&mut conn).get(item_id).await?;
    Ok(Json(ItemResponse::from(item)))
}

/// PUT /items/{item_id} - partial update (multipart)
async fn update_item(
    State(state): State<Arc<AppState>>,
    DbConn(mut conn): DbConn,
    IdPath(item_id): IdPath,
    multipart: Multipart,
) -> Result<Json<ItemResponse>, ApiError> {
    let form = ItemForm::from_multipart(multipart).await?;
    let name = form.name.as_deref().map(ItemName::new).transpose()?;
    let image = store_upload(&state.images, form.image).await?;

    let changes = ItemChanges {
        name,
        comment: form.comment,
        label_id: form.label_id,
        parent_item_id: form.parent_item_id,
        state_id: form.state_id,
        image: image.clone(),
    };

    match ItemRepo::new(&mut conn).update(item_id, changes).await {
        Ok((item, previous)) => {
            if image.is_some() {
                state.images.remove(&previous.image_paths()).await;
            }
            Ok(Json(ItemResponse::from(item)))
        }
        Err(e) => {
            if let Some(image) = &image {
                state.images.discard(image).await;
            }
            Err(e.into())
        }
    }
}

/// DELETE /items/{item_id}
async fn delete_item(
    State(state): State<Arc<AppState>>,
    DbConn(mut conn): DbConn,
    IdPath(item_id): IdPath,
) -> Result<Json<Value>, ApiError> {
    let item = ItemRepo::new(&mut conn).delete(item_id).await?;
    state.images.remove(&item.image_paths()).await;

    Ok(Json(json!({ "detail": "Item deleted" })))
}

/// GET /items/label/{label_id}
async fn items_by_label(
    DbConn(mut conn): DbConn,
    IdPath(label_id): IdPath,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = ItemRepo::new(&mut conn).by_label(label_id).await?;
    Ok(respond_all(items))
}

/// GET /items/by-tag/{tag_name}
async fn items_by_tag(
    DbConn(mut conn): DbConn,
    Path(tag_name): Path<String>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = ItemRepo::new(&mut conn).by_tag_name(&tag_name).await?;
    Ok(respond_all(items))
}

/// POST /items/{item_id}/tags/{tag_id}
async fn add_tag(
    DbConn(mut conn): DbConn,
    path: ItemTagPath,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = ItemRepo::new(&mut conn)
        .add_tag(path.item_id, path.tag_id)
        .await?;
    Ok(Json(ItemResponse::from(item)))
}

/// DELETE /items/{item_id}/tags/{tag_id}
async fn remove_tag(
    DbConn(mut conn): DbConn,
    path: ItemTagPath,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = ItemRepo::new(&mut conn)
        .remove_tag(path.item_id, path.tag_id)
        .await?;
    Ok(Json(ItemResponse::from(item)))
}

/// Item routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/items/", post(create_item).get(list_items))
        .route(
            "/items/{item_id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/items/label/{label_id}", get(items_by_label))
        .route("/items/by-tag/{tag_name}", get(items_by_tag))
        .route(
            "/items/{item_id}/tags/{tag_id}",
            post(add_tag).delete(remove_tag),
        )
}
