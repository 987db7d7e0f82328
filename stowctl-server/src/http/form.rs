//! Multipart item form shared by create and update

use axum::body::Bytes;
use axum::extract::Multipart;

use super::error::ApiError;
use crate::models::ValidationError;

/// An uploaded file part
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw item fields as submitted. Every field is optional here; create
/// enforces `name` itself.
#[derive(Debug, Default)]
pub struct ItemForm {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub label_id: Option<i64>,
    pub parent_item_id: Option<i64>,
    pub state_id: Option<i64>,
    pub image: Option<Upload>,
}

impl ItemForm {
    /// Drain a multipart body. Unknown parts are ignored; a blank id field
    /// counts as absent, and an image part without a filename is no image.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match name.as_str() {
                "image" => {
                    let filename = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    if !filename.is_empty() {
                        form.image = Some(Upload { filename, bytes });
                    }
                }
                "name" => form.name = Some(field.text().await.map_err(bad_multipart)?),
                "comment" => form.comment = Some(field.text().await.map_err(bad_multipart)?),
                "label_id" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.label_id = parse_id("label_id", &text)?;
                }
                "parent_item_id" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.parent_item_id = parse_id("parent_item_id", &text)?;
                }
                "state_id" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.state_id = parse_id("state_id", &text)?;
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(e.body_text())
}

fn parse_id(field: &'static str, text: &str) -> Result<Option<i64>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| ValidationError::InvalidFormat {
            field,
            reason: "must be an integer",
        })
}
