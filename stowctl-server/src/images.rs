//! Image pipeline - validate, store original, write 80x80 derivative
//!
//! Files are named by a random UUID. Paths recorded on items are relative to
//! the server base directory (e.g. `static/images/<uuid>.png`), which is what
//! `/static` serves.

use std::io;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::ImageReader;
use thiserror::Error;
use uuid::Uuid;

use crate::config::IMAGES_DIR;

/// Thumbnail dimensions (exact, aspect ratio is not preserved)
pub const THUMBNAIL_WIDTH: u32 = 80;
pub const THUMBNAIL_HEIGHT: u32 = 80;

/// Accepted upload extensions. Matching is case-sensitive.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid file type: '{filename}'")]
    InvalidFileType { filename: String },

    #[error("image I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("image processing failed: {0}")]
    Processing(#[from] image::ImageError),

    #[error("image task failed: {0}")]
    Task(String),
}

/// Paths of a stored original and its thumbnail, relative to base_dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub large: String,
    pub small: String,
}

/// Check the upload's extension against the allow-list.
pub fn validate_extension(filename: &str) -> Result<&str, ImageError> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(ext))
        .ok_or_else(|| ImageError::InvalidFileType {
            filename: filename.to_owned(),
        })
}

/// Resize `source` to exactly `width`x`height` with Lanczos3 and write it to
/// `target`. The input format is sniffed from the file contents; the output
/// format follows the target extension.
pub fn resize(source: &Path, target: &Path, width: u32, height: u32) -> Result<(), ImageError> {
    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    img.resize_exact(width, height, FilterType::Lanczos3)
        .save(target)?;
    Ok(())
}

/// Writes uploads under `<base_dir>/static/images`
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_dir: PathBuf,
}

impl ImageStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.base_dir.join(IMAGES_DIR)
    }

    /// Absolute path for a stored relative path
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Validate, persist the original and generate the thumbnail.
    ///
    /// Nothing is written if the extension is rejected. If the thumbnail
    /// step fails the original is removed again.
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<StoredImage, ImageError> {
        let ext = validate_extension(filename)?;

        let id = Uuid::new_v4();
        let stored = StoredImage {
            large: format!("{IMAGES_DIR}/{id}.{ext}"),
            small: format!("{IMAGES_DIR}/{id}_sm.{ext}"),
        };
        let large = self.resolve(&stored.large);
        let small = self.resolve(&stored.small);

        tokio::fs::create_dir_all(self.images_dir()).await?;
        tokio::fs::write(&large, bytes).await?;

        let source = large.clone();
        let resized = tokio::task::spawn_blocking(move || {
            resize(&source, &small, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
        })
        .await
        .map_err(|e| ImageError::Task(e.to_string()))
        .and_then(|r| r);

        if let Err(e) = resized {
            self.remove(&[stored.large.as_str(), stored.small.as_str()])
                .await;
            return Err(e);
        }

        tracing::debug!(original = %stored.large, thumbnail = %stored.small, "Stored image");
        Ok(stored)
    }

    /// Compensating cleanup for an image whose row never got written.
    pub async fn discard(&self, image: &StoredImage) {
        tracing::warn!(original = %image.large, "Discarding image from failed mutation");
        self.remove(&[image.large.as_str(), image.small.as_str()])
            .await;
    }

    /// Best-effort removal of stored files; missing files are ignored.
    pub async fn remove(&self, relative_paths: &[&str]) {
        for relative in relative_paths {
            match tokio::fs::remove_file(self.resolve(relative)).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %relative, error = %e, "Failed to remove image file")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(validate_extension("a.png").unwrap(), "png");
        assert_eq!(validate_extension("photo.final.jpeg").unwrap(), "jpeg");
        assert_eq!(validate_extension("x.jpg").unwrap(), "jpg");

        for bad in ["a.gif", "a.PNG", "a.Jpg", "noext", "png", ""] {
            assert!(
                matches!(
                    validate_extension(bad),
                    Err(ImageError::InvalidFileType { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn store_writes_original_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.store("shelf.png", &png_bytes(300, 120)).await.unwrap();

        assert!(stored.large.starts_with("static/images/"));
        assert!(stored.large.ends_with(".png"));
        assert!(stored.small.ends_with("_sm.png"));

        let large = store.resolve(&stored.large);
        let small = store.resolve(&stored.small);
        assert_eq!(image::image_dimensions(&large).unwrap(), (300, 120));
        assert_eq!(image::image_dimensions(&small).unwrap(), (80, 80));
    }

    #[tokio::test]
    async fn decodes_by_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([10, 10, 10])))
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let stored = store.store("photo.png", &jpeg).await.unwrap();

        assert!(stored.small.ends_with("_sm.png"));
        let small = store.resolve(&stored.small);
        assert_eq!(image::image_dimensions(&small).unwrap(), (80, 80));
    }

    #[tokio::test]
    async fn rejected_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let err = store.store("anim.gif", b"GIF89a").await.unwrap_err();
        assert!(matches!(err, ImageError::InvalidFileType { .. }));
        assert!(!store.images_dir().exists());
    }

    #[tokio::test]
    async fn corrupt_image_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let err = store.store("broken.png", b"not a png").await.unwrap_err();
        assert!(matches!(err, ImageError::Processing(_)));
        assert_eq!(files_in(&store.images_dir()), 0);
    }

    #[tokio::test]
    async fn discard_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.store("a.png", &png_bytes(10, 10)).await.unwrap();
        assert_eq!(files_in(&store.images_dir()), 2);

        store.discard(&stored).await;
        assert_eq!(files_in(&store.images_dir()), 0);

        // second discard is a no-op
        store.discard(&stored).await;
    }
}
