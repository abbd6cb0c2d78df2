// MediaSource resolver - turns file picks and camera frames into a uniform
// ImageAsset ready for upload, with a releasable preview handle.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::camera::RawFrame;
use crate::errors::{AppError, AppResult};

/// The uploadable part of an asset. Cloned freely so detached upload tasks
/// can own their own copy.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Opaque display reference for the currently previewed image.
///
/// The real display surface lives in whatever front end consumes the
/// workflow; the handle only tracks release so superseded previews are
/// never leaked. Released explicitly when replaced, or on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    released: Arc<AtomicBool>,
}

impl PreviewHandle {
    fn new() -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Observation point that outlives the handle itself.
    pub fn watch(&self) -> PreviewWatch {
        PreviewWatch(Arc::clone(&self.released))
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone)]
pub struct PreviewWatch(Arc<AtomicBool>);

impl PreviewWatch {
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Uniform representation of an image regardless of source.
#[derive(Debug)]
pub struct ImageAsset {
    payload: ImagePayload,
    preview: PreviewHandle,
}

impl ImageAsset {
    /// Resolve an asset from a picked file.
    ///
    /// No content validation happens here; anything the picker yields is
    /// accepted and invalid content is reported by the backend instead.
    pub async fn from_file(path: &str) -> AppResult<ImageAsset> {
        if !Path::new(path).exists() {
            return Err(AppError::file_not_found(path));
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = Path::new(path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let mime_type = mime_for_path(path).to_string();

        log::debug!(
            "Resolved file asset {} ({}, {} bytes)",
            file_name,
            mime_type,
            bytes.len()
        );

        Ok(ImageAsset {
            payload: ImagePayload {
                file_name,
                mime_type,
                bytes,
            },
            preview: PreviewHandle::new(),
        })
    }

    /// Resolve an asset from a captured camera frame.
    ///
    /// The frame is encoded as JPEG at the given quality and named with a
    /// millisecond timestamp so repeated captures never collide.
    pub fn from_capture(frame: &RawFrame, quality: u8) -> AppResult<ImageAsset> {
        let mut encoded = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
        encoder.encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )?;

        let file_name = format!("capture-{}.jpg", chrono::Utc::now().timestamp_millis());

        log::debug!(
            "Encoded {}x{} capture into {} ({} bytes)",
            frame.width,
            frame.height,
            file_name,
            encoded.len()
        );

        Ok(ImageAsset {
            payload: ImagePayload {
                file_name,
                mime_type: "image/jpeg".to_string(),
                bytes: encoded,
            },
            preview: PreviewHandle::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.payload.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.payload.mime_type
    }

    pub fn payload(&self) -> ImagePayload {
        self.payload.clone()
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }
}

/// Holds the current submission. Installing a new asset releases the
/// previous preview handle before the replacement takes its place.
#[derive(Debug, Default)]
pub struct SubmissionSlot {
    current: Option<ImageAsset>,
}

impl SubmissionSlot {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn install(&mut self, asset: ImageAsset) {
        if let Some(previous) = self.current.take() {
            previous.preview.release();
            log::debug!("Released superseded preview for {}", previous.file_name());
        }
        self.current = Some(asset);
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.preview.release();
        }
    }

    pub fn current(&self) -> Option<&ImageAsset> {
        self.current.as_ref()
    }

    pub fn payload(&self) -> Option<ImagePayload> {
        self.current.as_ref().map(ImageAsset::payload)
    }
}

/// Detect MIME type based on file extension
fn mime_for_path(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> RawFrame {
        RawFrame {
            width: 2,
            height: 2,
            pixels: vec![0u8; 2 * 2 * 3],
        }
    }

    #[test]
    fn mime_inference_follows_extension() {
        assert_eq!(mime_for_path("leaf.jpg"), "image/jpeg");
        assert_eq!(mime_for_path("leaf.jpeg"), "image/jpeg");
        assert_eq!(mime_for_path("leaf.png"), "image/png");
        assert_eq!(mime_for_path("leaf.webp"), "image/webp");
        assert_eq!(mime_for_path("leaf"), "application/octet-stream");
    }

    #[test]
    fn capture_is_named_with_timestamp_and_encoded_as_jpeg() {
        let asset = ImageAsset::from_capture(&test_frame(), 95).unwrap();

        assert!(asset.file_name().starts_with("capture-"));
        assert!(asset.file_name().ends_with(".jpg"));
        assert_eq!(asset.mime_type(), "image/jpeg");
        // JPEG SOI marker
        assert_eq!(&asset.payload().bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn repeated_captures_produce_one_asset_each() {
        let first = ImageAsset::from_capture(&test_frame(), 95).unwrap();
        let second = ImageAsset::from_capture(&test_frame(), 95).unwrap();

        assert!(!first.preview().is_released());
        assert!(!second.preview().is_released());
    }

    #[test]
    fn installing_a_new_asset_releases_the_previous_preview() {
        let mut slot = SubmissionSlot::new();

        let first = ImageAsset::from_capture(&test_frame(), 95).unwrap();
        let first_watch = first.preview().watch();
        slot.install(first);
        assert!(!first_watch.is_released());

        let second = ImageAsset::from_capture(&test_frame(), 95).unwrap();
        let second_watch = second.preview().watch();
        slot.install(second);

        assert!(first_watch.is_released());
        assert!(!second_watch.is_released());
    }

    #[test]
    fn clearing_the_slot_releases_the_preview() {
        let mut slot = SubmissionSlot::new();
        let asset = ImageAsset::from_capture(&test_frame(), 95).unwrap();
        let watch = asset.preview().watch();
        slot.install(asset);

        slot.clear();
        assert!(watch.is_released());
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn from_file_reads_bytes_and_infers_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let asset = ImageAsset::from_file(&path.to_string_lossy()).await.unwrap();
        assert_eq!(asset.file_name(), "leaf.jpg");
        assert_eq!(asset.mime_type(), "image/jpeg");
        assert_eq!(asset.payload().bytes, b"not really a jpeg");
    }

    #[tokio::test]
    async fn from_file_reports_missing_files() {
        let result = ImageAsset::from_file("definitely_does_not_exist.png").await;
        assert!(matches!(result, Err(AppError::FileNotFound { .. })));
    }
}
