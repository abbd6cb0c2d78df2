// Webcam-backed VideoBackend, compiled with the `webcam` feature.
//
// Desktop capture stacks expose indexed devices rather than a facing mode,
// so the facing preference from the constraints maps to the configured
// device index upstream; resolution preferences are honored here.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::camera::{RawFrame, StreamConstraints, VideoBackend, VideoStream};
use crate::errors::{AppError, AppResult};

pub struct NokhwaBackend {
    index: u32,
}

impl NokhwaBackend {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl VideoBackend for NokhwaBackend {
    fn open(&mut self, constraints: &StreamConstraints) -> AppResult<Box<dyn VideoStream>> {
        let requested = match (constraints.width, constraints.height) {
            (Some(width), Some(height)) => RequestedFormat::new::<RgbFormat>(
                RequestedFormatType::HighestResolution(Resolution::new(width, height)),
            ),
            _ => RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
        };

        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| AppError::device(e.to_string()))?;

        camera
            .open_stream()
            .map_err(|e| AppError::device(e.to_string()))?;

        log::info!("Opened webcam #{}", self.index);

        Ok(Box::new(NokhwaStream { camera }))
    }
}

struct NokhwaStream {
    camera: Camera,
}

impl VideoStream for NokhwaStream {
    fn grab(&mut self) -> AppResult<RawFrame> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| AppError::device(e.to_string()))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| AppError::device(e.to_string()))?;

        Ok(RawFrame {
            width: decoded.width(),
            height: decoded.height(),
            pixels: decoded.into_raw(),
        })
    }

    fn stop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Failed to stop webcam stream (non-critical): {}", e);
        }
    }
}
