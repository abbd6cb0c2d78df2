// Camera session manager
//
// Owns the lifecycle of one live video stream: acquire, preview, capture a
// still, release. The device itself sits behind the VideoBackend seam so the
// state machine is testable without hardware.

use crate::errors::{AppError, AppResult};
use crate::media::ImageAsset;

/// One uncompressed RGB8 frame as delivered by a backend.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB8, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Constraints for a stream request. `preferred` asks for the rear camera at
/// the configured resolution; `minimal` is the unconstrained fallback sent
/// when the preferred request is refused.
#[derive(Debug, Clone, Default)]
pub struct StreamConstraints {
    pub facing: Option<FacingMode>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StreamConstraints {
    pub fn preferred(width: u32, height: u32, facing: FacingMode) -> Self {
        Self {
            facing: Some(facing),
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn minimal() -> Self {
        Self::default()
    }
}

/// A live stream handle. `stop` must release every underlying track.
pub trait VideoStream: Send {
    fn grab(&mut self) -> AppResult<RawFrame>;
    fn stop(&mut self);
}

/// Port for acquiring streams from a device.
pub trait VideoBackend: Send {
    fn open(&mut self, constraints: &StreamConstraints) -> AppResult<Box<dyn VideoStream>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Closed,
    Requesting,
    Live,
}

/// Owns at most one live stream at a time.
///
/// The stream is released on every exit path: explicit `close`, any error
/// during `capture`, and drop.
pub struct CameraSession<B: VideoBackend> {
    backend: B,
    stream: Option<Box<dyn VideoStream>>,
    state: CameraState,
    capture_quality: u8,
}

impl<B: VideoBackend> CameraSession<B> {
    pub fn new(backend: B, capture_quality: u8) -> Self {
        Self {
            backend,
            stream: None,
            state: CameraState::Closed,
            capture_quality,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == CameraState::Live
    }

    /// Request a stream. On refusal (busy device, denied permission,
    /// unsupported constraint) retries once with a minimal unconstrained
    /// request; if that also fails the session stays `Closed` and the caller
    /// gets a device error carrying both causes.
    pub fn open(&mut self, constraints: &StreamConstraints) -> AppResult<()> {
        if self.state == CameraState::Live {
            log::debug!("Closing existing stream before reopening");
            self.close();
        }

        self.state = CameraState::Requesting;

        match self.backend.open(constraints) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = CameraState::Live;
                log::info!("Camera stream acquired");
                Ok(())
            }
            Err(first) => {
                log::warn!(
                    "Preferred camera request failed ({}), retrying unconstrained",
                    first
                );

                match self.backend.open(&StreamConstraints::minimal()) {
                    Ok(stream) => {
                        self.stream = Some(stream);
                        self.state = CameraState::Live;
                        log::info!("Camera stream acquired via fallback request");
                        Ok(())
                    }
                    Err(second) => {
                        self.state = CameraState::Closed;
                        log::error!("Fallback camera request also failed: {}", second);
                        Err(AppError::device(format!(
                            "{}; fallback attempt: {}",
                            first, second
                        )))
                    }
                }
            }
        }
    }

    /// Freeze the current frame into an [`ImageAsset`] and close the session.
    ///
    /// Capture is a transition, not an idempotent read: whatever happens the
    /// session ends `Closed` with the stream released.
    pub fn capture(&mut self) -> AppResult<ImageAsset> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(AppError::SessionNotLive),
        };

        let frame = match stream.grab() {
            Ok(frame) => frame,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let asset = match ImageAsset::from_capture(&frame, self.capture_quality) {
            Ok(asset) => asset,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        self.close();
        Ok(asset)
    }

    /// Stop every track of the held stream and clear the reference. Safe to
    /// call when already closed.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("Camera stream released");
        }
        self.state = CameraState::Closed;
    }
}

impl<B: VideoBackend> Drop for CameraSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}
