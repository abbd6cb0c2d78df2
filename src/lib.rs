//! Agro Scan client workflow
//!
//! The client side of a plant-leaf disease scanner: acquire an image from a
//! file pick or a live camera, then sequence the backend calls
//! (archive upload, predict, treatment lookup) against observable state.
//!
//! - [`media`]: file picks and camera frames resolved into uniform assets
//! - [`camera`]: lifecycle of one live video stream, capture-to-still
//! - [`workflow`]: the HTTP client and the per-action request orchestration
//! - [`config`]: user configuration handling
//! - [`device`]: webcam backend (requires the `webcam` feature)

pub mod camera;
pub mod config;
#[cfg(feature = "webcam")]
pub mod device;
pub mod errors;
pub mod media;
pub mod workflow;

pub use camera::{CameraSession, CameraState, FacingMode, StreamConstraints};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{ImageAsset, SubmissionSlot};
pub use workflow::{BackendClient, Orchestrator, PredictionResult, RequestState, TreatmentInfo};
