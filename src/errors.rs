use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera unavailable: {reason}")]
    Device { reason: String },

    #[error("Camera session is not live")]
    SessionNotLive,

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("No image selected")]
    NoImage,

    #[error("No prediction available yet")]
    NoPrediction,

    #[error("A {action} request is already in flight")]
    Busy { action: &'static str },

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn device(reason: impl Into<String>) -> Self {
        Self::Device {
            reason: reason.into(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn busy(action: &'static str) -> Self {
        Self::Busy { action }
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        Self::Config(format!("{}: {}", field, message))
    }

    /// Camera permission/availability failures. Surfaced to the user as an
    /// actionable alert after the automatic fallback attempt.
    pub fn is_device(&self) -> bool {
        matches!(self, AppError::Device { .. } | AppError::SessionNotLive)
    }

    /// Failed HTTP calls, transport or non-2xx alike.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Backend { .. })
    }
}
