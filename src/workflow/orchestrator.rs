use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::media::{ImageAsset, SubmissionSlot};
use crate::workflow::backend_client::BackendApi;
use crate::workflow::state::{ActionGate, PredictionResult, RequestState, TreatmentInfo};

/// Placeholder shown instead of an empty field when the lookup fails.
const TREATMENT_FALLBACK: &str = "Sorry, something went wrong. Please try again.";

/// Sequences upload, predict and know-more calls against observable state.
///
/// Each action carries its own [`RequestState`] gate, so overlapping
/// submissions of the same kind are rejected while the three actions stay
/// mutually independent. The capture upload is a best-effort side channel:
/// it runs detached and its failure never touches prediction state.
pub struct Orchestrator {
    api: Arc<dyn BackendApi>,
    slot: SubmissionSlot,
    prediction: Option<PredictionResult>,
    treatment: TreatmentInfo,
    last_error: Option<String>,
    predict_gate: ActionGate,
    treatment_gate: ActionGate,
    capture_gate: ActionGate,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self {
            api,
            slot: SubmissionSlot::new(),
            prediction: None,
            treatment: TreatmentInfo::Absent,
            last_error: None,
            predict_gate: ActionGate::new("predict"),
            treatment_gate: ActionGate::new("know-more"),
            capture_gate: ActionGate::new("upload-capture"),
        }
    }

    /// Install a picked file as the current submission.
    pub async fn select_file(&mut self, path: &str) -> AppResult<()> {
        let asset = ImageAsset::from_file(path).await?;
        self.slot.install(asset);
        Ok(())
    }

    /// Install a camera capture and fire the best-effort archive upload.
    ///
    /// The upload runs on a detached task; failure is logged and swallowed.
    pub fn adopt_capture(&mut self, asset: ImageAsset) {
        let payload = asset.payload();
        self.slot.install(asset);

        if let Err(e) = self.capture_gate.try_begin(RequestState::Submitting) {
            log::warn!("Skipping capture archive upload: {}", e);
            return;
        }

        let api = Arc::clone(&self.api);
        let gate = self.capture_gate.clone();
        let file_name = payload.file_name.clone();

        tokio::spawn(async move {
            if let Err(e) = api.upload_capture(payload).await {
                log::warn!("Capture archive upload failed (non-critical): {}", e);
            } else {
                log::info!("Capture {} archived", file_name);
            }
            gate.finish();
        });
    }

    /// Submit the current image for classification.
    ///
    /// On success the stored prediction is replaced wholesale and any stale
    /// treatment summary is cleared. On failure the prior prediction is left
    /// untouched and the error is surfaced. The gate returns to idle on both
    /// paths.
    pub async fn predict(&mut self) -> AppResult<PredictionResult> {
        let payload = self.slot.payload().ok_or(AppError::NoImage)?;

        self.predict_gate.try_begin(RequestState::Submitting)?;
        let outcome = self.api.predict(payload).await;
        self.predict_gate.finish();

        match outcome {
            Ok(result) => {
                log::info!("Detected condition: {}", result.label);
                self.prediction = Some(result.clone());
                self.treatment = TreatmentInfo::Absent;
                self.last_error = None;
                Ok(result)
            }
            Err(e) => {
                log::error!("Prediction failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the treatment summary for the current prediction.
    ///
    /// The previous summary is cleared before the request goes out so stale
    /// text never shows beside a loading state. Keyed by the prediction
    /// label: a response that comes back after the prediction changed is
    /// discarded rather than installed.
    pub async fn fetch_treatment(&mut self) -> AppResult<String> {
        let label = self
            .prediction
            .as_ref()
            .map(|p| p.label.clone())
            .ok_or(AppError::NoPrediction)?;

        self.treatment_gate.try_begin(RequestState::Fetching)?;
        self.treatment = TreatmentInfo::Pending;

        let outcome = self.api.know_more(&label).await;
        self.treatment_gate.finish();

        let still_current = self
            .prediction
            .as_ref()
            .map(|p| p.label == label)
            .unwrap_or(false);

        match outcome {
            Ok(summary) => {
                if still_current {
                    self.treatment = TreatmentInfo::Ready(summary.clone());
                } else {
                    log::debug!("Discarding stale treatment summary for {}", label);
                }
                Ok(summary)
            }
            Err(e) => {
                log::error!("Treatment lookup failed: {}", e);
                if still_current {
                    self.treatment = TreatmentInfo::Failed(TREATMENT_FALLBACK.to_string());
                }
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn has_image(&self) -> bool {
        self.slot.current().is_some()
    }

    pub fn current_asset(&self) -> Option<&ImageAsset> {
        self.slot.current()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn treatment(&self) -> &TreatmentInfo {
        &self.treatment
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn predict_state(&self) -> RequestState {
        self.predict_gate.state()
    }

    pub fn treatment_state(&self) -> RequestState {
        self.treatment_gate.state()
    }

    pub fn capture_upload_state(&self) -> RequestState {
        self.capture_gate.state()
    }
}
