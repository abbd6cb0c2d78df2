use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::media::ImagePayload;
use crate::workflow::state::PredictionResult;

/// Port over the classification backend. The workflow only ever talks to
/// this trait, so tests drive the orchestrator with scripted fakes.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Best-effort archival of a fresh capture. Response body is ignored.
    async fn upload_capture(&self, payload: ImagePayload) -> AppResult<()>;

    /// Classify an image.
    async fn predict(&self, payload: ImagePayload) -> AppResult<PredictionResult>;

    /// Fetch the treatment summary for a predicted disease label.
    async fn know_more(&self, disease: &str) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: String,
    image_path: String,
}

#[derive(Debug, Deserialize)]
struct KnowMoreResponse {
    summary: String,
}

/// HTTP client for the Agro Scan backend.
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn image_form(payload: ImagePayload, field_name: &str) -> AppResult<multipart::Form> {
        let part = multipart::Part::bytes(payload.bytes)
            .file_name(payload.file_name)
            .mime_str(&payload.mime_type)?;

        Ok(multipart::Form::new().part(field_name.to_string(), part))
    }

    /// Treat non-2xx uniformly as a backend error carrying the body text.
    async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::backend(status.as_u16(), error_text))
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn upload_capture(&self, payload: ImagePayload) -> AppResult<()> {
        let form = Self::image_form(payload, "file")?;

        let response = self
            .client
            .post(self.endpoint("/upload_capture"))
            .multipart(form)
            .send()
            .await?;

        Self::check_status(response).await?;
        log::debug!("Capture archived");
        Ok(())
    }

    async fn predict(&self, payload: ImagePayload) -> AppResult<PredictionResult> {
        let file_name = payload.file_name.clone();
        let form = Self::image_form(payload, "image")?;

        let response = self
            .client
            .post(self.endpoint("/predict"))
            .multipart(form)
            .send()
            .await?;

        let body: PredictResponse = Self::check_status(response).await?.json().await?;

        log::info!("Prediction for {}: {}", file_name, body.prediction);

        Ok(PredictionResult {
            label: body.prediction,
            annotated_image_ref: body.image_path,
        })
    }

    async fn know_more(&self, disease: &str) -> AppResult<String> {
        let response = self
            .client
            .post(self.endpoint("/know_more"))
            .json(&serde_json::json!({ "disease": disease }))
            .send()
            .await?;

        let body: KnowMoreResponse = Self::check_status(response).await?.json().await?;
        Ok(body.summary)
    }
}
