use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::intake_types::SelectedFile;
use crate::models::result_types::{PredictResponse, ResultPayload};
use crate::models::session_types::Mode;

/// Multipart field the service reads the image from.
pub const UPLOAD_FIELD: &str = "file";

/// The remote classifier, as seen by the controller and the health monitor.
pub trait InferenceService: Send + Sync {
    /// Reachability check. Any `Ok` means the service answered with success.
    fn health(&self) -> BoxFuture<'_, Result<(), AppError>>;

    fn infer<'a>(
        &'a self,
        mode: Mode,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<ResultPayload, AppError>>;
}

#[derive(Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    config: AppConfig,
}

impl HttpInferenceClient {
    pub fn new(config: AppConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: AppConfig) -> Self {
        Self { client, config }
    }

    async fn get_health(&self) -> Result<(), AppError> {
        let url = self.config.endpoint("health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::probe_failed(format!("Health probe to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::probe_failed(format!(
                "Health probe to {} returned HTTP {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }

    async fn post_image(&self, mode: Mode, file: &SelectedFile) -> Result<ResultPayload, AppError> {
        let url = self.config.endpoint(mode.endpoint());

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|e| AppError::submission_failed(format!("Invalid media type {}: {}", file.media_type, e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::submission_failed(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::submission_failed(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            AppError::submission_failed(format!("Failed to parse response from {}: {}", url, e))
        })?;

        Ok(ResultPayload::from(body))
    }
}

impl InferenceService for HttpInferenceClient {
    fn health(&self) -> BoxFuture<'_, Result<(), AppError>> {
        self.get_health().boxed()
    }

    fn infer<'a>(
        &'a self,
        mode: Mode,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<ResultPayload, AppError>> {
        self.post_image(mode, file).boxed()
    }
}
