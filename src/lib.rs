pub mod config;
mod error;
pub mod models;
pub mod services;
mod utils;

use std::sync::Arc;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use models::event_types::UiEvent;
pub use models::intake_types::{FileSummary, ImageUpload, SelectedFile};
pub use models::progress_types::ProgressState;
pub use models::result_types::{DisplayStructure, ExplanationBlock, ResultPayload, XaiMethod};
pub use models::session_types::{BackendStatus, ControllerSnapshot, DisplayState, Mode, Phase};
pub use services::event_sink::{ChannelSink, EventSink, LogSink};
pub use services::health_monitor::HealthMonitor;
pub use services::inference_client::{HttpInferenceClient, InferenceService};
pub use services::request_controller::{RequestController, SubmitOutcome};
pub use utils::logging::init_logging;

/// Handles a front end holds for the lifetime of the app.
#[derive(Clone)]
pub struct AppState {
    pub controller: RequestController,
    pub health: HealthMonitor,
}

/// Wire the controller and health monitor to `service` and start polling.
/// Must be called from inside a tokio runtime.
pub fn start_with_service(service: Arc<dyn InferenceService>, sink: Arc<dyn EventSink>) -> AppState {
    let controller = RequestController::new(service.clone(), sink.clone());
    let health = HealthMonitor::new(service, sink);
    health.start();

    AppState { controller, health }
}

/// Start against the HTTP service at `config.api_base_url`.
pub fn run(config: AppConfig, sink: Arc<dyn EventSink>) -> AppState {
    log::info!("XRay Lense starting up, service at {}", config.api_base_url);
    start_with_service(Arc::new(HttpInferenceClient::new(config)), sink)
}
