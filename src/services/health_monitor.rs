use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

use crate::models::event_types::UiEvent;
use crate::models::session_types::BackendStatus;
use crate::services::event_sink::EventSink;
use crate::services::inference_client::InferenceService;
use crate::services::scheduler::{FirstTick, ScheduledTask, Tick};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One bounded probe. Timeout, transport error and non-success all read as offline.
pub async fn probe(service: &dyn InferenceService, timeout: Duration) -> BackendStatus {
    match tokio::time::timeout(timeout, service.health()).await {
        Ok(Ok(())) => BackendStatus::Online,
        Ok(Err(e)) => {
            log_debug!("health probe failed: {}", e);
            BackendStatus::Offline
        }
        Err(_) => {
            log_debug!("health probe timed out after {:?}", timeout);
            BackendStatus::Offline
        }
    }
}

struct Shared {
    service: Arc<dyn InferenceService>,
    sink: Arc<dyn EventSink>,
    status_tx: watch::Sender<BackendStatus>,
}

impl Shared {
    async fn poll(&self) -> BackendStatus {
        let status = probe(self.service.as_ref(), PROBE_TIMEOUT).await;

        let previous = self.status_tx.send_replace(status);
        if previous != status {
            match status {
                BackendStatus::Offline => log_warn!("inference service is offline"),
                _ => log_info!("inference service is {:?}", status),
            }
        }

        self.sink.emit(UiEvent::BackendStatusChanged { status });
        status
    }
}

/// Polls the service in the background and keeps the status indicator current.
/// Shares nothing with the request controller.
#[derive(Clone)]
pub struct HealthMonitor {
    shared: Arc<Shared>,
    task: Arc<Mutex<Option<ScheduledTask>>>,
}

impl HealthMonitor {
    pub fn new(service: Arc<dyn InferenceService>, sink: Arc<dyn EventSink>) -> Self {
        let (status_tx, _) = watch::channel(BackendStatus::Unknown);
        Self {
            shared: Arc::new(Shared {
                service,
                sink,
                status_tx,
            }),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> BackendStatus {
        *self.shared.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BackendStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Probe once and publish the result.
    pub async fn poll(&self) -> BackendStatus {
        self.shared.poll().await
    }

    /// Poll now and then every [`POLL_INTERVAL`]. Restarts if already running.
    pub fn start(&self) {
        let shared = self.shared.clone();
        let task = ScheduledTask::periodic(POLL_INTERVAL, FirstTick::Immediate, move || {
            let shared = shared.clone();
            async move {
                shared.poll().await;
                Tick::Continue
            }
        });

        *self.slot() = Some(task);
    }

    pub fn stop(&self) {
        self.slot().take();
    }

    /// A panic while the slot was held leaves it poisoned; the slot is still usable.
    fn slot(&self) -> MutexGuard<'_, Option<ScheduledTask>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.slot()
            .as_ref()
            .map(|t| t.is_active())
            .unwrap_or(false)
    }
}
