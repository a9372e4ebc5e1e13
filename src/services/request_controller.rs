use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::event_types::UiEvent;
use crate::models::intake_types::{ImageUpload, SelectedFile};
use crate::models::result_types::{DisplayStructure, ResultPayload};
use crate::models::session_types::{ControllerSnapshot, DisplayState, Mode, Phase};
use crate::services::event_sink::EventSink;
use crate::services::file_intake;
use crate::services::inference_client::InferenceService;
use crate::services::progress_simulator::ProgressSimulator;
use crate::services::result_renderer;
use crate::services::thumbnail_service;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Pause between the bar hitting 100% and the result appearing.
pub const RESULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

pub const SUBMISSION_FAILED_MESSAGE: &str = "Analysis failed. Please check that the server is running and try again.";

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// No file selected, or another request still in flight.
    Ignored,
    Succeeded(DisplayStructure),
    Failed(AppError),
    /// The file was removed or replaced while the request was out.
    Abandoned,
}

#[derive(Debug, Clone)]
struct ProcessingSession {
    id: u64,
    mode: Mode,
    started_at: Instant,
    abandoned: bool,
}

#[derive(Default)]
struct ControllerState {
    phase: Phase,
    selected: Option<SelectedFile>,
    session: Option<ProcessingSession>,
    display: DisplayState,
    /// Bumped on every select/remove; previews from older selections are dropped.
    selection_seq: u64,
}

impl ControllerState {
    fn abandon_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if !session.abandoned {
                log_info!(
                    "session {} ({}) abandoned; its response will not be shown",
                    session.id,
                    session.mode
                );
            }
            session.abandoned = true;
        }
    }

    /// The session still owns the UI: it is current and was not abandoned.
    fn is_live(&self, session_id: u64) -> bool {
        self.session
            .as_ref()
            .map(|s| s.id == session_id && !s.abandoned)
            .unwrap_or(false)
    }
}

/// Owns the in-flight flag for one `submit` call. Created as soon as the flag
/// is claimed, so every exit path releases it, including a panic or a dropped
/// `submit` future. A session dropped before it finished is torn down first:
/// the bar is cancelled and the phase goes back to `Selected`.
struct BusyGuard {
    controller: RequestController,
    controls_disabled: bool,
    open_session: Option<u64>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let controls_disabled = self.controls_disabled;
        let controller = self.controller.clone();

        match (self.open_session.take(), tokio::runtime::Handle::try_current()) {
            (Some(session_id), Ok(handle)) => {
                handle.spawn(async move {
                    controller.teardown_interrupted(session_id).await;
                    controller.release(controls_disabled);
                });
            }
            _ => controller.release(controls_disabled),
        }
    }
}

/// Drives one image through the remote classifier at a time.
#[derive(Clone)]
pub struct RequestController {
    service: Arc<dyn InferenceService>,
    sink: Arc<dyn EventSink>,
    progress: ProgressSimulator,
    busy: Arc<AtomicBool>,
    state: Arc<Mutex<ControllerState>>,
    next_session_id: Arc<AtomicU64>,
}

impl RequestController {
    pub fn new(service: Arc<dyn InferenceService>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            service,
            progress: ProgressSimulator::new(sink.clone()),
            sink,
            busy: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ControllerState::default())),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> &ProgressSimulator {
        &self.progress
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let progress = self.progress.snapshot().await;
        let state = self.state.lock().await;
        ControllerSnapshot {
            phase: state.phase,
            selected: state.selected.as_ref().map(|f| f.summary()),
            busy: self.is_busy(),
            progress,
            display: state.display.clone(),
        }
    }

    /// Validate and adopt a new image. On rejection the message is shown and
    /// the previous selection, if any, stays in place.
    pub async fn select_file(&self, upload: ImageUpload) -> Result<(), AppError> {
        let file = match file_intake::validate(upload) {
            Ok(file) => file,
            Err(err) => {
                log_warn!("rejected upload: {}", err);
                self.state.lock().await.display.error = Some(err.message.clone());
                self.sink.emit(UiEvent::ErrorShown {
                    message: err.message.clone(),
                });
                return Err(err);
            }
        };

        let summary = file.summary();
        let bytes = file.bytes.clone();
        let (seq, had_session) = {
            let mut state = self.state.lock().await;
            let had_session = state.session.as_ref().map(|s| !s.abandoned).unwrap_or(false);
            state.abandon_session();
            state.selected = Some(file);
            state.display = DisplayState::default();
            state.phase = Phase::Selected;
            state.selection_seq += 1;
            (state.selection_seq, had_session)
        };

        if had_session {
            self.progress.cancel().await;
        }

        log_info!("selected {} ({}, {} bytes)", summary.name, summary.media_type, summary.size);
        self.sink.emit(UiEvent::FileSelected(summary));
        self.sink.emit(UiEvent::ErrorCleared);
        self.sink.emit(UiEvent::ResultCleared);
        self.sink.emit(UiEvent::PhaseChanged {
            phase: Phase::Selected,
        });

        self.spawn_preview(seq, bytes);
        Ok(())
    }

    fn spawn_preview(&self, seq: u64, bytes: Vec<u8>) {
        let state = self.state.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            let preview = tokio::task::spawn_blocking(move || thumbnail_service::generate_preview(&bytes))
                .await
                .map_err(|e| AppError::from(format!("Preview task failed: {}", e)))
                .and_then(|result| result);

            match preview {
                Ok(data_uri) => {
                    let mut state = state.lock().await;
                    if state.selection_seq != seq {
                        return;
                    }
                    state.display.preview = Some(data_uri.clone());
                    sink.emit(UiEvent::PreviewReady { data_uri });
                }
                Err(e) => log_warn!("could not build preview: {}", e),
            }
        });
    }

    /// Drop the selected image and everything shown for it. Idempotent.
    pub async fn remove_file(&self) {
        {
            let mut state = self.state.lock().await;
            state.abandon_session();
            state.selected = None;
            state.display = DisplayState::default();
            state.phase = Phase::Idle;
            state.selection_seq += 1;
        }

        self.progress.cancel().await;

        self.sink.emit(UiEvent::FileRemoved);
        self.sink.emit(UiEvent::ErrorCleared);
        self.sink.emit(UiEvent::ResultCleared);
        self.sink.emit(UiEvent::PhaseChanged { phase: Phase::Idle });
    }

    /// Send the selected image to the service and show the outcome.
    ///
    /// Without a selected file, or while another request is in flight, this
    /// does nothing and returns [`SubmitOutcome::Ignored`].
    pub async fn submit(&self, mode: Mode) -> SubmitOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log_info!("{} request ignored: another request is in flight", mode);
            return SubmitOutcome::Ignored;
        }

        let mut guard = BusyGuard {
            controller: self.clone(),
            controls_disabled: false,
            open_session: None,
        };

        let (session_id, file) = {
            let mut state = self.state.lock().await;
            let Some(file) = state.selected.clone() else {
                log_info!("{} request ignored: no file selected", mode);
                return SubmitOutcome::Ignored;
            };

            let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            state.session = Some(ProcessingSession {
                id,
                mode,
                started_at: Instant::now(),
                abandoned: false,
            });
            state.display.clear_outcome();
            state.phase = Phase::Submitting;
            guard.open_session = Some(id);
            guard.controls_disabled = true;
            (id, file)
        };

        self.sink.emit(UiEvent::ControlsChanged { enabled: false });
        self.sink.emit(UiEvent::ErrorCleared);
        self.sink.emit(UiEvent::ResultCleared);
        self.sink.emit(UiEvent::PhaseChanged {
            phase: Phase::Submitting,
        });
        log_info!(
            "session {}: sending {} ({} bytes) to /{}",
            session_id,
            file.name,
            file.size,
            mode.endpoint()
        );

        self.progress.start(mode.estimated_duration()).await;

        let outcome = match self.service.infer(mode, &file).await {
            Ok(payload) => self.on_success(session_id, mode, payload).await,
            Err(err) => self.on_failure(session_id, err).await,
        };

        self.end_session(session_id).await;
        guard.open_session = None;
        outcome
    }

    async fn on_success(&self, session_id: u64, mode: Mode, payload: ResultPayload) -> SubmitOutcome {
        if !self.state.lock().await.is_live(session_id) {
            return SubmitOutcome::Abandoned;
        }

        self.progress.finish().await;
        {
            let mut state = self.state.lock().await;
            if !state.is_live(session_id) {
                return SubmitOutcome::Abandoned;
            }
            state.phase = Phase::Succeeded;
        }
        self.sink.emit(UiEvent::PhaseChanged {
            phase: Phase::Succeeded,
        });

        tokio::time::sleep(RESULT_SETTLE_DELAY).await;

        let display = result_renderer::render(&payload, mode);
        let mut state = self.state.lock().await;
        if !state.is_live(session_id) {
            return SubmitOutcome::Abandoned;
        }
        state.display.result = Some(display.clone());
        self.sink.emit(UiEvent::ResultReady(display.clone()));

        if let Some(session) = state.session.as_ref() {
            log_info!(
                "session {}: {} ({}) in {:?}",
                session_id,
                display.predicted_class,
                display.confidence_label,
                session.started_at.elapsed()
            );
        }
        SubmitOutcome::Succeeded(display)
    }

    async fn on_failure(&self, session_id: u64, err: AppError) -> SubmitOutcome {
        log_error!("session {}: {}", session_id, err);

        {
            let mut state = self.state.lock().await;
            if !state.is_live(session_id) {
                return SubmitOutcome::Abandoned;
            }
            state.phase = Phase::Failed;
            state.display.error = Some(SUBMISSION_FAILED_MESSAGE.to_string());
        }

        self.progress.cancel().await;
        self.sink.emit(UiEvent::PhaseChanged { phase: Phase::Failed });
        self.sink.emit(UiEvent::ErrorShown {
            message: SUBMISSION_FAILED_MESSAGE.to_string(),
        });

        SubmitOutcome::Failed(err)
    }

    async fn end_session(&self, session_id: u64) {
        let mut state = self.state.lock().await;
        if state.session.as_ref().map(|s| s.id) == Some(session_id) {
            state.session = None;
        }
    }

    /// Clean up after a `submit` that was dropped before reaching an outcome.
    async fn teardown_interrupted(&self, session_id: u64) {
        let restored = {
            let mut state = self.state.lock().await;
            if state.session.as_ref().map(|s| s.id) != Some(session_id) {
                return;
            }
            let live = state.is_live(session_id);
            state.session = None;

            let unfinished = state.phase == Phase::Submitting
                || (state.phase == Phase::Succeeded && state.display.result.is_none());
            if live && unfinished {
                state.phase = Phase::Selected;
            }
            live && unfinished
        };

        if restored {
            log_warn!("session {} dropped before completing", session_id);
            self.progress.cancel().await;
            self.sink.emit(UiEvent::PhaseChanged {
                phase: Phase::Selected,
            });
        }
    }

    fn release(&self, controls_disabled: bool) {
        self.busy.store(false, Ordering::Release);
        if controls_disabled {
            self.sink.emit(UiEvent::ControlsChanged { enabled: true });
        }
    }
}
