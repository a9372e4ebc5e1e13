use serde::Serialize;

use super::intake_types::FileSummary;
use super::progress_types::ProgressState;
use super::result_types::DisplayStructure;
use super::session_types::{BackendStatus, Phase};

/// Everything the front end needs to redraw, one variant per change.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum UiEvent {
    FileSelected(FileSummary),
    FileRemoved,
    PreviewReady { data_uri: String },
    ErrorShown { message: String },
    ErrorCleared,
    ResultReady(DisplayStructure),
    ResultCleared,
    PhaseChanged { phase: Phase },
    ControlsChanged { enabled: bool },
    ProgressChanged(ProgressState),
    BackendStatusChanged { status: BackendStatus },
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::FileSelected(_) => "file-selected",
            UiEvent::FileRemoved => "file-removed",
            UiEvent::PreviewReady { .. } => "preview-ready",
            UiEvent::ErrorShown { .. } => "error-shown",
            UiEvent::ErrorCleared => "error-cleared",
            UiEvent::ResultReady(_) => "result-ready",
            UiEvent::ResultCleared => "result-cleared",
            UiEvent::PhaseChanged { .. } => "phase-changed",
            UiEvent::ControlsChanged { .. } => "controls-changed",
            UiEvent::ProgressChanged(_) => "progress-changed",
            UiEvent::BackendStatusChanged { .. } => "backend-status-changed",
        }
    }
}
