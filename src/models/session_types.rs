use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::intake_types::FileSummary;
use super::progress_types::ProgressState;
use super::result_types::DisplayStructure;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Classify,
    Explain,
}

impl Mode {
    /// Path segment of the remote endpoint serving this mode.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Mode::Classify => "predict",
            Mode::Explain => "explain",
        }
    }

    /// Rough upstream latency, used to pace the simulated progress bar.
    /// Explanations run several attribution passes and are far slower.
    pub fn estimated_duration(&self) -> Duration {
        match self {
            Mode::Classify => Duration::from_millis(2_000),
            Mode::Explain => Duration::from_millis(35_000),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Classify => write!(f, "classify"),
            Mode::Explain => write!(f, "explain"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Selected,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BackendStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// What the front end currently shows below the upload area.
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub preview: Option<String>,
    pub result: Option<DisplayStructure>,
    pub error: Option<String>,
}

impl DisplayState {
    pub fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub phase: Phase,
    pub selected: Option<FileSummary>,
    pub busy: bool,
    pub progress: ProgressState,
    pub display: DisplayState,
}
