use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub percent: f64,
    pub label: String,
    pub visible: bool,
    /// True while the periodic tick is scheduled.
    pub running: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0.0,
            label: String::new(),
            visible: false,
            running: false,
        }
    }
}
