use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::session_types::Mode;

/// Attribution techniques the service may return, in display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum XaiMethod {
    GradCam,
    Shap,
    Lime,
}

impl XaiMethod {
    pub const ALL: [XaiMethod; 3] = [XaiMethod::GradCam, XaiMethod::Shap, XaiMethod::Lime];

    pub fn key(&self) -> &'static str {
        match self {
            XaiMethod::GradCam => "gradcam",
            XaiMethod::Shap => "shap",
            XaiMethod::Lime => "lime",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            XaiMethod::GradCam => "Grad-CAM",
            XaiMethod::Shap => "SHAP",
            XaiMethod::Lime => "LIME",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

/// Body returned by `/predict` and `/explain`.
#[derive(Debug, Deserialize, Clone)]
pub struct PredictResponse {
    pub predicted_class: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub xai: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultPayload {
    pub predicted_class: String,
    pub confidence_score: f64,
    /// Decoded PNG bytes per method. Keys are always canonical methods.
    pub explanations: BTreeMap<XaiMethod, Vec<u8>>,
}

impl From<PredictResponse> for ResultPayload {
    fn from(response: PredictResponse) -> Self {
        let mut explanations = BTreeMap::new();

        for (key, encoded) in response.xai.unwrap_or_default() {
            let Some(method) = XaiMethod::from_key(&key) else {
                log::debug!("ignoring unknown explanation method '{}'", key);
                continue;
            };
            match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
                Ok(bytes) => {
                    explanations.insert(method, bytes);
                }
                Err(e) => log::warn!("dropping {} overlay: invalid base64: {}", key, e),
            }
        }

        ResultPayload {
            predicted_class: response.predicted_class,
            confidence_score: response.confidence_score,
            explanations,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationBlock {
    pub method: XaiMethod,
    pub title: String,
    pub image_data_uri: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStructure {
    pub mode: Mode,
    pub predicted_class: String,
    pub confidence_percent: i64,
    pub confidence_label: String,
    pub explanations: Vec<ExplanationBlock>,
}
