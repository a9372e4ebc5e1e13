use base64::Engine;

use crate::models::result_types::{DisplayStructure, ExplanationBlock, ResultPayload, XaiMethod};
use crate::models::session_types::Mode;

pub fn confidence_percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

/// Map a service response to what the result panel shows.
///
/// Explanation blocks only appear in explain mode, in canonical method order,
/// and only for methods the service actually returned.
pub fn render(payload: &ResultPayload, mode: Mode) -> DisplayStructure {
    let percent = confidence_percent(payload.confidence_score);

    let explanations = match mode {
        Mode::Classify => Vec::new(),
        Mode::Explain => XaiMethod::ALL
            .iter()
            .filter_map(|method| {
                payload.explanations.get(method).map(|png| ExplanationBlock {
                    method: *method,
                    title: method.title().to_string(),
                    image_data_uri: png_data_uri(png),
                })
            })
            .collect(),
    };

    DisplayStructure {
        mode,
        predicted_class: payload.predicted_class.clone(),
        confidence_percent: percent,
        confidence_label: format!("{}%", percent),
        explanations,
    }
}

fn png_data_uri(bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:image/png;base64,{}", b64)
}
