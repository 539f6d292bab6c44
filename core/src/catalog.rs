//! Known Gemini models and Vertex AI regions

use serde::Serialize;
use tracing::warn;

/// A selectable Gemini model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
}

/// A selectable Vertex AI region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionInfo {
    pub id: &'static str,
    pub display_name: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gemini-3-pro-preview", display_name: "Gemini 3 Pro (Preview)" },
    ModelInfo { id: "gemini-2.5-pro", display_name: "Gemini 2.5 Pro" },
    ModelInfo { id: "gemini-2.5-flash", display_name: "Gemini 2.5 Flash" },
    ModelInfo { id: "gemini-2.5-flash-lite", display_name: "Gemini 2.5 Flash Lite" },
    ModelInfo { id: "gemini-2.0-flash-001", display_name: "Gemini 2.0 Flash" },
    ModelInfo { id: "gemini-2.0-flash-lite-001", display_name: "Gemini 2.0 Flash Lite" },
    ModelInfo { id: "gemini-1.5-pro-002", display_name: "Gemini 1.5 Pro" },
    ModelInfo { id: "gemini-1.5-flash-002", display_name: "Gemini 1.5 Flash" },
];

// New models usually land in us-central1 first.
pub const REGIONS: &[RegionInfo] = &[
    RegionInfo { id: "us-central1", display_name: "us-central1 (Iowa)" },
    RegionInfo { id: "us-east1", display_name: "us-east1 (South Carolina)" },
    RegionInfo { id: "us-east4", display_name: "us-east4 (Northern Virginia)" },
    RegionInfo { id: "us-west1", display_name: "us-west1 (Oregon)" },
    RegionInfo { id: "europe-west1", display_name: "europe-west1 (Belgium)" },
    RegionInfo { id: "europe-west4", display_name: "europe-west4 (Netherlands)" },
    RegionInfo { id: "asia-northeast1", display_name: "asia-northeast1 (Tokyo)" },
    RegionInfo { id: "asia-northeast3", display_name: "asia-northeast3 (Seoul)" },
    RegionInfo { id: "asia-southeast1", display_name: "asia-southeast1 (Singapore)" },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

pub fn find_region(id: &str) -> Option<&'static RegionInfo> {
    REGIONS.iter().find(|r| r.id == id)
}

/// Log custom model or region identifiers; they are still used as given
pub fn warn_if_unknown(model: &str, region: &str) {
    if find_model(model).is_none() {
        warn!("Model '{}' is not in the known model list, sending it as-is", model);
    }
    if find_region(region).is_none() {
        warn!("Region '{}' is not in the known region list, sending it as-is", region);
    }
}
