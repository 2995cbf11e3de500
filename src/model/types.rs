use serde::{Deserialize, Serialize};

/// Placeholder used wherever the backend exposes no real model metadata.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDetails {
    pub parent_model: String,
    pub format: String,
    pub family: String,
    pub families: Vec<String>,
    pub parameter_size: String,
    pub quantization_level: String,
}

impl ModelDetails {
    pub fn placeholder() -> Self {
        Self {
            parent_model: String::new(),
            format: UNKNOWN.to_string(),
            family: UNKNOWN.to_string(),
            families: vec![UNKNOWN.to_string()],
            parameter_size: UNKNOWN.to_string(),
            quantization_level: UNKNOWN.to_string(),
        }
    }
}

/// One installed model, as advertised by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub model: String,
    pub modified_at: String,
    pub size: u64,
    pub digest: String,
    pub details: ModelDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListModelsResponse {
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowModelRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowModelResponse {
    pub modelfile: String,
    pub parameters: String,
    pub template: String,
    pub details: ModelDetails,
    pub model_info: serde_json::Map<String, serde_json::Value>,
    pub capabilities: Vec<String>,
}
