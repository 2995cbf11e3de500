use std::sync::Arc;

use crate::{
    backend::GenerationBackend,
    config::ResponseCodec,
    error::ServiceError,
    model::{
        ListModelsResponse, ModelDescriptor, ModelDetails, ShowModelRequest, ShowModelResponse,
    },
};

const MODELFILE: &str = "# Modelfile generated by ollama_gateway\n\
FROM default\n\
TEMPLATE \"\"\"{{ .Prompt }}\"\"\"\n";

/// Presents the backend's models in the protocol's catalogue shapes.
pub struct ModelRegistry {
    backend: Arc<dyn GenerationBackend>,
}

impl ModelRegistry {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Keeps the backend's order; every descriptor gets the same synthetic
    /// modification time.
    pub async fn list_models(
        &self,
        codec: &ResponseCodec,
    ) -> Result<ListModelsResponse, ServiceError> {
        let names = self.backend.list_models().await?;
        let modified_at = codec.now();

        let models = names
            .into_iter()
            .map(|name| ModelDescriptor {
                model: name.clone(),
                name,
                modified_at: modified_at.clone(),
                size: 0,
                digest: String::new(),
                details: ModelDetails::placeholder(),
            })
            .collect();

        Ok(ListModelsResponse { models })
    }

    /// The requested name is not consulted; every model is described the same.
    pub fn show_model(&self, _request: &ShowModelRequest) -> ShowModelResponse {
        ShowModelResponse {
            modelfile: MODELFILE.to_string(),
            parameters: "{}".to_string(),
            template: "{{ .Prompt }}".to_string(),
            details: ModelDetails::placeholder(),
            model_info: serde_json::Map::new(),
            capabilities: vec!["completion".to_string()],
        }
    }
}
