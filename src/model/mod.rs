mod registry;
mod types;

pub use registry::ModelRegistry;
pub use types::{
    ListModelsResponse, ModelDescriptor, ModelDetails, ShowModelRequest, ShowModelResponse,
};
