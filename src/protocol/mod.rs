//! Wire shapes of the emulated local-model-server API.

mod params;
mod tokens;
mod types;

pub use params::{DEFAULT_MODEL, RequestParams};
pub use tokens::estimate_tokens;
pub use types::{
    ChatMessage, ChatResponse, GenerateResponse, GenerationOptions, ProtocolRecord, ResponseKind,
    ResponseMetrics,
};

/// Reply to `GET /`, which clients use to probe for a running server.
pub const ROOT_RESPONSE: &str = "Ollama is running";

/// Protocol version reported by `GET /api/version`.
pub const PROTOCOL_VERSION: &str = "0.6.4";
