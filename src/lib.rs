pub mod backend;
pub mod config;
pub mod error;
pub mod generation;
pub mod model;
pub mod protocol;
pub mod server;
pub mod streaming;

pub use backend::{EchoBackend, FragmentStream, GenerationBackend};
pub use config::{AppConfig, ResponseCodec};
pub use error::{BackendError, ServiceError};
pub use generation::{Gateway, GatewayReply, GenerationRequest};
pub use server::build_router;
