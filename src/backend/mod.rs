//! The text-generation capability the gateway fronts.
//!
//! Anything able to complete prompts and chats can sit behind the protocol
//! adapter by implementing [`GenerationBackend`]. Implementations must be safe
//! to call from many requests at once; the adapter adds no queueing of its own.

mod echo;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{
    error::BackendError,
    protocol::{ChatMessage, GenerationOptions},
};

pub use echo::EchoBackend;

/// Lazily produced text fragments. Yields `Err` at most once, as its last item.
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;

    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError>;

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError>;

    /// Installed model identifiers, in the backend's own order.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}
