use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use crate::{
    backend::{FragmentStream, GenerationBackend},
    error::BackendError,
    protocol::{ChatMessage, GenerationOptions},
};

/// Answers every prompt by repeating it back.
///
/// Lets the gateway run without a real model behind it. Chats echo the most
/// recent user turn; streams split the answer on word boundaries.
pub struct EchoBackend {
    models: Vec<String>,
    available: AtomicBool,
}

impl EchoBackend {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_model(&self, model: &str) -> Result<(), BackendError> {
        // "default" always resolves, matching the decoder's fallback model.
        if model == "default" || self.models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(BackendError::ModelNotFound(model.to_string()))
        }
    }

    fn answer(text: &str, options: &GenerationOptions) -> String {
        split_words(text, options).concat()
    }
}

fn last_user_turn(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Word fragments with their trailing whitespace, capped by `num_predict`.
fn split_words(text: &str, options: &GenerationOptions) -> Vec<String> {
    let limit = match options.num_predict {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => usize::MAX,
    };
    text.split_inclusive(char::is_whitespace)
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn fragments(text: &str, options: &GenerationOptions) -> FragmentStream {
    let words = split_words(text, options);
    stream::iter(words.into_iter().map(Ok)).boxed()
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        self.ensure_model(model)?;
        Ok(Self::answer(prompt, options))
    }

    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError> {
        self.ensure_model(model)?;
        Ok(fragments(prompt, options))
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        self.ensure_model(model)?;
        Ok(Self::answer(last_user_turn(messages), options))
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError> {
        self.ensure_model(model)?;
        Ok(fragments(last_user_turn(messages), options))
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    fn backend() -> EchoBackend {
        EchoBackend::new(vec!["llama3".into(), "mistral".into()])
    }

    #[tokio::test]
    async fn stream_concatenates_to_buffered_answer() {
        let backend = backend();
        let options = GenerationOptions::default();
        let buffered = backend
            .generate("llama3", "the quick  brown fox", &options)
            .await
            .unwrap();
        let streamed: Vec<String> = backend
            .stream_generate("llama3", "the quick  brown fox", &options)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(streamed.len(), 5);
        assert_eq!(streamed.concat(), buffered);
        assert_eq!(buffered, "the quick  brown fox");
    }

    #[tokio::test]
    async fn chat_echoes_latest_user_turn() {
        let messages = vec![
            ChatMessage::new("system", "be brief"),
            ChatMessage::new("user", "first"),
            ChatMessage::new("assistant", "ok"),
            ChatMessage::new("user", "second question"),
        ];
        let reply = backend()
            .chat("mistral", &messages, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "second question");
    }

    #[tokio::test]
    async fn num_predict_caps_fragments() {
        let options = GenerationOptions {
            num_predict: Some(2),
            ..GenerationOptions::default()
        };
        let reply = backend()
            .generate("default", "one two three", &options)
            .await
            .unwrap();
        assert_eq!(reply, "one two ");
    }

    #[tokio::test]
    async fn oversized_num_predict_is_unbounded() {
        let options = GenerationOptions {
            num_predict: Some(i64::MAX),
            ..GenerationOptions::default()
        };
        let reply = backend()
            .generate("default", "one two three", &options)
            .await
            .unwrap();
        assert_eq!(reply, "one two three");
    }

    #[tokio::test]
    async fn unknown_model_is_reported() {
        let err = backend()
            .generate("phi", "hi", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::ModelNotFound("phi".into()));
    }

    #[tokio::test]
    async fn availability_can_be_toggled() {
        let backend = backend();
        assert!(backend.is_available().await);
        backend.set_available(false);
        assert!(!backend.is_available().await);
    }
}
