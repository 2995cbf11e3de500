use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use ollama_gateway::{
    BackendError, FragmentStream, GenerationBackend,
    protocol::{ChatMessage, GenerationOptions},
};

/// Test backend returning canned answers.
pub struct ScriptedBackend {
    pub available: bool,
    pub models: Vec<String>,
    pub answer: Result<String, BackendError>,
    pub fragments: Vec<Result<String, BackendError>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            available: true,
            models: vec!["m1".to_string()],
            answer: Ok(String::new()),
            fragments: Vec::new(),
        }
    }
}

impl ScriptedBackend {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            ..Self::default()
        }
    }

    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn failing_after(fragments: &[&str], err: BackendError) -> Self {
        let mut backend = Self::streaming(fragments);
        backend.fragments.push(Err(err));
        backend
    }

    fn stream(&self) -> FragmentStream {
        stream::iter(self.fragments.clone()).boxed()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        self.answer.clone()
    }

    async fn stream_generate(
        &self,
        _model: &str,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError> {
        Ok(self.stream())
    }

    async fn chat(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        self.answer.clone()
    }

    async fn stream_chat(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<FragmentStream, BackendError> {
        Ok(self.stream())
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.models.clone())
    }
}
