//! Request orchestration for `/api/generate` and `/api/chat`.
//!
//! Both routes follow the same lifecycle: decode the body, check the backend
//! is up, then either make one blocking backend call and answer with a single
//! terminal record, or hand the request to the NDJSON encoder.

use std::{
    borrow::Cow,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::response::{IntoResponse, Response};
use tracing::{error, info};

use crate::{
    backend::{FragmentStream, GenerationBackend},
    config::ResponseCodec,
    error::{BackendError, ServiceError},
    model::{ListModelsResponse, ModelRegistry, ShowModelRequest, ShowModelResponse},
    protocol::{
        ChatMessage, GenerationOptions, ProtocolRecord, RequestParams, ResponseKind,
        ResponseMetrics, estimate_tokens,
    },
    streaming::{self, RecordStream},
};

/// What the client asked the backend to continue.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Completion(String),
    Chat(Vec<ChatMessage>),
}

/// A decoded request, fixed once built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub input: PromptInput,
    pub stream: bool,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn completion(params: RequestParams) -> Self {
        Self {
            model: params.model().to_string(),
            input: PromptInput::Completion(params.prompt().to_string()),
            stream: params.stream(),
            options: params.options,
        }
    }

    pub fn chat(params: RequestParams) -> Self {
        Self {
            model: params.model().to_string(),
            input: PromptInput::Chat(params.messages()),
            stream: params.stream(),
            options: params.options,
        }
    }

    pub fn kind(&self) -> ResponseKind {
        match self.input {
            PromptInput::Completion(_) => ResponseKind::Generate,
            PromptInput::Chat(_) => ResponseKind::Chat,
        }
    }

    /// Text the prompt token estimate is taken from. Chat turns are joined
    /// with newlines.
    pub fn prompt_text(&self) -> Cow<'_, str> {
        match &self.input {
            PromptInput::Completion(prompt) => Cow::Borrowed(prompt),
            PromptInput::Chat(messages) => Cow::Owned(
                messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    pub(crate) async fn run_buffered(
        &self,
        backend: &dyn GenerationBackend,
    ) -> Result<String, BackendError> {
        match &self.input {
            PromptInput::Completion(prompt) => {
                backend.generate(&self.model, prompt, &self.options).await
            }
            PromptInput::Chat(messages) => backend.chat(&self.model, messages, &self.options).await,
        }
    }

    pub(crate) async fn open_stream(
        &self,
        backend: &dyn GenerationBackend,
    ) -> Result<FragmentStream, BackendError> {
        match &self.input {
            PromptInput::Completion(prompt) => {
                backend
                    .stream_generate(&self.model, prompt, &self.options)
                    .await
            }
            PromptInput::Chat(messages) => {
                backend
                    .stream_chat(&self.model, messages, &self.options)
                    .await
            }
        }
    }
}

/// The answer to a generation route: one JSON object, or an NDJSON stream.
pub enum GatewayReply {
    Buffered(ProtocolRecord),
    Streamed(RecordStream),
}

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        match self {
            GatewayReply::Buffered(record) => axum::Json(record).into_response(),
            GatewayReply::Streamed(records) => streaming::ndjson_response(records),
        }
    }
}

/// Translates protocol requests into backend calls.
///
/// Holds no per-request state, so one instance serves all requests
/// concurrently.
pub struct Gateway {
    backend: Arc<dyn GenerationBackend>,
    models: ModelRegistry,
    codec: ResponseCodec,
}

impl Gateway {
    pub fn new(backend: Arc<dyn GenerationBackend>, codec: ResponseCodec) -> Self {
        Self {
            models: ModelRegistry::new(backend.clone()),
            backend,
            codec,
        }
    }

    pub async fn generate_completion(&self, body: &[u8]) -> Result<GatewayReply, ServiceError> {
        let started = Instant::now();
        let request = GenerationRequest::completion(RequestParams::decode(body)?);
        self.respond(started, request).await
    }

    pub async fn chat_completion(&self, body: &[u8]) -> Result<GatewayReply, ServiceError> {
        let started = Instant::now();
        let request = GenerationRequest::chat(RequestParams::decode(body)?);
        self.respond(started, request).await
    }

    pub async fn list_models(&self) -> Result<ListModelsResponse, ServiceError> {
        self.models.list_models(&self.codec).await
    }

    pub fn show_model(&self, request: &ShowModelRequest) -> ShowModelResponse {
        self.models.show_model(request)
    }

    async fn respond(
        &self,
        started: Instant,
        request: GenerationRequest,
    ) -> Result<GatewayReply, ServiceError> {
        if !self.backend.is_available().await {
            return Err(ServiceError::BackendUnavailable);
        }

        info!(
            model = %request.model,
            streaming = request.stream,
            kind = ?request.kind(),
            "generation request"
        );

        if request.stream {
            let records =
                streaming::encode(self.backend.clone(), request, self.codec, started);
            return Ok(GatewayReply::Streamed(records));
        }

        let load_started = Instant::now();
        let text = request
            .run_buffered(self.backend.as_ref())
            .await
            .inspect_err(|err| error!(model = %request.model, %err, "backend call failed"))?;
        let load_duration = load_started.elapsed();
        let total_duration = started.elapsed();

        // No separate prompt-evaluation timing exists for a blocking call.
        let metrics = build_metrics(
            total_duration,
            load_duration,
            load_duration,
            &request.prompt_text(),
            &text,
        );
        let record = request.kind().record(
            &request.model,
            self.codec.now(),
            text,
            true,
            Some(metrics),
        );
        Ok(GatewayReply::Buffered(record))
    }
}

/// Assembles terminal-record metrics; shared by the buffered and streamed
/// paths. `eval_duration` is clamped at zero.
pub(crate) fn build_metrics(
    total: Duration,
    load: Duration,
    prompt_eval: Duration,
    prompt: &str,
    completion: &str,
) -> ResponseMetrics {
    let total_duration = nanos(total);
    let load_duration = nanos(load);
    ResponseMetrics {
        total_duration,
        load_duration,
        prompt_eval_count: estimate_tokens(prompt),
        prompt_eval_duration: nanos(prompt_eval),
        eval_count: estimate_tokens(completion),
        eval_duration: total_duration.saturating_sub(load_duration),
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::Value;

    use super::*;
    use crate::backend::EchoBackend;

    fn gateway() -> (Arc<EchoBackend>, Gateway) {
        let backend = Arc::new(EchoBackend::new(vec!["m1".into()]));
        let gateway = Gateway::new(backend.clone(), ResponseCodec::default());
        (backend, gateway)
    }

    fn buffered(reply: GatewayReply) -> Value {
        match reply {
            GatewayReply::Buffered(record) => serde_json::to_value(record).unwrap(),
            GatewayReply::Streamed(_) => panic!("expected a buffered reply"),
        }
    }

    #[tokio::test]
    async fn buffered_completion_is_one_terminal_record() {
        let (_, gateway) = gateway();
        let reply = gateway
            .generate_completion(br#"{"model":"m1","prompt":"hello","stream":false}"#)
            .await
            .unwrap();
        let value = buffered(reply);
        assert_eq!(value["model"], "m1");
        assert_eq!(value["response"], "hello");
        assert_eq!(value["done"], true);
        assert_eq!(value["prompt_eval_count"], 1);
        assert_eq!(value["eval_count"], 1);
        assert_eq!(value["prompt_eval_duration"], value["load_duration"]);
        let total = value["total_duration"].as_u64().unwrap();
        let load = value["load_duration"].as_u64().unwrap();
        assert!(total >= load);
        assert_eq!(value["eval_duration"].as_u64().unwrap(), total - load);
    }

    #[tokio::test]
    async fn buffered_chat_estimates_joined_prompt() {
        let (_, gateway) = gateway();
        let reply = gateway
            .chat_completion(
                br#"{"model":"m1","messages":[{"role":"system","content":"abcdefg"},{"role":"user","content":"hijklmnop"}]}"#,
            )
            .await
            .unwrap();
        let value = buffered(reply);
        assert_eq!(value["message"]["role"], "assistant");
        assert_eq!(value["message"]["content"], "hijklmnop");
        // "abcdefg\nhijklmnop" is 17 characters.
        assert_eq!(value["prompt_eval_count"], 4);
        assert_eq!(value["done"], true);
    }

    #[tokio::test]
    async fn missing_stream_flag_buffers() {
        let (_, gateway) = gateway();
        let reply = gateway.generate_completion(b"{}").await.unwrap();
        let value = buffered(reply);
        assert_eq!(value["model"], "default");
        assert_eq!(value["response"], "");
        assert_eq!(value["eval_count"], 0);
    }

    #[tokio::test]
    async fn unavailable_backend_fails_before_work() {
        let (backend, gateway) = gateway();
        backend.set_available(false);
        let err = gateway
            .generate_completion(br#"{"prompt":"hi","stream":true}"#)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::BackendUnavailable));
        let err = gateway.chat_completion(b"{}").await.err().unwrap();
        assert!(matches!(err, ServiceError::BackendUnavailable));
    }

    #[tokio::test]
    async fn decode_errors_win_over_availability() {
        let (backend, gateway) = gateway();
        backend.set_available(false);
        let err = gateway.generate_completion(b"not json").await.err().unwrap();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[tokio::test]
    async fn buffered_backend_failure_propagates() {
        let (_, gateway) = gateway();
        let err = gateway
            .generate_completion(br#"{"model":"missing","prompt":"hi"}"#)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::ModelNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn streamed_completion_ends_with_single_terminal_record() {
        let (_, gateway) = gateway();
        let reply = gateway
            .generate_completion(br#"{"model":"m1","prompt":"one two three","stream":true}"#)
            .await
            .unwrap();
        let GatewayReply::Streamed(records) = reply else {
            panic!("expected a streamed reply");
        };
        let records: Vec<ProtocolRecord> = records.collect().await;
        assert_eq!(records.len(), 4);
        assert_eq!(records.iter().filter(|r| r.is_done()).count(), 1);
        assert!(records.last().unwrap().is_done());
    }

    #[test]
    fn eval_duration_never_goes_negative() {
        let metrics = build_metrics(
            Duration::from_millis(5),
            Duration::from_millis(8),
            Duration::from_millis(8),
            "prompt",
            "",
        );
        assert_eq!(metrics.eval_duration, 0);
        assert_eq!(metrics.eval_count, 0);
        assert_eq!(metrics.prompt_eval_count, 1);
    }

    #[test]
    fn chat_prompt_text_joins_turns() {
        let request = GenerationRequest {
            model: "m1".into(),
            input: PromptInput::Chat(vec![
                ChatMessage::new("user", "a"),
                ChatMessage::new("assistant", "b"),
            ]),
            stream: false,
            options: GenerationOptions::default(),
        };
        assert_eq!(request.prompt_text(), "a\nb");
        assert_eq!(request.kind(), ResponseKind::Chat);
    }
}
