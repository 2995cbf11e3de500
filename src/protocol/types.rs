use serde::{Deserialize, Serialize};

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Sampling knobs a client may send, either at the top level of the body or
/// nested under `options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl GenerationOptions {
    /// Fields set in `overrides` win.
    pub fn merged(self, overrides: GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
            top_k: overrides.top_k.or(self.top_k),
            num_predict: overrides.num_predict.or(self.num_predict),
            num_ctx: overrides.num_ctx.or(self.num_ctx),
            seed: overrides.seed.or(self.seed),
            repeat_penalty: overrides.repeat_penalty.or(self.repeat_penalty),
            stop: overrides.stop.or(self.stop),
        }
    }
}

/// Timing and size figures attached to a terminal record. Durations are in
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseMetrics {
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration: u64,
    pub eval_count: u64,
    pub eval_duration: u64,
}

/// A `/api/generate` record, partial or final.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(flatten)]
    pub metrics: Option<ResponseMetrics>,
}

/// A `/api/chat` record, partial or final.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub model: String,
    pub created_at: String,
    pub message: ChatMessage,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(flatten)]
    pub metrics: Option<ResponseMetrics>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProtocolRecord {
    Generate(GenerateResponse),
    Chat(ChatResponse),
}

impl ProtocolRecord {
    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        match self {
            ProtocolRecord::Generate(r) => r.done,
            ProtocolRecord::Chat(r) => r.done,
        }
    }

    /// Encodes the record as one NDJSON line.
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Which response shape a request is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Generate,
    Chat,
}

impl ResponseKind {
    pub fn record(
        self,
        model: &str,
        created_at: String,
        text: String,
        done: bool,
        metrics: Option<ResponseMetrics>,
    ) -> ProtocolRecord {
        let done_reason = metrics.map(|_| "stop".to_string());
        match self {
            ResponseKind::Generate => ProtocolRecord::Generate(GenerateResponse {
                model: model.to_string(),
                created_at,
                response: text,
                done,
                done_reason,
                metrics,
            }),
            ResponseKind::Chat => ProtocolRecord::Chat(ChatResponse {
                model: model.to_string(),
                created_at,
                message: ChatMessage::new("assistant", text),
                done,
                done_reason,
                metrics,
            }),
        }
    }
}
