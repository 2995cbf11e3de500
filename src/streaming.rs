//! NDJSON encoding of streamed generations.
//!
//! The backend's fragment sequence is consumed exactly once. Each fragment
//! becomes one `done: false` record, in backend order, and every stream ends
//! with exactly one `done: true` record. Headers are already on the wire by
//! the time the backend can fail, so a failure is reported as the text of
//! that terminal record.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use tracing::{debug, error, warn};

use crate::{
    backend::{FragmentStream, GenerationBackend},
    config::ResponseCodec,
    error::BackendError,
    generation::{GenerationRequest, build_metrics},
    protocol::{ProtocolRecord, ResponseMetrics},
};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub type RecordStream = BoxStream<'static, ProtocolRecord>;

/// What happened on the backend side, before it is given a wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Finished(ResponseMetrics),
    Failed(BackendError),
}

enum Phase {
    Opening,
    Streaming {
        fragments: FragmentStream,
        load_duration: Duration,
        prompt_eval_started: Instant,
        first_fragment_at: Option<Instant>,
    },
    Closed,
}

struct Encoder {
    backend: Arc<dyn GenerationBackend>,
    request: GenerationRequest,
    started: Instant,
    completion: String,
    fragments_sent: usize,
    phase: Phase,
}

impl Encoder {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Closed) {
                Phase::Opening => {
                    let load_started = Instant::now();
                    match self.request.open_stream(self.backend.as_ref()).await {
                        Ok(fragments) => {
                            self.phase = Phase::Streaming {
                                fragments,
                                load_duration: load_started.elapsed(),
                                prompt_eval_started: Instant::now(),
                                first_fragment_at: None,
                            };
                        }
                        Err(err) => return Some(self.fail(err)),
                    }
                }
                Phase::Streaming {
                    mut fragments,
                    load_duration,
                    prompt_eval_started,
                    mut first_fragment_at,
                } => match fragments.next().await {
                    Some(Ok(text)) => {
                        first_fragment_at.get_or_insert_with(Instant::now);
                        self.completion.push_str(&text);
                        self.fragments_sent += 1;
                        self.phase = Phase::Streaming {
                            fragments,
                            load_duration,
                            prompt_eval_started,
                            first_fragment_at,
                        };
                        return Some(StreamEvent::Fragment(text));
                    }
                    Some(Err(err)) => return Some(self.fail(err)),
                    None => {
                        let prompt_eval = first_fragment_at
                            .unwrap_or_else(Instant::now)
                            .saturating_duration_since(prompt_eval_started);
                        let metrics = build_metrics(
                            self.started.elapsed(),
                            load_duration,
                            prompt_eval,
                            &self.request.prompt_text(),
                            &self.completion,
                        );
                        debug!(
                            model = %self.request.model,
                            fragments = self.fragments_sent,
                            eval_count = metrics.eval_count,
                            "stream finished"
                        );
                        return Some(StreamEvent::Finished(metrics));
                    }
                },
                Phase::Closed => return None,
            }
        }
    }

    fn fail(&self, err: BackendError) -> StreamEvent {
        warn!(
            model = %self.request.model,
            fragments = self.fragments_sent,
            %err,
            "backend failed mid-stream"
        );
        StreamEvent::Failed(err)
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        if !matches!(self.phase, Phase::Closed) {
            debug!(
                model = %self.request.model,
                fragments = self.fragments_sent,
                "stream dropped before completion"
            );
        }
    }
}

/// Backend events for one request, ending after the first terminal event.
pub fn events(
    backend: Arc<dyn GenerationBackend>,
    request: GenerationRequest,
    started: Instant,
) -> BoxStream<'static, StreamEvent> {
    let encoder = Encoder {
        backend,
        request,
        started,
        completion: String::new(),
        fragments_sent: 0,
        phase: Phase::Opening,
    };

    futures_util::stream::unfold(encoder, |mut encoder| async move {
        let event = encoder.next_event().await?;
        Some((event, encoder))
    })
    .boxed()
}

/// Gives an event its protocol shape. Failures become a terminal record whose
/// text is the error description and which carries no metrics.
pub fn to_record(
    request: &GenerationRequest,
    codec: &ResponseCodec,
    event: StreamEvent,
) -> ProtocolRecord {
    let kind = request.kind();
    let created_at = codec.now();
    match event {
        StreamEvent::Fragment(text) => kind.record(&request.model, created_at, text, false, None),
        StreamEvent::Finished(metrics) => {
            kind.record(&request.model, created_at, String::new(), true, Some(metrics))
        }
        StreamEvent::Failed(err) => {
            kind.record(&request.model, created_at, err.to_string(), true, None)
        }
    }
}

pub fn encode(
    backend: Arc<dyn GenerationBackend>,
    request: GenerationRequest,
    codec: ResponseCodec,
    started: Instant,
) -> RecordStream {
    let shape = request.clone();
    events(backend, request, started)
        .map(move |event| to_record(&shape, &codec, event))
        .boxed()
}

pub fn ndjson_response(records: RecordStream) -> Response {
    let lines = records.map(|record| match record.to_ndjson() {
        Ok(line) => Ok(Bytes::from(line)),
        Err(err) => {
            error!(%err, "failed to encode stream record");
            Err(std::io::Error::other(err))
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .body(Body::from_stream(lines))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
