//! Decodes an OpenAI-compatible `text/event-stream` body into text fragments.

use eventsource_stream::{EventStream, EventStreamError, Eventsource};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::error::InvocationError;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

enum EventOutcome {
    Fragment(String),
    Skip,
    Done,
}

struct DecoderState<S> {
    events: Pin<Box<EventStream<S>>>,
    finished: bool,
    events_seen: usize,
    fragments: usize,
}

/// Turns raw body chunks into content fragments.
///
/// Ends after `data: [DONE]`, after the body ends, or right after the first error.
/// A body that ends without a single `data:` event is reported as malformed.
pub(crate) fn fragment_stream<S, B>(
    bytes: S,
) -> impl Stream<Item = Result<String, InvocationError>>
where
    S: Stream<Item = Result<B, InvocationError>>,
    B: AsRef<[u8]>,
{
    let state = DecoderState {
        events: Box::pin(bytes.eventsource()),
        finished: false,
        events_seen: 0,
        fragments: 0,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            match state.events.next().await {
                Some(Ok(event)) => {
                    state.events_seen += 1;
                    match decode_data(&event.data) {
                        Ok(EventOutcome::Fragment(text)) => {
                            state.fragments += 1;
                            return Some((Ok(text), state));
                        }
                        Ok(EventOutcome::Skip) => continue,
                        Ok(EventOutcome::Done) => {
                            debug!(fragments = state.fragments, "model stream finished");
                            return None;
                        }
                        Err(err) => {
                            state.finished = true;
                            return Some((Err(err), state));
                        }
                    }
                }
                Some(Err(EventStreamError::Transport(err))) => {
                    warn!(error = %err, "model stream read failed");
                    state.finished = true;
                    return Some((Err(err), state));
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((
                        Err(InvocationError::MalformedChunk {
                            reason: err.to_string(),
                        }),
                        state,
                    ));
                }
                None if state.events_seen == 0 => {
                    warn!("model response body contained no server-sent events");
                    state.finished = true;
                    return Some((
                        Err(InvocationError::MalformedChunk {
                            reason: "response body contained no server-sent events".to_string(),
                        }),
                        state,
                    ));
                }
                None => {
                    debug!(fragments = state.fragments, "model stream closed");
                    return None;
                }
            }
        }
    })
}

fn decode_data(data: &str) -> Result<EventOutcome, InvocationError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(EventOutcome::Skip);
    }
    if data == DONE_SENTINEL {
        return Ok(EventOutcome::Done);
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).map_err(|err| InvocationError::MalformedChunk {
            reason: format!("{err} (data: {data})"),
        })?;

    if let Some(error) = chunk.error {
        return Err(InvocationError::Remote {
            message: remote_error_message(&error),
        });
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty());

    Ok(match content {
        Some(text) => EventOutcome::Fragment(text),
        None => EventOutcome::Skip,
    })
}

pub(crate) fn remote_error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(fields) => fields
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
