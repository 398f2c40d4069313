//! Forwards `/v1/chat/completions` to the upstream LLM, unary or streaming
//! (spec.md §4.3 step 5 / SPEC_FULL.md's `[ADD]` upstream wire-shape note:
//! OpenAI-chat-completions-compatible, `usage.{prompt_tokens,completion_tokens,
//! total_tokens}` + `model` + `id` on unary responses and on an SSE stream's
//! terminal `data: {...}` chunk).

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use futures_util::stream;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct UsageExtract {
    pub model: Option<String>,
    pub request_id: Option<String>,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

impl UsageExtract {
    pub fn total_tokens(&self) -> i64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<UsageObject>,
}

#[derive(Debug, Deserialize)]
struct UsageObject {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
}

/// Headers from the upstream response that are safe (and useful) to relay
/// downstream unmodified. `content-length` is deliberately excluded since
/// we rebuild the body.
const PASSTHROUGH_HEADERS: &[&str] = &["content-type", "cache-control", "x-request-id"];

fn copy_passthrough_headers(from: &HeaderMap, into: &mut HeaderMap) {
    for name in PASSTHROUGH_HEADERS {
        if let Some(v) = from.get(*name) {
            into.insert(HeaderName::from_static(name), v.clone());
        }
    }
}

pub struct ForwardResult {
    pub response: Response,
    pub usage: UsageExtract,
}

/// Sends `body` to the upstream unchanged and relays the response unary —
/// the whole upstream body is buffered so `usage` can be parsed before the
/// response is returned.
pub async fn forward_unary(state: &AppState, body: Bytes) -> Result<ForwardResult> {
    let upstream_resp = state
        .http
        .post(format!("{}/chat/completions", state.upstream_base_url))
        .bearer_auth(&state.upstream_api_key)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| Error::Upstream(e.to_string()))?;

    let status = StatusCode::from_u16(upstream_resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    copy_passthrough_headers(upstream_resp.headers(), &mut headers);

    let bytes = upstream_resp
        .bytes()
        .await
        .map_err(|e| Error::Upstream(e.to_string()))?;

    let mut usage = UsageExtract::default();
    if status == StatusCode::OK
        && let Ok(envelope) = serde_json::from_slice::<ChatCompletionEnvelope>(&bytes)
    {
        usage.model = envelope.model;
        usage.request_id = envelope.id;
        if let Some(u) = envelope.usage {
            usage.prompt_tokens = u.prompt_tokens;
            usage.completion_tokens = u.completion_tokens;
        }
    }

    let mut response = (status, bytes).into_response();
    *response.headers_mut() = headers;
    Ok(ForwardResult { response, usage })
}

/// Opens a streaming upstream POST and relays each raw chunk to the
/// downstream caller as it arrives, inspecting in-flight SSE `data: {...}`
/// lines for the terminal chunk's `usage` field. Returns once headers are
/// available; `usage` resolves over `usage_rx` once the stream completes.
pub async fn forward_streaming(
    state: &AppState,
    body: Bytes,
) -> Result<(Response, tokio::sync::oneshot::Receiver<UsageExtract>)> {
    let upstream_resp = state
        .http
        .post(format!("{}/chat/completions", state.upstream_base_url))
        .bearer_auth(&state.upstream_api_key)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| Error::Upstream(e.to_string()))?;

    let status = StatusCode::from_u16(upstream_resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    copy_passthrough_headers(upstream_resp.headers(), &mut headers);
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("connection", HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    let (usage_tx, usage_rx) = tokio::sync::oneshot::channel();

    let state_stream = StreamState {
        upstream: upstream_resp,
        buffer: Vec::new(),
        usage: UsageExtract::default(),
        usage_tx: Some(usage_tx),
        done: false,
    };
    let byte_stream = stream::unfold(state_stream, step).map(Ok::<Bytes, std::io::Error>);

    let mut response = Response::new(Body::from_stream(byte_stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok((response, usage_rx))
}

struct StreamState {
    upstream: reqwest::Response,
    buffer: Vec<u8>,
    usage: UsageExtract,
    usage_tx: Option<tokio::sync::oneshot::Sender<UsageExtract>>,
    done: bool,
}

async fn step(mut state: StreamState) -> Option<(Bytes, StreamState)> {
    if state.done {
        return None;
    }
    match state.upstream.chunk().await {
        Ok(Some(chunk)) => {
            state.buffer.extend_from_slice(&chunk);
            extract_usage_from_lines(&mut state.buffer, &mut state.usage);
            Some((chunk, state))
        }
        Ok(None) => {
            finish(&mut state);
            None
        }
        Err(_) => {
            finish(&mut state);
            None
        }
    }
}

fn finish(state: &mut StreamState) {
    state.done = true;
    if let Some(tx) = state.usage_tx.take() {
        let _ = tx.send(state.usage.clone());
    }
}

/// Consumes complete lines (terminated by `\n`) out of `buffer`, leaving any
/// trailing partial line for the next chunk, and updates `usage` from the
/// last `data: {...}` chunk that carries a `usage` field — mirrors the
/// original's `aiter_lines()` + "last chunk wins" behavior.
fn extract_usage_from_lines(buffer: &mut Vec<u8>, usage: &mut UsageExtract) {
    loop {
        let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') else {
            break;
        };
        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = String::from_utf8_lossy(&line_bytes);
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        if payload == "[DONE]" {
            continue;
        }
        if let Ok(envelope) = serde_json::from_str::<ChatCompletionEnvelope>(payload) {
            if let Some(model) = envelope.model {
                usage.model = Some(model);
            }
            if let Some(id) = envelope.id {
                usage.request_id = Some(id);
            }
            if let Some(u) = envelope.usage {
                usage.prompt_tokens = u.prompt_tokens;
                usage.completion_tokens = u.completion_tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_usage_from_terminal_chunk() {
        let mut buffer = br#"data: {"id":"r1","model":"kimi-coding/k2p5"}
data: {"usage":{"prompt_tokens":12,"completion_tokens":34}}
data: [DONE]
"#
        .to_vec();
        let mut usage = UsageExtract::default();
        extract_usage_from_lines(&mut buffer, &mut usage);
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 34);
        assert_eq!(usage.model.as_deref(), Some("kimi-coding/k2p5"));
        assert_eq!(usage.request_id.as_deref(), Some("r1"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn leaves_partial_trailing_line_in_buffer() {
        let mut buffer = b"data: {\"model\":\"m\"}\ndata: {\"usage\"".to_vec();
        let mut usage = UsageExtract::default();
        extract_usage_from_lines(&mut buffer, &mut usage);
        assert_eq!(usage.model.as_deref(), Some("m"));
        assert_eq!(buffer, b"data: {\"usage\"");
    }
}
