//! HTTP surface: the metered `/v1/chat/completions` pipeline plus the
//! internal token/usage API consumed by the orchestrator (spec.md §4.3,
//! §"Metered proxy").

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use openclaw_common::access_log;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::internal;
use crate::state::AppState;
use crate::{auth, forward, limits, usage};

pub async fn run(cancel: CancellationToken, port: u16, state: AppState) -> anyhow::Result<()> {
    let internal_routes = Router::new()
        .route("/internal/tokens", post(internal::mint_token))
        .route("/internal/tokens/{id}", delete(internal::revoke_token))
        .route("/internal/tokens/{customer_id}/usage", get(internal::get_usage))
        .layer(axum::middleware::from_fn(access_log::internal));

    let public_routes = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/healthz", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(access_log::public));

    let app = Router::new().merge(public_routes).merge(internal_routes).with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("{}{}", "🛰️ Metered proxy listening • addr=".green(), addr.green().dimmed());
    openclaw_common::signal_ready();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    println!("{}", "🛑 Metered proxy stopped gracefully".red());
    Ok(())
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(Error::AuthMissing)
}

/// The full metered pipeline: authenticate the proxy token, enforce the
/// per-customer rate limit, check the monthly token limit, forward to the
/// upstream (unary or streaming, auto-detected from the request body's
/// `"stream"` field), then fire a best-effort usage event. Mirrors the
/// original implementation's request ordering exactly.
async fn chat_completions(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match run_pipeline(&state, &headers, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn run_pipeline(state: &AppState, headers: &HeaderMap, body: Bytes) -> Result<Response> {
    let token = extract_bearer(headers)?;
    let identity = auth::authenticate(state, token).await?;

    let allowed = state
        .rate_limiter
        .check(&identity.customer_id.to_string(), state.rate_limit_rps)
        .await
        .map_err(Error::Other)?;
    if !allowed {
        return Err(Error::RateLimited);
    }

    let snapshot = limits::check(state, identity.customer_id).await?;
    if snapshot.exceeded() {
        return Err(Error::MonthlyLimitExceeded { used: snapshot.used, limit: snapshot.limit });
    }

    let wants_stream = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("stream").and_then(|s| s.as_bool()))
        .unwrap_or(false);

    let warning_header = snapshot.warning();
    let box_id = Some(identity.box_id);

    let response = if wants_stream {
        let (mut response, usage_rx) = forward::forward_streaming(state, body).await?;
        if warning_header {
            response.headers_mut().insert("x-token-warning", axum::http::HeaderValue::from_static("90%"));
        }
        let state = state.clone();
        // "Let the stream complete" before recording usage, matching the
        // original implementation's deliberate post-stream delay.
        tokio::spawn(async move {
            if let Ok(extracted) = usage_rx.await {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                usage::push_event(&state, identity.customer_id, box_id, &extracted).await;
            }
        });
        response
    } else {
        let result = forward::forward_unary(state, body).await?;
        usage::push_event(state, identity.customer_id, box_id, &result.usage).await;
        let mut response = result.response;
        if warning_header {
            response.headers_mut().insert("x-token-warning", axum::http::HeaderValue::from_static("90%"));
        }
        response
    };

    Ok(response)
}
