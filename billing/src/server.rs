use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use openclaw_common::access_log;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::handlers;
use crate::payloads::StripeEvent;
use crate::state::AppState;
use crate::webhook;

pub async fn run(cancel: CancellationToken, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/healthz", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(access_log::public))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("{}{}", "🧾 Billing reducer listening • addr=".green(), addr.green().dimmed());
    openclaw_common::signal_ready();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    println!("{}", "🛑 Billing reducer stopped gracefully".red());
    Ok(())
}

async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> impl IntoResponse {
    match process(&state, &headers, &body).await {
        Ok(reply) => (StatusCode::OK, reply).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Claims the event id, runs its handler and marks it processed — all
/// inside one transaction — then pushes whatever job the handler produced
/// only once that transaction has committed. A handler failure rolls back
/// the claim along with every store mutation it made, so the id is left
/// unclaimed and the provider's retry reprocesses it from scratch (spec.md
/// §7: "Billing-reducer failures return 500 so the provider retries").
async fn process(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<&'static str> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    webhook::verify(signature, body, &state.webhook_secret, state.tolerance_seconds)?;

    let event: StripeEvent = serde_json::from_slice(body).map_err(|e| Error::MalformedBody(e.to_string()))?;

    let mut client = state.pool.get().await.map_err(openclaw_store::Error::from)?;
    let tx = client.transaction().await.map_err(openclaw_store::Error::from)?;

    let already_processed = openclaw_store::billing_events::claim(&tx, &event.id, &event.event_type).await?;
    if already_processed {
        tx.rollback().await.map_err(openclaw_store::Error::from)?;
        return Ok("duplicate");
    }

    let object = event.data.object;
    let result = match event.event_type.as_str() {
        "checkout.session.completed" => handlers::checkout_session_completed(&tx, object).await,
        "invoice.payment_succeeded" => handlers::invoice_payment_succeeded(&tx, object).await,
        "invoice.payment_failed" => handlers::invoice_payment_failed(&tx, object).await,
        "customer.subscription.updated" => handlers::subscription_updated(&tx, object).await,
        "customer.subscription.deleted" => handlers::subscription_deleted(&tx, object).await,
        _ => {
            tx.rollback().await.map_err(openclaw_store::Error::from)?;
            return Ok("ignored");
        }
    };
    let job = match result {
        Ok(job) => job,
        Err(e) => {
            tx.rollback().await.map_err(openclaw_store::Error::from)?;
            return Err(e);
        }
    };

    openclaw_store::billing_events::mark_processed(&tx, &event.id).await?;
    tx.commit().await.map_err(openclaw_store::Error::from)?;

    if let Some(envelope) = job {
        crate::queue::push_job(&state.redis, envelope).await?;
    }
    Ok("processed")
}
