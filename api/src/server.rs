use axum::Router;
use axum::routing::{get, post};
use openclaw_common::{access_log, cors};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::handlers::{auth, boxes, provision, usage};
use crate::state::AppState;

pub async fn run(cancel: CancellationToken, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/v1/auth/session", post(auth::create_session))
        .route("/internal/provision", post(provision::provision))
        .route(
            "/v1/boxes/{id}",
            get(boxes::get_box).patch(boxes::patch_box).delete(boxes::delete_box),
        )
        .route("/v1/boxes/{id}/suspend", post(boxes::suspend_box))
        .route("/v1/boxes/{id}/reactivate", post(boxes::reactivate_box))
        .route("/v1/usage/{customer_id}", get(usage::get_usage))
        .route("/healthz", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(access_log::public))
        .layer(cors::dev())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("{}{}", "🌐 API shell listening • addr=".green(), addr.green().dimmed());
    openclaw_common::signal_ready();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    println!("{}", "🛑 API shell stopped gracefully".red());
    Ok(())
}
