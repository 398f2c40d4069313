mod destroy;
mod health_check;
mod provision;
mod reactivate;
mod resize;
mod suspend;
mod update;
mod update_connections;

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::Pool;
use kube::Client;
use openclaw_common::args::ConnectionsDocumentArgs;
use openclaw_common::types::JobEnvelope;

use crate::error::Result;
use crate::proxy_client::ProxyClient;

/// Everything a handler needs: the store pool, a Kubernetes client, the
/// proxy's internal API client, and the knobs from [`crate::args::ServerArgs`]
/// handlers consult (box image, timeouts, health threshold, egress allowlist).
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<CtxInner>,
}

struct CtxInner {
    pub pool: Pool,
    pub redis: deadpool_redis::Pool,
    pub k8s: Client,
    pub proxy: ProxyClient,
    pub box_image: String,
    pub pod_ready_timeout: Duration,
    pub rollout_timeout: Duration,
    pub health_failure_threshold: i32,
    pub proxy_base_url: String,
    pub platform_egress_cidrs: Vec<String>,
    pub connections_document: ConnectionsDocumentArgs,
}

impl std::ops::Deref for Ctx {
    type Target = CtxInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Ctx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: Pool,
        redis: deadpool_redis::Pool,
        k8s: Client,
        proxy: ProxyClient,
        box_image: String,
        pod_ready_timeout: Duration,
        rollout_timeout: Duration,
        health_failure_threshold: i32,
        proxy_base_url: String,
        platform_egress_cidrs: Vec<String>,
        connections_document: ConnectionsDocumentArgs,
    ) -> Self {
        Self {
            inner: Arc::new(CtxInner {
                pool,
                redis,
                k8s,
                proxy,
                box_image,
                pod_ready_timeout,
                rollout_timeout,
                health_failure_threshold,
                proxy_base_url,
                platform_egress_cidrs,
                connections_document,
            }),
        }
    }
}

/// Dispatches one envelope to its type-specific handler. Mirrors spec.md
/// §4.1's "Handlers ... all take (payload, customer_id, store_session)".
pub async fn dispatch(ctx: &Ctx, envelope: &JobEnvelope) -> Result<()> {
    use openclaw_common::types::JobType::*;
    match envelope.job_type {
        Provision => provision::handle(ctx, envelope).await,
        Update => update::handle(ctx, envelope).await,
        UpdateConnections => update_connections::handle(ctx, envelope).await,
        Destroy => destroy::handle(ctx, envelope).await,
        Suspend => suspend::handle(ctx, envelope).await,
        Reactivate => reactivate::handle(ctx, envelope).await,
        Resize => resize::handle(ctx, envelope).await,
        HealthCheck => health_check::handle(ctx, envelope).await,
    }
}

pub(crate) fn box_id(envelope: &JobEnvelope) -> Result<uuid::Uuid> {
    envelope
        .box_id
        .ok_or_else(|| crate::error::Error::InvalidPayload("job requires box_id".to_string()))
}
