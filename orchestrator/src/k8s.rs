//! Idempotent Kubernetes resource management for one customer box's
//! namespace. Every mutator here is safe to re-run: creation uses
//! server-side apply (`Patch::Apply`) under the shared field manager
//! [`openclaw_common::types::MANAGER_NAME`], so a partially-applied
//! `provision` job converges cleanly on retry (§8 testable property 10).

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ResourceQuota, Secret};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::Client;
use openclaw_common::types::{annotations, MANAGER_NAME};
use openclaw_common::types::{Tier, TierResources};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

const SECRET_NAME: &str = "openclaw-config";
const QUOTA_NAME: &str = "tier-limits";
const NETPOL_NAME: &str = "customer-isolation";
const DEPLOYMENT_NAME: &str = "openclaw-gateway";

fn apply_params() -> PatchParams {
    PatchParams::apply(MANAGER_NAME).force()
}

async fn apply<K>(api: &Api<K>, name: &str, body: Value) -> Result<()>
where
    K: kube::Resource
        + Clone
        + serde::de::DeserializeOwned
        + serde::Serialize
        + std::fmt::Debug,
{
    api.patch(name, &apply_params(), &Patch::Apply(body)).await?;
    Ok(())
}

/// Creates (or converges) the namespace, labeled with the customer and tier
/// so `kubectl get ns -l openclaw/customer=...` works for operators.
pub async fn ensure_namespace(client: Client, namespace: &str, customer_id: Uuid, tier: Tier) -> Result<()> {
    let api: Api<Namespace> = Api::all(client);
    let body = json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": namespace,
            "labels": {
                annotations::CUSTOMER: customer_id.to_string(),
                annotations::TIER: tier.as_str(),
                annotations::MANAGED_BY: MANAGER_NAME,
            }
        }
    });
    apply(&api, namespace, body).await
}

/// Secret key/value pairs the in-box agent reads as environment variables.
#[derive(Debug, Clone, Default)]
pub struct BoxSecretEnv {
    pub bot_token: Option<String>,
    pub telegram_user_ids: Option<Vec<i64>>,
    pub proxy_token: Option<String>,
    pub proxy_base_url: Option<String>,
    pub model: Option<String>,
    pub thinking_level: Option<String>,
    pub system_prompt: Option<String>,
    pub connections_json: Option<String>,
}

impl BoxSecretEnv {
    fn into_string_data(self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        if let Some(v) = self.bot_token {
            data.insert("TELEGRAM_BOT_TOKEN".to_string(), v);
        }
        if let Some(v) = self.telegram_user_ids {
            data.insert(
                "TELEGRAM_ALLOWED_USER_IDS".to_string(),
                v.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","),
            );
        }
        if let Some(v) = self.proxy_token {
            data.insert("OPENCLAW_PROXY_TOKEN".to_string(), v);
        }
        if let Some(v) = self.proxy_base_url {
            data.insert("OPENCLAW_PROXY_URL".to_string(), v);
        }
        if let Some(v) = self.model {
            data.insert("OPENCLAW_MODEL".to_string(), v);
        }
        if let Some(v) = self.thinking_level {
            data.insert("OPENCLAW_THINKING_LEVEL".to_string(), v);
        }
        if let Some(v) = self.system_prompt {
            data.insert("OPENCLAW_SYSTEM_PROMPT".to_string(), v);
        }
        if let Some(v) = self.connections_json {
            data.insert("OPENCLAW_CONNECTIONS".to_string(), v);
        }
        data
    }
}

/// Creates the secret on first provision, with every known key populated.
pub async fn ensure_secret(client: Client, namespace: &str, env: BoxSecretEnv) -> Result<()> {
    let api: Api<Secret> = Api::namespaced(client, namespace);
    let body = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": SECRET_NAME },
        "stringData": env.into_string_data(),
    });
    apply(&api, SECRET_NAME, body).await
}

/// Patches only the supplied subset of env keys, leaving the rest of the
/// secret untouched (server-side apply merges `stringData` per-key).
pub async fn patch_secret_keys(client: Client, namespace: &str, keys: BTreeMap<String, String>) -> Result<()> {
    let api: Api<Secret> = Api::namespaced(client, namespace);
    let body = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": SECRET_NAME },
        "stringData": keys,
    });
    apply(&api, SECRET_NAME, body).await
}

pub async fn ensure_quota(client: Client, namespace: &str, tier: Tier) -> Result<()> {
    let r: TierResources = tier.resources();
    let api: Api<ResourceQuota> = Api::namespaced(client, namespace);
    let body = json!({
        "apiVersion": "v1",
        "kind": "ResourceQuota",
        "metadata": { "name": QUOTA_NAME },
        "spec": {
            "hard": {
                "requests.cpu": r.cpu_request,
                "requests.memory": r.memory_request,
                "limits.cpu": r.cpu_limit,
                "limits.memory": r.memory_limit,
            }
        }
    });
    apply(&api, QUOTA_NAME, body).await
}

/// Default-deny, with egress carved out for platform services and the
/// public internet on 443 (excluding RFC1918 ranges) plus DNS.
pub async fn ensure_network_policy(client: Client, namespace: &str, platform_cidrs: &[String]) -> Result<()> {
    let api: Api<NetworkPolicy> = Api::namespaced(client, namespace);
    let mut egress_to = vec![
        json!({"ipBlock": {"cidr": "0.0.0.0/0", "except": [
            "10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16",
        ]}}),
    ];
    for cidr in platform_cidrs {
        egress_to.push(json!({"ipBlock": {"cidr": cidr}}));
    }
    let body = json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": { "name": NETPOL_NAME },
        "spec": {
            "podSelector": {},
            "policyTypes": ["Egress"],
            "egress": [
                { "to": egress_to, "ports": [{"protocol": "TCP", "port": 443}] },
                { "ports": [{"protocol": "UDP", "port": 53}] },
            ],
        }
    });
    apply(&api, NETPOL_NAME, body).await
}

pub async fn ensure_deployment(
    client: Client,
    namespace: &str,
    image: &str,
    tier: Tier,
    rollout_annotation: Option<String>,
) -> Result<()> {
    let r = tier.resources();
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let mut pod_annotations = serde_json::Map::new();
    if let Some(restart_at) = rollout_annotation {
        pod_annotations.insert("openclaw/restartedAt".to_string(), json!(restart_at));
    }
    let body = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": DEPLOYMENT_NAME },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": { "app": DEPLOYMENT_NAME } },
            "template": {
                "metadata": {
                    "labels": { "app": DEPLOYMENT_NAME },
                    "annotations": pod_annotations,
                },
                "spec": {
                    "containers": [{
                        "name": "gateway",
                        "image": image,
                        "envFrom": [{ "secretRef": { "name": SECRET_NAME } }],
                        "resources": {
                            "requests": { "cpu": r.cpu_request, "memory": r.memory_request },
                            "limits": { "cpu": r.cpu_limit, "memory": r.memory_limit },
                        },
                    }],
                }
            }
        }
    });
    apply(&api, DEPLOYMENT_NAME, body).await
}

/// Scales the gateway deployment to `replicas` (0 for suspend, 1 for
/// reactivate) without otherwise touching its spec.
pub async fn scale_deployment(client: Client, namespace: &str, replicas: i32) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let body = json!({ "spec": { "replicas": replicas } });
    api.patch(
        DEPLOYMENT_NAME,
        &apply_params(),
        &Patch::Apply(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": DEPLOYMENT_NAME },
            "spec": body["spec"],
        })),
    )
    .await?;
    Ok(())
}

/// Bumps the pod template annotation to trigger a rolling restart, the
/// standard `kubectl rollout restart` trick.
pub async fn trigger_rollout_restart(client: Client, namespace: &str, restart_at: String) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let body = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": DEPLOYMENT_NAME },
        "spec": {
            "template": {
                "metadata": {
                    "annotations": { "openclaw/restartedAt": restart_at }
                }
            }
        }
    });
    apply(&api, DEPLOYMENT_NAME, body).await
}

pub async fn patch_deployment_resources(client: Client, namespace: &str, tier: Tier) -> Result<()> {
    let r = tier.resources();
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let body = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": DEPLOYMENT_NAME },
        "spec": {
            "template": {
                "spec": {
                    "containers": [{
                        "name": "gateway",
                        "resources": {
                            "requests": { "cpu": r.cpu_request, "memory": r.memory_request },
                            "limits": { "cpu": r.cpu_limit, "memory": r.memory_limit },
                        }
                    }]
                }
            }
        }
    });
    apply(&api, DEPLOYMENT_NAME, body).await
}

/// Polls until at least one replica is ready, or `timeout` elapses.
pub async fn wait_for_pod_ready(client: Client, namespace: &str, timeout: Duration) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let dep = api.get(DEPLOYMENT_NAME).await?;
        let ready = dep
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        if ready >= 1 {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::RolloutTimeout(format!(
                "namespace {namespace} deployment {DEPLOYMENT_NAME} never became ready"
            )));
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

/// Polls until a rollout completes: `updated_replicas == spec.replicas`,
/// `ready_replicas >= spec.replicas`, `unavailable_replicas == 0`.
pub async fn wait_for_rollout(client: Client, namespace: &str, timeout: Duration) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let dep = api.get(DEPLOYMENT_NAME).await?;
        let wanted = dep.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = dep.status.unwrap_or_default();
        let updated = status.updated_replicas.unwrap_or(0);
        let ready = status.ready_replicas.unwrap_or(0);
        let unavailable = status.unavailable_replicas.unwrap_or(0);
        if updated >= wanted && ready >= wanted && unavailable == 0 {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::RolloutTimeout(format!(
                "namespace {namespace} deployment {DEPLOYMENT_NAME} rollout did not converge"
            )));
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

/// Current `ready_replicas`, used by the `health_check` handler.
pub async fn ready_replicas(client: Client, namespace: &str) -> Result<i32> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    match api.get_opt(DEPLOYMENT_NAME).await? {
        Some(dep) => Ok(dep.status.and_then(|s| s.ready_replicas).unwrap_or(0)),
        None => Ok(0),
    }
}

/// Deletes the namespace, cascading every child resource. Treated as success
/// even if the namespace is already gone.
pub async fn delete_namespace(client: Client, namespace: &str) -> Result<()> {
    let api: Api<Namespace> = Api::all(client);
    match api.delete(namespace, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(Error::Kube(e)),
    }
}
