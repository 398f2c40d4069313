use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    #[arg(long, env = "NATS_URL", required = true)]
    pub nats_url: String,

    #[arg(long, env = "NATS_USER", default_value = "app")]
    pub nats_user: String,

    #[arg(long, env = "NATS_PASSWORD", default_value = "devpass")]
    pub nats_password: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PostgresArgs {
    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub postgres_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub postgres_port: u16,

    #[arg(long, env = "POSTGRES_DATABASE", default_value = "postgres")]
    pub postgres_database: String,

    #[arg(long, env = "POSTGRES_USERNAME", default_value = "postgres")]
    pub postgres_username: String,

    #[arg(long, env = "POSTGRES_PASSWORD")]
    pub postgres_password: Option<String>,

    #[arg(long, env = "POSTGRES_CA_CERT")]
    pub postgres_ca_cert: Option<String>,

    #[arg(long, env = "POSTGRES_SSL_MODE", default_value = "prefer")]
    pub postgres_ssl_mode: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RedisArgs {
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_USERNAME")]
    pub redis_username: Option<String>,

    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    #[arg(long, env = "REDIS_PROTO", default_value = "redis")]
    pub redis_proto: String,
}

impl RedisArgs {
    pub fn url_redacted(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}",
            if self.redis_proto.is_empty() {
                "redis"
            } else {
                &self.redis_proto
            },
            self.redis_username.as_deref().unwrap_or(""),
            self.redis_password.as_deref().map(|_| "****").unwrap_or(""),
            self.redis_host,
            self.redis_port
        )
    }

    pub fn url(&self) -> String {
        let proto = if self.redis_proto.is_empty() {
            "redis"
        } else {
            &self.redis_proto
        };
        let mut url = format!("{}://", proto);
        if let Some(ref username) = self.redis_username {
            url.push_str(username);
            if let Some(ref password) = self.redis_password {
                url.push(':');
                url.push_str(password);
            }
            url.push('@');
        } else if let Some(ref password) = self.redis_password {
            url.push(':');
            url.push_str(password);
            url.push('@');
        }
        url.push_str(&format!("{}:{}/", self.redis_host, self.redis_port));
        url
    }
}

#[derive(Parser, Debug, Clone)]
pub struct InternalAuthArgs {
    /// Shared secret required on the `X-Internal-Key` header for
    /// service-to-service calls (e.g. the orchestrator minting proxy tokens).
    #[arg(long, env = "INTERNAL_API_KEY", default_value = "")]
    pub internal_api_key: String,
}

impl InternalAuthArgs {
    pub fn verify(&self, provided: Option<&str>) -> bool {
        !self.internal_api_key.is_empty() && provided == Some(self.internal_api_key.as_str())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct WebhookArgs {
    /// Shared signing secret used to verify `Stripe-Signature` headers on
    /// incoming billing webhooks.
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", required = true)]
    pub stripe_webhook_secret: String,

    /// Max age, in seconds, a webhook's `t=` timestamp may differ from now
    /// before it is rejected as stale (replay-attack mitigation).
    #[arg(long, env = "WEBHOOK_TOLERANCE_SECONDS", default_value_t = 300)]
    pub tolerance_seconds: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct UpstreamArgs {
    /// Base URL of the upstream LLM API the metered proxy forwards to.
    #[arg(
        long,
        env = "UPSTREAM_BASE_URL",
        default_value = "https://api.moonshot.cn/v1"
    )]
    pub upstream_base_url: String,

    /// API key used to authenticate to the upstream LLM API.
    #[arg(long, env = "UPSTREAM_API_KEY", required = true)]
    pub upstream_api_key: String,

    /// Requests per second allotted (and refilled) per customer.
    #[arg(long, env = "RATE_LIMIT_RPS", default_value_t = 10)]
    pub rate_limit_rps: i64,

    #[arg(long, env = "USAGE_FLUSH_INTERVAL_S", default_value_t = 5.0)]
    pub usage_flush_interval_s: f64,

    #[arg(long, env = "USAGE_FLUSH_BATCH_SIZE", default_value_t = 100)]
    pub usage_flush_batch_size: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct K8sArgs {
    /// Timeout, in seconds, to wait for a newly-provisioned box's pod to
    /// become ready before the `provision` job fails.
    #[arg(long, env = "POD_READY_TIMEOUT", default_value_t = 120)]
    pub pod_ready_timeout: u64,

    /// Timeout, in seconds, to wait for a rollout to complete after
    /// `update`/`update_connections`/`resize` restart a box's deployment.
    #[arg(long, env = "ROLLOUT_TIMEOUT", default_value_t = 60)]
    pub rollout_timeout: u64,

    /// Container image used for every customer box deployment.
    #[arg(
        long,
        env = "BOX_IMAGE",
        default_value = "ghcr.io/openclaw/openclaw-bot:latest"
    )]
    pub box_image: String,
}

/// Coordinates for the external collaborators a box's `OPENCLAW_CONNECTIONS`
/// document needs to reach: the OAuth-aggregation connection broker, this
/// workspace's own API shell, and the web frontend (spec.md §4.1
/// `update_connections`'s literal field list).
#[derive(Parser, Debug, Clone)]
pub struct ConnectionsDocumentArgs {
    #[arg(long, env = "CONNECTION_BROKER_URL", default_value = "")]
    pub broker_url: String,

    #[arg(long, env = "CONNECTION_BROKER_SECRET", default_value = "")]
    pub broker_secret: String,

    #[arg(long, env = "OPENCLAW_API_URL", default_value = "")]
    pub api_url: String,

    #[arg(long, env = "OPENCLAW_API_SECRET", default_value = "")]
    pub api_secret: String,

    #[arg(long, env = "OPENCLAW_WEB_URL", default_value = "")]
    pub web_url: String,
}
