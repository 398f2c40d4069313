use clap::{Parser, Subcommand};
use openclaw_common::args::{ConnectionsDocumentArgs, InternalAuthArgs, K8sArgs, PostgresArgs, RedisArgs};
use uuid::Uuid;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the dispatch loop that drains `operator:jobs` and drives Kubernetes.
    Server(ServerArgs),
    /// Push one job envelope onto `operator:jobs` by hand, e.g. to replay a
    /// dropped envelope (see the "Redis-only durability" open question).
    Enqueue(EnqueueArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    #[command(flatten)]
    pub postgres: PostgresArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub k8s: K8sArgs,

    #[command(flatten)]
    pub internal_auth: InternalAuthArgs,

    #[command(flatten)]
    pub connections_document: ConnectionsDocumentArgs,

    /// Base URL of the metered proxy's internal API, used to mint/revoke
    /// `ProxyToken`s during provision/destroy.
    #[arg(long, env = "PROXY_INTERNAL_URL", required = true)]
    pub proxy_internal_url: String,

    /// Public base URL of the metered proxy, written into each box's
    /// `OPENCLAW_PROXY_URL` secret key so its in-cluster agent knows where
    /// to send chat-completion traffic.
    #[arg(long, env = "PROXY_BASE_URL", required = true)]
    pub proxy_base_url: String,

    /// Consecutive `health_check` failures before a box is marked `unhealthy`.
    #[arg(long, env = "HEALTH_FAILURE_THRESHOLD", default_value_t = 3)]
    pub health_failure_threshold: i32,
}

#[derive(Debug, Clone, clap::Args)]
pub struct EnqueueArgs {
    #[command(flatten)]
    pub redis: RedisArgs,

    /// Job type, e.g. `provision`, `suspend`, `destroy`.
    #[arg(long)]
    pub job_type: String,

    #[arg(long)]
    pub customer_id: Uuid,

    #[arg(long)]
    pub box_id: Option<Uuid>,

    /// Raw JSON payload, if the job type needs one.
    #[arg(long)]
    pub payload: Option<String>,
}
