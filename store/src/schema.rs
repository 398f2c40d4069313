use deadpool_postgres::Pool;

use crate::error::Result;

/// Creates every table/index this workspace needs if it does not already
/// exist. Deliberately migration-tool-free: every statement is additive and
/// safe to re-run, matching the teacher's own schema-bootstrap convention
/// (sequential `CREATE TABLE IF NOT EXISTS` + `ALTER TABLE ... ADD COLUMN IF
/// NOT EXISTS` for backward-compatible additions).
///
/// Enum-like columns (tier, status, job_type, ...) are plain `TEXT` with a
/// `CHECK` constraint rather than native Postgres enum types, since enum
/// types can't be created with an `IF NOT EXISTS` guard and this workspace
/// has no separate migration runner to create them ahead of time.
pub async fn init_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            r#"
CREATE TABLE IF NOT EXISTS customers (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email               TEXT NOT NULL UNIQUE,
    stripe_customer_id  TEXT UNIQUE,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at          TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_customers_stripe_customer_id ON customers (stripe_customer_id);
CREATE INDEX IF NOT EXISTS idx_customers_email_active ON customers (email) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS subscriptions (
    id                      UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id             UUID NOT NULL REFERENCES customers (id),
    stripe_subscription_id  TEXT UNIQUE,
    stripe_price_id         TEXT,
    tier                    TEXT NOT NULL CHECK (tier IN ('starter', 'pro', 'team')),
    status                  TEXT NOT NULL DEFAULT 'active'
                                CHECK (status IN ('trialing', 'active', 'past_due', 'suspended', 'cancelled')),
    tokens_limit            BIGINT NOT NULL,
    current_period_start    TIMESTAMPTZ NOT NULL,
    current_period_end      TIMESTAMPTZ NOT NULL,
    created_at              TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_customer_id ON subscriptions (customer_id);
CREATE INDEX IF NOT EXISTS idx_subscriptions_stripe_subscription_id ON subscriptions (stripe_subscription_id);

CREATE TABLE IF NOT EXISTS bundles (
    id                      UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    slug                    TEXT NOT NULL UNIQUE,
    name                    TEXT NOT NULL,
    icon                    TEXT,
    recommended_providers   TEXT[] NOT NULL DEFAULT '{}',
    default_system_prompt   TEXT,
    default_model           TEXT NOT NULL DEFAULT 'kimi-coding/k2p5',
    created_at              TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS boxes (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id         UUID NOT NULL REFERENCES customers (id),
    subscription_id     UUID NOT NULL REFERENCES subscriptions (id),
    bundle_id           UUID REFERENCES bundles (id),
    k8s_namespace       TEXT NOT NULL UNIQUE,
    telegram_user_ids   BIGINT[] NOT NULL DEFAULT '{}',
    language            TEXT NOT NULL DEFAULT 'en',
    model               TEXT NOT NULL DEFAULT 'kimi-coding/k2p5',
    thinking_level      TEXT NOT NULL DEFAULT 'medium',
    system_prompt       TEXT,
    status              TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'provisioning', 'active', 'updating',
                                               'suspended', 'unhealthy', 'destroying', 'destroyed')),
    health_failures     INTEGER NOT NULL DEFAULT 0,
    last_seen           TIMESTAMPTZ,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
    activated_at        TIMESTAMPTZ,
    last_updated        TIMESTAMPTZ,
    destroyed_at        TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_boxes_customer_id ON boxes (customer_id);
CREATE INDEX IF NOT EXISTS idx_boxes_status_active ON boxes (status) WHERE status != 'destroyed';

CREATE TABLE IF NOT EXISTS proxy_tokens (
    id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id  UUID NOT NULL REFERENCES customers (id),
    box_id       UUID NOT NULL REFERENCES boxes (id),
    token_hash   TEXT NOT NULL UNIQUE,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    revoked_at   TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_proxy_tokens_hash_active ON proxy_tokens (token_hash) WHERE revoked_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_proxy_tokens_customer_id ON proxy_tokens (customer_id);

CREATE TABLE IF NOT EXISTS usage_monthly (
    id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id   UUID NOT NULL REFERENCES customers (id),
    period_start  TIMESTAMPTZ NOT NULL,
    period_end    TIMESTAMPTZ NOT NULL,
    tokens_used   BIGINT NOT NULL DEFAULT 0,
    tokens_limit  BIGINT NOT NULL,
    reset_at      TIMESTAMPTZ,
    UNIQUE (customer_id, period_start)
);

CREATE INDEX IF NOT EXISTS idx_usage_monthly_customer_period ON usage_monthly (customer_id, period_start);

CREATE TABLE IF NOT EXISTS usage_events (
    id                  BIGSERIAL PRIMARY KEY,
    customer_id         UUID NOT NULL REFERENCES customers (id),
    box_id              UUID NOT NULL REFERENCES boxes (id),
    ts                  TIMESTAMPTZ NOT NULL DEFAULT now(),
    model               TEXT NOT NULL,
    prompt_tokens       INTEGER NOT NULL,
    completion_tokens   INTEGER NOT NULL,
    total_tokens        INTEGER NOT NULL GENERATED ALWAYS AS (prompt_tokens + completion_tokens) STORED,
    request_id          TEXT
);

CREATE INDEX IF NOT EXISTS idx_usage_events_customer_ts ON usage_events (customer_id, ts);
CREATE UNIQUE INDEX IF NOT EXISTS idx_usage_events_request_id ON usage_events (request_id) WHERE request_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS onboarding_sessions (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id         UUID REFERENCES customers (id),
    session_token       TEXT NOT NULL UNIQUE,
    state               TEXT NOT NULL DEFAULT 'new'
                            CHECK (state IN ('new', 'greeting', 'gathering_use_case', 'gathering_telegram',
                                              'gathering_preferences', 'recommending_tier', 'awaiting_payment',
                                              'provisioning', 'complete', 'failed', 'abandoned')),
    messages            JSONB NOT NULL DEFAULT '[]',
    derived_config      JSONB,
    telegram_user_id    BIGINT,
    detected_language   TEXT,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
    expires_at          TIMESTAMPTZ NOT NULL DEFAULT (now() + interval '24 hours')
);

CREATE INDEX IF NOT EXISTS idx_onboarding_sessions_token ON onboarding_sessions (session_token);
CREATE INDEX IF NOT EXISTS idx_onboarding_sessions_expires ON onboarding_sessions (expires_at)
    WHERE state NOT IN ('complete', 'failed');

CREATE TABLE IF NOT EXISTS operator_jobs (
    id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id   UUID NOT NULL REFERENCES customers (id),
    box_id        UUID REFERENCES boxes (id),
    job_type      TEXT NOT NULL CHECK (job_type IN ('provision', 'update', 'update_connections', 'destroy',
                                                      'suspend', 'reactivate', 'resize', 'health_check')),
    status        TEXT NOT NULL DEFAULT 'queued' CHECK (status IN ('queued', 'running', 'complete', 'failed')),
    payload       JSONB NOT NULL DEFAULT '{}',
    error_log     TEXT,
    started_at    TIMESTAMPTZ,
    completed_at  TIMESTAMPTZ,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_operator_jobs_customer_created ON operator_jobs (customer_id, created_at);
CREATE INDEX IF NOT EXISTS idx_operator_jobs_status_active ON operator_jobs (status) WHERE status IN ('queued', 'running');

CREATE TABLE IF NOT EXISTS customer_connections (
    id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id    UUID NOT NULL REFERENCES customers (id),
    provider       TEXT NOT NULL,
    connection_id  TEXT NOT NULL,
    active         BOOLEAN NOT NULL DEFAULT true,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (customer_id, provider)
);

CREATE INDEX IF NOT EXISTS idx_customer_connections_customer_active
    ON customer_connections (customer_id) WHERE active;

CREATE TABLE IF NOT EXISTS billing_events (
    id           TEXT PRIMARY KEY,
    event_type   TEXT NOT NULL,
    received_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ
);
"#,
        )
        .await?;

    tracing::info!("database schema initialized");
    Ok(())
}
