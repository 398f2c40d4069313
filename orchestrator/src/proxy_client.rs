//! Thin client for the metered proxy's shared-secret-protected internal API
//! (§6), used by the `provision` and `destroy` handlers to mint/revoke the
//! box's `ProxyToken` without either component touching the other's store
//! queries directly.

use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
    internal_key: String,
}

#[derive(Debug, Deserialize)]
pub struct MintedToken {
    pub token_id: Uuid,
    pub token: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, internal_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            internal_key: internal_key.into(),
        }
    }

    pub async fn mint_token(&self, customer_id: Uuid, box_id: Uuid) -> Result<MintedToken> {
        let resp = self
            .client
            .post(format!("{}/internal/tokens", self.base_url))
            .header("X-Internal-Key", &self.internal_key)
            .json(&serde_json::json!({ "customer_id": customer_id, "box_id": box_id }))
            .send()
            .await
            .context("failed to reach proxy internal API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "proxy token mint failed: {status} - {body}"
            )));
        }

        resp.json()
            .await
            .context("failed to parse mint-token response")
            .map_err(Error::Other)
    }

    pub async fn revoke_token(&self, token_id: Uuid) -> Result<()> {
        let resp = self
            .client
            .delete(format!("{}/internal/tokens/{token_id}", self.base_url))
            .header("X-Internal-Key", &self.internal_key)
            .send()
            .await
            .context("failed to reach proxy internal API")?;

        // 404 means the token is already revoked or gone; destroy is
        // idempotent, so that's success too.
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "proxy token revoke failed: {status} - {body}"
            )));
        }
        Ok(())
    }
}
