//! `Stripe-Signature` verification: `t=<unix_ts>,v1=<hex hmac>[,v1=<hex hmac>...]`
//! over the literal byte string `<ts>.<raw body>`, HMAC-SHA256 keyed by the
//! webhook's signing secret. Constant-time compare via `Hmac::verify_slice`.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Verifies `header` against `body` using `secret`, rejecting a signature
/// whose `t=` timestamp is more than `tolerance_seconds` away from now (a
/// replay-attack guard, not a clock-skew allowance for legitimate delay).
pub fn verify(header: &str, body: &[u8], secret: &str, tolerance_seconds: i64) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => {
                timestamp = v.parse().ok();
            }
            (Some("v1"), Some(v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(Error::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(Error::InvalidSignature);
    }

    let now = Utc::now().timestamp();
    if (now - timestamp).abs() > tolerance_seconds {
        return Err(Error::InvalidSignature);
    }

    let mut signed_payload = Vec::with_capacity(body.len() + 32);
    signed_payload.extend_from_slice(timestamp.to_string().as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(body);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::InvalidSignature)?;
    mac.update(&signed_payload);

    for sig in signatures {
        let Ok(decoded) = hex::decode(sig) else {
            continue;
        };
        if mac.clone().verify_slice(&decoded).is_ok() {
            return Ok(());
        }
    }
    Err(Error::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
        let mut payload = Vec::new();
        payload.extend_from_slice(timestamp.to_string().as_bytes());
        payload.push(b'.');
        payload.extend_from_slice(body);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(&payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let secret = "whsec_test";
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc::now().timestamp();
        let sig = sign(secret, now, body);
        let header = format!("t={now},v1={sig}");
        assert!(verify(&header, body, secret, 300).is_ok());
    }

    #[test]
    fn rejects_a_tampered_body() {
        let secret = "whsec_test";
        let body = br#"{"id":"evt_1"}"#;
        let now = Utc::now().timestamp();
        let sig = sign(secret, now, body);
        let header = format!("t={now},v1={sig}");
        let tampered = br#"{"id":"evt_2"}"#;
        assert!(verify(&header, tampered, secret, 300).is_err());
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let secret = "whsec_test";
        let body = br#"{"id":"evt_1"}"#;
        let stale = Utc::now().timestamp() - 10_000;
        let sig = sign(secret, stale, body);
        let header = format!("t={stale},v1={sig}");
        assert!(verify(&header, body, secret, 300).is_err());
    }
}
