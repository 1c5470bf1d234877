//! Stripe-Signature verification over the raw request body.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ReconcileError, ReconcileResult};
use crate::stripe_events::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (either direction) of a signed timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry. Stripe sends several while a secret is being rolled.
    pub signatures: Vec<String>,
}

/// Parses `t=timestamp,v1=signature[,v1=signature...]`.
pub fn parse_signature_header(header: &str) -> ReconcileResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    ReconcileError::InvalidSignature("timestamp is not an integer".into())
                })?)
            }
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(ReconcileError::InvalidSignature(
            "header is missing t or v1".into(),
        )),
    }
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> ReconcileResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ReconcileError::InvalidSignature("webhook secret is unusable".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{timestamp}." ‖ payload`, as Stripe computes it.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> ReconcileResult<String> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the header against the exact bytes received.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> ReconcileResult<()> {
    let parsed = parse_signature_header(header)?;

    if now.abs_diff(parsed.timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(ReconcileError::InvalidSignature(
            "timestamp outside tolerance window".into(),
        ));
    }

    for candidate in &parsed.signatures {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        // verify_slice compares in constant time
        if signed_mac(secret, parsed.timestamp, payload)?
            .verify_slice(&expected)
            .is_ok()
        {
            return Ok(());
        }
    }

    Err(ReconcileError::InvalidSignature(
        "no signature matched the payload".into(),
    ))
}

/// Verify the payload and parse it into an event.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    webhook_secret: &str,
) -> ReconcileResult<StripeEvent> {
    verify_signature(
        payload,
        header,
        webhook_secret,
        chrono::Utc::now().timestamp(),
    )?;

    serde_json::from_slice(payload)
        .map_err(|e| ReconcileError::UnrecognizedEventShape(format!("event body: {e}")))
}
