//! Stripe webhook signature verification.
//!
//! Implements secure verification of Stripe webhook signatures using HMAC-SHA256.
//! Includes timestamp validation to prevent replay attacks.
//!
//! The signature is checked over the raw body before any JSON parsing, so an
//! unauthenticated caller can never reach the envelope decoder.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute). Stripe's own
/// libraries only bound the past; a timestamp from the future is rejected here
/// as well.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Accepted window around the signature timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureTolerance {
    /// How far in the past the timestamp may be.
    pub max_age_secs: i64,
    /// How far in the future the timestamp may be.
    pub max_skew_secs: i64,
}

impl Default for SignatureTolerance {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_TOLERANCE_SECS,
            max_skew_secs: MAX_CLOCK_SKEW_SECS,
        }
    }
}

impl SignatureTolerance {
    /// Tolerance with a custom maximum age and the default clock skew.
    pub fn with_max_age(max_age_secs: i64) -> Self {
        Self {
            max_age_secs,
            ..Self::default()
        }
    }
}

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). More than one during secret rotation.
    pub v1_signatures: Vec<Vec<u8>>,
    /// Optional v0 legacy signature, never used for verification.
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>...][,v0=<legacy>]`
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| invalid_header("invalid header format"))?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| invalid_header("invalid timestamp"))?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex::decode(value)
                            .map_err(|_| invalid_header("invalid v1 signature hex"))?,
                    );
                }
                "v0" => {
                    v0_signature = hex::decode(value).ok();
                }
                _ => {
                    // Ignore unknown schemes for forward compatibility
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| invalid_header("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(invalid_header("missing v1 signature"));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
            v0_signature,
        })
    }
}

fn invalid_header(reason: &str) -> WebhookError {
    WebhookError::InvalidSignatureHeader(reason.to_string())
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    /// The webhook signing secret from Stripe dashboard.
    secret: String,
    tolerance: SignatureTolerance,
}

impl StripeWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: SignatureTolerance::default(),
        }
    }

    /// Overrides the timestamp tolerance.
    pub fn with_tolerance(mut self, tolerance: SignatureTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare against every v1 signature in constant time
    /// 5. Parse the JSON payload into a StripeEvent
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify_and_parse`](Self::verify_and_parse) against a fixed clock.
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_at(payload, signature_header, now)?;

        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }

    /// Checks authenticity only.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected = compute_signature(&self.secret, header.timestamp, payload)?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now.saturating_sub(timestamp);

        if age > self.tolerance.max_age_secs || age < -self.tolerance.max_skew_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }

        Ok(())
    }
}

/// Builds a valid `stripe-signature` header for `payload`.
///
/// Used to sign fixtures and replayed events in tests and local tooling.
pub fn generate_signature_header(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, WebhookError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`.
fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
