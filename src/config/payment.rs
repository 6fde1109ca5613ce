//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{SignatureTolerance, DEFAULT_TOLERANCE_SECS};

/// Payment configuration (Stripe)
///
/// Every value is optional: the service starts without them and the
/// endpoints that need them answer 503 until they are set.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    #[serde(default)]
    pub stripe_secret_key: Option<SecretString>,

    /// Stripe publishable key, handed to front-ends
    #[serde(default)]
    pub stripe_publishable_key: Option<String>,

    /// Stripe webhook signing secret
    #[serde(default)]
    pub stripe_webhook_secret: Option<SecretString>,

    /// Stripe price ID of the premium plan
    #[serde(default)]
    pub premium_price_id: Option<String>,

    /// Oldest accepted webhook signature, in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,

    /// Override for the Stripe API base URL
    #[serde(default)]
    pub stripe_api_base_url: Option<String>,
}

impl PaymentConfig {
    /// True when the secret key, publishable key and webhook secret are all set.
    pub fn is_configured(&self) -> bool {
        is_set(&self.stripe_secret_key)
            && self
                .stripe_publishable_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty())
            && is_set(&self.stripe_webhook_secret)
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_secret_key
            .as_ref()
            .is_some_and(|k| k.expose_secret().starts_with("sk_test_"))
    }

    pub fn signature_tolerance(&self) -> SignatureTolerance {
        SignatureTolerance::with_max_age(self.signature_tolerance_secs)
    }

    /// Validate the values that are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = exposed(&self.stripe_secret_key) {
            if !key.starts_with("sk_") && !key.starts_with("rk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }
        if let Some(key) = self.stripe_publishable_key.as_deref().filter(|k| !k.is_empty()) {
            if !key.starts_with("pk_") {
                return Err(ValidationError::InvalidPublishableKey);
            }
        }
        if let Some(secret) = exposed(&self.stripe_webhook_secret) {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            stripe_publishable_key: None,
            stripe_webhook_secret: None,
            premium_price_id: None,
            signature_tolerance_secs: default_signature_tolerance(),
            stripe_api_base_url: None,
        }
    }
}

fn exposed(secret: &Option<SecretString>) -> Option<&str> {
    secret
        .as_ref()
        .map(|s| s.expose_secret().as_str())
        .filter(|s| !s.trim().is_empty())
}

fn is_set(secret: &Option<SecretString>) -> bool {
    exposed(secret).is_some()
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> Option<SecretString> {
        Some(SecretString::new(value.to_string()))
    }

    fn configured() -> PaymentConfig {
        PaymentConfig {
            stripe_secret_key: secret("sk_test_abcd1234"),
            stripe_publishable_key: Some("pk_test_abcd1234".to_string()),
            stripe_webhook_secret: secret("whsec_xyz789"),
            premium_price_id: Some("price_premium".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_config_is_valid_but_unconfigured() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_configured());
        assert_eq!(config.signature_tolerance_secs, 300);
    }

    #[test]
    fn test_all_keys_make_it_configured() {
        let config = configured();
        assert!(config.validate().is_ok());
        assert!(config.is_configured());
        assert!(config.is_test_mode());
    }

    #[test]
    fn test_missing_publishable_key_is_unconfigured() {
        let config = PaymentConfig {
            stripe_publishable_key: None,
            ..configured()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn test_blank_webhook_secret_is_unconfigured() {
        let config = PaymentConfig {
            stripe_webhook_secret: secret("  "),
            ..configured()
        };
        assert!(!config.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_secret_key_prefix() {
        let config = PaymentConfig {
            stripe_secret_key: secret("pk_test_xxx"),
            ..configured()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: secret("secret_xxx"),
            ..configured()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_custom_tolerance_keeps_default_skew() {
        let config = PaymentConfig {
            signature_tolerance_secs: 600,
            ..configured()
        };
        let tolerance = config.signature_tolerance();
        assert_eq!(tolerance.max_age_secs, 600);
        assert_eq!(tolerance.max_skew_secs, SignatureTolerance::default().max_skew_secs);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", configured());
        assert!(!rendered.contains("sk_test_abcd1234"));
        assert!(!rendered.contains("whsec_xyz789"));
    }
}
