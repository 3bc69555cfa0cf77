//! Environment configuration.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file.

use std::time::Duration;
use thiserror::Error;

use crate::payment::ZarinpalConfig;
use crate::services::PaymentSettings;

const DEFAULT_PORT: &str = "8083";
const DEFAULT_CALLBACK_URL: &str = "http://localhost:8083/api/v1/payments/callback";
const DEFAULT_DESCRIPTION: &str = "Storefront order payment";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: String,
    /// Postgres URL; the service falls back to in-memory stores when unset.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub event_prefix: String,
    pub gateway: ZarinpalConfig,
    pub payment: PaymentSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let merchant_id = var("ZARINPAL_MERCHANT_ID").ok_or(ConfigError::Missing("ZARINPAL_MERCHANT_ID"))?;
        let sandbox = match var("ZARINPAL_SANDBOX").as_deref() {
            None => true,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => return Err(ConfigError::Invalid { name: "ZARINPAL_SANDBOX", value: other.to_string() }),
        };
        let timeout_secs = parse_or(var("GATEWAY_TIMEOUT_SECS"), "GATEWAY_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS)?;
        let max_connections = parse_or(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        Ok(Self {
            port: var("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string()),
            database_url: var("DATABASE_URL"),
            max_connections,
            nats_url: var("NATS_URL"),
            event_prefix: var("EVENT_SUBJECT_PREFIX").unwrap_or_else(|| "storefront".to_string()),
            gateway: ZarinpalConfig { merchant_id, sandbox, timeout: Duration::from_secs(timeout_secs) },
            payment: PaymentSettings {
                callback_url: var("PAYMENT_CALLBACK_URL").unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string()),
                description: var("PAYMENT_DESCRIPTION").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("ZARINPAL_MERCHANT_ID", "abc")]).unwrap();
        assert_eq!(cfg.port, "8083");
        assert!(cfg.database_url.is_none());
        assert!(cfg.gateway.sandbox);
        assert_eq!(cfg.gateway.timeout, Duration::from_secs(15));
        assert_eq!(cfg.payment.callback_url, DEFAULT_CALLBACK_URL);
    }

    #[test]
    fn test_missing_merchant() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("ZARINPAL_MERCHANT_ID"))));
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("ZARINPAL_MERCHANT_ID", "abc"), ("ZARINPAL_SANDBOX", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ZARINPAL_SANDBOX", .. }));
        let err = config(&[("ZARINPAL_MERCHANT_ID", "abc"), ("GATEWAY_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "GATEWAY_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("ZARINPAL_MERCHANT_ID", "abc"),
            ("ZARINPAL_SANDBOX", "false"),
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
        ])
        .unwrap();
        assert!(!cfg.gateway.sandbox);
        assert_eq!(cfg.port, "9000");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shop"));
    }
}
