//! # Engine Configuration
//!
//! Gateway credentials, payment verification policy and store location.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARLOT_GATEWAY_KEY_SECRET=...                                      │
//! │     CARLOT_DATABASE_PATH=/var/lib/carlot/carlot.db                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     carlot.toml                                                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [gateway]
//! base_url = "https://api.razorpay.com/v1"
//! key_id = "rzp_live_xxx"
//! key_secret = "..."
//! currency = "INR"
//! timeout_secs = 10
//!
//! [payments]
//! allow_test_signatures = false   # never true in production
//! test_signature_prefix = "test_sig_"
//!
//! [database]
//! path = "./carlot.db"
//! max_connections = 5
//! ```
//!
//! The signing secret is read here, once, and handed to
//! [`PaymentService`](crate::payment::PaymentService) through
//! [`PaymentSettings`]. Services never look at the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use carlot_core::validation::validate_currency;
use carlot_core::{SignatureVerifier, TestSignatures};
use carlot_db::DbConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::payment::PaymentSettings;

// =============================================================================
// Gateway Settings
// =============================================================================

/// Payment gateway connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL; orders are created at `{base_url}/orders`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Basic-auth user for the gateway API.
    #[serde(default)]
    pub key_id: String,

    /// Basic-auth password and HMAC key for confirmation signatures.
    #[serde(default)]
    pub key_secret: String,

    /// Currency for new payments.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            base_url: default_base_url(),
            key_id: String::new(),
            key_secret: String::new(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Payment Verification Settings
// =============================================================================

/// Confirmation-signature policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPolicy {
    /// Accept signatures starting with `test_signature_prefix` without
    /// checking them. Non-production only.
    #[serde(default)]
    pub allow_test_signatures: bool,

    #[serde(default = "default_test_prefix")]
    pub test_signature_prefix: String,
}

fn default_test_prefix() -> String {
    "test_sig_".to_string()
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        PaymentPolicy {
            allow_test_signatures: false,
            test_signature_prefix: default_test_prefix(),
        }
    }
}

impl PaymentPolicy {
    pub fn test_signatures(&self) -> TestSignatures {
        if self.allow_test_signatures {
            TestSignatures::Allowed {
                prefix: self.test_signature_prefix.clone(),
            }
        } else {
            TestSignatures::Rejected
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./carlot.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub payments: PaymentPolicy,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl EngineConfig {
    /// Loads configuration: file (if given and present), then environment
    /// overrides, then validation.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!(?path, "Loading engine config from file");
                Self::from_toml_str(&std::fs::read_to_string(path)?)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        if config.payments.allow_test_signatures {
            warn!(
                prefix = %config.payments.test_signature_prefix,
                "Test signatures are accepted; do not run this configuration in production"
            );
        }

        Ok(config)
    }

    /// Parses a TOML document without applying overrides or validating.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gateway.key_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "gateway.key_secret must be set".into(),
            ));
        }

        let url = &self.gateway.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "gateway.base_url must start with http:// or https://, got: {url}"
            )));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "gateway.timeout_secs must be greater than 0".into(),
            ));
        }

        validate_currency(&self.gateway.currency)?;

        if self.payments.allow_test_signatures && self.payments.test_signature_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "payments.test_signature_prefix must not be empty".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `CARLOT_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CARLOT_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.base_url = url;
        }

        if let Some(key_id) = lookup("CARLOT_GATEWAY_KEY_ID") {
            self.gateway.key_id = key_id;
        }

        if let Some(secret) = lookup("CARLOT_GATEWAY_KEY_SECRET") {
            debug!("Overriding gateway secret from environment");
            self.gateway.key_secret = secret;
        }

        if let Some(currency) = lookup("CARLOT_CURRENCY") {
            self.gateway.currency = currency;
        }

        if let Some(timeout) = lookup("CARLOT_GATEWAY_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.gateway.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid CARLOT_GATEWAY_TIMEOUT_SECS"),
            }
        }

        if let Some(allow) = lookup("CARLOT_ALLOW_TEST_SIGNATURES") {
            match allow.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.payments.allow_test_signatures = true,
                "0" | "false" | "no" => self.payments.allow_test_signatures = false,
                _ => warn!(value = %allow, "Ignoring invalid CARLOT_ALLOW_TEST_SIGNATURES"),
            }
        }

        if let Some(path) = lookup("CARLOT_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Builds the settings injected into `PaymentService`.
    pub fn payment_settings(&self) -> ConfigResult<PaymentSettings> {
        let verifier = SignatureVerifier::new(
            self.gateway.key_secret.as_bytes(),
            self.payments.test_signatures(),
        )?;

        Ok(PaymentSettings {
            currency: self.gateway.currency.clone(),
            verifier,
        })
    }

    /// Store configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}
