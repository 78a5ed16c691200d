//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINE_BACKEND_URL` - Base URL of the hosted backend project
//! - `VITRINE_BACKEND_ANON_KEY` - Public API key (safe to expose to clients)
//!
//! ## Optional
//! - `VITRINE_BACKEND_SERVICE_ROLE_KEY` - Privileged server-side key that
//!   bypasses row-level rules (min entropy enforced, never logged)

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Connection settings for the hosted backend.
///
/// Implements `Debug` manually to redact the service-role key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the backend project.
    pub project_url: Url,
    /// Public API key sent with every request.
    pub anon_key: String,
    /// Privileged key for server-side jobs; bypasses row-level rules.
    pub service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("project_url", &self.project_url.as_str())
            .field("anon_key", &self.anon_key)
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, the URL does
    /// not parse, or the service-role key fails validation (placeholder
    /// detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let project_url = get_required_env("VITRINE_BACKEND_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("VITRINE_BACKEND_URL".to_string(), e.to_string())
            })?;
        let anon_key = get_required_env("VITRINE_BACKEND_ANON_KEY")?;

        let service_role_key = match get_optional_env("VITRINE_BACKEND_SERVICE_ROLE_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "VITRINE_BACKEND_SERVICE_ROLE_KEY")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            project_url,
            anon_key,
            service_role_key,
        })
    }

    /// The service-role key, if configured.
    #[must_use]
    pub fn service_role_key(&self) -> Option<&str> {
        self.service_role_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real keys are random-looking JWTs)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= \
                 {MIN_ENTROPY_BITS_PER_CHAR:.1}); use the key issued by the backend"
            ),
        ));
    }

    Ok(())
}
