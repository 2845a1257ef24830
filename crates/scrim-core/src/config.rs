//! Deployment configuration.
//!
//! Operators configure three things: the shared secret that authenticates
//! webhook deployments, whether the webhook path may carry script payloads,
//! and the body-size ceiling. Everything defaults closed: with no secret
//! configured the system accepts no deployments at all.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Default body-size ceiling, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 512_000;

/// Floor for the operator-configured ceiling. Values below it fall back to
/// [`DEFAULT_MAX_BODY_BYTES`] rather than erroring, so a typo in the config
/// cannot silently lock every caller out.
pub const MIN_MAX_BODY_BYTES: usize = 10_240;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML source could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Operator configuration for the deployment pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Shared secret authenticating webhook deployments. Unset means the
    /// pipeline rejects every deployment (fail-closed). Never logged; the
    /// `Debug` representation is redacted by the wrapper type.
    pub shared_secret: Option<SecretString>,

    /// Whether the webhook path may persist script payloads. Off by
    /// default; entirely independent of the editorial script capability.
    pub allow_webhook_script: bool,

    /// Configured body-size ceiling in bytes. Prefer
    /// [`DeployConfig::effective_max_body_bytes`], which applies the floor.
    pub max_body_bytes: usize,
}

impl DeployConfig {
    /// A fail-closed configuration with a shared secret set.
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            shared_secret: Some(SecretString::from(secret.into())),
            allow_webhook_script: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Enables script payloads over the webhook path.
    #[must_use]
    pub fn allow_webhook_script(mut self) -> Self {
        self.allow_webhook_script = true;
        self
    }

    /// Overrides the body-size ceiling.
    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Parses configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or an unexpected
    /// shape.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The ceiling actually enforced: configured values below the floor
    /// (including the unset zero) fall back to the default.
    #[must_use]
    pub const fn effective_max_body_bytes(&self) -> usize {
        if self.max_body_bytes < MIN_MAX_BODY_BYTES {
            DEFAULT_MAX_BODY_BYTES
        } else {
            self.max_body_bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_are_fail_closed() {
        let config = DeployConfig::default();
        assert!(config.shared_secret.is_none());
        assert!(!config.allow_webhook_script);
        assert_eq!(config.effective_max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn ceiling_floor_falls_back_to_default() {
        let config = DeployConfig::with_secret("s").max_body_bytes(1_024);
        assert_eq!(config.effective_max_body_bytes(), DEFAULT_MAX_BODY_BYTES);

        let config = DeployConfig::with_secret("s").max_body_bytes(MIN_MAX_BODY_BYTES);
        assert_eq!(config.effective_max_body_bytes(), MIN_MAX_BODY_BYTES);

        let config = DeployConfig::with_secret("s").max_body_bytes(1_000_000);
        assert_eq!(config.effective_max_body_bytes(), 1_000_000);
    }

    #[test]
    fn parses_toml() {
        let config = DeployConfig::from_toml(
            r#"
            shared_secret = "topsecret"
            allow_webhook_script = true
            max_body_bytes = 65536
            "#,
        )
        .unwrap();
        assert_eq!(
            config.shared_secret.as_ref().unwrap().expose_secret(),
            "topsecret"
        );
        assert!(config.allow_webhook_script);
        assert_eq!(config.effective_max_body_bytes(), 65_536);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = DeployConfig::from_toml("").unwrap();
        assert!(config.shared_secret.is_none());
        assert!(!config.allow_webhook_script);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(DeployConfig::from_toml("max_body_bytes = \"lots\"").is_err());
    }

    #[test]
    fn debug_output_does_not_expose_the_secret() {
        let config = DeployConfig::with_secret("topsecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
    }
}
