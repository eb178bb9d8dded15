//! Provider configuration
//!
//! Credentials and subscription settings, resolved from the standard `ARM_*`
//! environment variables with an optional JSON file underneath. Environment
//! always wins, matching how CI pipelines inject service principals.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub client_secret: Option<String>,
    /// Management endpoint override (sovereign clouds).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azrm").join("config.json"))
    }

    /// Load configuration: the config file first, then `ARM_*` environment
    /// variables on top.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        config.apply_env();
        config
    }

    fn load_file() -> Option<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn apply_env(&mut self) {
        for (var, field) in [
            ("ARM_SUBSCRIPTION_ID", &mut self.subscription_id),
            ("ARM_TENANT_ID", &mut self.tenant_id),
            ("ARM_CLIENT_ID", &mut self.client_id),
            ("ARM_CLIENT_SECRET", &mut self.client_secret),
            ("ARM_ENDPOINT", &mut self.endpoint),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = Some(value);
                }
            }
        }
    }

    /// Save the non-secret settings to disk. The client secret is never
    /// written; it stays in the environment.
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// The configured subscription, or an error naming what to set.
    pub fn require_subscription_id(&self) -> Result<&str> {
        self.subscription_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("No subscription configured. Set ARM_SUBSCRIPTION_ID")
    }

    /// The full service principal triple, or an error naming what is missing.
    pub fn require_service_principal(&self) -> Result<(&str, &str, &str)> {
        let tenant = self
            .tenant_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("No tenant configured. Set ARM_TENANT_ID")?;
        let client = self
            .client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("No client configured. Set ARM_CLIENT_ID")?;
        let secret = self
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("No client secret configured. Set ARM_CLIENT_SECRET")?;

        Ok((tenant, client, secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_subscription_rejects_empty() {
        let config = ProviderConfig {
            subscription_id: Some(String::new()),
            ..Default::default()
        };
        assert!(config.require_subscription_id().is_err());

        let config = ProviderConfig {
            subscription_id: Some("sub-1".into()),
            ..Default::default()
        };
        assert_eq!(config.require_subscription_id().unwrap(), "sub-1");
    }

    #[test]
    fn test_require_service_principal_names_missing_piece() {
        let config = ProviderConfig {
            tenant_id: Some("t".into()),
            client_id: Some("c".into()),
            ..Default::default()
        };
        let err = config.require_service_principal().unwrap_err();
        assert!(err.to_string().contains("ARM_CLIENT_SECRET"));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = ProviderConfig {
            client_secret: Some("hush".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hush"));
    }
}
