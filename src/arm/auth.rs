//! Azure AD Authentication
//!
//! Acquires bearer tokens for ARM calls via the OAuth2 client-credentials
//! flow, with expiry-aware caching so handlers never pay a token round-trip
//! per request.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default login endpoint for the public Azure cloud.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope requested for ARM management-plane calls.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Refresh tokens this much before they actually expire, so a token never
/// lapses mid-request.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Conservative TTL when the token response omits `expires_in`.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Service principal secret material for the client-credentials flow.
#[derive(Clone)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("ServicePrincipal")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum CredentialSource {
    ClientSecret {
        principal: ServicePrincipal,
        authority: String,
        scope: String,
    },
    /// Fixed token, for tests and for callers that manage tokens themselves.
    Static(String),
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires, buffer already applied.
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Azure AD credentials holder with token caching.
#[derive(Clone)]
pub struct AadCredentials {
    source: CredentialSource,
    http: reqwest::Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AadCredentials {
    /// Client-credentials flow against the public cloud authority.
    pub fn client_secret(principal: ServicePrincipal) -> Self {
        Self::client_secret_with_authority(principal, DEFAULT_AUTHORITY)
    }

    /// Client-credentials flow against a custom authority (sovereign clouds,
    /// mock servers in tests).
    pub fn client_secret_with_authority(principal: ServicePrincipal, authority: &str) -> Self {
        Self {
            source: CredentialSource::ClientSecret {
                principal,
                authority: authority.trim_end_matches('/').to_string(),
                scope: MANAGEMENT_SCOPE.to_string(),
            },
            http: reqwest::Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials that always return the given token. No network calls.
    pub fn static_token(token: &str) -> Self {
        Self {
            source: CredentialSource::Static(token.to_string()),
            http: reqwest::Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for ARM calls, from cache when still valid.
    pub async fn get_token(&self) -> Result<String> {
        let (principal, authority, scope) = match &self.source {
            CredentialSource::Static(token) => return Ok(token.clone()),
            CredentialSource::ClientSecret {
                principal,
                authority,
                scope,
            } => (principal, authority, scope),
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("cached AAD token expired, fetching new token");
            }
        }

        let url = format!("{}/{}/oauth2/v2.0/token", authority, principal.tenant_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", principal.client_id.as_str()),
            ("client_secret", principal.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .context("Failed to reach the Azure AD token endpoint")?;

        let status = response.status();
        if !status.is_success() {
            // Token endpoint errors can embed the client id; log the status only.
            tracing::error!("token request failed: {}", status);
            return Err(anyhow::anyhow!(
                "Azure AD token request failed: {}. Check ARM_TENANT_ID / ARM_CLIENT_ID / ARM_CLIENT_SECRET",
                status
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse the Azure AD token response")?;

        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.access_token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "new AAD token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token.access_token)
    }

    /// Drop any cached token and fetch a fresh one.
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_needs_no_network() {
        let credentials = AadCredentials::static_token("fixed");
        assert_eq!(credentials.get_token().await.unwrap(), "fixed");
        assert_eq!(credentials.refresh_token().await.unwrap(), "fixed");
    }

    #[test]
    fn test_principal_debug_hides_secret() {
        let principal = ServicePrincipal {
            tenant_id: "t".to_string(),
            client_id: "c".to_string(),
            client_secret: "hunter2".to_string(),
        };
        let printed = format!("{:?}", principal);
        assert!(!printed.contains("hunter2"));
    }
}
