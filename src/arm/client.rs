//! ARM Client
//!
//! Main client for the Azure Resource Manager API, combining authentication
//! and HTTP functionality with the URL conventions shared by every
//! resource-group scoped resource type.

use super::auth::AadCredentials;
use super::http::{ArmHttpClient, ArmResponse};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Management endpoint for the public Azure cloud.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const DEFAULT_LRO_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_LRO_MAX_POLLS: u32 = 90;

/// Main ARM client. Bound to one subscription; cheap to clone and safe to
/// share across handlers.
#[derive(Clone)]
pub struct ArmClient {
    pub credentials: AadCredentials,
    pub http: ArmHttpClient,
    pub subscription_id: String,
    endpoint: String,
    lro_poll_interval: Duration,
    lro_max_polls: u32,
}

impl ArmClient {
    /// Create a new ARM client against the public cloud endpoint.
    pub fn new(credentials: AadCredentials, subscription_id: &str) -> Result<Self> {
        Self::with_endpoint(credentials, subscription_id, DEFAULT_ENDPOINT)
    }

    /// Create a client against a custom management endpoint (sovereign
    /// clouds, mock servers in tests).
    pub fn with_endpoint(
        credentials: AadCredentials,
        subscription_id: &str,
        endpoint: &str,
    ) -> Result<Self> {
        let http = ArmHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            lro_poll_interval: DEFAULT_LRO_POLL_INTERVAL,
            lro_max_polls: DEFAULT_LRO_MAX_POLLS,
        })
    }

    /// Override long-running-operation polling cadence. Tests shrink this to
    /// milliseconds.
    pub fn with_lro_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.lro_poll_interval = interval;
        self.lro_max_polls = max_polls;
        self
    }

    /// Get the current access token.
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a resource-group scoped provider URL.
    ///
    /// `provider_path` is the provider namespace plus its type/name segments,
    /// e.g. `Microsoft.ApiManagement/service/svc1`.
    pub fn provider_url(&self, resource_group: &str, provider_path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}?api-version={}",
            self.endpoint,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            provider_path,
            api_version
        )
    }

    /// Build a URL from a full resource ID as returned by the API.
    pub fn resource_url(&self, resource_id: &str, api_version: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.endpoint,
            resource_id.trim_start_matches('/'),
            api_version
        )
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Make a GET request, returning the parsed body.
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        Ok(self.http.get(url, &token).await?.body)
    }

    /// Make a PUT request, returning the raw response (status and any
    /// long-running-operation header included).
    pub async fn put(&self, url: &str, body: &Value) -> Result<ArmResponse> {
        let token = self.get_token().await?;
        self.http.put(url, &token, body).await
    }

    /// Make a PATCH request, returning the parsed body.
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        Ok(self.http.patch(url, &token, body).await?.body)
    }

    /// Make a DELETE request.
    pub async fn delete(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        Ok(self.http.delete(url, &token, None).await?.body)
    }

    /// DELETE with an `If-Match` precondition (`"*"` ignores the etag).
    pub async fn delete_if_match(&self, url: &str, etag: &str) -> Result<Value> {
        let token = self.get_token().await?;
        Ok(self.http.delete(url, &token, Some(etag)).await?.body)
    }

    /// PUT a resource and, when the service answers with a long-running
    /// operation (201/202 plus an `Azure-AsyncOperation` header), poll that
    /// operation until it reaches a terminal state.
    ///
    /// Polling is bounded; a still-pending operation after the final poll is
    /// an error rather than an indefinite wait.
    pub async fn put_and_wait(&self, url: &str, body: &Value) -> Result<()> {
        let response = self.put(url, body).await?;

        let pending = response.status == StatusCode::CREATED || response.status == StatusCode::ACCEPTED;
        let poll_url = match response.async_operation {
            Some(poll_url) if pending => poll_url,
            _ => return Ok(()),
        };

        tracing::debug!("waiting for long-running operation: {}", poll_url);

        for _ in 0..self.lro_max_polls {
            tokio::time::sleep(self.lro_poll_interval).await;

            let status_body = self
                .get(&poll_url)
                .await
                .context("Failed to poll the long-running operation")?;

            let status = status_body
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("");

            match status {
                "Succeeded" => return Ok(()),
                "Failed" | "Canceled" => {
                    let detail = status_body
                        .get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("no detail returned");
                    return Err(anyhow::anyhow!(
                        "long-running operation ended in {}: {}",
                        status,
                        detail
                    ));
                }
                _ => continue,
            }
        }

        Err(anyhow::anyhow!(
            "long-running operation did not complete after {} polls",
            self.lro_max_polls
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        ArmClient::new(AadCredentials::static_token("t"), "sub-1").unwrap()
    }

    #[test]
    fn test_provider_url_shape() {
        let url = client().provider_url(
            "rg1",
            "Microsoft.ApiManagement/service/svc1",
            "2017-03-01",
        );
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.ApiManagement/service/svc1?api-version=2017-03-01"
        );
    }

    #[test]
    fn test_resource_url_from_full_id() {
        let url = client().resource_url(
            "/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.Logic/workflows/wf1",
            "2016-06-01",
        );
        assert!(url.starts_with("https://management.azure.com/subscriptions/"));
        assert!(url.ends_with("workflows/wf1?api-version=2016-06-01"));
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = ArmClient::with_endpoint(
            AadCredentials::static_token("t"),
            "sub-1",
            "https://example.test/",
        )
        .unwrap();
        let url = client.provider_url("rg", "P/t/n", "v");
        assert!(url.starts_with("https://example.test/subscriptions/"));
    }
}
