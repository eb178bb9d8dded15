//! HTTP utilities for ARM REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the URL to poll for a long-running operation.
pub const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";

/// Sanitize response body for logging: truncate and strip non-printable data.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        // Localized error bodies can put a multi-byte character at the cut;
        // back down to a char boundary so the slice cannot panic.
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..cut],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A non-success status from the management API. Kept as a typed error so
/// callers can distinguish "not found" from other failures.
#[derive(Debug, thiserror::Error)]
#[error("API request failed: {status}")]
pub struct HttpError {
    pub status: StatusCode,
    pub body: String,
}

/// Check whether an error chain bottoms out in an HTTP 404.
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<HttpError>()
        .map(|e| e.status == StatusCode::NOT_FOUND)
        .unwrap_or(false)
}

/// A successful management API response.
#[derive(Debug)]
pub struct ArmResponse {
    pub status: StatusCode,
    /// Poll URL for long-running operations, when the service returned one.
    pub async_operation: Option<String>,
    pub body: Value,
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azrm/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to an ARM endpoint.
    pub async fn get(&self, url: &str, token: &str) -> Result<ArmResponse> {
        tracing::debug!("GET {}", url);

        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string());

        Self::finish(request).await
    }

    /// Make a PUT request with a JSON body to an ARM endpoint.
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<ArmResponse> {
        tracing::debug!("PUT {}", url);

        let request = self
            .client
            .put(url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .json(body);

        Self::finish(request).await
    }

    /// Make a PATCH request with a JSON body to an ARM endpoint.
    pub async fn patch(&self, url: &str, token: &str, body: &Value) -> Result<ArmResponse> {
        tracing::debug!("PATCH {}", url);

        let request = self
            .client
            .patch(url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .json(body);

        Self::finish(request).await
    }

    /// Make a DELETE request to an ARM endpoint. Some resource types demand
    /// an `If-Match` precondition (`"*"` to delete regardless of etag).
    pub async fn delete(&self, url: &str, token: &str, if_match: Option<&str>) -> Result<ArmResponse> {
        tracing::debug!("DELETE {}", url);

        let mut request = self
            .client
            .delete(url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string());

        if let Some(etag) = if_match {
            request = request.header("If-Match", etag);
        }

        Self::finish(request).await
    }

    async fn finish(request: reqwest::RequestBuilder) -> Result<ArmResponse> {
        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let async_operation = response
            .headers()
            .get(ASYNC_OPERATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error bodies; ARM error payloads can
            // echo request content.
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(HttpError { status, body }.into());
        }

        let body = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).context("Failed to parse response JSON")?
        };

        Ok(ArmResponse {
            status,
            async_operation,
            body,
        })
    }
}

/// Format a management API error for user display without exposing raw API
/// details.
pub fn format_arm_error(error: &anyhow::Error) -> String {
    if let Some(http) = error.downcast_ref::<HttpError>() {
        return match http.status.as_u16() {
            401 => "Authentication failed. Check the configured service principal.".to_string(),
            403 => "Permission denied. Check the principal's role assignments.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check your configuration.".to_string(),
            500 | 503 => "Azure service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed: {}", http.status),
        };
    }

    // Truncate anything else and strip non-printable characters.
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.len() < body.len());
    }

    #[test]
    fn test_sanitize_handles_multibyte_char_at_the_cut() {
        // 'é' is two bytes; starting it at byte 199 puts the truncation
        // point inside the character.
        let body = format!("{}é{}", "a".repeat(MAX_LOG_BODY_LENGTH - 1), "b".repeat(100));
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.starts_with(&"a".repeat(MAX_LOG_BODY_LENGTH - 1)));
    }

    #[test]
    fn test_is_not_found_only_matches_404() {
        let not_found: anyhow::Error = HttpError {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        }
        .into();
        let forbidden: anyhow::Error = HttpError {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        }
        .into();
        let other = anyhow::anyhow!("404 in text only");

        assert!(is_not_found(&not_found));
        assert!(!is_not_found(&forbidden));
        assert!(!is_not_found(&other));
    }

    #[test]
    fn test_format_arm_error_maps_statuses() {
        let err: anyhow::Error = HttpError {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        }
        .into();
        assert!(format_arm_error(&err).contains("Rate limit"));
    }
}
