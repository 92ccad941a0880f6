//! HTTP utilities for Azure REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Remaining read quota reported by Azure Resource Manager
pub const RATELIMIT_REMAINING_HEADER: &str =
    "x-ms-ratelimit-remaining-subscription-resource-requests";

/// Truncate a response body for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Parsed JSON body plus the headers the exporter cares about
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub ratelimit_remaining: Option<String>,
}

/// Non-2xx answer from an Azure API
#[derive(Debug, thiserror::Error)]
#[error("API request failed: {status}")]
pub struct ApiStatusError {
    pub status: StatusCode,
}

impl ApiStatusError {
    /// Whether `err` is a rejected access token
    pub fn is_unauthorized(err: &anyhow::Error) -> bool {
        err.downcast_ref::<Self>()
            .is_some_and(|e| e.status == StatusCode::UNAUTHORIZED)
    }
}

/// HTTP client wrapper for Azure API calls
#[derive(Debug, Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azure-health-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to an Azure API
    pub async fn get(&self, url: &str, token: &str) -> Result<ApiResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let ratelimit_remaining = response
            .headers()
            .get(RATELIMIT_REMAINING_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log a truncated body, error payloads can echo request details
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiStatusError { status }.into());
        }

        let body = serde_json::from_str(&body).context("Failed to parse response JSON")?;

        Ok(ApiResponse {
            body,
            ratelimit_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(200)));
        assert!(logged.contains("500 bytes total"));
    }

    #[test]
    fn test_unauthorized_is_detected() {
        let err: anyhow::Error = ApiStatusError {
            status: StatusCode::UNAUTHORIZED,
        }
        .into();
        assert!(ApiStatusError::is_unauthorized(&err));
        assert_eq!(err.to_string(), "API request failed: 401 Unauthorized");

        let err: anyhow::Error = ApiStatusError {
            status: StatusCode::FORBIDDEN,
        }
        .into();
        assert!(!ApiStatusError::is_unauthorized(&err));
        assert!(!ApiStatusError::is_unauthorized(&anyhow::anyhow!("other")));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }
}
