//! Azure Authentication
//!
//! Acquires Azure Resource Manager access tokens from the standard `AZURE_*`
//! environment variables and caches them until shortly before they expire.
//!
//! Credentials are picked in this order:
//!
//! 1. Client secret: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`
//! 2. Username and password: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//!    `AZURE_USERNAME`, `AZURE_PASSWORD`
//! 3. Managed identity through the instance metadata service, optionally for
//!    the user-assigned identity named by `AZURE_CLIENT_ID`
//!
//! `AZURE_AUTHORITY_HOST` overrides the Entra ID authority for 1 and 2.

use crate::error::{Error, Result};
use anyhow::Context;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope for Azure Resource Manager API access
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Resource Manager audience, as the metadata service expects it
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// Default Microsoft Entra ID authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Azure instance metadata service
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254";

const IMDS_API_VERSION: &str = "2018-02-01";

/// The metadata service is link-local; off Azure it never answers
const IMDS_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Used when the token response carries no usable `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

enum TokenSource {
    ClientSecret {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
    UsernamePassword {
        token_url: String,
        client_id: String,
        username: String,
        password: String,
    },
    ManagedIdentity {
        endpoint: String,
        client_id: Option<String>,
    },
    /// Pre-issued token, never refreshed
    Static(String),
}

impl TokenSource {
    fn kind(&self) -> &'static str {
        match self {
            Self::ClientSecret { .. } => "client_secret",
            Self::UsernamePassword { .. } => "username_password",
            Self::ManagedIdentity { .. } => "managed_identity",
            Self::Static(_) => "static",
        }
    }
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: Arc<TokenSource>,
    http: reqwest::Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("source", &self.source.kind())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        tenant_id
    )
}

impl AzureCredentials {
    /// Credentials from the process environment
    pub fn from_environment() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Credentials from `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required =
            |name: &str| var(name).ok_or_else(|| Error::Session(format!("{} is not set", name)));
        let authority_host =
            var("AZURE_AUTHORITY_HOST").unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());

        if let Some(client_secret) = var("AZURE_CLIENT_SECRET") {
            let tenant_id = required("AZURE_TENANT_ID")?;
            let client_id = required("AZURE_CLIENT_ID")?;
            tracing::info!("Using client secret credentials for {}", client_id);
            return Ok(Self::client_secret(
                &authority_host,
                &tenant_id,
                &client_id,
                &client_secret,
            ));
        }

        if var("AZURE_CERTIFICATE_PATH").is_some() {
            return Err(Error::Session(
                "client certificate credentials are not supported, set AZURE_CLIENT_SECRET instead"
                    .to_string(),
            ));
        }

        if let (Some(username), Some(password)) = (var("AZURE_USERNAME"), var("AZURE_PASSWORD")) {
            let tenant_id = required("AZURE_TENANT_ID")?;
            let client_id = required("AZURE_CLIENT_ID")?;
            tracing::info!("Using username/password credentials for {}", username);
            return Ok(Self::username_password(
                &authority_host,
                &tenant_id,
                &client_id,
                &username,
                &password,
            ));
        }

        let client_id = var("AZURE_CLIENT_ID");
        tracing::info!(
            "Using managed identity credentials{}",
            client_id
                .as_deref()
                .map(|id| format!(" for {}", id))
                .unwrap_or_default()
        );
        Ok(Self::managed_identity(IMDS_ENDPOINT, client_id.as_deref()))
    }

    pub fn client_secret(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self::with_source(TokenSource::ClientSecret {
            token_url: token_url(authority_host, tenant_id),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn username_password(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Self {
        Self::with_source(TokenSource::UsernamePassword {
            token_url: token_url(authority_host, tenant_id),
            client_id: client_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Managed identity tokens from the metadata service at `endpoint`.
    /// `client_id` selects a user-assigned identity.
    pub fn managed_identity(endpoint: &str, client_id: Option<&str>) -> Self {
        Self::with_source(TokenSource::ManagedIdentity {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client_id: client_id.map(str::to_string),
        })
    }

    /// Credentials that always present `token`
    pub fn static_token(token: &str) -> Self {
        Self::with_source(TokenSource::Static(token.to_string()))
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            source: Arc::new(source),
            http: reqwest::Client::new(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> anyhow::Result<String> {
        if let TokenSource::Static(token) = self.source.as_ref() {
            return Ok(token.clone());
        }

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let body = self.request_token().await?;
        let token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .context("Token response has no access_token")?
            .to_string();

        let ttl = token_ttl(&body);
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at: Instant::now() + ttl,
            });
        }

        tracing::debug!("New token cached, expires in ~{} minutes", ttl.as_secs() / 60);

        Ok(token)
    }

    async fn request_token(&self) -> anyhow::Result<Value> {
        let request = match self.source.as_ref() {
            TokenSource::ClientSecret {
                token_url,
                client_id,
                client_secret,
            } => self.http.post(token_url).form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ]),
            TokenSource::UsernamePassword {
                token_url,
                client_id,
                username,
                password,
            } => self.http.post(token_url).form(&[
                ("grant_type", "password"),
                ("client_id", client_id.as_str()),
                ("username", username.as_str()),
                ("password", password.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ]),
            TokenSource::ManagedIdentity {
                endpoint,
                client_id,
            } => {
                let mut query = vec![
                    ("api-version", IMDS_API_VERSION),
                    ("resource", MANAGEMENT_RESOURCE),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                self.http
                    .get(format!("{}/metadata/identity/oauth2/token", endpoint))
                    .header("Metadata", "true")
                    .query(&query)
                    .timeout(IMDS_TIMEOUT)
            }
            TokenSource::Static(token) => return Ok(serde_json::json!({ "access_token": token })),
        };

        let response = request
            .send()
            .await
            .context("Failed to request access token")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Token request failed: {}", status));
        }

        response
            .json()
            .await
            .context("Failed to parse token response")
    }

    /// Drop the cached token so the next call requests a new one.
    /// Returns false when the token cannot be refreshed.
    pub async fn invalidate(&self) -> bool {
        if matches!(self.source.as_ref(), TokenSource::Static(_)) {
            return false;
        }
        let mut cache = self.token_cache.write().await;
        *cache = None;
        true
    }
}

/// Lifetime of a token response, minus the expiry buffer.
/// The v1 endpoint sends `expires_in` as a string, v2 as a number.
fn token_ttl(body: &Value) -> Duration {
    let expires_in = body.get("expires_in").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
    });

    match expires_in {
        Some(secs) => Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_BUFFER),
        None => DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_token_ttl_number() {
        let ttl = token_ttl(&json!({"access_token": "t", "expires_in": 3599}));
        assert_eq!(ttl, Duration::from_secs(3599 - 60));
    }

    #[test]
    fn test_token_ttl_string() {
        let ttl = token_ttl(&json!({"access_token": "t", "expires_in": "3600"}));
        assert_eq!(ttl, Duration::from_secs(3540));
    }

    #[test]
    fn test_token_ttl_missing_uses_default() {
        let ttl = token_ttl(&json!({"access_token": "t"}));
        assert_eq!(ttl, DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER);
    }

    #[test]
    fn test_token_ttl_shorter_than_buffer() {
        let ttl = token_ttl(&json!({"expires_in": 30}));
        assert_eq!(ttl, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_static_token() {
        let credentials = AzureCredentials::static_token("abc");
        assert_eq!(credentials.get_token().await.unwrap(), "abc");
        assert!(!credentials.invalidate().await);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_client_secret_preferred() {
        let credentials = AzureCredentials::from_lookup(lookup(&[
            ("AZURE_TENANT_ID", "t"),
            ("AZURE_CLIENT_ID", "c"),
            ("AZURE_CLIENT_SECRET", "s"),
            ("AZURE_USERNAME", "u"),
            ("AZURE_PASSWORD", "p"),
        ]))
        .unwrap();

        match credentials.source.as_ref() {
            TokenSource::ClientSecret { token_url, .. } => {
                assert_eq!(token_url, "https://login.microsoftonline.com/t/oauth2/v2.0/token")
            }
            _ => panic!("expected client secret credentials"),
        }
    }

    #[test]
    fn test_client_secret_requires_tenant() {
        let err = AzureCredentials::from_lookup(lookup(&[
            ("AZURE_CLIENT_ID", "c"),
            ("AZURE_CLIENT_SECRET", "s"),
        ]))
        .unwrap_err();

        assert!(matches!(err, Error::Session(msg) if msg.contains("AZURE_TENANT_ID")));
    }

    #[test]
    fn test_username_password() {
        let credentials = AzureCredentials::from_lookup(lookup(&[
            ("AZURE_TENANT_ID", "t"),
            ("AZURE_CLIENT_ID", "c"),
            ("AZURE_USERNAME", "u"),
            ("AZURE_PASSWORD", "p"),
            ("AZURE_AUTHORITY_HOST", "https://login.example/"),
        ]))
        .unwrap();

        match credentials.source.as_ref() {
            TokenSource::UsernamePassword { token_url, .. } => {
                assert_eq!(token_url, "https://login.example/t/oauth2/v2.0/token")
            }
            _ => panic!("expected username/password credentials"),
        }
    }

    #[test]
    fn test_certificate_is_rejected() {
        let err = AzureCredentials::from_lookup(lookup(&[
            ("AZURE_TENANT_ID", "t"),
            ("AZURE_CLIENT_ID", "c"),
            ("AZURE_CERTIFICATE_PATH", "/cert.pfx"),
        ]))
        .unwrap_err();

        assert!(matches!(err, Error::Session(_)));
    }

    #[test]
    fn test_managed_identity_fallback() {
        let credentials = AzureCredentials::from_lookup(lookup(&[])).unwrap();
        match credentials.source.as_ref() {
            TokenSource::ManagedIdentity {
                endpoint,
                client_id,
            } => {
                assert_eq!(endpoint, IMDS_ENDPOINT);
                assert!(client_id.is_none());
            }
            _ => panic!("expected managed identity credentials"),
        }

        let credentials = AzureCredentials::from_lookup(lookup(&[
            ("AZURE_CLIENT_ID", "user-assigned"),
            ("AZURE_CLIENT_SECRET", " "),
        ]))
        .unwrap();
        match credentials.source.as_ref() {
            TokenSource::ManagedIdentity { client_id, .. } => {
                assert_eq!(client_id.as_deref(), Some("user-assigned"))
            }
            _ => panic!("expected managed identity credentials"),
        }
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials =
            AzureCredentials::client_secret(DEFAULT_AUTHORITY_HOST, "t", "c", "s3cret-value");
        let printed = format!("{:?}", credentials);

        assert!(printed.contains("client_secret"));
        assert!(!printed.contains("s3cret-value"));
    }
}
