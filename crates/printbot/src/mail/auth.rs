//! OAuth2 client-credentials token acquisition with an in-memory cache.
//!
//! The mailbox is accessed with an application credential, so there is no
//! refresh token: a new access token is requested whenever the cached one is
//! about to expire.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::error::{MailError, Result};

/// Default identity authority.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Scope requesting every application permission granted to the client.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens this close to expiry are treated as expired.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the authority omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3599);

/// Maximum length for error bodies copied into log messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn sanitize_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", truncated)
    } else {
        body.to_string()
    }
}

/// Tenant, client id and client secret of the application registration.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    access_token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        !needs_refresh(self.expires_at, now)
    }
}

/// Returns true when a token expiring at `expires_at` must be replaced at `now`.
pub(crate) fn needs_refresh(expires_at: Instant, now: Instant) -> bool {
    now + REFRESH_MARGIN >= expires_at
}

/// Cached bearer token for one application credential.
///
/// The lock is held across the token request, so concurrent callers wait for
/// a single in-flight refresh instead of issuing their own.
pub struct TokenCache {
    client: Client,
    token_url: String,
    credentials: ClientCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, authority_url: &str, credentials: ClientCredentials) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_url.trim_end_matches('/'),
            credentials.tenant_id
        );
        Self {
            client,
            token_url,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns a bearer token valid for at least [`REFRESH_MARGIN`].
    pub async fn access_token(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(SecretString::from(
                    token.access_token.expose_secret().to_string(),
                ));
            }
            debug!("Access token within refresh margin, requesting a new one");
        }

        let fresh = self.request_token().await?;
        let token = SecretString::from(fresh.access_token.expose_secret().to_string());
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token so the next call re-acquires it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret(),
            ),
            ("scope", GRAPH_DEFAULT_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let requested_at = Instant::now();
        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailError::AuthFailure(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => {
                        format!("{}: {}", err.error, sanitize_error_body(&description))
                    }
                    None => err.error,
                },
                Err(_) => sanitize_error_body(&body),
            };
            return Err(MailError::AuthFailure(format!(
                "Token endpoint returned {}: {}",
                status, detail
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailError::AuthFailure(format!("Failed to parse token response: {}", e)))?;

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        info!(
            expires_in_secs = lifetime.as_secs(),
            "Acquired mailbox access token"
        );

        Ok(CachedToken {
            access_token: SecretString::from(token.access_token),
            expires_at: requested_at + lifetime,
        })
    }
}
