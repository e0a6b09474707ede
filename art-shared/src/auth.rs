//! Engine credentials: password lookup, basic auth and SSO tokens

use crate::types::EngineConnection;
use crate::{ArtError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use url::Url;

/// Keyring service under which engine passwords are stored
pub const KEYRING_SERVICE: &str = "art";

/// Environment variable consulted before the keyring
pub const PASSWORD_ENV: &str = "ART_PASSWORD";

/// Lifetime assumed when the SSO response carries no expiry
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Bearer token issued by the engine SSO service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Raw response of the SSO token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SsoTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Expiry as epoch milliseconds, sent as a string
    #[serde(default)]
    pub exp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl AuthToken {
    pub fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Build a token from the SSO endpoint response
    pub fn from_sso(response: SsoTokenResponse) -> Result<Self> {
        if let Some(error) = response.error {
            return Err(ArtError::Auth(format!(
                "SSO login failed: {}",
                response.error_description.unwrap_or(error)
            )));
        }

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ArtError::Auth("SSO response has no access token".to_string()))?;

        let expires_at = match response.exp.as_deref().map(str::parse::<i64>) {
            Some(Ok(millis)) => DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                ArtError::Auth(format!("SSO token expiry out of range: {millis}"))
            })?,
            Some(Err(e)) => {
                return Err(ArtError::Auth(format!("Invalid SSO token expiry: {e}")));
            }
            None => Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        };

        Ok(Self {
            access_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at,
        })
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the token will expire within the given duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }

    /// Tokens are renewed five minutes ahead of expiry
    pub fn needs_refresh(&self) -> bool {
        self.expires_within(Duration::minutes(5))
    }

    /// Get the authorization header value
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// `Authorization` header value for HTTP basic auth
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

/// Resolve the password for a connection: config, then environment, then keyring
pub fn resolve_password(connection: &EngineConnection) -> Result<String> {
    if let Some(password) = &connection.password {
        return Ok(password.clone());
    }

    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            tracing::debug!("Using engine password from {}", PASSWORD_ENV);
            return Ok(password);
        }
    }

    let entry = Entry::new(KEYRING_SERVICE, &connection.username)
        .map_err(|e| ArtError::Auth(format!("Failed to create keyring entry: {e}")))?;
    entry.get_password().map_err(|e| {
        ArtError::Auth(format!(
            "No password for {} in config, {} or keyring: {e}",
            connection.username, PASSWORD_ENV
        ))
    })
}

/// Store a password in the OS keyring for later runs
pub fn store_password(username: &str, password: &str) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, username)
        .map_err(|e| ArtError::Auth(format!("Failed to create keyring entry: {e}")))?;
    entry
        .set_password(password)
        .map_err(|e| ArtError::Auth(format!("Failed to store password: {e}")))?;
    Ok(())
}

/// SSO token endpoint that sits next to the API root
pub fn sso_token_url(api_url: &Url) -> Result<Url> {
    let mut base = api_url.clone();
    let trimmed = base.path().trim_end_matches('/').to_string();
    base.set_path(&trimmed);
    Ok(base.join("sso/oauth/token")?)
}
