//! REST client - sends authenticated JSON requests to the engine API

use art_shared::auth::{self, AuthToken, SsoTokenResponse};
use art_shared::{redact, ArtError, AuthMode, EngineConnection, Fault, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

enum Authenticator {
    Basic(String),
    Sso {
        username: String,
        password: String,
        token_url: Url,
        token: RwLock<Option<AuthToken>>,
    },
}

#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    auth: Arc<Authenticator>,
}

impl RestClient {
    /// Create a client for a configured connection, resolving its password
    pub fn new(connection: &EngineConnection) -> Result<Self> {
        let password = auth::resolve_password(connection)?;
        Self::with_password(connection, password)
    }

    pub fn with_password(connection: &EngineConnection, password: String) -> Result<Self> {
        let mut base_url = Url::parse(&connection.url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let auth = match connection.auth {
            AuthMode::Basic => {
                Authenticator::Basic(auth::basic_auth_header(&connection.username, &password))
            }
            AuthMode::Sso => Authenticator::Sso {
                username: connection.username.clone(),
                password,
                token_url: auth::sso_token_url(&base_url)?,
                token: RwLock::new(None),
            },
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .danger_accept_invalid_certs(!connection.verify_tls)
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth: Arc::new(auth),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path relative to the API root
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("GET {} {:?}", url, query);
        let response = self.send(self.client.get(url).query(query)).await?;
        Self::parse(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("POST {}", url);
        let response = self.send(self.client.post(url).json(body)).await?;
        Self::parse(response).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("PUT {}", url);
        let response = self.send(self.client.put(url).json(body)).await?;
        Self::parse(response).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let url = self.url(path)?;
        tracing::debug!("DELETE {} {:?}", url, query);
        self.send(self.client.delete(url).query(query)).await?;
        Ok(())
    }

    /// Attach credentials, send, and turn non-2xx responses into [`ArtError::Api`]
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let authorization = self.authorization().await?;
        let response = request.header(AUTHORIZATION, authorization).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let fault: Fault = serde_json::from_str(&body).unwrap_or_default();

        tracing::error!(
            "Engine request failed with status {}: {}",
            status,
            redact(fault.detail.as_deref().unwrap_or(&body))
        );

        Err(ArtError::Api {
            status: status.as_u16(),
            reason: fault
                .reason
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Unknown".to_string()),
            detail: fault.detail,
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse engine response: {}", e);
            ArtError::Json(e)
        })
    }

    async fn authorization(&self) -> Result<String> {
        match self.auth.as_ref() {
            Authenticator::Basic(header) => Ok(header.clone()),
            Authenticator::Sso {
                username,
                password,
                token_url,
                token,
            } => {
                {
                    let cached = token.read().await;
                    if let Some(current) = cached.as_ref() {
                        if !current.needs_refresh() {
                            return Ok(current.authorization_header());
                        }
                    }
                }

                let fresh = self.login(token_url, username, password).await?;
                let header = fresh.authorization_header();
                *token.write().await = Some(fresh);
                Ok(header)
            }
        }
    }

    /// Password grant against the engine SSO service
    async fn login(&self, token_url: &Url, username: &str, password: &str) -> Result<AuthToken> {
        tracing::info!("Requesting SSO token for {}", username);

        let response = self
            .client
            .post(token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "password"),
                ("scope", "ovirt-app-api"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let token_response: SsoTokenResponse = serde_json::from_str(&body).map_err(|_| {
            ArtError::Auth(format!("SSO endpoint returned {status}: {body}"))
        })?;

        AuthToken::from_sso(token_response)
    }
}
