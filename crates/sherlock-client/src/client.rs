//! HTTP client for the Sherlock `/v1` REST API.
//!
//! Every request carries the session's bearer token and a fresh
//! `X-Request-ID`. A 401 is recovered from once (see `auth`) and the request
//! replayed; any other failure is reported to the error hook and returned.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sherlock_common::{Result, SherlockError};
use tracing::{debug, error, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::{login_redirect, TokenResponse};
use crate::session::Session;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Caller-supplied callback for failed requests (toast, status line, ...).
pub type ErrorHook = Arc<dyn Fn(&SherlockError) + Send + Sync>;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Session,
    error_hook: Option<ErrorHook>,
    return_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        Self::with_timeout(base_url, session, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, session: Session, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| SherlockError::Config(format!("invalid API base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SherlockError::Config(format!("unsupported scheme in '{base_url}'")));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
            error_hook: None,
            return_url: "/".to_string(),
        })
    }

    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    /// Page to return to after a forced sign-in.
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = url.into();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn login_required(&self) -> SherlockError {
        SherlockError::LoginRequired { return_url: self.return_url.clone() }
    }

    /// `/login?returnUrl=...` for the configured return page.
    pub fn login_url(&self) -> String {
        login_redirect(&self.return_url)
    }

    // ── Request plumbing ─────────────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(Method::GET, path, None::<&()>).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(Method::DELETE, path, None::<&()>).await
    }

    /// Send a request through the auth-retry wrapper and decode the body.
    /// An empty body decodes as JSON `null`.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let bytes = self.execute(method, path, body.as_ref()).await?;
        let value = if bytes.is_empty() {
            serde_json::from_slice(b"null")
        } else {
            serde_json::from_slice(&bytes)
        };
        value.map_err(|e| self.report(e.into()))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<u8>> {
        let resp = self.send_once(method.clone(), path, body).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return self.check_response_status(resp).await;
        }

        debug!(%method, path, "401 received, attempting recovery");
        match self.recover().await {
            Ok(outcome) => debug!(?outcome, "session recovered, replaying request"),
            Err(e) => {
                warn!("Session recovery failed: {}", e);
                self.session.clear_auth_token().await?;
                return Err(self.login_required());
            }
        }

        let resp = self.send_once(method, path, body).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "401 after recovery, sign-in required");
            self.session.clear_auth_token().await?;
            return Err(self.login_required());
        }
        self.check_response_status(resp).await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method, &url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = self.session.auth_token().await? {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(|e| self.report(e.into()))
    }

    async fn check_response_status(&self, resp: reqwest::Response) -> Result<Vec<u8>> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| self.report(e.into()))?;
        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        Err(self.report(SherlockError::Api {
            status: status.as_u16(),
            message: error_message(&bytes, status),
        }))
    }

    /// Log a failure and hand it to the error hook.
    fn report(&self, err: SherlockError) -> SherlockError {
        error!("Sherlock API request failed: {}", err);
        if let Some(hook) = &self.error_hook {
            hook(&err);
        }
        err
    }

    /// Unauthenticated token request used by login and recovery.
    pub(crate) async fn post_token(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TokenResponse> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(SherlockError::Api {
                status: status.as_u16(),
                message: error_message(&bytes, status),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &[u8], status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(msg) = json["message"]
            .as_str()
            .or_else(|| json["error"]["message"].as_str())
            .or_else(|| json["error"].as_str())
        {
            return msg.to_string();
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("unknown API error").to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json() {
        let msg = error_message(br#"{"message":"edge not found"}"#, StatusCode::NOT_FOUND);
        assert_eq!(msg, "edge not found");
        let msg = error_message(br#"{"error":{"message":"bad"}}"#, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "bad");
    }

    #[test]
    fn test_error_message_falls_back_to_text_then_reason() {
        assert_eq!(error_message(b"boom", StatusCode::INTERNAL_SERVER_ERROR), "boom");
        assert_eq!(
            error_message(b"", StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", Session::in_memory()),
            Err(SherlockError::Config(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://host", Session::in_memory()),
            Err(SherlockError::Config(_))
        ));
    }

    #[test]
    fn test_login_url_uses_return_url() {
        let client = ApiClient::new("http://localhost:8080/", Session::in_memory())
            .unwrap()
            .with_return_url("/edges");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.login_url(), "/login?returnUrl=%2Fedges");
    }
}
