//! Login and token recovery.
//!
//! A 401 triggers at most one recovery attempt. A stored refresh token is
//! exchanged at `/v1/oauth2/token`; otherwise cached credentials are replayed
//! against `/v1/login`; otherwise the user has to sign in again.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use sherlock_common::{Result, SherlockError};
use tracing::{info, instrument, warn};

use crate::client::ApiClient;
use crate::session::Credentials;

/// Body returned by `/v1/login` and `/v1/oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(default, rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// How a 401 was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Refreshed,
    Relogged,
}

/// Where to send the user when the session cannot be recovered.
pub fn login_redirect(return_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
    format!("/login?returnUrl={encoded}")
}

impl ApiClient {
    /// Sign in with email and password. With `remember` set the credentials
    /// are cached so an expired token can be renewed without prompting.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<TokenResponse> {
        let body = json!({ "email": email, "password": password });
        let resp = self.post_token("/v1/login", &body).await?;
        self.store_token(&resp).await?;
        if remember {
            self.session().set_credentials(&Credentials::new(email, password)).await?;
        }
        info!(user = %resp.name, "signed in");
        Ok(resp)
    }

    /// Exchange an SSO authorization code for a token.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let resp = self.post_token("/v1/oauth2/token", &json!({ "code": code })).await?;
        self.store_token(&resp).await?;
        if !resp.email.is_empty() {
            self.session().set_mynutanix_email(resp.email.clone()).await?;
        }
        info!(user = %resp.name, "signed in via SSO");
        Ok(resp)
    }

    /// One recovery attempt after a 401. Fails with `LoginRequired` when the
    /// session holds nothing to recover with.
    pub(crate) async fn recover(&self) -> Result<AuthOutcome> {
        let session = self.session();
        if let Some(refresh) = session.refresh_token().await? {
            let resp = self
                .post_token("/v1/oauth2/token", &json!({ "refreshToken": refresh }))
                .await?;
            self.store_token(&resp).await?;
            return Ok(AuthOutcome::Refreshed);
        }
        if let Some(creds) = session.credentials().await? {
            let body = json!({ "email": creds.email, "password": creds.password.expose_secret() });
            let resp = self.post_token("/v1/login", &body).await?;
            self.store_token(&resp).await?;
            return Ok(AuthOutcome::Relogged);
        }
        warn!("no refresh token or cached credentials");
        Err(self.login_required())
    }

    async fn store_token(&self, resp: &TokenResponse) -> Result<()> {
        if resp.token.is_empty() {
            return Err(SherlockError::Validation("token response carried no token".to_string()));
        }
        let session = self.session();
        session.set_auth_token(resp.token.clone()).await?;
        if let Some(refresh) = resp.refresh_token.as_ref().filter(|r| !r.is_empty()) {
            session.set_refresh_token(refresh.clone()).await?;
        }
        if let Some(role) = resp.role.as_ref().filter(|r| !r.is_empty()) {
            session.set_role(role.clone()).await?;
        }
        Ok(())
    }
}
