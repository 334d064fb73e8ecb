/// External identity providers
///
/// The provider only answers two questions: where to send the browser, and
/// which stable account id a returned authorization code belongs to. State
/// handling and account linking live in `IdentityService`.
use crate::config::OAuthConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Authorization URL the browser is redirected to, carrying `state`
    fn authorize_url(&self, state: &str) -> Result<String>;

    /// Exchange an authorization code for the provider's account id
    async fn exchange_code(&self, code: &str) -> Result<String>;
}

/// Google OpenID Connect provider
pub struct GoogleProvider {
    config: OAuthConfig,
    http: Client,
}

impl GoogleProvider {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(GOOGLE_AUTHORIZE_URL)
            .map_err(|e| AppError::Internal(format!("invalid Google authorize URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid profile")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        #[derive(Deserialize)]
        struct GoogleUserInfo {
            sub: String,
        }

        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let token_resp = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Google token request failed: {}", e)))?;

        if !token_resp.status().is_success() {
            return Err(AppError::OAuth(format!(
                "Google token request failed with status {}",
                token_resp.status()
            )));
        }

        let token: TokenResponse = token_resp.json().await.map_err(|e| {
            AppError::OAuth(format!("Failed to parse Google token response: {}", e))
        })?;

        let user_resp = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Google userinfo request failed: {}", e)))?;

        if !user_resp.status().is_success() {
            return Err(AppError::OAuth(format!(
                "Google userinfo request failed with status {}",
                user_resp.status()
            )));
        }

        let info: GoogleUserInfo = user_resp.json().await.map_err(|e| {
            AppError::OAuth(format!("Failed to parse Google userinfo response: {}", e))
        })?;

        Ok(info.sub)
    }
}
