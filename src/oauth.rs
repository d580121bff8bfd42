//! OAuth 2.0 authorization-code flow against Google's endpoints.
//!
//! The user opens the URL from [`authorization_url`], grants access and pastes
//! the code back; [`TokenEndpoint::exchange_code`] trades it for a token pair.
//! Later runs use [`TokenEndpoint::refresh`] once the access token expires.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::{ClientCredentials, Token};
use crate::error::{AppError, AppResult};

/// Anti-forgery value sent with every authorization request.
pub const STATE_TOKEN: &str = "state-token";

const DEFAULT_TOKEN_TYPE: &str = "Bearer";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the consent URL. Parameters are sorted by name and offline access is
/// always requested so that the provider issues a refresh token.
pub fn authorization_url(credentials: &ClientCredentials) -> String {
    let mut params = vec![
        ("access_type", "offline".to_string()),
        ("client_id", credentials.client_id.clone()),
    ];
    if let Some(ref redirect_url) = credentials.redirect_url {
        params.push(("redirect_uri", redirect_url.clone()));
    }
    params.push(("response_type", "code".to_string()));
    params.push(("scope", credentials.scopes.join(" ")));
    params.push(("state", STATE_TOKEN.to_string()));

    let query = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if credentials.auth_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", credentials.auth_url, separator, query)
}

/// The network half of the credential lifecycle.
pub trait TokenEndpoint {
    /// Trades an authorization code for a token.
    async fn exchange_code(&self, credentials: &ClientCredentials, code: &str) -> AppResult<Token>;

    /// Obtains a fresh access token. The returned token may lack a refresh
    /// token; callers keep the one they already hold.
    async fn refresh(&self, credentials: &ClientCredentials, refresh_token: &str) -> AppResult<Token>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        Token {
            access_token: response.access_token,
            token_type: response
                .token_type
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expiry: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

/// Talks to the token URL recorded in the client credentials.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    http_client: reqwest::Client,
}

impl HttpTokenEndpoint {
    pub fn new() -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::TokenExchangeFailed(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    async fn request_token(&self, token_url: &str, params: &[(&str, &str)]) -> Result<Token, String> {
        let response = self
            .http_client
            .post(token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(format!("token endpoint returned {}: {}", status, body));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| format!("invalid token response: {}", e))?;
        Ok(token.into())
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange_code(&self, credentials: &ClientCredentials, code: &str) -> AppResult<Token> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        if let Some(ref redirect_url) = credentials.redirect_url {
            params.push(("redirect_uri", redirect_url.as_str()));
        }

        debug!("Exchanging authorization code at {}", credentials.token_url);
        let token = self
            .request_token(&credentials.token_url, &params)
            .await
            .map_err(AppError::TokenExchangeFailed)?;
        info!("Successfully obtained tokens");
        Ok(token)
    }

    async fn refresh(&self, credentials: &ClientCredentials, refresh_token: &str) -> AppResult<Token> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        debug!("Refreshing access token at {}", credentials.token_url);
        let token = self
            .request_token(&credentials.token_url, &params)
            .await
            .map_err(|reason| AppError::ReauthenticationRequired { reason })?;
        info!("Successfully refreshed access token");
        Ok(token)
    }
}
