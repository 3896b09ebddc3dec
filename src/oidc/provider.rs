use async_trait::async_trait;
use custom_error::custom_error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::utilities::{assert_send, with_timeout};

custom_error! {
    pub ProviderError
        RequestFailed{source: reqwest::Error} = "the provider request did fail: {source}",
        Timeout{operation: &'static str} = "{operation} did not complete in time",
        ResponseError{operation: &'static str, status: u16, body: String} = "{operation} returned status {status}: {body}",
        ParseResponse{source: serde_json::Error} = "could not parse provider response: {source}",
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

/// Token endpoint response. Fields other than the tokens are kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Result of a code exchange as reported by the provider.
#[derive(Clone, Debug, PartialEq)]
pub enum Exchange {
    Tokens(TokenBundle),
    /// The provider answered with an `error` field.
    Rejected { error: String, description: Option<String> },
}

#[derive(Deserialize)]
struct RawTokenResponse {
    error: Option<String>,
    error_description: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Claims returned by the user-info endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserInfo {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            nickname: None,
            picture: None,
            email: None,
            email_verified: None,
            extra: Map::new(),
        }
    }
}

/// The two provider endpoints the session flow depends on.
#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    /// Trade a one-time authorization code for a token bundle.
    async fn exchange_code(&self, code: &str) -> Result<Exchange, ProviderError>;

    /// Resolve the user behind an access token.
    async fn user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn exchange_code(&self, code: &str) -> Result<Exchange, ProviderError> {
        (**self).exchange_code(code).await
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        (**self).user_info(access_token).await
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// Auth0 token and user-info endpoints over `reqwest`.
#[derive(Clone)]
pub struct Auth0Client {
    token_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl Debug for Auth0Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth0Client")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Auth0Client {
    pub fn new(config: &Config) -> Self {
        Self {
            token_url: config.token_url(),
            userinfo_url: config.userinfo_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.callback_url.to_string(),
            timeout: config.outbound_timeout,
            http: reqwest::Client::new(),
        }
    }

    /// JSON body of the authorization-code grant.
    fn token_request<'a>(&'a self, code: &'a str) -> TokenRequest<'a> {
        TokenRequest {
            grant_type: "authorization_code",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code,
            redirect_uri: &self.redirect_uri,
        }
    }

    fn token_call(&self, code: &str) -> reqwest::RequestBuilder {
        self.http.post(&self.token_url).json(&self.token_request(code))
    }

    fn userinfo_call(&self, access_token: &str) -> reqwest::RequestBuilder {
        self.http.get(&self.userinfo_url).bearer_auth(access_token)
    }

    async fn post_token(&self, code: &str) -> Result<(u16, String), ProviderError> {
        let response = self
            .token_call(code)
            .send()
            .await
            .map_err(|source| ProviderError::RequestFailed { source })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::RequestFailed { source })?;
        Ok((status, text))
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        let response = self
            .userinfo_call(access_token)
            .send()
            .await
            .map_err(|source| ProviderError::RequestFailed { source })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::RequestFailed { source })?;

        parse_userinfo_response(status, text)
    }
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    async fn exchange_code(&self, code: &str) -> Result<Exchange, ProviderError> {
        let (status, text) = assert_send(with_timeout(self.timeout, self.post_token(code)))
            .await
            .map_err(|_| ProviderError::Timeout {
                operation: "token exchange",
            })??;

        parse_token_response(status, &text)
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        assert_send(with_timeout(self.timeout, self.get_user_info(access_token)))
            .await
            .map_err(|_| ProviderError::Timeout {
                operation: "userinfo request",
            })?
    }
}

/// Interpret a token endpoint reply. An `error` field wins over the status code.
pub(crate) fn parse_token_response(status: u16, body: &str) -> Result<Exchange, ProviderError> {
    let raw: RawTokenResponse = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(source) if (200..300).contains(&status) => {
            return Err(ProviderError::ParseResponse { source })
        }
        Err(_) => {
            return Err(ProviderError::ResponseError {
                operation: "token exchange",
                status,
                body: body.to_string(),
            })
        }
    };

    if let Some(error) = raw.error {
        return Ok(Exchange::Rejected {
            error,
            description: raw.error_description,
        });
    }

    if !(200..300).contains(&status) {
        return Err(ProviderError::ResponseError {
            operation: "token exchange",
            status,
            body: body.to_string(),
        });
    }

    serde_json::from_value(Value::Object(raw.rest))
        .map(Exchange::Tokens)
        .map_err(|source| ProviderError::ParseResponse { source })
}

/// Interpret a user-info reply. Anything outside 2xx is a provider error.
pub(crate) fn parse_userinfo_response(status: u16, body: String) -> Result<UserInfo, ProviderError> {
    if !(200..300).contains(&status) {
        return Err(ProviderError::ResponseError {
            operation: "userinfo request",
            status,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::ParseResponse { source })
}
