use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use url::form_urlencoded;

use crate::config::Config;

pub const LOGIN_SCOPES: &str = "openid profile email";

/// Provider login redirect together with the CSRF `state` it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

/// Generates a random `state` parameter (16 bytes, base64url, 22 characters).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the `/authorize` URL the browser is sent to when no session exists.
pub fn login_redirect(config: &Config) -> LoginRedirect {
    login_redirect_with_state(config, generate_state())
}

/// Same as [`login_redirect`], continuing a login that already has a `state`.
pub fn login_redirect_with_state(config: &Config, state: String) -> LoginRedirect {
    let url = authorization_url(config, &state);
    LoginRedirect { url, state }
}

fn authorization_url(config: &Config, state: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.callback_url.as_str())
        .append_pair("scope", LOGIN_SCOPES)
        .append_pair("state", state)
        .finish();
    format!("{}?{}", config.authorize_url(), query)
}
