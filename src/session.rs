//! Session and login-state cookies.
//!
//! The session cookie carries the user's subject identifier and nothing else.
//! It is signed, so a value that was not issued by this worker never reaches
//! the store lookup.

use tower_cookies::cookie::time::{Duration, OffsetDateTime};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::config::Config;

/// Lifetime of the session cookie.
pub const SESSION_TTL: Duration = Duration::days(1);
/// Lifetime of the login `state` cookie.
pub const STATE_TTL: Duration = Duration::minutes(10);

/// Cookie names, attributes and the signing key.
#[derive(Clone)]
pub struct SessionCookies {
    key: Key,
    session_name: String,
    state_name: String,
    secure: bool,
}

impl std::fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookies")
            .field("session_name", &self.session_name)
            .field("state_name", &self.state_name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionCookies {
    pub fn new(config: &Config) -> Self {
        Self {
            key: Key::derive_from(&config.cookie_secret),
            session_name: config.session_cookie_name.clone(),
            state_name: config.state_cookie_name.clone(),
            secure: !config.dev_mode,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Whether the request carries a session cookie at all, signed or not.
    pub fn has_session(&self, cookies: &Cookies) -> bool {
        cookies.get(&self.session_name).is_some()
    }

    /// Subject from a validly signed, non-empty session cookie.
    pub fn subject(&self, cookies: &Cookies) -> Option<String> {
        cookies
            .signed(&self.key)
            .get(&self.session_name)
            .map(|c| c.value().to_string())
            .filter(|subject| !subject.is_empty())
    }

    pub fn set_session(&self, cookies: &Cookies, subject: &str) {
        self.issue(cookies, session_cookie(&self.session_name, subject, self.secure));
    }

    /// Sign `cookie` into the response jar.
    pub fn issue(&self, cookies: &Cookies, cookie: Cookie<'static>) {
        cookies.signed(&self.key).add(cookie);
    }

    pub fn clear_session(&self, cookies: &Cookies) {
        cookies.add(expired_cookie(&self.session_name));
    }

    pub fn set_state(&self, cookies: &Cookies, state: &str) {
        cookies
            .signed(&self.key)
            .add(state_cookie(&self.state_name, state, self.secure));
    }

    /// The login `state` of a pending login, if its cookie is validly signed.
    pub fn pending_state(&self, cookies: &Cookies) -> Option<String> {
        cookies
            .signed(&self.key)
            .get(&self.state_name)
            .map(|c| c.value().to_string())
            .filter(|state| !state.is_empty())
    }

    /// Read the login `state` and expire its cookie.
    pub fn take_state(&self, cookies: &Cookies) -> Option<String> {
        let state = cookies
            .signed(&self.key)
            .get(&self.state_name)
            .map(|c| c.value().to_string());
        if cookies.get(&self.state_name).is_some() {
            cookies.add(expired_cookie(&self.state_name));
        }
        state
    }
}

/// Create session cookie.
pub fn session_cookie(name: &str, subject: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), subject.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(SESSION_TTL)
        .build()
}

fn state_cookie(name: &str, state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(STATE_TTL)
        .build()
}

/// Empty, already-expired cookie that overwrites `name` on the client.
pub fn expired_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
