//! Configuration management for the application.
//!
//! Every component receives a [`Config`] at construction. Nothing reads the
//! environment after startup.

use std::fmt::Debug;
use std::time::Duration;
use url::Url;

/// Workers KV namespace holding session records
pub const KV_STORAGE_BINDING: &str = "AUTH_STORE";
/// Service binding that serves content for authorized requests
pub const PROXY_TARGET_BINDING: &str = "PROXY_TARGET";

pub const DEFAULT_SESSION_COOKIE: &str = "AUTH0-AUTH";
pub const DEFAULT_STATE_COOKIE: &str = "AUTH0-STATE";
pub const DEFAULT_OUTBOUND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Minimum length of `COOKIE_SECRET`, in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// What logout does with the server-side session record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogoutPolicy {
    /// Only expire the cookie. The stored record stays until the next login overwrites it.
    #[default]
    ClearCookie,
    /// Expire the cookie and delete the stored record.
    DeleteSession,
}

/// How a failed user-info call during verification is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationFailurePolicy {
    /// Provider or network failures produce the unauthenticated outcome.
    #[default]
    Lenient,
    /// Provider or network failures are returned as errors.
    Strict,
}

/// How identity tokens are checked before their claims are trusted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdTokenVerification {
    /// RS256 against the tenant's published JWKS.
    #[default]
    Jwks,
    /// HS256 with the client secret.
    ClientSecret,
    /// Decode the payload without checking the signature.
    None,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// `https://` origin of the Auth0 tenant, without trailing slash
    pub auth0_domain: String,
    /// The client ID for OAuth authentication
    pub client_id: String,
    /// The client secret for OAuth authentication
    pub client_secret: String,
    /// Redirect URI registered with the provider (`.../auth`)
    pub callback_url: Url,
    /// Master key material for cookie signing
    pub cookie_secret: Vec<u8>,
    /// Whether the application is running in development mode
    pub dev_mode: bool,
    pub session_cookie_name: String,
    pub state_cookie_name: String,
    pub logout_policy: LogoutPolicy,
    pub verification_failure: VerificationFailurePolicy,
    pub id_token_verification: IdTokenVerification,
    /// Upper bound for each outbound HTTP call
    pub outbound_timeout: Duration,
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auth0_domain", &self.auth0_domain)
            .field("client_id", &self.client_id)
            .field("callback_url", &self.callback_url.as_str())
            .field("dev_mode", &self.dev_mode)
            .field("logout_policy", &self.logout_policy)
            .field("verification_failure", &self.verification_failure)
            .field("id_token_verification", &self.id_token_verification)
            .field("outbound_timeout", &self.outbound_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a configuration from the four provider values and the cookie secret.
    ///
    /// Optional settings take their defaults and can be overridden with the `with_*` methods.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the domain or callback URL does not parse,
    /// or if the cookie secret is shorter than [`MIN_COOKIE_SECRET_LEN`].
    pub fn new(
        auth0_domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: &str,
        cookie_secret: impl AsRef<[u8]>,
    ) -> Result<Self, ConfigError> {
        let cookie_secret = cookie_secret.as_ref().to_vec();
        if cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ConfigError::InvalidValue {
                name: "COOKIE_SECRET",
                reason: format!("must be at least {MIN_COOKIE_SECRET_LEN} bytes"),
            });
        }

        let callback_url = Url::parse(callback_url).map_err(|e| ConfigError::InvalidValue {
            name: "AUTH0_CALLBACK_URL",
            reason: e.to_string(),
        })?;

        Ok(Config {
            auth0_domain: normalize_domain(auth0_domain)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url,
            cookie_secret,
            dev_mode: false,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            state_cookie_name: DEFAULT_STATE_COOKIE.to_string(),
            logout_policy: LogoutPolicy::default(),
            verification_failure: VerificationFailurePolicy::default(),
            id_token_verification: IdTokenVerification::default(),
            outbound_timeout: DEFAULT_OUTBOUND_TIMEOUT,
        })
    }

    /// Create a new configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `env` - The environment containing configuration values
    ///
    /// # Returns
    ///
    /// A Result containing the configuration or an error if required values are missing
    #[cfg(target_arch = "wasm32")]
    pub fn from_env(env: &worker::Env) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| {
            env.secret(name)
                .map(|s| s.to_string())
                .or_else(|_| env.var(name).map(|v| v.to_string()))
                .ok()
        })
    }

    /// Build a configuration from any name -> value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingValue(name));
        let flag = |name: &str| lookup(name).map(|v| v == "true").unwrap_or(false);

        let mut config = Config::new(
            &required("AUTH0_DOMAIN")?,
            required("AUTH0_CLIENT_ID")?,
            required("AUTH0_CLIENT_SECRET")?,
            &required("AUTH0_CALLBACK_URL")?,
            required("COOKIE_SECRET")?,
        )?
        .with_dev_mode(flag("DEV_MODE"));

        if flag("LOGOUT_DELETES_SESSION") {
            config = config.with_logout_policy(LogoutPolicy::DeleteSession);
        }
        if flag("STRICT_VERIFICATION") {
            config = config.with_verification_failure(VerificationFailurePolicy::Strict);
        }

        if let Some(mode) = lookup("ID_TOKEN_VERIFICATION") {
            let mode = match mode.as_str() {
                "jwks" => IdTokenVerification::Jwks,
                "client_secret" => IdTokenVerification::ClientSecret,
                "none" => IdTokenVerification::None,
                other => {
                    return Err(ConfigError::InvalidValue {
                        name: "ID_TOKEN_VERIFICATION",
                        reason: format!("unknown mode `{other}`"),
                    })
                }
            };
            config = config.with_id_token_verification(mode);
        }

        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            config = config.with_session_cookie_name(cookie_name("SESSION_COOKIE_NAME", name)?);
        }
        if let Some(name) = lookup("STATE_COOKIE_NAME") {
            config = config.with_state_cookie_name(cookie_name("STATE_COOKIE_NAME", name)?);
        }
        if config.session_cookie_name == config.state_cookie_name {
            return Err(ConfigError::InvalidValue {
                name: "STATE_COOKIE_NAME",
                reason: "must differ from the session cookie name".to_string(),
            });
        }

        if let Some(ms) = lookup("OUTBOUND_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| ConfigError::InvalidValue {
                name: "OUTBOUND_TIMEOUT_MS",
                reason: format!("`{ms}` is not a number of milliseconds"),
            })?;
            config = config.with_outbound_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_state_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.state_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_logout_policy(mut self, policy: LogoutPolicy) -> Self {
        self.logout_policy = policy;
        self
    }

    #[must_use]
    pub fn with_verification_failure(mut self, policy: VerificationFailurePolicy) -> Self {
        self.verification_failure = policy;
        self
    }

    #[must_use]
    pub fn with_id_token_verification(mut self, mode: IdTokenVerification) -> Self {
        self.id_token_verification = mode;
        self
    }

    #[must_use]
    pub fn with_outbound_timeout(mut self, timeout: Duration) -> Self {
        self.outbound_timeout = timeout;
        self
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.auth0_domain)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.auth0_domain)
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/userinfo", self.auth0_domain)
    }

    /// The `iss` claim Auth0 puts in identity tokens.
    pub fn issuer(&self) -> String {
        format!("{}/", self.auth0_domain)
    }
}

/// Cookie names are RFC 6265 tokens: visible ASCII without separators.
fn cookie_name(variable: &'static str, name: String) -> Result<String, ConfigError> {
    let valid = !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        });
    if valid {
        Ok(name)
    } else {
        Err(ConfigError::InvalidValue {
            name: variable,
            reason: format!("`{name}` is not a valid cookie name"),
        })
    }
}

fn normalize_domain(domain: &str) -> Result<String, ConfigError> {
    let trimmed = domain.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidValue {
        name: "AUTH0_DOMAIN",
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            name: "AUTH0_DOMAIN",
            reason: "no host".to_string(),
        });
    }

    Ok(with_scheme)
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration value is missing
    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),
    /// A configuration value is present but unusable
    #[error("Invalid configuration value {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
