use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use custom_error::custom_error;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::config::{Config, IdTokenVerification};
use crate::oidc::jwks::JwksCache;
use crate::utilities::Utilities;

custom_error! {
    pub IdTokenError
        Malformed{reason: &'static str} = "identity token is malformed: {reason}",
        Decode{source: base64::DecodeError} = "could not decode identity token payload: {source}",
        Claims{source: serde_json::Error} = "could not parse identity token claims: {source}",
        Signature{source: jsonwebtoken::errors::Error} = "identity token failed verification: {source}",
        Expired = "identity token has expired",
        Keys{reason: String} = "signing keys unavailable: {reason}",
}

/// Clock skew tolerated when checking `exp`.
const LEEWAY_SECS: i64 = 60;

/// Audience can be a single string or array of strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user identifier)
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Audience,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read the claims of a compact JWS without checking its signature.
pub fn decode_payload(token: &str) -> Result<IdTokenClaims, IdTokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(IdTokenError::Malformed {
            reason: "expected three dot-separated segments",
        });
    };

    if payload.is_empty() {
        return Err(IdTokenError::Malformed {
            reason: "empty payload segment",
        });
    }

    // Some issuers keep the `=` padding.
    let bytes = if payload.ends_with('=') {
        URL_SAFE.decode(payload)
    } else {
        URL_SAFE_NO_PAD.decode(payload)
    }
    .map_err(|source| IdTokenError::Decode { source })?;

    serde_json::from_slice(&bytes).map_err(|source| IdTokenError::Claims { source })
}

thread_local! {
    static SHARED_VERIFIER: OnceCell<IdTokenVerifier> = const { OnceCell::new() };
}

/// Checks an identity token before its claims are trusted.
#[derive(Clone, Debug)]
pub enum IdTokenVerifier {
    /// Payload decode only.
    Unverified,
    /// HS256 keyed with the client secret.
    ClientSecret {
        secret: String,
        issuer: String,
        audience: String,
    },
    /// RS256 against the tenant JWKS.
    Jwks {
        keys: Arc<JwksCache>,
        issuer: String,
        audience: String,
    },
}

impl IdTokenVerifier {
    pub fn from_config(config: &Config) -> Self {
        match config.id_token_verification {
            IdTokenVerification::None => {
                tracing::warn!("identity token signatures are not verified");
                IdTokenVerifier::Unverified
            }
            IdTokenVerification::ClientSecret => IdTokenVerifier::ClientSecret {
                secret: config.client_secret.clone(),
                issuer: config.issuer(),
                audience: config.client_id.clone(),
            },
            IdTokenVerification::Jwks => IdTokenVerifier::Jwks {
                keys: Arc::new(JwksCache::new(
                    Utilities::get_jwks_url(&config.auth0_domain),
                    config.outbound_timeout,
                )),
                issuer: config.issuer(),
                audience: config.client_id.clone(),
            },
        }
    }

    /// The verifier for this isolate. The first call builds it from `config`;
    /// later calls share its JWKS cache. A Workers isolate serves many requests
    /// on one thread, so the keys outlive a single fetch.
    pub fn shared(config: &Config) -> Self {
        SHARED_VERIFIER.with(|cell| cell.get_or_init(|| Self::from_config(config)).clone())
    }

    /// Return the token's claims once the configured checks pass.
    pub async fn verify(&self, token: &str) -> Result<IdTokenClaims, IdTokenError> {
        match self {
            IdTokenVerifier::Unverified => decode_payload(token),
            IdTokenVerifier::ClientSecret {
                secret,
                issuer,
                audience,
            } => {
                let key = DecodingKey::from_secret(secret.as_bytes());
                verify_signed(token, &key, Algorithm::HS256, issuer, audience)
            }
            IdTokenVerifier::Jwks {
                keys,
                issuer,
                audience,
            } => {
                let header =
                    decode_header(token).map_err(|source| IdTokenError::Signature { source })?;
                let key = keys.get_key(header.kid.as_deref()).await?;
                verify_signed(token, &key, Algorithm::RS256, issuer, audience)
            }
        }
    }
}

fn verify_signed(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    issuer: &str,
    audience: &str,
) -> Result<IdTokenClaims, IdTokenError> {
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    // `exp` is checked below; jsonwebtoken's clock is not available on wasm32.
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["iss", "aud", "sub"]);

    let claims = decode::<IdTokenClaims>(token, key, &validation)
        .map_err(|source| IdTokenError::Signature { source })?
        .claims;

    if let Some(exp) = claims.exp {
        if exp + LEEWAY_SECS < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(IdTokenError::Expired);
        }
    }

    Ok(claims)
}
