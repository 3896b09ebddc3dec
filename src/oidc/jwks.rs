//! JWKS (JSON Web Key Set) fetching and caching.

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::oidc::id_token::IdTokenError;
use crate::utilities::{assert_send, with_timeout};

/// Signing keys of the tenant, fetched on first use and again whenever a token
/// names a `kid` that is not cached. Lives as long as the verifier holding it;
/// see [`IdTokenVerifier::shared`](crate::oidc::IdTokenVerifier::shared).
pub struct JwksCache {
    keys: RwLock<HashMap<String, DecodingKey>>,
    jwks_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_url", &self.jwks_url)
            .finish_non_exhaustive()
    }
}

/// JWKS response from the endpoint.
#[derive(Debug, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JSON Web Key.
#[derive(Debug, Deserialize)]
pub struct Jwk {
    /// Key type
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url)
    pub n: Option<String>,
    /// RSA exponent (base64url)
    pub e: Option<String>,
}

const DEFAULT_KID: &str = "default";

impl JwksCache {
    /// Create an empty cache. Nothing is fetched until a key is requested.
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            jwks_url,
            timeout,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a cache pre-filled from an already fetched key set.
    pub fn from_jwks(jwks_url: String, timeout: Duration, jwks: Jwks) -> Self {
        let cache = Self::new(jwks_url, timeout);
        cache.install(jwks);
        cache
    }

    /// Get a decoding key by key ID, refreshing once on a miss.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, IdTokenError> {
        if let Some(key) = self.cached(kid)? {
            return Ok(key);
        }

        debug!(kid = ?kid, "Key not found in cache, refreshing JWKS");
        self.refresh().await?;

        self.cached(kid)?.ok_or_else(|| IdTokenError::Keys {
            reason: format!("no key for kid {:?} in JWKS", kid),
        })
    }

    fn cached(&self, kid: Option<&str>) -> Result<Option<DecodingKey>, IdTokenError> {
        let keys = self.keys.read().map_err(|_| IdTokenError::Keys {
            reason: "lock poisoned".to_string(),
        })?;
        Ok(match kid {
            Some(kid) => keys.get(kid).cloned(),
            None => keys
                .get(DEFAULT_KID)
                .or_else(|| keys.values().next())
                .cloned(),
        })
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), IdTokenError> {
        debug!(url = %self.jwks_url, "Fetching JWKS");

        let jwks = assert_send(with_timeout(self.timeout, self.fetch()))
            .await
            .map_err(|_| IdTokenError::Keys {
                reason: "JWKS request timed out".to_string(),
            })??;

        if self.install(jwks) == 0 {
            return Err(IdTokenError::Keys {
                reason: "no valid signing keys found in JWKS".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<Jwks, IdTokenError> {
        let keys_unavailable = |e: reqwest::Error| IdTokenError::Keys {
            reason: e.to_string(),
        };

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(keys_unavailable)?;

        if !response.status().is_success() {
            return Err(IdTokenError::Keys {
                reason: format!("JWKS endpoint returned status {}", response.status()),
            });
        }

        response.json::<Jwks>().await.map_err(keys_unavailable)
    }

    /// Replace the cached keys with the usable keys of `jwks`; returns how many were kept.
    fn install(&self, jwks: Jwks) -> usize {
        let mut new_keys = HashMap::new();
        for jwk in jwks.keys {
            if jwk.key_use.as_deref() == Some("enc") {
                continue;
            }

            match Self::jwk_to_decoding_key(&jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| DEFAULT_KID.to_string());
                    debug!(kid = %kid, "Loaded JWK");
                    new_keys.insert(kid, key);
                }
                Err(e) => {
                    warn!(kid = ?jwk.kid, kty = %jwk.kty, error = %e, "Failed to parse JWK, skipping");
                }
            }
        }

        let count = new_keys.len();
        if count > 0 {
            if let Ok(mut keys) = self.keys.write() {
                *keys = new_keys;
            }
            info!(url = %self.jwks_url, key_count = count, "JWKS cache refreshed");
        }
        count
    }

    /// Convert a JWK to a DecodingKey. Auth0 signs identity tokens with RSA keys only.
    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, IdTokenError> {
        let missing = |part: &str| IdTokenError::Keys {
            reason: format!("RSA key missing '{part}'"),
        };

        match jwk.kty.as_str() {
            "RSA" => {
                let n = jwk.n.as_ref().ok_or_else(|| missing("n"))?;
                let e = jwk.e.as_ref().ok_or_else(|| missing("e"))?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|source| IdTokenError::Signature { source })
            }
            kty => Err(IdTokenError::Keys {
                reason: format!("unsupported key type: {kty}"),
            }),
        }
    }
}
