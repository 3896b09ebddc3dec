use std::sync::Arc;
use tower_cookies::Cookies;

use crate::error::AuthError;
use crate::oidc::{decode_payload, IdentityProvider, UserInfo};
use crate::session::SessionCookies;
use crate::session_storage::SessionStore;

/// Result of checking the session cookie against the store and the provider.
#[derive(Clone, Debug, PartialEq)]
pub enum Verification {
    NoSession,
    Verified {
        access_token: String,
        user_info: UserInfo,
    },
}

/// Re-validates a stored session on every request.
#[derive(Clone, Debug)]
pub struct SessionVerifier {
    cookies: SessionCookies,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn IdentityProvider>,
}

impl SessionVerifier {
    pub fn new(
        cookies: SessionCookies,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            cookies,
            store,
            provider,
        }
    }

    /// Without a signed session cookie this returns before touching the
    /// store or the network.
    pub async fn verify(&self, cookies: &Cookies) -> Result<Verification, AuthError> {
        match self.cookies.subject(cookies) {
            Some(subject) => self.verify_subject(&subject).await,
            None => Ok(Verification::NoSession),
        }
    }

    pub async fn verify_subject(&self, subject: &str) -> Result<Verification, AuthError> {
        let Some(record) = self.store.load(subject).await? else {
            tracing::debug!(subject, "no stored session for cookie");
            return Ok(Verification::NoSession);
        };

        let user_info = self
            .provider
            .user_info(&record.tokens.access_token)
            .await?;
        let claims = decode_payload(&record.tokens.id_token)?;

        if claims.sub != user_info.sub || record.subject != subject || claims.sub != subject {
            tracing::warn!(
                subject,
                id_token_subject = %claims.sub,
                userinfo_subject = %user_info.sub,
                "stored session does not belong to the current user"
            );
            return Err(AuthError::InvalidToken("subject mismatch".to_string()));
        }

        Ok(Verification::Verified {
            access_token: record.tokens.access_token,
            user_info,
        })
    }
}
