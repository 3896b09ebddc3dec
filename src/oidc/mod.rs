pub mod id_token;
pub mod jwks;
pub mod login;
pub mod provider;

pub use id_token::{decode_payload, IdTokenClaims, IdTokenError, IdTokenVerifier};
pub use login::{login_redirect, login_redirect_with_state, LoginRedirect};
pub use provider::{Auth0Client, Exchange, IdentityProvider, ProviderError, TokenBundle, UserInfo};
