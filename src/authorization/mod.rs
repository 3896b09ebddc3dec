mod authorizer;
mod context;
mod exchanger;
mod verifier;

pub use authorizer::Authorizer;
pub use context::AuthContext;
pub use exchanger::{CodeExchanger, LoginGrant};
pub use verifier::{SessionVerifier, Verification};
