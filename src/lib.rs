//! # edge-auth0-gateway
//!
//! A Cloudflare Worker that puts an Auth0 login in front of another service.
//! Requests carrying a valid session are forwarded to the worker bound as
//! `PROXY_TARGET` with the user's access token attached; everyone else is sent
//! through the OAuth 2.0 authorization-code flow first. Token bundles live in
//! Workers KV under the user's subject identifier.
//!
//! Targets `wasm32-unknown-unknown`. The request handling itself is plain
//! axum and runs natively in tests against in-memory fakes.
//!
//! See the [docs](crate::docs) module for the full request flow.

mod api;
mod authorization;
mod config;
mod docs;
mod error;
mod oidc;
mod router;
mod session;
mod session_storage;
mod state;
mod utilities;

#[cfg(test)]
mod test_support;

pub use crate::api::Origin;
pub use crate::authorization::AuthContext;
pub use crate::config::{Config, ConfigError};
pub use crate::error::AuthError;
pub use crate::oidc::{IdentityProvider, UserInfo};
pub use crate::router::create_router;
pub use crate::session_storage::{SessionRecord, SessionStore};
pub use crate::state::{AppState, AppStateBuilder};

#[cfg(target_arch = "wasm32")]
mod entry {
    use axum::response::{IntoResponse, Response};
    use tower::ServiceExt;
    use tracing_subscriber::prelude::*;
    use worker::*;

    use crate::api::ServiceBindingOrigin;
    use crate::config::{Config, KV_STORAGE_BINDING};
    use crate::error::AuthError;
    use crate::router::create_router;
    use crate::session_storage::cloudflare::CloudflareKvStore;
    use crate::session_storage::StoreError;
    use crate::state::{AppState, AppStateBuilder};

    #[event(start)]
    fn start() {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false) // Only partially supported across JavaScript runtimes
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339()); // std::time is not available in browsers
        let perf_layer = tracing_web::performance_layer();

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(perf_layer)
            .init()
    }

    #[event(fetch)]
    async fn fetch(req: HttpRequest, env: Env, _ctx: Context) -> Result<Response> {
        console_error_panic_hook::set_once();

        Ok(route(req, env).await)
    }

    async fn route(req: HttpRequest, env: Env) -> Response {
        let state = match app_state(&env) {
            Ok(state) => state,
            Err(err) => return err.into_response(),
        };

        match create_router(state).oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    fn app_state(env: &Env) -> std::result::Result<AppState, AuthError> {
        let config = Config::from_env(env)?;

        let kv = env.kv(KV_STORAGE_BINDING).map_err(|err| StoreError::Backend {
            reason: err.to_string(),
        })?;

        AppStateBuilder::new(config)
            .with_session_store(CloudflareKvStore::new(kv))
            .with_origin(ServiceBindingOrigin::new(env.clone()))
            .build()
            .map_err(|err| AuthError::Origin(err.to_string()))
    }
}
