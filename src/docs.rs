//! # edge-auth0-gateway Documentation
//!
//! How a request moves through the gateway, and where each step lives.
//!
//! ## Overview
//!
//! The worker sits in front of a content service bound as `PROXY_TARGET`. It
//! owns two paths, `/auth` (the OAuth callback) and `/logout`. Every other
//! request is authorized and then either forwarded or answered with a redirect
//! to the Auth0 `/authorize` page.
//!
//! ## Request flow
//!
//! 1. No session cookie: the browser gets `302` to Auth0 with a fresh `state`,
//!    which is also set in the signed `AUTH0-STATE` cookie. Neither the store
//!    nor the provider is contacted.
//! 2. Session cookie present: the subject it carries is looked up in KV under
//!    `session::<subject>`. The stored access token is sent to `/userinfo`,
//!    and the `sub` from that response must match the `sub` in the stored
//!    identity token. A match forwards the request with
//!    `Authorization: Bearer <access token>`; a mismatch answers `401`
//!    and expires the cookie.
//! 3. `/auth?code=..&state=..`: `state` is compared with the state cookie,
//!    the code is exchanged at `/oauth/token`, the identity token is checked
//!    and the bundle is written to KV. The browser receives the session cookie
//!    and `302 /`.
//! 4. `/logout`: the session cookie is expired and the browser sent to `/`.
//!    The stored record stays unless `LOGOUT_DELETES_SESSION=true`.
//!
//! ## Architecture
//!
//! - **api**: the callback, logout and proxy handlers, and the [`Origin`](crate::api::Origin) seam
//! - **authorization**: [`AuthContext`](crate::authorization::AuthContext) and the code that produces it
//! - **oidc**: Auth0 endpoints, identity token decoding and JWKS verification
//! - **session_storage**: the [`SessionStore`](crate::session_storage::SessionStore) trait with KV and in-memory backends
//! - **session**: cookie names, attributes and signing
//! - **error**: [`AuthError`](crate::error::AuthError), its status mapping and the cookie-clearing middleware
//!
//! ## Setup
//!
//! ```ignore
//! let state = AppStateBuilder::new(Config::from_env(&env)?)
//!     .with_session_store(CloudflareKvStore::new(env.kv(KV_STORAGE_BINDING)?))
//!     .with_origin(ServiceBindingOrigin::new(env.clone()))
//!     .build()?;
//! let response = create_router(state).oneshot(request).await?;
//! ```
//!
//! ## Deployment
//!
//! Built for `wasm32-unknown-unknown` and deployed with `wrangler`. See
//! `wrangler.toml` for the bindings, variables and secrets the worker expects.
