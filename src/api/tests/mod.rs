use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_cookies::Cookies;

use crate::config::Config;
use crate::oidc::IdTokenVerifier;
use crate::router::create_router;
use crate::session::SessionCookies;
use crate::session_storage::SessionRecord;
use crate::state::AppStateBuilder;
use crate::test_support::{test_config, tokens_for, CountingStore, EchoOrigin, FakeProvider};

struct TestApp {
    router: Router,
    config: Config,
    store: CountingStore,
    provider: FakeProvider,
    origin: EchoOrigin,
}

// Helper function to create a test app
fn test_app() -> TestApp {
    test_app_with(test_config(), FakeProvider::default())
}

fn test_app_with(config: Config, provider: FakeProvider) -> TestApp {
    let store = CountingStore::default();
    let origin = EchoOrigin::default();

    let state = AppStateBuilder::new(config.clone())
        .with_session_store(store.clone())
        .with_origin(origin.clone())
        .with_identity_provider(provider.clone())
        .with_id_token_verifier(IdTokenVerifier::Unverified)
        .build()
        .unwrap();

    TestApp {
        router: create_router(state),
        config,
        store,
        provider,
        origin,
    }
}

impl TestApp {
    /// Store a session for `subject` and return the matching `Cookie` header.
    async fn signed_in(&self, subject: &str, access_token: &str) -> (String, String) {
        self.store
            .seed(SessionRecord::new(subject, tokens_for(subject, access_token)))
            .await;
        (
            "Cookie".to_string(),
            session_cookie_header(&self.config, subject),
        )
    }
}

fn session_cookie_header(config: &Config, subject: &str) -> String {
    let jar = Cookies::default();
    SessionCookies::new(config).set_session(&jar, subject);
    let cookie = jar.get(&config.session_cookie_name).unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

// Helper function to make a test request
async fn make_request(
    app: &TestApp,
    method: http::Method,
    uri: &str,
    headers: Option<Vec<(String, String)>>,
) -> (StatusCode, HeaderMap, String) {
    let mut req_builder = Request::builder().method(method).uri(uri);

    // Add headers if provided
    if let Some(headers) = headers {
        for (name, value) in headers {
            req_builder = req_builder.header(name, value);
        }
    }

    let req = req_builder.body(Body::empty()).unwrap();

    // Process the request
    let response = app.router.clone().oneshot(req).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(body.to_vec()).unwrap();

    (status, headers, body)
}

/// All `Set-Cookie` values of a response.
fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `name=value` pair of the `Set-Cookie` for `name`.
fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .and_then(|c| c.split(';').next().map(str::to_string))
}

fn location(headers: &HeaderMap) -> String {
    headers[http::header::LOCATION].to_str().unwrap().to_string()
}

pub mod routes;
