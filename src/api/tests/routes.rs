use super::*;
use crate::config::LogoutPolicy;
use crate::session_storage::SessionStore;
use axum::http::Method;
use std::collections::HashMap;
use url::Url;

fn query_of(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

#[tokio::test]
async fn test_anonymous_request_redirects_to_login() {
    let app = test_app();

    let (status, headers, _) = make_request(&app, Method::GET, "/dashboard", None).await;

    assert_eq!(status, StatusCode::FOUND);
    let location = location(&headers);
    assert!(location.starts_with("https://tenant.auth0.com/authorize?"));

    let query = query_of(&location);
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["client_id"], "client-id");
    assert_eq!(query["redirect_uri"], "https://app.example.com/auth");
    assert_eq!(query["scope"], "openid profile email");
    assert!(cookie_pair(&headers, "AUTH0-STATE").is_some());

    assert_eq!(app.store.calls(), 0);
    assert_eq!(app.provider.userinfo_calls(), 0);
    assert!(app.origin.forwarded().is_empty());
}

#[tokio::test]
async fn test_login_round_trip() {
    let provider = FakeProvider::default()
        .with_code("good-code", tokens_for("auth0|abc", "at-1"))
        .with_user("at-1", "auth0|abc");
    let app = test_app_with(test_config(), provider);

    let (_, headers, _) = make_request(&app, Method::GET, "/dashboard", None).await;
    let state = query_of(&location(&headers))["state"].clone();
    let state_cookie = cookie_pair(&headers, "AUTH0-STATE").unwrap();

    let (status, headers, _) = make_request(
        &app,
        Method::GET,
        &format!("/auth?code=good-code&state={state}"),
        Some(vec![("Cookie".to_string(), state_cookie)]),
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/");
    assert_eq!(app.store.saves(), 1);

    let session = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("AUTH0-AUTH="))
        .unwrap();
    assert!(session.contains("HttpOnly"));
    assert!(session.contains("SameSite=Lax"));
    assert!(session.contains("Max-Age=86400"));

    let session_cookie = cookie_pair(&headers, "AUTH0-AUTH").unwrap();
    let (status, _, body) = make_request(
        &app,
        Method::GET,
        "/dashboard",
        Some(vec![("Cookie".to_string(), session_cookie)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "origin:/dashboard");
    let forwarded = app.origin.forwarded();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].authorization.as_deref(), Some("Bearer at-1"));
}

#[tokio::test]
async fn test_parallel_anonymous_request_keeps_login_state() {
    let provider = FakeProvider::default()
        .with_code("good-code", tokens_for("auth0|abc", "at-1"))
        .with_user("at-1", "auth0|abc");
    let app = test_app_with(test_config(), provider);

    let (_, headers, _) = make_request(&app, Method::GET, "/dashboard", None).await;
    let state = query_of(&location(&headers))["state"].clone();
    let mut state_cookie = cookie_pair(&headers, "AUTH0-STATE").unwrap();

    // the browser fetches an asset before following the redirect
    let (status, headers, _) = make_request(
        &app,
        Method::GET,
        "/favicon.ico",
        Some(vec![("Cookie".to_string(), state_cookie.clone())]),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(query_of(&location(&headers))["state"], state);
    if let Some(refreshed) = cookie_pair(&headers, "AUTH0-STATE") {
        state_cookie = refreshed;
    }

    let (status, headers, _) = make_request(
        &app,
        Method::GET,
        &format!("/auth?code=good-code&state={state}"),
        Some(vec![("Cookie".to_string(), state_cookie)]),
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/");
    assert_eq!(app.store.saves(), 1);
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let provider = FakeProvider::default().with_code("good-code", tokens_for("auth0|abc", "at-1"));
    let app = test_app_with(test_config(), provider);

    let (_, headers, _) = make_request(&app, Method::GET, "/", None).await;
    let state_cookie = cookie_pair(&headers, "AUTH0-STATE").unwrap();

    let (status, _, _) = make_request(
        &app,
        Method::GET,
        "/auth?code=good-code&state=forged",
        Some(vec![("Cookie".to_string(), state_cookie)]),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.provider.exchange_calls(), 0);
    assert_eq!(app.store.saves(), 0);
}

#[tokio::test]
async fn test_callback_without_state_cookie_is_rejected() {
    let app = test_app();

    let (status, _, _) =
        make_request(&app, Method::GET, "/auth?code=good-code&state=abc", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.provider.exchange_calls(), 0);
}

#[tokio::test]
async fn test_callback_without_code() {
    let app = test_app();

    let (status, headers, _) = make_request(&app, Method::GET, "/auth", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers["x-auth-error"], "missing code");
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let app = test_app();

    let (status, headers, _) = make_request(
        &app,
        Method::GET,
        "/auth?error=access_denied&error_description=User%20cancelled",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers["x-auth-error"], "denied");
    assert_eq!(app.provider.exchange_calls(), 0);
}

#[tokio::test]
async fn test_rejected_code_returns_provider_message() {
    let app = test_app();

    let (_, headers, _) = make_request(&app, Method::GET, "/", None).await;
    let state = query_of(&location(&headers))["state"].clone();
    let state_cookie = cookie_pair(&headers, "AUTH0-STATE").unwrap();

    let (status, _, body) = make_request(
        &app,
        Method::GET,
        &format!("/auth?code=stale-code&state={state}"),
        Some(vec![("Cookie".to_string(), state_cookie)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Invalid authorization code");
    assert_eq!(app.store.saves(), 0);
}

#[tokio::test]
async fn test_logout_clears_cookie_and_keeps_record() {
    let app = test_app();
    let cookie = app.signed_in("auth0|abc", "at-1").await;

    let (status, headers, _) = make_request(&app, Method::GET, "/logout", Some(vec![cookie])).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/");
    let cleared = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("AUTH0-AUTH="))
        .unwrap();
    assert!(cleared.starts_with("AUTH0-AUTH=;"));
    assert!(cleared.contains("Max-Age=0"));

    assert_eq!(app.store.deletes(), 0);
    assert!(app.store.inner().load("auth0|abc").await.unwrap().is_some());
}

#[tokio::test]
async fn test_logout_can_delete_the_record() {
    let config = test_config().with_logout_policy(LogoutPolicy::DeleteSession);
    let app = test_app_with(config, FakeProvider::default());
    let cookie = app.signed_in("auth0|abc", "at-1").await;

    let (status, _, _) = make_request(&app, Method::POST, "/logout", Some(vec![cookie])).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(app.store.deletes(), 1);
    assert!(app.store.inner().is_empty().await);
}

#[tokio::test]
async fn test_logout_without_cookie_is_a_normal_request() {
    let app = test_app();

    let (status, headers, _) = make_request(&app, Method::GET, "/logout", None).await;

    assert_eq!(status, StatusCode::FOUND);
    assert!(location(&headers).starts_with("https://tenant.auth0.com/authorize?"));
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_configured_cookie_names_are_used() {
    let config = test_config()
        .with_session_cookie_name("edge-session")
        .with_state_cookie_name("edge-login");
    let app = test_app_with(config, FakeProvider::default().with_user("at-1", "auth0|abc"));

    let (_, headers, _) = make_request(&app, Method::GET, "/", None).await;
    assert!(cookie_pair(&headers, "edge-login").is_some());
    assert!(cookie_pair(&headers, "AUTH0-STATE").is_none());

    let cookie = app.signed_in("auth0|abc", "at-1").await;
    assert!(cookie.1.starts_with("edge-session="));
    let (status, _, _) = make_request(&app, Method::GET, "/", Some(vec![cookie])).await;
    assert_eq!(status, StatusCode::OK);
}
