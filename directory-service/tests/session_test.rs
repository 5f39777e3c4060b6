mod common;

use axum::http::{header, Method, StatusCode};
use common::{TestApp, MEMBER_EMAIL, MEMBER_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn approved_member_logs_in_and_gets_cookie() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": MEMBER_EMAIL.to_uppercase(), "password": MEMBER_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["user"]["email"], MEMBER_EMAIL);
    assert_eq!(res.body["user"]["role"], "user");

    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    let session = res.session_cookie().unwrap();
    let foranes = app.get("/api/foranes", Some(&session)).await;
    assert_eq!(foranes.status, StatusCode::OK);
}

#[tokio::test]
async fn pending_requester_is_refused_and_session_discarded() {
    let app = TestApp::spawn().await;
    app.signup("waiting@example.com").await;
    app.identity
        .seed_account("waiting@example.com", "secret-pass", "Waiting", None);
    let sessions_before = app.identity.active_sessions();

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": "waiting@example.com", "password": "secret-pass" }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["reason"], "unapproved");
    assert_eq!(res.body["error"], "Your account is pending approval");
    assert!(res.session_cookie().is_none());
    assert_eq!(app.identity.active_sessions(), sessions_before);
}

#[tokio::test]
async fn account_without_request_is_refused() {
    let app = TestApp::spawn().await;
    app.identity
        .seed_account("stranger@example.com", "secret-pass", "Stranger", None);

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": "stranger@example.com", "password": "secret-pass" }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "User record not found");
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": MEMBER_EMAIL, "password": "nope" }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["reason"], "unauthenticated");
    assert_eq!(res.body["error"], "Invalid email or password");
}

#[tokio::test]
async fn malformed_login_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/auth/login",
            json!({ "email": "not-an-email", "password": "" }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["fields"]["email"].is_array());
    assert!(res.body["fields"]["password"].is_array());
}

#[tokio::test]
async fn me_reports_the_session_user() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/auth/me", Some(&app.admin_session)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["role"], "admin");

    let anonymous = app.get("/api/auth/me", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let stale = app.get("/api/auth/me", Some("not-a-session")).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_destroys_session_and_is_idempotent() {
    let app = TestApp::spawn().await;

    let res = app
        .request(
            Method::POST,
            "/api/auth/logout",
            None,
            Some(&app.member_session),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Logged out successfully");
    let cleared = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("directory_session="));
    assert!(cleared.contains("Max-Age=0"));

    let me = app.get("/api/auth/me", Some(&app.member_session)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let again = app
        .request(Method::POST, "/api/auth/logout", None, None)
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_anonymous_callers() {
    let app = TestApp::spawn().await;

    for uri in ["/api/foranes", "/api/contact-person", "/api/auth/user-requests"] {
        let res = app.get(uri, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(res.body["error"], "Authentication required");
    }
}
