mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn foranes_are_listed_in_directory_order() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/foranes", Some(&app.member_session)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], 6);

    let ids: Vec<&str> = res.body["foranes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["1", "2", "3", "4", "5", "6"]);
    assert_eq!(res.body["foranes"][0]["totalParishes"], 6);
}

#[tokio::test]
async fn forane_filter_is_case_insensitive() {
    let app = TestApp::spawn().await;

    let res = app
        .get("/api/foranes?q=CHERP", Some(&app.member_session))
        .await;
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["foranes"][0]["name"], "Cherpunkal");
}

#[tokio::test]
async fn forane_detail_lists_parishes() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/foranes/2", Some(&app.member_session)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["fullName"], "MAR SLEEVA FORANE CHURCH");
    assert_eq!(res.body["parishes"][1]["id"], "2-2");
    assert_eq!(res.body["parishes"][1]["name"], "Kidangoor");

    let empty = app.get("/api/foranes/6", Some(&app.member_session)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["totalParishes"], 0);
}

#[tokio::test]
async fn unknown_forane_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get("/api/foranes/99", Some(&app.member_session)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "Forane not found");
}

#[tokio::test]
async fn health_reports_dependencies() {
    let app = TestApp::spawn().await;

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["checks"]["email"], "disabled");
    assert_eq!(res.body["checks"]["foranes"], 6);

    app.requests.fail_reads(true);
    let down = app.get("/health", None).await;
    assert_eq!(down.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let res = app.get("/.well-known/openapi.json", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["paths"]["/api/auth/approve-user"].is_object());
    assert!(res.body["components"]["securitySchemes"]["session_cookie"].is_object());
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = TestApp::spawn().await;

    let res = app.get("/health", None).await;
    assert!(res.headers.contains_key("x-request-id"));
    assert_eq!(
        res.headers
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}
