mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestApp;
use directory_service::models::ContactPerson;
use directory_service::services::ContactStore;
use serde_json::{json, Value};

fn contact_body(name: &str, forane: &str, parish: &str) -> Value {
    json!({
        "name": name,
        "contactNumber": "98470-12345",
        "forane": forane,
        "parish": parish,
        "dob": "1988-12-24"
    })
}

async fn seed_contacts(app: &TestApp, count: usize, forane: (&str, &str), parish: (&str, &str)) {
    let now = Utc::now();
    for i in 0..count {
        app.contacts
            .insert(&ContactPerson {
                id: format!("seed-{}-{}", parish.0, i),
                name: format!("Contact {}", i),
                phone: "9999999999".into(),
                forane: forane.0.into(),
                forane_name: forane.1.into(),
                parish: parish.0.into(),
                parish_name: parish.1.into(),
                dob: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn create_contact_returns_stored_record() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/contact-person",
            contact_body("Thomas", "2", "2-2"),
            Some(&app.member_session),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["phone"], "9847012345");
    assert_eq!(res.body["foraneName"], "Cherpunkal");
    assert_eq!(res.body["parishName"], "Kidangoor");
    assert_eq!(res.body["dob"], "1988-12-24");
    assert!(res.body["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn parish_must_belong_to_forane() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/contact-person",
            contact_body("Thomas", "1", "2-2"),
            Some(&app.member_session),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let listed = app
        .get("/api/contact-person", Some(&app.member_session))
        .await;
    assert_eq!(listed.body["total"], 0);
}

#[tokio::test]
async fn short_name_fails_validation() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/contact-person",
            contact_body("T", "2", "2-2"),
            Some(&app.member_session),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["fields"]["name"].is_array());
}

#[tokio::test]
async fn list_filters_by_forane_and_parish() {
    let app = TestApp::spawn().await;
    seed_contacts(&app, 2, ("2", "Cherpunkal"), ("2-1", "Cherpunkal")).await;
    seed_contacts(&app, 3, ("2", "Cherpunkal"), ("2-2", "Kidangoor")).await;
    seed_contacts(&app, 1, ("1", "Pala Cathedral"), ("1-1", "Pala Cathedral")).await;

    let all = app
        .get("/api/contact-person", Some(&app.member_session))
        .await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["total"], 6);

    let forane = app
        .get("/api/contact-person?forane=2", Some(&app.member_session))
        .await;
    assert_eq!(forane.body["total"], 5);

    let parish = app
        .get(
            "/api/contact-person?forane=2&parish=2-2",
            Some(&app.member_session),
        )
        .await;
    assert_eq!(parish.body["total"], 3);
    assert_eq!(parish.body["documents"][0]["parishName"], "Kidangoor");

    let blank = app
        .get("/api/contact-person?forane=&parish=", Some(&app.member_session))
        .await;
    assert_eq!(blank.body["total"], 6);
}

#[tokio::test]
async fn short_query_returns_nothing_without_touching_store() {
    let app = TestApp::spawn().await;
    seed_contacts(&app, 2, ("2", "Cherpunkal"), ("2-1", "Cherpunkal")).await;

    let res = app
        .get("/api/contact-person/search?q=c", Some(&app.member_session))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["total"], 0);
    assert_eq!(app.contacts.search_calls(), 0);
}

#[tokio::test]
async fn search_matches_scope_and_caps_results() {
    let app = TestApp::spawn().await;
    seed_contacts(&app, 60, ("2", "Cherpunkal"), ("2-2", "Kidangoor")).await;
    seed_contacts(&app, 2, ("3", "Bharananganam"), ("3-2", "Edamattom")).await;

    let capped = app
        .get("/api/contact-person/search?q=kidan", Some(&app.member_session))
        .await;
    assert_eq!(capped.status, StatusCode::OK);
    assert_eq!(capped.body["total"], 50);

    let by_forane = app
        .get(
            "/api/contact-person/search?q=bharan&type=forane",
            Some(&app.member_session),
        )
        .await;
    assert_eq!(by_forane.body["total"], 2);

    let wrong_scope = app
        .get(
            "/api/contact-person/search?q=bharan&type=parish",
            Some(&app.member_session),
        )
        .await;
    assert_eq!(wrong_scope.body["total"], 0);

    let unknown_type = app
        .get(
            "/api/contact-person/search?q=edamat&type=name",
            Some(&app.member_session),
        )
        .await;
    assert_eq!(unknown_type.status, StatusCode::OK);
    assert_eq!(unknown_type.body["total"], 2);
}
