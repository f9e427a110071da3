use reqwest::header::COOKIE;
use reqwest::Method;

use serde_json::{json, Value};

use crate::helpers::{set_cookie, TestApp, TestOptions};

#[tokio::test]
async fn anonymous_user_info_is_empty() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert!(set_cookie(&res, "x-demo-login").is_none());

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        json!({
            "accepted_terms_at": null,
            "user_id": null,
            "email": null,
            "first_name": null,
            "last_name": null,
            "login_uri": "https://login.example.com",
            "logout_uri": null,
            "surveys": [],
        }),
        body
    );
}

#[tokio::test]
async fn demo_login_sets_a_cookie_that_identifies_later_requests() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header("X-Demo-Login", "demo-clerk")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    let cookie = set_cookie(&res, "x-demo-login").expect("No demo-login cookie set");

    let body: Value = res.json().await.unwrap();
    assert_eq!(json!("demo-clerk"), body["user_id"]);
    assert_eq!(json!(true), body["demo_user"]);

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header(COOKIE, &cookie)
        .send()
        .await
        .expect("Failed to execute request");

    let body: Value = res.json().await.unwrap();
    assert_eq!(json!("demo-clerk"), body["user_id"]);
}

#[tokio::test]
async fn unknown_cookie_is_removed() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header(COOKIE, "x-demo-login=not-a-token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert_eq!(Some("x-demo-login=".to_string()), set_cookie(&res, "x-demo-login"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(Value::Null, body["user_id"]);
}

#[tokio::test]
async fn demo_login_cannot_take_over_a_regular_account() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header("X-Demo-Login", "staff-idir")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(set_cookie(&res, "x-demo-login").is_none());
    let body: Value = res.json().await.unwrap();
    assert_eq!(Value::Null, body["user_id"]);
}

#[tokio::test]
async fn demo_header_is_ignored_when_disabled() {
    let app = TestApp::spawn_with(TestOptions {
        demo_login: false,
        ..Default::default()
    })
    .await;

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header("X-Demo-Login", "demo-clerk")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(set_cookie(&res, "x-demo-login").is_none());
    let body: Value = res.json().await.unwrap();
    assert_eq!(Value::Null, body["user_id"]);
}

#[tokio::test]
async fn accept_terms_requires_a_user() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::POST, "api/v1/accept-terms/")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, res.status().as_u16());

    let res = app
        .request(Method::POST, "api/v1/accept-terms/")
        .header("X-Demo-Login", "demo-clerk")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, res.status().as_u16());
    assert_eq!(json!({"ok": true}), res.json::<Value>().await.unwrap());

    let res = app
        .request(Method::GET, "api/v1/user-info/")
        .header("X-Demo-Login", "demo-clerk")
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = res.json().await.unwrap();
    assert!(body["accepted_terms_at"].is_string());
}

#[tokio::test]
async fn lookups_list_reference_data() {
    let app = TestApp::spawn().await;

    for method in [Method::GET, Method::POST] {
        let res = app
            .request(method.clone(), "api/v1/regions/")
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(200, res.status().as_u16(), "{} regions", method);
        let regions: Value = res.json().await.unwrap();
        assert_eq!(
            json!([
                {"id": app.seed.island.id, "name": "Island"},
                {"id": app.seed.north.id, "name": "North"},
            ]),
            regions
        );
    }

    let res = app
        .request(Method::GET, "api/v1/locations/")
        .send()
        .await
        .expect("Failed to execute request");
    let locations: Value = res.json().await.unwrap();
    assert_eq!(2, locations.as_array().map_or(0, |l| l.len()));
    assert!(locations
        .as_array()
        .unwrap()
        .iter()
        .any(|l| l["name"] == "Victoria" && l["region"] == json!(app.seed.island.id)));
}
