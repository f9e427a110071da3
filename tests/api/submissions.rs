use reqwest::Method;

use serde_json::{json, Value};

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{sample_submission, TestApp, TestOptions};

#[tokio::test]
async fn get_returns_captcha_site_key() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/v1/submit-form/")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    let body: Value = res.json().await.unwrap();
    assert_eq!(json!({"key": "test-site-key"}), body);
}

#[tokio::test]
async fn valid_submission_is_stored_and_emailed() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .submit(&sample_submission(app.seed.victoria.id))
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    let body: Value = res.json().await.unwrap();
    assert_eq!(json!(true), body["email-sent"]);

    let tickets = app.store.tickets().await;
    assert_eq!(1, tickets.len());
    let ticket = &tickets[0];
    assert_eq!(json!(ticket.id), body["id"]);
    assert_eq!("AB123", ticket.ticket_number);
    assert_eq!("Jane", ticket.first_name);
    assert!(ticket.prepared_pdf_id.is_some());
    assert!(ticket.printed_date.is_some());
    assert!(ticket.emailed_date.is_some());
    assert!(ticket.printed_by.is_none());
}

#[tokio::test]
async fn missing_fields_are_rejected_and_nothing_is_stored() {
    let app = TestApp::spawn().await;

    let test_cases = vec![
        ("/disputantName/first", "missing first name"),
        ("/disputantName/last", "missing last name"),
        ("/disputantEmail", "missing email"),
        ("/ticketNumber/prefix", "missing ticket number"),
        ("/ticketDate", "missing ticket date"),
        ("/hearingLocation", "missing hearing location"),
        ("/hearingAttendance", "missing attendance"),
        ("/disputeType", "missing dispute type"),
    ];

    for (pointer, desc) in test_cases {
        let mut payload = sample_submission(app.seed.victoria.id);
        *payload.pointer_mut(pointer).unwrap() = Value::Null;
        if pointer == "/ticketNumber/prefix" {
            payload["ticketNumber"]["suffix"] = Value::Null;
        }

        let res = app.submit(&payload).await.expect("Failed to execute request");

        assert_eq!(
            400,
            res.status().as_u16(),
            "The API did not fail with 400 when the payload was {}",
            desc
        );
    }

    assert!(app.store.tickets().await.is_empty());
}

#[tokio::test]
async fn malformed_email_and_unknown_location_are_rejected() {
    let app = TestApp::spawn().await;

    let mut bad_email = sample_submission(app.seed.victoria.id);
    bad_email["disputantEmail"] = json!("not-an-email");
    let unknown_location = sample_submission(9999);

    for (payload, desc) in [(bad_email, "a malformed email"), (unknown_location, "an unknown location")] {
        let res = app.submit(&payload).await.expect("Failed to execute request");

        assert_eq!(400, res.status().as_u16(), "Accepted {}", desc);
    }

    assert!(app.store.tickets().await.is_empty());
}

#[tokio::test]
async fn failed_captcha_is_forbidden_and_nothing_is_stored() {
    let app = TestApp::spawn_with(TestOptions {
        captcha_enabled: true,
        ..Default::default()
    })
    .await;

    Mock::given(path("/siteverify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error-codes": ["invalid-input-response"]})),
        )
        .expect(1)
        .mount(&app.captcha_server)
        .await;

    let mut with_bad_proof = sample_submission(app.seed.victoria.id);
    with_bad_proof["captchaResponse"] = json!("bad-token");
    let without_proof = sample_submission(app.seed.victoria.id);

    for payload in [with_bad_proof, without_proof] {
        let res = app.submit(&payload).await.expect("Failed to execute request");

        assert_eq!(403, res.status().as_u16());
    }

    assert!(app.store.tickets().await.is_empty());
}

#[tokio::test]
async fn passed_captcha_allows_submission() {
    let app = TestApp::spawn_with(TestOptions {
        captcha_enabled: true,
        ..Default::default()
    })
    .await;
    app.mount_email_ok().await;

    Mock::given(path("/siteverify"))
        .and(body_string_contains("response=good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&app.captcha_server)
        .await;

    let mut payload = sample_submission(app.seed.victoria.id);
    payload["captchaResponse"] = json!("good-token");

    let res = app.submit(&payload).await.expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert_eq!(1, app.store.tickets().await.len());
}

#[tokio::test]
async fn render_failure_still_stores_the_record() {
    let app = TestApp::spawn_with(TestOptions {
        render_fails: true,
        ..Default::default()
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let res = app
        .submit(&sample_submission(app.seed.victoria.id))
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    let body: Value = res.json().await.unwrap();
    assert_eq!(json!(false), body["email-sent"]);

    let tickets = app.store.tickets().await;
    assert_eq!(1, tickets.len());
    assert!(tickets[0].prepared_pdf_id.is_none());
    assert_eq!(0, app.store.pdf_count().await);
}

#[tokio::test]
async fn email_failure_keeps_the_prepared_pdf() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let res = app
        .submit(&sample_submission(app.seed.victoria.id))
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    let body: Value = res.json().await.unwrap();
    assert_eq!(json!(false), body["email-sent"]);

    let ticket = &app.store.tickets().await[0];
    assert!(ticket.prepared_pdf_id.is_some());
    assert!(ticket.emailed_date.is_none());
}
