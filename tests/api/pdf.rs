use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Method;

use serde_json::json;

use ticket_response::settings::PrintMarker;

use crate::helpers::{set_cookie, TestApp, TestOptions};

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("Response is not a PDF")
        .get_pages()
        .len()
}

#[tokio::test]
async fn prepared_pdf_is_served_inline() {
    let app = TestApp::spawn().await;
    app.mount_email_ok().await;

    let id = app.submit_sample("Doe", app.seed.victoria.id).await;
    let pdf_id = app.pdf_id(id).await;

    let res = app
        .request(Method::GET, &format!("api/v1/pdf/{}", pdf_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert_eq!(
        Some("application/pdf"),
        res.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    );

    let disposition = res
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("inline"));
    assert!(disposition.contains("ticketResponse.pdf"));

    let bytes = res.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(page_count(&bytes) >= 1);
}

#[tokio::test]
async fn fetch_rejects_unknown_and_malformed_ids() {
    let app = TestApp::spawn().await;

    let test_cases = vec![("api/v1/pdf/9999", 404), ("api/v1/pdf/abc", 400)];

    for (path, status) in test_cases {
        let res = app
            .request(Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(status, res.status().as_u16(), "Unexpected status for {}", path);
    }
}

#[tokio::test]
async fn merge_keeps_requested_order_and_duplicates() {
    let app = TestApp::spawn().await;
    app.mount_email_ok().await;

    let doe = app.submit_sample("Doe", app.seed.victoria.id).await;
    let roe = app.submit_sample("Roe", app.seed.victoria.id).await;
    let (doe_pdf, roe_pdf) = (app.pdf_id(doe).await, app.pdf_id(roe).await);

    let single = app
        .request(Method::GET, &format!("api/v1/pdf/{}", doe_pdf))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let pages_per_pdf = page_count(&single);

    let res = app
        .request(Method::POST, "api/v1/pdf/")
        .json(&json!({ "id": [roe_pdf, doe_pdf, roe_pdf] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert_eq!(
        Some("application/octet-stream"),
        res.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    );
    let merged = res.bytes().await.unwrap();
    assert_eq!(3 * pages_per_pdf, page_count(&merged));
}

#[tokio::test]
async fn merge_skips_unknown_ids() {
    let app = TestApp::spawn().await;
    app.mount_email_ok().await;

    let doe = app.submit_sample("Doe", app.seed.victoria.id).await;
    let pdf_id = app.pdf_id(doe).await;

    let res = app
        .request(Method::POST, "api/v1/pdf/")
        .json(&json!({ "id": [9999, pdf_id] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert!(page_count(&res.bytes().await.unwrap()) >= 1);
}

#[tokio::test]
async fn merge_without_any_pdf_fails() {
    let app = TestApp::spawn().await;

    let test_cases = vec![
        (json!({ "id": [] }), 400, "an empty id list"),
        (json!({ "id": [9999] }), 404, "only unknown ids"),
        (json!({}), 400, "no id list"),
    ];

    for (body, status, desc) in test_cases {
        let res = app
            .request(Method::POST, "api/v1/pdf/")
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(status, res.status().as_u16(), "Unexpected status for {}", desc);
    }
}

#[tokio::test]
async fn mark_printed_moves_exactly_the_listed_submissions() {
    let app = TestApp::spawn().await;
    app.mount_email_ok().await;

    let doe = app.submit_sample("Doe", app.seed.victoria.id).await;
    let roe = app.submit_sample("Roe", app.seed.victoria.id).await;

    let res = app
        .mark_printed(&[app.pdf_id(doe).await, 9999])
        .await
        .expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert_eq!(json!("success"), res.json::<serde_json::Value>().await.unwrap());

    let tickets = app.store.tickets().await;
    let printed = tickets.iter().find(|t| t.id == doe).unwrap();
    let untouched = tickets.iter().find(|t| t.id == roe).unwrap();

    assert_eq!(Some(app.seed.staff.id), printed.printed_by);
    assert!(printed.archived_date.is_some());
    assert_eq!(None, untouched.printed_by);
    assert_eq!(None, untouched.archived_date);
}

#[tokio::test]
async fn mark_printed_with_no_ids_is_a_no_op() {
    let app = TestApp::spawn().await;
    app.mount_email_ok().await;
    app.submit_sample("Doe", app.seed.victoria.id).await;

    let res = app.mark_printed(&[]).await.expect("Failed to execute request");

    assert_eq!(200, res.status().as_u16());
    assert!(app.store.tickets().await.iter().all(|t| t.printed_by.is_none()));
}

#[tokio::test]
async fn acting_user_policy_requires_a_login() {
    let app = TestApp::spawn_with(TestOptions {
        print_marker: PrintMarker::ActingUser,
        ..Default::default()
    })
    .await;
    app.mount_email_ok().await;

    let doe = app.submit_sample("Doe", app.seed.victoria.id).await;
    let pdf_id = app.pdf_id(doe).await;

    let res = app
        .mark_printed(&[pdf_id])
        .await
        .expect("Failed to execute request");
    assert_eq!(401, res.status().as_u16());
    assert_eq!(None, app.store.tickets().await[0].printed_by);

    let res = app
        .request(Method::POST, "api/v1/printed/")
        .header("X-Demo-Login", "demo-clerk")
        .json(&json!({ "id": [pdf_id] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, res.status().as_u16());
    assert!(set_cookie(&res, "x-demo-login").is_some());

    let printed_by = app.store.tickets().await[0].printed_by;
    assert!(printed_by.is_some());
    assert_ne!(Some(app.seed.staff.id), printed_by);
}
