use crate::helpers::TestApp;

#[tokio::test]
async fn is_present() {
    let app = TestApp::spawn().await;

    let res = app.health_check().await.expect("Failed to execute request");

    assert!(res.status().is_success());
}

#[tokio::test]
async fn trailing_slashes_are_optional() {
    let app = TestApp::spawn().await;

    for path in ["api/v1/regions", "api/v1/regions/"] {
        let res = app
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(200, res.status().as_u16(), "GET {} failed", path);
    }
}
