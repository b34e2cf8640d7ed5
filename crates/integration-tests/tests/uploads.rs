//! Image upload and serving.

use axum::http::StatusCode;

use wardrobe_integration_tests::{TEST_BASE_URL, TestApp};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

#[tokio::test]
async fn uploaded_image_is_served_back() {
    let app = TestApp::new();

    let response = app.upload("product", "blouse.png", PNG_BYTES).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], 1);
    let url = body["image_url"].as_str().expect("image_url");
    let path = url
        .strip_prefix(TEST_BASE_URL)
        .expect("url uses the public base");
    assert!(path.starts_with("/images/product_"));

    let image = app.get(path).await;
    assert_eq!(image.status, StatusCode::OK);
    assert_eq!(image.bytes, PNG_BYTES);
}

#[tokio::test]
async fn wrong_field_is_rejected() {
    let app = TestApp::new();

    let response = app.upload("avatar", "blouse.png", PNG_BYTES).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], 0);
}

#[tokio::test]
async fn non_image_is_rejected() {
    let app = TestApp::new();

    let response = app.upload("product", "notes.txt", b"hello").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], 0);
    assert_eq!(
        std::fs::read_dir(app.uploads.path())
            .map(Iterator::count)
            .unwrap_or(0),
        0
    );
}

#[tokio::test]
async fn unknown_image_is_not_found() {
    let app = TestApp::new();
    assert_eq!(
        app.get("/images/missing.png").await.status,
        StatusCode::NOT_FOUND
    );
}
