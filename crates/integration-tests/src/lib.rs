//! Integration test harness for Wardrobe.
//!
//! [`TestApp`] builds the full storefront router in-process on top of the
//! in-memory store, with cheap password hashing, rate limiting off, a temporary
//! upload directory and a recording payment gateway. Tests drive it with
//! `tower::ServiceExt::oneshot`, so no server or database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wardrobe-integration-tests
//!
//! # Include the PostgreSQL-backed tests
//! STOREFRONT_TEST_DATABASE_URL=postgres://... cargo test -p wardrobe-integration-tests -- --ignored
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use wardrobe_storefront::config::StorefrontConfig;
use wardrobe_storefront::db::{MemoryStore, Stores};
use wardrobe_storefront::routes;
use wardrobe_storefront::services::payments::{
    CheckoutSession, PaymentError, PaymentGateway, SessionRequest,
};
use wardrobe_storefront::state::AppState;

/// Token secret used by every test app.
pub const TEST_TOKEN_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Public base URL the test app builds image URLs from.
pub const TEST_BASE_URL: &str = "http://localhost:4000";

/// Payment gateway that records requests and hands out `cs_test_{n}` ids.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<SessionRequest>>,
    failure: Mutex<Option<(u16, String)>>,
}

impl RecordingGateway {
    /// Requests received so far.
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().expect("gateway lock poisoned").clone()
    }

    /// Make every later call fail with a provider error.
    pub fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().expect("gateway lock poisoned") = Some((status, message.to_owned()));
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut requests = self.requests.lock().expect("gateway lock poisoned");
        requests.push(request.clone());

        if let Some((status, message)) = self.failure.lock().expect("gateway lock poisoned").clone()
        {
            return Err(PaymentError::Provider { status, message });
        }

        Ok(CheckoutSession {
            id: format!("cs_test_{}", requests.len()),
            url: Some(format!("https://checkout.example/{}", requests.len())),
        })
    }
}

/// A response decoded for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.bytes)
            )
        })
    }
}

/// The storefront wired up for in-process tests.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
    pub uploads: TempDir,
}

fn test_config(uploads: &TempDir) -> StorefrontConfig {
    let vars: HashMap<String, String> = [
        ("STOREFRONT_STORE", "memory"),
        ("STOREFRONT_TOKEN_SECRET", TEST_TOKEN_SECRET),
        ("STOREFRONT_BASE_URL", TEST_BASE_URL),
        ("STOREFRONT_RATE_LIMIT", "false"),
        ("STOREFRONT_ARGON2_MEMORY_KIB", "64"),
        ("STOREFRONT_ARGON2_ITERATIONS", "1"),
        ("STOREFRONT_ARGON2_PARALLELISM", "1"),
        (
            "STOREFRONT_UPLOAD_DIR",
            uploads.path().to_str().expect("temp dir path is UTF-8"),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();

    StorefrontConfig::from_vars(&vars).expect("test configuration is valid")
}

impl TestApp {
    /// App with the recording payment gateway.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// App with no payment provider configured.
    pub fn without_payments() -> Self {
        Self::build(false)
    }

    fn build(payments: bool) -> Self {
        let uploads = tempfile::tempdir().expect("Failed to create upload dir");
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(RecordingGateway::default());

        let state = AppState::with_gateway(
            test_config(&uploads),
            Stores::from_memory(store.clone()),
            payments.then(|| gateway.clone() as Arc<dyn PaymentGateway>),
        )
        .expect("Failed to build application state");

        Self {
            router: routes::app(state),
            store,
            gateway,
            uploads,
        }
    }

    /// Send a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body")
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }

    /// `POST uri` with a JSON body and an optional `auth-token`.
    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header("auth-token", token);
        }
        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    /// `POST /upload` with one multipart file field.
    pub async fn upload(&self, field: &str, file_name: &str, bytes: &[u8]) -> TestResponse {
        const BOUNDARY: &str = "wardrobe-test-boundary";

        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .expect("valid request"),
        )
        .await
    }

    /// Create an account and return its token.
    pub async fn signup(&self, name: &str, email: &str, phone: &str) -> String {
        let response = self
            .post_json(
                "/signup",
                None,
                &json!({
                    "name": name,
                    "email": email,
                    "phone": phone,
                    "password": "correct horse battery",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
        response.json()["token"]
            .as_str()
            .expect("signup returns a token")
            .to_owned()
    }

    /// Add a product and return its id.
    pub async fn add_product(&self, name: &str, category: &str) -> i64 {
        let response = self
            .post_json(
                "/addproduct",
                None,
                &json!({
                    "name": name,
                    "image": format!("{TEST_BASE_URL}/images/{name}.png"),
                    "category": category,
                    "new_price": 50.0,
                    "old_price": 80.5,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
        response.json()["id"].as_i64().expect("addproduct returns an id")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
