//! Test harness that drives the full router against in-memory stores.
//!
//! Requests go through the real middleware stack (JWT, CORS, tracing) via
//! `tower::ServiceExt::oneshot`, so no socket or database is needed.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use verification_core::domains::auth::JwtService;
use verification_core::kernel::test_dependencies::MockSmsNotifier;
use verification_core::kernel::TestDependencies;
use verification_core::server::{build_app, AppOptions};

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const TEST_JWT_ISSUER: &str = "test_issuer";

pub struct TestHarness {
    pub app: Router,
    pub deps: TestDependencies,
    pub jwt_service: Arc<JwtService>,
}

impl TestHarness {
    /// Harness with no SMS gateway, so codes come back in responses
    pub fn new() -> Self {
        Self::with_deps(TestDependencies::new())
    }

    /// Harness whose codes are delivered through a recording notifier
    pub fn with_sms(notifier: MockSmsNotifier) -> Self {
        Self::with_deps(TestDependencies::new().mock_sms(notifier))
    }

    pub fn with_deps(deps: TestDependencies) -> Self {
        Self::with_options(
            deps,
            AppOptions {
                allowed_origins: vec![],
                rate_limit: false,
            },
        )
    }

    pub fn with_options(deps: TestDependencies, options: AppOptions) -> Self {
        // Respects RUST_LOG; ignore the error when another test already installed it
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let jwt_service = Arc::new(JwtService::new(
            TEST_JWT_SECRET,
            TEST_JWT_ISSUER.to_string(),
        ));

        let app = build_app(
            Arc::new(deps.clone().into_server_deps()),
            jwt_service.clone(),
            options,
        );

        Self {
            app,
            deps,
            jwt_service,
        }
    }

    /// Bearer token for an owner
    pub fn token_for(&self, owner_id: Uuid) -> String {
        self.jwt_service
            .create_token(owner_id, chrono::Duration::hours(1))
            .expect("Failed to create test token")
    }

    /// Send a request and return the status plus the parsed JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        (status, json)
    }

    /// Send a raw request and return only the status
    pub async fn status_of(&self, request: Request<Body>) -> StatusCode {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
            .status()
    }

    pub async fn send_otp(&self, token: Option<&str>, phone: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/phone/send-otp",
            token,
            Some(serde_json::json!({ "phone": phone })),
        )
        .await
    }

    pub async fn verify_otp(&self, token: Option<&str>, code: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/phone/verify-otp",
            token,
            Some(serde_json::json!({ "code": code })),
        )
        .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A six-digit code guaranteed to differ from `code`
pub fn wrong_code(code: &str) -> String {
    if code == "111111" {
        "222222".to_string()
    } else {
        "111111".to_string()
    }
}
