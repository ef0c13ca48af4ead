//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::auth::JwtService;
use crate::kernel::ServerDeps;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    health_handler, phone_status_handler, send_otp_handler, verify_otp_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    pub jwt_service: Arc<JwtService>,
}

/// HTTP-level knobs
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Empty allows any origin
    pub allowed_origins: Vec<String>,
    /// Per-client limit on the OTP routes. Requests without a forwarding
    /// header are keyed by `ConnectInfo`, which only a real socket provides.
    pub rate_limit: bool,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(
    deps: Arc<ServerDeps>,
    jwt_service: Arc<JwtService>,
    options: AppOptions,
) -> Router {
    let app_state = AppState {
        deps,
        jwt_service: jwt_service.clone(),
    };

    let mut otp_routes = Router::new()
        .route("/api/phone/send-otp", post(send_otp_handler))
        .route("/api/phone/verify-otp", post(verify_otp_handler));

    if options.rate_limit {
        // One request replenished every 2 seconds per client, bursts up to 5.
        // Client is X-Forwarded-For / X-Real-IP / Forwarded, else the socket peer.
        let rate_limit_config = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(2)
                .burst_size(5)
                .key_extractor(SmartIpKeyExtractor)
                .use_headers() // x-ratelimit-* response headers
                .finish()
                .expect("Rate limiter configuration is valid and should never fail"),
        );
        otp_routes = otp_routes.layer(GovernorLayer {
            config: rate_limit_config,
        });
    }

    Router::new()
        .merge(otp_routes)
        .route("/api/phone/status", get(phone_status_handler))
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
