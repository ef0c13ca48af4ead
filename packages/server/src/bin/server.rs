//! Phone verification HTTP server
//!
//! Serves the OTP issue/verify routes behind bearer-token authentication.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::{TwilioOptions, TwilioService};
use verification_core::domains::auth::JwtService;
use verification_core::domains::phone_verification::CodeHasher;
use verification_core::kernel::{
    start_scheduler, BaseSmsNotifier, PgChallengeStore, PgProfileStore, ServerDeps, TwilioAdapter,
};
use verification_core::server::{build_app, AppOptions};
use verification_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,verification_core=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting phone verification server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(config.otp_call_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // SMS gateway is optional
    let sms_notifier: Option<Arc<dyn BaseSmsNotifier>> = match &config.twilio {
        Some(twilio) => {
            tracing::info!("Twilio SMS delivery enabled");
            let service = TwilioService::new(TwilioOptions {
                account_sid: twilio.account_sid.clone(),
                auth_token: twilio.auth_token.clone(),
                from_number: twilio.from_number.clone(),
            });
            Some(Arc::new(TwilioAdapter::new(Arc::new(service))))
        }
        None => {
            tracing::warn!("Twilio not configured: OTP codes will be returned in API responses");
            None
        }
    };

    let code_hasher = CodeHasher::with_cost(config.otp_hash_memory_kib, config.otp_hash_iterations)
        .context("Invalid OTP hash cost")?;

    let deps = Arc::new(ServerDeps::new(
        Arc::new(PgChallengeStore::new(pool.clone())),
        Arc::new(PgProfileStore::new(pool)),
        sms_notifier,
        code_hasher,
        config.otp_settings(),
    ));

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = if config.otp_sweep_enabled {
        Some(
            start_scheduler(deps.clone())
                .await
                .context("Failed to start scheduled tasks")?,
        )
    } else {
        None
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let app = build_app(
        deps,
        jwt_service,
        AppOptions {
            allowed_origins: config.allowed_origins.clone(),
            rate_limit: config.rate_limit_enabled,
        },
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
