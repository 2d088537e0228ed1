use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use netguard_gateway::{
    AppState, GatewayConfig, TtlCache, api,
    security::{
        ApiKeyStore, AuthGate, CredentialStore, RateLimiter, RateLimiterConfig,
        credentials::CredentialStoreConfig,
        middleware::{admission_middleware, auth_middleware},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("🚀 Starting NetGuard API Gateway");

    let config = GatewayConfig::load()?;

    // CONFIGURATION: Governance Components
    // Each component owns its state and lock; main only wires lifecycles.
    let rate_limiter = Arc::new(RateLimiter::with_config(RateLimiterConfig {
        limit: config.rate_limit.limit,
        window_seconds: config.rate_limit.window_seconds,
        cleanup_interval_seconds: config.rate_limit.cleanup_interval_seconds,
    }));

    let credentials = Arc::new(CredentialStore::with_config(CredentialStoreConfig {
        session_ttl_seconds: config.auth.session_ttl_hours * 3600,
        bcrypt_cost: config.auth.bcrypt_cost,
        seed_test_user: config.auth.seed_test_user,
    }));

    let api_keys = Arc::new(ApiKeyStore::new(config.auth.api_key_default_ttl_days));

    let gate = Arc::new(AuthGate::new(
        Arc::clone(&credentials),
        Arc::clone(&api_keys),
    ));

    let response_cache: Arc<TtlCache<serde_json::Value>> = Arc::new(TtlCache::new(
        Duration::from_secs(config.cache.sweep_interval_seconds),
    ));

    // Start background sweeps and seed data
    rate_limiter.start().await;
    response_cache.start().await;
    if let Err(err) = credentials.start().await {
        tracing::error!("❌ Failed to start credential store: {}", err);
        return Err(anyhow::anyhow!("credential store startup failed"));
    }

    let state = AppState {
        config: config.clone(),
        rate_limiter: Arc::clone(&rate_limiter),
        credentials,
        api_keys,
        gate,
        response_cache: Arc::clone(&response_cache),
    };

    // Public authentication routes
    let auth_routes = Router::new()
        .route("/login", post(api::auth::login))
        .route("/register", post(api::auth::register))
        .route("/refresh", post(api::auth::refresh))
        .route("/logout", post(api::auth::logout));

    // Protected routes: identity is resolved before any handler runs
    let protected_routes = Router::new()
        .route("/me", get(api::auth::me))
        .route("/ratelimit", get(api::ratelimit::rate_limit_status))
        .route(
            "/api-keys",
            get(api::api_keys::list_api_keys).post(api::api_keys::create_api_key),
        )
        .route(
            "/api-keys/:id",
            put(api::api_keys::update_api_key).delete(api::api_keys::revoke_api_key),
        )
        .route("/cache/stats", get(api::cache_admin::cache_stats))
        .route("/cache/clear", post(api::cache_admin::clear_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admission (rate limiting) wraps everything, health probes included
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("🌐 Gateway starting on http://{}", addr);
    tracing::info!("📡 Available endpoints:");
    tracing::info!("  • GET  /health - Health check");
    tracing::info!("  • POST /api/v1/auth/login - Session issuance");
    tracing::info!("  • POST /api/v1/auth/register - Account registration");
    tracing::info!("  • GET  /api/v1/me - Authenticated profile");
    tracing::info!("  • GET  /api/v1/api-keys - API key management");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    tracing::info!("✅ Gateway ready and accepting requests");

    // RELIABILITY: Graceful Shutdown Handling
    // Ensures in-flight requests complete before termination
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("❌ Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("🛑 Shutdown signal received");
        }
    }

    // CLEANUP: stop background sweeps before exit
    rate_limiter.stop().await;
    response_cache.stop().await;
    tracing::info!("👋 Gateway shutdown complete");
    Ok(())
}

// RELIABILITY: Multi-Platform Shutdown Signal Handling
// Handles both interactive (Ctrl+C) and system (SIGTERM) shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
