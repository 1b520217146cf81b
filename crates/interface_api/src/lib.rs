//! HTTP API Layer
//!
//! This crate exposes the billing engine over REST using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for plans, payments, subjects,
//!   attendance, and the reconciliation trigger
//! - **Middleware**: JWT authentication with organization resolution,
//!   audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Adapters**: Deployment defaults for the charge catalog and
//!   notification sink ports
//! - **Cache**: Short-TTL snapshot read cache, invalidated on writes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, config::ApiConfig};
//!
//! let app = create_router(pool, config, catalog);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod cache;
pub mod adapters;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_billing::ChargeCatalog;

use crate::cache::SnapshotCache;
use crate::config::ApiConfig;
use crate::handlers::{attendance, health, payments, plans, reconciliation, subjects};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub cache: SnapshotCache,
    pub catalog: Arc<dyn ChargeCatalog>,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `config` - API configuration
/// * `catalog` - Charge catalog adapter for expected-amount resolution
pub fn create_router(pool: PgPool, config: ApiConfig, catalog: Arc<dyn ChargeCatalog>) -> Router {
    let cache = SnapshotCache::new(Duration::from_secs(config.snapshot_cache_ttl_secs));
    let state = AppState {
        pool,
        config,
        cache,
        catalog,
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Plan routes
    let plan_routes = Router::new()
        .route("/:id", get(plans::get_plan))
        .route("/:id/cancel", post(plans::cancel_plan));

    // Payment routes
    let payment_routes = Router::new()
        .route("/", post(payments::record_payment))
        .route("/receipts/backfill", post(payments::backfill_receipts))
        .route("/:id/receipt", post(payments::issue_receipt))
        .route("/:id/complete", post(payments::complete_payment));

    // Subject routes
    let subject_routes = Router::new()
        .route("/:id", delete(subjects::delete_subject))
        .route("/:id/plans", post(plans::create_plan))
        .route("/:id/snapshot", get(subjects::get_snapshot))
        .route("/:id/usage-charge", get(subjects::get_usage_charge));

    // Attendance routes
    let attendance_routes = Router::new()
        .route("/", post(attendance::check_in))
        .route("/:id/checkout", post(attendance::check_out))
        .route("/:id/corrections", post(attendance::record_correction));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/plans", plan_routes)
        .nest("/payments", payment_routes)
        .nest("/subjects", subject_routes)
        .nest("/attendance", attendance_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // The cron trigger authenticates with the shared secret, not JWT
    let job_routes = Router::new().route("/reconciliation", post(reconciliation::run_reconciliation));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .nest("/api/v1/jobs", job_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
