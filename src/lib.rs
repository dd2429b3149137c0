//! Public Forms Server Library
//!
//! Serving and submission pipeline for publicly shared forms. This module
//! exports the core types and the router for the binaries and for testing.

pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod gate;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod throttle;
pub mod validation;

pub use cache::Cache;
pub use config::Config;
pub use db::{FormStore, PgFormStore};
pub use error::{AppError, Result};
pub use services::PublicFormService;
pub use throttle::ThrottleStorage;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::attach_request_path;
use routes::{
    get_public_form, health_check, method_not_allowed, resolve_client, route_not_found,
    submit_response, validate_password,
};
use throttle::{enforce_bucket, BucketGuard};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: PublicFormService,
    pub throttle: ThrottleStorage,
    pub store: Arc<dyn FormStore>,
    pub cache: Cache,
    pub config: Config,
}

impl AppState {
    /// Wire every component from its injected collaborators
    pub fn new(store: Arc<dyn FormStore>, cache: Cache, config: Config) -> Self {
        let service =
            PublicFormService::new(store.clone(), cache.clone(), config.public_form_cache_ttl);
        let throttle = ThrottleStorage::new(cache.clone());

        Self {
            service,
            throttle,
            store,
            cache,
            config,
        }
    }
}

/// Build the HTTP surface
///
/// Every `/f` route consumes the `default` bucket; validate and submit also
/// consume their own bucket. `/health` is never throttled. Unknown paths and
/// methods still answer with the error envelope.
pub fn build_router(state: AppState) -> Router {
    let policy = &state.config.throttle;
    let guard = |bucket| BucketGuard::new(state.throttle.clone(), bucket);

    let public = Router::new()
        .route("/f/:id", get(get_public_form))
        .route(
            "/f/:id/validate-password",
            post(validate_password)
                .route_layer(from_fn_with_state(guard(policy.form_validate), enforce_bucket)),
        )
        .route(
            "/f/:id/submit",
            post(submit_response)
                .route_layer(from_fn_with_state(guard(policy.form_submit), enforce_bucket)),
        )
        .route_layer(from_fn_with_state(guard(policy.default), enforce_bucket));

    Router::new()
        .route("/health", get(health_check))
        .merge(public)
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(from_fn_with_state(state.clone(), resolve_client))
        .layer(from_fn(attach_request_path))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
