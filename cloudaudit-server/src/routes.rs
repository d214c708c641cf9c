use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post, put},
};
use cloudaudit_config::CorsConfig;
use cloudaudit_model::routes::api;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    handlers::{admin, audits, credentials, health},
};

/// Routes under `/api`.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(api::audits::RUN, post(audits::run_audit))
        .route(api::audits::STATUS, get(audits::job_status))
        .route(api::audits::CATEGORIES, get(audits::list_categories))
        .route(api::audits::ITEM, get(audits::get_job))
        .route(api::audits::REPORT, get(audits::job_report))
        .route(
            api::admin::AUDIT_INVENTORY,
            get(admin::inventory_snapshot).post(admin::audit_inventory),
        )
        .route(
            api::credentials::ITEM,
            put(credentials::put_credential)
                .delete(credentials::delete_credential),
        )
}

/// Full application: API routes, health probe, CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .route(api::HEALTH, get(health::health_handler))
        .merge(create_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allow_origin = if config.is_wildcard() || config.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(api::headers::SESSION),
        ])
}
