// src/lib.rs

use axum::{
    routing::{get, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o router completo. O `main` só sobe o listener; os testes chamam direto.
pub fn app(app_state: AppState) -> Router {
    let pricing_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/products/{product_id}/price",
            get(handlers::pricing::get_product_price),
        )
        .route(
            "/products/{product_id}/default-price",
            put(handlers::pricing::set_default_price),
        )
        .route(
            "/products/{product_id}/default-prices",
            get(handlers::pricing::list_default_prices),
        )
        .route(
            "/products/{product_id}/private-prices",
            get(handlers::pricing::list_private_prices).post(handlers::pricing::create_private_price),
        )
        .route(
            "/products/{product_id}/price-audit",
            get(handlers::pricing::list_price_audit),
        )
        .route(
            "/private-prices/{private_price_id}",
            put(handlers::pricing::update_private_price).delete(handlers::pricing::delete_private_price),
        )
        .route("/price-events", get(handlers::price_events::price_events));

    Router::new()
        .nest("/api", pricing_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
