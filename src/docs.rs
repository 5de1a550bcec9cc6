// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Preço resolvido ---
        handlers::pricing::get_product_price,

        // --- Preço padrão ---
        handlers::pricing::set_default_price,
        handlers::pricing::list_default_prices,

        // --- Preços privados ---
        handlers::pricing::create_private_price,
        handlers::pricing::update_private_price,
        handlers::pricing::delete_private_price,
        handlers::pricing::list_private_prices,

        // --- Auditoria / Eventos ---
        handlers::pricing::list_price_audit,
        handlers::price_events::price_events,
    ),
    components(
        schemas(
            // --- Pricing ---
            models::pricing::PriceType,
            models::pricing::DefaultPrice,
            models::pricing::PricingMode,
            models::pricing::PrivatePrice,
            models::pricing::PriceAuditLog,
            models::pricing::ResolvedPrice,
            models::pricing::PriceResponse,
            models::pricing::PriceChangeEvent,

            // --- Payloads ---
            handlers::pricing::SetDefaultPricePayload,
            handlers::pricing::CreatePrivatePricePayload,
            handlers::pricing::UpdatePrivatePricePayload,

            // --- Respostas ---
            handlers::pricing::DefaultPriceResponse,
            handlers::pricing::PrivatePriceResponse,
            handlers::pricing::DefaultPriceHistoryResponse,
            handlers::pricing::PrivatePriceListResponse,
            handlers::pricing::PriceAuditResponse,
        )
    ),
    tags(
        (name = "Pricing", description = "Preços padrão e privados, auditoria e eventos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pricing_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/products/{product_id}/price",
            "/api/products/{product_id}/default-price",
            "/api/products/{product_id}/private-prices",
            "/api/private-prices/{private_price_id}",
            "/api/price-events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota sem documentação: {path}");
        }
    }
}
