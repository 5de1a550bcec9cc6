// src/services/price_lookup.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogDirectory, PriceStore},
    models::{auth::Caller, pricing::ResolvedPrice},
    services::{price_resolver, view_tracker::ViewTracker},
};

// O lado de leitura do "quanto eu pago": busca as linhas ativas,
// resolve e registra a visualização (só para empresas).
#[derive(Clone)]
pub struct PriceLookupService {
    store: Arc<dyn PriceStore>,
    directory: Arc<dyn CatalogDirectory>,
    view_tracker: ViewTracker,
    default_currency: String,
}

impl PriceLookupService {
    pub fn new(
        store: Arc<dyn PriceStore>,
        directory: Arc<dyn CatalogDirectory>,
        default_currency: String,
    ) -> Self {
        Self {
            view_tracker: ViewTracker::new(store.clone()),
            store,
            directory,
            default_currency,
        }
    }

    pub async fn get_price(&self, product_id: Uuid, caller: &Caller) -> Result<ResolvedPrice, AppError> {
        if self.directory.find_product(product_id).await?.is_none() {
            return Err(AppError::ProductNotFound);
        }

        let viewer = caller.company_scope();
        let defaults = self.store.active_default_prices(product_id).await?;
        let privates = match viewer {
            Some(company_id) => self.store.active_private_prices(product_id, company_id).await?,
            None => Vec::new(),
        };

        let resolved = price_resolver::resolve(&defaults, &privates, viewer, Utc::now(), &self.default_currency)
            .ok_or(AppError::PriceNotAvailable)?;

        if let Some(company_id) = viewer {
            // Fire-and-forget: o handle é descartado de propósito.
            let _ = self.view_tracker.record_view(product_id, company_id, resolved.price_type);
        }

        Ok(resolved)
    }
}
