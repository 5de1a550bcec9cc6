// src/services/view_tracker.rs

use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::PriceStore,
    models::pricing::{NewPriceView, PriceType},
};

/// Registra visualizações de preço para analytics, fora do caminho da resposta.
#[derive(Clone)]
pub struct ViewTracker {
    store: Arc<dyn PriceStore>,
}

impl ViewTracker {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Dispara a gravação em background. Falha vira log de aviso, nunca erro para o cliente.
    /// O handle só interessa a quem quer esperar a gravação (testes).
    pub fn record_view(&self, product_id: Uuid, company_id: Uuid, price_type: PriceType) -> JoinHandle<()> {
        let store = self.store.clone();
        let view = NewPriceView { product_id, company_id, price_type };

        tokio::spawn(async move {
            if let Err(e) = store.insert_price_view(&view).await {
                tracing::warn!(
                    product_id = %view.product_id,
                    company_id = %view.company_id,
                    "Falha ao registrar visualização de preço: {:?}",
                    e
                );
            }
        })
    }
}
