// src/services/audit_trail.rs

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PriceStore, PriceTransaction},
    models::{
        pricing::{
            AuditContext, DefaultPrice, NewPriceAudit, PriceAuditLog, PriceType, PricingMode,
        },
        tenancy::Product,
    },
};

// Histórico append-only das mudanças de preço. A escrita acontece sempre dentro
// da transação da mudança: se a auditoria falhar, a mudança também não acontece.

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn PriceStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        tx: &mut dyn PriceTransaction,
        entry: NewPriceAudit,
    ) -> Result<PriceAuditLog, AppError> {
        let log = tx.insert_audit_log(&entry).await?;
        tracing::debug!(
            product_id = %log.product_id,
            price_type = ?log.price_type,
            reason = %log.change_reason,
            "Auditoria de preço registrada"
        );
        Ok(log)
    }

    /// Histórico do produto, mais recentes primeiro.
    pub async fn history(&self, product_id: Uuid) -> Result<Vec<PriceAuditLog>, AppError> {
        self.store.list_audit_logs(product_id).await
    }
}

pub fn default_price_entry(
    product: &Product,
    previous: Option<&DefaultPrice>,
    created: &DefaultPrice,
    actor: Uuid,
    ctx: &AuditContext,
) -> NewPriceAudit {
    NewPriceAudit {
        product_id: product.id,
        price_type: PriceType::Default,
        company_id: None,
        old_price: previous.map(|p| p.price),
        new_price: created.price,
        changed_by: actor,
        change_reason: "default price set".into(),
        ip_address: ctx.ip_address.clone(),
        user_agent: ctx.user_agent.clone(),
    }
}

/// `old_price`/`new_price` guardam o valor do modo: preço fixo ou percentual.
pub fn private_price_entry(
    product_id: Uuid,
    company_id: Uuid,
    previous: Option<PricingMode>,
    current: PricingMode,
    actor: Uuid,
    ctx: &AuditContext,
) -> NewPriceAudit {
    let change_reason = match previous {
        Some(previous) if previous != current => format!(
            "private price changed from {} to {}",
            previous.describe(),
            current.describe()
        ),
        _ => format!("private {} set", current.describe()),
    };

    NewPriceAudit {
        product_id,
        price_type: PriceType::Private,
        company_id: Some(company_id),
        old_price: previous.map(|m| m.audit_value()),
        new_price: current.audit_value(),
        changed_by: actor,
        change_reason,
        ip_address: ctx.ip_address.clone(),
        user_agent: ctx.user_agent.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn private_entry_records_discount_percentage_as_value() {
        let ctx = AuditContext { ip_address: Some("10.0.0.1".into()), user_agent: None };
        let entry = private_price_entry(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Some(PricingMode::Fixed { price: Decimal::new(9000, 2) }),
            PricingMode::Discount { discount_percentage: Decimal::new(15, 0) },
            Uuid::new_v4(),
            &ctx,
        );

        assert_eq!(entry.old_price, Some(Decimal::new(9000, 2)));
        assert_eq!(entry.new_price, Decimal::new(15, 0));
        assert_eq!(entry.change_reason, "private price changed from fixed price 90.00 to discount 15%");
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn first_private_entry_has_no_previous_value() {
        let entry = private_price_entry(
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            PricingMode::Fixed { price: Decimal::new(80, 0) },
            Uuid::new_v4(),
            &AuditContext::default(),
        );

        assert_eq!(entry.old_price, None);
        assert_eq!(entry.change_reason, "private fixed price 80 set");
        assert!(entry.company_id.is_some());
    }
}
