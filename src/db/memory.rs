// src/db/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{catalog_repo::CatalogDirectory, price_repo::{PriceStore, PriceTransaction}},
    models::{
        pricing::{
            DefaultPrice, NewDefaultPrice, NewPriceAudit, NewPriceView, NewPrivatePrice,
            PriceAuditLog, PriceView, PrivatePrice,
        },
        tenancy::{Product, Tenant},
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tenants: HashMap<Uuid, Tenant>,
    products: HashMap<Uuid, Product>,
    default_prices: Vec<DefaultPrice>,
    private_prices: Vec<PrivatePrice>,
    audit_logs: Vec<PriceAuditLog>,
    price_views: Vec<PriceView>,
}

/// Store em memória com as mesmas invariantes do schema Postgres.
///
/// Transações são serializadas pelo mutex: a transação segura o lock, trabalha
/// numa cópia do estado e só a publica no `commit`. Drop sem commit descarta a cópia.
#[derive(Clone, Default)]
pub struct InMemoryPriceStore {
    state: Arc<Mutex<MemoryState>>,
    fail_audit_writes: Arc<AtomicBool>,
    fail_view_writes: Arc<AtomicBool>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_tenant(&self, tenant: Tenant) {
        self.state.lock().await.tenants.insert(tenant.id, tenant);
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Faz toda escrita de auditoria falhar (simula falha no meio da transação).
    pub fn set_fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    /// Faz o registro de visualizações falhar (simula tabela indisponível).
    pub fn set_fail_view_writes(&self, fail: bool) {
        self.fail_view_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn price_views(&self) -> Vec<PriceView> {
        self.state.lock().await.price_views.clone()
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl CatalogDirectory for InMemoryPriceStore {
    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(self.state.lock().await.tenants.get(&tenant_id).cloned())
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(InMemoryPriceTransaction {
            guard,
            staged,
            fail_audit_writes: self.fail_audit_writes.load(Ordering::SeqCst),
        }))
    }

    async fn active_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError> {
        let state = self.state.lock().await;
        let rows: Vec<DefaultPrice> = state
            .default_prices
            .iter()
            .filter(|p| p.product_id == product_id && p.is_active)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &DefaultPrice| p.effective_from))
    }

    async fn active_private_prices(
        &self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PrivatePrice>, AppError> {
        let state = self.state.lock().await;
        let rows: Vec<PrivatePrice> = state
            .private_prices
            .iter()
            .filter(|p| p.product_id == product_id && p.company_id == company_id && p.is_active)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &PrivatePrice| p.effective_from))
    }

    async fn find_private_price(&self, id: Uuid) -> Result<Option<PrivatePrice>, AppError> {
        let state = self.state.lock().await;
        Ok(state.private_prices.iter().find(|p| p.id == id).cloned())
    }

    async fn list_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError> {
        let state = self.state.lock().await;
        let rows: Vec<DefaultPrice> = state
            .default_prices
            .iter()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &DefaultPrice| p.created_at))
    }

    async fn list_private_prices(&self, product_id: Uuid) -> Result<Vec<PrivatePrice>, AppError> {
        let state = self.state.lock().await;
        let rows: Vec<PrivatePrice> = state
            .private_prices
            .iter()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &PrivatePrice| p.created_at))
    }

    async fn list_audit_logs(&self, product_id: Uuid) -> Result<Vec<PriceAuditLog>, AppError> {
        let state = self.state.lock().await;
        // Vec em ordem de inserção: inverter mantém a ordem mesmo com timestamps iguais.
        Ok(state
            .audit_logs
            .iter()
            .rev()
            .filter(|log| log.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn insert_price_view(&self, view: &NewPriceView) -> Result<PriceView, AppError> {
        if self.fail_view_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "relation \"price_views\" does not exist"
            )));
        }

        let row = PriceView {
            id: Uuid::new_v4(),
            product_id: view.product_id,
            company_id: view.company_id,
            price_type: view.price_type,
            viewed_at: Utc::now(),
        };
        self.state.lock().await.price_views.push(row.clone());
        Ok(row)
    }
}

pub struct InMemoryPriceTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_audit_writes: bool,
}

impl InMemoryPriceTransaction {
    fn ensure_no_active_default(&self, product_id: Uuid) -> Result<(), AppError> {
        if self
            .staged
            .default_prices
            .iter()
            .any(|p| p.product_id == product_id && p.is_active)
        {
            return Err(AppError::InvariantViolation(
                "default_prices_one_active_per_product".into(),
            ));
        }
        Ok(())
    }

    fn ensure_no_active_private(
        &self,
        product_id: Uuid,
        company_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<(), AppError> {
        if self.staged.private_prices.iter().any(|p| {
            p.product_id == product_id
                && p.company_id == company_id
                && p.is_active
                && Some(p.id) != except
        }) {
            return Err(AppError::InvariantViolation(
                "private_prices_one_active_per_scope".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceTransaction for InMemoryPriceTransaction {
    async fn lock_default_scope(&mut self, product_id: Uuid) -> Result<Option<DefaultPrice>, AppError> {
        // O mutex inteiro já está travado; basta ler.
        Ok(self
            .staged
            .default_prices
            .iter()
            .filter(|p| p.product_id == product_id && p.is_active)
            .max_by_key(|p| p.effective_from)
            .cloned())
    }

    async fn deactivate_default_price(&mut self, id: Uuid) -> Result<(), AppError> {
        if let Some(row) = self.staged.default_prices.iter_mut().find(|p| p.id == id) {
            row.is_active = false;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_default_price(&mut self, new: &NewDefaultPrice) -> Result<DefaultPrice, AppError> {
        self.ensure_no_active_default(new.product_id)?;

        let now = Utc::now();
        let row = DefaultPrice {
            id: Uuid::new_v4(),
            product_id: new.product_id,
            price: new.price,
            currency: new.currency.clone(),
            effective_from: new.effective_from,
            effective_until: new.effective_until,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.default_prices.push(row.clone());
        Ok(row)
    }

    async fn lock_private_scope(
        &mut self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<PrivatePrice>, AppError> {
        Ok(self
            .staged
            .private_prices
            .iter()
            .filter(|p| p.product_id == product_id && p.company_id == company_id && p.is_active)
            .max_by_key(|p| p.effective_from)
            .cloned())
    }

    async fn find_private_price_for_update(&mut self, id: Uuid) -> Result<Option<PrivatePrice>, AppError> {
        Ok(self.staged.private_prices.iter().find(|p| p.id == id).cloned())
    }

    async fn deactivate_private_price(&mut self, id: Uuid) -> Result<(), AppError> {
        if let Some(row) = self.staged.private_prices.iter_mut().find(|p| p.id == id) {
            row.is_active = false;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_private_price(&mut self, new: &NewPrivatePrice) -> Result<PrivatePrice, AppError> {
        self.ensure_no_active_private(new.product_id, new.company_id, None)?;

        let now = Utc::now();
        let row = PrivatePrice {
            id: Uuid::new_v4(),
            product_id: new.product_id,
            company_id: new.company_id,
            mode: new.mode,
            currency: new.currency.clone(),
            effective_from: new.effective_from,
            effective_until: new.effective_until,
            notes: new.notes.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.private_prices.push(row.clone());
        Ok(row)
    }

    async fn update_private_price(&mut self, price: &PrivatePrice) -> Result<PrivatePrice, AppError> {
        if price.is_active {
            self.ensure_no_active_private(price.product_id, price.company_id, Some(price.id))?;
        }

        let row = self
            .staged
            .private_prices
            .iter_mut()
            .find(|p| p.id == price.id)
            .ok_or(AppError::PrivatePriceNotFound)?;

        *row = PrivatePrice {
            updated_at: Utc::now(),
            ..price.clone()
        };
        Ok(row.clone())
    }

    async fn insert_audit_log(&mut self, entry: &NewPriceAudit) -> Result<PriceAuditLog, AppError> {
        if self.fail_audit_writes {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "audit log write failed"
            )));
        }

        let row = PriceAuditLog {
            id: Uuid::new_v4(),
            product_id: entry.product_id,
            price_type: entry.price_type,
            company_id: entry.company_id,
            old_price: entry.old_price,
            new_price: entry.new_price,
            changed_by: entry.changed_by,
            change_reason: entry.change_reason.clone(),
            changed_at: Utc::now(),
            ip_address: entry.ip_address.clone(),
            user_agent: entry.user_agent.clone(),
        };
        self.staged.audit_logs.push(row.clone());
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let InMemoryPriceTransaction { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_default(product_id: Uuid, cents: i64) -> NewDefaultPrice {
        NewDefaultPrice {
            product_id,
            price: Decimal::new(cents, 2),
            currency: "USD".into(),
            effective_from: Utc::now(),
            effective_until: None,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = InMemoryPriceStore::new();
        let product_id = Uuid::new_v4();

        {
            let mut tx = store.begin().await.expect("begin");
            tx.insert_default_price(&new_default(product_id, 1000)).await.expect("insert");
            // sem commit
        }

        assert!(store.list_default_prices(product_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_active_default_is_rejected() {
        let store = InMemoryPriceStore::new();
        let product_id = Uuid::new_v4();

        let mut tx = store.begin().await.expect("begin");
        tx.insert_default_price(&new_default(product_id, 1000)).await.expect("first insert");
        let err = tx
            .insert_default_price(&new_default(product_id, 2000))
            .await
            .expect_err("second active row");

        assert!(matches!(err, AppError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn committed_rows_become_visible() {
        let store = InMemoryPriceStore::new();
        let product_id = Uuid::new_v4();

        let mut tx = store.begin().await.expect("begin");
        tx.insert_default_price(&new_default(product_id, 1000)).await.expect("insert");
        tx.commit().await.expect("commit");

        let active = store.active_default_prices(product_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].price, Decimal::new(1000, 2));
    }
}
