// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use pricing_engine::{
    config::AppConfig,
    db::InMemoryPriceStore,
    models::{
        pricing::{AuditContext, PriceChangeEvent},
        tenancy::{Product, Tenant, TenantStatus, TenantType},
    },
    services::{ChangeNotifier, PriceLookupService, PriceMutator},
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "segredo-de-teste";

/// Guarda os eventos publicados, na ordem.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PriceChangeEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PriceChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, event: PriceChangeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Fixture {
    pub store: InMemoryPriceStore,
    pub supplier: Tenant,
    pub other_supplier: Tenant,
    pub company_a: Tenant,
    pub company_b: Tenant,
    pub pending_company: Tenant,
    pub product: Product,
    pub foreign_product: Product,
}

fn tenant(name: &str, tenant_type: TenantType, status: TenantStatus) -> Tenant {
    Tenant { id: Uuid::new_v4(), name: name.into(), tenant_type, status }
}

impl Fixture {
    pub async fn new() -> Self {
        let store = InMemoryPriceStore::new();

        let supplier = tenant("Metalúrgica Sul", TenantType::Supplier, TenantStatus::Active);
        let other_supplier = tenant("Ferragens Norte", TenantType::Supplier, TenantStatus::Active);
        let company_a = tenant("Construtora A", TenantType::Company, TenantStatus::Active);
        let company_b = tenant("Construtora B", TenantType::Company, TenantStatus::Active);
        let pending_company = tenant("Construtora C", TenantType::Company, TenantStatus::Pending);

        let product = Product { id: Uuid::new_v4(), supplier_id: supplier.id, name: "Parafuso M8".into() };
        let foreign_product = Product {
            id: Uuid::new_v4(),
            supplier_id: other_supplier.id,
            name: "Porca M8".into(),
        };

        for t in [&supplier, &other_supplier, &company_a, &company_b, &pending_company] {
            store.insert_tenant(t.clone()).await;
        }
        store.insert_product(product.clone()).await;
        store.insert_product(foreign_product.clone()).await;

        Self { store, supplier, other_supplier, company_a, company_b, pending_company, product, foreign_product }
    }

    pub fn mutator(&self, notifier: Arc<dyn ChangeNotifier>) -> PriceMutator {
        PriceMutator::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            notifier,
            Duration::from_secs(5),
            "USD".into(),
        )
    }

    pub fn lookup(&self) -> PriceLookupService {
        PriceLookupService::new(Arc::new(self.store.clone()), Arc::new(self.store.clone()), "USD".into())
    }
}

pub fn audit_ctx() -> AuditContext {
    AuditContext { ip_address: Some("203.0.113.7".into()), user_agent: Some("pricing-tests".into()) }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        jwt_secret: JWT_SECRET.into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        db_max_connections: 1,
        db_acquire_timeout: Duration::from_secs(1),
        price_tx_timeout: Duration::from_secs(5),
        notifier_capacity: 16,
        default_currency: "USD".into(),
    }
}
