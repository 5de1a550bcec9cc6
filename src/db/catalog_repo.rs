// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{Product, Tenant},
};

// Consulta somente-leitura ao catálogo e aos tenants (mantidos por outros serviços).
#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError>;
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError>;
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogDirectory for CatalogRepository {
    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, supplier_id, name FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, tenant_type, status FROM tenants WHERE id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }
}
