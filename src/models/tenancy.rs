// src/models/tenancy.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Tenants e produtos são de outros serviços; o motor de preços só lê
// o dono do produto e o tipo/status do tenant para as checagens de autorização.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantType {
    Supplier,
    Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Pending,
    Active,
    Rejected,
}

// ---
// 1. Tenant (Fornecedor ou Empresa compradora)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub tenant_type: TenantType,
    pub status: TenantStatus,
}

impl Tenant {
    pub fn is_active_company(&self) -> bool {
        self.tenant_type == TenantType::Company && self.status == TenantStatus::Active
    }
}

// ---
// 2. Product (apenas identidade e dono)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub name: String,
}
