// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tenancy::TenantType;

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido pelo serviço de identidade; aqui só validamos e lemos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid, // Subject (ID do usuário)
    pub tenant_id: Uuid,
    pub role: String,
    pub tenant_type: TenantType,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

/// A identidade do chamador já autenticada: usuário + contexto do tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: String,
    pub tenant_type: TenantType,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role,
            tenant_type: claims.tenant_type,
        }
    }
}

impl Caller {
    /// O escopo de empresa usado na resolução de preço (fornecedores veem o preço padrão).
    pub fn company_scope(&self) -> Option<Uuid> {
        match self.tenant_type {
            TenantType::Company => Some(self.tenant_id),
            TenantType::Supplier => None,
        }
    }
}
