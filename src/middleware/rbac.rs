// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{auth::Caller, tenancy::TenantType},
};

/// 1. O Trait que define qual tipo de tenant a rota exige
pub trait TenantKindDef: Send + Sync + 'static {
    fn tenant_type() -> TenantType;
    fn rejection() -> AppError;
}

/// 2. O Extractor (Guardião). Entrega o chamador já validado.
pub struct RequireTenantType<T>(pub Caller, pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireTenantType<T>
where
    T: TenantKindDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Autentica (401 se o token for inválido)
        let AuthenticatedUser(caller) = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Confere o tipo do tenant (403)
        if caller.tenant_type != T::tenant_type() {
            let app_state = AppState::from_ref(state);
            let locale = Locale::from_headers(&parts.headers);
            tracing::debug!(tenant_id = %caller.tenant_id, "Tipo de tenant não autorizado para a rota");
            return Err(T::rejection().to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireTenantType(caller, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS TIPOS
// ---

pub struct Supplier;
impl TenantKindDef for Supplier {
    fn tenant_type() -> TenantType { TenantType::Supplier }
    fn rejection() -> AppError { AppError::SupplierRequired }
}
