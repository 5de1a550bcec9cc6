// src/handlers/pricing.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_currency, validate_discount_range, validate_not_negative},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireTenantType, Supplier},
    },
    models::pricing::{
        AuditContext, DefaultPrice, DefaultPriceInput, PriceAuditLog, PriceResponse, PricingMode,
        PrivatePrice, PrivatePriceChanges, PrivatePriceInput,
    },
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultPricePayload {
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = 100.0)]
    pub price: Decimal,

    #[validate(custom(function = "validate_currency"))]
    #[schema(example = "USD")]
    pub currency: Option<String>,

    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
}

impl From<SetDefaultPricePayload> for DefaultPriceInput {
    fn from(payload: SetDefaultPricePayload) -> Self {
        Self {
            price: payload.price,
            currency: payload.currency,
            effective_from: payload.effective_from,
            effective_until: payload.effective_until,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrivatePricePayload {
    pub company_id: Uuid,

    // Exatamente um dos dois: preço fixo OU desconto percentual.
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = 90.0)]
    pub price: Option<Decimal>,

    #[validate(custom(function = "validate_discount_range"))]
    #[schema(example = 10.0)]
    pub discount_percentage: Option<Decimal>,

    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,

    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,

    #[validate(length(max = 1000, message = "notes.too_long"))]
    pub notes: Option<String>,
}

impl CreatePrivatePricePayload {
    pub fn into_input(self) -> Result<PrivatePriceInput, AppError> {
        let mode = PricingMode::from_parts(self.price, self.discount_percentage)
            .ok_or_else(|| AppError::field("price", "pricing_mode.exclusive"))?;

        Ok(PrivatePriceInput {
            company_id: self.company_id,
            mode,
            currency: self.currency,
            effective_from: self.effective_from,
            effective_until: self.effective_until,
            notes: self.notes,
        })
    }
}

// Campo ausente -> None; `null` explícito -> Some(None).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Atualização parcial. Enviar `price` ou `discountPercentage` troca o modo inteiro.
/// `currency`, `effectiveUntil` e `notes` aceitam `null` para limpar o valor.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrivatePricePayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,

    #[validate(custom(function = "validate_discount_range"))]
    pub discount_percentage: Option<Decimal>,

    // Validada no PriceMutator, junto com a normalização.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub currency: Option<Option<String>>,

    pub effective_from: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub effective_until: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 1000, message = "notes.too_long"))]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,

    pub is_active: Option<bool>,
}

impl UpdatePrivatePricePayload {
    pub fn into_changes(self) -> Result<PrivatePriceChanges, AppError> {
        let mode = match (self.price, self.discount_percentage) {
            (None, None) => None,
            (price, discount) => Some(
                PricingMode::from_parts(price, discount)
                    .ok_or_else(|| AppError::field("price", "pricing_mode.exclusive"))?,
            ),
        };

        Ok(PrivatePriceChanges {
            mode,
            currency: self.currency,
            effective_from: self.effective_from,
            effective_until: self.effective_until,
            notes: self.notes,
            is_active: self.is_active,
        })
    }
}

// ---
// Respostas
// ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPriceResponse {
    pub default_price: DefaultPrice,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivatePriceResponse {
    pub private_price: PrivatePrice,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPriceHistoryResponse {
    pub default_prices: Vec<DefaultPrice>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivatePriceListResponse {
    pub private_prices: Vec<PrivatePrice>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceAuditResponse {
    pub audit_logs: Vec<PriceAuditLog>,
}

// ---
// Handler: set_default_price
// ---
#[utoipa::path(
    put,
    path = "/api/products/{product_id}/default-price",
    tag = "Pricing",
    request_body = SetDefaultPricePayload,
    responses(
        (status = 200, description = "Preço padrão definido", body = DefaultPriceResponse),
        (status = 400, description = "Preço negativo ou moeda inválida"),
        (status = 403, description = "Apenas fornecedores"),
        (status = 404, description = "Produto não encontrado")
    ),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn set_default_price(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    audit_ctx: AuditContext,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetDefaultPricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let default_price = app_state
        .price_mutator
        .set_default_price(product_id, caller.tenant_id, payload.into(), caller.user_id, &audit_ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(DefaultPriceResponse { default_price }))
}

// ---
// Handler: create_private_price
// ---
#[utoipa::path(
    post,
    path = "/api/products/{product_id}/private-prices",
    tag = "Pricing",
    request_body = CreatePrivatePricePayload,
    responses(
        (status = 201, description = "Preço privado criado", body = PrivatePriceResponse),
        (status = 400, description = "Preço e desconto juntos/ausentes, ou desconto fora de 0-100"),
        (status = 403, description = "Apenas fornecedores"),
        (status = 404, description = "Produto ou empresa não encontrados")
    ),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn create_private_price(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    audit_ctx: AuditContext,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreatePrivatePricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;
    let input = payload.into_input().map_err(to_api)?;

    let private_price = app_state
        .price_mutator
        .create_private_price(product_id, caller.tenant_id, input, caller.user_id, &audit_ctx)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(PrivatePriceResponse { private_price })))
}

// ---
// Handler: update_private_price
// ---
#[utoipa::path(
    put,
    path = "/api/private-prices/{private_price_id}",
    tag = "Pricing",
    request_body = UpdatePrivatePricePayload,
    responses(
        (status = 200, description = "Preço privado atualizado", body = PrivatePriceResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Produto de outro fornecedor"),
        (status = 404, description = "Preço privado não encontrado")
    ),
    params(("private_price_id" = Uuid, Path, description = "ID do Preço Privado")),
    security(("api_jwt" = []))
)]
pub async fn update_private_price(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    audit_ctx: AuditContext,
    Path(private_price_id): Path<Uuid>,
    Json(payload): Json<UpdatePrivatePricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;
    let changes = payload.into_changes().map_err(to_api)?;

    let private_price = app_state
        .price_mutator
        .update_private_price(private_price_id, caller.tenant_id, changes, caller.user_id, &audit_ctx)
        .await
        .map_err(to_api)?;

    Ok(Json(PrivatePriceResponse { private_price }))
}

// ---
// Handler: delete_private_price (desativa, não apaga)
// ---
#[utoipa::path(
    delete,
    path = "/api/private-prices/{private_price_id}",
    tag = "Pricing",
    responses(
        (status = 204, description = "Preço privado desativado"),
        (status = 403, description = "Produto de outro fornecedor"),
        (status = 404, description = "Preço privado não encontrado")
    ),
    params(("private_price_id" = Uuid, Path, description = "ID do Preço Privado")),
    security(("api_jwt" = []))
)]
pub async fn delete_private_price(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    Path(private_price_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .price_mutator
        .delete_private_price(private_price_id, caller.tenant_id, caller.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Handler: get_product_price ("quanto eu pago")
// ---
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/price",
    tag = "Pricing",
    responses(
        (status = 200, description = "Preço resolvido para o chamador", body = PriceResponse),
        (status = 404, description = "Produto sem preço")
    ),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn get_product_price(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let price = app_state
        .price_lookup
        .get_price(product_id, &caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(PriceResponse { price }))
}

// ---
// Leituras do fornecedor
// ---
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/default-prices",
    tag = "Pricing",
    responses((status = 200, description = "Histórico de preços padrão", body = DefaultPriceHistoryResponse)),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn list_default_prices(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let default_prices = app_state
        .price_mutator
        .list_default_prices(product_id, caller.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(DefaultPriceHistoryResponse { default_prices }))
}

#[utoipa::path(
    get,
    path = "/api/products/{product_id}/private-prices",
    tag = "Pricing",
    responses((status = 200, description = "Preços privados do produto", body = PrivatePriceListResponse)),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn list_private_prices(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let private_prices = app_state
        .price_mutator
        .list_private_prices(product_id, caller.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(PrivatePriceListResponse { private_prices }))
}

#[utoipa::path(
    get,
    path = "/api/products/{product_id}/price-audit",
    tag = "Pricing",
    responses((status = 200, description = "Auditoria de preços do produto", body = PriceAuditResponse)),
    params(("product_id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn list_price_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireTenantType(caller, _): RequireTenantType<Supplier>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let audit_logs = app_state
        .price_mutator
        .list_audit_trail(product_id, caller.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(PriceAuditResponse { audit_logs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_payload(body: serde_json::Value) -> CreatePrivatePricePayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn price_and_discount_together_are_rejected() {
        let payload = create_payload(json!({
            "companyId": Uuid::new_v4(),
            "price": 90.0,
            "discountPercentage": 10.0
        }));
        assert!(matches!(payload.into_input(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn neither_price_nor_discount_is_rejected() {
        let payload = create_payload(json!({ "companyId": Uuid::new_v4() }));
        assert!(matches!(payload.into_input(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn discount_above_one_hundred_fails_validation() {
        let payload = create_payload(json!({
            "companyId": Uuid::new_v4(),
            "discountPercentage": 100.5
        }));
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("discount_percentage"));
    }

    #[test]
    fn negative_default_price_fails_validation() {
        let payload: SetDefaultPricePayload =
            serde_json::from_value(json!({ "price": -1.0, "currency": "USD" })).unwrap();
        assert!(payload.validate().is_err());

        let payload: SetDefaultPricePayload =
            serde_json::from_value(json!({ "price": 10.0, "currency": "US" })).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn partial_update_without_price_fields_keeps_the_mode() {
        let payload: UpdatePrivatePricePayload =
            serde_json::from_value(json!({ "notes": "contrato 2026" })).unwrap();
        let changes = payload.into_changes().unwrap();
        assert_eq!(changes.mode, None);
        assert_eq!(changes.notes, Some(Some("contrato 2026".to_string())));
        assert_eq!(changes.effective_until, None);

        let payload: UpdatePrivatePricePayload =
            serde_json::from_value(json!({ "discountPercentage": 20 })).unwrap();
        let changes = payload.into_changes().unwrap();
        assert_eq!(changes.mode, Some(PricingMode::Discount { discount_percentage: Decimal::new(20, 0) }));
    }

    #[test]
    fn explicit_null_clears_nullable_fields() {
        let payload: UpdatePrivatePricePayload = serde_json::from_value(json!({
            "effectiveUntil": null,
            "notes": null,
            "currency": null
        }))
        .unwrap();
        let changes = payload.into_changes().unwrap();
        assert_eq!(changes.effective_until, Some(None));
        assert_eq!(changes.notes, Some(None));
        assert_eq!(changes.currency, Some(None));
        assert_eq!(changes.is_active, None);
    }
}
