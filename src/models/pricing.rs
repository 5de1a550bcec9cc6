// src/models/pricing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

pub const PRICE_UPDATED_EVENT: &str = "price:updated";

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "price_type", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum PriceType {
    Default,
    Private,
}

// ---
// 1. Preço Padrão (global, um ativo por produto)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPrice {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 100.0)]
    pub price: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Modo do preço privado
// ---
// Preço fixo OU desconto percentual sobre o preço padrão. "Os dois" ou "nenhum"
// não são representáveis; o banco guarda duas colunas anuláveis e a conversão
// acontece em `PrivatePriceRow -> PrivatePrice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PricingMode {
    Fixed {
        #[schema(example = 90.0)]
        price: Decimal,
    },
    Discount {
        #[serde(rename = "discountPercentage")]
        #[schema(example = 10.0)]
        discount_percentage: Decimal,
    },
}

impl PricingMode {
    /// Retorna `None` quando os dois ou nenhum dos valores vierem preenchidos.
    pub fn from_parts(price: Option<Decimal>, discount_percentage: Option<Decimal>) -> Option<Self> {
        match (price, discount_percentage) {
            (Some(price), None) => Some(PricingMode::Fixed { price }),
            (None, Some(discount_percentage)) => Some(PricingMode::Discount { discount_percentage }),
            _ => None,
        }
    }

    pub fn fixed_price(&self) -> Option<Decimal> {
        match self {
            PricingMode::Fixed { price } => Some(*price),
            PricingMode::Discount { .. } => None,
        }
    }

    pub fn discount_percentage(&self) -> Option<Decimal> {
        match self {
            PricingMode::Fixed { .. } => None,
            PricingMode::Discount { discount_percentage } => Some(*discount_percentage),
        }
    }

    /// O valor registrado na auditoria: o preço fixo ou o percentual de desconto.
    pub fn audit_value(&self) -> Decimal {
        match self {
            PricingMode::Fixed { price } => *price,
            PricingMode::Discount { discount_percentage } => *discount_percentage,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PricingMode::Fixed { price } => format!("fixed price {}", price),
            PricingMode::Discount { discount_percentage } => {
                format!("discount {}%", discount_percentage)
            }
        }
    }
}

// ---
// 3. Preço Privado (por empresa)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivatePrice {
    pub id: Uuid,
    pub product_id: Uuid,
    pub company_id: Uuid,
    #[serde(flatten)]
    pub mode: PricingMode,
    #[schema(example = "USD")]
    pub currency: Option<String>,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// A linha "crua" da tabela 'private_prices'.
#[derive(Debug, Clone, FromRow)]
pub struct PrivatePriceRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub currency: Option<String>,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PrivatePriceRow> for PrivatePrice {
    type Error = AppError;

    fn try_from(row: PrivatePriceRow) -> Result<Self, Self::Error> {
        let mode = PricingMode::from_parts(row.price, row.discount_percentage).ok_or_else(|| {
            AppError::InvariantViolation(format!(
                "private price {} must carry exactly one of price/discount_percentage",
                row.id
            ))
        })?;

        Ok(PrivatePrice {
            id: row.id,
            product_id: row.product_id,
            company_id: row.company_id,
            mode,
            currency: row.currency,
            effective_from: row.effective_from,
            effective_until: row.effective_until,
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---
// 4. Auditoria (append-only)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceAuditLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price_type: PriceType,
    pub company_id: Option<Uuid>,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub changed_by: Uuid,
    #[schema(example = "default price set")]
    pub change_reason: String,
    pub changed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// ---
// 5. Visualizações (analytics)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PriceView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub price_type: PriceType,
    pub viewed_at: DateTime<Utc>,
}

// ---
// Comandos de escrita (já validados)
// ---
#[derive(Debug, Clone)]
pub struct NewDefaultPrice {
    pub product_id: Uuid,
    pub price: Decimal,
    pub currency: String,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPrivatePrice {
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub mode: PricingMode,
    pub currency: Option<String>,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPriceAudit {
    pub product_id: Uuid,
    pub price_type: PriceType,
    pub company_id: Option<Uuid>,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub changed_by: Uuid,
    pub change_reason: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPriceView {
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub price_type: PriceType,
}

// ---
// Entradas do PriceMutator
// ---
#[derive(Debug, Clone)]
pub struct DefaultPriceInput {
    pub price: Decimal,
    pub currency: Option<String>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PrivatePriceInput {
    pub company_id: Uuid,
    pub mode: PricingMode,
    pub currency: Option<String>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Atualização parcial. `mode` troca o modo inteiro (definir um limpa o outro).
/// Nos campos anuláveis, `None` mantém o valor e `Some(None)` limpa.
#[derive(Debug, Clone, Default)]
pub struct PrivatePriceChanges {
    pub mode: Option<PricingMode>,
    pub currency: Option<Option<String>>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Quem/de onde: vai para cada linha de auditoria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// ---
// Resposta do "quanto eu pago"
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    #[schema(example = 90.0)]
    pub price: Decimal,
    pub price_type: PriceType,
    #[schema(example = "USD")]
    pub currency: String,
    pub has_private_price: bool,
    pub effective_from: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceResponse {
    pub price: ResolvedPrice,
}

// ---
// Evento de mudança de preço (contrato lógico do ChangeNotifier)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceChangeEvent {
    #[schema(example = "price:updated")]
    pub event: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub price_type: PriceType,
    pub new_price: Decimal,
    pub currency: String,
    pub supplier_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(price: Option<Decimal>, discount: Option<Decimal>) -> PrivatePriceRow {
        let now = Utc::now();
        PrivatePriceRow {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            price,
            discount_percentage: discount,
            currency: Some("USD".into()),
            effective_from: now,
            effective_until: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mode_requires_exactly_one_value() {
        let ten = Decimal::new(10, 0);
        assert_eq!(PricingMode::from_parts(Some(ten), None), Some(PricingMode::Fixed { price: ten }));
        assert_eq!(
            PricingMode::from_parts(None, Some(ten)),
            Some(PricingMode::Discount { discount_percentage: ten })
        );
        assert_eq!(PricingMode::from_parts(Some(ten), Some(ten)), None);
        assert_eq!(PricingMode::from_parts(None, None), None);
    }

    #[test]
    fn corrupt_rows_are_invariant_violations() {
        let both = row(Some(Decimal::ONE), Some(Decimal::ONE));
        assert!(matches!(PrivatePrice::try_from(both), Err(AppError::InvariantViolation(_))));

        let neither = row(None, None);
        assert!(matches!(PrivatePrice::try_from(neither), Err(AppError::InvariantViolation(_))));
    }

    #[test]
    fn private_price_serializes_only_its_mode_field() {
        let fixed = PrivatePrice::try_from(row(Some(Decimal::new(9000, 2)), None)).unwrap();
        let value = serde_json::to_value(&fixed).unwrap();
        assert_eq!(value["price"], json!(90.0));
        assert!(value.get("discountPercentage").is_none());

        let discount = PrivatePrice::try_from(row(None, Some(Decimal::new(15, 0)))).unwrap();
        let value = serde_json::to_value(&discount).unwrap();
        assert_eq!(value["discountPercentage"], json!(15.0));
        assert!(value.get("price").is_none());
        assert_eq!(value["isActive"], json!(true));
    }
}
