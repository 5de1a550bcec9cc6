// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// O erro de domínio. Serviços e repositórios só conhecem este tipo;
// a tradução para HTTP (status + mensagem no idioma do cliente) acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Apenas fornecedores podem realizar esta ação")]
    SupplierRequired,

    #[error("O produto do preço privado pertence a outro fornecedor")]
    NotProductOwner,

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Empresa não encontrada ou inativa")]
    CompanyNotFound,

    #[error("Preço privado não encontrado")]
    PrivatePriceNotFound,

    #[error("Nenhum preço disponível para o produto")]
    PriceNotAvailable,

    // Indica bug de concorrência ou dado corrompido, nunca entrada ruim do cliente.
    #[error("Invariante de preço violada: {0}")]
    InvariantViolation(String),

    #[error("Transação de preço excedeu o tempo limite")]
    TransactionTimeout,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// O erro "pronto para HTTP".
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl AppError {
    /// Monta um `ValidationError` de um único campo. A mensagem é uma chave de i18n.
    pub fn field(field: &'static str, message_key: &'static str) -> Self {
        let mut err = validator::ValidationError::new("invalid");
        err.message = Some(message_key.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::SupplierRequired | AppError::NotProductOwner => StatusCode::FORBIDDEN,
            AppError::ProductNotFound
            | AppError::CompanyNotFound
            | AppError::PrivatePriceNotFound
            | AppError::PriceNotAvailable => StatusCode::NOT_FOUND,
            AppError::TransactionTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvariantViolation(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation.failed",
            AppError::InvalidToken => "auth.invalid_token",
            AppError::SupplierRequired => "auth.supplier_required",
            AppError::NotProductOwner => "private_price.forbidden",
            AppError::ProductNotFound => "product.not_found",
            AppError::CompanyNotFound => "company.not_found",
            AppError::PrivatePriceNotFound => "private_price.not_found",
            AppError::PriceNotAvailable => "price.not_available",
            AppError::TransactionTimeout => "price.tx_timeout",
            AppError::InvariantViolation(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => "internal",
        }
    }

    /// Converte para a resposta HTTP, traduzindo as chaves para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(key) => store.translate(&locale.0, key),
                            None => store.translate(&locale.0, &e.code),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(details)
            }
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(&locale.0, self.message_key()),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_mode_violation_names_the_rule() {
        let store = I18nStore::load();
        let err = AppError::field("price", "pricing_mode.exclusive");

        let api = err.to_api_error(&Locale("en".into()), &store);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(
            details["price"],
            vec!["Either price or discountPercentage must be provided, but not both".to_string()]
        );
    }

    #[test]
    fn invariant_violation_is_a_server_error() {
        let err = AppError::InvariantViolation("two active default prices".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn ownership_errors_map_to_not_found_and_forbidden() {
        assert_eq!(AppError::ProductNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CompanyNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotProductOwner.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::SupplierRequired.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn messages_follow_the_caller_language() {
        let store = I18nStore::load();
        let api = AppError::ProductNotFound.to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.error, "Produto não encontrado.");
    }
}
