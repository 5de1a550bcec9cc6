// src/common/validation.rs

// Validadores compartilhados entre os payloads (via `validator`) e o PriceMutator.
// As mensagens são chaves de i18n, traduzidas em `AppError::to_api_error`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use validator::ValidationError;

fn invalid(code: &'static str, message_key: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message_key.into());
    err
}

// As colunas são NUMERIC(_, 2): mais casas seriam arredondadas em silêncio pelo banco.
const MAX_SCALE: u32 = 2;

fn check_scale(val: &Decimal) -> Result<(), ValidationError> {
    if val.normalize().scale() > MAX_SCALE {
        let mut err = invalid("scale", "amount.too_precise");
        err.add_param("max_scale".into(), &MAX_SCALE);
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = invalid("range", "price.negative");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    check_scale(val)
}

pub fn validate_discount_range(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = invalid("range", "discount.range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &100.0);
        return Err(err);
    }
    check_scale(val)
}

pub fn validate_currency(val: &str) -> Result<(), ValidationError> {
    if val.len() == 3 && val.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(());
    }
    Err(invalid("currency", "currency.invalid"))
}

pub fn validate_window(
    from: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match until {
        Some(until) if until < from => Err(invalid("window", "window.invalid")),
        _ => Ok(()),
    }
}

pub fn normalize_currency(val: &str) -> String {
    val.trim().to_ascii_uppercase()
}
