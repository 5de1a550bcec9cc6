// src/services/price_resolver.rs

// Resolução pura: recebe as linhas de preço do produto e o escopo do
// comprador, devolve o único preço aplicável. Sem I/O.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::models::pricing::{DefaultPrice, PriceType, PricingMode, PrivatePrice, ResolvedPrice};

/// Casas decimais da moeda.
pub const CURRENCY_SCALE: u32 = 2;

/// Arredondamento "half-up" (meio para longe do zero) em 2 casas.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `base * (1 - desconto/100)`, arredondado para a moeda.
pub fn apply_discount(base: Decimal, discount_percentage: Decimal) -> Decimal {
    round_currency(base * (Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED))
}

fn in_window(from: DateTime<Utc>, until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    from <= now && until.is_none_or(|until| until >= now)
}

/// O preço padrão vigente. Mais de uma linha elegível não deveria existir;
/// se existir, vence a de `effective_from` mais recente.
pub fn current_default_price(rows: &[DefaultPrice], now: DateTime<Utc>) -> Option<&DefaultPrice> {
    rows.iter()
        .filter(|p| p.is_active && in_window(p.effective_from, p.effective_until, now))
        .max_by_key(|p| (p.effective_from, p.created_at))
}

pub fn current_private_price(
    rows: &[PrivatePrice],
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Option<&PrivatePrice> {
    rows.iter()
        .filter(|p| {
            p.is_active
                && p.company_id == company_id
                && in_window(p.effective_from, p.effective_until, now)
        })
        .max_by_key(|p| (p.effective_from, p.created_at))
}

/// Resolve o preço de um produto para `viewer` (empresa) ou sem escopo.
///
/// `None` significa "não disponível": nenhum preço vigente, ou um desconto
/// privado sem preço padrão para servir de base.
pub fn resolve(
    defaults: &[DefaultPrice],
    privates: &[PrivatePrice],
    viewer: Option<Uuid>,
    now: DateTime<Utc>,
    fallback_currency: &str,
) -> Option<ResolvedPrice> {
    let default = current_default_price(defaults, now);
    let private = viewer.and_then(|company_id| current_private_price(privates, company_id, now));

    if let Some(private) = private {
        let (price, currency) = match private.mode {
            PricingMode::Discount { discount_percentage } => {
                let base = default?;
                let currency = private.currency.clone().unwrap_or_else(|| base.currency.clone());
                (apply_discount(base.price, discount_percentage), currency)
            }
            PricingMode::Fixed { price } => {
                let currency = private
                    .currency
                    .clone()
                    .or_else(|| default.map(|d| d.currency.clone()))
                    .unwrap_or_else(|| fallback_currency.to_string());
                (price, currency)
            }
        };

        return Some(ResolvedPrice {
            price,
            price_type: PriceType::Private,
            currency,
            has_private_price: true,
            effective_from: private.effective_from,
        });
    }

    default.map(|d| ResolvedPrice {
        price: d.price,
        price_type: PriceType::Default,
        currency: d.currency.clone(),
        has_private_price: false,
        effective_from: d.effective_from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn default_price(product_id: Uuid, price: &str, from: DateTime<Utc>) -> DefaultPrice {
        DefaultPrice {
            id: Uuid::new_v4(),
            product_id,
            price: dec(price),
            currency: "USD".into(),
            effective_from: from,
            effective_until: None,
            is_active: true,
            created_at: from,
            updated_at: from,
        }
    }

    fn private_price(product_id: Uuid, company_id: Uuid, mode: PricingMode) -> PrivatePrice {
        let from = Utc::now() - Duration::minutes(1);
        PrivatePrice {
            id: Uuid::new_v4(),
            product_id,
            company_id,
            mode,
            currency: None,
            effective_from: from,
            effective_until: None,
            notes: None,
            is_active: true,
            created_at: from,
            updated_at: from,
        }
    }

    #[test]
    fn fifteen_percent_off_one_hundred_is_eighty_five() {
        assert_eq!(apply_discount(dec("100.00"), dec("15")), dec("85.00"));
    }

    #[test]
    fn discount_rounds_half_up_to_cents() {
        // 99.99 * 0.6667 = 66.663333 -> 66.66
        assert_eq!(apply_discount(dec("99.99"), dec("33.33")), dec("66.66"));
        // 10.05 * 0.5 = 5.025 -> 5.03 (half-even daria 5.02)
        assert_eq!(apply_discount(dec("10.05"), dec("50")), dec("5.03"));
        assert_eq!(round_currency(dec("2.345")), dec("2.35"));
        assert_eq!(round_currency(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn full_and_zero_discounts() {
        assert_eq!(apply_discount(dec("42.10"), dec("100")), dec("0.00"));
        assert_eq!(apply_discount(dec("42.10"), dec("0")), dec("42.10"));
    }

    #[test]
    fn private_fixed_price_wins_over_default() {
        let now = Utc::now();
        let (product, company) = (Uuid::new_v4(), Uuid::new_v4());
        let defaults = vec![default_price(product, "100.00", now - Duration::hours(1))];
        let privates = vec![private_price(product, company, PricingMode::Fixed { price: dec("80.00") })];

        let resolved = resolve(&defaults, &privates, Some(company), now, "USD").unwrap();

        assert_eq!(resolved.price, dec("80.00"));
        assert_eq!(resolved.price_type, PriceType::Private);
        assert!(resolved.has_private_price);
        assert_eq!(resolved.currency, "USD");
    }

    #[test]
    fn default_applies_without_private_row() {
        let now = Utc::now();
        let product = Uuid::new_v4();
        let defaults = vec![default_price(product, "100.00", now - Duration::hours(1))];

        let resolved = resolve(&defaults, &[], Some(Uuid::new_v4()), now, "USD").unwrap();

        assert_eq!(resolved.price, dec("100.00"));
        assert_eq!(resolved.price_type, PriceType::Default);
        assert!(!resolved.has_private_price);
    }

    #[test]
    fn nothing_set_is_not_available() {
        assert!(resolve(&[], &[], Some(Uuid::new_v4()), Utc::now(), "USD").is_none());
        assert!(resolve(&[], &[], None, Utc::now(), "USD").is_none());
    }

    #[test]
    fn discount_without_base_price_is_not_available() {
        let (product, company) = (Uuid::new_v4(), Uuid::new_v4());
        let privates = vec![private_price(
            product,
            company,
            PricingMode::Discount { discount_percentage: dec("10") },
        )];

        assert!(resolve(&[], &privates, Some(company), Utc::now(), "USD").is_none());
    }

    #[test]
    fn private_rows_of_other_companies_are_ignored() {
        let now = Utc::now();
        let (product, company_a, company_b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let defaults = vec![default_price(product, "100.00", now - Duration::hours(1))];
        let privates = vec![private_price(product, company_a, PricingMode::Fixed { price: dec("1.00") })];

        let resolved = resolve(&defaults, &privates, Some(company_b), now, "USD").unwrap();
        assert_eq!(resolved.price_type, PriceType::Default);

        // Sem escopo (fornecedor consultando) também ignora preços privados.
        let resolved = resolve(&defaults, &privates, None, now, "USD").unwrap();
        assert_eq!(resolved.price_type, PriceType::Default);
    }

    #[test]
    fn rows_outside_their_window_are_not_eligible() {
        let now = Utc::now();
        let product = Uuid::new_v4();

        let future = default_price(product, "10.00", now + Duration::hours(1));
        assert!(resolve(&[future], &[], None, now, "USD").is_none());

        let mut expired = default_price(product, "10.00", now - Duration::days(2));
        expired.effective_until = Some(now - Duration::days(1));
        assert!(resolve(&[expired], &[], None, now, "USD").is_none());

        let mut inactive = default_price(product, "10.00", now - Duration::days(2));
        inactive.is_active = false;
        assert!(resolve(&[inactive], &[], None, now, "USD").is_none());
    }

    #[test]
    fn most_recent_effective_row_breaks_ties() {
        let now = Utc::now();
        let product = Uuid::new_v4();
        let older = default_price(product, "10.00", now - Duration::days(2));
        let newer = default_price(product, "12.00", now - Duration::days(1));

        let resolved = resolve(&[newer, older], &[], None, now, "USD").unwrap();
        assert_eq!(resolved.price, dec("12.00"));
    }

    #[test]
    fn discount_currency_falls_back_to_default_row() {
        let now = Utc::now();
        let (product, company) = (Uuid::new_v4(), Uuid::new_v4());
        let mut base = default_price(product, "200.00", now - Duration::hours(1));
        base.currency = "BRL".into();
        let privates = vec![private_price(
            product,
            company,
            PricingMode::Discount { discount_percentage: dec("25") },
        )];

        let resolved = resolve(&[base], &privates, Some(company), now, "USD").unwrap();

        assert_eq!(resolved.price, dec("150.00"));
        assert_eq!(resolved.currency, "BRL");
    }

    #[test]
    fn fixed_price_without_any_currency_uses_fallback() {
        let (product, company) = (Uuid::new_v4(), Uuid::new_v4());
        let privates = vec![private_price(product, company, PricingMode::Fixed { price: dec("5.00") })];

        let resolved = resolve(&[], &privates, Some(company), Utc::now(), "EUR").unwrap();
        assert_eq!(resolved.currency, "EUR");
    }
}
