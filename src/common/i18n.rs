// src/common/i18n.rs

use std::collections::HashMap;

const FALLBACK_LANG: &str = "en";

// Catálogos embutidos (chave -> mensagem). Novas línguas entram aqui.
const EN: &[(&str, &str)] = &[
    ("validation.failed", "One or more fields are invalid."),
    ("price.negative", "Price must not be negative."),
    ("currency.invalid", "Currency must be a 3-letter code."),
    ("discount.range", "discountPercentage must be between 0 and 100."),
    (
        "pricing_mode.exclusive",
        "Either price or discountPercentage must be provided, but not both",
    ),
    ("window.invalid", "effectiveUntil must not be before effectiveFrom."),
    ("notes.too_long", "notes must be at most 1000 characters."),
    ("amount.too_precise", "Amounts accept at most 2 decimal places."),
    ("auth.invalid_token", "Missing or invalid authentication token."),
    ("auth.supplier_required", "Only suppliers can manage prices."),
    ("private_price.forbidden", "You do not own the product of this private price."),
    ("product.not_found", "Product not found."),
    ("company.not_found", "Company not found or not active."),
    ("private_price.not_found", "Private price not found."),
    ("price.not_available", "No price has been set for this product."),
    ("price.tx_timeout", "The price change took too long and was rolled back."),
    ("internal", "An unexpected error occurred."),
];

const PT: &[(&str, &str)] = &[
    ("validation.failed", "Um ou mais campos são inválidos."),
    ("price.negative", "O preço não pode ser negativo."),
    ("currency.invalid", "A moeda deve ter um código de 3 letras."),
    ("discount.range", "O discountPercentage deve estar entre 0 e 100."),
    (
        "pricing_mode.exclusive",
        "Informe price ou discountPercentage, mas não ambos",
    ),
    ("window.invalid", "effectiveUntil não pode ser anterior a effectiveFrom."),
    ("notes.too_long", "notes deve ter no máximo 1000 caracteres."),
    ("amount.too_precise", "Valores aceitam no máximo 2 casas decimais."),
    ("auth.invalid_token", "Token de autenticação inválido ou ausente."),
    ("auth.supplier_required", "Apenas fornecedores podem gerenciar preços."),
    ("private_price.forbidden", "Você não é o dono do produto deste preço privado."),
    ("product.not_found", "Produto não encontrado."),
    ("company.not_found", "Empresa não encontrada ou inativa."),
    ("private_price.not_found", "Preço privado não encontrado."),
    ("price.not_available", "Nenhum preço foi definido para este produto."),
    ("price.tx_timeout", "A alteração de preço demorou demais e foi desfeita."),
    ("internal", "Ocorreu um erro inesperado."),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn load() -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert("en", EN.iter().copied().collect());
        catalogs.insert("pt", PT.iter().copied().collect());
        Self { catalogs }
    }

    /// Traduz `key` para `lang`, caindo para o inglês e, por último, para a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        let lookup = |lang: &str| {
            self.catalogs
                .get(lang)
                .and_then(|catalog| catalog.get(key))
                .map(|msg| msg.to_string())
        };

        lookup(lang)
            .or_else(|| lookup(FALLBACK_LANG))
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::load();
        assert_eq!(store.translate("de", "product.not_found"), "Product not found.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::load();
        assert_eq!(store.translate("pt", "no.such.key"), "no.such.key");
    }

    #[test]
    fn catalogs_cover_the_same_keys() {
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        assert_eq!(en, pt);
    }
}
