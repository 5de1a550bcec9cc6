// src/services/price_mutator.rs

use chrono::Utc;
use std::{future::Future, sync::Arc, time::Duration};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::{
        error::AppError,
        validation::{
            normalize_currency, validate_currency, validate_discount_range, validate_not_negative,
            validate_window,
        },
    },
    db::{CatalogDirectory, PriceStore},
    models::{
        pricing::{
            AuditContext, DefaultPrice, DefaultPriceInput, NewDefaultPrice, NewPrivatePrice,
            PriceAuditLog, PriceChangeEvent, PriceType, PricingMode, PrivatePrice, PrivatePriceChanges,
            PrivatePriceInput, PRICE_UPDATED_EVENT,
        },
        tenancy::Product,
    },
    services::{
        audit_trail::{self, AuditTrail},
        change_notifier::ChangeNotifier,
    },
};

// ---
// Helpers de validação/autorização
// ---
fn check(field: &'static str, result: Result<(), ValidationError>) -> Result<(), AppError> {
    result.map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.add(field, e);
        AppError::ValidationError(errors)
    })
}

fn check_mode(mode: &PricingMode) -> Result<(), AppError> {
    match mode {
        PricingMode::Fixed { price } => check("price", validate_not_negative(price)),
        PricingMode::Discount { discount_percentage } => {
            check("discountPercentage", validate_discount_range(discount_percentage))
        }
    }
}

fn check_currency(currency: Option<&str>) -> Result<Option<String>, AppError> {
    match currency {
        Some(raw) => {
            let currency = normalize_currency(raw);
            check("currency", validate_currency(&currency))?;
            Ok(Some(currency))
        }
        None => Ok(None),
    }
}

/// O produto precisa existir e pertencer ao fornecedor. Produto de outro
/// fornecedor responde igual a inexistente.
pub async fn owned_product(
    directory: &dyn CatalogDirectory,
    product_id: Uuid,
    supplier_id: Uuid,
) -> Result<Product, AppError> {
    match directory.find_product(product_id).await? {
        Some(product) if product.supplier_id == supplier_id => Ok(product),
        _ => Err(AppError::ProductNotFound),
    }
}

// ---
// PriceMutator: único caminho de escrita de preços
// ---
#[derive(Clone)]
pub struct PriceMutator {
    store: Arc<dyn PriceStore>,
    directory: Arc<dyn CatalogDirectory>,
    audit: AuditTrail,
    notifier: Arc<dyn ChangeNotifier>,
    tx_timeout: Duration,
    default_currency: String,
}

impl PriceMutator {
    pub fn new(
        store: Arc<dyn PriceStore>,
        directory: Arc<dyn CatalogDirectory>,
        notifier: Arc<dyn ChangeNotifier>,
        tx_timeout: Duration,
        default_currency: String,
    ) -> Self {
        Self {
            audit: AuditTrail::new(store.clone()),
            store,
            directory,
            notifier,
            tx_timeout,
            default_currency,
        }
    }

    // Limite de tempo da unidade de trabalho inteira (begin..commit).
    // Estourou: o futuro é descartado e a transação, junto com ele, sofre rollback.
    async fn within_timeout<T>(
        &self,
        work: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.tx_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.tx_timeout.as_millis() as u64, "Transação de preço expirou");
                Err(AppError::TransactionTimeout)
            }
        }
    }

    // Moeda do evento de preço privado sem moeda própria: a do preço padrão ativo.
    // Leitura pós-commit; se falhar, usa a moeda padrão da configuração.
    async fn event_currency(&self, product_id: Uuid, currency: Option<&str>) -> String {
        if let Some(currency) = currency {
            return currency.to_string();
        }
        match self.store.active_default_prices(product_id).await {
            Ok(prices) => prices
                .into_iter()
                .next()
                .map(|p| p.currency)
                .unwrap_or_else(|| self.default_currency.clone()),
            Err(e) => {
                tracing::warn!("Falha ao ler moeda do preço padrão: {:?}", e);
                self.default_currency.clone()
            }
        }
    }

    // --- PREÇO PADRÃO ---
    pub async fn set_default_price(
        &self,
        product_id: Uuid,
        supplier_id: Uuid,
        input: DefaultPriceInput,
        actor: Uuid,
        ctx: &AuditContext,
    ) -> Result<DefaultPrice, AppError> {
        check("price", validate_not_negative(&input.price))?;
        let currency = check_currency(input.currency.as_deref())?
            .unwrap_or_else(|| self.default_currency.clone());
        let effective_from = input.effective_from.unwrap_or_else(Utc::now);
        check("effectiveUntil", validate_window(effective_from, input.effective_until))?;

        let product = owned_product(self.directory.as_ref(), product_id, supplier_id).await?;

        let new = NewDefaultPrice {
            product_id: product.id,
            price: input.price,
            currency,
            effective_from,
            effective_until: input.effective_until,
        };

        let (created, previous) = self
            .within_timeout(async {
                let mut tx = self.store.begin().await?;

                // 1. Trava o escopo e desativa o preço atual
                let previous = tx.lock_default_scope(product.id).await?;
                if let Some(previous) = &previous {
                    tx.deactivate_default_price(previous.id).await?;
                }

                // 2. Insere o novo preço ativo
                let created = tx.insert_default_price(&new).await?;

                // 3. Auditoria na mesma transação
                let entry = audit_trail::default_price_entry(&product, previous.as_ref(), &created, actor, ctx);
                self.audit.record(&mut *tx, entry).await?;

                tx.commit().await?;
                Ok((created, previous))
            })
            .await?;

        tracing::info!(
            product_id = %product.id,
            %actor,
            old_price = ?previous.as_ref().map(|p| p.price),
            new_price = %created.price,
            "Preço padrão definido"
        );

        self.notifier.publish(PriceChangeEvent {
            event: PRICE_UPDATED_EVENT.into(),
            product_id: product.id,
            product_name: product.name.clone(),
            price_type: PriceType::Default,
            new_price: created.price,
            currency: created.currency.clone(),
            supplier_id: product.supplier_id,
            company_id: None,
            updated_at: created.created_at,
        });

        Ok(created)
    }

    // --- PREÇO PRIVADO: CRIAR ---
    pub async fn create_private_price(
        &self,
        product_id: Uuid,
        supplier_id: Uuid,
        input: PrivatePriceInput,
        actor: Uuid,
        ctx: &AuditContext,
    ) -> Result<PrivatePrice, AppError> {
        check_mode(&input.mode)?;
        let currency = check_currency(input.currency.as_deref())?;
        let effective_from = input.effective_from.unwrap_or_else(Utc::now);
        check("effectiveUntil", validate_window(effective_from, input.effective_until))?;

        let product = owned_product(self.directory.as_ref(), product_id, supplier_id).await?;

        match self.directory.find_tenant(input.company_id).await? {
            Some(company) if company.is_active_company() => {}
            _ => return Err(AppError::CompanyNotFound),
        }

        let new = NewPrivatePrice {
            product_id: product.id,
            company_id: input.company_id,
            mode: input.mode,
            currency,
            effective_from,
            effective_until: input.effective_until,
            notes: input.notes,
        };

        let created = self
            .within_timeout(async {
                let mut tx = self.store.begin().await?;

                let previous = tx.lock_private_scope(product.id, new.company_id).await?;
                if let Some(previous) = &previous {
                    tx.deactivate_private_price(previous.id).await?;
                }

                let created = tx.insert_private_price(&new).await?;

                let entry = audit_trail::private_price_entry(
                    product.id,
                    created.company_id,
                    previous.map(|p| p.mode),
                    created.mode,
                    actor,
                    ctx,
                );
                self.audit.record(&mut *tx, entry).await?;

                tx.commit().await?;
                Ok(created)
            })
            .await?;

        tracing::info!(
            product_id = %product.id,
            company_id = %created.company_id,
            %actor,
            mode = %created.mode.describe(),
            "Preço privado criado"
        );

        self.publish_private_change(&product, &created).await;
        Ok(created)
    }

    // --- PREÇO PRIVADO: ATUALIZAR ---
    pub async fn update_private_price(
        &self,
        id: Uuid,
        supplier_id: Uuid,
        changes: PrivatePriceChanges,
        actor: Uuid,
        ctx: &AuditContext,
    ) -> Result<PrivatePrice, AppError> {
        if let Some(mode) = &changes.mode {
            check_mode(mode)?;
        }
        let currency = match &changes.currency {
            Some(currency) => Some(check_currency(currency.as_deref())?),
            None => None,
        };

        let existing = self
            .store
            .find_private_price(id)
            .await?
            .ok_or(AppError::PrivatePriceNotFound)?;
        let product = self.authorize_private_price(&existing, supplier_id).await?;

        let merge = |current: &PrivatePrice| -> Result<PrivatePrice, AppError> {
            let mut merged = current.clone();
            if let Some(mode) = changes.mode {
                merged.mode = mode;
            }
            if let Some(currency) = &currency {
                merged.currency = currency.clone();
            }
            if let Some(from) = changes.effective_from {
                merged.effective_from = from;
            }
            if let Some(until) = changes.effective_until {
                merged.effective_until = until;
            }
            if let Some(notes) = &changes.notes {
                merged.notes = notes.clone();
            }
            if let Some(is_active) = changes.is_active {
                merged.is_active = is_active;
            }
            check("effectiveUntil", validate_window(merged.effective_from, merged.effective_until))?;
            Ok(merged)
        };

        // Valida antes de abrir a transação; dentro dela o merge é refeito sobre a linha travada.
        merge(&existing)?;

        let (updated, price_changed) = self
            .within_timeout(async {
                let mut tx = self.store.begin().await?;

                let active = tx.lock_private_scope(existing.product_id, existing.company_id).await?;
                let current = tx
                    .find_private_price_for_update(id)
                    .await?
                    .ok_or(AppError::PrivatePriceNotFound)?;
                let merged = merge(&current)?;

                // Reativar substitui o preço ativo do escopo, se houver outro: é uma troca
                // de preço para a empresa e entra na auditoria como tal.
                let reactivated = merged.is_active && !current.is_active;
                let superseded = if reactivated {
                    active.filter(|a| a.id != current.id)
                } else {
                    None
                };
                if let Some(superseded) = &superseded {
                    tx.deactivate_private_price(superseded.id).await?;
                }

                let updated = tx.update_private_price(&merged).await?;

                let previous = if reactivated {
                    Some(superseded.map(|p| p.mode))
                } else if current.mode != updated.mode {
                    Some(Some(current.mode))
                } else {
                    None
                };
                if let Some(previous) = previous {
                    let entry = audit_trail::private_price_entry(
                        updated.product_id,
                        updated.company_id,
                        previous,
                        updated.mode,
                        actor,
                        ctx,
                    );
                    self.audit.record(&mut *tx, entry).await?;
                }

                tx.commit().await?;
                Ok((updated, previous.is_some()))
            })
            .await?;

        tracing::info!(
            private_price_id = %updated.id,
            %actor,
            mode = %updated.mode.describe(),
            is_active = updated.is_active,
            "Preço privado atualizado"
        );

        if price_changed {
            self.publish_private_change(&product, &updated).await;
        }
        Ok(updated)
    }

    // --- PREÇO PRIVADO: REMOVER (soft delete) ---
    pub async fn delete_private_price(
        &self,
        id: Uuid,
        supplier_id: Uuid,
        actor: Uuid,
    ) -> Result<PrivatePrice, AppError> {
        let existing = self
            .store
            .find_private_price(id)
            .await?
            .ok_or(AppError::PrivatePriceNotFound)?;
        self.authorize_private_price(&existing, supplier_id).await?;

        let removed = self
            .within_timeout(async {
                let mut tx = self.store.begin().await?;
                let mut current = tx
                    .find_private_price_for_update(id)
                    .await?
                    .ok_or(AppError::PrivatePriceNotFound)?;

                if current.is_active {
                    tx.deactivate_private_price(current.id).await?;
                    current.is_active = false;
                }

                tx.commit().await?;
                Ok(current)
            })
            .await?;

        // Sem linha de auditoria: o valor não muda, só a vigência.
        tracing::info!(
            private_price_id = %removed.id,
            product_id = %removed.product_id,
            company_id = %removed.company_id,
            %actor,
            "Preço privado desativado"
        );
        Ok(removed)
    }

    // --- LEITURAS DO FORNECEDOR ---
    pub async fn list_default_prices(
        &self,
        product_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Vec<DefaultPrice>, AppError> {
        owned_product(self.directory.as_ref(), product_id, supplier_id).await?;
        self.store.list_default_prices(product_id).await
    }

    pub async fn list_private_prices(
        &self,
        product_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Vec<PrivatePrice>, AppError> {
        owned_product(self.directory.as_ref(), product_id, supplier_id).await?;
        self.store.list_private_prices(product_id).await
    }

    pub async fn list_audit_trail(
        &self,
        product_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Vec<PriceAuditLog>, AppError> {
        owned_product(self.directory.as_ref(), product_id, supplier_id).await?;
        self.audit.history(product_id).await
    }

    // Preço privado existente, mas de produto de outro fornecedor: 403.
    async fn authorize_private_price(
        &self,
        price: &PrivatePrice,
        supplier_id: Uuid,
    ) -> Result<Product, AppError> {
        let product = self
            .directory
            .find_product(price.product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        if product.supplier_id != supplier_id {
            tracing::warn!(
                private_price_id = %price.id,
                %supplier_id,
                "Fornecedor tentou alterar preço privado de outro fornecedor"
            );
            return Err(AppError::NotProductOwner);
        }
        Ok(product)
    }

    // Só preço fixo é anunciado: desconto depende do preço padrão e não tem valor final próprio.
    async fn publish_private_change(&self, product: &Product, price: &PrivatePrice) {
        let PricingMode::Fixed { price: new_price } = price.mode else {
            return;
        };
        if !price.is_active {
            return;
        }

        let currency = self.event_currency(product.id, price.currency.as_deref()).await;
        self.notifier.publish(PriceChangeEvent {
            event: PRICE_UPDATED_EVENT.into(),
            product_id: product.id,
            product_name: product.name.clone(),
            price_type: PriceType::Private,
            new_price,
            currency,
            supplier_id: product.supplier_id,
            company_id: Some(price.company_id),
            updated_at: price.updated_at,
        });
    }
}
