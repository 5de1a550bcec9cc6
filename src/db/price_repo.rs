// src/db/price_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::pricing::{
        DefaultPrice, NewDefaultPrice, NewPriceAudit, NewPriceView, NewPrivatePrice,
        PriceAuditLog, PriceView, PrivatePrice, PrivatePriceRow,
    },
};

const PRIVATE_PRICE_COLUMNS: &str = "id, product_id, company_id, price, discount_percentage, \
     currency, effective_from, effective_until, notes, is_active, created_at, updated_at";

// ---
// Fronteira de persistência
// ---
// Leituras simples ficam no `PriceStore`. Toda escrita em preços/auditoria passa
// por um `PriceTransaction`, que só o PriceMutator abre.

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Abre a unidade de trabalho. Drop sem `commit` = rollback.
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>, AppError>;

    /// Linhas com `is_active = true` do produto (a janela de vigência é checada pelo resolver).
    async fn active_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError>;

    async fn active_private_prices(
        &self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PrivatePrice>, AppError>;

    async fn find_private_price(&self, id: Uuid) -> Result<Option<PrivatePrice>, AppError>;

    // Histórico, mais recentes primeiro.
    async fn list_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError>;
    async fn list_private_prices(&self, product_id: Uuid) -> Result<Vec<PrivatePrice>, AppError>;
    async fn list_audit_logs(&self, product_id: Uuid) -> Result<Vec<PriceAuditLog>, AppError>;

    async fn insert_price_view(&self, view: &NewPriceView) -> Result<PriceView, AppError>;
}

#[async_trait]
pub trait PriceTransaction: Send {
    /// Trava o escopo do produto e lê o preço padrão ativo.
    async fn lock_default_scope(&mut self, product_id: Uuid) -> Result<Option<DefaultPrice>, AppError>;
    async fn deactivate_default_price(&mut self, id: Uuid) -> Result<(), AppError>;
    async fn insert_default_price(&mut self, new: &NewDefaultPrice) -> Result<DefaultPrice, AppError>;

    /// Trava o escopo (produto, empresa) e lê o preço privado ativo.
    async fn lock_private_scope(
        &mut self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<PrivatePrice>, AppError>;
    async fn find_private_price_for_update(&mut self, id: Uuid) -> Result<Option<PrivatePrice>, AppError>;
    async fn deactivate_private_price(&mut self, id: Uuid) -> Result<(), AppError>;
    async fn insert_private_price(&mut self, new: &NewPrivatePrice) -> Result<PrivatePrice, AppError>;
    async fn update_private_price(&mut self, price: &PrivatePrice) -> Result<PrivatePrice, AppError>;

    async fn insert_audit_log(&mut self, entry: &NewPriceAudit) -> Result<PriceAuditLog, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

// Violação dos índices únicos parciais ou dos CHECKs = bug de concorrência, não entrada ruim.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() || db_err.is_check_violation() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return AppError::InvariantViolation(constraint);
        }
    }
    e.into()
}

fn into_private_prices(rows: Vec<PrivatePriceRow>) -> Result<Vec<PrivatePrice>, AppError> {
    rows.into_iter().map(PrivatePrice::try_from).collect()
}

// ---
// Implementação Postgres
// ---
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgPriceStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self { pool, statement_timeout }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Limite local à transação: o servidor aborta o statement, e o rollback vem junto.
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(self.statement_timeout.as_millis().to_string())
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgPriceTransaction { tx }))
    }

    async fn active_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError> {
        let prices = sqlx::query_as::<_, DefaultPrice>(
            r#"
            SELECT * FROM default_prices
            WHERE product_id = $1 AND is_active
            ORDER BY effective_from DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    async fn active_private_prices(
        &self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PrivatePrice>, AppError> {
        let rows = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "SELECT {PRIVATE_PRICE_COLUMNS} FROM private_prices \
             WHERE product_id = $1 AND company_id = $2 AND is_active \
             ORDER BY effective_from DESC"
        ))
        .bind(product_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        into_private_prices(rows)
    }

    async fn find_private_price(&self, id: Uuid) -> Result<Option<PrivatePrice>, AppError> {
        let row = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "SELECT {PRIVATE_PRICE_COLUMNS} FROM private_prices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PrivatePrice::try_from).transpose()
    }

    async fn list_default_prices(&self, product_id: Uuid) -> Result<Vec<DefaultPrice>, AppError> {
        let prices = sqlx::query_as::<_, DefaultPrice>(
            "SELECT * FROM default_prices WHERE product_id = $1 ORDER BY created_at DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    async fn list_private_prices(&self, product_id: Uuid) -> Result<Vec<PrivatePrice>, AppError> {
        let rows = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "SELECT {PRIVATE_PRICE_COLUMNS} FROM private_prices \
             WHERE product_id = $1 ORDER BY created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        into_private_prices(rows)
    }

    async fn list_audit_logs(&self, product_id: Uuid) -> Result<Vec<PriceAuditLog>, AppError> {
        let logs = sqlx::query_as::<_, PriceAuditLog>(
            "SELECT * FROM price_audit_logs WHERE product_id = $1 ORDER BY changed_at DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn insert_price_view(&self, view: &NewPriceView) -> Result<PriceView, AppError> {
        let view = sqlx::query_as::<_, PriceView>(
            r#"
            INSERT INTO price_views (product_id, company_id, price_type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(view.product_id)
        .bind(view.company_id)
        .bind(view.price_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(view)
    }
}

pub struct PgPriceTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgPriceTransaction {
    // Lock consultivo preso à transação: serializa escritores do mesmo escopo
    // mesmo quando ainda não existe linha ativa para o `FOR UPDATE` travar.
    async fn advisory_lock(&mut self, scope: String) -> Result<(), AppError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(scope)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PriceTransaction for PgPriceTransaction {
    async fn lock_default_scope(&mut self, product_id: Uuid) -> Result<Option<DefaultPrice>, AppError> {
        self.advisory_lock(format!("default_price:{product_id}")).await?;

        let current = sqlx::query_as::<_, DefaultPrice>(
            r#"
            SELECT * FROM default_prices
            WHERE product_id = $1 AND is_active
            ORDER BY effective_from DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(current)
    }

    async fn deactivate_default_price(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE default_prices SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert_default_price(&mut self, new: &NewDefaultPrice) -> Result<DefaultPrice, AppError> {
        sqlx::query_as::<_, DefaultPrice>(
            r#"
            INSERT INTO default_prices (product_id, price, currency, effective_from, effective_until, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(new.product_id)
        .bind(new.price)
        .bind(&new.currency)
        .bind(new.effective_from)
        .bind(new.effective_until)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn lock_private_scope(
        &mut self,
        product_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<PrivatePrice>, AppError> {
        self.advisory_lock(format!("private_price:{product_id}:{company_id}")).await?;

        let row = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "SELECT {PRIVATE_PRICE_COLUMNS} FROM private_prices \
             WHERE product_id = $1 AND company_id = $2 AND is_active \
             ORDER BY effective_from DESC LIMIT 1 FOR UPDATE"
        ))
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PrivatePrice::try_from).transpose()
    }

    async fn find_private_price_for_update(&mut self, id: Uuid) -> Result<Option<PrivatePrice>, AppError> {
        let row = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "SELECT {PRIVATE_PRICE_COLUMNS} FROM private_prices WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PrivatePrice::try_from).transpose()
    }

    async fn deactivate_private_price(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE private_prices SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert_private_price(&mut self, new: &NewPrivatePrice) -> Result<PrivatePrice, AppError> {
        let row = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "INSERT INTO private_prices \
             (product_id, company_id, price, discount_percentage, currency, effective_from, effective_until, notes, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE) \
             RETURNING {PRIVATE_PRICE_COLUMNS}"
        ))
        .bind(new.product_id)
        .bind(new.company_id)
        .bind(new.mode.fixed_price())
        .bind(new.mode.discount_percentage())
        .bind(&new.currency)
        .bind(new.effective_from)
        .bind(new.effective_until)
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        row.try_into()
    }

    async fn update_private_price(&mut self, price: &PrivatePrice) -> Result<PrivatePrice, AppError> {
        // Atualização in-place: o modo é gravado inteiro, então definir um lado sempre limpa o outro.
        let row = sqlx::query_as::<_, PrivatePriceRow>(&format!(
            "UPDATE private_prices SET \
                price = $2, discount_percentage = $3, currency = $4, effective_from = $5, \
                effective_until = $6, notes = $7, is_active = $8, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRIVATE_PRICE_COLUMNS}"
        ))
        .bind(price.id)
        .bind(price.mode.fixed_price())
        .bind(price.mode.discount_percentage())
        .bind(&price.currency)
        .bind(price.effective_from)
        .bind(price.effective_until)
        .bind(&price.notes)
        .bind(price.is_active)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        row.try_into()
    }

    async fn insert_audit_log(&mut self, entry: &NewPriceAudit) -> Result<PriceAuditLog, AppError> {
        sqlx::query_as::<_, PriceAuditLog>(
            r#"
            INSERT INTO price_audit_logs
                (product_id, price_type, company_id, old_price, new_price, changed_by, change_reason, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(entry.product_id)
        .bind(entry.price_type)
        .bind(entry.company_id)
        .bind(entry.old_price)
        .bind(entry.new_price)
        .bind(entry.changed_by)
        .bind(&entry.change_reason)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
