// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use crate::{
    common::{i18n::I18nStore, validation::{normalize_currency, validate_currency}},
    db::{CatalogDirectory, CatalogRepository, PgPriceStore, PriceStore},
    services::{BroadcastNotifier, ChangeNotifier, PriceLookupService, PriceMutator},
};

// ---
// Configuração (variáveis de ambiente / .env)
// ---
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub price_tx_timeout: Duration,
    pub notifier_capacity: usize,
    pub default_currency: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{name} deve ser definida"))
}

fn optional<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} tem valor inválido: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // O .env é opcional (em produção as variáveis vêm do ambiente)
        dotenvy::dotenv().ok();

        let default_currency = normalize_currency(&optional("DEFAULT_CURRENCY", "USD".to_string())?);
        validate_currency(&default_currency)
            .map_err(|_| anyhow::anyhow!("DEFAULT_CURRENCY deve ter 3 letras: '{default_currency}'"))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(optional("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            price_tx_timeout: Duration::from_secs(optional("PRICE_TX_TIMEOUT_SECS", 5)?),
            notifier_capacity: optional("NOTIFIER_CAPACITY", 256)?,
            default_currency,
        })
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(self.db_acquire_timeout)
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

// ---
// Estado compartilhado
// ---
#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub price_mutator: PriceMutator,
    pub price_lookup: PriceLookupService,
    pub notifier: BroadcastNotifier,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    /// Monta o gráfico de dependências sobre qualquer store (Postgres ou memória).
    pub fn from_parts(
        store: Arc<dyn PriceStore>,
        directory: Arc<dyn CatalogDirectory>,
        config: &AppConfig,
    ) -> Self {
        let notifier = BroadcastNotifier::new(config.notifier_capacity);
        let publisher: Arc<dyn ChangeNotifier> = Arc::new(notifier.clone());

        let price_mutator = PriceMutator::new(
            store.clone(),
            directory.clone(),
            publisher,
            config.price_tx_timeout,
            config.default_currency.clone(),
        );
        let price_lookup = PriceLookupService::new(store, directory, config.default_currency.clone());

        Self {
            jwt_secret: config.jwt_secret.clone(),
            price_mutator,
            price_lookup,
            notifier,
            i18n_store: Arc::new(I18nStore::load()),
        }
    }

    pub fn with_postgres(pool: PgPool, config: &AppConfig) -> Self {
        // O statement_timeout do banco acompanha o limite da transação.
        let store = Arc::new(PgPriceStore::new(pool.clone(), config.price_tx_timeout));
        let directory = Arc::new(CatalogRepository::new(pool));
        Self::from_parts(store, directory, config)
    }
}
