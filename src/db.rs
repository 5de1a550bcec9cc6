pub mod catalog_repo;
pub use catalog_repo::{CatalogDirectory, CatalogRepository};
pub mod price_repo;
pub use price_repo::{PgPriceStore, PriceStore, PriceTransaction};
pub mod memory;
pub use memory::InMemoryPriceStore;
