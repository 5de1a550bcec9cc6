// src/services.rs

pub mod audit_trail;
pub mod change_notifier;
pub mod price_lookup;
pub mod price_mutator;
pub mod price_resolver;
pub mod view_tracker;

pub use change_notifier::{BroadcastNotifier, ChangeNotifier, NoopNotifier};
pub use price_lookup::PriceLookupService;
pub use price_mutator::PriceMutator;
