// src/handlers.rs

pub mod price_events;
pub mod pricing;
