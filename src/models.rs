pub mod auth;
pub mod pricing;
pub mod tenancy;
