// src/middleware.rs

pub mod audit_context;
pub mod auth;
pub mod i18n;
pub mod rbac;
