//! Adapter implementations
//!
//! - HTTP client for the bank's backend services (`BankBackend`)
//! - In-memory demo bank (`BankBackend`)
//! - axum web layer serving the frontend

pub mod demo;
pub mod http;
pub mod web;
