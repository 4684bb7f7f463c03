//! DexMail server library.
//!
//! Mail bodies live on IPFS, the mail index and recipient wallets live in
//! the mailer contract, and this crate stitches them together behind a
//! JSON API for the web client.

// Core services
pub mod auth;
pub mod claim;
pub mod mail;
pub mod wallets;

// External systems
pub mod blockchain;
pub mod ipfs;
pub mod market;
pub mod relay;

// Serving
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod storage;

// Cross-cutting concerns
pub mod observability;
pub mod resilience;
pub mod security;

#[cfg(test)]
mod test_support;

pub use config::DexmailConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
