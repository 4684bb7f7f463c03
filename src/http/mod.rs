//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (layers: request id, trace, body limit, timeout, metrics)
//!     → extract.rs (bearer session, where required)
//!     → auth / mail / claim / wallet / market handlers
//!     → error.rs (subsystem error → status + JSON body)
//! ```

pub mod auth;
pub mod claim;
pub mod error;
pub mod extract;
pub mod mail;
pub mod market;
pub mod server;
pub mod wallet;

pub use error::ApiError;
pub use extract::AuthSession;
pub use server::{AppState, HttpServer};
