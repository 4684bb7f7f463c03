//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → body limit (tower-http, configured in server.rs)
//!     → rate_limit.rs (per-IP token bucket on /api/auth/*)
//!     → handlers
//! Outgoing response:
//!     → headers.rs (nosniff, frame denial, referrer policy)
//! ```
//!
//! # Design Decisions
//! - Rate limiting only guards the credential endpoints
//! - Fail closed: an empty bucket rejects with 429

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
