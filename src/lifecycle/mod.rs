//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Open stores → Connect chain → Build services → AppState
//!
//! Flush (flush.rs):
//!     every storage.flush_interval_secs → AppState::persist
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → server stops accepting → in-flight requests drain
//!     → stores saved by the caller
//! ```
//!
//! # Design Decisions
//! - Startup degrades instead of failing when the chain or IPFS is
//!   unreachable; only local storage errors are fatal
//! - Claims and the CID registry are written through on every change;
//!   the remaining stores are flushed on a timer and once more after the
//!   server has fully stopped

pub mod flush;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use flush::run_flusher;
pub use shutdown::Shutdown;
pub use startup::{bootstrap, StartupError};
