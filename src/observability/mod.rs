//! Observability subsystem.
//!
//! Services log through `tracing` with structured fields (`email`, `id`,
//! `cid`, `tx_hash`) and count outcomes through the `metrics` facade.
//! `logging.rs` installs the subscriber; `metrics.rs` names every series
//! and installs the optional Prometheus listener.

pub mod logging;
pub mod metrics;
