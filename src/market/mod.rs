//! Read-only market data: ETH spot price and wallet NFTs.
//!
//! Both lookups are best-effort. Upstream failures are logged and turned
//! into empty answers so dashboard calls never error.

pub mod nft;
pub mod price;

pub use nft::{Nft, NftService};
pub use price::{PriceData, PriceService};
