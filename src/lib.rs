//! ladder-backend
//!
//! Core of a multi-venue market-making, hedging and self-trade mirror system.
//! See SPEC_FULL.md for the full requirements this crate implements.

pub mod cache;
pub mod config;
pub mod error;
pub mod hedger;
pub mod ingest;
pub mod mm;
pub mod models;
pub mod selftrade;
pub mod venue;

pub use error::{CacheError, ConfigError, VenueError};
