// src/models/mod.rs

//! Domain models for the poller.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod selectors;
mod target;

// Re-export all public types
pub use config::{Config, HistoryConfig, PathsConfig, PollerConfig, TelegramConfig};
pub use item::{Item, Record, Snapshot};
pub use selectors::ListingSelectors;
pub use target::Target;
