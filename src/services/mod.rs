//! Service layer for the poller.
//!
//! This module contains the collaborators around the core pipeline:
//! - Listing page parsing (`TableListingParser`)
//! - Date text normalization (`normalize_date_text`)
//! - Notification delivery and formatting (`Notifier`, `format_message`)

pub mod dates;
mod listings;
pub mod notifier;

pub use dates::{NormalizedDate, normalize_date_text};
pub use listings::{ListingParser, TableListingParser};
pub use notifier::{DisabledNotifier, Notifier, TelegramNotifier, format_message};
