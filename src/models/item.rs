//! Listing items and their persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing entry as extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Canonical absolute URL of the listing
    #[serde(rename = "path")]
    pub key: Option<String>,

    /// Listing title
    pub title: Option<String>,

    /// Price or salary as displayed
    #[serde(rename = "salary")]
    pub price: Option<String>,

    /// Raw date text, e.g. "Москва, 28 авг."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,

    /// Date as `DD.MM.YYYY`
    #[serde(default, rename = "date", skip_serializing_if = "Option::is_none")]
    pub normalized_date: Option<String>,

    /// Local midnight of the date in milliseconds
    #[serde(default, rename = "dateTs", skip_serializing_if = "Option::is_none")]
    pub date_timestamp: Option<i64>,
}

impl Item {
    /// Create an item with a key and title.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// The dedup key, if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// Attach a price.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    /// Convert into a record first seen at `first_seen_at`.
    ///
    /// Returns `None` for items without a key.
    pub fn into_record(self, first_seen_at: DateTime<Utc>) -> Option<Record> {
        let key = self.key.filter(|k| !k.is_empty())?;
        Some(Record {
            key,
            title: self.title,
            price: self.price,
            date_text: self.date_text,
            normalized_date: self.normalized_date,
            date_timestamp: self.date_timestamp,
            first_seen_at,
        })
    }
}

/// A persisted history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "path")]
    pub key: String,

    pub title: Option<String>,

    #[serde(rename = "salary")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,

    #[serde(default, rename = "date", skip_serializing_if = "Option::is_none")]
    pub normalized_date: Option<String>,

    #[serde(default, rename = "dateTs", skip_serializing_if = "Option::is_none")]
    pub date_timestamp: Option<i64>,

    /// When the key was first observed. Legacy entries without it get the load time.
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub first_seen_at: DateTime<Utc>,
}

impl Record {
    /// Copy the displayable fields of `item`, keeping key and `first_seen_at`.
    pub fn refreshed_from(&self, item: &Item) -> Self {
        Self {
            key: self.key.clone(),
            title: item.title.clone(),
            price: item.price.clone(),
            date_text: item.date_text.clone(),
            normalized_date: item.normalized_date.clone(),
            date_timestamp: item.date_timestamp,
            first_seen_at: self.first_seen_at,
        }
    }
}

/// The persisted history of one target.
pub type Snapshot = Vec<Record>;
