// src/models/selectors.rs

//! CSS selectors for scraping a listing page.

use serde::{Deserialize, Serialize};

/// CSS selectors for scraping a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each listing block on the page
    #[serde(default = "default_row_selector")]
    pub row_selector: String,

    /// Selector for the title link within a row
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// Selector for the price/salary cell within a row
    #[serde(default = "default_price_selector")]
    pub price_selector: String,

    /// Selector for the date element within a row
    #[serde(
        default = "default_date_selector",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,
}

fn default_row_selector() -> String {
    "table.result".to_string()
}

fn default_title_selector() -> String {
    "tbody tr td.desc p a".to_string()
}

fn default_price_selector() -> String {
    "tbody tr td.price".to_string()
}

fn default_date_selector() -> Option<String> {
    Some("thead tr th div .date".to_string())
}

fn default_attr_name() -> String {
    "href".to_string()
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row_selector: default_row_selector(),
            title_selector: default_title_selector(),
            price_selector: default_price_selector(),
            date_selector: default_date_selector(),
            attr_name: default_attr_name(),
        }
    }
}

impl ListingSelectors {
    /// All configured selector strings, for validation.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.row_selector.as_str()),
            Some(self.title_selector.as_str()),
            Some(self.price_selector.as_str()),
            self.date_selector.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_date_selector() {
        let selectors: ListingSelectors =
            toml::from_str(r#"row_selector = "div.listing""#).unwrap();

        assert_eq!(selectors.row_selector, "div.listing");
        assert_eq!(selectors.date_selector, ListingSelectors::default().date_selector);
        assert_eq!(selectors.attr_name, "href");
    }

    #[test]
    fn all_skips_missing_date_selector() {
        let selectors = ListingSelectors {
            date_selector: None,
            ..ListingSelectors::default()
        };
        assert_eq!(selectors.all().count(), 3);
        assert_eq!(ListingSelectors::default().all().count(), 4);
    }
}
