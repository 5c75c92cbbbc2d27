// src/services/listings.rs

//! Listing page parser.
//!
//! Extracts items from listing pages using the CSS selectors configured on
//! each target. Extraction is best-effort per row: rows missing a title or
//! link are skipped and never fail the page.

use chrono::{Local, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Item, Target};
use crate::services::dates::normalize_date_text;
use crate::utils::{collapse_whitespace, resolve_url};

/// Converts raw page text into listing items, in page order.
pub trait ListingParser: Send + Sync {
    fn parse(&self, raw: &str) -> Vec<Item>;
}

/// Parser for table-per-listing pages (`table.result` blocks).
#[derive(Debug)]
pub struct TableListingParser {
    base_url: Url,
    row: Selector,
    title: Selector,
    price: Selector,
    date: Option<Selector>,
    attr_name: String,
}

impl TableListingParser {
    /// Build a parser from a target's URL and selectors.
    pub fn new(target: &Target) -> Result<Self> {
        let selectors = &target.selectors;
        Ok(Self {
            base_url: Url::parse(&target.url)?,
            row: Self::parse_selector(&selectors.row_selector)?,
            title: Self::parse_selector(&selectors.title_selector)?,
            price: Self::parse_selector(&selectors.price_selector)?,
            date: selectors
                .date_selector
                .as_deref()
                .map(Self::parse_selector)
                .transpose()?,
            attr_name: selectors.attr_name.clone(),
        })
    }

    /// Parse with dates resolved relative to `today`.
    pub fn parse_at(&self, raw: &str, today: NaiveDate) -> Vec<Item> {
        let document = Html::parse_document(raw);
        document
            .select(&self.row)
            .filter_map(|row| self.parse_row(row, today))
            .collect()
    }

    fn parse_row(&self, row: ElementRef<'_>, today: NaiveDate) -> Option<Item> {
        let title_elem = row.select(&self.title).next()?;
        let title = collapse_whitespace(&title_elem.text().collect::<String>());
        let href = title_elem
            .value()
            .attr(&self.attr_name)
            .map(str::trim)
            .filter(|h| !h.is_empty())?;

        if title.is_empty() {
            return None;
        }

        let price = Self::text_of(row, &self.price);
        let date_text = self.date.as_ref().and_then(|sel| Self::text_of(row, sel));
        let normalized = date_text
            .as_deref()
            .and_then(|text| normalize_date_text(text, today));

        Some(Item {
            key: Some(resolve_url(&self.base_url, href)),
            title: Some(title),
            price,
            date_text,
            normalized_date: normalized.as_ref().map(|n| n.date.clone()),
            date_timestamp: normalized.map(|n| n.timestamp),
        })
    }

    fn text_of(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
        row.select(selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

impl ListingParser for TableListingParser {
    fn parse(&self, raw: &str) -> Vec<Item> {
        self.parse_at(raw, Local::now().date_naive())
    }
}
