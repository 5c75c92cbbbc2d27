//! Monitored listing pages.

use serde::{Deserialize, Serialize};

use super::ListingSelectors;

/// One monitored listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display name used in logs
    pub name: String,

    /// Listing page URL; relative links are resolved against it
    pub url: String,

    /// Snapshot file, relative to the data directory
    pub output: String,

    /// Headline of the notification, e.g. "Новая вакансия!"
    pub new_label: String,

    /// Label in front of the title, e.g. "Вакансия"
    pub item_label: String,

    /// Link text suffix, e.g. "вакансии" in "Перейти к вакансии"
    pub link_label: String,

    #[serde(default)]
    pub emoji: String,

    #[serde(default)]
    pub selectors: ListingSelectors,
}

impl Target {
    /// Job vacancies listing.
    pub fn vacancies() -> Self {
        Self {
            name: "Вакансии".to_string(),
            url: "https://3ddd.ru/work/vacancies".to_string(),
            output: "vacancies.json".to_string(),
            new_label: "Новая вакансия!".to_string(),
            item_label: "Вакансия".to_string(),
            link_label: "вакансии".to_string(),
            emoji: "💼".to_string(),
            selectors: ListingSelectors::default(),
        }
    }

    /// Freelance tasks listing.
    pub fn tasks() -> Self {
        Self {
            name: "Заказы".to_string(),
            url: "https://3ddd.ru/work/tasks".to_string(),
            output: "tasks.json".to_string(),
            new_label: "Новый заказ!".to_string(),
            item_label: "Заказ".to_string(),
            link_label: "заказу".to_string(),
            emoji: "📋".to_string(),
            selectors: ListingSelectors::default(),
        }
    }
}
