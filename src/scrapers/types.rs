use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search parameters handed to a single source adapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Free-text keywords
    pub query: String,
    /// Location, already translated into the source's vocabulary
    pub location: String,
    /// Upper bound on records the adapter should return
    pub max_results: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, location: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            max_results,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            location: "Belgique".to_string(),
            max_results: 50,
        }
    }
}

/// A listing as one adapter sees it, before normalization.
///
/// Adapters fill whatever they can; the normalizer decides whether the
/// record is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    /// Stable identifier assigned by the source, if it has one
    pub native_id: Option<String>,
    pub url: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub posted_date: Option<String>,
    pub salary: Option<String>,
    pub contract_type: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    /// Untouched copy of what the source returned
    pub raw: Option<serde_json::Value>,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }

    pub fn with_native_id(mut self, id: impl Into<String>) -> Self {
        self.native_id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_salary(mut self, salary: impl Into<String>) -> Self {
        self.salary = Some(salary.into());
        self
    }
}
