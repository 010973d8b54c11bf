use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of the job listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    /// Flemish public employment service, open-services REST API
    #[serde(rename = "VDAB", alias = "vdab")]
    Vdab,
    /// Indeed Belgium, scraped through a browser session
    #[serde(rename = "Indeed BE", alias = "indeed")]
    IndeedBe,
}

impl Source {
    /// Every known source, in the default merge priority.
    pub const ALL: [Source; 2] = [Source::Vdab, Source::IndeedBe];

    /// Human-readable label, used in statistics and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Vdab => "VDAB",
            Source::IndeedBe => "Indeed BE",
        }
    }

    /// Prefix for canonical ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            Source::Vdab => "vdab",
            Source::IndeedBe => "indeed",
        }
    }

    /// Accepts a prefix or a label, case-insensitively.
    pub fn parse(value: &str) -> Option<Source> {
        let value = value.trim();
        Source::ALL
            .into_iter()
            .find(|s| s.prefix().eq_ignore_ascii_case(value) || s.label().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical job offer, the same shape whatever source it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobOffer {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: Source,
    pub posted_date: Option<String>,
    pub salary: Option<String>,
    pub contract_type: Option<String>,
    pub remote: bool,
    pub scraped_at: DateTime<Utc>,
    /// Original source record, for debugging only. Not exported.
    #[serde(skip)]
    pub raw_data: Option<serde_json::Value>,
}

impl JobOffer {
    /// True when a salary text is present and not blank.
    pub fn has_salary(&self) -> bool {
        self.salary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}
