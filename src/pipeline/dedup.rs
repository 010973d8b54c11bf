//! Collapses the same posting seen on several sources.
//!
//! Traversal order decides: the first record with a given key is kept, later
//! ones are dropped, no matter which is more complete. Callers control that
//! order through the source priority.

use crate::models::JobOffer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How strictly two offers must match to count as the same posting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Same lower-cased trimmed title and company. Merges distinct roles that
    /// share a title, misses retitled reposts.
    #[default]
    Exact,
    /// `Exact` plus the same location
    ExactWithLocation,
    /// Same company and a Jaro-Winkler title similarity at or above
    /// `threshold` (0.0 to 1.0)
    Fuzzy { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub offers: Vec<JobOffer>,
    pub duplicates_dropped: usize,
}

fn norm(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Keep the first offer of every group of duplicates, preserving order.
pub fn deduplicate(offers: Vec<JobOffer>, policy: DedupPolicy) -> DedupOutcome {
    let total = offers.len();
    let kept = match policy {
        DedupPolicy::Exact => dedup_by_key(offers, |o| (norm(&o.title), norm(&o.company), String::new())),
        DedupPolicy::ExactWithLocation => {
            dedup_by_key(offers, |o| (norm(&o.title), norm(&o.company), norm(&o.location)))
        }
        DedupPolicy::Fuzzy { threshold } => dedup_fuzzy(offers, threshold),
    };

    let duplicates_dropped = total - kept.len();
    if duplicates_dropped > 0 {
        debug!(duplicates_dropped, "Removed duplicate offers");
    }

    DedupOutcome {
        offers: kept,
        duplicates_dropped,
    }
}

fn dedup_by_key<F>(offers: Vec<JobOffer>, key: F) -> Vec<JobOffer>
where
    F: Fn(&JobOffer) -> (String, String, String),
{
    let mut seen = HashSet::new();
    offers
        .into_iter()
        .filter(|offer| {
            let fresh = seen.insert(key(offer));
            if !fresh {
                debug!("Duplicate dropped: {} @ {} ({})", offer.title, offer.company, offer.source);
            }
            fresh
        })
        .collect()
}

fn dedup_fuzzy(offers: Vec<JobOffer>, threshold: f64) -> Vec<JobOffer> {
    // kept titles, grouped by normalized company
    let mut by_company: HashMap<String, Vec<String>> = HashMap::new();
    let mut kept = Vec::with_capacity(offers.len());

    for offer in offers {
        let title = norm(&offer.title);
        let titles = by_company.entry(norm(&offer.company)).or_default();

        if titles.iter().any(|seen| strsim::jaro_winkler(seen, &title) >= threshold) {
            debug!("Near-duplicate dropped: {} @ {} ({})", offer.title, offer.company, offer.source);
            continue;
        }

        titles.push(title);
        kept.push(offer);
    }

    kept
}
