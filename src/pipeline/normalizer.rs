//! Maps source records onto the canonical `JobOffer`.

use crate::error::DataQualityError;
use crate::models::{JobOffer, Source};
use crate::pipeline::vocabulary::{LocationVocabulary, RemoteKeywords};
use crate::scrapers::types::SourceRecord;
use chrono::Utc;
use sha2::{Digest, Sha256};
use url::Url;

/// Descriptions are capped at this many characters
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Query parameters that only track the click, never identify the posting
const TRACKING_PARAMS: &[&str] = &[
    "from", "vjs", "tk", "advn", "adid", "sjdu", "fccid", "gclid", "fbclid", "mc_cid",
    "mc_eid", "xpse", "xfps", "xkcb",
];

/// Pure mapping from adapter output to canonical offers.
#[derive(Debug, Clone)]
pub struct Normalizer {
    remote_keywords: RemoteKeywords,
    dutch: LocationVocabulary,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(RemoteKeywords::default())
    }
}

impl Normalizer {
    pub fn new(remote_keywords: RemoteKeywords) -> Self {
        Self {
            remote_keywords,
            dutch: LocationVocabulary::dutch(),
        }
    }

    pub fn remote_keywords(&self) -> &RemoteKeywords {
        &self.remote_keywords
    }

    /// Translate a user-facing location into what `source` searches on.
    pub fn search_location(&self, source: Source, location: &str) -> String {
        match source {
            Source::Vdab => self.dutch.translate(location),
            Source::IndeedBe => location.to_string(),
        }
    }

    /// Map one record. Fails when the record has no title, or neither a
    /// native id nor a URL.
    pub fn normalize(&self, source: Source, record: &SourceRecord) -> Result<JobOffer, DataQualityError> {
        let title = record.title.trim();
        if title.is_empty() {
            return Err(DataQualityError::MissingTitle { tag: source });
        }

        let native_id = non_blank(record.native_id.as_deref());
        let url = non_blank(record.url.as_deref()).map(canonical_url);

        let (id, url) = match (native_id, url) {
            (Some(native), url) => (
                format!("{}_{}", source.prefix(), native),
                url.unwrap_or_else(|| listing_url(source, native)),
            ),
            (None, Some(url)) => (format!("{}_{}", source.prefix(), url_hash(&url)), url),
            (None, None) => {
                return Err(DataQualityError::MissingIdentifier {
                    tag: source,
                    title: title.to_string(),
                })
            }
        };

        let company = match record.company.trim() {
            "" => "N/A",
            company => company,
        };
        let location = record.location.trim();
        let description = record.description.trim();
        // matched on the full text, before the cap
        let remote = self.remote_keywords.matches(title, description, location);
        let description = truncate_chars(description, MAX_DESCRIPTION_CHARS);

        Ok(JobOffer {
            id,
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            description,
            url,
            source,
            posted_date: non_blank(record.posted_date.as_deref()).map(str::to_string),
            salary: non_blank(record.salary.as_deref()).map(str::to_string),
            contract_type: non_blank(record.contract_type.as_deref()).map(str::to_string),
            remote,
            scraped_at: record.scraped_at.unwrap_or_else(Utc::now),
            raw_data: record.raw.clone(),
        })
    }
}

/// Drop tracking query parameters and the fragment. Anything that does not
/// parse as a URL is returned trimmed.
pub fn canonical_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

/// First 16 hex chars of the SHA-256 of a URL
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..8])
}

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

fn listing_url(source: Source, native_id: &str) -> String {
    match source {
        Source::Vdab => format!("https://www.vdab.be/vindeenjob/vacatures/{}", native_id),
        Source::IndeedBe => format!("https://be.indeed.com/viewjob?jk={}", native_id),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
