//! Fixed word lists the normalizer works with: location names across
//! language vocabularies, and remote-work keywords.

use std::collections::HashMap;

/// Substitution table from one naming convention to the one a source's
/// search accepts.
#[derive(Debug, Clone, Default)]
pub struct LocationVocabulary {
    entries: HashMap<String, String>,
}

impl LocationVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// French and English Belgian place names to the Dutch ones VDAB searches on
    pub fn dutch() -> Self {
        [
            ("bruxelles", "Brussel"),
            ("brussels", "Brussel"),
            ("anvers", "Antwerpen"),
            ("antwerp", "Antwerpen"),
            ("gand", "Gent"),
            ("ghent", "Gent"),
            ("louvain", "Leuven"),
            ("liège", "Luik"),
            ("liege", "Luik"),
            ("malines", "Mechelen"),
            ("bruges", "Brugge"),
            ("courtrai", "Kortrijk"),
            ("belgique", "Vlaanderen"),
            ("belgium", "Vlaanderen"),
            ("flandre", "Vlaanderen"),
            ("flanders", "Vlaanderen"),
        ]
        .into_iter()
        .fold(Self::new(), |vocab, (from, to)| vocab.with_entry(from, to))
    }

    pub fn with_entry(mut self, from: &str, to: impl Into<String>) -> Self {
        self.entries.insert(Self::key(from), to.into());
        self
    }

    /// Translate a location. Unknown names come back unchanged.
    pub fn translate(&self, location: &str) -> String {
        self.entries
            .get(&Self::key(location))
            .cloned()
            .unwrap_or_else(|| location.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(location: &str) -> String {
        location.trim().to_lowercase()
    }
}

/// Keywords that mark an offer as remote-friendly, in every language the
/// deployment cares about.
#[derive(Debug, Clone)]
pub struct RemoteKeywords {
    keywords: Vec<String>,
}

impl RemoteKeywords {
    pub const DEFAULT: &'static [&'static str] = &[
        "remote",
        "télétravail",
        "teletravail",
        "thuiswerk",
        "telewerk",
        "work from home",
        "homeoffice",
        "home office",
    ];

    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self { keywords: Vec::new() };
        list.extend(keywords);
        list
    }

    pub fn extend<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
    }

    /// True when any keyword occurs in the lower-cased title, description
    /// and location.
    pub fn matches(&self, title: &str, description: &str, location: &str) -> bool {
        let haystack = format!("{} {} {}", title, description, location).to_lowercase();
        self.keywords.iter().any(|kw| haystack.contains(kw.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for RemoteKeywords {
    fn default() -> Self {
        Self::new(Self::DEFAULT.iter().copied())
    }
}
