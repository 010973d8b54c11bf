use crate::models::Source;
use thiserror::Error;

/// A source adapter could not be constructed.
///
/// Raised once, while the aggregator is being built. The affected source is
/// left out of the active set for every run.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("{tag}: missing credential `{name}`")]
    MissingCredential { tag: Source, name: &'static str },

    #[error("{tag}: {message}")]
    Invalid { tag: Source, message: String },
}

impl ConfigurationError {
    pub fn source_tag(&self) -> Source {
        match self {
            Self::MissingCredential { tag, .. } | Self::Invalid { tag, .. } => *tag,
        }
    }
}

/// What went wrong inside a single adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterErrorKind {
    #[error("network error")]
    Network,
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("authentication rejected")]
    Auth,
    #[error("unexpected response shape")]
    Parse,
    #[error("browser session error")]
    Browser,
    #[error("timed out")]
    Timeout,
}

/// A failed `search` call on one adapter. Carries the source tag so the
/// aggregator can log it and move on.
#[derive(Debug, Clone, Error)]
#[error("{tag}: {kind}: {message}")]
pub struct AdapterError {
    pub tag: Source,
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(tag: Source, kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            tag,
            kind,
            message: message.into(),
        }
    }

    pub fn network(tag: Source, message: impl Into<String>) -> Self {
        Self::new(tag, AdapterErrorKind::Network, message)
    }

    pub fn parse(tag: Source, message: impl Into<String>) -> Self {
        Self::new(tag, AdapterErrorKind::Parse, message)
    }

    pub fn browser(tag: Source, err: &anyhow::Error) -> Self {
        // {:#} keeps the anyhow context chain on one line
        Self::new(tag, AdapterErrorKind::Browser, format!("{:#}", err))
    }

    pub fn timeout(tag: Source, after: std::time::Duration) -> Self {
        Self::new(
            tag,
            AdapterErrorKind::Timeout,
            format!("no response within {}s", after.as_secs()),
        )
    }

    /// Map a transport error from reqwest into the adapter taxonomy.
    pub fn from_reqwest(tag: Source, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(tag, AdapterErrorKind::Timeout, err.to_string())
        } else if err.is_decode() {
            Self::parse(tag, err.to_string())
        } else if let Some(status) = err.status() {
            Self::new(
                tag,
                AdapterErrorKind::Http {
                    status: status.as_u16(),
                },
                err.to_string(),
            )
        } else {
            Self::network(tag, err.to_string())
        }
    }
}

/// A single source record that does not carry the minimum viable fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataQualityError {
    #[error("{tag}: record has no title")]
    MissingTitle { tag: Source },

    #[error("{tag}: record `{title}` has neither an id nor a URL")]
    MissingIdentifier { tag: Source, title: String },
}

/// Errors that escape `Aggregator::search`. Everything else is contained
/// per source or per record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("aggregation run was cancelled")]
    Cancelled,
}
