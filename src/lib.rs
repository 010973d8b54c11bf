//! Job offer aggregation for the Belgian market.
//!
//! Each source adapter fetches listings in its own shape; the pipeline maps
//! them onto one `JobOffer` schema, removes postings seen on several sources
//! and summarises the result.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scrapers;

pub use config::{AggregatorConfig, Credentials};
pub use error::{AdapterError, AdapterErrorKind, AggregatorError, ConfigurationError, DataQualityError};
pub use models::{JobOffer, Source};
pub use pipeline::{AggregationReport, AggregationResult, Aggregator, DedupPolicy, SearchRequest, Statistics};
