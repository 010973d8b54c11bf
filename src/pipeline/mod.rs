pub mod aggregator;
pub mod dedup;
pub mod normalizer;
pub mod report;
pub mod stats;
pub mod vocabulary;

pub use aggregator::{AggregationResult, Aggregator, SearchRequest, SourceReport, SourceStatus};
pub use dedup::{deduplicate, DedupOutcome, DedupPolicy};
pub use normalizer::Normalizer;
pub use report::AggregationReport;
pub use stats::Statistics;
pub use vocabulary::{LocationVocabulary, RemoteKeywords};
