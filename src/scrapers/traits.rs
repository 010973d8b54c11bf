use crate::error::AdapterError;
use crate::models::Source;
use crate::scrapers::types::{SearchParams, SourceRecord};
use async_trait::async_trait;

/// Common trait for all job sources.
/// The aggregator only talks to this, so adding a source (StepStone, Jobat,
/// Forem) never touches the pipeline.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Tag of the source this adapter fetches from
    fn source(&self) -> Source;

    /// Acquire the session handle ahead of the first search
    /// (`Aggregator::open`). `search` acquires it lazily otherwise.
    async fn open(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Fetch listings for one query
    async fn search(&self, params: &SearchParams) -> Result<Vec<SourceRecord>, AdapterError>;

    /// Release the session handle. Idempotent, safe after a failed `open`.
    async fn close(&self) {}
}
