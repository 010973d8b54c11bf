use crate::config::{AggregatorConfig, Credentials};
use crate::error::{AdapterError, AggregatorError, ConfigurationError};
use crate::models::{JobOffer, Source};
use crate::pipeline::dedup::deduplicate;
use crate::pipeline::normalizer::Normalizer;
use crate::pipeline::stats::Statistics;
use crate::pipeline::vocabulary::RemoteKeywords;
use crate::scrapers::traits::JobSource;
use crate::scrapers::types::SearchParams;
use crate::scrapers::{IndeedAdapter, VdabAdapter};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One aggregated search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    /// `None` or zero means the configured default
    pub max_results_per_source: Option<usize>,
    /// `None` means every active source
    pub sources: Option<Vec<Source>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: "Belgique".to_string(),
            max_results_per_source: None,
            sources: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results_per_source = Some(max);
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// How one source fared during a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Completed {
        fetched: usize,
        kept: usize,
        /// Records dropped for missing title or identifier
        rejected: usize,
    },
    Failed {
        error: String,
    },
    TimedOut,
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReport {
    pub source: Source,
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, SourceStatus::Completed { .. })
    }
}

/// Final offers of a run, with statistics and per-source outcome
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub offers: Vec<JobOffer>,
    pub statistics: Statistics,
    pub source_reports: Vec<SourceReport>,
}

impl AggregationResult {
    /// True when at least one source was attempted and none completed.
    pub fn all_sources_failed(&self) -> bool {
        let attempted: Vec<_> = self
            .source_reports
            .iter()
            .filter(|r| !matches!(r.status, SourceStatus::Skipped { .. }))
            .collect();
        !attempted.is_empty() && attempted.iter().all(|r| !r.succeeded())
    }
}

struct SourceBatch {
    report: SourceReport,
    offers: Vec<JobOffer>,
}

/// Runs the fetch, normalize, deduplicate and count pipeline over a fixed
/// set of adapters.
pub struct Aggregator {
    /// Sorted by `config.source_priority`
    adapters: Vec<Box<dyn JobSource>>,
    config: AggregatorConfig,
    normalizer: Normalizer,
    unavailable: Vec<ConfigurationError>,
}

impl Aggregator {
    pub fn new(mut adapters: Vec<Box<dyn JobSource>>, config: AggregatorConfig) -> Self {
        adapters.sort_by_key(|a| config.priority_of(a.source()));

        let mut keywords = RemoteKeywords::default();
        keywords.extend(&config.remote_keywords);

        Self {
            adapters,
            normalizer: Normalizer::new(keywords),
            config,
            unavailable: Vec::new(),
        }
    }

    /// Build the stock adapters. Sources whose construction fails are left
    /// out and remembered in `configuration_errors`.
    pub fn from_credentials(credentials: &Credentials, config: AggregatorConfig) -> Self {
        let mut adapters: Vec<Box<dyn JobSource>> = Vec::new();
        let mut unavailable = Vec::new();

        match VdabAdapter::new(credentials, &config) {
            Ok(vdab) => {
                info!("✅ VDAB API available");
                adapters.push(Box::new(vdab));
            }
            Err(err) => {
                warn!("⚠️ VDAB API unavailable: {}", err);
                unavailable.push(err);
            }
        }

        adapters.push(Box::new(IndeedAdapter::new(&config)));
        info!("✅ Indeed BE scraper initialised");

        let mut aggregator = Self::new(adapters, config);
        aggregator.unavailable = unavailable;
        aggregator
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Sources that can be searched, in merge order
    pub fn active_sources(&self) -> Vec<Source> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        &self.unavailable
    }

    /// Run the whole pipeline once. Source failures are contained; only an
    /// empty query is an error.
    pub async fn search(&self, request: &SearchRequest) -> Result<AggregationResult, AggregatorError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AggregatorError::EmptyQuery);
        }

        let max_results = self.config.effective_max_results(request.max_results_per_source);
        let (selected, mut reports) = self.select(request.sources.as_deref());

        info!("🔍 Aggregated search: '{}' in {}", query, request.location);
        info!(
            "📊 Active sources: {}",
            selected.iter().map(|a| a.source().label()).collect::<Vec<_>>().join(", ")
        );

        let runs = selected.iter().map(|&adapter| {
            let source = adapter.source();
            let params = SearchParams::new(
                query,
                self.normalizer.search_location(source, &request.location),
                max_results,
            );
            async move { self.run_source(adapter, params).await }
        });

        // join_all yields in input order, so the merge order is the priority
        // order either way
        let batches: Vec<SourceBatch> = if self.config.parallel {
            join_all(runs).await
        } else {
            let mut batches = Vec::with_capacity(selected.len());
            for run in runs {
                batches.push(run.await);
            }
            batches
        };

        let mut offers = Vec::new();
        let mut source_reports = Vec::with_capacity(batches.len() + reports.len());
        for batch in batches {
            offers.extend(batch.offers);
            source_reports.push(batch.report);
        }
        source_reports.append(&mut reports);

        let mut duplicates_dropped = 0;
        if self.config.deduplicate && !offers.is_empty() {
            let outcome = deduplicate(offers, self.config.dedup_policy);
            offers = outcome.offers;
            duplicates_dropped = outcome.duplicates_dropped;
            if duplicates_dropped > 0 {
                info!("  🗑️ {} duplicates removed", duplicates_dropped);
            }
            info!("🔄 After deduplication: {} unique offers", offers.len());
        }

        let statistics = Statistics::compute(&offers, duplicates_dropped);
        info!("🎉 Total: {} offers", statistics.total);

        Ok(AggregationResult {
            offers,
            statistics,
            source_reports,
        })
    }

    /// `search`, abandoned as soon as `cancel` fires. In-flight adapter calls
    /// are dropped and nothing from the run is returned.
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> Result<AggregationResult, AggregatorError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Aggregated search cancelled");
                Err(AggregatorError::Cancelled)
            }
            result = self.search(request) => result,
        }
    }

    /// Acquire every adapter's session up front. Sources that fail to open
    /// stay active; their next `search` tries again and reports the outcome.
    pub async fn open(&self) -> Vec<AdapterError> {
        let mut failures = Vec::new();
        for adapter in &self.adapters {
            match adapter.open().await {
                Ok(()) => debug!(source = %adapter.source(), "Source opened"),
                Err(err) => {
                    warn!(source = %adapter.source(), "Could not open {}: {}", adapter.source(), err);
                    failures.push(err);
                }
            }
        }
        failures
    }

    /// Release every adapter's session. Safe to call more than once.
    pub async fn close(&self) {
        for adapter in &self.adapters {
            adapter.close().await;
        }
        debug!("All sources closed");
    }

    fn select(&self, requested: Option<&[Source]>) -> (Vec<&dyn JobSource>, Vec<SourceReport>) {
        let all = self.adapters.iter().map(|a| &**a);
        let Some(requested) = requested else {
            return (all.collect(), Vec::new());
        };

        let selected = all.filter(|a| requested.contains(&a.source())).collect();

        let mut skipped: Vec<SourceReport> = Vec::new();
        for source in requested {
            let active = self.adapters.iter().any(|a| a.source() == *source);
            if !active && !skipped.iter().any(|r| r.source == *source) {
                let reason = self
                    .unavailable
                    .iter()
                    .find(|e| e.source_tag() == *source)
                    .map_or_else(|| "source not configured".to_string(), |e| e.to_string());
                warn!(source = %source, "Requested source is not available: {}", reason);
                skipped.push(SourceReport {
                    source: *source,
                    status: SourceStatus::Skipped { reason },
                });
            }
        }

        (selected, skipped)
    }

    async fn run_source(&self, adapter: &dyn JobSource, params: SearchParams) -> SourceBatch {
        let source = adapter.source();
        let budget = self.config.adapter_timeout();
        debug!(source = %source, location = %params.location, max = params.max_results, "Querying source");

        let mut records = match tokio::time::timeout(budget, adapter.search(&params)).await {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                error!(source = %source, "  ❌ {} error: {}", source, err);
                return SourceBatch {
                    report: SourceReport {
                        source,
                        status: SourceStatus::Failed {
                            error: err.to_string(),
                        },
                    },
                    offers: Vec::new(),
                };
            }
            Err(_) => {
                error!(source = %source, "  ⏱️ {} gave no answer within {}s", source, budget.as_secs());
                return SourceBatch {
                    report: SourceReport {
                        source,
                        status: SourceStatus::TimedOut,
                    },
                    offers: Vec::new(),
                };
            }
        };

        records.truncate(params.max_results);
        let fetched = records.len();

        let mut offers = Vec::with_capacity(fetched);
        for record in &records {
            match self.normalizer.normalize(source, record) {
                Ok(offer) => offers.push(offer),
                Err(err) => debug!("Record skipped: {}", err),
            }
        }

        let kept = offers.len();
        info!(source = %source, "  ✅ {}: {} offers", source, kept);

        SourceBatch {
            report: SourceReport {
                source,
                status: SourceStatus::Completed {
                    fetched,
                    kept,
                    rejected: fetched - kept,
                },
            },
            offers,
        }
    }
}
