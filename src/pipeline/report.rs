//! Serializable snapshot of one run, laid out for downstream tooling.
//! Field names here are a stable contract.

use crate::models::JobOffer;
use crate::pipeline::aggregator::{AggregationResult, SearchRequest, SourceReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub query: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub total_offers: usize,
    /// Source labels present in the offers, in merge order
    pub sources: Vec<String>,
    pub source_reports: Vec<SourceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStatistics {
    pub by_source: BTreeMap<String, usize>,
    pub remote_count: usize,
    pub with_salary: usize,
    pub remote_pct: usize,
    pub salary_pct: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport<'a> {
    pub metadata: ReportMetadata,
    pub statistics: ReportStatistics,
    pub offers: &'a [JobOffer],
}

impl<'a> AggregationReport<'a> {
    pub fn new(request: &SearchRequest, result: &'a AggregationResult) -> Self {
        Self::at(request, result, Utc::now())
    }

    pub fn at(request: &SearchRequest, result: &'a AggregationResult, timestamp: DateTime<Utc>) -> Self {
        let stats = &result.statistics;

        Self {
            metadata: ReportMetadata {
                query: request.query.clone(),
                location: request.location.clone(),
                timestamp,
                total_offers: stats.total,
                sources: stats.by_source.iter().map(|(s, _)| s.label().to_string()).collect(),
                source_reports: result.source_reports.clone(),
            },
            statistics: ReportStatistics {
                by_source: stats
                    .by_source
                    .iter()
                    .map(|(s, n)| (s.label().to_string(), *n))
                    .collect(),
                remote_count: stats.remote_count,
                with_salary: stats.with_salary_count,
                remote_pct: stats.remote_pct,
                salary_pct: stats.salary_pct,
                duplicates_dropped: stats.duplicates_dropped,
            },
            offers: &result.offers,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
