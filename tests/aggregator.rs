//! End-to-end runs of the aggregation pipeline against in-memory sources.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use job_scout::error::{AdapterError, AdapterErrorKind};
use job_scout::pipeline::{deduplicate, Normalizer, SourceStatus};
use job_scout::scrapers::{JobSource, SearchParams, SourceRecord};
use job_scout::{Aggregator, AggregatorConfig, AggregatorError, DedupPolicy, SearchRequest, Source};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ─────────────────────── helpers ───────────────────────

#[derive(Clone)]
enum Behavior {
    Return(Vec<SourceRecord>),
    ReturnAfter(Duration, Vec<SourceRecord>),
    Fail,
    Hang,
}

/// Scripted source that remembers what it was asked
struct FakeSource {
    source: Source,
    behavior: Behavior,
    calls: Arc<Mutex<Vec<SearchParams>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(source: Source, behavior: Behavior) -> Self {
        Self {
            source,
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl JobSource for FakeSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn open(&self) -> Result<(), AdapterError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Fail => Err(AdapterError::network(self.source, "no session")),
            _ => Ok(()),
        }
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<SourceRecord>, AdapterError> {
        self.calls.lock().unwrap().push(params.clone());
        match &self.behavior {
            Behavior::Return(records) => Ok(records.clone()),
            Behavior::ReturnAfter(delay, records) => {
                tokio::time::sleep(*delay).await;
                Ok(records.clone())
            }
            Behavior::Fail => Err(AdapterError::network(self.source, "connection reset")),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

fn record(id: &str, title: &str, company: &str) -> SourceRecord {
    let mut record = SourceRecord::new(title, company)
        .with_native_id(id)
        .with_location("Brussel");
    record.scraped_at = Some(fixed_time());
    record
}

fn indeed_record(path: &str, title: &str, company: &str) -> SourceRecord {
    let mut record = SourceRecord::new(title, company)
        .with_url(format!("https://be.indeed.com/viewjob?jk={}&from=serp", path))
        .with_location("Bruxelles");
    record.scraped_at = Some(fixed_time());
    record
}

fn aggregator(adapters: Vec<FakeSource>, config: AggregatorConfig) -> Aggregator {
    let boxed: Vec<Box<dyn JobSource>> = adapters
        .into_iter()
        .map(|a| Box::new(a) as Box<dyn JobSource>)
        .collect();
    Aggregator::new(boxed, config)
}

fn titles(offers: &[job_scout::JobOffer]) -> Vec<(&str, Source)> {
    offers.iter().map(|o| (o.title.as_str(), o.source)).collect()
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn duplicate_across_sources_keeps_first_seen() {
    let a = FakeSource::new(
        Source::Vdab,
        Behavior::Return(vec![record("1", "Python Developer", "Acme")]),
    );
    let b = FakeSource::new(
        Source::IndeedBe,
        Behavior::Return(vec![
            indeed_record("x", "python developer", "ACME"),
            indeed_record("y", "Data Engineer", "Acme"),
        ]),
    );

    let result = aggregator(vec![a, b], AggregatorConfig::default())
        .search(&SearchRequest::new("python"))
        .await
        .unwrap();

    assert_eq!(
        titles(&result.offers),
        vec![("Python Developer", Source::Vdab), ("Data Engineer", Source::IndeedBe)]
    );
    assert_eq!(result.statistics.duplicates_dropped, 1);
    assert_eq!(result.statistics.total, 2);
    assert_eq!(result.statistics.count_for(Source::Vdab), 1);
    assert_eq!(result.statistics.count_for(Source::IndeedBe), 1);
}

#[tokio::test]
async fn failing_source_does_not_affect_the_other() {
    let b_records = vec![
        indeed_record("1", "Rust Engineer", "Globex"),
        indeed_record("2", "rust engineer ", "globex"),
        indeed_record("3", "Tester", "Initech"),
    ];
    let a = FakeSource::new(Source::Vdab, Behavior::Fail);
    let b = FakeSource::new(Source::IndeedBe, Behavior::Return(b_records.clone()));

    let result = aggregator(vec![a, b], AggregatorConfig::default())
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap();

    let normalizer = Normalizer::default();
    let expected: Vec<_> = b_records
        .iter()
        .map(|r| normalizer.normalize(Source::IndeedBe, r).unwrap())
        .collect();
    let expected = deduplicate(expected, DedupPolicy::Exact);

    assert_eq!(result.offers, expected.offers);
    assert!(matches!(
        result.source_reports[0].status,
        SourceStatus::Failed { .. }
    ));
    assert_eq!(result.source_reports[0].source, Source::Vdab);
    assert!(result.source_reports[1].succeeded());
    assert!(!result.all_sources_failed());
}

#[tokio::test]
async fn all_sources_failing_is_an_empty_success() {
    let adapters = vec![
        FakeSource::new(Source::Vdab, Behavior::Fail),
        FakeSource::new(Source::IndeedBe, Behavior::Fail),
    ];

    let result = aggregator(adapters, AggregatorConfig::default())
        .search(&SearchRequest::new("anything"))
        .await
        .unwrap();

    assert!(result.offers.is_empty());
    assert_eq!(result.statistics, job_scout::Statistics::default());
    assert!(result.all_sources_failed());
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let agg = aggregator(Vec::new(), AggregatorConfig::default());
    assert_eq!(
        agg.search(&SearchRequest::new("   ")).await.unwrap_err(),
        AggregatorError::EmptyQuery
    );
}

#[tokio::test]
async fn slow_source_times_out_without_sinking_the_run() {
    let a = FakeSource::new(Source::Vdab, Behavior::Hang);
    let b = FakeSource::new(
        Source::IndeedBe,
        Behavior::Return(vec![indeed_record("1", "Developer", "Acme")]),
    );
    let config = AggregatorConfig::default().with_adapter_timeout(Duration::from_secs(1));

    let result = aggregator(vec![a, b], config)
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert_eq!(result.source_reports[0].status, SourceStatus::TimedOut);
    assert_eq!(titles(&result.offers), vec![("Developer", Source::IndeedBe)]);
}

#[tokio::test]
async fn cancellation_returns_nothing() {
    let a = FakeSource::new(
        Source::Vdab,
        Behavior::Return(vec![record("1", "Developer", "Acme")]),
    );
    let b = FakeSource::new(Source::IndeedBe, Behavior::Hang);
    let agg = aggregator(vec![a, b], AggregatorConfig::default());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = agg.search_with_cancel(&SearchRequest::new("dev"), cancel).await;
    assert_eq!(outcome.unwrap_err(), AggregatorError::Cancelled);
}

#[tokio::test]
async fn parallel_merge_follows_priority_not_finish_order() {
    let slow_first = FakeSource::new(
        Source::Vdab,
        Behavior::ReturnAfter(
            Duration::from_millis(200),
            vec![record("1", "Developer", "Acme")],
        ),
    );
    let fast_second = FakeSource::new(
        Source::IndeedBe,
        Behavior::Return(vec![indeed_record("9", "DEVELOPER", "acme")]),
    );
    let config = AggregatorConfig::default().with_parallel(true);

    let result = aggregator(vec![fast_second, slow_first], config)
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert_eq!(titles(&result.offers), vec![("Developer", Source::Vdab)]);
    assert_eq!(result.statistics.duplicates_dropped, 1);
}

#[tokio::test]
async fn custom_priority_changes_the_winner() {
    let vdab = FakeSource::new(Source::Vdab, Behavior::Return(vec![record("1", "Developer", "Acme")]));
    let indeed = FakeSource::new(
        Source::IndeedBe,
        Behavior::Return(vec![indeed_record("9", "Developer", "Acme")]),
    );
    let config = AggregatorConfig::default().with_source_priority(vec![Source::IndeedBe, Source::Vdab]);

    let agg = aggregator(vec![vdab, indeed], config);
    assert_eq!(agg.active_sources(), vec![Source::IndeedBe, Source::Vdab]);

    let result = agg.search(&SearchRequest::new("dev")).await.unwrap();
    assert_eq!(titles(&result.offers), vec![("Developer", Source::IndeedBe)]);
}

#[tokio::test]
async fn deduplication_can_be_switched_off() {
    let a = FakeSource::new(Source::Vdab, Behavior::Return(vec![record("1", "Developer", "Acme")]));
    let b = FakeSource::new(
        Source::IndeedBe,
        Behavior::Return(vec![indeed_record("2", "developer", "ACME")]),
    );
    let config = AggregatorConfig::default().with_deduplication(false);

    let result = aggregator(vec![a, b], config)
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert_eq!(result.offers.len(), 2);
    assert_eq!(result.statistics.duplicates_dropped, 0);
}

#[tokio::test]
async fn location_is_translated_per_source_and_counts_clamped() {
    let a = FakeSource::new(Source::Vdab, Behavior::Return(Vec::new()));
    let b = FakeSource::new(Source::IndeedBe, Behavior::Return(Vec::new()));
    let (a_calls, b_calls) = (a.calls.clone(), b.calls.clone());

    let agg = aggregator(vec![a, b], AggregatorConfig::default());
    agg.search(&SearchRequest::new(" Python ").with_location("Bruxelles").with_max_results(0))
        .await
        .unwrap();

    let a_params = a_calls.lock().unwrap()[0].clone();
    let b_params = b_calls.lock().unwrap()[0].clone();
    assert_eq!(a_params.location, "Brussel");
    assert_eq!(b_params.location, "Bruxelles");
    assert_eq!(a_params.query, "Python");
    assert_eq!(a_params.max_results, 50);

    agg.search(&SearchRequest::new("x").with_max_results(10_000)).await.unwrap();
    assert_eq!(a_calls.lock().unwrap()[1].max_results, 200);
}

#[tokio::test]
async fn source_subset_and_unknown_sources() {
    let a = FakeSource::new(Source::Vdab, Behavior::Return(vec![record("1", "Developer", "Acme")]));
    let a_calls = a.calls.clone();

    // only VDAB is active; Indeed is requested but missing
    let agg = aggregator(vec![a], AggregatorConfig::default());
    let result = agg
        .search(&SearchRequest::new("dev").with_sources(vec![Source::IndeedBe]))
        .await
        .unwrap();

    assert!(result.offers.is_empty());
    assert!(a_calls.lock().unwrap().is_empty());
    assert_eq!(result.source_reports.len(), 1);
    assert!(matches!(
        result.source_reports[0].status,
        SourceStatus::Skipped { .. }
    ));
    assert!(!result.all_sources_failed());
}

#[tokio::test]
async fn unusable_records_are_dropped_and_counted() {
    let mut untitled = record("2", "", "Acme");
    untitled.title = "  ".to_string();
    let mut anonymous = SourceRecord::new("Orphan", "Acme");
    anonymous.scraped_at = Some(fixed_time());

    let a = FakeSource::new(
        Source::Vdab,
        Behavior::Return(vec![record("1", "Developer", "Acme"), untitled, anonymous]),
    );

    let result = aggregator(vec![a], AggregatorConfig::default())
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert_eq!(result.offers.len(), 1);
    assert_eq!(
        result.source_reports[0].status,
        SourceStatus::Completed {
            fetched: 3,
            kept: 1,
            rejected: 2
        }
    );
}

#[tokio::test]
async fn remote_and_salary_statistics() {
    let mut remote = record("1", "Developer", "Acme").with_salary("€4000");
    remote.description = "Télétravail possible".to_string();
    let office = record("2", "Accountant", "Acme");

    let a = FakeSource::new(Source::Vdab, Behavior::Return(vec![remote, office]));
    let result = aggregator(vec![a], AggregatorConfig::default())
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert!(result.offers[0].remote);
    assert!(!result.offers[1].remote);
    assert_eq!(result.statistics.remote_count, 1);
    assert_eq!(result.statistics.remote_pct, 50);
    assert_eq!(result.statistics.with_salary_count, 1);
    assert_eq!(result.statistics.salary_pct, 50);
}

#[tokio::test]
async fn extra_remote_keywords_from_config() {
    let mut record = record("1", "Entwickler", "Acme");
    record.description = "Mobiles Arbeiten".to_string();
    let a = FakeSource::new(Source::Vdab, Behavior::Return(vec![record]));
    let config = AggregatorConfig::default().with_remote_keyword("mobiles arbeiten");

    let result = aggregator(vec![a], config)
        .search(&SearchRequest::new("dev"))
        .await
        .unwrap();

    assert!(result.offers[0].remote);
}

#[tokio::test]
async fn open_reports_failures_and_keeps_sources_active() {
    let a = FakeSource::new(Source::Vdab, Behavior::Return(vec![record("1", "Dev", "Acme")]));
    let b = FakeSource::new(Source::IndeedBe, Behavior::Fail);
    let (a_opened, b_opened) = (a.opened.clone(), b.opened.clone());

    let agg = aggregator(vec![a, b], AggregatorConfig::default());
    let failures = agg.open().await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].tag, Source::IndeedBe);
    assert_eq!(a_opened.load(Ordering::SeqCst), 1);
    assert_eq!(b_opened.load(Ordering::SeqCst), 1);
    assert_eq!(agg.active_sources(), vec![Source::Vdab, Source::IndeedBe]);
}

#[tokio::test]
async fn close_reaches_every_adapter() {
    let a = FakeSource::new(Source::Vdab, Behavior::Fail);
    let b = FakeSource::new(Source::IndeedBe, Behavior::Fail);
    let (a_closed, b_closed) = (a.closed.clone(), b.closed.clone());

    let agg = aggregator(vec![a, b], AggregatorConfig::default());
    agg.close().await;
    agg.close().await;

    assert_eq!(a_closed.load(Ordering::SeqCst), 2);
    assert_eq!(b_closed.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_vdab_credentials_exclude_the_source() {
    let agg = Aggregator::from_credentials(&job_scout::Credentials::default(), AggregatorConfig::default());

    assert_eq!(agg.active_sources(), vec![Source::IndeedBe]);
    assert_eq!(agg.configuration_errors().len(), 1);
    assert_eq!(agg.configuration_errors()[0].source_tag(), Source::Vdab);
}

#[test]
fn adapter_error_carries_context() {
    let err = AdapterError::network(Source::Vdab, "dns failure");
    assert_eq!(err.kind, AdapterErrorKind::Network);
    assert_eq!(err.to_string(), "VDAB: network error: dns failure");

    let http = AdapterError::new(Source::IndeedBe, AdapterErrorKind::Http { status: 503 }, "down");
    assert_eq!(http.to_string(), "Indeed BE: HTTP 503: down");
}

#[test]
fn default_policy_is_exact() {
    assert_eq!(DedupPolicy::default(), DedupPolicy::Exact);
    assert_eq!(AggregatorConfig::default().dedup_policy, DedupPolicy::Exact);
}
