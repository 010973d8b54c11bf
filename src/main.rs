use job_scout::pipeline::AggregationReport;
use job_scout::{Aggregator, AggregatorConfig, Credentials, SearchRequest, Source};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const OUTPUT_FILE: &str = "results/belgium_jobs.json";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🇧🇪 Job Scout - Belgian job aggregator");
    info!("======================================");

    let config = match std::env::var("JOB_SCOUT_CONFIG") {
        Ok(path) => AggregatorConfig::from_file(path)?,
        Err(_) => AggregatorConfig::default(),
    };

    let mut request = SearchRequest::new(env_or("JOB_SCOUT_QUERY", "Python Developer"))
        .with_location(env_or("JOB_SCOUT_LOCATION", "Bruxelles"));
    if let Ok(max) = env_or("JOB_SCOUT_MAX_RESULTS", "20").parse::<usize>() {
        request = request.with_max_results(max);
    }
    if let Ok(list) = std::env::var("JOB_SCOUT_SOURCES") {
        let sources: Vec<Source> = list.split(',').filter_map(Source::parse).collect();
        request = request.with_sources(sources);
    }

    let aggregator = Aggregator::from_credentials(&Credentials::from_env(), config);
    for err in aggregator.open().await {
        warn!("{} will retry on search", err);
    }

    // Ctrl-C cancels the run; the browser session is still closed below
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let outcome = aggregator.search_with_cancel(&request, cancel).await;
    aggregator.close().await;
    let result = outcome?;

    for report in &result.source_reports {
        info!("{}: {:?}", report.source, report.status);
    }
    if result.all_sources_failed() {
        warn!("Every source failed; see the errors above");
    }

    for (i, offer) in result.offers.iter().enumerate() {
        println!("{}. {}", i + 1, offer.title);
        println!("   🏢 {}", offer.company);
        println!("   📍 {}", offer.location);
        if let Some(salary) = &offer.salary {
            println!("   💰 {}", salary);
        }
        if offer.remote {
            println!("   🏠 Remote");
        }
        println!("   🔗 {} ({})", offer.url, offer.source);
        println!();
    }

    let stats = &result.statistics;
    info!("📈 Total: {} offers", stats.total);
    for (source, count) in &stats.by_source {
        info!("  - {}: {}", source, count);
    }
    info!("Remote: {} ({}%)", stats.remote_count, stats.remote_pct);
    info!("With salary: {} ({}%)", stats.with_salary_count, stats.salary_pct);

    if result.offers.is_empty() {
        info!("No offers to export");
        return Ok(());
    }

    let json = AggregationReport::new(&request, &result).to_json_pretty()?;
    tokio::fs::create_dir_all("results").await?;
    tokio::fs::write(OUTPUT_FILE, json).await?;
    info!("💾 Saved {} offers to {}", result.offers.len(), OUTPUT_FILE);

    Ok(())
}
