use crate::models::Source;
use crate::pipeline::dedup::DedupPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Env file checked for credentials before the process environment
pub const CREDENTIALS_FILE: &str = "config/credentials/vdab_credentials.env";

/// Credentials for sources that need them, passed explicitly into adapter
/// construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub vdab_client_id: Option<String>,
}

impl Credentials {
    pub fn new(vdab_client_id: Option<String>) -> Self {
        Self {
            vdab_client_id: vdab_client_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Resolve credentials from `CREDENTIALS_FILE`, a local `.env`, then the
    /// process environment. Missing files are fine.
    pub fn from_env() -> Self {
        if dotenvy::from_filename(CREDENTIALS_FILE).is_ok() {
            debug!("Loaded credentials from {}", CREDENTIALS_FILE);
        }
        dotenvy::dotenv().ok();

        Self::new(std::env::var("VDAB_CLIENT_ID").ok())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("vdab_client_id", &self.vdab_client_id.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Pipeline settings shared by every run of one aggregator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Collapse duplicate postings across sources
    pub deduplicate: bool,
    pub dedup_policy: DedupPolicy,
    /// Fetch sources concurrently. Merge order stays `source_priority`.
    pub parallel: bool,
    /// Budget for one adapter call, in seconds
    pub adapter_timeout_secs: u64,
    /// Used when a request asks for zero or no explicit count
    pub default_max_results: usize,
    /// Hard upper bound on results per source
    pub max_results_ceiling: usize,
    /// Merge order of source batches; also the dedup tie-break
    pub source_priority: Vec<Source>,
    /// Extra remote-work keywords appended to the built-in list
    pub remote_keywords: Vec<String>,
    /// Run the Indeed browser without a window
    pub indeed_headless: bool,
    /// Point the VDAB adapter at the training environment
    pub vdab_use_test_env: bool,
    /// Per-request timeout for HTTP adapters, in seconds
    pub request_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            dedup_policy: DedupPolicy::Exact,
            parallel: false,
            adapter_timeout_secs: 120,
            default_max_results: 50,
            max_results_ceiling: 200,
            source_priority: Source::ALL.to_vec(),
            remote_keywords: Vec::new(),
            indeed_headless: true,
            vdab_use_test_env: false,
            request_timeout_secs: 30,
        }
    }
}

impl AggregatorConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the builders would never produce.
    pub fn validate(&self) -> Result<()> {
        if self.adapter_timeout_secs == 0 {
            bail!("adapter_timeout_secs must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if let DedupPolicy::Fuzzy { threshold } = self.dedup_policy {
            if !(0.0..=1.0).contains(&threshold) {
                bail!("fuzzy dedup threshold {} is outside 0.0..=1.0", threshold);
            }
        }
        Ok(())
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve a requested per-source count. Zero or absent means the
    /// default, never "unlimited".
    pub fn effective_max_results(&self, requested: Option<usize>) -> usize {
        let ceiling = self.max_results_ceiling.max(1);
        match requested {
            Some(n) if n > 0 => n.min(ceiling),
            _ => self.default_max_results.clamp(1, ceiling),
        }
    }

    /// Priority position of a source; unlisted sources go last in
    /// `Source::ALL` order.
    pub fn priority_of(&self, source: Source) -> usize {
        self.source_priority
            .iter()
            .position(|s| *s == source)
            .unwrap_or_else(|| {
                self.source_priority.len()
                    + Source::ALL.iter().position(|s| *s == source).unwrap_or(0)
            })
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_source_priority(mut self, priority: Vec<Source>) -> Self {
        self.source_priority = priority;
        self
    }

    pub fn with_remote_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.remote_keywords.push(keyword.into());
        self
    }
}
