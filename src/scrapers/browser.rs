use crate::config::AggregatorConfig;
use crate::error::AdapterError;
use crate::models::Source;
use crate::scrapers::indeed::{self, BASE_URL};
use crate::scrapers::traits::JobSource;
use crate::scrapers::types::{SearchParams, SourceRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Indeed Belgium through a headless Chrome session.
///
/// The browser is launched on first use and kept for later searches. The
/// session lock is held by the blocking worker itself, so a search whose
/// future was dropped still owns the browser until its worker returns.
pub struct IndeedAdapter {
    headless: bool,
    base_url: String,
    page_delay: Duration,
    session: Arc<Mutex<Option<Browser>>>,
}

impl IndeedAdapter {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            headless: config.indeed_headless,
            base_url: BASE_URL.to_string(),
            page_delay: Duration::from_secs(5),
            session: Arc::new(Mutex::new(None)),
        }
    }

    fn launch(headless: bool) -> Result<Browser> {
        info!("Launching Chrome (headless: {})...", headless);

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .context("Failed to build launch options")?;

        Browser::new(options).context("Failed to launch Chrome browser")
    }

    /// Handle to the running browser, launching it if needed. Blocking.
    fn browser(headless: bool, session: &mut Option<Browser>) -> Result<Browser> {
        if let Some(browser) = session.as_ref() {
            return Ok(browser.clone());
        }

        let browser = Self::launch(headless)?;
        *session = Some(browser.clone());
        Ok(browser)
    }
}

/// Run blocking `work` on the locked session. The guard moves into the
/// worker, so the lock is only released once `work` returns, even when the
/// awaiting future is dropped first.
async fn with_session<S, T, F>(guard: OwnedMutexGuard<S>, work: F) -> Result<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut S) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = guard;
        work(&mut *guard)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e).context("Scrape worker panicked"))?
}

/// Sets the abort flag when dropped, which happens when the caller stops
/// polling the search (timeout, cancellation).
struct AbortOnDrop(Arc<AtomicBool>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobSource for IndeedAdapter {
    fn source(&self) -> Source {
        Source::IndeedBe
    }

    async fn open(&self) -> Result<(), AdapterError> {
        let headless = self.headless;
        let guard = self.session.clone().lock_owned().await;
        with_session(guard, move |session| Self::browser(headless, session).map(|_| ()))
            .await
            .map_err(|e| AdapterError::browser(Source::IndeedBe, &e))
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<SourceRecord>, AdapterError> {
        info!("🚀 Indeed BE scrape: '{}' in {}", params.query, params.location);

        // one search per browser at a time, released by the worker
        let guard = self.session.clone().lock_owned().await;

        let abort = Arc::new(AtomicBool::new(false));
        let _abort_on_drop = AbortOnDrop(abort.clone());

        let headless = self.headless;
        let job = PageJob {
            base_url: self.base_url.clone(),
            params: params.clone(),
            page_delay: self.page_delay,
        };

        let outcome = with_session(guard, move |session| {
            let result = Self::browser(headless, session).and_then(|browser| job.run(&browser, &abort));
            if result.is_err() {
                // a broken session is not reused
                *session = None;
            }
            result
        })
        .await;

        match outcome {
            Ok(records) => {
                info!("🎉 Indeed BE scrape finished: {} offers", records.len());
                Ok(records)
            }
            Err(err) => Err(AdapterError::browser(Source::IndeedBe, &err)),
        }
    }

    /// Waits for a running worker before dropping the browser.
    async fn close(&self) {
        if self.session.lock().await.take().is_some() {
            info!("Chrome session closed");
        }
    }
}

/// Everything the blocking worker needs, owned
struct PageJob {
    base_url: String,
    params: SearchParams,
    page_delay: Duration,
}

impl PageJob {
    fn run(self, browser: &Browser, abort: &AtomicBool) -> Result<Vec<SourceRecord>> {
        let tab = browser.new_tab().context("Failed to open tab")?;
        let result = self.scrape_pages(&tab, abort);

        if let Err(e) = tab.close(true) {
            debug!("Tab close failed: {}", e);
        }
        result
    }

    fn scrape_pages(&self, tab: &Tab, abort: &AtomicBool) -> Result<Vec<SourceRecord>> {
        let max_pages = indeed::pages_for(self.params.max_results);
        let mut records = Vec::new();

        for page in 0..max_pages {
            if abort.load(Ordering::SeqCst) {
                info!("Scrape aborted before page {}", page + 1);
                break;
            }

            let url = indeed::search_url(&self.base_url, &self.params.query, &self.params.location, page)?;
            info!("📄 Page {}/{}: {}", page + 1, max_pages, url);

            let html = match load_page(tab, &url, page == 0) {
                Ok(html) => html,
                // nothing loaded at all means the session is unusable
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!("Error on page {}: {:#}", page + 1, e);
                    continue;
                }
            };

            let found = indeed::parse_cards(&html, &self.base_url)?;
            if found.is_empty() {
                warn!("No offers found on page {}", page + 1);
                if page == 0 {
                    break;
                }
            } else {
                info!("✅ {} offers on page {}", found.len(), page + 1);
                records.extend(found);
            }

            if records.len() >= self.params.max_results || page + 1 == max_pages {
                break;
            }
            if !pause(self.page_delay, abort) {
                break;
            }
        }

        records.truncate(self.params.max_results);
        Ok(records)
    }
}

fn load_page(tab: &Tab, url: &str, first: bool) -> Result<String> {
    tab.navigate_to(url)
        .context("Failed to navigate")?
        .wait_until_navigated()
        .context("Navigation did not finish")?;

    // Accept cookies if present
    if first {
        let _ = tab.evaluate(
            r#"
            const button = document.querySelector('#onetrust-accept-btn-handler, button[id*="accept"]');
            if (button) button.click();
            "#,
            false,
        );
    }

    if tab
        .wait_for_element_with_custom_timeout(".job_seen_beacon", Duration::from_secs(10))
        .is_err()
    {
        warn!("⏱️ Job cards did not appear in time");
    }

    let mut html = tab.get_content().context("Failed to read page HTML")?;
    if indeed::is_challenge_page(&html) {
        warn!("⚠️ Anti-bot challenge detected, waiting...");
        thread::sleep(Duration::from_secs(8));
        html = tab.get_content().context("Failed to read page HTML")?;
    }

    debug!("Downloaded {} bytes of HTML", html.len());
    Ok(html)
}

/// Sleep in short steps so an abort is noticed quickly. False if aborted.
fn pause(total: Duration, abort: &AtomicBool) -> bool {
    let step = Duration::from_millis(250);
    let mut waited = Duration::ZERO;
    while waited < total {
        if abort.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(step);
        waited += step;
    }
    !abort.load(Ordering::SeqCst)
}
