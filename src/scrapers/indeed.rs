//! Indeed search-result markup to `SourceRecord`s.

use crate::scrapers::types::SourceRecord;
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::debug;
use url::Url;

pub const BASE_URL: &str = "https://be.indeed.com";

/// Indeed advances `start` by ten per result page
pub const PAGE_STEP: usize = 10;

/// Roughly how many cards one page yields
pub const CARDS_PER_PAGE: usize = 16;

/// Pages needed for `max_results`, at least one.
pub fn pages_for(max_results: usize) -> usize {
    (max_results / CARDS_PER_PAGE).max(1)
}

/// Search URL for one result page (0-based).
pub fn search_url(base: &str, query: &str, location: &str, page: usize) -> Result<String> {
    let start = (page * PAGE_STEP).to_string();
    let url = Url::parse_with_params(
        &format!("{}/jobs", base.trim_end_matches('/')),
        [("q", query), ("l", location), ("start", start.as_str()), ("sort", "date")],
    )?;
    Ok(url.to_string())
}

/// True when the page is an anti-bot interstitial instead of results.
pub fn is_challenge_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("cloudflare") && lower.contains("challenge")
}

struct CardSelectors {
    cards: Selector,
    cards_fallback: Selector,
    title_heading: Selector,
    title_link: Selector,
    title_span: Selector,
    title_fallback: Selector,
    any_link: Selector,
    job_key: Selector,
    company: [Selector; 2],
    location: [Selector; 2],
    description: [Selector; 2],
    salary: [Selector; 2],
    date: [Selector; 2],
}

fn sel(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{}`: {}", css, e))
}

impl CardSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            cards: sel("div.job_seen_beacon")?,
            cards_fallback: sel("td.resultContent")?,
            title_heading: sel("h2.jobTitle")?,
            title_link: sel("a")?,
            title_span: sel("span")?,
            title_fallback: sel("a.jcs-JobTitle")?,
            any_link: sel("a[href]")?,
            job_key: sel("[data-jk]")?,
            company: [sel(r#"span[data-testid="company-name"]"#)?, sel("span.companyName")?],
            location: [sel(r#"div[data-testid="text-location"]"#)?, sel("div.companyLocation")?],
            description: [sel("div.job-snippet")?, sel(r#"div[class*="snippet"]"#)?],
            salary: [sel("div.salary-snippet")?, sel(r#"div[class*="salary"]"#)?],
            date: [sel("span.date")?, sel(r#"span[class*="date"]"#)?],
        })
    }
}

/// Parse every result card on a page. Cards are returned even when they
/// lack a title or link; the normalizer decides what is usable.
pub fn parse_cards(html: &str, base: &str) -> Result<Vec<SourceRecord>> {
    let s = CardSelectors::new()?;
    let document = Html::parse_document(html);

    let mut cards: Vec<ElementRef> = document.select(&s.cards).collect();
    if cards.is_empty() {
        cards = document.select(&s.cards_fallback).collect();
    }
    debug!("Found {} job cards in HTML", cards.len());

    Ok(cards.into_iter().map(|card| parse_card(card, &s, base)).collect())
}

fn parse_card(card: ElementRef, s: &CardSelectors, base: &str) -> SourceRecord {
    let heading = card.select(&s.title_heading).next();

    let title = heading
        .and_then(|h| h.select(&s.title_link).next().or_else(|| h.select(&s.title_span).next()).or(Some(h)))
        .map(text_of)
        .filter(|t| !t.is_empty())
        .or_else(|| card.select(&s.title_fallback).next().map(text_of))
        .unwrap_or_default();

    let href = heading
        .and_then(|h| h.select(&s.title_link).next())
        .and_then(|a| a.value().attr("href"))
        .or_else(|| {
            card.select(&s.any_link)
                .filter_map(|a| a.value().attr("href"))
                .find(|h| h.contains("/rc/clk") || h.contains("/viewjob") || h.contains("/company"))
        });
    let url = href.and_then(|h| absolute_url(base, h));

    let job_key = card
        .select(&s.job_key)
        .next()
        .and_then(|e| e.value().attr("data-jk"))
        .map(str::to_string);

    let company = first_text(card, &s.company).unwrap_or_default();
    let location = first_text(card, &s.location).unwrap_or_default();
    let description = first_text(card, &s.description).unwrap_or_default();
    let salary = first_text(card, &s.salary);
    let posted_date = first_text(card, &s.date);

    let raw = json!({
        "title": title,
        "company": company,
        "location": location,
        "href": href,
        "job_key": job_key,
        "scraped_from": "search_results",
    });

    SourceRecord {
        native_id: None,
        url,
        title,
        company,
        location,
        description,
        posted_date,
        salary,
        contract_type: None,
        scraped_at: None,
        raw: Some(raw),
    }
}

fn first_text(card: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| card.select(sel).next())
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Element text with runs of whitespace collapsed
fn text_of(el: ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn absolute_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div class="job_seen_beacon">
        <h2 class="jobTitle"><a href="/rc/clk?jk=abc123&amp;fccid=9&amp;vjs=3" data-jk="abc123"><span title="Python Developer">Python Developer</span></a></h2>
        <span data-testid="company-name">Acme</span>
        <div data-testid="text-location">Bruxelles</div>
        <div class="job-snippet"><ul><li>Django and FastAPI</li><li>Télétravail partiel</li></ul></div>
        <div class="salary-snippet-container">€3.500 - €4.200 par mois</div>
        <span class="date">Posted 3 days ago</span>
      </div>
      <div class="job_seen_beacon">
        <h2 class="jobTitle"><span>Data Engineer</span></h2>
        <span class="companyName">Globex</span>
        <div class="companyLocation">Gent</div>
        <a href="https://be.indeed.com/viewjob?jk=def456">details</a>
      </div>
      <div class="job_seen_beacon">
        <span class="companyName">No Title Inc</span>
      </div>
    </body></html>
    "#;

    #[test]
    fn parses_cards_with_primary_and_fallback_selectors() {
        let records = parse_cards(PAGE, BASE_URL).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.title, "Python Developer");
        assert_eq!(first.company, "Acme");
        assert_eq!(first.location, "Bruxelles");
        assert_eq!(first.description, "Django and FastAPI Télétravail partiel");
        assert_eq!(first.salary.as_deref(), Some("€3.500 - €4.200 par mois"));
        assert_eq!(first.posted_date.as_deref(), Some("Posted 3 days ago"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://be.indeed.com/rc/clk?jk=abc123&fccid=9&vjs=3")
        );
        assert_eq!(first.raw.as_ref().unwrap()["job_key"], "abc123");

        let second = &records[1];
        assert_eq!(second.title, "Data Engineer");
        assert_eq!(second.company, "Globex");
        assert_eq!(second.location, "Gent");
        assert_eq!(second.url.as_deref(), Some("https://be.indeed.com/viewjob?jk=def456"));
        assert_eq!(second.salary, None);

        assert!(records[2].title.is_empty());
        assert!(records[2].url.is_none());
    }

    #[test]
    fn falls_back_to_result_content_cells() {
        let html = r#"<table><tr><td class="resultContent">
            <a class="jcs-JobTitle" href="/viewjob?jk=1">Tester</a>
        </td></tr></table>"#;
        let records = parse_cards(html, BASE_URL).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Tester");
        assert_eq!(records[0].url.as_deref(), Some("https://be.indeed.com/viewjob?jk=1"));
    }

    #[test]
    fn empty_page_has_no_cards() {
        assert!(parse_cards("<html><body>Aucun résultat</body></html>", BASE_URL)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn builds_search_urls() {
        let url = search_url(BASE_URL, "Python Developer", "Bruxelles", 2).unwrap();
        assert_eq!(url, "https://be.indeed.com/jobs?q=Python+Developer&l=Bruxelles&start=20&sort=date");
        assert_eq!(pages_for(10), 1);
        assert_eq!(pages_for(50), 3);
    }

    #[test]
    fn detects_challenge_page() {
        assert!(is_challenge_page("<title>Just a moment...</title> Cloudflare challenge-platform"));
        assert!(!is_challenge_page(PAGE));
    }
}
