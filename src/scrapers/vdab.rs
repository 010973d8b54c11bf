use crate::config::{AggregatorConfig, Credentials};
use crate::error::{AdapterError, AdapterErrorKind, ConfigurationError};
use crate::models::Source;
use crate::scrapers::traits::JobSource;
use crate::scrapers::types::{SearchParams, SourceRecord};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const BASE_URL_PROD: &str = "https://openservices.vdab.be";
pub const BASE_URL_TEST: &str = "https://openservices-trn.vdab.be";
const VACANCIES_ENDPOINT: &str = "/vacature/v4/vacatures";

/// The API refuses larger pages
const MAX_PAGE_SIZE: usize = 100;

/// VDAB open-services vacancy API (Flanders)
pub struct VdabAdapter {
    client: Client,
    base_url: String,
}

impl VdabAdapter {
    /// Fails when no client id was resolved.
    pub fn new(credentials: &Credentials, config: &AggregatorConfig) -> Result<Self, ConfigurationError> {
        let client_id = credentials
            .vdab_client_id
            .as_deref()
            .ok_or(ConfigurationError::MissingCredential {
                tag: Source::Vdab,
                name: "VDAB_CLIENT_ID",
            })?;

        let base_url = if config.vdab_use_test_env {
            BASE_URL_TEST
        } else {
            BASE_URL_PROD
        };

        Self::with_base_url(client_id, base_url, config.request_timeout())
    }

    /// Create an adapter against any base URL
    pub fn with_base_url(
        client_id: &str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::Invalid {
            tag: Source::Vdab,
            message,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-IBM-Client-Id",
            HeaderValue::from_str(client_id).map_err(|e| invalid(format!("client id: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| invalid(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("VDAB adapter ready ({})", base_url);

        Ok(Self { client, base_url })
    }

    fn query_params(params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", params.max_results.clamp(1, MAX_PAGE_SIZE).to_string())];
        if !params.query.trim().is_empty() {
            query.push(("q", params.query.trim().to_string()));
        }
        if !params.location.trim().is_empty() {
            query.push(("plaats", params.location.trim().to_string()));
        }
        query.push(("sorteer", "publicatiedatum:desc".to_string()));
        query
    }

    /// Fetch one vacancy by its VDAB id. `None` when the API does not know it.
    pub async fn vacancy(&self, id: &str) -> Result<Option<SourceRecord>, AdapterError> {
        let url = format!("{}{}/{}", self.base_url, VACANCIES_ENDPOINT, id.trim());
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(Source::Vdab, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("VDAB vacancy {} not found", id);
            return Ok(None);
        }
        let response = check_status(response).await?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(Source::Vdab, e.to_string()))?;

        Ok(parse_vacancy(&data))
    }
}

/// Map a non-success response onto the adapter error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("VDAB returned status: {}", status);
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterErrorKind::Auth,
        _ => AdapterErrorKind::Http {
            status: status.as_u16(),
        },
    };
    let snippet: String = body.chars().take(500).collect();
    Err(AdapterError::new(Source::Vdab, kind, snippet))
}

#[async_trait]
impl JobSource for VdabAdapter {
    fn source(&self) -> Source {
        Source::Vdab
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<SourceRecord>, AdapterError> {
        info!("🔍 VDAB search: '{}' in {}", params.query, params.location);

        let url = format!("{}{}", self.base_url, VACANCIES_ENDPOINT);
        let query = Self::query_params(params);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(Source::Vdab, e))?;

        let response = check_status(response).await?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::parse(Source::Vdab, e.to_string()))?;

        let mut records = parse_response(&data)?;
        records.truncate(params.max_results);

        info!("✅ {} VDAB offers found", records.len());
        Ok(records)
    }
}

/// Pull vacancies out of a search response body.
pub fn parse_response(data: &Value) -> Result<Vec<SourceRecord>, AdapterError> {
    let Some(body) = data.as_object() else {
        return Err(AdapterError::parse(Source::Vdab, "response body is not a JSON object"));
    };

    let vacancies = ["vacatures", "items"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(vacancies
        .iter()
        .filter_map(|v| {
            let record = parse_vacancy(v);
            if record.is_none() {
                debug!("Skipping malformed vacancy: {}", v);
            }
            record
        })
        .collect())
}

/// One vacancy, with the field fallbacks the API is known to need.
/// Returns `None` only when the entry is not an object.
fn parse_vacancy(vacancy: &Value) -> Option<SourceRecord> {
    vacancy.as_object()?;

    let native_id = first_text(vacancy, &["id", "vacaturenummer"]);
    let title = first_text(vacancy, &["titel", "functienaam"]).unwrap_or_default();

    let company = match vacancy.get("werkgever") {
        Some(Value::Object(employer)) => match employer.get("naam") {
            Some(Value::Object(inner)) => inner.get("naam").and_then(text),
            Some(name) => text(name),
            None => None,
        },
        Some(other) => text(other),
        None => None,
    }
    .unwrap_or_default();

    let location = ["werklocatie", "plaats"]
        .iter()
        .find_map(|key| match vacancy.get(*key) {
            Some(Value::Object(place)) => place.get("gemeente").and_then(text),
            Some(Value::Null) | None => None,
            Some(other) => text(other),
        })
        .unwrap_or_default();

    let description = ["omschrijving", "functiebeschrijving"]
        .iter()
        .find_map(|key| match vacancy.get(*key) {
            Some(Value::Object(body)) => body.get("tekst").and_then(text),
            Some(other) => text(other),
            None => None,
        })
        .unwrap_or_default();

    Some(SourceRecord {
        native_id,
        url: first_text(vacancy, &["url"]),
        title,
        company,
        location,
        description,
        posted_date: first_text(vacancy, &["publicatiedatum", "aanmaakdatum"]),
        salary: vacancy
            .get("salaris")
            .and_then(|s| s.get("omschrijving"))
            .and_then(text),
        contract_type: first_text(vacancy, &["contractType", "type"]),
        scraped_at: None,
        raw: Some(vacancy.clone()),
    })
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| value.get(*key).and_then(text))
}

/// Strings and numbers as text; anything else, or blank, is absent.
fn text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
