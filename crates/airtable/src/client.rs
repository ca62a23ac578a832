//! HTTP client for the Airtable record API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::AirtableConfig;
use crate::error::{AirtableError, Result};
use crate::formula::filter_formula_eq;
use crate::models::{Fields, ListQuery, Record};

/// Airtable accepts at most ten records per create request.
const MAX_RECORDS_PER_WRITE: usize = 10;

/// Airtable record API client.
///
/// Cloning is cheap; clones share the HTTP connection pool and the request pacing.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: Url,
    base_id: String,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    fields: &'a Fields,
    typecast: bool,
}

#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    fields: &'a Fields,
}

#[derive(Debug, Serialize)]
struct BatchCreateRequest<'a> {
    records: Vec<NewRecord<'a>>,
    typecast: bool,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    offset: Option<String>,
}

/// Airtable error bodies come in two shapes:
/// `{"error": {"type": "...", "message": "..."}}` and `{"error": "NOT_FOUND"}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        message: Option<String>,
    },
    Code(String),
}

impl AirtableClient {
    /// Create a client from a config.
    ///
    /// # Errors
    /// Returns an error if the API key is not a valid header value, the API
    /// URL cannot be parsed, or the HTTP client cannot be built.
    pub fn new(config: AirtableConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let api_url = Url::parse(&config.api_url)
            .map_err(|e| AirtableError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if api_url.cannot_be_a_base() {
            return Err(AirtableError::InvalidUrl(config.api_url));
        }

        debug!(base_id = %config.base_id, api_url = %api_url, "Airtable client initialized");

        Ok(Self {
            http,
            api_url,
            base_id: config.base_id,
            min_interval: config.min_request_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    /// Create a client from `AIRTABLE_*` environment variables.
    ///
    /// # Errors
    /// See [`AirtableConfig::from_env`] and [`AirtableClient::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(AirtableConfig::from_env()?)
    }

    /// Base this client operates on.
    #[must_use]
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    fn table_url(&self, table: &str, record_id: Option<&str>) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| AirtableError::InvalidUrl(self.api_url.to_string()))?;
            segments.pop_if_empty().push(&self.base_id).push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, target: &str) -> Result<T> {
        self.throttle().await;

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return serde_json::from_slice(&body).map_err(|e| {
                AirtableError::InvalidResponse(format!(
                    "{e} (body: {})",
                    String::from_utf8_lossy(&body)
                ))
            });
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        warn!(
            status = %status,
            table = %target,
            body = %body,
            "Airtable request failed"
        );

        Err(status_to_error(status, target, &body, retry_after))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List records, following pagination until exhausted or `max_records` is hit.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn list_records(&self, table: &str, query: &ListQuery) -> Result<Vec<Record>> {
        let url = self.table_url(table, None)?;
        let base_params = query.to_params();
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params = base_params.clone();
            if let Some(cursor) = &offset {
                params.push(("offset".to_string(), cursor.clone()));
            }

            let page: ListResponse = self
                .send(self.http.get(url.clone()).query(&params), table)
                .await?;
            records.extend(page.records);

            if let Some(max) = query.max_records {
                if records.len() >= max {
                    records.truncate(max);
                    break;
                }
            }

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    /// Find the first record whose `field` equals `value`.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn find_first(&self, table: &str, field: &str, value: &str) -> Result<Option<Record>> {
        let query = ListQuery::new()
            .filter(filter_formula_eq(field, value))
            .max_records(1);

        let record = self.list_records(table, &query).await?.into_iter().next();
        debug!(found = record.is_some(), "Lookup finished");
        Ok(record)
    }

    /// Find every record whose `field` equals `value`.
    pub async fn find_all(&self, table: &str, field: &str, value: &str) -> Result<Vec<Record>> {
        let query = ListQuery::new().filter(filter_formula_eq(field, value));
        self.list_records(table, &query).await
    }

    /// Fetch a single record by ID.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn get_record(&self, table: &str, record_id: &str) -> Result<Record> {
        let url = self.table_url(table, Some(record_id))?;
        self.send(self.http.get(url), table).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create one record. Values are typecast by Airtable.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn create_record(&self, table: &str, fields: Fields) -> Result<Record> {
        let url = self.table_url(table, None)?;
        let body = WriteRequest {
            fields: &fields,
            typecast: true,
        };
        let record: Record = self.send(self.http.post(url).json(&body), table).await?;
        debug!(record_id = %record.id, "Created record");
        Ok(record)
    }

    /// Create many records, ten per request, preserving input order.
    #[instrument(skip_all, fields(table = %table, count = rows.len()))]
    pub async fn create_records(&self, table: &str, rows: Vec<Fields>) -> Result<Vec<Record>> {
        let url = self.table_url(table, None)?;
        let mut created = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(MAX_RECORDS_PER_WRITE) {
            let body = BatchCreateRequest {
                records: chunk.iter().map(|fields| NewRecord { fields }).collect(),
                typecast: true,
            };
            let response: RecordsResponse =
                self.send(self.http.post(url.clone()).json(&body), table).await?;
            created.extend(response.records);
        }

        Ok(created)
    }

    /// Partially update a record (PATCH); unlisted fields are left alone.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn update_record(&self, table: &str, record_id: &str, fields: Fields) -> Result<Record> {
        let url = self.table_url(table, Some(record_id))?;
        let body = WriteRequest {
            fields: &fields,
            typecast: true,
        };
        self.send(self.http.patch(url).json(&body), table).await
    }

    /// Update the first record where `field == value`, or create one.
    ///
    /// The key field is written into the new record when none matched. There is
    /// no concurrency control: two concurrent upserts may both create.
    pub async fn upsert_by_field(
        &self,
        table: &str,
        field: &str,
        value: &str,
        mut fields: Fields,
    ) -> Result<Record> {
        if let Some(existing) = self.find_first(table, field, value).await? {
            return self.update_record(table, &existing.id, fields).await;
        }

        fields
            .entry(field.to_string())
            .or_insert_with(|| serde_json::Value::String(value.to_string()));
        self.create_record(table, fields).await
    }

    /// Append an event row to a log table.
    pub async fn log_event(&self, table: &str, fields: Fields) -> Result<Record> {
        let record = self.create_record(table, fields).await?;
        info!(table = %table, record_id = %record.id, "Logged event to Airtable");
        Ok(record)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn parse_error_body(body: &str) -> (String, String) {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody::Detailed { kind, message },
        }) => {
            let message = message.unwrap_or_else(|| kind.clone());
            (kind, message)
        }
        Ok(ErrorEnvelope {
            error: ErrorBody::Code(code),
        }) => (code.clone(), code),
        Err(_) if body.is_empty() => ("UNKNOWN".to_string(), "<empty body>".to_string()),
        Err(_) => ("UNKNOWN".to_string(), body.to_string()),
    }
}

fn status_to_error(
    status: StatusCode,
    target: &str,
    body: &str,
    retry_after: Option<Duration>,
) -> AirtableError {
    let (kind, message) = parse_error_body(body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => AirtableError::RateLimited { retry_after },
        StatusCode::NOT_FOUND => AirtableError::NotFound(format!("{target}: {message}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AirtableError::Unauthorized(message),
        _ => AirtableError::Api {
            status: status.as_u16(),
            kind,
            message,
        },
    }
}
