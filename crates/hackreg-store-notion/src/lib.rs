// # Notion Record Store
//
// This crate provides a Notion database implementation of `RecordStore`.
//
// ## Behavior
//
// - ✅ One HTTP request per call
// - ✅ Rate limits (HTTP 429) reported as `Error::RateLimited` with the
//   `Retry-After` hint
// - ✅ 404 reported as `Error::NotFound`
// - ✅ HTTP timeout configured (30 seconds)
// - ❌ NO retry or backoff (owned by `StoreGateway`)
// - ❌ NO caching (the database is authoritative)
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Store construction fails fast if the token or database id is empty
//
// ## API Reference
//
// - Query a database: POST `/databases/:database_id/query`
// - Retrieve a page: GET `/pages/:page_id`
// - Create a page: POST `/pages`
// - Update page properties: PATCH `/pages/:page_id`

pub mod properties;

use async_trait::async_trait;
use hackreg_core::config::StoreConfig;
use hackreg_core::{Attendee, AttendeePage, Error, Flag, NewAttendee, RecordStore, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Notion API base URL
const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// Notion API version header value
const NOTION_VERSION: &str = "2022-06-28";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pages requested per listing call (Notion's maximum)
const LIST_PAGE_SIZE: usize = 100;

/// Notion-backed record store
///
/// Each attendee is one page in the configured database.
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct NotionRecordStore {
    /// Notion integration token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Database holding the attendee pages
    database_id: String,

    /// API base, overridable for tests
    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for NotionRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionRecordStore")
            .field("api_token", &"<REDACTED>")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NotionRecordStore {
    /// Create a store for a database
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token or database id is empty, or if the HTTP
    /// client cannot be built.
    pub fn new(api_token: impl Into<String>, database_id: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let database_id = database_id.into();

        if api_token.trim().is_empty() {
            return Err(Error::config("Notion API token cannot be empty"));
        }
        if database_id.trim().is_empty() {
            return Err(Error::config("Notion database id cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            database_id,
            base_url: NOTION_API_BASE.to_string(),
            client,
        })
    }

    /// Create a store from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Notion {
                api_token,
                database_id,
            } => Self::new(api_token.clone(), database_id.clone()),
            other => Err(Error::config(format!(
                "Invalid config for Notion store: {}",
                other.type_name()
            ))),
        }
    }

    /// Point the store at a different API base (e.g. a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Database this store reads and writes
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send a request and return the JSON body of a successful response
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("{context}: request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::backend("notion", format!("{context}: unreadable response: {e}")));
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        Err(status_error(status.as_u16(), retry_after, &body, context))
    }

    async fn query(&self, body: Value) -> Result<Value> {
        let path = format!("/databases/{}/query", self.database_id);
        self.send(
            self.request(reqwest::Method::POST, &path).json(&body),
            "Database query",
        )
        .await
    }

    /// First page matching `filter`, if any
    async fn first_match(&self, filter: Value) -> Result<Option<Attendee>> {
        let response = self.query(json!({ "filter": filter, "page_size": 1 })).await?;

        match results(&response)?.first() {
            Some(page) => properties::page_to_attendee(page).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecordStore for NotionRecordStore {
    async fn find_by_ticket(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        tracing::debug!("Querying Notion for ticket {}", ticket_code);
        self.first_match(properties::ticket_filter(ticket_code)).await
    }

    async fn find_ticket_exact(&self, ticket_code: &str) -> Result<Option<Attendee>> {
        tracing::debug!("Querying Notion for exact ticket {}", ticket_code);
        self.first_match(properties::exact_ticket_filter(ticket_code)).await
    }

    async fn get_attendee(&self, record_id: &str) -> Result<Attendee> {
        let page = self
            .send(
                self.request(reqwest::Method::GET, &format!("/pages/{record_id}")),
                "Page retrieval",
            )
            .await?;
        properties::page_to_attendee(&page)
    }

    async fn create_attendee(&self, attendee: &NewAttendee) -> Result<Attendee> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties::new_page_properties(attendee)
        });

        let page = self
            .send(
                self.request(reqwest::Method::POST, "/pages").json(&body),
                "Page creation",
            )
            .await?;

        tracing::info!("Created Notion page for ticket {}", attendee.ticket_code);
        properties::page_to_attendee(&page)
    }

    async fn set_flag(&self, record_id: &str, flag: Flag) -> Result<()> {
        tracing::debug!(
            "Setting '{}' on Notion page {}",
            properties::flag_property(flag),
            record_id
        );

        self.send(
            self.request(reqwest::Method::PATCH, &format!("/pages/{record_id}"))
                .json(&properties::flag_update(flag)),
            "Page update",
        )
        .await?;
        Ok(())
    }

    async fn list_attendees(&self, cursor: Option<&str>) -> Result<AttendeePage> {
        let mut body = json!({ "page_size": LIST_PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let response = self.query(body).await?;

        let mut attendees = Vec::new();
        for page in results(&response)? {
            match properties::page_to_attendee(page) {
                Ok(attendee) => attendees.push(attendee),
                Err(e) => tracing::warn!("Skipping unreadable page: {}", e),
            }
        }

        let has_more = response
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next_cursor = response
            .get("next_cursor")
            .and_then(Value::as_str)
            .filter(|_| has_more)
            .map(str::to_string);

        Ok(AttendeePage {
            attendees,
            next_cursor,
        })
    }

    fn store_name(&self) -> &'static str {
        "notion"
    }
}

fn results(response: &Value) -> Result<&Vec<Value>> {
    response
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::backend("notion", "Invalid response format: results is not an array"))
}

/// `Retry-After` in seconds; fractional values are accepted
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Map a non-success response to an error
///
/// Notion error bodies look like
/// `{"object":"error","status":400,"code":"validation_error","message":"..."}`.
fn status_error(status: u16, retry_after: Option<Duration>, body: &str, context: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let code = v.get("code")?.as_str()?.to_string();
            let message = v.get("message").and_then(Value::as_str).unwrap_or_default();
            Some(format!("{code}: {message}"))
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        429 => Error::rate_limited(retry_after),
        404 => Error::not_found(format!("{context}: {detail}")),
        401 | 403 => Error::backend(
            "notion",
            format!(
                "Authentication failed: invalid token or the database is not shared with the integration. Status: {status}"
            ),
        ),
        _ => Error::backend("notion", format!("{context} failed: {status} {detail}")),
    }
}
