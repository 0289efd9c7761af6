//! Transport to the Bitrix24 REST webhook.
//!
//! Two request shapes are supported: single calls (`POST /{method}.json`)
//! and batches (`POST /batch.json`, at most [`BATCH_LIMIT`] sub-commands,
//! `halt` disabled). Transport failures are logged and surface as empty
//! results; only contract violations come back as [`GatewayError`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{GatewayError, BATCH_LIMIT};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Logical key -> `method?query` sub-request.
pub type BatchCommands = BTreeMap<String, String>;

/// Logical key -> raw sub-result (possibly an error object).
pub type BatchResults = BTreeMap<String, Value>;

/// Request seam between collectors and the backend.
#[async_trait]
pub trait BitrixTransport: Send + Sync {
    /// One API call. `Ok(None)` means the call failed at the transport level.
    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, GatewayError>;

    /// Up to [`BATCH_LIMIT`] calls in one round trip.
    async fn batch(&self, commands: &BatchCommands) -> Result<BatchResults, GatewayError>;

    /// Repeated `call`s threading the `start` offset from each page's `next`.
    ///
    /// Stops on an empty or absent page, when no `next` is returned, or after
    /// `max_pages` pages.
    async fn paginated_call(
        &self,
        method: &str,
        params: Value,
        max_pages: usize,
    ) -> Result<Vec<Value>, GatewayError> {
        let mut params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut results = Vec::new();
        let mut start = json!(0);

        for _ in 0..max_pages {
            params.insert("start".to_string(), start.clone());
            let Some(data) = self.call(method, Value::Object(params.clone())).await? else {
                break;
            };
            let (items, next) = split_page(data);
            if items.is_empty() {
                break;
            }
            results.extend(items);
            match next {
                Some(offset) => start = offset,
                None => break,
            }
        }

        log::debug!("[BitrixClient] {} records loaded from {}", results.len(), method);
        Ok(results)
    }
}

/// Fails fast when a batch exceeds the backend ceiling.
pub fn check_batch_size(commands: &BatchCommands) -> Result<(), GatewayError> {
    if commands.len() > BATCH_LIMIT {
        return Err(GatewayError::BatchTooLarge {
            limit: BATCH_LIMIT,
            given: commands.len(),
        });
    }
    Ok(())
}

/// Items and continuation cursor of one page.
///
/// List methods answer either with a bare array or with an object holding
/// the records under `tasks` (task lists) or `result`.
fn split_page(data: Value) -> (Vec<Value>, Option<Value>) {
    match data {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let items = match map.remove("tasks").or_else(|| map.remove("result")) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let next = map.remove("next").filter(|v| match v {
                Value::Null | Value::Bool(false) => false,
                Value::Number(n) => n.as_u64() != Some(0),
                Value::String(s) => !s.is_empty() && s != "0",
                _ => true,
            });
            (items, next)
        }
        _ => (Vec::new(), None),
    }
}

/// Unwrap `{result: {result: {...}, result_error: {...}}}`.
///
/// Sub-commands that failed keep their key with the raw error value so the
/// caller can tell "failed" from "not requested".
fn parse_batch_envelope(data: Value) -> Option<BatchResults> {
    let Value::Object(mut outer) = data.get("result").cloned()? else {
        return None;
    };

    let mut results: BatchResults = match outer.remove("result") {
        Some(Value::Object(map)) => map.into_iter().collect(),
        // An all-failed batch comes back as an empty array.
        Some(Value::Array(items)) if items.is_empty() => BatchResults::new(),
        _ => return None,
    };

    if let Some(Value::Object(errors)) = outer.remove("result_error") {
        for (key, error) in errors {
            log::warn!("[BitrixClient] batch command {} failed: {}", key, error);
            results.entry(key).or_insert(error);
        }
    }
    for (key, value) in &results {
        if let Some(error) = value.get("error") {
            log::warn!("[BitrixClient] batch command {} failed: {}", key, error);
        }
    }
    Some(results)
}

/// Webhook client owning one HTTP session.
///
/// The session is acquired with [`open`](Self::open) and released by
/// [`close`](Self::close) or on drop, whichever comes first.
pub struct BitrixClient {
    webhook_url: String,
    session: Option<reqwest::Client>,
}

impl BitrixClient {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    pub fn open(&mut self) -> Result<(), GatewayError> {
        if self.session.is_some() {
            return Ok(());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::SessionInit(e.to_string()))?;
        self.session = Some(client);
        log::debug!("[BitrixClient] session opened for {}", self.webhook_url);
        Ok(())
    }

    pub fn close(&mut self) {
        if self.session.take().is_some() {
            log::debug!("[BitrixClient] session closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&reqwest::Client, GatewayError> {
        self.session.as_ref().ok_or(GatewayError::SessionNotOpen)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, String> {
        let response = self
            .session()
            .map_err(|e| e.to_string())?
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status, text));
        }
        serde_json::from_str(&text).map_err(|e| format!("invalid JSON body: {}", e))
    }
}

impl Drop for BitrixClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl BitrixTransport for BitrixClient {
    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, GatewayError> {
        self.session()?;
        let url = format!("{}/{}.json", self.webhook_url, method);
        log::debug!("[BitrixClient] call {}", method);

        match self.post_json(&url, &params).await {
            Ok(data) => match data {
                Value::Object(mut map) if map.contains_key("result") => Ok(map.remove("result")),
                other => {
                    log::warn!("[BitrixClient] {} returned no result: {}", method, other);
                    Ok(None)
                }
            },
            Err(e) => {
                log::warn!("[BitrixClient] {} failed: {}", method, e);
                Ok(None)
            }
        }
    }

    async fn batch(&self, commands: &BatchCommands) -> Result<BatchResults, GatewayError> {
        check_batch_size(commands)?;
        self.session()?;
        if commands.is_empty() {
            return Ok(BatchResults::new());
        }
        log::debug!("[BitrixClient] batch with {} commands", commands.len());

        let url = format!("{}/batch.json", self.webhook_url);
        let payload = json!({ "halt": 0, "cmd": commands });

        match self.post_json(&url, &payload).await {
            Ok(data) => match parse_batch_envelope(data) {
                Some(results) => Ok(results),
                None => {
                    log::warn!("[BitrixClient] batch response has no result envelope");
                    Ok(BatchResults::new())
                }
            },
            Err(e) => {
                log::warn!("[BitrixClient] batch failed: {}", e);
                Ok(BatchResults::new())
            }
        }
    }
}
