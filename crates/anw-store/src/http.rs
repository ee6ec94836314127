//! HTTP backend for the serverless `store` function.
//!
//! Wire contract:
//! - `GET {url}?key=<k>` → `200` with either `{"value": …}` or the raw JSON
//!   value, `404` when the key does not exist
//! - `POST {url}?key=<k>` with `{"key": k, "value": v}` replaces the value
//! - `DELETE {url}?key=<k>` removes it
//! - `Authorization: Bearer <token>` when signed in; `401`/`403` for
//!   private keys requested without valid credentials; `412` when an
//!   `If-Match` precondition fails

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde_json::{Value, json};

use anw_auth::AuthError;

use crate::backend::{KvBackend, Versioned};
use crate::{Error, Result};

/// `KvBackend` talking to the deployed store function over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKvBackend {
    base: Url,
    http_client: reqwest::Client,
}

impl HttpKvBackend {
    /// Create a backend for the store function at `url`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(url)
            .map_err(|e| anw_core::Error::config(format!("invalid store url '{url}': {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anw_core::Error::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { base, http_client })
    }

    fn key_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("key", key);
        url
    }

    fn authorize(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token {
            Some(t) => request.bearer_auth(t),
            None => request,
        }
    }
}

/// Version tag from the response's `ETag` header.
fn etag(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Map a non-success status to the error taxonomy.
fn status_error(key: &str, status: StatusCode, token: Option<&str>) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth {
            status: Some(status.as_u16()),
            source: if token.is_some() {
                AuthError::InvalidToken(format!("store refused '{key}' (HTTP {status})"))
            } else {
                AuthError::MissingToken
            },
        },
        StatusCode::PRECONDITION_FAILED => Error::Conflict {
            key: key.to_string(),
        },
        _ => Error::Network {
            status: Some(status.as_u16()),
            message: format!("store request for '{key}' failed"),
        },
    }
}

/// The function may wrap the value as `{"value": …}` or return it raw.
fn unwrap_value(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("value") => {
            map.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl KvBackend for HttpKvBackend {
    async fn get(&self, key: &str, token: Option<&str>) -> Result<Option<Versioned>> {
        let request = Self::authorize(self.http_client.get(self.key_url(key)), token);
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(key, status, token));
        }

        let version = etag(&response);
        let text = response.text().await?;
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            let body: Value = serde_json::from_str(&text)
                .map_err(|e| Error::validation(key, format!("store returned invalid JSON: {e}")))?;
            unwrap_value(body)
        };

        Ok(Some(Versioned { value, version }))
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        token: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<Option<String>> {
        let mut request = self
            .http_client
            .post(self.key_url(key))
            .json(&json!({ "key": key, "value": value }));
        if let Some(version) = if_match {
            request = request.header(reqwest::header::IF_MATCH, version);
        }
        let response = Self::authorize(request, token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(key, status, token));
        }
        Ok(etag(&response))
    }

    async fn delete(&self, key: &str, token: Option<&str>) -> Result<()> {
        let request = Self::authorize(self.http_client.delete(self.key_url(key)), token);
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(status_error(key, status, token))
    }
}
