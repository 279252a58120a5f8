//! PostgREST-compatible HTTP backend.
//!
//! Every table is reached under `<url>/rest/v1/<table>`. Filters use
//! PostgREST's `column=op.value` query syntax; single-row reads ask for the
//! object representation so an empty result comes back as `PGRST116`.

mod tables;

use genesis_core::GenesisError;
use genesis_core::config::GatewayConfig;
use genesis_core::error::Result;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const NO_ROWS: &str = "PGRST116";

/// A query string pair, e.g. `("user_id", "eq.<id>")`.
pub(crate) type Param = (&'static str, String);

pub(crate) fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Request/response gateway over a PostgREST API.
pub struct PostgrestGateway {
    client: Client,
    base_url: String,
    anon_key: String,
    /// User JWT; requests fall back to the anon key without one.
    access_token: RwLock<Option<String>>,
}

impl PostgrestGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GenesisError::config("gateway.url is required for the postgrest backend"))?;
        let anon_key = config
            .anon_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenesisError::config("gateway.anon_key is required for the postgrest backend"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenesisError::config(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(url, "[PostgrestGateway] initialized");
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key,
            access_token: RwLock::new(None),
        })
    }

    /// Sets the signed-in user's token, or clears it on sign-out.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn execute(&self, table: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = self.auth_request(request).send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = map_error(table, status, &body);
        tracing::debug!(table, %status, error = %error, "[PostgrestGateway] request failed");
        Err(error)
    }

    pub(crate) async fn select_many<T: DeserializeOwned>(&self, table: &'static str, params: &[Param]) -> Result<Vec<T>> {
        let request = self.client.get(self.table_url(table)).query(params);
        read_json(self.execute(table, request).await?).await
    }

    /// One row or `None` when the filter matches nothing.
    pub(crate) async fn select_optional<T: DeserializeOwned>(
        &self,
        table: &'static str,
        params: &[Param],
    ) -> Result<Option<T>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(params)
            .header(ACCEPT, SINGLE_OBJECT);
        match self.execute(table, request).await {
            Ok(response) => read_json(response).await.map(Some),
            Err(GenesisError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn insert_one<T: DeserializeOwned>(&self, table: &'static str, body: &Value) -> Result<T> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        read_json(self.execute(table, request).await?).await
    }

    /// Insert-or-merge keyed by the `on_conflict` columns.
    pub(crate) async fn upsert_one<T: DeserializeOwned>(
        &self,
        table: &'static str,
        on_conflict: &'static str,
        body: &Value,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        read_json(self.execute(table, request).await?).await
    }

    /// Updates the single row matching `params` and returns it.
    pub(crate) async fn update_one<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &'static str,
        params: &[Param],
        body: &B,
    ) -> Result<T> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(params)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body);
        read_json(self.execute(table, request).await?).await
    }

    pub(crate) async fn update_many<B: Serialize + ?Sized>(
        &self,
        table: &'static str,
        params: &[Param],
        body: &B,
    ) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(params)
            .header("Prefer", "return=minimal")
            .json(body);
        self.execute(table, request).await.map(|_| ())
    }

    pub(crate) async fn delete(&self, table: &'static str, params: &[Param]) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(params)
            .header("Prefer", "return=minimal");
        self.execute(table, request).await.map(|_| ())
    }

    /// Exact row count of the filter, without fetching rows.
    pub(crate) async fn count(&self, table: &'static str, params: &[Param]) -> Result<u32> {
        let request = self
            .client
            .head(self.table_url(table))
            .query(params)
            .header("Prefer", "count=exact");
        let response = self.execute(table, request).await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| GenesisError::rejected("content_range", format!("{table}: missing row count")))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn transport_error(error: reqwest::Error) -> GenesisError {
    if error.is_timeout() {
        GenesisError::transport(format!("request timed out: {error}"))
    } else {
        GenesisError::transport(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Maps a failed response to the error taxonomy.
///
/// PostgREST errors carry a JSON body with a `code`; gateways and proxies in
/// front of it answer with plain text, which is only interpreted by status.
pub(crate) fn map_error(table: &'static str, status: StatusCode, body: &str) -> GenesisError {
    match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(parsed) => {
            let code = parsed.code.unwrap_or_else(|| status.as_u16().to_string());
            let mut message = parsed.message.unwrap_or_else(|| status.to_string());
            if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
                message = format!("{message} ({details})");
            }
            match code.as_str() {
                NO_ROWS => GenesisError::not_found(table, message),
                "42501" | "PGRST301" => GenesisError::Unauthorized(message),
                _ => GenesisError::rejected(code, message),
            }
        }
        Err(_) => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenesisError::Unauthorized(format!("{status}")),
            s if s.is_server_error() => GenesisError::transport(format!("{table}: HTTP {status}")),
            _ => GenesisError::rejected(status.as_u16().to_string(), body.trim().to_string()),
        },
    }
}

/// Total of a `Content-Range` header such as `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range(value: &str) -> Option<u32> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":"The result contains 0 rows"}"#;
        let error = map_error("profiles", StatusCode::NOT_ACCEPTABLE, body);
        assert!(matches!(error, GenesisError::NotFound { entity_type: "profiles", .. }));
    }

    #[test]
    fn test_rls_violation_maps_to_unauthorized() {
        let body = r#"{"code":"42501","message":"new row violates row-level security policy"}"#;
        assert!(matches!(
            map_error("food_logs", StatusCode::FORBIDDEN, body),
            GenesisError::Unauthorized(_)
        ));
        let body = r#"{"code":"PGRST301","message":"JWT expired"}"#;
        assert!(matches!(
            map_error("food_logs", StatusCode::UNAUTHORIZED, body),
            GenesisError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_other_codes_are_rejections() {
        let body = r#"{"code":"23505","message":"duplicate key value"}"#;
        assert_eq!(
            map_error("checkins", StatusCode::CONFLICT, body),
            GenesisError::rejected("23505", "duplicate key value")
        );
    }

    #[test]
    fn test_plain_text_failures_use_the_status() {
        assert!(matches!(
            map_error("messages", StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            GenesisError::Transport(_)
        ));
        assert!(matches!(
            map_error("messages", StatusCode::UNAUTHORIZED, "nope"),
            GenesisError::Unauthorized(_)
        ));
        assert_eq!(
            map_error("messages", StatusCode::BAD_REQUEST, "bad filter\n"),
            GenesisError::rejected("400", "bad filter")
        );
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_new_requires_url_and_key() {
        let mut config = GatewayConfig::default();
        assert!(matches!(PostgrestGateway::new(&config), Err(GenesisError::Config(_))));

        config.url = Some("https://api.example.invalid/".to_string());
        assert!(matches!(PostgrestGateway::new(&config), Err(GenesisError::Config(_))));

        config.anon_key = Some("anon".to_string());
        let gateway = PostgrestGateway::new(&config).unwrap();
        assert_eq!(gateway.table_url("messages"), "https://api.example.invalid/rest/v1/messages");
    }
}
