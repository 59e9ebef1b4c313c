use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::entities::grid::GridDefinition;
use crate::domain::entities::page::ResultPage;
use crate::domain::entities::query::QueryRequest;
use crate::protocol::wire::{encode_query, status_code, WireError, WirePage};
use crate::usecase::services::grid_registry::GridRegistry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Failed(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Carries a page request to a grid and brings the page back.
pub trait GridTransport: Send + Sync {
    fn fetch(&self, query: &QueryRequest) -> Result<ResultPage, TransportError>;
}

/// Serves a grid from a registry in the same process. Requests still go
/// through the query-string and JSON encodings.
pub struct InProcessTransport {
    registry: Arc<GridRegistry>,
    grid: String,
}

impl InProcessTransport {
    pub fn new(registry: Arc<GridRegistry>, grid: impl Into<String>) -> Self {
        Self {
            registry,
            grid: grid.into(),
        }
    }

    pub fn grid(&self) -> &str {
        &self.grid
    }
}

impl GridTransport for InProcessTransport {
    fn fetch(&self, query: &QueryRequest) -> Result<ResultPage, TransportError> {
        let query_string = encode_query(query);
        let page = self
            .registry
            .handle_query_string(&self.grid, &query_string)
            .map_err(|err| TransportError::Rejected {
                status: status_code(&err),
                message: err.to_string(),
            })?;

        let body =
            serde_json::to_vec(&page).map_err(|err| TransportError::Failed(err.to_string()))?;
        let page: WirePage =
            serde_json::from_slice(&body).map_err(|err| TransportError::Decode(err.to_string()))?;
        Ok(page.into())
    }
}

/// Talks to a grid served by `grid-bridge serve` over HTTP.
///
/// Requests block; call `fetch` from a worker thread. The blocking client
/// must not be built inside an async runtime, so it is created on first use.
/// Proxy variables are ignored.
pub struct HttpTransport {
    base: Url,
    grid: String,
    client: OnceLock<reqwest::blocking::Client>,
}

fn build_client() -> Result<reqwest::blocking::Client, TransportError> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .no_proxy()
        .build()
        .map_err(|err| TransportError::Failed(format!("failed to build http client: {err}")))
}

fn parse_base(base: &str) -> Result<Url, TransportError> {
    let url = Url::parse(base)
        .map_err(|err| TransportError::Failed(format!("invalid server url `{base}`: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(TransportError::Failed(format!(
            "server url `{base}` cannot carry a path"
        )));
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn get_json<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: Url,
) -> Result<T, TransportError> {
    debug!(%url, "grid http request");
    let response = client
        .get(url.clone())
        .send()
        .map_err(|err| TransportError::Failed(format!("{url}: {err}")))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| TransportError::Failed(format!("failed to read response from {url}: {err}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<WireError>(&body)
            .map(|err| err.message)
            .unwrap_or(body);
        return Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&body).map_err(|err| TransportError::Decode(err.to_string()))
}

impl HttpTransport {
    pub fn new(base: &str, grid: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            base: parse_base(base)?,
            grid: grid.into(),
            client: OnceLock::new(),
        })
    }

    /// Names of the grids a server offers.
    pub fn grid_names(base: &str) -> Result<Vec<String>, TransportError> {
        let base = parse_base(base)?;
        get_json(&build_client()?, endpoint(&base, &["grids"]))
    }

    pub fn grid(&self) -> &str {
        &self.grid
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = build_client()?;
        Ok(self.client.get_or_init(|| client))
    }

    /// The grid's columns and options as published by the server.
    pub fn definition(&self) -> Result<GridDefinition, TransportError> {
        get_json(self.client()?, endpoint(&self.base, &["grids", &self.grid]))
    }
}

impl GridTransport for HttpTransport {
    fn fetch(&self, query: &QueryRequest) -> Result<ResultPage, TransportError> {
        let mut url = endpoint(&self.base, &["grids", &self.grid, "data"]);
        url.set_query(Some(&encode_query(query)));
        let page: WirePage = get_json(self.client()?, url)?;
        Ok(page.into())
    }
}
