use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

pub const HEX_API_URL: &str = "https://hex.pm/api";
pub const HEXDOCS_URL: &str = "https://hexdocs.pm";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid JSON from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Http(format!("Invalid URL: {err}"))
    }
}

/// Where package metadata and interfaces come from. Every method returns
/// the raw JSON text of the remote document.
#[async_trait]
pub trait PackageSource: Send + Sync {
    async fn fetch_package(&self, name: &str) -> Result<String, FetchError>;
    async fn search_packages(&self, query: &str) -> Result<String, FetchError>;
    async fn fetch_package_interface(&self, name: &str) -> Result<String, FetchError>;
}

/// Client for the hex.pm API and the documents published on hexdocs.pm.
#[derive(Debug, Clone)]
pub struct HexClient {
    client: Client,
    api_url: String,
    docs_url: String,
}

impl Default for HexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HexClient {
    pub fn new() -> Self {
        Self::new_with_base_urls(HEX_API_URL, HEXDOCS_URL)
    }

    pub fn new_with_base_urls(api_url: &str, docs_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            docs_url: docs_url.to_string(),
        }
    }

    /// Fetches `url` and checks that the body is JSON.
    pub async fn fetch_json(&self, url: Url) -> Result<String, FetchError> {
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Http(format!("{url} responded with {status}")));
        }

        let body = response.text().await?;
        serde_json::from_str::<serde::de::IgnoredAny>(&body).map_err(|err| FetchError::Parse {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        Ok(body)
    }
}

#[async_trait]
impl PackageSource for HexClient {
    async fn fetch_package(&self, name: &str) -> Result<String, FetchError> {
        let url = endpoint(&self.api_url, &["packages", name])?;
        self.fetch_json(url).await
    }

    async fn search_packages(&self, query: &str) -> Result<String, FetchError> {
        let mut url = endpoint(&self.api_url, &["packages"])?;
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("sort", "downloads");
        self.fetch_json(url).await
    }

    async fn fetch_package_interface(&self, name: &str) -> Result<String, FetchError> {
        let url = endpoint(&self.docs_url, &[name, "package-interface.json"])?;
        self.fetch_json(url).await
    }
}

/// Appends path segments to a base URL, escaping each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| FetchError::Http(format!("Base URL cannot take a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
