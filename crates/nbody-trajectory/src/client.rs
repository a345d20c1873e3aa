//! HTTP client for fetching scenario trajectory files.
//!
//! Files live under `<origin>/data/`. Each load issues at most one GET; the
//! body is parsed and validated into a [`Scenario`] before it is returned.

use std::sync::Arc;

use crate::cache::{NoCache, ScenarioCache};
use crate::error::{Error, Result};
use crate::types::{Scenario, ScenarioDescriptor};

/// Path under the hosting origin that holds trajectory files.
const DATA_ROOT: &str = "/data/";

/// HTTP client for fetching scenarios.
///
/// Runtime-agnostic: `fetch_scenario` returns a plain future that can be
/// driven by Tokio on native or by the browser executor on WASM.
pub struct Client<C: ScenarioCache = NoCache> {
    http: reqwest::Client,
    cache: Arc<C>,
    data_root: String,
}

impl Client<NoCache> {
    /// Create a client for the given origin (e.g. `http://127.0.0.1:8080`)
    /// with no caching.
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self::with_cache(origin, NoCache)
    }
}

impl<C: ScenarioCache> Client<C> {
    /// Create a client for the given origin with a scenario memo.
    #[must_use]
    pub fn with_cache(origin: &str, cache: C) -> Self {
        Self::with_http_and_cache(reqwest::Client::new(), origin, cache)
    }

    /// Create a client with a custom HTTP client and memo.
    #[must_use]
    pub fn with_http_and_cache(http: reqwest::Client, origin: &str, cache: C) -> Self {
        Self {
            http,
            cache: Arc::new(cache),
            data_root: format!("{}{DATA_ROOT}", origin.trim_end_matches('/')),
        }
    }

    /// The absolute URL data files are resolved against.
    #[must_use]
    pub fn data_root(&self) -> &str {
        &self.data_root
    }

    /// The memo backing this client.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolve a descriptor's data file under the data root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the file is empty, absolute or carries
    /// a scheme, or if the resolved URL is not under the data root.
    pub fn scenario_url(&self, descriptor: &ScenarioDescriptor) -> Result<String> {
        let file = descriptor.file;
        let escapes = file.is_empty()
            || file.starts_with('/')
            || file.starts_with('\\')
            || file.contains("://")
            || file.split(['/', '\\']).any(|part| part == ".." || part.is_empty());
        let invalid = || Error::InvalidPath {
            file: file.to_string(),
        };
        if escapes {
            return Err(invalid());
        }

        // Percent-encoded dot segments only collapse once the URL is parsed,
        // so the resolved path is checked against the data root as well.
        let root = reqwest::Url::parse(&self.data_root).map_err(|_| invalid())?;
        let url = root.join(file).map_err(|_| invalid())?;
        if url.origin() != root.origin() || !url.path().starts_with(root.path()) {
            return Err(invalid());
        }
        Ok(url.into())
    }

    /// Fetch and parse the trajectory for a scenario.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails or the server answers with
    /// a non-success status, and a parse error if the payload is not a valid
    /// scenario.
    pub async fn fetch_scenario(&self, descriptor: &ScenarioDescriptor) -> Result<Arc<Scenario>> {
        let url = self.scenario_url(descriptor)?;

        if let Some(scenario) = self.cache.get(descriptor.file) {
            tracing::debug!(url = %url, "scenario memo hit");
            return Ok(scenario);
        }

        let data = self.fetch_bytes(&url).await?;
        let scenario = Arc::new(Scenario::from_json(&data)?);

        tracing::debug!(
            url = %url,
            bodies = scenario.body_count(),
            samples = scenario.sample_count(),
            "parsed scenario"
        );

        self.cache.put(descriptor.file, Arc::clone(&scenario));
        Ok(scenario)
    }

    /// Fetch raw bytes from a URL.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await.map_err(|e| Error::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(data.to_vec())
    }
}
