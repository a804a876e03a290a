//! Azure DevOps HTTP Client
//!
//! A small, typed client for the Azure DevOps REST endpoints the provider
//! needs: build and release definitions, build folders, resource
//! authorizations, pipeline permissions, pipeline runs, Git refs and projects.
//!
//! Each endpoint group is exposed as an async trait so callers can substitute
//! an in-memory implementation in tests. [`DevOpsClient`] implements all of
//! them.
//!
//! # Example
//!
//! ```no_run
//! use azdo_client::{BuildDefinitionApi, DevOpsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DevOpsClient::new(
//!         "https://dev.azure.com/contoso",
//!         Some("personal-access-token".to_string()),
//!     );
//!
//!     let definition = client.get_build_definition("webapp", 12).await?;
//!     println!("revision {:?}", definition.revision);
//!     Ok(())
//! }
//! ```

mod build;
pub mod error;
mod git;
mod pipelines;
mod projects;
mod release;

pub use build::{BuildDefinitionApi, BuildFolderApi, ResourceAuthorizationApi};
pub use error::{ClientError, Result};
pub use git::GitApi;
pub use pipelines::{PipelinePermissionsApi, PipelinesApi};
pub use projects::CoreApi;
pub use release::ReleaseDefinitionApi;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;
use url::Url;

/// Default REST API version
pub const DEFAULT_API_VERSION: &str = "7.1";

/// HTTP client for an Azure DevOps organization
///
/// Requests to the release service go to the organization's `vsrm` host,
/// everything else to the organization URL. Every request carries the
/// `api-version` query parameter and, when a personal access token is set,
/// basic authentication.
#[derive(Clone)]
pub struct DevOpsClient {
    /// Organization URL (e.g., "https://dev.azure.com/contoso")
    organization_url: String,
    /// Release management URL (e.g., "https://vsrm.dev.azure.com/contoso")
    release_url: String,
    api_version: String,
    personal_access_token: Option<String>,
    client: Client,
}

impl fmt::Debug for DevOpsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevOpsClient")
            .field("organization_url", &self.organization_url)
            .field("release_url", &self.release_url)
            .field("api_version", &self.api_version)
            .field(
                "personal_access_token",
                &self.personal_access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl DevOpsClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `organization_url` - The organization URL (e.g., "https://dev.azure.com/contoso")
    /// * `personal_access_token` - Token used for basic authentication, if any
    ///
    /// # Example
    /// ```
    /// use azdo_client::DevOpsClient;
    ///
    /// let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
    /// assert_eq!(client.release_url(), "https://vsrm.dev.azure.com/contoso");
    /// ```
    pub fn new(organization_url: impl Into<String>, personal_access_token: Option<String>) -> Self {
        Self::with_client(organization_url, personal_access_token, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `organization_url` - The organization URL
    /// * `personal_access_token` - Token used for basic authentication, if any
    /// * `client` - A configured reqwest Client
    ///
    /// # Example
    /// ```
    /// use azdo_client::DevOpsClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = DevOpsClient::with_client("https://dev.azure.com/contoso", None, http_client);
    /// ```
    pub fn with_client(
        organization_url: impl Into<String>,
        personal_access_token: Option<String>,
        client: Client,
    ) -> Self {
        let organization_url = organization_url.into().trim_end_matches('/').to_string();
        let release_url = release_url_for(&organization_url);
        Self {
            organization_url,
            release_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            personal_access_token: personal_access_token.filter(|t| !t.is_empty()),
            client,
        }
    }

    /// Use a different REST API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Get the organization URL
    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    /// Get the release management URL
    pub fn release_url(&self) -> &str {
        &self.release_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    // =============================================================================
    // Request Building
    // =============================================================================

    /// Build an endpoint URL from a base and unescaped path segments
    ///
    /// Segments are percent-encoded, so project names with spaces and folder
    /// paths pass through intact.
    pub(crate) fn endpoint(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest(format!("{} can not be a base URL", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request at the default API version
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_with_version(method, url, &self.api_version)
    }

    /// Start a request at a specific API version
    ///
    /// Preview endpoints need a `-preview.N` suffix on the version.
    pub(crate) fn request_with_version(&self, method: Method, url: Url, api_version: &str) -> RequestBuilder {
        debug!(%method, %url, api_version, "Sending request");
        let builder = self
            .client
            .request(method, url)
            .query(&[("api-version", api_version)]);

        match &self.personal_access_token {
            Some(token) => builder.basic_auth("", Some(token)),
            None => builder,
        }
    }

    /// API version for a preview endpoint
    pub(crate) fn preview(&self, revision: u32) -> String {
        format!("{}-preview.{}", self.api_version, revision)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Deserialize the body of a successful response
    pub(crate) async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::ParseError(format!("{} in {} byte body", e, body.len())))
    }

    /// Accept a successful response without reading its body (e.g. DELETE)
    pub(crate) async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await.map(|_| ())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "Request failed");
        Err(ClientError::api_error(status.as_u16(), body))
    }
}

/// Derive the release management host from the organization URL
///
/// `dev.azure.com/<org>` becomes `vsrm.dev.azure.com/<org>` and
/// `<org>.visualstudio.com` becomes `<org>.vsrm.visualstudio.com`. Other hosts
/// (Azure DevOps Server) serve releases from the organization URL itself.
pub fn release_url_for(organization_url: &str) -> String {
    let Ok(mut url) = Url::parse(organization_url) else {
        return organization_url.to_string();
    };
    let Some(host) = url.host_str().map(str::to_string) else {
        return organization_url.to_string();
    };

    let release_host = if host.eq_ignore_ascii_case("dev.azure.com") {
        format!("vsrm.{}", host)
    } else if let Some(account) = host.strip_suffix(".visualstudio.com") {
        if account.ends_with(".vsrm") {
            return organization_url.to_string();
        }
        format!("{}.vsrm.visualstudio.com", account)
    } else {
        return organization_url.to_string();
    };

    if url.set_host(Some(&release_host)).is_err() {
        return organization_url.to_string();
    }
    url.as_str().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
        assert_eq!(client.organization_url(), "https://dev.azure.com/contoso");
        assert_eq!(client.api_version(), "7.1");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso/", None);
        assert_eq!(client.organization_url(), "https://dev.azure.com/contoso");
    }

    #[test]
    fn test_release_url_derivation() {
        assert_eq!(
            release_url_for("https://dev.azure.com/contoso"),
            "https://vsrm.dev.azure.com/contoso"
        );
        assert_eq!(
            release_url_for("https://contoso.visualstudio.com"),
            "https://contoso.vsrm.visualstudio.com"
        );
        assert_eq!(
            release_url_for("https://tfs.internal:8080/tfs/DefaultCollection"),
            "https://tfs.internal:8080/tfs/DefaultCollection"
        );
        assert_eq!(release_url_for("not a url"), "not a url");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = DevOpsClient::new(
            "https://dev.azure.com/contoso",
            Some("super-secret-pat".to_string()),
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret-pat"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", Some(String::new()));
        assert!(format!("{:?}", client).contains("personal_access_token: None"));
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
        let url = client
            .endpoint(client.organization_url(), &["My Project", "_apis", "build", "definitions"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/My%20Project/_apis/build/definitions"
        );
    }

    #[test]
    fn test_request_carries_api_version_and_auth() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", Some("pat".to_string()))
            .with_api_version("7.0");
        let url = client.endpoint(client.organization_url(), &["_apis", "projects"]).unwrap();
        let request = client.request(Method::GET, url).build().unwrap();

        assert_eq!(request.url().query(), Some("api-version=7.0"));
        assert!(request.headers().contains_key(reqwest::header::AUTHORIZATION));
        assert_eq!(client.preview(2), "7.0-preview.2");
    }
}
