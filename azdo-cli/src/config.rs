//! CLI configuration
//!
//! Connection settings for the Azure DevOps organization, loaded from the
//! environment and overridden by command-line flags.

use anyhow::Context;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "7.1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// CLI configuration
#[derive(Clone)]
pub struct Config {
    /// Organization URL (e.g., "https://dev.azure.com/contoso")
    pub organization_url: String,

    /// Personal access token used for basic authentication
    pub personal_access_token: Option<String>,

    /// REST API version sent with every request
    pub api_version: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("organization_url", &self.organization_url)
            .field(
                "personal_access_token",
                &self.personal_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_version", &self.api_version)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(organization_url: impl Into<String>) -> Self {
        Self {
            organization_url: organization_url.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - AZDO_ORG_SERVICE_URL (required by commands that talk to the service)
    /// - AZDO_PERSONAL_ACCESS_TOKEN (optional)
    /// - AZDO_API_VERSION (optional, default: 7.1)
    /// - AZDO_REQUEST_TIMEOUT (optional, seconds, default: 60)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::new(lookup("AZDO_ORG_SERVICE_URL").unwrap_or_default());

        config.personal_access_token =
            lookup("AZDO_PERSONAL_ACCESS_TOKEN").filter(|t| !t.is_empty());

        if let Some(version) = lookup("AZDO_API_VERSION").filter(|v| !v.is_empty()) {
            config.api_version = version;
        }

        if let Some(timeout) = lookup("AZDO_REQUEST_TIMEOUT") {
            let secs = timeout
                .parse::<u64>()
                .with_context(|| format!("AZDO_REQUEST_TIMEOUT must be seconds, got {:?}", timeout))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_organization_url(mut self, organization_url: impl Into<String>) -> Self {
        self.organization_url = organization_url.into();
        self
    }

    pub fn with_personal_access_token(mut self, token: impl Into<String>) -> Self {
        self.personal_access_token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.organization_url.is_empty() {
            anyhow::bail!("organization URL is not set (AZDO_ORG_SERVICE_URL)");
        }

        if !self.organization_url.starts_with("http://")
            && !self.organization_url.starts_with("https://")
        {
            anyhow::bail!("organization URL must start with http:// or https://");
        }

        if self.api_version.is_empty() {
            anyhow::bail!("api_version cannot be empty");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization_url: String::new(),
            personal_access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(config.organization_url.is_empty());
        assert_eq!(config.api_version, "7.1");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.personal_access_token.is_none());
    }

    #[test]
    fn test_from_environment() {
        let vars = HashMap::from([
            ("AZDO_ORG_SERVICE_URL", "https://dev.azure.com/contoso"),
            ("AZDO_PERSONAL_ACCESS_TOKEN", "s3cr3t"),
            ("AZDO_API_VERSION", "7.0"),
            ("AZDO_REQUEST_TIMEOUT", "15"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.organization_url, "https://dev.azure.com/contoso");
        assert_eq!(config.personal_access_token.as_deref(), Some("s3cr3t"));
        assert_eq!(config.api_version, "7.0");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let vars = HashMap::from([("AZDO_REQUEST_TIMEOUT", "soon")]);
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("AZDO_REQUEST_TIMEOUT"));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_err());
        assert!(Config::new("dev.azure.com/contoso").validate().is_err());
        assert!(
            Config::new("https://dev.azure.com/contoso")
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(Config::new("https://dev.azure.com/contoso").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::new("https://dev.azure.com/contoso").with_personal_access_token("s3cr3t");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("<redacted>"));
    }
}
