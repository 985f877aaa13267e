//! # Veracode XML API Client Library
//!
//! A small Rust client for the legacy Veracode XML API, focused on one job:
//! finding the latest build of an application and downloading its detailed
//! report (XML or PDF).
//!
//! ## Features
//!
//! - 🔐 **Pluggable request signing** - HMAC signing is provided by [`HmacSigner`],
//!   any [`RequestSigner`] can be injected instead
//! - 🌍 **Multi-Regional Support** - Commercial, European and Federal endpoints
//! - 📱 **Application lookup** - by id, exact name, or case-insensitive substring
//! - 🏗️ **Build resolution** - current static build or latest dynamic build
//! - 📄 **Detailed reports** - XML (`5.0`) and PDF (`4.0`) downloads
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use veracode_xml::{
//!     AppSelector, HmacSigner, MatchMode, ReportFormat, ReportRequest, ReportWorkflow,
//!     ScanType, VeracodeClient, VeracodeConfig, VeracodeCredentials, VeracodeRegion,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VeracodeConfig::new().with_region(VeracodeRegion::European);
//!     let signer = HmacSigner::new(VeracodeCredentials::new(
//!         "your_api_id".to_string(),
//!         "your_api_key".to_string(),
//!     ));
//!     let client = VeracodeClient::new(config, Arc::new(signer))?;
//!
//!     let request = ReportRequest::new(
//!         AppSelector::Name("verademo".to_string()),
//!         ReportFormat::Pdf,
//!     )
//!     .with_scan_type(ScanType::Static)
//!     .with_match_mode(MatchMode::Exact);
//!
//!     let outcome = ReportWorkflow::new(&client).run(&request).await?;
//!     println!("Saved {}", outcome.path.display());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod auth;
pub mod build;
pub mod client;
pub mod region;
pub mod report;
pub mod workflow;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_utils;

use reqwest::Error as ReqwestError;
use secrecy::SecretString;
use std::fmt;

// Re-export common types for convenience
pub use app::{
    AppSelector, Application, ApplicationApi, ApplicationError, ApplicationInfo, CustomField,
    MatchMode, match_applications, single_match,
};
pub use auth::{HmacSigner, RequestSigner, VeracodeCredentials};
pub use build::{Build, BuildApi, BuildError, DYNAMIC_SCAN_MARKER, ScanType, select_latest_dynamic};
pub use client::{ReportBody, VeracodeClient};
pub use region::{ApiVersion, BaseUrls, VeracodeRegion};
pub use report::{ReportApi, ReportFormat, report_filename, write_output};
pub use workflow::{
    DEFAULT_REPORT_PREFIX, ErrorCategory, ReportOutcome, ReportRequest, ReportWorkflow,
    WorkflowError,
};
pub use xml::{XmlDocument, XmlElement};

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Veracode Detailed Report Fetcher";

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Default total request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 300;

/// Custom error type for Veracode API operations.
///
/// This enum represents every failure the client itself can produce;
/// resolver-level outcomes (not found, ambiguous, no build) live in the
/// module error types that wrap it.
#[derive(Debug)]
pub enum VeracodeError {
    /// HTTP request failed before a response arrived
    Http(ReqwestError),
    /// Server answered with a non-success status code
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
    /// Signature generation failed (bad key format, clock error, ...)
    Authentication(String),
    /// Response body was not well-formed XML
    XmlParse(String),
    /// The XML API reported an `<error>` document
    Api(String),
    /// Configuration is invalid
    InvalidConfig(String),
    /// Local file system failure while writing output
    Io(std::io::Error),
}

impl fmt::Display for VeracodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VeracodeError::Http(e) => write!(f, "HTTP error: {e}"),
            VeracodeError::HttpStatus { status, url, body } => {
                write!(f, "HTTP {status} from {url}")?;
                if !body.is_empty() {
                    write!(f, ": {body}")?;
                }
                Ok(())
            }
            VeracodeError::Authentication(e) => write!(f, "Authentication error: {e}"),
            VeracodeError::XmlParse(e) => write!(f, "XML parsing error: {e}"),
            VeracodeError::Api(e) => write!(f, "Veracode API error: {e}"),
            VeracodeError::InvalidConfig(e) => write!(f, "Invalid configuration: {e}"),
            VeracodeError::Io(e) => write!(f, "File I/O error: {e}"),
        }
    }
}

impl std::error::Error for VeracodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VeracodeError::Http(e) => Some(e),
            VeracodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReqwestError> for VeracodeError {
    fn from(error: ReqwestError) -> Self {
        VeracodeError::Http(error)
    }
}

impl From<std::io::Error> for VeracodeError {
    fn from(error: std::io::Error) -> Self {
        VeracodeError::Io(error)
    }
}

impl From<quick_xml::Error> for VeracodeError {
    fn from(error: quick_xml::Error) -> Self {
        VeracodeError::XmlParse(error.to_string())
    }
}

/// Configuration for the Veracode XML API client.
///
/// Passed explicitly into [`VeracodeClient::new`]; the library never reads
/// process-wide state, so tests can point `base_urls` at a fixture server.
#[derive(Debug, Clone)]
pub struct VeracodeConfig {
    /// Veracode region for your account
    pub region: VeracodeRegion,
    /// Legacy XML and REST base URLs (derived from `region` unless overridden)
    pub base_urls: BaseUrls,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Total request timeout in seconds
    pub request_timeout: u64,
    /// Explicit proxy URL
    pub proxy_url: Option<String>,
    /// Proxy basic auth username
    pub proxy_username: Option<SecretString>,
    /// Proxy basic auth password
    pub proxy_password: Option<SecretString>,
    /// Honour `HTTP(S)_PROXY` from the environment when no explicit proxy is set
    pub use_system_proxy: bool,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
}

impl Default for VeracodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VeracodeConfig {
    /// Create a new configuration for the Commercial region.
    #[must_use]
    pub fn new() -> Self {
        let region = VeracodeRegion::Commercial;
        Self {
            region,
            base_urls: region.base_urls(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            use_system_proxy: true,
            validate_certificates: true, // Default to secure
        }
    }

    /// Set the region for this configuration.
    ///
    /// This also resets both base URLs to the region's defaults.
    #[must_use]
    pub fn with_region(mut self, region: VeracodeRegion) -> Self {
        self.region = region;
        self.base_urls = region.base_urls();
        self
    }

    /// Override the base URLs (private proxies, fixture servers).
    #[must_use]
    pub fn with_base_urls(mut self, base_urls: BaseUrls) -> Self {
        self.base_urls = base_urls;
        self
    }

    /// Override only the legacy XML API base URL.
    #[must_use]
    pub fn with_xml_base_url(mut self, xml: impl Into<String>) -> Self {
        self.base_urls = BaseUrls::new(xml, self.base_urls.rest.clone());
        self
    }

    /// Override only the REST API base URL.
    #[must_use]
    pub fn with_rest_base_url(mut self, rest: impl Into<String>) -> Self {
        self.base_urls = BaseUrls::new(self.base_urls.xml.clone(), rest);
        self
    }

    /// Set connection and request timeouts in seconds.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: u64, request_timeout: u64) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    /// Route requests through an explicit proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Add basic authentication for the configured proxy.
    #[must_use]
    pub fn with_proxy_auth(mut self, username: SecretString, password: SecretString) -> Self {
        self.proxy_username = Some(username);
        self.proxy_password = Some(password);
        self
    }

    /// Ignore proxy settings from the environment.
    #[must_use]
    pub fn without_system_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Disable certificate validation for development environments.
    ///
    /// WARNING: This should only be used in development environments with
    /// self-signed certificates. Never use this in production.
    #[must_use]
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }
}
