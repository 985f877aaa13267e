//! Core Veracode XML API client implementation.
//!
//! This module contains the HTTP client used by every resolver: it builds the
//! request URL, asks the injected [`RequestSigner`] for an `Authorization`
//! header, sends exactly one GET and turns non-success statuses into errors.

use log::debug;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::report::ReportFormat;
use crate::xml::XmlDocument;
use crate::{ApiVersion, RequestSigner, VeracodeConfig, VeracodeError};

/// Longest slice of an error body kept in [`VeracodeError::HttpStatus`]
const ERROR_BODY_EXCERPT: usize = 512;

/// Body of a downloaded report, exactly as the server sent it.
///
/// XML reports are not re-encoded: the bytes keep whatever encoding the
/// document declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBody {
    pub format: ReportFormat,
    bytes: Vec<u8>,
}

impl ReportBody {
    #[must_use]
    pub fn new(format: ReportFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Core Veracode XML API client.
///
/// Holds the explicit [`VeracodeConfig`] and an injected signer; the client
/// never reads credentials or base URLs from the environment.
#[derive(Clone)]
pub struct VeracodeClient {
    config: VeracodeConfig,
    client: Client,
    signer: Arc<dyn RequestSigner>,
}

impl fmt::Debug for VeracodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeracodeClient")
            .field("config", &self.config)
            .field("signer", &"<RequestSigner>")
            .finish_non_exhaustive()
    }
}

impl VeracodeClient {
    /// Create a new Veracode API client.
    ///
    /// # Errors
    ///
    /// Returns [`VeracodeError::InvalidConfig`] for a malformed proxy URL and
    /// [`VeracodeError::Http`] when the underlying HTTP client cannot be built.
    pub fn new(
        config: VeracodeConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, VeracodeError> {
        let mut client_builder = Client::builder().user_agent(config.user_agent.clone());

        // Use the certificate validation setting from config
        if !config.validate_certificates {
            client_builder = client_builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        client_builder = client_builder
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if let Some(proxy_url) = &config.proxy_url {
            let mut proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| VeracodeError::InvalidConfig(format!("Invalid proxy URL: {e}")))?;

            // Add basic authentication if credentials are provided
            if let (Some(username), Some(password)) =
                (&config.proxy_username, &config.proxy_password)
            {
                proxy = proxy.basic_auth(username.expose_secret(), password.expose_secret());
            }

            client_builder = client_builder.proxy(proxy);
        } else if !config.use_system_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build().map_err(VeracodeError::Http)?;
        Ok(Self {
            config,
            client,
            signer,
        })
    }

    /// Get access to the configuration
    #[must_use]
    pub fn config(&self) -> &VeracodeConfig {
        &self.config
    }

    /// Full URL of a legacy XML endpoint for the configured base.
    #[must_use]
    pub fn xml_url(&self, version: ApiVersion, name: &str) -> String {
        self.config.base_urls.xml_endpoint(version, name)
    }

    fn build_url(endpoint_url: &str, params: &[(&str, &str)]) -> Result<Url, VeracodeError> {
        let mut url = Url::parse(endpoint_url).map_err(|e| {
            VeracodeError::InvalidConfig(format!("Invalid endpoint URL '{endpoint_url}': {e}"))
        })?;

        if !params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Issue one signed GET and fail on any non-success status.
    async fn get(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, VeracodeError> {
        let url = Self::build_url(endpoint_url, params)?;
        let auth_header = self.signer.authorization("GET", &url)?;

        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .header("Authorization", auth_header)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Convert a non-success response into [`VeracodeError::HttpStatus`].
    ///
    /// # Errors
    ///
    /// Returns the status error, or a transport error if the error body cannot be read.
    pub async fn handle_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, VeracodeError> {
        let status = response.status();
        if status.is_success() {
            debug!("HTTP {status} from {}", response.url().path());
            return Ok(response);
        }

        let mut url = response.url().clone();
        url.set_query(None);
        let error_text = response.text().await.unwrap_or_default();
        Err(VeracodeError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            body: excerpt(error_text.trim()),
        })
    }

    /// GET an XML endpoint and parse the response.
    ///
    /// # Errors
    ///
    /// Transport errors, [`VeracodeError::XmlParse`] for malformed bodies and
    /// [`VeracodeError::Api`] when the server answers with an `<error>` document.
    pub async fn get_xml(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
    ) -> Result<XmlDocument, VeracodeError> {
        let text = self.get_text(endpoint_url, params).await?;
        let document = XmlDocument::parse(&text)?;
        document.check_api_error()?;
        Ok(document)
    }

    /// GET an endpoint and return the body decoded as text.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or non-success status.
    pub async fn get_text(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, VeracodeError> {
        let response = self.get(endpoint_url, params).await?;
        Ok(response.text().await?)
    }

    /// GET an XML endpoint, keeping the undecoded body next to the parsed document.
    ///
    /// # Errors
    ///
    /// Same as [`VeracodeClient::get_xml`].
    pub async fn get_xml_raw(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
    ) -> Result<(XmlDocument, Vec<u8>), VeracodeError> {
        let raw = self.get_bytes(endpoint_url, params).await?;
        let document = XmlDocument::parse_bytes(&raw)?;
        document.check_api_error()?;
        Ok((document, raw))
    }

    /// GET an endpoint and return the raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or non-success status.
    pub async fn get_bytes(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<u8>, VeracodeError> {
        let response = self.get(endpoint_url, params).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Download a report body. Both formats are kept byte for byte.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or non-success status.
    pub async fn get_report(
        &self,
        endpoint_url: &str,
        params: &[(&str, &str)],
        format: ReportFormat,
    ) -> Result<ReportBody, VeracodeError> {
        let bytes = self.get_bytes(endpoint_url, params).await?;
        Ok(ReportBody::new(format, bytes))
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_EXCERPT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    format!("{}...", &body[..end])
}
