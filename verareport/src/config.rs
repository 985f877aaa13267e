//! Client configuration from CLI flags and environment variables
use log::{debug, warn};
use secrecy::SecretString;
use std::path::PathBuf;
use veracode_xml::{VeracodeConfig, VeracodeRegion};

use crate::Result;
use crate::cli::Cli;

/// Resolve the region: flag first, then `VERACODE_REGION`, then `us`.
pub fn resolve_region<F>(flag: Option<VeracodeRegion>, env: &F) -> Result<VeracodeRegion>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(region) = flag {
        return Ok(region);
    }
    match env("VERACODE_REGION").filter(|value| !value.trim().is_empty()) {
        Some(value) => {
            debug!("Using region from VERACODE_REGION: {value}");
            Ok(value.parse()?)
        }
        None => Ok(VeracodeRegion::default()),
    }
}

/// Output directory: flag first, then `VERACODE_OUTPUT_DIR`, then `.`.
pub fn resolve_output_dir<F>(flag: Option<PathBuf>, env: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    flag.or_else(|| {
        env("VERACODE_OUTPUT_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Build the client configuration from parsed arguments and the process environment.
pub fn build_config(cli: &Cli) -> Result<VeracodeConfig> {
    build_config_with(cli, &|name: &str| std::env::var(name).ok())
}

/// Build the client configuration from parsed arguments and an environment lookup.
pub fn build_config_with<F>(cli: &Cli, env: &F) -> Result<VeracodeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let region = resolve_region(cli.region, env)?;
    let mut config = VeracodeConfig::new()
        .with_region(region)
        .with_timeouts(cli.connect_timeout, cli.request_timeout);

    if let Some(xml) = env("VERACODE_XML_BASE").filter(|v| !v.is_empty()) {
        debug!("🔧 XML API base overridden: {xml}");
        config = config.with_xml_base_url(xml);
    }
    if let Some(rest) = env("VERACODE_REST_BASE").filter(|v| !v.is_empty()) {
        debug!("🔧 REST API base overridden: {rest}");
        config = config.with_rest_base_url(rest);
    }
    if let Some(user_agent) = env("VERAREPORT_USER_AGENT").filter(|v| !v.trim().is_empty()) {
        debug!("🔧 User-Agent overridden: {user_agent}");
        config = config.with_user_agent(user_agent);
    }

    Ok(configure_with_env_vars(config, env))
}

/// Apply certificate and proxy settings from environment variables.
fn configure_with_env_vars<F>(mut config: VeracodeConfig, env: &F) -> VeracodeConfig
where
    F: Fn(&str) -> Option<String>,
{
    if env("VERAREPORT_DISABLE_CERT_VALIDATION").is_some() {
        config = config.with_certificate_validation_disabled();
        warn!(
            "⚠️  WARNING: Certificate validation disabled for Veracode API via VERAREPORT_DISABLE_CERT_VALIDATION"
        );
        warn!("   This should only be used in development environments!");
    }

    let proxy_url = env("HTTPS_PROXY")
        .or_else(|| env("https_proxy"))
        .or_else(|| env("HTTP_PROXY"))
        .or_else(|| env("http_proxy"))
        .filter(|url| !url.is_empty());

    if let Some(url) = proxy_url {
        debug!("🔒 Proxy configuration detected from environment: {url}");
        config = config.with_proxy(url);

        let username = env("PROXY_USERNAME").or_else(|| env("proxy_username"));
        let password = env("PROXY_PASSWORD").or_else(|| env("proxy_password"));

        if let (Some(u), Some(p)) = (username, password) {
            debug!("🔐 Proxy authentication credentials found in environment");
            config = config.with_proxy_auth(SecretString::from(u), SecretString::from(p));
        }
    }

    config
}
