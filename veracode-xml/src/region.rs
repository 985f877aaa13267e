//! Regional endpoint resolution for the Veracode APIs.
//!
//! Every Veracode region exposes two hosts: the legacy XML API
//! (`analysiscenter.veracode.*`) and the REST API (`api.veracode.*`).
//! Most legacy endpoints live under the `5.0/` path segment, while the PDF
//! variant of the detailed report is only served from `4.0/`.

use std::fmt;
use std::str::FromStr;

use crate::VeracodeError;

/// Veracode regions for API access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VeracodeRegion {
    /// Commercial region (default) - analysiscenter.veracode.com
    #[default]
    Commercial,
    /// European region - analysiscenter.veracode.eu
    European,
    /// US Federal region - analysiscenter.veracode.us
    Federal,
}

impl VeracodeRegion {
    /// Short region code as accepted on the command line
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commercial => "us",
            Self::European => "eu",
            Self::Federal => "us_fed",
        }
    }

    /// List all valid codes for help text
    #[must_use]
    pub fn valid_values() -> &'static str {
        "us, eu, us_fed, gov"
    }

    /// Base URLs (legacy XML API, REST API) for this region.
    #[must_use]
    pub fn base_urls(&self) -> BaseUrls {
        let (xml, rest) = match self {
            Self::Commercial => (
                "https://analysiscenter.veracode.com/api/",
                "https://api.veracode.com/",
            ),
            Self::European => (
                "https://analysiscenter.veracode.eu/api/",
                "https://api.veracode.eu/",
            ),
            Self::Federal => (
                "https://analysiscenter.veracode.us/api/",
                "https://api.veracode.us/",
            ),
        };
        BaseUrls::new(xml, rest)
    }
}

impl FromStr for VeracodeRegion {
    type Err = VeracodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" => Ok(Self::Commercial),
            "eu" => Ok(Self::European),
            "us_fed" | "gov" => Ok(Self::Federal),
            _ => Err(VeracodeError::InvalidConfig(format!(
                "Unknown region '{s}'. Valid values: {}",
                Self::valid_values()
            ))),
        }
    }
}

impl fmt::Display for VeracodeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a region code straight to its base URLs.
///
/// # Errors
///
/// Returns [`VeracodeError::InvalidConfig`] for an unrecognised code.
pub fn resolve(region_code: &str) -> Result<BaseUrls, VeracodeError> {
    Ok(region_code.parse::<VeracodeRegion>()?.base_urls())
}

/// Versioned path segment of the legacy XML API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `4.0/` - only the PDF detailed report still lives here
    V4,
    /// `5.0/` - every other endpoint used by this crate
    V5,
}

impl ApiVersion {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V4 => "4.0",
            Self::V5 => "5.0",
        }
    }
}

/// Pair of base URLs for one region.
///
/// The XML base ends with the `api/` segment; callers append the version and
/// endpoint through [`BaseUrls::xml_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrls {
    /// Legacy XML API base, e.g. `https://analysiscenter.veracode.com/api/`
    pub xml: String,
    /// REST API base, e.g. `https://api.veracode.com/`
    pub rest: String,
}

impl BaseUrls {
    /// Create base URLs from explicit values (fixture servers, private proxies).
    pub fn new(xml: impl Into<String>, rest: impl Into<String>) -> Self {
        Self {
            xml: with_trailing_slash(xml.into()),
            rest: with_trailing_slash(rest.into()),
        }
    }

    /// Full URL of a legacy XML endpoint, e.g. `<xml>5.0/getapplist.do`.
    #[must_use]
    pub fn xml_endpoint(&self, version: ApiVersion, name: &str) -> String {
        let mut url = String::with_capacity(
            self.xml
                .len()
                .saturating_add(name.len())
                .saturating_add(4),
        );
        url.push_str(&self.xml);
        url.push_str(version.as_str());
        url.push('/');
        url.push_str(name.trim_start_matches('/'));
        url
    }
}

fn with_trailing_slash(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}
