//! Build lookup for Veracode applications.
//!
//! This module queries the Build XML APIs (`getbuildinfo.do`,
//! `getbuildlist.do`) and decides which build a report should be taken from:
//! the current build for static scans, the most recently policy-evaluated
//! dynamic build for dynamic scans.

use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::xml::XmlElement;
use crate::{ApiVersion, VeracodeClient, VeracodeError};

const BUILD_INFO_ENDPOINT: &str = "getbuildinfo.do";
const BUILD_LIST_ENDPOINT: &str = "getbuildlist.do";

/// Value of `dynamic_scan_type` that marks a dynamic analysis build
pub const DYNAMIC_SCAN_MARKER: &str = "ds";

/// Text of the `<error>` document returned when an application has no build
const NO_BUILD_MESSAGE: &str = "Could not find a build";

/// Scan type used to pick a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScanType {
    /// Static analysis (`ss`)
    #[default]
    Static,
    /// Dynamic analysis (`ds`)
    Dynamic,
}

impl ScanType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Static => "ss",
            ScanType::Dynamic => DYNAMIC_SCAN_MARKER,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ScanType::Static => "Static",
            ScanType::Dynamic => "Dynamic",
        }
    }
}

impl FromStr for ScanType {
    type Err = VeracodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ss" | "static" => Ok(ScanType::Static),
            "ds" | "dynamic" => Ok(ScanType::Dynamic),
            _ => Err(VeracodeError::InvalidConfig(format!(
                "Unknown scan type '{s}'. Valid values: ss, ds"
            ))),
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a Veracode build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Build {
    /// Build ID
    pub build_id: String,
    /// Build version label
    pub version: Option<String>,
    /// Dynamic marker, `ds` for dynamic analysis builds
    pub dynamic_scan_type: Option<String>,
    /// Policy evaluation timestamp, as sent by the server
    pub policy_updated_date: Option<String>,
    /// All attributes of the element in document order
    pub attributes: Vec<(String, String)>,
}

impl Build {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let build_id = element.attr("build_id").filter(|id| !id.is_empty())?;
        Some(Self {
            build_id: build_id.to_string(),
            version: element.attr("version").map(str::to_string),
            dynamic_scan_type: element.attr("dynamic_scan_type").map(str::to_string),
            policy_updated_date: element.attr("policy_updated_date").map(str::to_string),
            attributes: element.attributes.clone(),
        })
    }

    /// Carries the dynamic marker
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_scan_type.as_deref() == Some(DYNAMIC_SCAN_MARKER)
    }

    /// `Dynamic` when any dynamic scan type is present, `Static` otherwise.
    #[must_use]
    pub fn scan_label(&self) -> &'static str {
        if self.dynamic_scan_type.as_deref().is_some_and(|t| !t.is_empty()) {
            ScanType::Dynamic.label()
        } else {
            ScanType::Static.label()
        }
    }

    fn policy_date(&self) -> &str {
        self.policy_updated_date.as_deref().unwrap_or_default()
    }
}

/// Pick the latest dynamic build.
///
/// Only builds with the dynamic marker and a non-empty `policy_updated_date`
/// are eligible. Dates compare as plain strings; on equal dates the later
/// entry in the list wins.
#[must_use]
pub fn select_latest_dynamic(builds: &[Build]) -> Option<&Build> {
    builds
        .iter()
        .filter(|build| build.is_dynamic() && !build.policy_date().is_empty())
        .max_by(|a, b| a.policy_date().cmp(b.policy_date()))
}

/// Build specific error types
#[derive(Debug)]
pub enum BuildError {
    /// Veracode API error
    Api(VeracodeError),
    /// No eligible build exists for the application
    NoBuild { app_id: String, scan_type: ScanType },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Api(err) => write!(f, "API error: {err}"),
            BuildError::NoBuild { app_id, scan_type } => write!(
                f,
                "No {} build found for app_id={app_id}",
                scan_type.label().to_lowercase()
            ),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Api(err) => Some(err),
            BuildError::NoBuild { .. } => None,
        }
    }
}

impl From<VeracodeError> for BuildError {
    fn from(err: VeracodeError) -> Self {
        BuildError::Api(err)
    }
}

/// Build API operations for Veracode platform
pub struct BuildApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> BuildApi<'a> {
    /// Create a new BuildApi instance
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// Fetch one build: the current build, or `build_id` when given.
    ///
    /// # Errors
    ///
    /// [`BuildError::NoBuild`] when the response carries no usable `build`
    /// element, otherwise any client error.
    pub async fn get_build_info(
        &self,
        app_id: &str,
        build_id: Option<&str>,
    ) -> Result<Build, BuildError> {
        let url = self.client.xml_url(ApiVersion::V5, BUILD_INFO_ENDPOINT);
        let mut params = vec![("app_id", app_id)];
        if let Some(build_id) = build_id {
            params.push(("build_id", build_id));
        }

        let no_build = || BuildError::NoBuild {
            app_id: app_id.to_string(),
            scan_type: ScanType::Static,
        };

        let document = match self.client.get_xml(&url, &params).await {
            Ok(document) => document,
            Err(VeracodeError::Api(msg)) if msg.contains(NO_BUILD_MESSAGE) => {
                debug!("getbuildinfo reported: {msg}");
                return Err(no_build());
            }
            Err(err) => return Err(err.into()),
        };

        document
            .find_first("build")
            .and_then(Build::from_element)
            .ok_or_else(no_build)
    }

    /// List all builds of an application in server order.
    ///
    /// # Errors
    ///
    /// Any client error.
    pub async fn get_build_list(&self, app_id: &str) -> Result<Vec<Build>, BuildError> {
        let url = self.client.xml_url(ApiVersion::V5, BUILD_LIST_ENDPOINT);
        let document = self.client.get_xml(&url, &[("app_id", app_id)]).await?;

        let builds: Vec<Build> = document
            .find_all("build")
            .into_iter()
            .filter_map(Build::from_element)
            .collect();
        debug!("Build list for app_id={app_id} contains {} builds", builds.len());
        Ok(builds)
    }

    /// Determine the build a report should be fetched from.
    ///
    /// # Errors
    ///
    /// [`BuildError::NoBuild`] when no eligible build exists.
    pub async fn resolve_build_id(
        &self,
        app_id: &str,
        scan_type: ScanType,
    ) -> Result<String, BuildError> {
        info!("📦 Fetching latest {} build for app_id={app_id}", scan_type.label().to_lowercase());

        let build_id = match scan_type {
            ScanType::Static => self.get_build_info(app_id, None).await?.build_id,
            ScanType::Dynamic => {
                let builds = self.get_build_list(app_id).await?;
                select_latest_dynamic(&builds)
                    .map(|build| build.build_id.clone())
                    .ok_or_else(|| BuildError::NoBuild {
                        app_id: app_id.to_string(),
                        scan_type,
                    })?
            }
        };

        info!("✅ Found build_id={build_id}");
        Ok(build_id)
    }
}
