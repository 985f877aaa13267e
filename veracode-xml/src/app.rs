//! Application lookup through the legacy XML API.
//!
//! Resolves the numeric `app_id` the XML endpoints need, either verbatim from
//! the caller or by searching `getapplist.do` by name. Multiple matches are
//! never resolved by guessing; they come back as
//! [`ApplicationError::Ambiguous`] with the candidate list.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::xml::{XmlDocument, XmlElement};
use crate::{ApiVersion, VeracodeClient, VeracodeError};

const APP_LIST_ENDPOINT: &str = "getapplist.do";
const APP_INFO_ENDPOINT: &str = "getappinfo.do";

/// Application entry from `getapplist.do`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    /// Numeric application ID, kept in string form
    pub app_id: String,
    /// Application name (not guaranteed unique)
    pub app_name: String,
    /// Policy name, when the account reports it
    pub policy_name: Option<String>,
    /// Last policy evaluation timestamp
    pub policy_updated_date: Option<String>,
    /// Every other attribute on the element
    pub attributes: HashMap<String, String>,
}

impl Application {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let app_id = element.attr("app_id").filter(|id| !id.is_empty())?;
        let mut attributes = HashMap::new();
        for (key, value) in &element.attributes {
            match key.as_str() {
                "app_id" | "app_name" | "policy_name" | "policy_updated_date" => {}
                _ => {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }

        Some(Self {
            app_id: app_id.to_string(),
            app_name: element.attr_or_empty("app_name").to_string(),
            policy_name: non_empty(element.attr("policy_name")),
            policy_updated_date: non_empty(element.attr("policy_updated_date")),
            attributes,
        })
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {})", self.app_name, self.app_id)
    }
}

/// Custom field attached to an application profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

/// Application profile from `getappinfo.do`
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationInfo {
    pub app_id: String,
    pub app_name: String,
    pub business_criticality: Option<String>,
    pub policy: Option<String>,
    pub policy_updated_date: Option<String>,
    pub teams: Option<String>,
    pub business_unit: Option<String>,
    pub modified_date: Option<String>,
    pub custom_fields: Vec<CustomField>,
    /// Response body exactly as received, undecoded
    #[serde(skip)]
    pub raw_xml: Vec<u8>,
}

impl ApplicationInfo {
    /// Attribute keys printed for an application profile, in display order
    pub const SUMMARY_KEYS: [&'static str; 8] = [
        "app_id",
        "app_name",
        "business_criticality",
        "policy",
        "policy_updated_date",
        "teams",
        "business_unit",
        "modified_date",
    ];

    /// Key/value pairs for [`ApplicationInfo::SUMMARY_KEYS`], `-` for missing values.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, &str)> {
        fn or_dash(value: &Option<String>) -> &str {
            value.as_deref().map_or("-", dash_if_empty)
        }
        fn dash_if_empty(value: &str) -> &str {
            if value.is_empty() { "-" } else { value }
        }

        vec![
            ("app_id", dash_if_empty(&self.app_id)),
            ("app_name", dash_if_empty(&self.app_name)),
            ("business_criticality", or_dash(&self.business_criticality)),
            ("policy", or_dash(&self.policy)),
            ("policy_updated_date", or_dash(&self.policy_updated_date)),
            ("teams", or_dash(&self.teams)),
            ("business_unit", or_dash(&self.business_unit)),
            ("modified_date", or_dash(&self.modified_date)),
        ]
    }

    fn from_document(document: &XmlDocument, raw_xml: Vec<u8>) -> Option<Self> {
        let app = document.find_first("application")?;
        let custom_fields = document
            .find_all("customfield")
            .into_iter()
            .map(|field| CustomField {
                name: field.attr_or_empty("name").to_string(),
                value: field.attr_or_empty("value").to_string(),
            })
            .collect();

        Some(Self {
            app_id: app.attr_or_empty("app_id").to_string(),
            app_name: app.attr_or_empty("app_name").to_string(),
            business_criticality: non_empty(app.attr("business_criticality")),
            policy: non_empty(app.attr("policy")),
            policy_updated_date: non_empty(app.attr("policy_updated_date")),
            teams: non_empty(app.attr("teams")),
            business_unit: non_empty(app.attr("business_unit")),
            modified_date: non_empty(app.attr("modified_date")),
            custom_fields,
            raw_xml,
        })
    }
}

/// How the caller identified the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSelector {
    /// Numeric ID, used verbatim
    Id(String),
    /// Human readable name, resolved through the application list
    Name(String),
}

impl AppSelector {
    /// Interpret a free-form argument: all digits is an ID, anything else a name.
    pub fn from_arg(value: &str) -> Self {
        let trimmed = value.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Self::Id(trimmed.to_string())
        } else {
            Self::Name(value.to_string())
        }
    }
}

impl fmt::Display for AppSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppSelector::Id(id) => write!(f, "app_id={id}"),
            AppSelector::Name(name) => write!(f, "app_name='{name}'"),
        }
    }
}

/// Name matching policy for application lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Name must equal the query exactly
    #[default]
    Exact,
    /// Case-insensitive substring match
    Substring,
}

impl MatchMode {
    #[must_use]
    pub fn matches(&self, candidate: &str, query: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == query,
            MatchMode::Substring => candidate.to_lowercase().contains(&query.to_lowercase()),
        }
    }
}

/// Application lookup errors
#[derive(Debug)]
pub enum ApplicationError {
    /// Veracode API error
    Api(VeracodeError),
    /// No application matched the query
    NotFound(String),
    /// More than one application matched; nothing was picked
    Ambiguous {
        query: String,
        candidates: Vec<Application>,
    },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Api(err) => write!(f, "API error: {err}"),
            ApplicationError::NotFound(query) => write!(f, "Application not found: {query}"),
            ApplicationError::Ambiguous { query, candidates } => {
                write!(
                    f,
                    "{} applications match '{query}': ",
                    candidates.len()
                )?;
                let names: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VeracodeError> for ApplicationError {
    fn from(err: VeracodeError) -> Self {
        ApplicationError::Api(err)
    }
}

/// Filter an application list by name.
#[must_use]
pub fn match_applications(apps: &[Application], query: &str, mode: MatchMode) -> Vec<Application> {
    apps.iter()
        .filter(|app| mode.matches(&app.app_name, query))
        .cloned()
        .collect()
}

/// Reduce a match set to one application or an explicit outcome.
///
/// # Errors
///
/// [`ApplicationError::NotFound`] when empty, [`ApplicationError::Ambiguous`]
/// when more than one candidate remains.
pub fn single_match(query: &str, mut matches: Vec<Application>) -> Result<Application, ApplicationError> {
    match matches.len() {
        0 => Err(ApplicationError::NotFound(query.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(ApplicationError::Ambiguous {
            query: query.to_string(),
            candidates: matches,
        }),
    }
}

/// Application API operations
pub struct ApplicationApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> ApplicationApi<'a> {
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// List every application visible to the credentials.
    ///
    /// # Errors
    ///
    /// Transport, parse and API errors from the client.
    pub async fn list_applications(&self) -> Result<Vec<Application>, ApplicationError> {
        let url = self.client.xml_url(ApiVersion::V5, APP_LIST_ENDPOINT);
        let document = self.client.get_xml(&url, &[]).await?;

        let mut apps = Vec::new();
        for element in document.find_all("app") {
            match Application::from_element(element) {
                Some(app) => apps.push(app),
                None => warn!("⚠️  Skipping application entry without app_id"),
            }
        }

        debug!("Application list contains {} entries", apps.len());
        Ok(apps)
    }

    /// Fetch the profile of one application.
    ///
    /// # Errors
    ///
    /// [`ApplicationError::NotFound`] when the response holds no `application` element.
    pub async fn get_app_info(&self, app_id: &str) -> Result<ApplicationInfo, ApplicationError> {
        let url = self.client.xml_url(ApiVersion::V5, APP_INFO_ENDPOINT);
        let (document, raw_xml) = self.client.get_xml_raw(&url, &[("app_id", app_id)]).await?;

        ApplicationInfo::from_document(&document, raw_xml)
            .ok_or_else(|| ApplicationError::NotFound(format!("app_id={app_id}")))
    }

    /// Applications whose name matches `name` under `mode`.
    ///
    /// # Errors
    ///
    /// Errors from [`ApplicationApi::list_applications`].
    pub async fn find_applications(
        &self,
        name: &str,
        mode: MatchMode,
    ) -> Result<Vec<Application>, ApplicationError> {
        let apps = self.list_applications().await?;
        Ok(match_applications(&apps, name, mode))
    }

    /// Resolve a selector to exactly one `app_id`.
    ///
    /// IDs are returned without any network call.
    ///
    /// # Errors
    ///
    /// Not found, ambiguous, or any client error.
    pub async fn resolve_app_id(
        &self,
        selector: &AppSelector,
        mode: MatchMode,
    ) -> Result<String, ApplicationError> {
        match selector {
            AppSelector::Id(app_id) => Ok(app_id.clone()),
            AppSelector::Name(name) => {
                info!("🔍 Looking up app_id for app_name='{name}'");
                let matches = self.find_applications(name, mode).await?;
                let app = single_match(name, matches)?;
                info!("✅ Found application '{}' with ID: {}", app.app_name, app.app_id);
                Ok(app.app_id)
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
