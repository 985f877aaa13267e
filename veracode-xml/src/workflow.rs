//! End-to-end detailed report workflow.
//!
//! Application → build → report, strictly in that order. Any failure stops
//! the pipeline; nothing is retried and no partial result is returned.

use log::info;
use std::fmt;
use std::path::PathBuf;

use crate::app::{AppSelector, ApplicationApi, ApplicationError, MatchMode};
use crate::build::{BuildApi, BuildError, ScanType};
use crate::report::{ReportApi, ReportFormat};
use crate::{VeracodeClient, VeracodeError};

/// Default filename prefix for saved reports
pub const DEFAULT_REPORT_PREFIX: &str = "veracode_";

/// Coarse classification of workflow failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad region, identifier, credentials or other local configuration
    Configuration,
    /// Network failure, non-success status or an API `<error>` document
    Transport,
    /// Malformed XML in a response
    Parse,
    /// No matching application or no eligible build
    NotFound,
    /// Several applications matched a name
    Ambiguous,
    /// Output could not be written
    Io,
}

impl ErrorCategory {
    /// Category of a client-level error
    #[must_use]
    pub fn of(error: &VeracodeError) -> Self {
        match error {
            VeracodeError::Http(_) | VeracodeError::HttpStatus { .. } | VeracodeError::Api(_) => {
                ErrorCategory::Transport
            }
            VeracodeError::Authentication(_) | VeracodeError::InvalidConfig(_) => {
                ErrorCategory::Configuration
            }
            VeracodeError::XmlParse(_) => ErrorCategory::Parse,
            VeracodeError::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Errors that can occur during the report workflow
#[derive(Debug)]
pub enum WorkflowError {
    /// Application resolution failed
    Application(ApplicationError),
    /// Build resolution failed
    Build(BuildError),
    /// Report download or save failed
    Report(VeracodeError),
}

impl ApplicationError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApplicationError::Api(err) => ErrorCategory::of(err),
            ApplicationError::NotFound(_) => ErrorCategory::NotFound,
            ApplicationError::Ambiguous { .. } => ErrorCategory::Ambiguous,
        }
    }
}

impl BuildError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::Api(err) => ErrorCategory::of(err),
            BuildError::NoBuild { .. } => ErrorCategory::NotFound,
        }
    }
}

impl WorkflowError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::Application(err) => err.category(),
            WorkflowError::Build(err) => err.category(),
            WorkflowError::Report(err) => ErrorCategory::of(err),
        }
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::Application(err) => write!(f, "Application lookup failed: {err}"),
            WorkflowError::Build(err) => write!(f, "Build lookup failed: {err}"),
            WorkflowError::Report(err) => write!(f, "Report download failed: {err}"),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Application(err) => Some(err),
            WorkflowError::Build(err) => Some(err),
            WorkflowError::Report(err) => Some(err),
        }
    }
}

impl From<ApplicationError> for WorkflowError {
    fn from(err: ApplicationError) -> Self {
        WorkflowError::Application(err)
    }
}

impl From<BuildError> for WorkflowError {
    fn from(err: BuildError) -> Self {
        WorkflowError::Build(err)
    }
}

impl From<VeracodeError> for WorkflowError {
    fn from(err: VeracodeError) -> Self {
        WorkflowError::Report(err)
    }
}

/// What to fetch and where to put it
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub selector: AppSelector,
    pub match_mode: MatchMode,
    pub scan_type: ScanType,
    pub format: ReportFormat,
    pub output_dir: PathBuf,
    pub prefix: String,
}

impl ReportRequest {
    /// Static scan, exact name matching, current directory, default prefix.
    pub fn new(selector: AppSelector, format: ReportFormat) -> Self {
        Self {
            selector,
            match_mode: MatchMode::Exact,
            scan_type: ScanType::Static,
            format,
            output_dir: PathBuf::from("."),
            prefix: DEFAULT_REPORT_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: AppSelector) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    #[must_use]
    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Result of a completed workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub app_id: String,
    pub build_id: String,
    /// Absolute path of the saved report
    pub path: PathBuf,
}

/// Detailed report workflow over one client
pub struct ReportWorkflow<'a> {
    client: &'a VeracodeClient,
}

impl<'a> ReportWorkflow<'a> {
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// Resolve the application and build, then download the report.
    ///
    /// # Errors
    ///
    /// The first failing step's error; later steps are not attempted.
    pub async fn run(&self, request: &ReportRequest) -> Result<ReportOutcome, WorkflowError> {
        info!(
            "🚀 Fetching {} detailed report for {} (scan_type={})",
            request.format, request.selector, request.scan_type
        );

        let app_id = ApplicationApi::new(self.client)
            .resolve_app_id(&request.selector, request.match_mode)
            .await?;

        let build_id = BuildApi::new(self.client)
            .resolve_build_id(&app_id, request.scan_type)
            .await?;

        let path = ReportApi::new(self.client)
            .fetch_detailed_report(
                &app_id,
                &build_id,
                request.format,
                &request.output_dir,
                &request.prefix,
            )
            .await?;

        Ok(ReportOutcome {
            app_id,
            build_id,
            path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{
        APP_LIST_PATH, APP_LIST_XML, BUILD_INFO_PATH, BUILD_INFO_XML, BUILD_LIST_PATH,
        BUILD_LIST_XML, FixtureRoute, FixtureServer, PDF_REPORT_PATH, XML_REPORT_PATH,
    };
    use tempfile::TempDir;

    const REPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<detailedreport xmlns="https://www.veracode.com/schema/reports/export/1.0" app_id="42" build_id="9001" app_name="test_java"/>"#;

    #[tokio::test]
    async fn test_end_to_end_static_xml_report() {
        let out = TempDir::new().unwrap();
        let server = FixtureServer::start(vec![
            (APP_LIST_PATH, FixtureRoute::xml(APP_LIST_XML)),
            (BUILD_INFO_PATH, FixtureRoute::xml(BUILD_INFO_XML)),
            (XML_REPORT_PATH, FixtureRoute::xml(REPORT_XML)),
        ])
        .await;
        let client = server.client();

        let request = ReportRequest::new(AppSelector::Name("test_java".to_string()), ReportFormat::Xml)
            .with_output_dir(out.path());
        let outcome = ReportWorkflow::new(&client).run(&request).await.unwrap();

        assert_eq!(outcome.app_id, "42");
        assert_eq!(outcome.build_id, "9001");
        assert_eq!(outcome.path.file_name().unwrap(), "veracode_42_9001_report.xml");
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), REPORT_XML);

        let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![APP_LIST_PATH, BUILD_INFO_PATH, XML_REPORT_PATH]);
    }

    #[tokio::test]
    async fn test_dynamic_pdf_by_id() {
        let out = TempDir::new().unwrap();
        let server = FixtureServer::start(vec![
            (BUILD_LIST_PATH, FixtureRoute::xml(BUILD_LIST_XML)),
            (PDF_REPORT_PATH, FixtureRoute::pdf(b"%PDF-1.4 dynamic")),
        ])
        .await;
        let client = server.client();

        let request = ReportRequest::new(AppSelector::Id("42".to_string()), ReportFormat::Pdf)
            .with_scan_type(ScanType::Dynamic)
            .with_prefix("")
            .with_output_dir(out.path());
        let outcome = ReportWorkflow::new(&client).run(&request).await.unwrap();

        assert_eq!(outcome.build_id, "103");
        assert_eq!(outcome.path.file_name().unwrap(), "42_103_report.pdf");

        let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![BUILD_LIST_PATH, PDF_REPORT_PATH]);
    }

    #[tokio::test]
    async fn test_ambiguous_name_stops_pipeline() {
        let out = TempDir::new().unwrap();
        let server = FixtureServer::start(vec![
            (APP_LIST_PATH, FixtureRoute::xml(APP_LIST_XML)),
            (BUILD_INFO_PATH, FixtureRoute::xml(BUILD_INFO_XML)),
        ])
        .await;
        let client = server.client();

        let request = ReportRequest::new(AppSelector::Name("java".to_string()), ReportFormat::Xml)
            .with_match_mode(MatchMode::Substring)
            .with_output_dir(out.path());
        let err = ReportWorkflow::new(&client).run(&request).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Ambiguous);
        assert_eq!(server.requests().len(), 1);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_stops_pipeline() {
        let out = TempDir::new().unwrap();
        let server = FixtureServer::start(vec![
            (BUILD_INFO_PATH, FixtureRoute::status(403, "Access denied")),
            (XML_REPORT_PATH, FixtureRoute::xml(REPORT_XML)),
        ])
        .await;
        let client = server.client();

        let request = ReportRequest::new(AppSelector::Id("42".to_string()), ReportFormat::Xml)
            .with_output_dir(out.path());
        let err = ReportWorkflow::new(&client).run(&request).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.to_string().contains("403"));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_error_categories() {
        let not_found = WorkflowError::from(ApplicationError::NotFound("x".to_string()));
        assert_eq!(not_found.category(), ErrorCategory::NotFound);

        let no_build = WorkflowError::from(BuildError::NoBuild {
            app_id: "1".to_string(),
            scan_type: ScanType::Dynamic,
        });
        assert_eq!(no_build.category(), ErrorCategory::NotFound);

        let parse = WorkflowError::from(BuildError::Api(VeracodeError::XmlParse("bad".to_string())));
        assert_eq!(parse.category(), ErrorCategory::Parse);

        let config = WorkflowError::from(ApplicationError::Api(VeracodeError::InvalidConfig(
            "bad region".to_string(),
        )));
        assert_eq!(config.category(), ErrorCategory::Configuration);

        let io = WorkflowError::from(VeracodeError::Io(std::io::Error::other("disk full")));
        assert_eq!(io.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_request_defaults() {
        let request = ReportRequest::new(AppSelector::Id("1".to_string()), ReportFormat::Xml);
        assert_eq!(request.match_mode, MatchMode::Exact);
        assert_eq!(request.scan_type, ScanType::Static);
        assert_eq!(request.output_dir, PathBuf::from("."));
        assert_eq!(request.prefix, DEFAULT_REPORT_PREFIX);
    }
}
