//! CLI argument parsing for verareport
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use veracode_xml::{
    AppSelector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REPORT_PREFIX, DEFAULT_REQUEST_TIMEOUT,
    MatchMode, ReportFormat, ScanType, VeracodeRegion,
};

#[derive(Parser, Debug)]
#[command(
    name = "verareport",
    version,
    about = "Veracode detailed report fetcher",
    long_about = "Download the detailed report (XML or PDF) of the latest static or dynamic build of a Veracode application using the legacy XML API",
    after_help = "CREDENTIALS:
  VERACODE_API_KEY_ID / VERACODE_API_KEY_SECRET, or
  VERACODE_API_ID / VERACODE_API_KEY, or
  ~/.veracode/credentials (profile from VERACODE_API_PROFILE)

ENVIRONMENT:
  VERACODE_REGION        Default region when --region is omitted
  VERACODE_OUTPUT_DIR    Default output directory for reports
  VERACODE_XML_BASE      Override the XML API base URL
  VERACODE_REST_BASE     Override the REST API base URL
  VERAREPORT_USER_AGENT  Override the User-Agent header
  HTTPS_PROXY            Proxy for API calls (PROXY_USERNAME / PROXY_PASSWORD)

EXAMPLES:
  # Latest static scan of an application, as XML
  verareport report --app-name test_java --format XML

  # Latest dynamic scan as PDF into ./reports
  verareport report --app-id 42 --format PDF --scan-type ds -o reports

  # Same, letting the argument decide between ID and name
  verareport report --app 42 -f PDF -s ds

  # Pick interactively when several names contain 'payments'
  verareport report -n payments --fuzzy --interactive -f XML"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Veracode region (us, eu, us_fed, gov). Defaults to VERACODE_REGION, then us
    #[arg(short, long, global = true, value_parser = clap::value_parser!(VeracodeRegion))]
    pub region: Option<VeracodeRegion>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Connection timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_CONNECT_TIMEOUT, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout: u64,
}

/// Application to operate on: exactly one of id, name or either
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct AppTarget {
    /// Numeric application ID
    #[arg(short = 'i', long, value_parser = validate_app_id)]
    pub app_id: Option<String>,

    /// Application name
    #[arg(short = 'n', long, value_parser = validate_app_name)]
    pub app_name: Option<String>,

    /// Application ID or name; all digits is taken as an ID
    #[arg(short = 'a', long, value_parser = validate_app_name)]
    pub app: Option<String>,
}

impl AppTarget {
    #[must_use]
    pub fn selector(&self) -> Option<AppSelector> {
        if let Some(id) = &self.app_id {
            return Some(AppSelector::Id(id.clone()));
        }
        if let Some(name) = &self.app_name {
            return Some(AppSelector::Name(name.clone()));
        }
        self.app.as_deref().map(AppSelector::from_arg)
    }
}

/// Name matching behaviour
#[derive(Args, Debug, Clone, Default)]
pub struct MatchArgs {
    /// Match application names by case-insensitive substring
    #[arg(long)]
    pub fuzzy: bool,

    /// Prompt for a choice when several applications match
    #[arg(long)]
    pub interactive: bool,
}

impl MatchArgs {
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        if self.fuzzy {
            MatchMode::Substring
        } else {
            MatchMode::Exact
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the detailed report of the latest build
    Report {
        #[command(flatten)]
        target: AppTarget,

        #[command(flatten)]
        matching: MatchArgs,

        /// Report format: XML or PDF
        #[arg(short, long, value_parser = clap::value_parser!(ReportFormat))]
        format: ReportFormat,

        /// Scan type: ss (static) or ds (dynamic)
        #[arg(short, long, default_value = "ss", value_parser = clap::value_parser!(ScanType))]
        scan_type: ScanType,

        /// Output directory. Defaults to VERACODE_OUTPUT_DIR, then the current directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Filename prefix for the saved report
        #[arg(short, long, default_value = DEFAULT_REPORT_PREFIX)]
        prefix: String,
    },

    /// List applications visible to the API credentials
    Apps {
        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Show an application profile
    AppInfo {
        #[command(flatten)]
        target: AppTarget,

        #[command(flatten)]
        matching: MatchArgs,

        /// Print the raw XML response
        #[arg(long)]
        show_xml: bool,

        /// Save the raw XML as <prefix>app_info_<app_id>.xml in this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Filename prefix for the saved profile
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Print JSON instead of a listing
        #[arg(long, conflicts_with = "show_xml")]
        json: bool,
    },

    /// List builds of an application
    Builds {
        #[command(flatten)]
        target: AppTarget,

        #[command(flatten)]
        matching: MatchArgs,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Show a build, or the latest build of a scan type
    BuildInfo {
        #[command(flatten)]
        target: AppTarget,

        #[command(flatten)]
        matching: MatchArgs,

        /// Build ID. When omitted the latest build of --scan-type is shown
        #[arg(short, long, value_parser = validate_build_id)]
        build_id: Option<String>,

        /// Scan type used when no build ID is given: ss or ds
        #[arg(short, long, default_value = "ss", value_parser = clap::value_parser!(ScanType))]
        scan_type: ScanType,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
}

fn validate_numeric_id(value: &str, what: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{what} must be numeric, got '{value}'"));
    }
    Ok(trimmed.to_string())
}

fn validate_app_id(value: &str) -> Result<String, String> {
    validate_numeric_id(value, "Application ID")
}

fn validate_build_id(value: &str) -> Result<String, String> {
    validate_numeric_id(value, "Build ID")
}

fn validate_app_name(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("Application name cannot be empty".to_string());
    }
    Ok(value.to_string())
}
