//! Error types for verareport
use crate::credentials::CredentialError;
use veracode_xml::{
    ApplicationError, BuildError, ErrorCategory, VeracodeError, WorkflowError,
};

/// Custom error type for verareport operations
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// Detailed report workflow error
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// Application lookup error
    #[error("Application lookup failed: {0}")]
    Application(#[from] ApplicationError),

    /// Build lookup error
    #[error("Build lookup failed: {0}")]
    Build(#[from] BuildError),

    /// Veracode API error
    #[error("Veracode API error: {0}")]
    VeracodeApi(#[from] VeracodeError),

    /// Credential error
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Interactive selection aborted
    #[error("Selection aborted: {0}")]
    Selection(String),
}

impl CliError {
    /// Coarse category, shared with the library's workflow errors
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            CliError::Workflow(err) => err.category(),
            CliError::Application(err) => err.category(),
            CliError::Build(err) => err.category(),
            CliError::VeracodeApi(err) => ErrorCategory::of(err),
            CliError::Credential(_) | CliError::InvalidConfig(_) => ErrorCategory::Configuration,
            CliError::Io(_) | CliError::Json(_) | CliError::Selection(_) => ErrorCategory::Io,
        }
    }

    /// Process exit code: 2 for configuration problems, 1 otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            _ => 1,
        }
    }
}

/// Result type alias for verareport operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = CliError::Credential(CredentialError::MissingCredentials {
            missing: "VERACODE_API_KEY_ID".to_string(),
        });
        assert_eq!(missing.exit_code(), 2);

        let bad_region = CliError::VeracodeApi(VeracodeError::InvalidConfig("xx".to_string()));
        assert_eq!(bad_region.exit_code(), 2);

        let not_found = CliError::Application(ApplicationError::NotFound("nope".to_string()));
        assert_eq!(not_found.category(), ErrorCategory::NotFound);
        assert_eq!(not_found.exit_code(), 1);

        let no_build = CliError::Workflow(WorkflowError::Build(BuildError::NoBuild {
            app_id: "42".to_string(),
            scan_type: veracode_xml::ScanType::Dynamic,
        }));
        assert_eq!(no_build.category(), ErrorCategory::NotFound);
        assert_eq!(no_build.exit_code(), 1);

        let transport = CliError::VeracodeApi(VeracodeError::Api("denied".to_string()));
        assert_eq!(transport.exit_code(), 1);
    }

    #[test]
    fn test_workflow_message_is_not_double_prefixed() {
        let err = CliError::Workflow(WorkflowError::Application(ApplicationError::NotFound(
            "ghost".to_string(),
        )));
        assert_eq!(
            err.to_string(),
            "Application lookup failed: Application not found: ghost"
        );
    }
}
