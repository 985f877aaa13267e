//! Veracode API credential loading.
//!
//! Sources, first match wins:
//! 1. `VERACODE_API_KEY_ID` / `VERACODE_API_KEY_SECRET`
//! 2. `VERACODE_API_ID` / `VERACODE_API_KEY`
//! 3. The Veracode credentials file (`~/.veracode/credentials`, or
//!    `VERACODE_CREDENTIALS_FILE`), profile `VERACODE_API_PROFILE` or `default`
use log::{debug, info};
use std::path::{Path, PathBuf};
use veracode_xml::VeracodeCredentials;

const ENV_PAIRS: [(&str, &str); 2] = [
    ("VERACODE_API_KEY_ID", "VERACODE_API_KEY_SECRET"),
    ("VERACODE_API_ID", "VERACODE_API_KEY"),
];

const FILE_KEY_ID: &str = "veracode_api_key_id";
const FILE_KEY_SECRET: &str = "veracode_api_key_secret";
const DEFAULT_PROFILE: &str = "default";

/// Custom error types for credential operations
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("Environment variable validation failed: {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Missing required credentials: {missing}")]
    MissingCredentials { missing: String },

    #[error("Credentials file {path}: {message}")]
    FileError { path: String, message: String },
}

/// Where the credentials came from, for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Environment { id_var: &'static str },
    File { path: PathBuf, profile: String },
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Environment { id_var } => write!(f, "environment ({id_var})"),
            CredentialSource::File { path, profile } => {
                write!(f, "{} [{profile}]", path.display())
            }
        }
    }
}

/// Validate an API credential: non-empty, alphanumeric plus `-` and `_`.
pub fn validate_api_credential(value: &str, field_name: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field_name} cannot be empty"));
    }

    // Key ids may carry a `vera01ei-` style prefix
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(format!(
            "{field_name} must contain only alphanumeric characters"
        ));
    }

    Ok(())
}

/// Load credentials from the process environment and the default file location.
pub fn load_credentials() -> Result<(VeracodeCredentials, CredentialSource), CredentialError> {
    load_credentials_with(|name: &str| std::env::var(name).ok(), dirs::home_dir())
}

/// Load credentials through an environment lookup and an optional home directory.
pub fn load_credentials_with<F>(
    env: F,
    home: Option<PathBuf>,
) -> Result<(VeracodeCredentials, CredentialSource), CredentialError>
where
    F: Fn(&str) -> Option<String>,
{
    for (id_var, key_var) in ENV_PAIRS {
        let (Some(api_id), Some(api_key)) = (env(id_var), env(key_var)) else {
            continue;
        };
        debug!("Loading credentials from {id_var}/{key_var}");
        let api_id = checked(api_id.trim(), id_var)?;
        let api_key = checked(api_key.trim(), key_var)?;
        info!("🔑 Using credentials from environment variables");
        return Ok((
            VeracodeCredentials::new(api_id, api_key),
            CredentialSource::Environment { id_var },
        ));
    }

    let path = match env("VERACODE_CREDENTIALS_FILE") {
        Some(path) => expand_home(&path, home.as_deref()),
        None => match home {
            Some(home) => home.join(".veracode").join("credentials"),
            None => {
                return Err(CredentialError::MissingCredentials {
                    missing: missing_message(),
                });
            }
        },
    };

    if !path.is_file() {
        debug!("No credentials file at {}", path.display());
        return Err(CredentialError::MissingCredentials {
            missing: missing_message(),
        });
    }

    let profile = env("VERACODE_API_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let contents = std::fs::read_to_string(&path).map_err(|e| CredentialError::FileError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let (api_id, api_key) = parse_credentials_file(&contents, &profile).map_err(|message| {
        CredentialError::FileError {
            path: path.display().to_string(),
            message,
        }
    })?;
    let api_id = checked(&api_id, FILE_KEY_ID)?;
    let api_key = checked(&api_key, FILE_KEY_SECRET)?;

    info!("🔑 Using credentials from {} [{profile}]", path.display());
    Ok((
        VeracodeCredentials::new(api_id, api_key),
        CredentialSource::File { path, profile },
    ))
}

/// Extract the key id and secret of `profile` from an INI-style credentials file.
pub fn parse_credentials_file(contents: &str, profile: &str) -> Result<(String, String), String> {
    let mut in_profile = false;
    let mut seen_profile = false;
    let mut api_id = None;
    let mut api_key = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            seen_profile |= in_profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                FILE_KEY_ID => api_id = Some(value.trim().to_string()),
                FILE_KEY_SECRET => api_key = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    if !seen_profile {
        return Err(format!("profile [{profile}] not found"));
    }
    match (api_id, api_key) {
        (Some(id), Some(key)) => Ok((id, key)),
        (None, _) => Err(format!("profile [{profile}] has no {FILE_KEY_ID}")),
        (_, None) => Err(format!("profile [{profile}] has no {FILE_KEY_SECRET}")),
    }
}

fn checked(value: &str, field: &str) -> Result<String, CredentialError> {
    validate_api_credential(value, field).map_err(|message| CredentialError::ValidationError {
        field: field.to_string(),
        message,
    })?;
    Ok(value.to_string())
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn missing_message() -> String {
    "set VERACODE_API_KEY_ID and VERACODE_API_KEY_SECRET, or create ~/.veracode/credentials"
        .to_string()
}
