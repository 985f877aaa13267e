//! Verareport - Veracode Detailed Report Fetcher
//!
//! Command-line front end over `veracode-xml`: credential loading, client
//! configuration and the subcommand handlers.
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;

pub use error::{CliError, Result};
