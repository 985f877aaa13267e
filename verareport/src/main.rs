//! Verareport - Veracode Detailed Report Fetcher
//!
//! Downloads the detailed report of the latest static or dynamic build of an
//! application from the Veracode XML API.
use clap::Parser;
use log::{debug, error, info};
use std::sync::Arc;
use veracode_xml::{HmacSigner, VeracodeClient};
use verareport::cli::{Cli, Commands};
use verareport::commands::{self, ReportOptions};
use verareport::{CliError, Result, config, credentials};

fn main() {
    let args = Cli::parse();

    // Initialize logging; RUST_LOG still wins over the default filter
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("❌ Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        error!("❌ {e}");
        if let CliError::Credential(_) = e {
            error!("💡 Set VERACODE_API_KEY_ID and VERACODE_API_KEY_SECRET, or configure ~/.veracode/credentials");
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(args: Cli) -> Result<()> {
    info!("Verareport - Veracode Detailed Report Fetcher");

    let config = config::build_config(&args)?;
    debug!(
        "Region: {}, XML API base: {}",
        config.region.as_str(),
        config.base_urls.xml
    );

    let (veracode_credentials, source) = credentials::load_credentials()?;
    debug!("Credentials loaded from {source}");

    let signer = Arc::new(HmacSigner::new(veracode_credentials));
    let client = VeracodeClient::new(config, signer)?;

    match args.command {
        Commands::Report {
            target,
            matching,
            format,
            scan_type,
            output_dir,
            prefix,
        } => {
            let output_dir =
                config::resolve_output_dir(output_dir, &|name: &str| std::env::var(name).ok());
            commands::run_report(
                &client,
                &target,
                &matching,
                ReportOptions {
                    format,
                    scan_type,
                    output_dir,
                    prefix,
                },
            )
            .await?;
        }
        Commands::Apps { json } => commands::run_apps(&client, json).await?,
        Commands::AppInfo {
            target,
            matching,
            show_xml,
            output_dir,
            prefix,
            json,
        } => {
            let output = output_dir.as_deref().map(|dir| (dir, prefix.as_str()));
            commands::run_app_info(&client, &target, &matching, show_xml, output, json).await?;
        }
        Commands::Builds {
            target,
            matching,
            json,
        } => commands::run_builds(&client, &target, &matching, json).await?,
        Commands::BuildInfo {
            target,
            matching,
            build_id,
            scan_type,
            json,
        } => {
            commands::run_build_info(&client, &target, &matching, build_id, scan_type, json)
                .await?;
        }
    }

    Ok(())
}
