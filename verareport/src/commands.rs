//! Subcommand handlers
use log::{info, warn};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use veracode_xml::{
    AppSelector, Application, ApplicationApi, ApplicationError, ApplicationInfo, Build, BuildApi,
    ReportFormat, ReportRequest, ReportWorkflow, ScanType, VeracodeClient, WorkflowError,
    write_output,
};

use crate::cli::{AppTarget, MatchArgs};
use crate::{CliError, Result};

/// Options of the `report` subcommand
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub format: ReportFormat,
    pub scan_type: ScanType,
    pub output_dir: PathBuf,
    pub prefix: String,
}

/// Download the detailed report and print its path.
pub async fn run_report(
    client: &VeracodeClient,
    target: &AppTarget,
    matching: &MatchArgs,
    options: ReportOptions,
) -> Result<PathBuf> {
    let mut request = ReportRequest::new(selector(target)?, options.format)
        .with_match_mode(matching.match_mode())
        .with_scan_type(options.scan_type)
        .with_output_dir(options.output_dir)
        .with_prefix(options.prefix);

    let workflow = ReportWorkflow::new(client);
    let first_attempt = workflow.run(&request).await;
    let outcome = match first_attempt {
        Err(WorkflowError::Application(ApplicationError::Ambiguous { candidates, .. }))
            if matching.interactive =>
        {
            let chosen = choose_interactively(&candidates)?;
            request = request.with_selector(AppSelector::Id(chosen.app_id.clone()));
            workflow.run(&request).await?
        }
        result => result?,
    };

    println!("{}", outcome.path.display());
    Ok(outcome.path)
}

/// List all applications.
pub async fn run_apps(client: &VeracodeClient, json: bool) -> Result<()> {
    let apps = ApplicationApi::new(client).list_applications().await?;
    info!("📋 Found {} applications", apps.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&apps)?);
    } else {
        for app in &apps {
            println!("{}", format_application(app));
        }
    }
    Ok(())
}

/// Show an application profile, optionally saving the raw XML.
pub async fn run_app_info(
    client: &VeracodeClient,
    target: &AppTarget,
    matching: &MatchArgs,
    show_xml: bool,
    output: Option<(&Path, &str)>,
    json: bool,
) -> Result<()> {
    let app_id = resolve_app_id(client, target, matching).await?;
    let app_info = ApplicationApi::new(client).get_app_info(&app_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&app_info)?);
    } else if show_xml {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&app_info.raw_xml)?;
        writeln!(stdout)?;
    } else {
        print!("{}", format_app_info(&app_info));
    }

    if let Some((dir, prefix)) = output {
        let filename = format!("{prefix}app_info_{app_id}.xml");
        let path = write_output(dir, &filename, &app_info.raw_xml).await?;
        info!("✅ Application profile saved to: {}", path.display());
        println!("{}", path.display());
    }
    Ok(())
}

/// List builds of an application.
pub async fn run_builds(
    client: &VeracodeClient,
    target: &AppTarget,
    matching: &MatchArgs,
    json: bool,
) -> Result<()> {
    let app_id = resolve_app_id(client, target, matching).await?;
    let builds = BuildApi::new(client).get_build_list(&app_id).await?;
    info!("📋 Found {} builds for app_id={app_id}", builds.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&builds)?);
    } else {
        for build in &builds {
            println!("{}", format_build(build));
        }
    }
    Ok(())
}

/// Show one build: the given id, or the latest of `scan_type`.
pub async fn run_build_info(
    client: &VeracodeClient,
    target: &AppTarget,
    matching: &MatchArgs,
    build_id: Option<String>,
    scan_type: ScanType,
    json: bool,
) -> Result<()> {
    let app_id = resolve_app_id(client, target, matching).await?;
    let builds = BuildApi::new(client);

    // Static "latest" is what getbuildinfo returns without a build_id
    let build_id = match (build_id, scan_type) {
        (Some(id), _) => Some(id),
        (None, ScanType::Dynamic) => Some(builds.resolve_build_id(&app_id, scan_type).await?),
        (None, ScanType::Static) => None,
    };
    let build = builds.get_build_info(&app_id, build_id.as_deref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&build)?);
    } else {
        print!("{}", format_build_info(&build));
    }
    Ok(())
}

fn selector(target: &AppTarget) -> Result<AppSelector> {
    target
        .selector()
        .ok_or_else(|| CliError::InvalidConfig("--app-id, --app-name or --app is required".to_string()))
}

/// Resolve the target to an app id, prompting on ambiguity when interactive.
async fn resolve_app_id(
    client: &VeracodeClient,
    target: &AppTarget,
    matching: &MatchArgs,
) -> Result<String> {
    let selector = selector(target)?;
    match ApplicationApi::new(client)
        .resolve_app_id(&selector, matching.match_mode())
        .await
    {
        Err(ApplicationError::Ambiguous { candidates, .. }) if matching.interactive => {
            Ok(choose_interactively(&candidates)?.app_id.clone())
        }
        result => Ok(result?),
    }
}

fn choose_interactively(candidates: &[Application]) -> Result<&Application> {
    let stdin = std::io::stdin();
    let stderr = std::io::stderr();
    prompt_choice(candidates, &mut stdin.lock(), &mut stderr.lock())
}

/// Ask for a numbered choice among `candidates`, re-asking on invalid input.
///
/// The prompt goes to `output` so stdout stays clean for data.
pub fn prompt_choice<'c, R, W>(
    candidates: &'c [Application],
    input: &mut R,
    output: &mut W,
) -> Result<&'c Application>
where
    R: BufRead,
    W: Write,
{
    if candidates.is_empty() {
        return Err(CliError::Selection("no candidates to choose from".to_string()));
    }

    writeln!(output, "Multiple applications match:")?;
    for (index, app) in candidates.iter().enumerate() {
        writeln!(output, "  {}) {app}", index.saturating_add(1))?;
    }

    let mut line = String::new();
    loop {
        write!(output, "Select an application [1-{}]: ", candidates.len())?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(CliError::Selection("no selection made".to_string()));
        }

        let choice = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| candidates.get(index));
        match choice {
            Some(app) => return Ok(app),
            None => {
                warn!("⚠️  Invalid selection '{}'", line.trim());
                writeln!(output, "Please enter a number between 1 and {}", candidates.len())?;
            }
        }
    }
}

/// `• name (ID: id, Policy: p)`
#[must_use]
pub fn format_application(app: &Application) -> String {
    format!(
        "• {} (ID: {}, Policy: {})",
        app.app_name,
        app.app_id,
        app.policy_name.as_deref().unwrap_or("-")
    )
}

#[must_use]
pub fn format_app_info(info: &ApplicationInfo) -> String {
    let mut out = String::new();
    for (key, value) in info.summary() {
        out.push_str(&format!("{key:<22} {value}\n"));
    }
    if !info.custom_fields.is_empty() {
        out.push_str("custom fields:\n");
        for field in &info.custom_fields {
            out.push_str(&format!("  {}: {}\n", field.name, field.value));
        }
    }
    out
}

/// `• Build ID: x, Version: v, Scan Type: Static`
#[must_use]
pub fn format_build(build: &Build) -> String {
    format!(
        "• Build ID: {}, Version: {}, Scan Type: {}",
        build.build_id,
        build.version.as_deref().unwrap_or("-"),
        build.scan_label()
    )
}

#[must_use]
pub fn format_build_info(build: &Build) -> String {
    let mut out = format!("{}\n", format_build(build));
    for (key, value) in &build.attributes {
        out.push_str(&format!("  {key}: {value}\n"));
    }
    out
}
