//! `strata detect` command handler

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use strata_core::clock::SystemClock;
use strata_core::config::StrataConfig;
use strata_core::types::{DetectedVulnerability, Package};
use strata_ospkg::{AdvisoryDb, DetectionReport, DetectorConfig, DetectorRegistry};

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `detect` command.
///
/// Returns `CliError::VulnerabilitiesFound` (exit code 4) after rendering
/// the report when at least one package is vulnerable.
pub async fn execute(
    args: DetectArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = StrataConfig::load(config_path).await?;
    let packages = read_packages(&args.packages).await?;

    let output = run(&config, &args.family, &args.os_version, packages).await?;
    writer.render(&output)?;

    if output.report.has_findings() {
        return Err(CliError::VulnerabilitiesFound(output.report.finding_count()));
    }

    Ok(())
}

/// Load the advisory database and run detection over `packages`.
pub async fn run(
    config: &StrataConfig,
    family: &str,
    os_version: &str,
    packages: Vec<Package>,
) -> Result<DetectOutput, CliError> {
    let detector_config = DetectorConfig::from_core(&config.detector);
    detector_config.validate()?;

    let db_path = PathBuf::from(&detector_config.advisory_db_path);
    let db = tokio::task::spawn_blocking(move || AdvisoryDb::load_from_dir(&db_path))
        .await
        .map_err(|e| CliError::Command(format!("spawn_blocking failed: {e}")))??;

    let registry = DetectorRegistry::with_defaults(
        Arc::new(db),
        Arc::new(SystemClock),
        detector_config.effective_workers(),
    );

    // End-of-life versions are still scanned.
    let supported = registry.is_supported_version(family, os_version);
    if !supported {
        warn!(
            family,
            os_version, "OS version is no longer supported, results may be incomplete"
        );
    }

    info!(
        family,
        os_version,
        packages = packages.len(),
        workers = registry.workers(),
        "running detection"
    );
    let report = registry
        .detect_concurrent(family, os_version, packages)
        .await?;

    Ok(DetectOutput { supported, report })
}

async fn read_packages(path: &Path) -> Result<Vec<Package>, CliError> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| {
        CliError::Command(format!(
            "invalid package list {}: {}",
            path.display(),
            e
        ))
    })
}

/// Detection command output.
#[derive(Debug, Serialize)]
pub struct DetectOutput {
    /// Whether the OS version is still within its support window
    pub supported: bool,
    #[serde(flatten)]
    pub report: DetectionReport,
}

impl Render for DetectOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.report;
        writeln!(
            w,
            "Detection: {} {} ({} packages)",
            report.family.to_string().bold(),
            report.os_version,
            report.total_packages
        )?;
        writeln!(w, "  Scan ID: {}", report.scan_id)?;
        if !self.supported {
            writeln!(w, "  {}", "OS version is end-of-life".yellow())?;
        }

        if report.findings.is_empty() {
            writeln!(w, "  {}", "No vulnerabilities found".green())?;
        } else {
            writeln!(
                w,
                "  {}",
                format!("{} vulnerabilities found", report.findings.len())
                    .red()
                    .bold()
            )?;
            writeln!(w)?;
            render_findings(&report.findings, w)?;
        }

        if !report.skipped_packages.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "  Skipped (cannot be classified): {}",
                report.skipped_packages.join(", ").dimmed()
            )?;
        }

        Ok(())
    }
}

fn render_findings(findings: &[DetectedVulnerability], w: &mut dyn Write) -> std::io::Result<()> {
    let id_width = findings
        .iter()
        .map(|f| f.vulnerability_id.len())
        .max()
        .unwrap_or(2)
        .max(2);
    let pkg_width = findings
        .iter()
        .map(|f| f.pkg_name.len())
        .max()
        .unwrap_or(7)
        .max(7);

    writeln!(
        w,
        "  {:<id_width$}  {:<pkg_width$}  {:<24}  FIXED",
        "ID", "PACKAGE", "INSTALLED"
    )?;
    for f in findings {
        writeln!(
            w,
            "  {:<id_width$}  {:<pkg_width$}  {:<24}  {}",
            f.vulnerability_id, f.pkg_name, f.installed_version, f.fixed_version
        )?;
    }
    Ok(())
}
