#![warn(missing_docs)]
//! # site-guard-app binary
//!
//! Command-line entry point for operators: scan text, validate submissions and
//! uploads, resolve media references, and preview delivery tiers.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use serde::Serialize;
use serde_json::json;
use site_guard_app::{AppError, SiteGuard, app_version, init_tracing};
use site_guard_core::PerformanceTier;
use site_guard_delivery::{EnvironmentSignals, tuning_for};
use site_guard_upload::FileUpload;

const USAGE: &str = "usage: site-guard-app <command> [args]

commands:
  version                         print the build version
  scan <text>                     report threat categories in <text>
  validate <form> <json-file>     validate a JSON submission against a form schema
  check-file <path> [mime-type]   run the upload pipeline on a local file
  resolve <reference>...          resolve image references to loadable URLs
  tier <signals-json-file>        classify environment signals and print tuning
  tuning <low|medium|high> [webkit]
                                  print the tuning row for a tier";

/// CLI entry point.
fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    if command == "version" || command == "--version" {
        println!("site-guard-app {}", app_version());
        return ExitCode::SUCCESS;
    }

    match run(command, rest) {
        Ok(Some(output)) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(error) => {
            eprintln!("site-guard-app: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &str, args: &[String]) -> Result<Option<String>, AppError> {
    let guard = SiteGuard::from_env()?;

    let output = match (command, args) {
        ("scan", [text]) => render(&guard.scan(text))?,
        ("validate", [form, path]) => {
            let body = std::fs::read(path)?;
            render(&guard.validate_submission_json(form, &body)?)?
        }
        ("check-file", [path]) => check_file(&guard, Path::new(path), None)?,
        ("check-file", [path, mime]) => check_file(&guard, Path::new(path), Some(mime))?,
        ("resolve", references) if !references.is_empty() => {
            let resolved: BTreeMap<&str, _> = references
                .iter()
                .map(|reference| (reference.as_str(), guard.resolve_media(reference)))
                .collect();
            render(&resolved)?
        }
        ("tier", [path]) => {
            let signals: EnvironmentSignals = serde_json::from_slice(&std::fs::read(path)?)?;
            let controller = guard.delivery_controller(&signals);
            render(&json!({
                "tier": controller.tier(),
                "low_power_engine": controller.context().is_low_power_engine(),
                "tuning": controller.tuning(),
            }))?
        }
        ("tuning", [tier]) => render(&tuning_for(tier.parse::<PerformanceTier>()?, false))?,
        ("tuning", [tier, engine]) if engine == "webkit" => {
            render(&tuning_for(tier.parse::<PerformanceTier>()?, true))?
        }
        _ => return Ok(None),
    };

    Ok(Some(output))
}

fn check_file(guard: &SiteGuard, path: &Path, mime: Option<&String>) -> Result<String, AppError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = match mime {
        Some(mime) => mime.clone(),
        None => mime_for_extension(&name).to_string(),
    };
    let result = guard.validate_upload(Some(&FileUpload::new(name, mime_type, bytes)));
    render(&result)
}

fn mime_for_extension(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}
