#![warn(missing_docs)]
//! # tamper-scope binary
//!
//! Terminal entry point for tamper-scope.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tamper_scope_app::{
    AppConfig, AppError, Cli, Command, LOG_ENV, Session, SessionError, candidate_from_path,
    decode_data_uri, render_rejection, render_view,
};
use tamper_scope_core::validate_candidate;
use tamper_scope_ui::SessionState;
use tracing_subscriber::EnvFilter;

/// Exit code for a completed analysis that ended in a failure message.
const EXIT_ANALYSIS_FAILED: u8 = 1;

/// Exit code for files rejected before submission.
const EXIT_REJECTED: u8 = 3;

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("tamper-scope: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode, AppError> {
    match &cli.command {
        Command::Check { file } => check(file),
        Command::Analyze {
            file,
            json,
            ela_out,
        } => analyze(&cli.config()?, file, *json, ela_out.as_deref()),
        Command::Health => health(&cli.config()?),
    }
}

fn check(file: &Path) -> Result<ExitCode, AppError> {
    let candidate = candidate_from_path(file)?;
    match validate_candidate(&candidate) {
        Ok(media_type) => {
            println!(
                "{}: ok ({media_type}, {} bytes)",
                candidate.file_name,
                candidate.size()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{}", render_rejection(&candidate.file_name, &error));
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

fn analyze(
    config: &AppConfig,
    file: &Path,
    json: bool,
    ela_out: Option<&Path>,
) -> Result<ExitCode, AppError> {
    let client = config.build_client()?;
    let mut session = Session::default();

    let candidate = candidate_from_path(file)?;
    let file_name = candidate.file_name.clone();
    match session.select_file(candidate) {
        Ok(()) => {}
        Err(SessionError::Validation(error)) => {
            eprintln!("{}", render_rejection(&file_name, &error));
            return Ok(ExitCode::from(EXIT_REJECTED));
        }
        Err(error) => return Err(error.into()),
    }

    tracing::info!(endpoint = %client.endpoint(), file = %file.display(), "analysis started");
    session.analyze(&client);

    let SessionState::ReportReady(report) = session.state() else {
        print!("{}", render_view(&session.view()));
        return Ok(ExitCode::from(EXIT_ANALYSIS_FAILED));
    };

    if let Some(path) = ela_out {
        let (_, bytes) = decode_data_uri(&report.ela_image)?;
        std::fs::write(path, bytes).map_err(|source| AppError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_view(&session.view()));
    }
    Ok(ExitCode::SUCCESS)
}

fn health(config: &AppConfig) -> Result<ExitCode, AppError> {
    let client = config.build_client()?;
    let report = client.health().map_err(AppError::Transport)?;

    println!("status: {}", report.status);
    if let Some(version) = &report.version {
        println!("version: {version}");
    }
    for improvement in &report.improvements {
        println!("  - {improvement}");
    }

    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
