//! Integration tests for flag and environment configuration as the binary parses it.

use std::time::Duration;

use clap::Parser;
use tamper_scope_app::{AppError, Cli, Command, ENDPOINT_ENV, TIMEOUT_ENV};
use tamper_scope_upload::DEFAULT_ANALYZE_ENDPOINT;

#[test]
fn config_env_tests_flags_then_env_then_defaults() {
    // Safety:
    // - This is the only test in this binary touching these variables.
    // - Both variables are removed before returning.
    unsafe {
        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(TIMEOUT_ENV);
    }
    let cli = Cli::try_parse_from(["tamper-scope", "health"]).expect("defaults parse");
    let config = cli.config().expect("defaults");
    assert_eq!(config.endpoint, DEFAULT_ANALYZE_ENDPOINT);
    assert!(matches!(cli.command, Command::Health));

    // Safety: see rationale above.
    unsafe {
        std::env::set_var(ENDPOINT_ENV, "https://forensics.example.test/api/analyze");
        std::env::set_var(TIMEOUT_ENV, " 15 ");
    }
    let cli = Cli::try_parse_from(["tamper-scope", "health"]).expect("env parse");
    let config = cli.config().expect("env overrides");
    assert_eq!(config.endpoint, "https://forensics.example.test/api/analyze");
    assert_eq!(config.timeout, Duration::from_secs(15));
    assert!(config.build_client().is_ok());

    let cli = Cli::try_parse_from([
        "tamper-scope",
        "health",
        "--endpoint",
        "http://127.0.0.1:9000/api/analyze",
        "--timeout-secs",
        "3",
    ])
    .expect("flag parse");
    let config = cli.config().expect("flags win over env");
    assert_eq!(config.endpoint, "http://127.0.0.1:9000/api/analyze");
    assert_eq!(config.timeout, Duration::from_secs(3));

    // Safety: see rationale above.
    unsafe { std::env::set_var(TIMEOUT_ENV, "soon") };
    assert!(Cli::try_parse_from(["tamper-scope", "health"]).is_err());

    // Safety: see rationale above.
    unsafe {
        std::env::set_var(TIMEOUT_ENV, "0");
        std::env::set_var(ENDPOINT_ENV, "https://forensics.example.test/api/analyze");
    }
    let cli = Cli::try_parse_from(["tamper-scope", "health"]).expect("zero parses");
    assert!(matches!(cli.config(), Err(AppError::Config(_))));

    // Safety: see rationale above.
    unsafe {
        std::env::set_var(TIMEOUT_ENV, "15");
        std::env::set_var(ENDPOINT_ENV, "localhost:5000");
    }
    let cli = Cli::try_parse_from(["tamper-scope", "health"]).expect("endpoint parses");
    assert!(matches!(cli.config(), Err(AppError::Config(_))));

    // Safety: see rationale above.
    unsafe {
        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(TIMEOUT_ENV);
    }
}
