//! Integration tests driving the built `tamper-scope` binary.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

const REJECTED_EXIT: i32 = 3;

fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tamper-scope-bin-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("scratch file");
    path
}

fn run(args: &[&str], timeout_env: Option<&str>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tamper-scope"));
    command
        .args(args)
        .env_remove("TAMPER_SCOPE_ENDPOINT")
        .env_remove("TAMPER_SCOPE_LOG");
    match timeout_env {
        Some(value) => command.env("TAMPER_SCOPE_TIMEOUT_SECS", value),
        None => command.env_remove("TAMPER_SCOPE_TIMEOUT_SECS"),
    };
    command.output().expect("binary should run")
}

#[test]
fn cli_binary_tests_padded_timeout_env_is_accepted() {
    let path = scratch_file("padded.png", &[0x89, b'P', b'N', b'G']);
    let output = run(&["check", path.to_str().expect("utf-8 path")], Some(" 15 "));

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("padded.png: ok (image/png, 4 bytes)"));
}

#[test]
fn cli_binary_tests_rejections_go_to_stderr_for_every_subcommand() {
    let path = scratch_file("notes.txt", b"hello");
    let path = path.to_str().expect("utf-8 path");
    let expected = "Error: notes.txt: Invalid file type. Please upload a JPG, PNG, or WebP image.";

    for subcommand in ["check", "analyze"] {
        let output = run(&[subcommand, path], None);
        assert_eq!(output.status.code(), Some(REJECTED_EXIT), "{subcommand}");
        assert!(output.stdout.is_empty(), "{subcommand} wrote to stdout");
        assert!(
            String::from_utf8_lossy(&output.stderr).contains(expected),
            "{subcommand} stderr"
        );
    }
}
