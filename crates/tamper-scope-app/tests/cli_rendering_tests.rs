//! Integration tests for file intake and terminal rendering.

mod common;

use std::fs;
use std::path::PathBuf;

use common::{FAILURE_BODY, SUCCESS_BODY, png, scripted_client};
use tamper_scope_app::{Session, candidate_from_path, decode_data_uri, render_view};
use tamper_scope_core::{MAX_IMAGE_BYTES, validate_candidate};

fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tamper-scope-tests-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("scratch file");
    path
}

#[test]
fn cli_rendering_tests_declares_media_type_from_extension() {
    let path = scratch_file("holiday.JPG", &[0xFF, 0xD8, 0xFF]);
    let candidate = candidate_from_path(&path).expect("readable");
    assert_eq!(candidate.file_name, "holiday.JPG");
    assert_eq!(candidate.media_type, "image/jpeg");
    assert!(validate_candidate(&candidate).is_ok());

    let path = scratch_file("notes.txt", b"hello");
    let candidate = candidate_from_path(&path).expect("readable");
    assert!(validate_candidate(&candidate).is_err());
}

#[test]
fn cli_rendering_tests_oversize_file_is_read_only_past_the_limit() {
    let limit = usize::try_from(MAX_IMAGE_BYTES).expect("limit fits usize");
    let path = scratch_file("huge.png", &vec![0_u8; limit + 4096]);

    let candidate = candidate_from_path(&path).expect("readable");

    assert_eq!(candidate.size(), MAX_IMAGE_BYTES + 1);
    assert_eq!(
        validate_candidate(&candidate)
            .expect_err("oversize")
            .to_string(),
        "File is too large. Maximum size is 10MB."
    );
}

#[test]
fn cli_rendering_tests_missing_file_is_a_read_error() {
    let missing = std::env::temp_dir().join("tamper-scope-tests-missing/none.png");
    let error = candidate_from_path(&missing).expect_err("missing file");
    assert!(error.to_string().starts_with("failed to read"));
}

#[test]
fn cli_rendering_tests_report_text_lists_every_section() {
    let (client, transport) = scripted_client();
    transport.push_reply(200, SUCCESS_BODY);
    let mut session = Session::default();
    session.select_file(png("scan.png")).expect("accepted");
    session.analyze(&client);

    let text = render_view(&session.view());

    assert!(text.starts_with("[OK] Likely Authentic\n"));
    assert!(text.contains("Tampering Score: 12/100"));
    assert!(text.contains("  - ELA: Minor compression variations"));
    assert!(text.contains("  Make: Google"));
    assert!(text.contains("  Format: Unknown"));
    assert!(text.contains("  Dimensions: 1500x1125"));
}

#[test]
fn cli_rendering_tests_failure_text_shows_message_only() {
    let (client, transport) = scripted_client();
    transport.push_reply(200, FAILURE_BODY);
    let mut session = Session::default();
    session.select_file(png("scan.png")).expect("accepted");
    session.analyze(&client);

    assert_eq!(render_view(&session.view()), "Error: corrupt file\n");
}

#[test]
fn cli_rendering_tests_ela_image_decodes_to_png() {
    let (client, transport) = scripted_client();
    transport.push_reply(200, SUCCESS_BODY);
    let mut session = Session::default();
    session.select_file(png("scan.png")).expect("accepted");
    session.analyze(&client);

    let report = session.state().report().expect("report");
    let (mime, bytes) = decode_data_uri(&report.ela_image).expect("data uri");
    assert_eq!(mime, "image/png");
    assert_eq!(&bytes[..4], b"\x89PNG");
}

#[test]
fn cli_rendering_tests_rejection_line_names_the_file() {
    let error = tamper_scope_core::ValidationError::TooLarge {
        size: MAX_IMAGE_BYTES + 1,
        limit: MAX_IMAGE_BYTES,
    };
    assert_eq!(
        tamper_scope_app::render_rejection("huge.png", &error),
        "Error: huge.png: File is too large. Maximum size is 10MB."
    );
}
