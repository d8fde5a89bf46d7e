//! Helpers for validating the analysis service contract fixtures.

use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use serde_json::Value;

/// Directory holding the frozen schemas and fixtures.
pub fn contracts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../contracts")
}

/// Reads and parses one JSON file below [`contracts_dir`].
pub fn load_json(relative: &str) -> Result<Value, String> {
    let path = contracts_dir().join(relative);
    let raw = std::fs::read_to_string(&path)
        .map_err(|error| format!("unable to read {}: {error}", path.display()))?;
    serde_json::from_str(&raw).map_err(|error| format!("invalid json in {relative}: {error}"))
}

/// Compiles the schema at `relative` below [`contracts_dir`].
pub fn compile_validator(relative: &str) -> Result<JSONSchema, String> {
    let schema = load_json(relative)?;
    JSONSchema::compile(&schema).map_err(|error| format!("schema {relative} rejected: {error}"))
}
