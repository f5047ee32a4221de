//! Loads [`ObjectSchema`] definitions from JSON files.

use std::fs;
use std::path::Path;

use super::errors::{SchemaError, SchemaResult};
use super::validator::ObjectSchema;

/// Reads and parses a schema file.
///
/// A missing or malformed file is an error; callers decide whether that is
/// fatal.
pub fn load_schema_file(path: &Path) -> SchemaResult<ObjectSchema> {
    let contents = fs::read_to_string(path).map_err(|e| {
        SchemaError::malformed(path.display().to_string(), format!("Failed to read: {}", e))
    })?;
    parse_schema(&contents).map_err(|e| match e {
        SchemaError::Malformed { reason, .. } => {
            SchemaError::malformed(path.display().to_string(), reason)
        }
        other => other,
    })
}

/// Parses a schema from JSON text.
pub fn parse_schema(contents: &str) -> SchemaResult<ObjectSchema> {
    serde_json::from_str(contents)
        .map_err(|e| SchemaError::malformed("<inline>", format!("Invalid JSON: {}", e)))
}
