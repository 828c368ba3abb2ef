//! `apireg version`: binary, schema and document format versions.

use super::print_json;
use crate::config::resolve_db_path;
use crate::error::Result;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use serde::Serialize;
use std::path::PathBuf;

/// OpenAPI document versions `sync` understands.
const DOCUMENT_FORMATS: [&str; 2] = ["openapi 3.x", "swagger 2.0"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    version: &'static str,
    schema_version: i32,
    document_formats: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<PathBuf>,
}

impl VersionInfo {
    fn collect(db_path: Option<&PathBuf>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            schema_version: CURRENT_SCHEMA_VERSION,
            document_formats: DOCUMENT_FORMATS,
            database: resolve_db_path(db_path.map(PathBuf::as_path)),
        }
    }
}

/// Print version information.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let info = VersionInfo::collect(db_path);
    if json {
        return print_json(&info);
    }

    println!("apireg {} (schema v{})", info.version, info.schema_version);
    println!("  Documents: {}", info.document_formats.join(", "));
    if let Some(database) = &info.database {
        println!("  Database:  {}", database.display());
    }
    Ok(())
}
