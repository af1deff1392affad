//! Server configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the CLI
//! through `dotenvy` first); command-line flags override them.

use std::env;

use crate::transform::pipeline::MergeOptions;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum request body for one upload (both files together).
///
/// 10 MB limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Name of the merged file offered for download.
pub const OUTPUT_FILE_NAME: &str = "final_processed_file.csv";

/// HTTP service settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Options applied to every merge the server runs
    pub merge: MergeOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            merge: MergeOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `SURVEY_MERGE_PORT`
    /// - `SURVEY_MERGE_MAX_UPLOAD_BYTES`
    /// - `SURVEY_MERGE_SKIP_ROWS`
    /// - `SURVEY_MERGE_UNIQUE_NAMES` (`true`/`1`/`yes`)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();

        let port = parse_var(&lookup, "SURVEY_MERGE_PORT")?.unwrap_or(defaults.port);
        let max_upload_bytes = parse_var(&lookup, "SURVEY_MERGE_MAX_UPLOAD_BYTES")?
            .unwrap_or(defaults.max_upload_bytes);
        let skip_rows =
            parse_var(&lookup, "SURVEY_MERGE_SKIP_ROWS")?.unwrap_or(defaults.merge.skip_rows);
        let unique_names = lookup("SURVEY_MERGE_UNIQUE_NAMES")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.merge.unique_names);

        Ok(Self {
            port,
            max_upload_bytes,
            merge: MergeOptions {
                skip_rows,
                unique_names,
                ..defaults.merge
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, String> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid value for {}: '{}'", key, raw)),
    }
}
