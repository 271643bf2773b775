//! Export encoding: the downloadable JSON artifact.
//!
//! Produces the file name and contents only; triggering the browser
//! download is the host's job.

use crate::model::{Params, Position, ToolInstance};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const EXPORT_VERSION: &str = "2.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub file_prefix: String,
    pub version: String,
    pub mime: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "tool-canvas".to_string(),
            version: EXPORT_VERSION.to_string(),
            mime: "application/json".to_string(),
        }
    }
}

/// Shape of the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `{tools, timestamp, version}` with full tool records.
    #[default]
    Envelope,
    /// Bare array of `{name, params, position}`.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub tools: Vec<ToolInstance>,
    pub timestamp: String,
    pub version: String,
}

#[derive(Serialize)]
struct FlatTool<'a> {
    name: &'a str,
    params: &'a Params,
    position: Position,
}

/// A ready-to-download file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub mime: String,
    pub contents: String,
}

/// Export is only offered for a non-empty canvas.
pub fn can_export(tools: &[ToolInstance]) -> bool {
    !tools.is_empty()
}

/// ISO-8601 with millisecond precision, e.g. `2025-01-02T03:04:05.678Z`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File-name-safe timestamp: `:` and `.` become `-`, milliseconds and
/// the zone suffix are dropped (`2025-01-02T03-04-05`).
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    let iso = iso_timestamp(now).replace([':', '.'], "-");
    let keep = iso.len().saturating_sub("-678Z".len());
    iso[..keep].to_string()
}

pub fn encode_export(
    tools: &[ToolInstance],
    format: ExportFormat,
    now: DateTime<Utc>,
    config: &ExportConfig,
) -> Result<ExportFile, serde_json::Error> {
    let contents = match format {
        ExportFormat::Envelope => serde_json::to_string_pretty(&ExportEnvelope {
            tools: tools.to_vec(),
            timestamp: iso_timestamp(now),
            version: config.version.clone(),
        })?,
        ExportFormat::Flat => {
            let flat: Vec<FlatTool<'_>> = tools
                .iter()
                .map(|t| FlatTool {
                    name: &t.name,
                    params: &t.params,
                    position: t.position,
                })
                .collect();
            serde_json::to_string_pretty(&flat)?
        }
    };

    let filename = format!("{}-{}.json", config.file_prefix, file_timestamp(now));
    log::debug!("export: {} ({} tools, {} bytes)", filename, tools.len(), contents.len());

    Ok(ExportFile {
        filename,
        mime: config.mime.clone(),
        contents,
    })
}
