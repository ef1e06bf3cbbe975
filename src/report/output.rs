// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization of run reports

use crate::report::RunReport;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "txt" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    /// Format implied by a file extension, if it names one
    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
    }

    /// An explicit choice wins, then the output file's extension, then text
    pub fn resolve(explicit: Option<Self>, output: Option<&Path>) -> Self {
        explicit
            .or_else(|| output.and_then(Self::for_path))
            .unwrap_or_default()
    }

    /// Machine-readable form; text goes through [`crate::report::TraceFormatter`]
    pub fn serialize(&self, report: &RunReport) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
            OutputFormat::Text => bail!("text reports are rendered, not serialized"),
        }
    }
}
