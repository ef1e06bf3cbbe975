// SPDX-License-Identifier: PMPL-1.0-or-later

//! Run reports

pub mod formatter;
pub mod output;

use crate::context::Context;
use crate::eval::RunStats;
use crate::provenance::{self, ProvenanceNode};
use crate::types::{Fact, Query, Relation};
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub use formatter::TraceFormatter;
pub use output::OutputFormat;

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    pub reached_fixpoint: bool,
    pub total_facts: usize,
    pub stats: RunStats,
    pub facts: Vec<ProvenanceNode>,
}

impl RunReport {
    /// Snapshot the context; `relation` restricts the listed facts
    pub fn build(
        context: &Context,
        stats: RunStats,
        reached_fixpoint: bool,
        relation: Option<&Relation>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            program: None,
            reached_fixpoint,
            total_facts: context.len(),
            stats,
            facts: selected(context, relation).map(provenance::expand).collect(),
        }
    }

    pub fn with_program(mut self, program: &Path) -> Self {
        self.program = Some(program.display().to_string());
        self
    }
}

/// Facts of one relation, or every fact
pub fn selected<'a>(
    context: &'a Context,
    relation: Option<&Relation>,
) -> Box<dyn Iterator<Item = &'a Fact> + 'a> {
    match relation {
        Some(relation) => Box::new(context.get(&Query::all(relation))),
        None => Box::new(context.all()),
    }
}

/// Serialize the report and write it to `path`
pub fn save_report<P: AsRef<Path>>(report: &RunReport, format: OutputFormat, path: P) -> Result<()> {
    let path = path.as_ref();
    let content = match format {
        OutputFormat::Text => TraceFormatter::plain().render_report(report),
        _ => format.serialize(report)?,
    };
    fs::write(path, content).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}
