// SPDX-License-Identifier: PMPL-1.0-or-later

//! Text rendering of run results

use crate::provenance::TraceStyle;
use crate::report::RunReport;
use colored::Colorize;

pub struct TraceFormatter {
    style: TraceStyle,
}

impl TraceFormatter {
    pub fn new(style: TraceStyle) -> Self {
        Self { style }
    }

    pub fn plain() -> Self {
        Self::new(TraceStyle::Plain)
    }

    /// Traces of every listed fact, blank-line separated, then a summary
    pub fn render_report(&self, report: &RunReport) -> String {
        let mut out: String = report
            .facts
            .iter()
            .map(|fact| format!("{}\n\n", fact.display(self.style)))
            .collect();
        out.push_str(&self.summary(report));
        out.push('\n');
        out
    }

    pub fn summary(&self, report: &RunReport) -> String {
        let status = if report.reached_fixpoint {
            "fixpoint reached"
        } else {
            "stopped at round limit"
        };
        let line = format!(
            "{} after {} rounds: {} facts ({} derived)",
            status, report.stats.rounds, report.total_facts, report.stats.inserted
        );
        match (self.style, report.reached_fixpoint) {
            (TraceStyle::Plain, _) => line,
            (TraceStyle::Colored, true) => line.green().to_string(),
            (TraceStyle::Colored, false) => line.yellow().bold().to_string(),
        }
    }

    pub fn print(&self, report: &RunReport) {
        print!("{}", self.render_report(report));
    }
}

impl Default for TraceFormatter {
    fn default() -> Self {
        Self::new(TraceStyle::Colored)
    }
}
