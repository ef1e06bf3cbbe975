// SPDX-License-Identifier: PMPL-1.0-or-later

//! Derivation traces
//!
//! A derived fact records the rule that produced it and the facts it was
//! joined from, in match order. Expanding that record recursively gives
//! the derivation tree. Facts shared by several derivations are expanded
//! again at every use, so the output unfolds the derivation DAG into a
//! tree.

use crate::types::{Fact, Origin};
use colored::Colorize;
use serde::Serialize;
use std::fmt::{self, Write};

/// Whether traces carry terminal styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceStyle {
    #[default]
    Colored,
    Plain,
}

/// Render a fact and its full derivation, one fact per line, indented two
/// spaces per level. No trailing newline.
pub fn trace_string(fact: &Fact, style: TraceStyle) -> String {
    expand(fact).display(style).to_string()
}

pub fn write_trace<W: Write>(fact: &Fact, style: TraceStyle, out: &mut W) -> fmt::Result {
    write_node(&expand(fact), style, out)
}

/// Render an already expanded tree
pub fn write_node<W: Write>(node: &ProvenanceNode, style: TraceStyle, out: &mut W) -> fmt::Result {
    write_level(node, 0, style, out)
}

fn write_level<W: Write>(
    node: &ProvenanceNode,
    level: usize,
    style: TraceStyle,
    out: &mut W,
) -> fmt::Result {
    let indent = "  ".repeat(level);
    match (style, level) {
        (TraceStyle::Plain, _) => write!(out, "{}{}", indent, node.label)?,
        (TraceStyle::Colored, 0) => write!(out, "{}", node.highlighted.as_str().bold().underline())?,
        (TraceStyle::Colored, _) => write!(out, "{}{}", indent, node.highlighted)?,
    }

    if let Some(note) = &node.note {
        let note = format!(" - {}", note);
        match style {
            TraceStyle::Plain => out.write_str(&note)?,
            TraceStyle::Colored => write!(out, "{}", note.as_str().dimmed())?,
        }
    }

    if let Some(rule) = &node.rule {
        let rule = format!(" ({})", rule);
        match (style, level) {
            (TraceStyle::Plain, _) => out.write_str(&rule)?,
            (TraceStyle::Colored, 0) => write!(out, "{}", rule.as_str().dimmed().underline())?,
            (TraceStyle::Colored, _) => write!(out, "{}", rule.as_str().dimmed())?,
        }
    }

    for dependency in &node.dependencies {
        out.write_char('\n')?;
        write_level(dependency, level + 1, style, out)?;
    }

    Ok(())
}

/// [`fmt::Display`] adapter returned by [`ProvenanceNode::display`]
pub struct TraceDisplay<'a> {
    node: &'a ProvenanceNode,
    style: TraceStyle,
}

impl fmt::Display for TraceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self.node, self.style, f)
    }
}

/// Structured form of a derivation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceNode {
    pub label: String,
    pub relation: String,
    pub left: String,
    pub right: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ProvenanceNode>,
    /// Label with the two terms in blue
    #[serde(skip)]
    highlighted: String,
}

impl ProvenanceNode {
    pub fn display(&self, style: TraceStyle) -> TraceDisplay<'_> {
        TraceDisplay { node: self, style }
    }

    /// Number of nodes in the unfolded tree
    pub fn size(&self) -> usize {
        1 + self.dependencies.iter().map(ProvenanceNode::size).sum::<usize>()
    }

    /// Longest path from this node to a leaf; leaves have depth 0
    pub fn depth(&self) -> usize {
        self.dependencies
            .iter()
            .map(|dependency| dependency.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Expand a fact's derivation into a tree
pub fn expand(fact: &Fact) -> ProvenanceNode {
    let note = match fact.origin() {
        Some(Origin::Asserted { note }) => Some(note.clone()),
        _ => None,
    };

    let (left, right) = (fact.left().label(), fact.right().label());
    ProvenanceNode {
        label: fact.label(),
        highlighted: fact
            .relation()
            .render(&left.blue().to_string(), &right.blue().to_string()),
        relation: fact.relation().name().to_string(),
        left: left.to_string(),
        right: right.to_string(),
        rule: fact.rule().map(str::to_string),
        note,
        dependencies: fact.dependencies().iter().map(expand).collect(),
    }
}
