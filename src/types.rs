// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core value types for the inference engine
//!
//! Relations, terms and rules compare by a process-unique id handed out
//! at creation time. Two terms with the same label are different values.

use crate::error::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Allocate the next process-unique identity
pub(crate) fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(u64);

/// Identity of a ground term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u64);

/// Optional sort tags for the two positions of a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorts {
    pub left: String,
    pub right: String,
}

impl Sorts {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

struct RelationInner {
    id: RelationId,
    name: String,
    template: Option<String>,
    sorts: Option<Sorts>,
}

/// A binary predicate
///
/// Cloning is cheap and clones share the same identity.
#[derive(Clone)]
pub struct Relation {
    inner: Arc<RelationInner>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None, None)
    }

    /// Relation rendered through a template such as `"{} < {}"`
    pub fn templated(name: impl Into<String>, template: impl Into<String>) -> Result<Self> {
        Self::declare(name, Some(template.into()), None)
    }

    /// Fails unless `template` has exactly two `{}` placeholders
    pub fn declare(
        name: impl Into<String>,
        template: Option<String>,
        sorts: Option<Sorts>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(template) = &template {
            let placeholders = template.matches("{}").count();
            if placeholders != 2 {
                return Err(Error::Template {
                    relation: name,
                    placeholders,
                });
            }
        }
        Ok(Self::build(name, template, sorts))
    }

    fn build(name: String, template: Option<String>, sorts: Option<Sorts>) -> Self {
        Self {
            inner: Arc::new(RelationInner {
                id: RelationId(next_id()),
                name,
                template,
                sorts,
            }),
        }
    }

    pub fn id(&self) -> RelationId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn sorts(&self) -> Option<&Sorts> {
        self.inner.sorts.as_ref()
    }

    /// Render a label for `(left, right)`; display only, never used for joins
    pub fn render(&self, left: &str, right: &str) -> String {
        match &self.inner.template {
            Some(template) => {
                let mut out = String::with_capacity(template.len() + left.len() + right.len());
                let mut args = [left, right].into_iter();
                let mut parts = template.splitn(3, "{}").peekable();
                while let Some(part) = parts.next() {
                    out.push_str(part);
                    if parts.peek().is_some() {
                        if let Some(arg) = args.next() {
                            out.push_str(arg);
                        }
                    }
                }
                out
            }
            None => format!("{}({}, {})", self.inner.name, left, right),
        }
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Relation {}

impl Hash for Relation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name, self.inner.id.0)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// An atomic ground value with a display label
#[derive(Clone)]
pub struct Term {
    id: TermId,
    label: Arc<str>,
}

impl Term {
    pub fn new(label: &str) -> Self {
        Self {
            id: TermId(next_id()),
            label: Arc::from(label),
        }
    }

    pub fn id(&self) -> TermId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Deduplication key of a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactKey {
    pub relation: RelationId,
    pub left: TermId,
    pub right: TermId,
}

/// Where a fact came from
#[derive(Debug, Clone)]
pub enum Origin {
    /// Seed fact with a caller-supplied description
    Asserted { note: String },
    /// Produced by a rule from the listed facts, in match order
    Derived {
        rule: Arc<str>,
        dependencies: Vec<Fact>,
    },
}

/// A ground `(relation, left, right)` triple with optional provenance
///
/// Equality of facts is the equality of their [`FactKey`]; the origin is
/// metadata.
#[derive(Clone)]
pub struct Fact {
    relation: Relation,
    left: Term,
    right: Term,
    origin: Option<Arc<Origin>>,
}

impl Fact {
    pub fn new(relation: &Relation, left: &Term, right: &Term) -> Self {
        Self {
            relation: relation.clone(),
            left: left.clone(),
            right: right.clone(),
            origin: None,
        }
    }

    /// Seed fact carrying a description shown in traces
    pub fn asserted(relation: &Relation, left: &Term, right: &Term, note: impl Into<String>) -> Self {
        Self {
            origin: Some(Arc::new(Origin::Asserted { note: note.into() })),
            ..Self::new(relation, left, right)
        }
    }

    pub(crate) fn derived(
        relation: &Relation,
        left: Term,
        right: Term,
        rule: Arc<str>,
        dependencies: Vec<Fact>,
    ) -> Self {
        Self {
            relation: relation.clone(),
            left,
            right,
            origin: Some(Arc::new(Origin::Derived { rule, dependencies })),
        }
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn left(&self) -> &Term {
        &self.left
    }

    pub fn right(&self) -> &Term {
        &self.right
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_deref()
    }

    /// Name of the producing rule, if the fact was derived
    pub fn rule(&self) -> Option<&str> {
        match self.origin() {
            Some(Origin::Derived { rule, .. }) => Some(&**rule),
            _ => None,
        }
    }

    /// Dependencies of a derived fact; empty for seed facts
    pub fn dependencies(&self) -> &[Fact] {
        match self.origin() {
            Some(Origin::Derived { dependencies, .. }) => dependencies.as_slice(),
            _ => &[],
        }
    }

    pub fn key(&self) -> FactKey {
        FactKey {
            relation: self.relation.id(),
            left: self.left.id(),
            right: self.right.id(),
        }
    }

    /// Pattern matching exactly this triple
    pub fn query(&self) -> Query {
        Query::exact(&self.relation, &self.left, &self.right)
    }

    pub fn label(&self) -> String {
        self.relation.render(self.left.label(), self.right.label())
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A pattern over one relation; `None` positions are wildcards
#[derive(Debug, Clone)]
pub struct Query {
    pub relation: Relation,
    pub left: Option<Term>,
    pub right: Option<Term>,
}

impl Query {
    pub fn new(relation: &Relation, left: Option<&Term>, right: Option<&Term>) -> Self {
        Self {
            relation: relation.clone(),
            left: left.cloned(),
            right: right.cloned(),
        }
    }

    pub fn all(relation: &Relation) -> Self {
        Self::new(relation, None, None)
    }

    pub fn exact(relation: &Relation, left: &Term, right: &Term) -> Self {
        Self::new(relation, Some(left), Some(right))
    }

    pub fn matches(&self, fact: &Fact) -> bool {
        fact.relation == self.relation
            && self.left.as_ref().is_none_or(|left| *left == fact.left)
            && self.right.as_ref().is_none_or(|right| *right == fact.right)
    }
}

impl From<&Fact> for Query {
    fn from(fact: &Fact) -> Self {
        fact.query()
    }
}
