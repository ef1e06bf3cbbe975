// SPDX-License-Identifier: PMPL-1.0-or-later

//! Append-only fact store
//!
//! Facts are grouped per relation in insertion order. Relations keep the
//! order in which their first fact arrived. Each relation also keeps the
//! set of `(left, right)` pairs it holds, which is what makes insertion
//! idempotent, and an index from left value to positions for the
//! left-bound lookups the evaluator performs on every join step.

use crate::types::{Fact, Query, Relation, RelationId, Term, TermId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct RelationTable {
    relation: Relation,
    facts: Vec<Fact>,
    keys: HashSet<(TermId, TermId)>,
    by_left: HashMap<TermId, Vec<usize>>,
}

impl RelationTable {
    fn new(relation: Relation) -> Self {
        Self {
            relation,
            facts: Vec::new(),
            keys: HashSet::new(),
            by_left: HashMap::new(),
        }
    }

    fn insert(&mut self, fact: Fact) -> bool {
        let left = fact.left().id();
        if !self.keys.insert((left, fact.right().id())) {
            return false;
        }
        self.by_left.entry(left).or_default().push(self.facts.len());
        self.facts.push(fact);
        true
    }
}

/// All ground facts known to one engine instance
#[derive(Debug, Default)]
pub struct FactStore {
    tables: IndexMap<RelationId, RelationTable>,
    len: usize,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one fact; false if the triple was already present
    pub fn insert(&mut self, fact: Fact) -> bool {
        let inserted = self
            .tables
            .entry(fact.relation().id())
            .or_insert_with(|| RelationTable::new(fact.relation().clone()))
            .insert(fact);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Insert facts, skipping duplicates. True iff anything was new.
    pub fn add<I: IntoIterator<Item = Fact>>(&mut self, facts: I) -> bool {
        self.add_counted(facts) > 0
    }

    /// Insert facts, skipping duplicates, and return how many were new
    pub fn add_counted<I: IntoIterator<Item = Fact>>(&mut self, facts: I) -> usize {
        facts
            .into_iter()
            .map(|fact| self.insert(fact))
            .filter(|&inserted| inserted)
            .count()
    }

    /// Facts matching the query, in store order
    pub fn get(&self, query: &Query) -> impl Iterator<Item = &Fact> + '_ {
        self.lookup(&query.relation, query.left.as_ref(), query.right.as_ref())
    }

    /// Like [`FactStore::get`] without building a [`Query`]
    pub fn lookup<'a>(
        &'a self,
        relation: &Relation,
        left: Option<&Term>,
        right: Option<&Term>,
    ) -> impl Iterator<Item = &'a Fact> + 'a {
        let left = left.map(Term::id);
        let right = right.map(Term::id);

        let candidates: Box<dyn Iterator<Item = &'a Fact> + 'a> =
            match (self.tables.get(&relation.id()), left) {
                (None, _) => Box::new(std::iter::empty()),
                (Some(table), Some(left)) => Box::new(
                    table
                        .by_left
                        .get(&left)
                        .into_iter()
                        .flatten()
                        .map(move |&index| &table.facts[index]),
                ),
                (Some(table), None) => Box::new(table.facts.iter()),
            };

        candidates.filter(move |fact| right.is_none_or(|right| fact.right().id() == right))
    }

    pub fn contains(&self, query: &Query) -> bool {
        self.get(query).next().is_some()
    }

    /// Every fact, relation by relation
    pub fn all(&self) -> impl Iterator<Item = &Fact> + '_ {
        self.tables.values().flat_map(|table| table.facts.iter())
    }

    /// Relations that hold at least one fact, in first-insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.tables.values().map(|table| &table.relation)
    }

    pub fn relation_len(&self, relation: &Relation) -> usize {
        self.tables
            .get(&relation.id())
            .map(|table| table.facts.len())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
