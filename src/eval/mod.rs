// SPDX-License-Identifier: PMPL-1.0-or-later

//! Naive forward chaining
//!
//! Every round runs each rule's join plan from scratch against the whole
//! store and collects the head facts it produces. Candidates are inserted
//! once the round is over, so all rules of a round see the same store.
//! Rounds repeat until one inserts nothing.
//!
//! Nothing here guards against rule sets whose closure is infinite;
//! [`RunOptions::max_rounds`] is the only brake.

use crate::planner::Rule;
use crate::store::FactStore;
use crate::types::{Fact, Term, TermId};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace};

/// Knobs for a single `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many rounds even if the fixpoint was not reached
    pub max_rounds: Option<usize>,
}

impl RunOptions {
    pub fn bounded(max_rounds: usize) -> Self {
        Self {
            max_rounds: Some(max_rounds),
        }
    }
}

/// Per-rule counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub rule: String,
    /// Head facts produced by the join, duplicates included
    pub candidates: usize,
    /// Candidates that were new to the store
    pub inserted: usize,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rounds executed, including the final round that derived nothing
    pub rounds: usize,
    /// Facts inserted over the whole run
    pub inserted: usize,
    pub rules: Vec<RuleStats>,
}

impl RunStats {
    fn for_rules(rules: &[Rule]) -> Self {
        Self {
            rounds: 0,
            inserted: 0,
            rules: rules
                .iter()
                .map(|rule| RuleStats {
                    rule: rule.name().to_string(),
                    ..RuleStats::default()
                })
                .collect(),
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rounds, {} facts derived", self.rounds, self.inserted)
    }
}

/// Run rounds until the fixpoint or until `max_rounds` is exhausted.
/// The flag is true when the fixpoint was reached.
pub fn run_rounds(
    store: &mut FactStore,
    rules: &[Rule],
    max_rounds: Option<usize>,
) -> (RunStats, bool) {
    let mut stats = RunStats::for_rules(rules);

    loop {
        if max_rounds.is_some_and(|limit| stats.rounds >= limit) {
            debug!(rounds = stats.rounds, "round limit reached before fixpoint");
            return (stats, false);
        }
        stats.rounds += 1;

        let candidates: Vec<Vec<Fact>> = rules
            .iter()
            .map(|rule| evaluate_rule(store, rule))
            .collect();

        let mut inserted = 0;
        for (rule_stats, facts) in stats.rules.iter_mut().zip(candidates) {
            rule_stats.candidates += facts.len();
            let added = store.add_counted(facts);
            rule_stats.inserted += added;
            inserted += added;
        }
        stats.inserted += inserted;

        debug!(
            round = stats.rounds,
            inserted,
            total = store.len(),
            "evaluation round finished"
        );

        if inserted == 0 {
            info!(
                rounds = stats.rounds,
                derived = stats.inserted,
                "fixpoint reached"
            );
            return (stats, true);
        }
    }
}

/// Head facts one rule derives from the current store, in match order
pub fn evaluate_rule(store: &FactStore, rule: &Rule) -> Vec<Fact> {
    let plan = rule.plan();
    let first = &plan.body()[0];
    let mut join = Join {
        store,
        rule,
        bindings: vec![None; plan.var_count()],
        dependencies: Vec::with_capacity(plan.body().len()),
    };
    let mut out = Vec::new();

    // Seeding from every fact of the first relation would only replay the
    // same left value once per fact; each distinct value is enough.
    let mut seeded: HashSet<TermId> = HashSet::new();
    for fact in store.lookup(&first.relation, None, None) {
        if !seeded.insert(fact.left().id()) {
            continue;
        }
        join.bindings[first.input.index()] = Some(fact.left().clone());
        join.walk(0, &mut out);
    }

    trace!(rule = rule.name(), candidates = out.len(), "rule evaluated");
    out
}

/// Backtracking nested-loop join over a rule's body
struct Join<'a> {
    store: &'a FactStore,
    rule: &'a Rule,
    bindings: Vec<Option<Term>>,
    dependencies: Vec<Fact>,
}

impl Join<'_> {
    fn walk(&mut self, depth: usize, out: &mut Vec<Fact>) {
        let store = self.store;
        let rule = self.rule;
        let plan = rule.plan();
        let Some(step) = plan.body().get(depth) else {
            self.emit(out);
            return;
        };

        let input = self.bindings[step.input.index()].clone();
        let previous = self.bindings[step.output.index()].clone();

        for fact in store.lookup(&step.relation, input.as_ref(), previous.as_ref()) {
            self.bindings[step.output.index()] = Some(fact.right().clone());
            self.dependencies.push(fact.clone());
            self.walk(depth + 1, out);
            self.dependencies.pop();
        }

        self.bindings[step.output.index()] = previous;
    }

    fn emit(&self, out: &mut Vec<Fact>) {
        let head = self.rule.plan().head();
        let left = &self.bindings[head.input.index()];
        let right = &self.bindings[head.output.index()];

        // Plans only finish with both roots bound
        if let (Some(left), Some(right)) = (left, right) {
            out.push(Fact::derived(
                &head.relation,
                left.clone(),
                right.clone(),
                self.rule.shared_name(),
                self.dependencies.clone(),
            ));
        }
    }
}
