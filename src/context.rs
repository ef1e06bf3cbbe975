// SPDX-License-Identifier: PMPL-1.0-or-later

//! Engine instance: one fact store plus the operations run against it

use crate::error::{Error, Result};
use crate::eval::{self, RunOptions, RunStats};
use crate::planner::Rule;
use crate::provenance::{self, TraceStyle};
use crate::store::FactStore;
use crate::types::{Fact, Query};
use std::fmt;

/// Owns a [`FactStore`] for the lifetime of one engine instance
#[derive(Debug, Default)]
pub struct Context {
    store: FactStore,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add facts; true iff at least one of them was new
    pub fn add<I: IntoIterator<Item = Fact>>(&mut self, facts: I) -> bool {
        self.store.add(facts)
    }

    pub fn add_fact(&mut self, fact: Fact) -> bool {
        self.store.insert(fact)
    }

    pub fn get(&self, query: &Query) -> impl Iterator<Item = &Fact> + '_ {
        self.store.get(query)
    }

    pub fn contains(&self, query: &Query) -> bool {
        self.store.contains(query)
    }

    pub fn all(&self) -> impl Iterator<Item = &Fact> + '_ {
        self.store.all()
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Derive facts until a round adds nothing
    ///
    /// Does not return for rule sets whose closure is infinite; use
    /// [`Context::run_with`] with a round limit for untrusted rules.
    pub fn run(&mut self, rules: &[Rule]) -> RunStats {
        let (stats, _) = eval::run_rounds(&mut self.store, rules, None);
        stats
    }

    /// Like [`Context::run`] but fails with [`Error::RoundLimit`] when
    /// `options.max_rounds` runs out first. Facts derived so far stay.
    pub fn run_with(&mut self, rules: &[Rule], options: RunOptions) -> Result<RunStats> {
        match eval::run_rounds(&mut self.store, rules, options.max_rounds) {
            (stats, true) => Ok(stats),
            (stats, false) => Err(Error::RoundLimit { stats }),
        }
    }

    /// Print the derivation trace of every fact, or of those matching `query`
    pub fn print(&self, query: Option<&Query>) {
        for fact in self.select(query) {
            println!("{}\n", provenance::expand(fact).display(TraceStyle::Colored));
        }
    }

    /// Like [`Context::print`] into any writer; each trace ends with a blank line
    pub fn write_traces<W: fmt::Write>(
        &self,
        query: Option<&Query>,
        style: TraceStyle,
        out: &mut W,
    ) -> fmt::Result {
        for fact in self.select(query) {
            provenance::write_trace(fact, style, out)?;
            out.write_str("\n\n")?;
        }
        Ok(())
    }

    fn select(&self, query: Option<&Query>) -> Box<dyn Iterator<Item = &Fact> + '_> {
        match query {
            Some(query) => Box::new(self.get(query)),
            None => Box::new(self.all()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::RuleBuilder;
    use crate::types::{Relation, Term};

    #[test]
    fn test_run_twice_adds_nothing_the_second_time() {
        let lt = Relation::new("lt");
        let gt = Relation::new("gt");
        let one = Term::new("1");
        let two = Term::new("2");

        let mut inverse = RuleBuilder::new("inverse");
        let a = inverse.input();
        let b = inverse.apply(&lt, a).unwrap();
        let rules = [inverse.derive(&gt, b, a).unwrap()];

        let mut ctx = Context::new();
        ctx.add([Fact::new(&lt, &one, &two)]);

        let first = ctx.run(&rules);
        assert_eq!(first.inserted, 1);
        let second = ctx.run(&rules);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.rounds, 1);
        assert!(ctx.contains(&Query::exact(&gt, &two, &one)));
    }

    #[test]
    fn test_write_traces_filters_by_query() {
        let lt = Relation::templated("lt", "{} < {}").unwrap();
        let gt = Relation::templated("gt", "{} > {}").unwrap();
        let one = Term::new("1");
        let two = Term::new("2");

        let mut inverse = RuleBuilder::new("inverse");
        let a = inverse.input();
        let b = inverse.apply(&lt, a).unwrap();
        let rules = [inverse.derive(&gt, b, a).unwrap()];

        let mut ctx = Context::new();
        ctx.add([Fact::asserted(&lt, &one, &two, "given")]);
        ctx.run(&rules);

        let mut all = String::new();
        ctx.write_traces(None, TraceStyle::Plain, &mut all).unwrap();
        assert_eq!(all, "1 < 2 - given\n\n2 > 1 (inverse)\n  1 < 2 - given\n\n");

        let mut only_gt = String::new();
        ctx.write_traces(Some(&Query::all(&gt)), TraceStyle::Plain, &mut only_gt)
            .unwrap();
        assert_eq!(only_gt, "2 > 1 (inverse)\n  1 < 2 - given\n\n");
    }

    #[test]
    fn test_run_with_reports_round_limit() {
        let lt = Relation::new("lt");
        let terms: Vec<Term> = ["1", "2", "3", "4"].iter().map(|l| Term::new(l)).collect();

        let mut rule = RuleBuilder::new("transitive");
        let a = rule.input();
        let b = rule.apply(&lt, a).unwrap();
        let c = rule.apply(&lt, b).unwrap();
        let rules = [rule.derive(&lt, a, c).unwrap()];

        let mut ctx = Context::new();
        ctx.add(terms.windows(2).map(|w| Fact::new(&lt, &w[0], &w[1])));

        match ctx.run_with(&rules, RunOptions::bounded(1)) {
            Err(Error::RoundLimit { stats }) => assert_eq!(stats.rounds, 1),
            other => panic!("expected round limit, got {:?}", other),
        }
        assert!(ctx.run_with(&rules, RunOptions::bounded(8)).is_ok());
        assert!(ctx.contains(&Query::exact(&lt, &terms[0], &terms[3])));
    }
}
