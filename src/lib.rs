// SPDX-License-Identifier: PMPL-1.0-or-later

//! chainlog: forward-chaining inference over binary relations.
//!
//! Seed facts are `(relation, left, right)` triples. Rules describe how a
//! new fact follows from a chain of existing ones. Running the rules
//! computes the full derivation closure and records, for every derived
//! fact, the rule and the facts it was derived from.
//!
//! ENGINE PARTS:
//! 1. **Store**: append-only, deduplicating fact storage with pattern queries.
//! 2. **Planner**: compiles a rule's variable chain into an ordered join.
//! 3. **Evaluator**: naive nested-loop joins, repeated to a fixpoint.
//! 4. **Provenance**: derivation trees, printed or serialized.
//!
//! ```
//! use chainlog::{Context, Fact, Query, Relation, RuleBuilder, Term};
//!
//! let lt = Relation::templated("lt", "{} < {}").unwrap();
//! let gt = Relation::templated("gt", "{} > {}").unwrap();
//!
//! let mut inverse = RuleBuilder::new("inverse");
//! let a = inverse.input();
//! let b = inverse.apply(&lt, a).unwrap();
//! let rules = [inverse.derive(&gt, b, a).unwrap()];
//!
//! let (one, two) = (Term::new("1"), Term::new("2"));
//! let mut ctx = Context::new();
//! ctx.add([Fact::new(&lt, &one, &two)]);
//! ctx.run(&rules);
//!
//! assert!(ctx.contains(&Query::exact(&gt, &two, &one)));
//! ```

pub mod context;
pub mod error;
pub mod eval;
pub mod planner;
pub mod program;
pub mod provenance;
pub mod report;
pub mod store;
pub mod types;

pub use context::Context;
pub use error::{Error, Result, Side};
pub use eval::{RuleStats, RunOptions, RunStats};
pub use planner::{JoinPlan, PlanStep, Rule, RuleBuilder, Var};
pub use program::Program;
pub use provenance::{ProvenanceNode, TraceStyle};
pub use store::FactStore;
pub use types::{Fact, FactKey, Origin, Query, Relation, RelationId, Sorts, Term, TermId};
