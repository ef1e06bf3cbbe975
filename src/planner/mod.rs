// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rule construction and join planning
//!
//! A rule is assembled from variables held in an index-addressed arena.
//! Each variable may carry a producer link `(relation, parent)`: "my value
//! is the right-hand side of a `relation` fact whose left-hand side is
//! `parent`". Planning walks those links backwards from the rule's two
//! root variables and turns them into an ordered list of join steps.

use crate::error::{Error, Result, Side};
use crate::types::{next_id, Relation, RelationId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A variable in a rule's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone)]
struct VarRecord {
    producer: Option<(Relation, Var)>,
    sort: Option<String>,
}

/// Incrementally assembles a [`Rule`]
///
/// ```
/// use chainlog::{Relation, RuleBuilder};
///
/// let lt = Relation::templated("lt", "{} < {}").unwrap();
/// let mut rule = RuleBuilder::new("transitive");
/// let a = rule.input();
/// let b = rule.apply(&lt, a).unwrap();
/// let c = rule.apply(&lt, b).unwrap();
/// let rule = rule.derive(&lt, a, c).unwrap();
/// assert_eq!(rule.plan().body().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    name: String,
    vars: Vec<VarRecord>,
}

impl RuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: vec![VarRecord {
                producer: None,
                sort: None,
            }],
        }
    }

    /// The variable the rule starts from
    pub fn input(&self) -> Var {
        Var(0)
    }

    /// An unlinked variable
    pub fn fresh(&mut self) -> Var {
        self.push(None, None)
    }

    /// A variable bound to the right-hand side of `relation(from, _)`
    pub fn apply(&mut self, relation: &Relation, from: Var) -> Result<Var> {
        self.check(from)?;
        self.constrain(from, relation, Side::Left)?;
        let sort = relation.sorts().map(|sorts| sorts.right.clone());
        Ok(self.push(Some((relation.clone(), from)), sort))
    }

    /// Finish the rule: derive `target(left, right)` and compile its plan
    pub fn derive(mut self, target: &Relation, left: Var, right: Var) -> Result<Rule> {
        self.check(left)?;
        self.check(right)?;
        self.constrain(left, target, Side::Left)?;
        self.constrain(right, target, Side::Right)?;

        let plan = compile(&self.name, &self.vars, target, left, right)?;
        Ok(Rule {
            inner: Arc::new(RuleInner {
                id: next_id(),
                name: Arc::from(self.name.as_str()),
                target: target.clone(),
                left,
                right,
                plan,
            }),
        })
    }

    fn push(&mut self, producer: Option<(Relation, Var)>, sort: Option<String>) -> Var {
        self.vars.push(VarRecord { producer, sort });
        Var(self.vars.len() - 1)
    }

    fn check(&self, var: Var) -> Result<()> {
        if var.0 < self.vars.len() {
            Ok(())
        } else {
            Err(Error::UnknownVariable {
                rule: self.name.clone(),
                var: var.0,
            })
        }
    }

    fn constrain(&mut self, var: Var, relation: &Relation, side: Side) -> Result<()> {
        let Some(sorts) = relation.sorts() else {
            return Ok(());
        };
        let wanted = match side {
            Side::Left => &sorts.left,
            Side::Right => &sorts.right,
        };

        let record = &mut self.vars[var.0];
        match &record.sort {
            Some(known) if known != wanted => Err(Error::SortMismatch {
                relation: relation.render("<...>", "<...>"),
                expected: known.clone(),
                found: wanted.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                record.sort = Some(wanted.clone());
                Ok(())
            }
        }
    }
}

/// One join step: match `relation(input, output)`
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub relation: Relation,
    pub input: Var,
    pub output: Var,
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.relation.name(), self.input, self.output)
    }
}

/// Executable plan for a rule
///
/// `steps` ends with the head `(target, left, right)`; everything before it
/// is the body, ordered so that each step's input is bound when reached.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    steps: Vec<PlanStep>,
    var_count: usize,
}

impl JoinPlan {
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn body(&self) -> &[PlanStep] {
        &self.steps[..self.steps.len() - 1]
    }

    pub fn head(&self) -> &PlanStep {
        &self.steps[self.steps.len() - 1]
    }

    /// Variable bound by the initial full scan
    pub fn seed(&self) -> Var {
        self.steps[0].input
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }
}

struct RuleInner {
    id: u64,
    name: Arc<str>,
    target: Relation,
    left: Var,
    right: Var,
    plan: JoinPlan,
}

/// A named, compiled derivation template
#[derive(Clone)]
pub struct Rule {
    inner: Arc<RuleInner>,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.inner.name.clone()
    }

    pub fn target(&self) -> &Relation {
        &self.inner.target
    }

    pub fn roots(&self) -> (Var, Var) {
        (self.inner.left, self.inner.right)
    }

    pub fn plan(&self) -> &JoinPlan {
        &self.inner.plan
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Rule {}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.inner.name)
            .field("target", &self.inner.target)
            .field("steps", &self.inner.plan.steps.len())
            .finish()
    }
}

fn compile(
    rule: &str,
    vars: &[VarRecord],
    target: &Relation,
    left: Var,
    right: Var,
) -> Result<JoinPlan> {
    // Backward BFS over producer links, one level per hop
    let mut seen: HashSet<(RelationId, Var, Var)> = HashSet::new();
    let mut levels: Vec<Vec<PlanStep>> = Vec::new();
    let mut frontier = vec![left, right];

    loop {
        let mut level = Vec::new();
        for &var in &frontier {
            if let Some((relation, parent)) = &vars[var.0].producer {
                if seen.insert((relation.id(), *parent, var)) {
                    level.push(PlanStep {
                        relation: relation.clone(),
                        input: *parent,
                        output: var,
                    });
                }
            }
        }

        if level.is_empty() {
            break;
        }
        frontier = level.iter().map(|step| step.input).collect();
        levels.push(level);
    }

    let mut discovered: Vec<PlanStep> = levels.into_iter().flatten().collect();
    discovered.reverse();

    if discovered.is_empty() {
        return Err(Error::EmptyBody {
            rule: rule.to_string(),
        });
    }

    let mut unlinked = discovered
        .iter()
        .map(|step| step.input)
        .filter(|var| vars[var.0].producer.is_none());
    let seed = unlinked.next().unwrap_or(discovered[0].input);
    if let Some(other) = unlinked.find(|&var| var != seed) {
        return Err(Error::DisconnectedVariable {
            rule: rule.to_string(),
            var: other.0,
        });
    }

    // Stable scheduling: keep the reversed order, deferring any step whose
    // input is not bound yet.
    let mut bound: HashSet<Var> = HashSet::from([seed]);
    let mut pending = discovered;
    let mut steps = Vec::with_capacity(pending.len() + 1);
    while !pending.is_empty() {
        let Some(position) = pending.iter().position(|step| bound.contains(&step.input)) else {
            return Err(Error::DisconnectedVariable {
                rule: rule.to_string(),
                var: pending[0].input.0,
            });
        };
        let step = pending.remove(position);
        bound.insert(step.output);
        steps.push(step);
    }

    for (side, var) in [(Side::Left, left), (Side::Right, right)] {
        if !bound.contains(&var) {
            return Err(Error::UnresolvedRoot {
                rule: rule.to_string(),
                side,
                var: var.0,
            });
        }
    }

    steps.push(PlanStep {
        relation: target.clone(),
        input: left,
        output: right,
    });

    Ok(JoinPlan {
        steps,
        var_count: vars.len(),
    })
}
