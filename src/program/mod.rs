// SPDX-License-Identifier: PMPL-1.0-or-later

//! Declarative program files
//!
//! A program declares relations, seed facts, rules and run options in JSON
//! or YAML. Loading resolves every name, interns terms by label and
//! compiles each rule, so a loaded [`Program`] is ready to run.

use crate::context::Context;
use crate::eval::RunOptions;
use crate::planner::{Rule, RuleBuilder, Var};
use crate::types::{Fact, Relation, Sorts, Term};
use anyhow::{anyhow, bail, Context as _, Result};
use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramSpec {
    #[serde(default)]
    pub options: OptionsSpec,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
    #[serde(default)]
    pub facts: Vec<FactSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsSpec {
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationSpec {
    pub name: String,
    /// Template with two `{}` placeholders, e.g. `"{} < {}"`
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub sorts: Option<[String; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactSpec {
    pub relation: String,
    pub left: Label,
    pub right: Label,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    /// Name of the rule's input variable
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default)]
    pub bind: Vec<BindingSpec>,
    pub derive: DeriveSpec,
}

fn default_input() -> String {
    "input".to_string()
}

/// `var` is the right-hand side of `relation(from, var)`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    pub var: String,
    pub relation: String,
    pub from: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeriveSpec {
    pub relation: String,
    pub left: String,
    pub right: String,
}

/// Term label as written in a program
///
/// YAML readers see `1` as a number, so integers are accepted and kept as
/// their decimal text. Floats and booleans are rejected: `1.0` and `1`
/// would otherwise collapse into the same label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label(pub String);

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(LabelVisitor)
    }
}

struct LabelVisitor;

impl<'de> Visitor<'de> for LabelVisitor {
    type Value = Label;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a term label (string or integer)")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Label, E> {
        Ok(Label(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Label, E> {
        Ok(Label(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Label, E> {
        Ok(Label(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Label, E> {
        Ok(Label(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Label, E> {
        Err(E::custom(format!(
            "float term label {}; quote it to keep its exact spelling",
            value
        )))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Label, E> {
        Err(E::custom(format!(
            "boolean term label {}; quote it to use it as a label",
            value
        )))
    }
}

/// A loaded, compiled program
#[derive(Debug)]
pub struct Program {
    relations: IndexMap<String, Relation>,
    terms: IndexMap<String, Term>,
    facts: Vec<Fact>,
    rules: Vec<Rule>,
    options: RunOptions,
}

impl Program {
    /// Load from a file; `.json` is read as JSON, anything else as YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading program {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let program = if is_json {
            Self::from_json(&data)
        } else {
            Self::from_yaml(&data)
        };
        program.with_context(|| format!("loading program {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let spec: ProgramSpec = serde_json::from_str(data).context("parsing program JSON")?;
        Self::from_spec(spec)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let spec: ProgramSpec = serde_yaml::from_str(data).context("parsing program YAML")?;
        Self::from_spec(spec)
    }

    pub fn from_spec(spec: ProgramSpec) -> Result<Self> {
        let mut program = Program {
            relations: IndexMap::new(),
            terms: IndexMap::new(),
            facts: Vec::new(),
            rules: Vec::new(),
            options: RunOptions {
                max_rounds: spec.options.max_rounds,
            },
        };

        for relation in spec.relations {
            program.declare_relation(relation)?;
        }
        for (index, fact) in spec.facts.into_iter().enumerate() {
            let fact = program
                .build_fact(fact)
                .with_context(|| format!("fact #{}", index + 1))?;
            program.facts.push(fact);
        }
        for rule in spec.rules {
            let name = rule.name.clone();
            let rule = program
                .build_rule(rule)
                .with_context(|| format!("rule `{}`", name))?;
            program.rules.push(rule);
        }

        debug!(
            relations = program.relations.len(),
            terms = program.terms.len(),
            facts = program.facts.len(),
            rules = program.rules.len(),
            "program loaded"
        );
        Ok(program)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.values()
    }

    pub fn term(&self, label: &str) -> Option<&Term> {
        self.terms.get(label)
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// A fresh context seeded with the program's facts
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.add(self.facts.iter().cloned());
        context
    }

    fn declare_relation(&mut self, spec: RelationSpec) -> Result<()> {
        if self.relations.contains_key(&spec.name) {
            bail!("relation `{}` is declared twice", spec.name);
        }
        let sorts = spec.sorts.map(|[left, right]| Sorts::new(left, right));
        let relation = Relation::declare(spec.name.clone(), spec.display, sorts)?;
        self.relations.insert(spec.name, relation);
        Ok(())
    }

    fn lookup_relation(&self, name: &str) -> Result<Relation> {
        self.relations
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown relation `{}`", name))
    }

    fn intern(&mut self, label: String) -> Term {
        self.terms
            .entry(label)
            .or_insert_with_key(|label| Term::new(label))
            .clone()
    }

    fn build_fact(&mut self, spec: FactSpec) -> Result<Fact> {
        let relation = self.lookup_relation(&spec.relation)?;
        let left = self.intern(spec.left.0);
        let right = self.intern(spec.right.0);
        Ok(match spec.note {
            Some(note) => Fact::asserted(&relation, &left, &right, note),
            None => Fact::new(&relation, &left, &right),
        })
    }

    fn build_rule(&self, spec: RuleSpec) -> Result<Rule> {
        let mut builder = RuleBuilder::new(spec.name);
        let mut vars: IndexMap<String, Var> = IndexMap::new();
        vars.insert(spec.input, builder.input());

        for binding in spec.bind {
            if vars.contains_key(&binding.var) {
                bail!("variable `{}` is bound twice", binding.var);
            }
            let from = lookup_var(&vars, &binding.from)?;
            let relation = self.lookup_relation(&binding.relation)?;
            let var = builder.apply(&relation, from)?;
            vars.insert(binding.var, var);
        }

        let target = self.lookup_relation(&spec.derive.relation)?;
        let left = lookup_var(&vars, &spec.derive.left)?;
        let right = lookup_var(&vars, &spec.derive.right)?;
        Ok(builder.derive(&target, left, right)?)
    }
}

fn lookup_var(vars: &IndexMap<String, Var>, name: &str) -> Result<Var> {
    vars.get(name)
        .copied()
        .ok_or_else(|| anyhow!("unknown variable `{}`", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Query;

    const LESS_THAN: &str = r#"
relations:
  - { name: lt, display: "{} < {}", sorts: [Num, Num] }
  - { name: gt, display: "{} > {}", sorts: [Num, Num] }
facts:
  - { relation: lt, left: 1, right: 2 }
  - { relation: lt, left: 2, right: 3, note: given }
rules:
  - name: transitive
    input: a
    bind:
      - { var: b, relation: lt, from: a }
      - { var: c, relation: lt, from: b }
    derive: { relation: lt, left: a, right: c }
  - name: inverse
    input: a
    bind:
      - { var: b, relation: lt, from: a }
    derive: { relation: gt, left: b, right: a }
"#;

    #[test]
    fn test_yaml_program_loads_and_runs() {
        let program = Program::from_yaml(LESS_THAN).unwrap();
        assert_eq!(program.rules().len(), 2);
        assert_eq!(program.facts().len(), 2);

        let mut ctx = program.context();
        ctx.run(program.rules());

        let lt = program.relation("lt").unwrap();
        let gt = program.relation("gt").unwrap();
        let one = program.term("1").unwrap();
        let three = program.term("3").unwrap();
        assert!(ctx.contains(&Query::exact(lt, one, three)));
        assert!(ctx.contains(&Query::exact(gt, three, one)));
    }

    #[test]
    fn test_terms_are_interned_by_label() {
        let program = Program::from_yaml(LESS_THAN).unwrap();
        let facts = program.facts();
        assert_eq!(facts[0].right(), facts[1].left());
    }

    #[test]
    fn test_json_program_with_options() {
        let program = Program::from_json(
            r#"{
                "options": { "max_rounds": 4 },
                "relations": [{ "name": "edge" }],
                "facts": [{ "relation": "edge", "left": "a", "right": "b" }]
            }"#,
        )
        .unwrap();
        assert_eq!(program.options().max_rounds, Some(4));
        assert!(program.rules().is_empty());
    }

    #[test]
    fn test_unknown_relation_is_reported() {
        let err = Program::from_yaml("facts:\n  - { relation: nope, left: a, right: b }\n")
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("fact #1"), "{}", message);
        assert!(message.contains("unknown relation `nope`"), "{}", message);
    }

    #[test]
    fn test_integer_and_quoted_labels_stay_distinct() {
        let yaml = r#"
relations:
  - { name: v }
facts:
  - { relation: v, left: "1.0", right: a }
  - { relation: v, left: 1, right: a }
  - { relation: v, left: "true", right: a }
"#;
        let program = Program::from_yaml(yaml).unwrap();
        assert_eq!(program.facts().len(), 3);
        assert!(program.term("1.0").is_some());
        assert!(program.term("1").is_some());
        assert_ne!(program.term("1.0"), program.term("1"));

        let mut ctx = program.context();
        ctx.run(program.rules());
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_float_labels_are_rejected() {
        let yaml = "relations:\n  - { name: v }\nfacts:\n  - { relation: v, left: 1.0, right: a }\n";
        let message = format!("{:#}", Program::from_yaml(yaml).unwrap_err());
        assert!(message.contains("float term label"), "{}", message);

        let json = r#"{ "relations": [{ "name": "v" }], "facts": [{ "relation": "v", "left": "a", "right": 1.5 }] }"#;
        assert!(Program::from_json(json).is_err());

        let yaml = "relations:\n  - { name: v }\nfacts:\n  - { relation: v, left: true, right: a }\n";
        let message = format!("{:#}", Program::from_yaml(yaml).unwrap_err());
        assert!(message.contains("boolean term label"), "{}", message);
    }

    #[test]
    fn test_bad_template_is_rejected() {
        let err = Program::from_yaml("relations:\n  - { name: lt, display: \"{} <\" }\n").unwrap_err();
        assert!(format!("{:#}", err).contains("two `{}` placeholders"));
    }

    #[test]
    fn test_rule_errors_carry_rule_name() {
        let yaml = r#"
relations:
  - { name: lt }
rules:
  - name: reflexive
    input: a
    derive: { relation: lt, left: a, right: a }
"#;
        let err = Program::from_yaml(yaml).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("rule `reflexive`"), "{}", message);
        assert!(message.contains("no relation produces"), "{}", message);
    }

    #[test]
    fn test_sort_mismatch_in_program() {
        let yaml = r#"
relations:
  - { name: has_type, sorts: [Expr, Type] }
rules:
  - name: confused
    input: e
    bind:
      - { var: t, relation: has_type, from: e }
      - { var: u, relation: has_type, from: t }
    derive: { relation: has_type, left: e, right: u }
"#;
        let err = Program::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("expected Type var, but found Expr var"));
    }
}
