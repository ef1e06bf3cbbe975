// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tests for program loading and run reports

use chainlog::report::{self, OutputFormat, RunReport, TraceFormatter};
use chainlog::{Error, Program, Query, RunOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn run_to_report(program: &Program) -> RunReport {
    let mut ctx = program.context();
    let stats = ctx
        .run_with(program.rules(), program.options())
        .expect("demo programs reach a fixpoint");
    RunReport::build(&ctx, stats, true, None)
}

#[test]
fn test_less_than_demo() {
    let program = Program::from_path(&demo("less_than.yaml")).expect("demo should load");
    let mut ctx = program.context();
    let stats = ctx.run(program.rules());

    let lt = program.relation("lt").unwrap();
    let gt = program.relation("gt").unwrap();
    let one = program.term("1").unwrap();
    let four = program.term("4").unwrap();

    assert!(ctx.contains(&Query::exact(lt, one, four)));
    assert!(ctx.contains(&Query::exact(gt, four, one)));
    assert!(!ctx.contains(&Query::exact(lt, four, one)));
    assert_eq!(stats.rounds, 4);
    assert_eq!(ctx.len(), 12);
}

#[test]
fn test_zip_demo() {
    let program = Program::from_path(&demo("zip.yaml")).expect("demo should load");
    let mut ctx = program.context();
    ctx.run(program.rules());

    let related = program.relation("related").unwrap();
    let pair = |a: &str, b: &str| {
        Query::exact(related, program.term(a).unwrap(), program.term(b).unwrap())
    };
    assert!(ctx.contains(&pair("a1", "b1")));
    assert!(ctx.contains(&pair("a2", "b2")));
    assert!(ctx.contains(&pair("a3", "b3")));
    assert!(!ctx.contains(&pair("a1", "b2")));
    assert!(!ctx.contains(&pair("a2", "b3")));
}

#[test]
fn test_type_inference_demo_is_json() {
    let program = Program::from_path(&demo("type_inference.json")).expect("demo should load");
    assert_eq!(program.options().max_rounds, Some(16));

    let report = run_to_report(&program);
    let has_type = program.relation("has_type").unwrap();
    let typed: Vec<&str> = report
        .facts
        .iter()
        .filter(|node| node.relation == has_type.name())
        .map(|node| node.label.as_str())
        .collect();
    assert_eq!(typed, vec!["num :: Int", "x :: Int", "f num :: Int"]);

    let call = report.facts.iter().find(|node| node.label == "f num :: Int").unwrap();
    assert_eq!(
        call.rule.as_deref(),
        Some("type of function call <- type of function's output")
    );
    assert_eq!(call.dependencies.len(), 3);
    assert_eq!(call.dependencies[1].note.as_deref(), Some("f : x -> x"));
    assert_eq!(call.depth(), 2);
}

#[test]
fn test_plans_put_the_head_last() {
    let program = Program::from_path(&demo("zip.yaml")).unwrap();
    for rule in program.rules() {
        let plan = rule.plan();
        assert_eq!(plan.body().len(), 3);
        assert_eq!(plan.steps().len(), 4);
        assert_eq!(plan.head().relation.name(), "related");
    }
}

#[test]
fn test_program_from_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edges.yml");
    fs::write(
        &path,
        r#"
relations:
  - { name: edge }
  - { name: path }
facts:
  - { relation: edge, left: a, right: b }
  - { relation: edge, left: b, right: c }
rules:
  - name: step
    input: x
    bind:
      - { var: y, relation: edge, from: x }
    derive: { relation: path, left: x, right: y }
  - name: extend
    input: x
    bind:
      - { var: y, relation: path, from: x }
      - { var: z, relation: edge, from: y }
    derive: { relation: path, left: x, right: z }
"#,
    )
    .unwrap();

    let program = Program::from_path(&path).unwrap();
    let report = run_to_report(&program);
    let paths: Vec<&str> = report
        .facts
        .iter()
        .filter(|node| node.relation == "path")
        .map(|node| node.label.as_str())
        .collect();
    assert_eq!(paths, vec!["path(a, b)", "path(b, c)", "path(a, c)"]);
}

#[test]
fn test_missing_program_file() {
    let dir = TempDir::new().unwrap();
    let err = Program::from_path(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{:#}", err).contains("reading program"));
}

#[test]
fn test_unknown_fields_are_rejected() {
    let err = Program::from_yaml("relations:\n  - { name: lt, arity: 2 }\n").unwrap_err();
    assert!(format!("{:#}", err).contains("arity"));
}

#[test]
fn test_round_limit_from_options() {
    let program = Program::from_yaml(
        r#"
options: { max_rounds: 1 }
relations:
  - { name: lt }
facts:
  - { relation: lt, left: 1, right: 2 }
  - { relation: lt, left: 2, right: 3 }
  - { relation: lt, left: 3, right: 4 }
rules:
  - name: transitive
    input: a
    bind:
      - { var: b, relation: lt, from: a }
      - { var: c, relation: lt, from: b }
    derive: { relation: lt, left: a, right: c }
"#,
    )
    .unwrap();

    let mut ctx = program.context();
    match ctx.run_with(program.rules(), program.options()) {
        Err(Error::RoundLimit { stats }) => {
            assert_eq!(stats.rounds, 1);
            let report = RunReport::build(&ctx, stats, false, None);
            let summary = TraceFormatter::plain().summary(&report);
            assert_eq!(summary, "stopped at round limit after 1 rounds: 5 facts (2 derived)");
        }
        other => panic!("expected a round limit, got {:?}", other),
    }

    assert!(ctx.run_with(program.rules(), RunOptions::default()).is_ok());
    assert_eq!(ctx.len(), 6);
}

#[test]
fn test_report_formats_round_trip_through_files() {
    let program = Program::from_path(&demo("less_than.yaml")).unwrap();
    let mut ctx = program.context();
    let stats = ctx.run(program.rules());
    let gt = program.relation("gt").unwrap();
    let report = RunReport::build(&ctx, stats, true, Some(gt)).with_program(Path::new("less_than.yaml"));
    assert_eq!(report.facts.len(), 6);
    assert_eq!(report.total_facts, 12);

    let dir = TempDir::new().unwrap();

    let json_path = dir.path().join("report.json");
    report::save_report(&report, OutputFormat::Json, &json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["reached_fixpoint"], true);
    assert_eq!(json["program"], "less_than.yaml");
    assert_eq!(json["stats"]["rounds"], 4);
    assert_eq!(json["facts"].as_array().unwrap().len(), 6);
    assert_eq!(json["facts"][0]["rule"], "inverse");

    let yaml_path = dir.path().join("report.yaml");
    report::save_report(&report, OutputFormat::Yaml, &yaml_path).unwrap();
    let yaml = fs::read_to_string(&yaml_path).unwrap();
    assert!(yaml.contains("reached_fixpoint: true"));

    let text_path = dir.path().join("report.txt");
    report::save_report(&report, OutputFormat::Text, &text_path).unwrap();
    let text = fs::read_to_string(&text_path).unwrap();
    assert!(text.starts_with("2 > 1 (inverse)\n  1 < 2\n\n"));
    assert!(text.ends_with("fixpoint reached after 4 rounds: 12 facts (9 derived)\n"));
}

#[test]
fn test_text_format_is_not_serialized() {
    let program = Program::from_path(&demo("less_than.yaml")).unwrap();
    let report = run_to_report(&program);
    assert!(OutputFormat::Text.serialize(&report).is_err());
}
