// SPDX-License-Identifier: PMPL-1.0-or-later

//! chainlog: run forward-chaining programs and print derivation traces
//!
//! Programs are JSON or YAML files declaring relations, seed facts and
//! rules. See `chainlog::program` for the format.

use anyhow::{anyhow, Result};
use chainlog::report::{self, OutputFormat, RunReport, TraceFormatter};
use chainlog::{Error, Program, RunOptions};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chainlog")]
#[command(version)]
#[command(about = "Forward-chaining inference over binary relations")]
#[command(long_about = None)]
struct Cli {
    /// Log evaluation rounds to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program to its fixpoint and print every derivation
    Run {
        /// Program file (.json, .yaml or .yml)
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// Only list facts of this relation
        #[arg(short, long)]
        relation: Option<String>,

        /// Output format; defaults to the --output extension, else text
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Stop after this many rounds (overrides the program's options)
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the compiled join plan of every rule
    Plan {
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,
    },

    /// Load and compile a program without running it
    Check {
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            program: path,
            relation,
            format,
            max_rounds,
            output,
        } => {
            let program = Program::from_path(&path)?;
            let filter = relation
                .map(|name| {
                    program
                        .relation(&name)
                        .cloned()
                        .ok_or_else(|| anyhow!("unknown relation `{}`", name))
                })
                .transpose()?;
            let options = RunOptions {
                max_rounds: max_rounds.or(program.options().max_rounds),
            };

            let mut context = program.context();
            let (stats, reached_fixpoint) = match context.run_with(program.rules(), options) {
                Ok(stats) => (stats, true),
                Err(Error::RoundLimit { stats }) => {
                    warn!(rounds = stats.rounds, "round limit reached before fixpoint");
                    (stats, false)
                }
                Err(err) => return Err(err.into()),
            };

            let report = RunReport::build(&context, stats, reached_fixpoint, filter.as_ref())
                .with_program(&path);
            let format = OutputFormat::resolve(format, output.as_deref());

            match (&output, format) {
                (Some(out), format) => {
                    report::save_report(&report, format, out)?;
                    println!("Report saved to: {}", out.display());
                }
                (None, OutputFormat::Text) => TraceFormatter::default().print(&report),
                (None, format) => println!("{}", format.serialize(&report)?),
            }

            if !reached_fixpoint {
                return Err(anyhow!(
                    "no fixpoint within {} rounds",
                    report.stats.rounds
                ));
            }
        }

        Commands::Plan { program: path } => {
            let program = Program::from_path(&path)?;
            for rule in program.rules() {
                let plan = rule.plan();
                println!("{} {}", "rule".bold(), rule.name().bold().cyan());
                for (i, step) in plan.body().iter().enumerate() {
                    println!("  {}. {}", i + 1, step);
                }
                println!("  => {}", plan.head());
                println!();
            }
        }

        Commands::Check { program: path } => {
            let program = Program::from_path(&path)?;
            println!(
                "{} {}: {} relations, {} facts, {} rules",
                "ok".green().bold(),
                path.display(),
                program.relations().count(),
                program.facts().len(),
                program.rules().len()
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
