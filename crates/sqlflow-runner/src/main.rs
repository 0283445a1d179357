//! SQLFlow runner
//!
//! Parses extended SQL given on the command line or stdin, lowers every
//! statement to the IR and prints it for the backend code generators.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

mod config;
mod logging;

use config::{Config, OutputFormat, RunnerConfig};

#[derive(Debug, Parser)]
#[command(name = "sqlflow-runner", version, about = "Parse extended SQL and emit its IR")]
struct Cli {
    /// Execute SQLFlow from command line, e.g. --execute 'select * from table1'
    #[arg(short, long)]
    execute: Option<String>,

    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "sqlflow.yaml")]
    config: PathBuf,

    /// Output format, overriding the configuration
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(output) = cli.output {
        config.runner.output = output;
    }

    logging::init(&config.logging)?;

    let source = match cli.execute {
        Some(sql) => sql,
        None => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .context("failed to read SQL from stdin")?;
            sql
        }
    };

    match run(&source, &config.runner) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "sqlflow-runner failed");
            Err(err)
        }
    }
}

/// Parse `source` and produce the text printed for `config.output`.
fn run(source: &str, config: &RunnerConfig) -> Result<String> {
    let statements = sqlflow_ast::parse_program(source).context("failed to parse program")?;
    info!(statements = statements.len(), "parsed program");

    match config.output {
        OutputFormat::Text => {
            let lines = statements
                .iter()
                .map(|stmt| stmt.render())
                .collect::<Result<Vec<_>, _>>()
                .context("failed to render statement")?;
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => {
            let program = sqlflow_ast::program_to_ir(statements).context("failed to lower program")?;
            for (index, stmt) in program.statements.iter().enumerate() {
                crate::log_event!(
                    level: Level::DEBUG,
                    event: "statement_lowered",
                    index: index,
                    select: stmt.select()
                );
            }
            let json = if config.pretty {
                serde_json::to_string_pretty(&program)?
            } else {
                serde_json::to_string(&program)?
            };
            Ok(json)
        }
    }
}
