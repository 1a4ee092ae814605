//! Command-line entry point.
//!
//! # Responsibility
//! - Render the built-in demo design as Structurizr DSL.
//! - Save, delete and clear designs in a SQLite graph store file.

mod demo;

use clap::{Parser, Subcommand};
use log::error;
use neoarch_core::{
    clear_store_unsafe, delete_design, init_logging, Config, LogConfig, SqliteGraphStore,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "neoarch", version, about = "Architecture-as-code for C4 designs")]
struct Invocation {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print the demo design as Structurizr DSL
    Dsl,
    /// Save the demo design into a graph store
    Save { db_file: PathBuf },
    /// Delete one design from a graph store
    Delete { db_file: PathBuf, design_id: String },
    /// Delete every design from a graph store
    Clear { db_file: PathBuf },
}

fn main() -> ExitCode {
    let invocation = Invocation::parse();

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation) -> Result<(), Box<dyn Error>> {
    let config = match &invocation.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_logging(&cli_log_config(&config.logging))?;

    let design = demo::twitter_clone(config.design_options())?;
    match invocation.command {
        Command::Dsl => println!("{}", design.to_structurizr_dsl()),
        Command::Save { db_file } => {
            let store = SqliteGraphStore::open(&db_file)?;
            let report = design.save_to_store(&store, &config.store)?;
            println!(
                "saved design={} database={} nodes={} relationships={}",
                design.id(),
                config.store.database,
                report.nodes,
                report.relationships
            );
        }
        Command::Delete { db_file, design_id } => {
            let store = SqliteGraphStore::open(&db_file)?;
            let summary = delete_design(&store, &config.store.database, &design_id)?;
            println!(
                "deleted design={} nodes={} relationships={}",
                design_id, summary.nodes_deleted, summary.relationships_deleted
            );
        }
        Command::Clear { db_file } => {
            let store = SqliteGraphStore::open(&db_file)?;
            let summary = clear_store_unsafe(&store, &config.store.database)?;
            println!(
                "cleared database={} nodes={} relationships={}",
                config.store.database, summary.nodes_deleted, summary.relationships_deleted
            );
        }
    }
    Ok(())
}

/// Quiet stderr by default so DSL output stays readable.
fn cli_log_config(config: &LogConfig) -> LogConfig {
    let mut config = config.clone();
    if config.level.is_none() && config.log_dir.is_none() {
        config.level = Some("warn".to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::{cli_log_config, Command, Invocation};
    use clap::Parser;
    use neoarch_core::LogConfig;
    use std::path::PathBuf;

    #[test]
    fn parses_commands_with_optional_config() {
        let invocation =
            Invocation::try_parse_from(["neoarch", "--config", "neoarch.json", "save", "graph.db"])
                .unwrap();
        assert_eq!(invocation.config, Some(PathBuf::from("neoarch.json")));
        assert_eq!(
            invocation.command,
            Command::Save {
                db_file: PathBuf::from("graph.db")
            }
        );

        let invocation =
            Invocation::try_parse_from(["neoarch", "delete", "graph.db", "design_shop"]).unwrap();
        assert_eq!(invocation.config, None);
        assert_eq!(
            invocation.command,
            Command::Delete {
                db_file: PathBuf::from("graph.db"),
                design_id: "design_shop".to_string()
            }
        );
        assert_eq!(
            Invocation::try_parse_from(["neoarch", "dsl"]).unwrap().command,
            Command::Dsl
        );
    }

    #[test]
    fn rejects_missing_and_unknown_commands() {
        assert!(Invocation::try_parse_from(["neoarch"]).is_err());
        assert!(Invocation::try_parse_from(["neoarch", "save"]).is_err());
        assert!(Invocation::try_parse_from(["neoarch", "dsl", "extra"]).is_err());
        assert!(Invocation::try_parse_from(["neoarch", "export", "graph.db"]).is_err());
        assert!(Invocation::try_parse_from(["neoarch", "--config"]).is_err());
    }

    #[test]
    fn command_definitions_are_consistent() {
        use clap::CommandFactory;
        Invocation::command().debug_assert();
    }

    #[test]
    fn stderr_logging_defaults_to_warn() {
        let config = cli_log_config(&LogConfig::default());
        assert_eq!(config.level.as_deref(), Some("warn"));
    }
}
