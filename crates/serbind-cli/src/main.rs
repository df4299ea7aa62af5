//! # serbind
//!
//! Command-line front end for declarative record mappings.
//!
//! Loads schema documents, compiles a target schema into its binding set
//! and either prints the compiled plan or maps JSON source records.

mod config;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serbind_ir::{Record, Value};
use serbind_mapping::{BindingSet, FieldFilter};
use serbind_schema::{SchemaLoader, SchemaRegistry};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "serbind")]
#[command(about = "Declarative record mapping CLI")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema document or directory, may be repeated
    #[arg(short, long = "schema")]
    schemas: Vec<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled binding plan of a target schema as JSON
    Plan {
        /// Target schema name
        target: String,

        /// Default field filter, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Map JSON source records through a target schema
    Map {
        /// Target schema name
        target: String,

        /// JSON file holding one source object or an array of them
        input: PathBuf,

        /// Only produce these target fields, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Produce target instances instead of ordered field mappings
        #[arg(long)]
        instance: bool,

        /// Output file path, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_schema_paths(cli.schemas.iter().cloned());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .init();

    let registry = load_registry(&config)?;

    match cli.command {
        Commands::Plan { target, fields } => {
            let bindings = BindingSet::compile(&registry, &target, FieldFilter::from(fields))?;
            println!("{}", serde_json::to_string_pretty(&bindings.describe())?);
        }
        Commands::Map {
            target,
            input,
            fields,
            instance,
            output,
        } => {
            let bindings = BindingSet::compile(&registry, &target, FieldFilter::all())?;
            let filter = FieldFilter::from(fields);
            let (sources, many) = read_sources(&registry, bindings.source(), &input)?;
            info!(target_schema = %target, records = sources.len(), "Mapping records");

            let mut mapped = sources
                .iter()
                .map(|source| map_one(&bindings, source, &filter, instance))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let document = if many {
                serde_json::Value::Array(mapped)
            } else {
                mapped.pop().unwrap_or_default()
            };
            write_output(output.as_deref(), &serde_json::to_string_pretty(&document)?)?;
        }
    }

    Ok(())
}

fn load_registry(config: &Config) -> anyhow::Result<SchemaRegistry> {
    if config.schema_paths.is_empty() {
        bail!("no schema documents given; pass --schema or set schema_paths in the config file");
    }
    let loader = SchemaLoader::new(config.schema_paths.clone());
    let registry = loader.load_registry().context("failed to load schema documents")?;
    debug!(schemas = registry.len(), "Loaded schema registry");
    Ok(registry)
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Source records of `schema` and whether the input held an array of them.
/// JSON `null` entries stay absent.
fn read_sources(
    registry: &SchemaRegistry,
    schema: &str,
    path: &Path,
) -> anyhow::Result<(Vec<Value>, bool)> {
    let (items, many) = match read_json(path)? {
        serde_json::Value::Array(items) => (items, true),
        other => (vec![other], false),
    };
    let sources = items
        .iter()
        .map(|item| match item {
            serde_json::Value::Null => Ok(Value::Null),
            _ => registry
                .record_from_json(schema, item)
                .map(Value::Record)
                .with_context(|| format!("input is not a valid '{schema}' record")),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((sources, many))
}

fn map_one(
    bindings: &BindingSet<'_>,
    source: &Value,
    filter: &FieldFilter,
    instance: bool,
) -> anyhow::Result<serde_json::Value> {
    if instance {
        let target: Option<Record> = bindings.serialize_to_instance(source, filter)?;
        Ok(target.map_or(serde_json::Value::Null, |record| Value::Record(record).to_json()))
    } else {
        Ok(Value::Map(bindings.serialize_to_mapping(source, filter)?).to_json())
    }
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{content}\n"))
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
