//! ifcprune CLI - filter an IFC file down to selected element types.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ifcprune::{filter, step, FilterConfig, FilterOptions, Strategy};

#[derive(Parser)]
#[command(name = "ifcprune")]
#[command(about = "Prune an IFC model down to selected element types", long_about = None)]
struct Cli {
    /// Input IFC file
    input: PathBuf,

    /// Output IFC file
    output: PathBuf,

    /// Entity types to keep (comma-separated, e.g. IfcWall,IfcDoor).
    /// The structural skeleton is always kept.
    #[arg(short, long, value_delimiter = ',')]
    types: Vec<String>,

    /// Rewrite strategy: subtractive or constructive
    #[arg(short, long, default_value = "subtractive")]
    strategy: Strategy,

    /// Path to a TOML config file (skeleton types, subtype policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FilterConfig::load(path),
        None => FilterConfig::default(),
    };

    let graph = step::load(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    info!(entities = graph.len(), "model loaded");

    let options = FilterOptions {
        types: cli.types.clone(),
        strategy: cli.strategy,
        config,
        progress: None,
    };
    let (pruned, report) = filter::run(graph, &options)?;

    step::write(&pruned, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("kept:        {}", report.kept);
        println!("removed:     {}", report.removed);
        if report.failed > 0 {
            println!("failed:      {} (skipped, see log)", report.failed);
        }
        println!(
            "relations:   {} trimmed, {} dropped, {} synthesized",
            report.relations_trimmed, report.relations_dropped, report.relations_synthesized
        );
        if report.uncontained > 0 {
            println!("uncontained: {}", report.uncontained);
        }
        for ty in &report.unmatched_types {
            println!("warning: type {ty} matched no entities");
        }
        println!("done in {} ms", report.elapsed_ms);
    }
    Ok(())
}
