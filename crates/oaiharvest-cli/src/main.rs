//! oaiharvest - resumable OAI-PMH metadata and record harvester
//!
//! Downloads metadata and records from an OAI-PMH repository into a TSV
//! metadata table and/or a raw-record stream, checkpointing after every
//! committed record so an interrupted harvest resumes where it stopped.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use oaiharvest_core::ProgressContext;
use oaiharvest_pmh::{DEFAULT_ENDPOINT, HarvestConfig, OaiClient};

#[derive(Parser)]
#[command(name = "oaiharvest")]
#[command(about = "Download metadata and records from an OAI-PMH repository")]
#[command(version)]
struct Cli {
    /// Metadata prefix to query (omit to list available prefixes and sets)
    #[arg(short = 'p', long)]
    metadata_prefix: Option<String>,

    /// Set to query
    #[arg(short = 's', long)]
    set: Option<String>,

    /// Status file for recovering an aborted crawl
    #[arg(short = 'f', long)]
    status_file: PathBuf,

    /// OAI-PMH endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Keep XML namespaces in record output (default is to strip them)
    #[arg(long)]
    no_strip_xml: bool,

    /// Output the full record element instead of only its metadata payload
    #[arg(long)]
    full_record: bool,

    /// Output TSV file for metadata (.gz for transparent compression)
    #[arg(short = 'm', long)]
    metadata_output: Option<PathBuf>,

    /// Output file for records, one per line (.gz for compression)
    #[arg(short = 'r', long)]
    record_output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = ProgressContext::new();
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    oaiharvest_core::init_logging(cli.debug, multi);
    oaiharvest_core::install_signal_handlers()?;

    // Help-mode: without a metadata prefix, show what the repository
    // offers and exit without touching any file.
    let Some(metadata_prefix) = cli.metadata_prefix else {
        return print_discovery(&cli.endpoint);
    };

    if cli.metadata_output.is_none() && cli.record_output.is_none() {
        println!("Neither metadata nor record output file defined, crawl would write out nothing.");
        return Ok(());
    }

    let config = HarvestConfig {
        endpoint: cli.endpoint,
        metadata_prefix,
        set: cli.set,
        checkpoint_path: cli.status_file,
        metadata_output: cli.metadata_output,
        record_output: cli.record_output,
        strip_xml: !cli.no_strip_xml,
        full_record: cli.full_record,
    };

    let summary = oaiharvest_pmh::run(&config, &progress)?;
    if summary.aborted {
        log::warn!(
            "run ended early after {} records; rerun with the same status file to resume",
            summary.written
        );
    }
    Ok(())
}

/// Query and print the repository's metadata formats and sets.
fn print_discovery(endpoint: &str) -> Result<()> {
    let client = OaiClient::new(endpoint);

    let formats = client.list_metadata_formats()?;
    println!(
        "Available prefixes (specify with -p or --metadata-prefix): {}",
        formats.join(", ")
    );

    let sets = client.list_sets()?;
    if sets.is_empty() {
        println!("Repository advertises no sets.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Set spec (use with -s)").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
        ]);
    for set in sets {
        table.add_row(vec![set.spec, set.name.unwrap_or_default()]);
    }
    println!("{table}");
    Ok(())
}
