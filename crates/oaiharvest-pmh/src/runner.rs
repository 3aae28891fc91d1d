//! Harvest driver: the resumable fetch-and-emit loop.
//!
//! Drives one `ListRecords` listing to completion with per-record
//! durability: for every record, sink bytes are flushed and fsynced first,
//! then the checkpoint advances. The checkpoint write is the commit point;
//! a record is "done" only once its checkpoint update is on disk, so a kill
//! at any moment leaves disk state a later run can resume from.

use std::path::Path;
use std::time::{Duration, Instant};

use oaiharvest_core::{ProgressContext, Sink, is_shutdown_requested, open_sink};

use crate::checkpoint::CheckpointStore;
use crate::client::OaiClient;
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::parser::OaiRecord;
use crate::token::ResumptionToken;
use crate::xml::strip_namespaces;

/// Header row of the metadata table
const METADATA_HEADER: &str = "id\ttimestamp\tid2\tcreator\ttitle\tsubjects";

/// Harvest run summary
#[derive(Debug)]
pub struct Summary {
    /// Records committed during this run
    pub written: u64,
    /// Transport or protocol failure stopped the run; checkpoint kept
    pub aborted: bool,
    /// Shutdown signal stopped the run; checkpoint kept
    pub interrupted: bool,
    pub elapsed: Duration,
}

enum Outcome {
    Completed,
    Interrupted,
}

/// Run one harvest to completion, resuming from the checkpoint when one
/// exists.
///
/// Transport and protocol failures abort gracefully: they are logged, the
/// checkpoint stays on disk for a retry, and the summary reports the
/// abort. Configuration, corrupt-checkpoint and local I/O failures are
/// returned as errors.
pub fn run(config: &HarvestConfig, progress: &ProgressContext) -> Result<Summary, HarvestError> {
    config.validate()?;
    let start = Instant::now();

    let client = OaiClient::new(&config.endpoint);
    let mut checkpoint = CheckpointStore::open(&config.checkpoint_path)?;
    // A corrupt checkpoint is a hard error here: restarting from zero
    // behind the operator's back is worse than stopping.
    let saved = checkpoint.load()?;

    if let Some(path) = &config.metadata_output {
        ensure_metadata_header(path)?;
    }
    let mut meta_sink = open_optional(config.metadata_output.as_deref())?;
    let mut record_sink = open_optional(config.record_output.as_deref())?;

    let mut written = 0u64;
    let result = stream(
        &client,
        config,
        &mut checkpoint,
        &mut meta_sink,
        &mut record_sink,
        saved,
        progress,
        &mut written,
    );

    // Close sinks on every exit path, aborts included
    if let Some(sink) = meta_sink.take() {
        sink.finish()?;
    }
    if let Some(sink) = record_sink.take() {
        sink.finish()?;
    }

    let mut aborted = false;
    let mut interrupted = false;
    match result {
        Ok(Outcome::Completed) => {
            checkpoint.clear()?;
            log::info!("harvest complete, checkpoint cleared");
        }
        Ok(Outcome::Interrupted) => {
            interrupted = true;
            log::info!(
                "shutdown requested, checkpoint kept at {}",
                checkpoint.path().display()
            );
        }
        Err(e) if e.is_abort() => {
            aborted = true;
            log::error!(
                "harvest aborted: {e}; checkpoint kept at {} for resume",
                checkpoint.path().display()
            );
        }
        Err(e) => return Err(e),
    }

    let summary = Summary {
        written,
        aborted,
        interrupted,
        elapsed: start.elapsed(),
    };
    log::info!(
        "{} records in {:.1}s",
        summary.written,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

/// The STREAMING state: page loop with per-record commit.
#[allow(clippy::too_many_arguments)]
fn stream(
    client: &OaiClient,
    config: &HarvestConfig,
    checkpoint: &mut CheckpointStore,
    meta_sink: &mut Option<Box<dyn Sink>>,
    record_sink: &mut Option<Box<dyn Sink>>,
    saved: Option<ResumptionToken>,
    progress: &ProgressContext,
    written: &mut u64,
) -> Result<Outcome, HarvestError> {
    let mut page = client.list_records(&config.metadata_prefix, config.set.as_deref())?;
    let mut cursor = 0u64;

    if let Some(saved) = saved {
        if let Some(fresh) = &page.token {
            if fresh.complete_list_size != saved.complete_list_size {
                log::warn!(
                    "total records changed since earlier run ({} != {})",
                    display_size(saved.complete_list_size),
                    display_size(fresh.complete_list_size),
                );
            }
        }
        // Trust the stored token over the freshly negotiated page: discard
        // the initial page and reposition the listing.
        match saved.token.as_deref() {
            Some(text) => {
                cursor = saved.cursor.unwrap_or(0);
                log::info!("resuming harvest from cursor {cursor}");
                page = client.resume(text)?;
            }
            None => log::warn!("checkpoint has no token text, starting from the beginning"),
        }
    }

    let total = page
        .token
        .as_ref()
        .and_then(|t| t.complete_list_size)
        .or_else(|| Some(cursor + page.records.len() as u64));
    let bar = progress.record_bar(cursor, total);

    loop {
        let next = page.token.clone();
        for record in &page.records {
            if is_shutdown_requested() {
                return Ok(Outcome::Interrupted);
            }
            if let Some(sink) = meta_sink.as_deref_mut() {
                let row = metadata_row(record);
                sink.append(row.as_bytes())?;
                sink.append(b"\n")?;
                sink.commit()?;
            }
            if let Some(sink) = record_sink.as_deref_mut() {
                if let Some(payload) = record_payload(record, config)? {
                    sink.append(payload.as_bytes())?;
                    sink.append(b"\n")?;
                    sink.commit()?;
                }
            }
            // Commit point: the record counts only once this returns
            checkpoint.save(next.as_ref())?;
            *written += 1;
            bar.inc(1);
        }
        match next.and_then(|t| t.token) {
            Some(text) => page = client.resume(&text)?,
            None => break,
        }
    }
    bar.finish_and_clear();
    Ok(Outcome::Completed)
}

fn display_size(size: Option<u64>) -> String {
    size.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string())
}

fn open_optional(path: Option<&Path>) -> Result<Option<Box<dyn Sink>>, HarvestError> {
    path.map(open_sink).transpose().map_err(HarvestError::Io)
}

/// Write the TSV header if the metadata table does not exist yet.
fn ensure_metadata_header(path: &Path) -> Result<(), HarvestError> {
    if path.exists() {
        return Ok(());
    }
    let mut sink = open_sink(path)?;
    sink.append(METADATA_HEADER.as_bytes())?;
    sink.append(b"\n")?;
    sink.finish()?;
    Ok(())
}

/// Join a multi-valued field with `|`, dropping absent entries but keeping
/// the order of the rest.
fn join_values(values: &[Option<String>]) -> String {
    values
        .iter()
        .flatten()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// TSV cells must stay on one line
fn clean_cell(value: &str) -> String {
    if value.contains(['\t', '\n', '\r']) {
        value.replace(['\t', '\n', '\r'], " ")
    } else {
        value.to_string()
    }
}

/// Build one metadata table row for a record.
fn metadata_row(record: &OaiRecord) -> String {
    [
        clean_cell(&record.identifier),
        clean_cell(&record.datestamp),
        clean_cell(&join_values(&record.fields.identifiers)),
        clean_cell(&join_values(&record.fields.creators)),
        clean_cell(&join_values(&record.fields.titles)),
        clean_cell(&join_values(&record.fields.subjects)),
    ]
    .join("\t")
}

/// Build the record stream payload: the metadata fragment, or the full
/// `<record>` element with `full_record`. Deleted records carry no
/// fragment, so metadata-only mode skips them.
fn record_payload(
    record: &OaiRecord,
    config: &HarvestConfig,
) -> Result<Option<String>, HarvestError> {
    let source = if config.full_record {
        Some(record.raw.as_str())
    } else {
        record.metadata.as_deref()
    };
    let Some(xml) = source else {
        return Ok(None);
    };
    if config.strip_xml {
        strip_namespaces(xml).map(Some)
    } else {
        Ok(Some(xml.to_string()))
    }
}
