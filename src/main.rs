use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use opus_link::catalog::{load_transliteration_table, Catalog};
use opus_link::composer::TransliterationTable;
use opus_link::linker::Linker;
use opus_link::models::{LinkMatch, LinkStats, QueryRecord};
use opus_link::progress::{create_progress_bar, create_spinner, format_duration, set_log_only};
use opus_link::safety::validate_output_path;

#[derive(Parser)]
#[command(name = "opus-link")]
#[command(about = "Link streaming-catalog track records to a reference catalog of classical compositions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every record of a track CSV against the reference catalog
    Batch {
        /// Reference catalog CSV
        catalog: PathBuf,

        /// Track records CSV (columns: track, artists, duration)
        records: PathBuf,

        /// Composer transliteration table (JSON)
        #[arg(long)]
        transliterations: Option<PathBuf>,

        /// Worker threads for the resolution phase (0 = rayon default)
        #[arg(long, default_value = "0")]
        workers: usize,

        /// Only process the first N records
        #[arg(long)]
        limit: Option<usize>,

        /// Write unresolved records to this log file
        #[arg(long)]
        miss_log: Option<PathBuf>,

        /// Write run statistics to this JSON file
        #[arg(long)]
        stats_out: Option<PathBuf>,

        /// Hide progress bars (tail-friendly output)
        #[arg(long)]
        log_only: bool,
    },
    /// Check whether two track descriptions resolve to the same work
    Compare {
        /// Reference catalog CSV
        catalog: PathBuf,

        /// Composer transliteration table (JSON)
        #[arg(long)]
        transliterations: Option<PathBuf>,

        title_a: String,
        artists_a: String,
        title_b: String,
        artists_b: String,
    },
}

/// Raw row of the track records CSV.
#[derive(Debug, Deserialize)]
struct TrackRow {
    track: String,
    #[serde(alias = "track_artists")]
    artists: String,
    #[serde(default)]
    duration: Option<f64>,
}

/// Applause tracks are crowd noise, not compositions; they are excluded
/// from the batch total rather than counted as misses.
fn is_applause(title: &str) -> bool {
    title.contains("Applause") || title.contains("applause")
}

fn load_linker(catalog_path: &Path, transliterations: Option<&Path>) -> Result<Linker> {
    let spinner = create_spinner("Loading reference catalog");
    let catalog = Catalog::from_csv_path(catalog_path).context("failed to load reference catalog")?;
    let table = match transliterations {
        Some(path) => {
            load_transliteration_table(path).context("failed to load transliteration table")?
        }
        None => TransliterationTable::default(),
    };
    spinner.finish_with_message(format!(
        "Loaded {} compositions by {} composers",
        catalog.len(),
        catalog.composers().len()
    ));
    Ok(Linker::new(catalog, table))
}

fn read_records(path: &Path, limit: Option<usize>) -> Result<Vec<TrackRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open records file {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<TrackRow>() {
        let row = record.context("failed to parse track record")?;
        rows.push(row);
        if limit.is_some_and(|cap| rows.len() >= cap) {
            break;
        }
    }
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
fn run_batch(
    catalog: PathBuf,
    records: PathBuf,
    transliterations: Option<PathBuf>,
    workers: usize,
    limit: Option<usize>,
    miss_log: Option<PathBuf>,
    stats_out: Option<PathBuf>,
) -> Result<()> {
    let mut inputs: Vec<&Path> = vec![&catalog, &records];
    if let Some(path) = &transliterations {
        inputs.push(path);
    }
    if let Some(path) = &miss_log {
        validate_output_path(path, &inputs)?;
    }
    if let Some(path) = &stats_out {
        validate_output_path(path, &inputs)?;
    }

    if workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let start = Instant::now();
    let linker = load_linker(&catalog, transliterations.as_deref())?;

    let rows = read_records(&records, limit)?;
    println!("Read {} track records", rows.len());

    let mut skipped = 0usize;
    let queries: Vec<QueryRecord> = rows
        .iter()
        .filter_map(|row| {
            if is_applause(&row.track) {
                skipped += 1;
                None
            } else {
                Some(QueryRecord::from_track(&row.track, &row.artists, row.duration))
            }
        })
        .collect();

    let pb = create_progress_bar(queries.len() as u64, "Resolving records");
    let outcomes: Vec<(QueryRecord, Option<LinkMatch>)> = queries
        .into_par_iter()
        .map(|query| {
            let outcome = linker.query(&query);
            pb.inc(1);
            (query, outcome)
        })
        .collect();
    pb.finish_with_message("Resolution done");

    let mut stats = LinkStats {
        skipped,
        ..Default::default()
    };
    for (_, outcome) in &outcomes {
        stats.record(outcome.as_ref());
    }
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    if let Some(path) = &miss_log {
        let file = File::create(path)
            .with_context(|| format!("failed to create miss log {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for (record, outcome) in &outcomes {
            if outcome.is_none() {
                writeln!(writer, "not found: {}: {}", record.composer, record.title)?;
            }
        }
        writer.flush()?;
    }

    println!("\n{:=<60}", "");
    println!("Batch resolution complete");
    println!(
        "  Matched: {} / {} ({:.1}%)",
        stats.matched,
        stats.total_records,
        stats.match_rate()
    );
    println!("  Via catalogue number: {}", stats.via_catalogue_number);
    println!("  Via work number:      {}", stats.via_work_number);
    println!("  Via similarity:       {}", stats.via_similarity);
    println!("  Skipped (applause):   {}", stats.skipped);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    if let Some(path) = &stats_out {
        stats.write_to_file(path)?;
        println!("Stats written to {}", path.display());
    }

    Ok(())
}

fn run_compare(
    catalog: PathBuf,
    transliterations: Option<PathBuf>,
    title_a: String,
    artists_a: String,
    title_b: String,
    artists_b: String,
) -> Result<()> {
    let linker = load_linker(&catalog, transliterations.as_deref())?;
    let a = QueryRecord::from_track(&title_a, &artists_a, None);
    let b = QueryRecord::from_track(&title_b, &artists_b, None);

    for (tag, record) in [("A", &a), ("B", &b)] {
        match linker.query(record) {
            Some(m) => println!(
                "{}: {}: {}: {}",
                tag, m.composer, m.composition_title, m.movement_name
            ),
            None => println!("{}: not found", tag),
        }
    }
    println!("same work: {}", linker.same_work(&a, &b));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Batch {
            catalog,
            records,
            transliterations,
            workers,
            limit,
            miss_log,
            stats_out,
            log_only,
        } => {
            set_log_only(log_only);
            run_batch(
                catalog,
                records,
                transliterations,
                workers,
                limit,
                miss_log,
                stats_out,
            )
        }
        Command::Compare {
            catalog,
            transliterations,
            title_a,
            artists_a,
            title_b,
            artists_b,
        } => run_compare(
            catalog,
            transliterations,
            title_a,
            artists_a,
            title_b,
            artists_b,
        ),
    }
}
