// USAGE cargo run --release -- --site summit --output-dir /data/mpl "/data/raw/*.mpl.gz"

use anyhow::{bail, Context, Result};
use chrono::Timelike;
use clap::Parser;
use glob::glob;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing_subscriber::EnvFilter;

use mpl_to_netcdf::store::{ArchiveStore, MemoryStore};
use mpl_to_netcdf::{IngestContext, IngestStats, SiteConfig};

// ─────────────────────────────────────────────────────────────────────
// Command line
// ─────────────────────────────────────────────────────────────────────
#[derive(Parser, Debug)]
#[command(name = "mpl_to_netcdf")]
#[command(about = "Append raw MPL lidar records to daily netCDF files", long_about = None)]
struct Args {
    /// Raw MPL files (plain or .gz), processed in order; patterns are expanded with glob
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Built-in site preset (rhubc, summit)
    #[arg(long, default_value = "summit")]
    site: String,

    /// Site configuration file (TOML), overrides --site
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the day-files are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Decode and check everything against an in-memory store, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_site(args: &Args) -> Result<SiteConfig> {
    match &args.config {
        Some(path) => SiteConfig::load(path)
            .with_context(|| format!("loading site configuration {}", path.display())),
        None => Ok(SiteConfig::preset(&args.site)?),
    }
}

/// Existing files are taken as given; anything else is a glob pattern whose
/// matches are added in sorted order.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if Path::new(input).is_file() {
            out.push(PathBuf::from(input));
            continue;
        }
        let mut matches: Vec<_> = glob(input)
            .with_context(|| format!("bad input pattern {input}"))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            bail!("no input file matches {input}");
        }
        matches.sort();
        out.extend(matches);
    }
    Ok(out)
}

fn status_line(file_no: usize, total: usize, path: &Path, stats: &IngestStats) {
    let now = chrono::Local::now();
    println!(
        "[{:02}:{:02}:{:02}]  file {}/{}  {}  ({} records, {} appended, {} skipped so far)",
        now.hour(),
        now.minute(),
        now.second(),
        file_no,
        total,
        path.display(),
        stats.records,
        stats.appended,
        stats.skipped
    );
}

fn run<S: ArchiveStore>(store: S, site: SiteConfig, output_dir: &Path, inputs: &[PathBuf]) -> Result<IngestStats> {
    let mut ctx = IngestContext::new(store, site, output_dir);
    for (i, path) in inputs.iter().enumerate() {
        ctx.ingest_path(path)
            .with_context(|| format!("ingesting {}", path.display()))?;
        status_line(i + 1, inputs.len(), path, &ctx.stats());
    }
    Ok(ctx.finish()?)
}

#[cfg(feature = "netcdf")]
fn run_netcdf(site: SiteConfig, output_dir: &Path, inputs: &[PathBuf]) -> Result<IngestStats> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    run(mpl_to_netcdf::store::NetcdfStore::new(), site, output_dir, inputs)
}

#[cfg(not(feature = "netcdf"))]
fn run_netcdf(_site: SiteConfig, _output_dir: &Path, _inputs: &[PathBuf]) -> Result<IngestStats> {
    bail!("built without the `netcdf` feature; only --dry-run is available")
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let site = load_site(&args)?;
    let inputs = expand_inputs(&args.inputs)?;
    tracing::info!(
        site = %site.name,
        format = site.format.name(),
        files = inputs.len(),
        dry_run = args.dry_run,
        "starting ingest"
    );

    let t0 = Instant::now();
    let stats = if args.dry_run {
        run(MemoryStore::new(), site, &args.output_dir, &inputs)?
    } else {
        run_netcdf(site, &args.output_dir, &inputs)?
    };

    eprintln!(
        "Finished OK in {:?}: {} files, {} records, {} appended, {} skipped, {} truncated, \
         {} day-files created, {} reopened",
        t0.elapsed(),
        stats.files,
        stats.records,
        stats.appended,
        stats.skipped,
        stats.truncated_files,
        stats.day_files_created,
        stats.day_files_opened
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_keep_argument_order_and_sort_globs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mpl", "a.mpl", "c.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let explicit = dir.path().join("c.txt").display().to_string();
        let pattern = dir.path().join("*.mpl").display().to_string();

        let files = expand_inputs(&[explicit, pattern]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["c.txt", "a.mpl", "b.mpl"]);
    }

    #[test]
    fn unmatched_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.mpl").display().to_string();
        assert!(expand_inputs(&[pattern]).is_err());
    }

    #[test]
    fn zero_inputs_is_a_usage_error() {
        assert!(Args::try_parse_from(["mpl_to_netcdf"]).is_err());
        let args = Args::try_parse_from(["mpl_to_netcdf", "--dry-run", "x.mpl"]).unwrap();
        assert_eq!(args.site, "summit");
        assert!(args.dry_run);
    }
}
