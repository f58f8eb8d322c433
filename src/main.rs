//! Burrow: background filesystem operation engine.
//!
//! Thin command-line driver. All logic lives in the `burrow-core` crate;
//! this binary starts one operation, polls it on a fixed tick and prints
//! every polled batch as one JSON line on stdout.

mod cli;

use anyhow::Context;
use burrow_core::model::format_size;
use burrow_core::ops::Progress;
use burrow_core::{Engine, EngineConfig};
use clap::Parser;
use cli::{Cli, Command};
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// One UI frame at 60 Hz.
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Writer threads used by `seed`.
const SEED_WORKERS: usize = 16;

/// Bytes written per `write_all` while seeding.
const SEED_BLOCK: usize = 10 * 1024;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Burrow starting");

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let engine = Engine::new(config).context("starting engine")?;
    tracing::debug!("Engine config: {:?}", engine.config());
    run(&engine, cli.command)?;
    engine.shutdown();
    Ok(())
}

fn run(engine: &Engine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ls { dir } => {
            engine.start_ls(&dir)?;
            pump(|| engine.ls(&dir))?;
        }
        Command::Find { dir, query } => {
            engine.start_find(&dir, &query)?;
            pump(|| engine.stream_find(&dir, Some(&query)))?;
        }
        Command::Size { path } => {
            engine.start_folder_size(&path)?;
            if let Some(last) = pump(|| engine.stream_folder_size(&path))? {
                tracing::info!("{}: {}", path.display(), format_size(last.size));
            }
        }
        Command::Info { path } => {
            let entry = engine
                .path_info(&path)
                .with_context(|| format!("{} does not exist", path.display()))?;
            println!("{}", serde_json::to_string(&entry)?);
        }
        Command::Delete { paths, permanent } => {
            let id = format!("cli-{}", std::process::id());
            let trash = if permanent { Some(false) } else { None };
            engine.start_delete(&id, paths, trash)?;
            if let Some(last) = pump(|| engine.stream_delete(&id))? {
                if last.failed > 0 {
                    anyhow::bail!("{} of {} entries could not be removed", last.failed, last.total);
                }
            }
        }
        Command::Seed { dir, count, size } => seed(&dir, count, size)?,
    }
    Ok(())
}

/// Poll on a fixed tick, printing each batch, until the operation reports
/// its end. Returns the final batch.
fn pump<P: Progress>(mut poll: impl FnMut() -> Option<P>) -> anyhow::Result<Option<P>> {
    let ticker = crossbeam_channel::tick(POLL_INTERVAL);
    let stdout = std::io::stdout();
    loop {
        ticker.recv()?;
        let Some(progress) = poll() else {
            return Ok(None);
        };
        writeln!(stdout.lock(), "{}", serde_json::to_string(&progress)?)?;
        if progress.is_end() {
            return Ok(Some(progress));
        }
    }
}

/// Write `count` files of `size` bytes into `dir` on a fixed pool.
fn seed(dir: &Path, count: u64, size: u64) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(SEED_WORKERS)
        .thread_name(|i| format!("burrow-seed-{i}"))
        .build()?;

    let start = std::time::Instant::now();
    pool.install(|| {
        (0..count).into_par_iter().try_for_each(|i| {
            let path = dir.join(i.to_string());
            write_filler(&path, size).with_context(|| format!("writing {}", path.display()))
        })
    })?;

    tracing::info!(
        "Seeded {count} files of {} into {} in {:?}",
        format_size(size),
        dir.display(),
        start.elapsed()
    );
    Ok(())
}

fn write_filler(path: &Path, size: u64) -> std::io::Result<()> {
    let block = [b'a'; SEED_BLOCK];
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut left = size;
    while left > 0 {
        let n = left.min(SEED_BLOCK as u64) as usize;
        file.write_all(&block[..n])?;
        left -= n as u64;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn seed_writes_exact_sizes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("seed");
        seed(&dir, 5, 25_000).unwrap();

        for i in 0..5 {
            let meta = std::fs::metadata(dir.join(i.to_string())).unwrap();
            assert_eq!(meta.len(), 25_000);
        }
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 5);
    }

    #[test]
    fn zero_sized_seed_creates_empty_files() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), 2, 0).unwrap();
        assert_eq!(std::fs::metadata(tmp.path().join("1")).unwrap().len(), 0);
    }
}
