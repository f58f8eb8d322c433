//! Command-line parsing for the `burrow` driver.

use burrow_core::model::parse_size;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive one background filesystem operation and print every polled batch
/// as a JSON line.
#[derive(Debug, Parser)]
#[command(name = "burrow", version, about)]
pub struct Cli {
    /// JSON engine configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List direct children of a directory.
    Ls { dir: PathBuf },
    /// Recursive search by glob, literal or `/regex/flags`.
    Find { dir: PathBuf, query: String },
    /// Recursive byte count.
    Size { path: PathBuf },
    /// Describe one path.
    Info { path: PathBuf },
    /// Delete or recycle paths.
    Delete {
        /// Remove permanently instead of moving to the trash.
        #[arg(long)]
        permanent: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Write `count` files of `size` bytes into `dir`.
    Seed {
        dir: PathBuf,
        count: u64,
        /// Bytes per file, e.g. `512b`, `4kb`, `1mb`.
        #[arg(default_value = "1mb", value_parser = seed_size)]
        size: u64,
    },
}

fn seed_size(text: &str) -> Result<u64, String> {
    parse_size(text).ok_or_else(|| format!("invalid size {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("burrow").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_before_command() {
        let cli = parse(&["--verbose", "--config", "burrow.json", "ls", "/tmp"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("burrow.json")));
        assert_eq!(cli.command, Command::Ls { dir: "/tmp".into() });
    }

    #[test]
    fn global_flags_after_command() {
        let cli = parse(&["size", "/tmp", "-v", "--config", "c.json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn find_takes_dir_and_query() {
        let cli = parse(&["find", ".", "/foo.*\\.py/i"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Find {
                dir: ".".into(),
                query: "/foo.*\\.py/i".into()
            }
        );
    }

    #[test]
    fn delete_permanent_flag_anywhere() {
        let cli = parse(&["delete", "a", "--permanent", "b"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Delete {
                paths: vec!["a".into(), "b".into()],
                permanent: true
            }
        );
        assert!(parse(&["delete", "--permanent"]).is_err());
    }

    #[test]
    fn seed_sizes() {
        let cli = parse(&["seed", "out", "10"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Seed {
                dir: "out".into(),
                count: 10,
                size: 1024 * 1024
            }
        );
        let cli = parse(&["seed", "out", "3", "4kb"]).unwrap();
        assert!(matches!(cli.command, Command::Seed { size: 4096, .. }));
        assert!(parse(&["seed", "out", "3", "lots"]).is_err());
        assert!(parse(&["seed", "out", "many"]).is_err());
    }

    #[test]
    fn bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["ls"]).is_err());
        assert!(parse(&["frobnicate", "x"]).is_err());
    }
}
