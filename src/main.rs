use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use swhid::{PermissionTable, Swhid, SwhidComputer};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "swhid", version)]
#[command(about = "Compute and parse Software Heritage identifiers (SWHID)")]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct LogArgs {
    /// Increase logging verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    ///
    /// `RUST_LOG` takes precedence over this flag.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Identify bytes read from FILE, or standard input
    Content {
        file: Option<PathBuf>,
    },

    /// Parse an identifier and print it in canonical form
    Parse {
        swhid: String,

        /// Print the parsed fields as JSON
        #[arg(long)]
        json: bool,
    },

    /// Identify a directory on disk
    Directory {
        path: PathBuf,

        /// JSON object mapping relative paths to octal modes
        #[arg(long, value_name = "FILE")]
        permissions: Option<PathBuf>,

        /// Ignore the git index when deciding executable bits
        #[arg(long)]
        no_git_index: bool,

        /// Skip directories with this exact name
        #[arg(short, long, value_name = "NAME")]
        exclude: Vec<String>,

        /// Print every object in the tree, not only the root
        #[arg(short, long)]
        recursive: bool,
    },

    /// Identify the directory stored in a tar or zip archive
    Archive {
        path: PathBuf,
    },

    /// Identify a commit of a git repository
    Revision {
        repo: PathBuf,

        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Identify an annotated tag of a git repository
    Release {
        repo: PathBuf,
        tag: String,
    },

    /// Identify the references of a git repository
    Snapshot {
        repo: PathBuf,
    },

    /// Check that PATH has the given identifier; qualifiers are ignored
    Verify {
        path: PathBuf,
        swhid: String,
    },
}

#[derive(Serialize)]
struct ParsedSwhid<'a> {
    scheme: &'static str,
    version: u32,
    object_type: &'static str,
    object_hash: String,
    qualifiers: BTreeMap<&'a str, &'a str>,
}

impl<'a> From<&'a Swhid> for ParsedSwhid<'a> {
    fn from(swhid: &'a Swhid) -> Self {
        Self {
            scheme: swhid.namespace(),
            version: swhid.scheme_version(),
            object_type: swhid.object_type().as_str(),
            object_hash: swhid.object_hash().to_hex(),
            qualifiers: swhid.qualifiers().iter().collect(),
        }
    }
}

fn log_level(args: LogArgs) -> LevelFilter {
    if args.quiet {
        return LevelFilter::ERROR;
    }

    if let Ok(rust_log) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if let Ok(level) = LevelFilter::from_str(&rust_log) {
            return level;
        }
    }

    match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_logging(args: LogArgs) {
    let env_filter = EnvFilter::from_default_env().add_directive(log_level(args).into());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .with(env_filter)
        .init();
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Content { file } => {
            let computer = SwhidComputer::new();
            let swhid = match file {
                Some(path) => computer
                    .compute_file_swhid(&path)
                    .with_context(|| format!("failed to hash {}", path.display()))?,
                None => computer
                    .compute_reader_swhid(io::stdin().lock())
                    .context("failed to hash standard input")?,
            };
            println!("{}", swhid);
        }
        Command::Parse { swhid: text, json } => {
            let parsed = swhid::parse(&text).with_context(|| format!("invalid SWHID {:?}", text))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ParsedSwhid::from(&parsed))?);
            } else {
                println!("{}", parsed);
            }
        }
        Command::Directory {
            path,
            permissions,
            no_git_index,
            exclude,
            recursive,
        } => {
            let permissions = permissions
                .map(|file| {
                    PermissionTable::from_json_file(&file, &path)
                        .with_context(|| format!("failed to load {}", file.display()))
                })
                .transpose()?;
            let computer = SwhidComputer::new()
                .with_exclude_patterns(&exclude)
                .with_permissions(permissions)
                .with_git_index(!no_git_index);

            if recursive {
                for (object_path, swhid) in computer.walk_directory(&path)? {
                    println!("{}\t{}", swhid, object_path.display());
                }
            } else {
                let swhid = computer
                    .compute_directory_swhid(&path)
                    .with_context(|| format!("failed to hash {}", path.display()))?;
                println!("{}", swhid);
            }
        }
        Command::Archive { path } => {
            let swhid = SwhidComputer::new()
                .compute_archive_directory_swhid(&path)
                .with_context(|| format!("failed to hash archive {}", path.display()))?;
            println!("{}", swhid);
        }
        Command::Revision { repo, rev } => {
            let swhid = SwhidComputer::new()
                .compute_revision_swhid(&repo, &rev)
                .with_context(|| format!("failed to hash {} in {}", rev, repo.display()))?;
            println!("{}", swhid);
        }
        Command::Release { repo, tag } => {
            let swhid = SwhidComputer::new()
                .compute_release_swhid(&repo, &tag)
                .with_context(|| format!("failed to hash tag {} in {}", tag, repo.display()))?;
            println!("{}", swhid);
        }
        Command::Snapshot { repo } => {
            let swhid = SwhidComputer::new()
                .compute_snapshot_swhid(&repo)
                .with_context(|| format!("failed to hash {}", repo.display()))?;
            println!("{}", swhid);
        }
        Command::Verify { path, swhid: expected } => return verify(&path, &expected),
    }
    Ok(ExitCode::SUCCESS)
}

fn verify(path: &Path, expected: &str) -> Result<ExitCode> {
    let computer = SwhidComputer::new();
    if computer.verify_swhid(path, expected)? {
        println!("OK {}", path.display());
        Ok(ExitCode::SUCCESS)
    } else {
        let actual = computer.compute_swhid(path)?;
        println!("MISMATCH {}: expected {}, computed {}", path.display(), expected, actual);
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(fatal = true, "{:#}", e);
            ExitCode::FAILURE
        }
    }
}
