//! CLI tool for datscope archive indexing.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use datscope::progress::AtomicProgress;
use datscope::{CacheKey, IndexerConfig};

use commands::GlobalOptions;
use exit_codes::ExitCode;

/// Game archive indexer
#[derive(Parser)]
#[command(name = "datscope")]
#[command(author, version, about = "Index and classify the entries of packed game archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding index cache files
    #[arg(long, env = "DATSCOPE_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Name cache files with a 64-bit path checksum
    #[arg(long, global = true)]
    wide_cache_key: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or update the index of an archive
    Index {
        /// Archive file to index
        archive: PathBuf,

        /// Discard the cached index and scan every entry
        #[arg(long)]
        full: bool,
    },

    /// List indexed entries (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Category path glob, e.g. "Textures/ATEX/*"
        #[arg(short = 'c', long)]
        category: Option<String>,

        /// Declared type or decoder name, e.g. "ATEX" or "image"
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,
    },

    /// Show archive and index information (alias: i)
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },

    /// Classify a single entry
    Show {
        /// Archive file
        archive: PathBuf,

        /// Entry id
        entry: u32,
    },

    /// Print the index cache path of an archive
    CachePath {
        /// Archive file
        archive: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version also arrive here
            let code = if e.use_stderr() {
                exit_codes::BAD_ARGS
            } else {
                exit_codes::SUCCESS
            };
            std::process::exit(code);
        }
    };
    init_logging(cli.verbose);

    // First Ctrl+C stops the scan between entries so the partial index can
    // be saved; a second one exits immediately
    let cancel = AtomicProgress::shared();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_cancel.is_cancelled() {
            eprintln!("\nInterrupted");
            std::process::exit(exit_codes::USER_INTERRUPT);
        }
        eprintln!("\nInterrupted; finishing current entry");
        handler_cancel.cancel();
    })
    .ok();

    let mut config = IndexerConfig::new();
    if let Some(dir) = cli.cache_dir {
        config = config.cache_dir(dir);
    }
    if cli.wide_cache_key {
        config = config.cache_key(CacheKey::Crc64);
    }
    let opts = GlobalOptions {
        config,
        format: cli.format,
        quiet: cli.quiet,
        cancel,
    };

    let exit_code = match cli.command {
        Commands::Index { archive, full } => commands::index(&archive, full, &opts),

        Commands::List {
            archive,
            category,
            file_type,
        } => commands::list(
            &archive,
            category.as_deref(),
            file_type.as_deref(),
            &opts,
        ),

        Commands::Info { archive } => commands::info(&archive, &opts),

        Commands::Show { archive, entry } => commands::show(&archive, entry, &opts),

        Commands::CachePath { archive } => commands::cache_path(&archive, &opts),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
