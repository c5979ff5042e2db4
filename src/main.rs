use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use keysweep::oracle::des::{self, DesOracle};
use keysweep::search::config::{DEFAULT_CHECK_INTERVAL, DEFAULT_CHUNK_SIZE, DEFAULT_UPPER};
use keysweep::search::{SearchConfig, SearchError, Strategy, run_search};

/// Exit status for malformed configuration, distinct from runtime failures.
const EXIT_CONFIG: i32 = 2;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "keysweep")]
#[command(about = "keysweep - distributed key-space search")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// CLI partition strategy selection
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliStrategy {
    /// Contiguous block per worker, direct-notify termination
    #[default]
    Block,
    /// Strided interleave, collective-reduction termination
    Interleaved,
    /// Dispatcher-leased chunks, broadcast termination
    Dynamic,
}

impl From<CliStrategy> for Strategy {
    fn from(cli: CliStrategy) -> Self {
        match cli {
            CliStrategy::Block => Strategy::Block,
            CliStrategy::Interleaved => Strategy::Interleaved,
            CliStrategy::Dynamic => Strategy::Dynamic,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search the key space for the key that decrypts the ciphertext
    Search {
        /// Ciphertext file (the embedded sample is used when omitted)
        #[arg(long)]
        cipher: Option<PathBuf>,
        /// Exclusive upper bound of the key space
        #[arg(long, value_parser = parse_number, default_value_t = DEFAULT_UPPER)]
        upper: u64,
        /// Partition strategy
        #[arg(long, value_enum, default_value = "block")]
        strategy: CliStrategy,
        /// Number of worker threads (defaults to the number of CPUs)
        #[arg(long, short = 'j')]
        workers: Option<usize>,
        /// Oracle calls between termination checks
        #[arg(long, default_value_t = DEFAULT_CHECK_INTERVAL)]
        check_interval: u64,
        /// Chunk size for dynamic dispatch
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
        /// Plaintext pattern the oracle searches for
        #[arg(long, default_value = " the ")]
        pattern: String,
        /// Wall-clock budget in seconds (unbounded when omitted)
        #[arg(long)]
        deadline: Option<f64>,
        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,
    },
    /// Encrypt a plaintext file into a test ciphertext
    Encrypt {
        /// 56-bit key, decimal or 0x-prefixed hex
        #[arg(long, short, value_parser = parse_number)]
        key: u64,
        /// Plaintext input file
        #[arg(long, short)]
        input: PathBuf,
        /// Ciphertext output file
        #[arg(long, short)]
        output: PathBuf,
    },
}

/// Parse a decimal or 0x-prefixed hexadecimal u64.
fn parse_number(s: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|_| format!("invalid number: '{}'", s))
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// --- Subcommands ---

#[allow(clippy::too_many_arguments)]
fn run_search_command(
    cipher: Option<PathBuf>,
    upper: u64,
    strategy: Strategy,
    workers: Option<usize>,
    check_interval: u64,
    chunk_size: u64,
    pattern: String,
    deadline: Option<f64>,
) {
    let ciphertext = match &cipher {
        Some(path) => match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => des::EMBEDDED_CIPHERTEXT.to_vec(),
    };

    let oracle = match DesOracle::new(ciphertext, pattern.as_bytes()) {
        Ok(oracle) => oracle,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let mut config = SearchConfig::default()
        .with_upper(upper)
        .with_strategy(strategy)
        .with_check_interval(check_interval)
        .with_chunk_size(chunk_size)
        .with_deadline_option(deadline.map(Duration::from_secs_f64));
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }

    match run_search(&config, &oracle) {
        Ok(outcome) => {
            let text = outcome.key.map(|key| {
                String::from_utf8_lossy(&oracle.preview(key)).into_owned()
            });
            println!("{}", outcome.report_line(text.as_deref()));
        }
        Err(SearchError::Config(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_encrypt_command(key: u64, input: &PathBuf, output: &PathBuf) {
    let plaintext = match fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", input.display(), e);
            std::process::exit(1);
        }
    };

    let ciphertext = des::encrypt(key, &plaintext);

    if let Err(e) = fs::write(output, &ciphertext) {
        eprintln!("Error writing {}: {}", output.display(), e);
        std::process::exit(1);
    }
    eprintln!(
        "wrote {} ciphertext bytes to {} (key={})",
        ciphertext.len(),
        output.display(),
        key
    );
}

// --- Main Function ---

fn main() {
    let args = Args::parse();

    match args.command {
        Commands::Search {
            cipher,
            upper,
            strategy,
            workers,
            check_interval,
            chunk_size,
            pattern,
            deadline,
            verbose,
        } => {
            init_tracing(verbose);
            run_search_command(
                cipher,
                upper,
                strategy.into(),
                workers,
                check_interval,
                chunk_size,
                pattern,
                deadline,
            );
        }
        Commands::Encrypt { key, input, output } => {
            run_encrypt_command(key, &input, &output);
        }
    }
}
