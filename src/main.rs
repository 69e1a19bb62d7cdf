//! TLS random subsystem CLI
//!
//! Command-line interface for drawing from the generators and inspecting
//! their state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tls_random::metrics::{MetricsRegistry, MetricsSnapshot};
use tls_random::FileConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Draw secure random data from the TLS random subsystem.
#[derive(Parser)]
#[command(name = "tls-random")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bytes from the public DRBG.
    Public {
        /// Number of bytes.
        #[arg(short, long, default_value_t = 32)]
        len: usize,
    },
    /// Bytes from the private DRBG.
    Private {
        /// Number of bytes.
        #[arg(short, long, default_value_t = 32)]
        len: usize,
    },
    /// Bytes straight from the OS entropy source.
    Urandom {
        /// Number of bytes.
        #[arg(short, long, default_value_t = 32)]
        len: usize,
    },
    /// Bytes straight from RDRAND.
    Rdrand {
        /// Number of bytes.
        #[arg(short, long, default_value_t = 32)]
        len: usize,
    },
    /// Unbiased integers in [0, max).
    Range {
        /// Exclusive upper bound.
        #[arg(short, long)]
        max: i64,
        /// How many integers to print.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Prometheus metrics for this process's generators.
    Metrics,
}

fn main() {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(2);
            }
        },
        None => FileConfig::default(),
    };

    // RUST_LOG overrides the configured filter.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&file_config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("TLS random v{}", tls_random::VERSION);

    if let Err(e) = tls_random::init_with_config(file_config.random) {
        error!("Initialization failed: {}", e);
        std::process::exit(1);
    }

    let result = run(cli.command);

    if let Err(e) = tls_random::cleanup_thread().and_then(|()| tls_random::cleanup()) {
        error!("Cleanup failed: {}", e);
    }
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Public { len } => print_bytes(len, tls_random::get_public_random_data),
        Commands::Private { len } => print_bytes(len, tls_random::get_private_random_data),
        Commands::Urandom { len } => print_bytes(len, tls_random::get_urandom_data),
        Commands::Rdrand { len } => {
            if !tls_random::cpu_supports_rdrand() {
                return Err("this CPU does not support RDRAND".into());
            }
            print_bytes(len, tls_random::get_rdrand_data)
        }
        Commands::Range { max, count } => {
            for _ in 0..count {
                println!("{}", tls_random::public_random(max)?);
            }
            Ok(())
        }
        Commands::Metrics => {
            let registry = MetricsRegistry::new()?;
            registry.update(&MetricsSnapshot::capture()?);
            print!("{}", registry.encode()?);
            Ok(())
        }
    }
}

fn print_bytes<F>(len: usize, fill: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut [u8]) -> tls_random::Result<()>,
{
    let mut output = zeroize::Zeroizing::new(vec![0u8; len]);
    fill(&mut output[..])?;

    println!(
        "{}",
        output
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    );
    Ok(())
}
