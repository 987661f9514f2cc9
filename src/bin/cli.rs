//! memtext CLI Client
//!
//! Command-line interface for a Memcached daemon.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use memtext::{Client, Config, MemcacheError, Outcome, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// memtext CLI
#[derive(Parser, Debug)]
#[command(name = "memtext-cli")]
#[command(about = "CLI for a Memcached daemon (text protocol)")]
#[command(version)]
struct Args {
    /// Daemon host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Daemon port
    #[arg(short, long, default_value_t = memtext::config::DEFAULT_PORT)]
    port: u16,

    /// Connect timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// How to type the value
        #[arg(short, long, value_enum, default_value = "string")]
        kind: Kind,

        /// Expiration in seconds (0 = never)
        #[arg(short, long, default_value = "0")]
        exptime: u32,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,

        /// Print flags, length and CAS as well
        #[arg(short, long)]
        meta: bool,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    String,
    Int,
    Float,
    Bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,memtext=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder().host(&args.host).port(args.port);
    if let Some(ms) = args.timeout_ms {
        builder = builder.connect_timeout(Duration::from_millis(ms));
    }
    let mut client = Client::new(builder.build());

    match run(&mut client, args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Run one command; `Ok(false)` means a negative outcome
fn run(client: &mut Client, command: Commands) -> Result<bool, MemcacheError> {
    match command {
        Commands::Set {
            key,
            value,
            kind,
            exptime,
        } => {
            let value = parse_value(&value, kind)?;
            let outcome = client.set(&key, value, exptime)?;
            println!("{}", outcome.code());
            Ok(outcome.is_success())
        }
        Commands::Get { key, meta: false } => match client.get(&key)? {
            Outcome::Success(value) => {
                println!("{}", value);
                Ok(true)
            }
            Outcome::Negative(code) => {
                println!("{}", code);
                Ok(false)
            }
        },
        Commands::Get { key, meta: true } => match client.get_with_metadata(&key)? {
            Outcome::Success(result) => {
                for item in result.items() {
                    println!(
                        "{} = {} ({}, flags={}, length={}, cas={}, frames={})",
                        item.key,
                        item.value,
                        item.value.kind(),
                        item.flags,
                        item.length,
                        item.cas.map_or_else(|| "-".to_string(), |c| c.to_string()),
                        item.frames
                    );
                }
                Ok(true)
            }
            Outcome::Negative(code) => {
                println!("{}", code);
                Ok(false)
            }
        },
        Commands::Delete { key } => {
            let outcome = client.delete(&key)?;
            println!("{}", outcome.code());
            Ok(outcome.is_success())
        }
    }
}

fn parse_value(raw: &str, kind: Kind) -> Result<Value, MemcacheError> {
    let invalid = |what: &str| MemcacheError::Serialization(format!("{:?} is not a valid {}", raw, what));

    Ok(match kind {
        Kind::String => Value::from(raw),
        Kind::Int => Value::Integer(raw.parse().map_err(|_| invalid("integer"))?),
        Kind::Float => Value::Float(raw.parse().map_err(|_| invalid("float"))?),
        Kind::Bool => Value::Boolean(raw.parse().map_err(|_| invalid("boolean"))?),
    })
}
