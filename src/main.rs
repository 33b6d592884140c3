use std::io::{self, Read};

use clap::{Parser as ClapParser, Subcommand};
use qmodel_ir::cli::{self, CliError, RunOptions};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "qmodel")]
#[command(about = "qmodel - build query models from operator chains and run them over JSON")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query over a JSON array
    Run {
        /// The query, e.g. '$.where(x => x.v > 1).count()'
        query: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show the query model built for a query and its output shape
    Explain {
        /// The query to explain
        query: String,

        /// JSON input used to type the root sequence (reads from stdin if piped)
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn setup_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            query,
            input,
            pretty,
        } => run(query, input, pretty),
        Commands::Explain { query, input } => read_input(input).and_then(|input| {
            let options = RunOptions {
                query,
                input,
                pretty: false,
            };
            print!("{}", cli::explain(&options)?);
            Ok(())
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run(query: String, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let options = RunOptions {
        query,
        input: read_input(input)?,
        pretty,
    };

    let output = cli::execute_run(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}
