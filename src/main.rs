use clap::{Parser, Subcommand};
use csvs_mongo::{
    check_connection, collect_report, upload_directory, Config, DocumentStore, DumpStore, Error,
    MemoryStore, MongoStore, Options,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvs_mongo", version, about = "Load CSV files into MongoDB collections")]
struct Cli {
    /// Connection string, or `env` / `env=NAME` to read it from the environment
    #[arg(long, default_value = "env", global = true)]
    uri: String,

    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping the server and count the documents in each collection
    Ping,
    /// Upload every CSV file in a directory, one collection per file
    Upload {
        directory: PathBuf,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
        /// Keep documents already in the collections
        #[arg(long)]
        append: bool,
        #[arg(long)]
        delimiter: Option<char>,
        /// Removed from file names to make collection names
        #[arg(long, default_value = "_export")]
        strip: String,
        /// Write documents as JSON lines to this file (`-` for stdout) instead of MongoDB
        #[arg(long)]
        dump: Option<String>,
        /// Coerce and count without writing anywhere
        #[arg(long, conflicts_with = "dump")]
        dry_run: bool,
    },
    /// Print document counts and sample fields for each collection
    Verify,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error}");
            let hints = error.hints();
            if !hints.is_empty() {
                log::error!("This usually means:");
                for (num, hint) in hints.iter().enumerate() {
                    log::error!("{}. {hint}", num + 1);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli_uri: String, database: Option<String>) -> Result<Config, Error> {
    let database = match database {
        Some(database) => database,
        None => std::env::var("MONGODB_DATABASE").map_err(|source| Error::EnvVarError {
            source,
            envvar: "MONGODB_DATABASE".into(),
        })?,
    };
    Ok(Config::builder().uri(cli_uri).database(database).build())
}

fn connect(config: &Config) -> Result<MongoStore, Error> {
    log::info!(
        "Connecting to {} (database {})",
        config.display_host(),
        config.database
    );
    let mut store = MongoStore::connect(config)?;
    store.ping()?;
    log::info!("Connected to database {}", store.database_name());
    Ok(store)
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    match cli.command {
        Commands::Ping => {
            let config = load_config(cli.uri, cli.database)?;
            let mut store = MongoStore::connect(&config)?;
            let check = check_connection(&mut store, &config.database)?;
            println!("{check}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upload {
            directory,
            batch_size,
            append,
            delimiter,
            strip,
            dump,
            dry_run,
        } => {
            let delimiter = match delimiter {
                Some(delimiter) if delimiter.is_ascii() => Some(delimiter as u8),
                Some(delimiter) => {
                    return Err(Error::ConfigError {
                        message: format!(
                            "Delimiter `{delimiter}` needs to be a single ASCII character"
                        ),
                    })
                }
                None => None,
            };
            let options = Options::builder()
                .batch_size(batch_size)
                .clear_existing(!append)
                .delimiter(delimiter)
                .strip_from_name(strip)
                .build();

            let mut store: Box<dyn DocumentStore> = if dry_run {
                Box::new(MemoryStore::new())
            } else if let Some(dump) = dump {
                Box::new(DumpStore::create(&dump)?)
            } else {
                Box::new(connect(&load_config(cli.uri, cli.database)?)?)
            };

            log::info!("Starting CSV upload from {}", directory.display());
            let summary = upload_directory(&mut *store, &directory, &options)?;

            if summary.all_succeeded() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Verify => {
            let config = load_config(cli.uri, cli.database)?;
            let mut store = connect(&config)?;
            let report = collect_report(&mut store, &config)?;
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
