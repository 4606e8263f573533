mod check;
mod coerce;
mod config;
mod document;
mod mongo;
mod source;
mod store;
mod upload;
mod verify;

pub use crate::check::{check_connection, ConnectionCheck};
pub use crate::coerce::{coerce_row, coerce_value, is_date_field, DATE_FIELD_SUFFIXES};
pub use crate::config::{Config, Options};
pub use crate::document::{Timestamp, TypedDocument, TypedValue};
pub use crate::mongo::MongoStore;
pub use crate::source::{collection_name, discover_csv_files, RawRow, RowReader, SourceError};
pub use crate::store::{DocumentStore, DumpStore, MemoryStore};
pub use crate::upload::{upload_csv_to_collection, upload_directory, UploadSummary};
pub use crate::verify::{collect_report, CollectionStats, Report};

use snafu::prelude::*;

#[non_exhaustive]
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", message))]
    ConfigError { message: String },

    #[snafu(display("Environment variable {} does not exist.", envvar))]
    EnvVarError {
        source: std::env::VarError,
        envvar: String,
    },

    #[snafu(display("Error reading file {}: {}", filename, source))]
    IoError {
        source: std::io::Error,
        filename: String,
    },

    #[snafu(display("Error writing file {}: {}", filename, source))]
    WriteError {
        source: std::io::Error,
        filename: String,
    },

    #[snafu(display("{}", source))]
    CsvSourceError { source: SourceError },

    #[snafu(display("No CSV files found in {}", directory))]
    NoCsvFilesError { directory: String },

    #[snafu(display("MongoDB Error: {}", source))]
    MongoError { source: mongodb::error::Error },

    #[snafu(display("{}", message))]
    StoreError { message: String },

    #[snafu(display("{}", source))]
    JSONError { source: serde_json::Error },
}

impl Error {
    /// Troubleshooting hints for a failed connection, empty when the error
    /// has nothing to do with reaching the server.
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            Error::MongoError { source } => mongo::hints(source),
            Error::ConfigError { .. } | Error::EnvVarError { .. } => mongo::CONFIGURATION_HINTS,
            _ => &[],
        }
    }
}
