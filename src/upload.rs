use crate::coerce::coerce_row;
use crate::config::Options;
use crate::document::TypedDocument;
use crate::source::{collection_name, discover_csv_files, RowReader};
use crate::store::DocumentStore;
use crate::{ConfigSnafu, CsvSourceSnafu, Error, NoCsvFilesSnafu};
use snafu::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct UploadSummary {
    /// Collection name and its document count after the upload.
    pub uploaded: Vec<(String, u64)>,
    pub failed: Vec<(PathBuf, String)>,
}

impl UploadSummary {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

fn insert_batch(
    store: &mut dyn DocumentStore,
    collection: &str,
    documents: &mut Vec<TypedDocument>,
) -> Result<(), Error> {
    let inserted = store.insert_many(collection, documents.as_slice())?;
    log::info!("Inserted {inserted} documents to {collection}");
    documents.clear();
    Ok(())
}

/// Loads one CSV file into `collection` and returns the collection's
/// document count afterwards.
pub fn upload_csv_to_collection(
    store: &mut dyn DocumentStore,
    csv_path: &Path,
    collection: &str,
    options: &Options,
) -> Result<u64, Error> {
    ensure!(
        options.batch_size > 0,
        ConfigSnafu {
            message: "Batch size needs to be greater than zero"
        }
    );

    if options.clear_existing {
        let removed = store.clear_collection(collection)?;
        log::info!("Cleared {removed} existing documents in {collection} collection");
    }

    let reader = RowReader::from_path(csv_path, options).context(CsvSourceSnafu {})?;

    let mut documents = Vec::with_capacity(options.batch_size);
    for row in reader {
        let row = row.context(CsvSourceSnafu {})?;
        documents.push(coerce_row(&row));

        if documents.len() >= options.batch_size {
            insert_batch(store, collection, &mut documents)?;
        }
    }

    if !documents.is_empty() {
        insert_batch(store, collection, &mut documents)?;
    }

    let total = store.count_documents(collection)?;
    log::info!(
        "Successfully uploaded {} to {collection} collection. Total documents: {total}",
        csv_path.display()
    );
    Ok(total)
}

/// Uploads every CSV file in `directory`, one collection per file. A file
/// that fails is logged and recorded in the summary; the rest still load.
pub fn upload_directory(
    store: &mut dyn DocumentStore,
    directory: &Path,
    options: &Options,
) -> Result<UploadSummary, Error> {
    ensure!(
        options.batch_size > 0,
        ConfigSnafu {
            message: "Batch size needs to be greater than zero"
        }
    );

    let files = discover_csv_files(directory).context(CsvSourceSnafu {})?;
    ensure!(
        !files.is_empty(),
        NoCsvFilesSnafu {
            directory: directory.to_string_lossy()
        }
    );

    let file_names: Vec<String> = files
        .iter()
        .map(|file| {
            file.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    log::info!("Found {} CSV files: {:?}", files.len(), file_names);

    let mut summary = UploadSummary::default();

    for (file, file_name) in files.into_iter().zip(file_names) {
        let collection = collection_name(&file_name, &options.strip_from_name);
        log::info!("Uploading {file_name} to collection '{collection}'...");

        match upload_csv_to_collection(store, &file, &collection, options) {
            Ok(count) => summary.uploaded.push((collection, count)),
            Err(error) => {
                log::error!("Failed to upload {}: {error}", file.display());
                summary.failed.push((file, error.to_string()));
            }
        }
    }

    log::info!(
        "Upload process completed. {}/{} files uploaded successfully.",
        summary.uploaded.len(),
        summary.total()
    );
    if summary.all_succeeded() {
        log::info!("All CSV files uploaded successfully.");
    } else {
        log::warn!("{} files failed to upload.", summary.failed.len());
    }

    Ok(summary)
}
