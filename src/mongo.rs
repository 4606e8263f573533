use crate::config::Config;
use crate::document::{TypedDocument, TypedValue};
use crate::store::DocumentStore;
use crate::{Error, MongoSnafu};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::sync::{Client, Collection, Database};
use snafu::prelude::*;

pub(crate) const SERVER_SELECTION_HINTS: &[&str] = &[
    "Network connectivity issues",
    "Incorrect connection string",
    "The cluster is paused or unavailable",
    "This machine's IP address is not on the cluster's access list",
];

pub(crate) const AUTHENTICATION_HINTS: &[&str] = &[
    "Incorrect username or password",
    "The user does not have the required permissions",
];

pub(crate) const CONFIGURATION_HINTS: &[&str] = &[
    "Invalid connection string format",
    "Missing required connection parameters",
];

pub(crate) fn hints(error: &mongodb::error::Error) -> &'static [&'static str] {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => SERVER_SELECTION_HINTS,
        ErrorKind::Authentication { .. } => AUTHENTICATION_HINTS,
        ErrorKind::InvalidArgument { .. } | ErrorKind::DnsResolve { .. } => CONFIGURATION_HINTS,
        _ => &[],
    }
}

/// A database on a MongoDB deployment, reached through the blocking driver.
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub fn connect(config: &Config) -> Result<MongoStore, Error> {
        let uri = config.resolve_uri()?;
        let client = Client::with_uri_str(&uri).context(MongoSnafu {})?;
        let database = client.database(&config.database);
        Ok(MongoStore { client, database })
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

impl DocumentStore for MongoStore {
    fn ping(&mut self) -> Result<(), Error> {
        self.client
            .database("admin")
            .run_command(doc! {"ping": 1})
            .run()
            .context(MongoSnafu {})?;
        Ok(())
    }

    fn collection_names(&mut self) -> Result<Vec<String>, Error> {
        self.database
            .list_collection_names()
            .run()
            .context(MongoSnafu {})
    }

    fn count_documents(&mut self, collection: &str) -> Result<u64, Error> {
        self.collection(collection)
            .count_documents(doc! {})
            .run()
            .context(MongoSnafu {})
    }

    fn clear_collection(&mut self, collection: &str) -> Result<u64, Error> {
        let result = self
            .collection(collection)
            .delete_many(doc! {})
            .run()
            .context(MongoSnafu {})?;
        Ok(result.deleted_count)
    }

    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[TypedDocument],
    ) -> Result<usize, Error> {
        if documents.is_empty() {
            return Ok(0);
        }
        let bson_documents: Vec<Document> = documents.iter().map(to_bson_document).collect();
        let result = self
            .collection(collection)
            .insert_many(bson_documents)
            .run()
            .context(MongoSnafu {})?;
        Ok(result.inserted_ids.len())
    }

    fn sample_fields(&mut self, collection: &str) -> Result<Option<Vec<String>>, Error> {
        let sample = self
            .collection(collection)
            .find_one(doc! {})
            .run()
            .context(MongoSnafu {})?;
        Ok(sample.map(|document| document.keys().cloned().collect()))
    }
}

// Whole numbers go in as Int32 when they fit, like the Python driver does.
fn to_bson(value: &TypedValue) -> Bson {
    match value {
        TypedValue::Null => Bson::Null,
        TypedValue::Boolean(value) => Bson::Boolean(*value),
        TypedValue::Integer(value) => match i32::try_from(*value) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*value),
        },
        TypedValue::Float(value) => Bson::Double(*value),
        TypedValue::Timestamp(value) => {
            Bson::DateTime(bson::DateTime::from_millis(value.timestamp_millis()))
        }
        TypedValue::String(value) => Bson::String(value.clone()),
    }
}

pub fn to_bson_document(document: &TypedDocument) -> Document {
    let mut bson_document = Document::new();
    for (name, value) in document.iter() {
        bson_document.insert(name, to_bson(value));
    }
    bson_document
}
