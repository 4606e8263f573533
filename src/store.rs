use crate::document::TypedDocument;
use crate::{Error, JSONSnafu, StoreSnafu, WriteSnafu};
use serde_json::json;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

/// The handful of calls the loader and the reports make against a document
/// database.
pub trait DocumentStore {
    fn ping(&mut self) -> Result<(), Error>;

    fn collection_names(&mut self) -> Result<Vec<String>, Error>;

    fn count_documents(&mut self, collection: &str) -> Result<u64, Error>;

    /// Removes every document in the collection, returning how many went.
    fn clear_collection(&mut self, collection: &str) -> Result<u64, Error>;

    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[TypedDocument],
    ) -> Result<usize, Error>;

    /// Field names of one document in the collection, `None` when empty.
    fn sample_fields(&mut self, collection: &str) -> Result<Option<Vec<String>>, Error>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Vec<TypedDocument>>,
    failing: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Every call touching `collection` fails from now on.
    pub fn failing_on(mut self, collection: impl Into<String>) -> MemoryStore {
        let collection = collection.into();
        self.collections.entry(collection.clone()).or_default();
        self.failing.push(collection);
        self
    }

    pub fn documents(&self, collection: &str) -> &[TypedDocument] {
        self.collections
            .get(collection)
            .map(|documents| documents.as_slice())
            .unwrap_or_default()
    }

    fn check(&self, collection: &str) -> Result<(), Error> {
        ensure!(
            !self.failing.iter().any(|name| name == collection),
            StoreSnafu {
                message: format!("collection `{collection}` is unavailable")
            }
        );
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn ping(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn collection_names(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.collections.keys().cloned().collect())
    }

    fn count_documents(&mut self, collection: &str) -> Result<u64, Error> {
        self.check(collection)?;
        Ok(self.documents(collection).len() as u64)
    }

    fn clear_collection(&mut self, collection: &str) -> Result<u64, Error> {
        self.check(collection)?;
        let removed = self
            .collections
            .get_mut(collection)
            .map(|documents| documents.drain(..).count())
            .unwrap_or_default();
        Ok(removed as u64)
    }

    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[TypedDocument],
    ) -> Result<usize, Error> {
        self.check(collection)?;
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .extend_from_slice(documents);
        Ok(documents.len())
    }

    fn sample_fields(&mut self, collection: &str) -> Result<Option<Vec<String>>, Error> {
        self.check(collection)?;
        Ok(self
            .documents(collection)
            .first()
            .map(|document| document.keys().map(|key| key.to_owned()).collect()))
    }
}

/// Writes inserted documents as JSON lines instead of talking to a server.
/// Counts and sample fields are kept in memory so the reports still work.
pub struct DumpStore<W: Write> {
    writer: W,
    filename: String,
    counts: BTreeMap<String, u64>,
    samples: BTreeMap<String, Vec<String>>,
}

impl DumpStore<Box<dyn Write>> {
    /// `-` writes to stdout.
    pub fn create(dump_file: &str) -> Result<DumpStore<Box<dyn Write>>, Error> {
        let writer: Box<dyn Write> = if dump_file == "-" {
            Box::new(std::io::stdout())
        } else {
            Box::new(BufWriter::new(
                File::create(dump_file).context(WriteSnafu { filename: dump_file })?,
            ))
        };
        Ok(DumpStore::new(writer, dump_file))
    }
}

impl<W: Write> DumpStore<W> {
    pub fn new(writer: W, filename: impl Into<String>) -> DumpStore<W> {
        DumpStore {
            writer,
            filename: filename.into(),
            counts: BTreeMap::new(),
            samples: BTreeMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocumentStore for DumpStore<W> {
    fn ping(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn collection_names(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.counts.keys().cloned().collect())
    }

    fn count_documents(&mut self, collection: &str) -> Result<u64, Error> {
        Ok(self.counts.get(collection).copied().unwrap_or_default())
    }

    fn clear_collection(&mut self, collection: &str) -> Result<u64, Error> {
        self.samples.remove(collection);
        Ok(self.counts.insert(collection.to_owned(), 0).unwrap_or_default())
    }

    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[TypedDocument],
    ) -> Result<usize, Error> {
        for document in documents {
            let line = json!({"collection": collection, "document": document.to_json()});
            serde_json::to_writer(&mut self.writer, &line).context(JSONSnafu {})?;
            writeln!(self.writer).context(WriteSnafu {
                filename: &self.filename,
            })?;
        }
        self.writer.flush().context(WriteSnafu {
            filename: &self.filename,
        })?;

        if let Some(first) = documents.first() {
            self.samples
                .entry(collection.to_owned())
                .or_insert_with(|| first.keys().map(|key| key.to_owned()).collect());
        }
        *self.counts.entry(collection.to_owned()).or_default() += documents.len() as u64;
        Ok(documents.len())
    }

    fn sample_fields(&mut self, collection: &str) -> Result<Option<Vec<String>>, Error> {
        Ok(self.samples.get(collection).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TypedValue;
    use std::io::BufRead;

    fn document(id: i64) -> TypedDocument {
        vec![
            ("id", TypedValue::Integer(id)),
            ("name", TypedValue::String(format!("item {id}"))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn memory_store() {
        let mut store = MemoryStore::new();
        store.insert_many("products", &[document(1), document(2)]).unwrap();
        store.insert_many("alerts", &[document(3)]).unwrap();

        assert_eq!(store.collection_names().unwrap(), vec!["alerts", "products"]);
        assert_eq!(store.count_documents("products").unwrap(), 2);
        assert_eq!(store.count_documents("missing").unwrap(), 0);
        assert_eq!(
            store.sample_fields("products").unwrap(),
            Some(vec!["id".to_string(), "name".to_string()])
        );

        assert_eq!(store.clear_collection("products").unwrap(), 2);
        assert_eq!(store.count_documents("products").unwrap(), 0);
        assert_eq!(store.sample_fields("products").unwrap(), None);
    }

    #[test]
    fn memory_store_failure() {
        let mut store = MemoryStore::new().failing_on("broken");
        assert_eq!(store.collection_names().unwrap(), vec!["broken"]);
        let error = store.insert_many("broken", &[document(1)]).unwrap_err();
        assert_eq!(error.to_string(), "collection `broken` is unavailable");
        assert!(store.count_documents("broken").is_err());
    }

    #[test]
    fn dump_store_writes_lines() {
        let mut store = DumpStore::new(Vec::new(), "memory");
        store.clear_collection("products").unwrap();
        store.insert_many("products", &[document(1), document(2)]).unwrap();

        assert_eq!(store.count_documents("products").unwrap(), 2);
        assert_eq!(
            store.sample_fields("products").unwrap(),
            Some(vec!["id".to_string(), "name".to_string()])
        );
        assert_eq!(store.clear_collection("products").unwrap(), 2);

        let output = store.into_inner();
        let lines: Vec<String> = output.as_slice().lines().map(|line| line.unwrap()).collect();
        insta::assert_snapshot!(lines.join("\n"), @r###"
        {"collection":"products","document":{"id":1,"name":"item 1"}}
        {"collection":"products","document":{"id":2,"name":"item 2"}}
        "###);
    }
}
