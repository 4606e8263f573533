use crate::store::DocumentStore;
use crate::Error;
use std::fmt;

/// Result of pinging a deployment and counting what is in the database.
/// A collection that cannot be counted is reported, not treated as fatal.
#[derive(Debug)]
pub struct ConnectionCheck {
    pub database: String,
    pub collections: Vec<(String, Result<u64, String>)>,
}

pub fn check_connection(
    store: &mut dyn DocumentStore,
    database: &str,
) -> Result<ConnectionCheck, Error> {
    log::info!("Attempting to ping server...");
    store.ping()?;
    log::info!("Successfully connected");

    let mut collections = vec![];
    for name in store.collection_names()? {
        let count = store.count_documents(&name).map_err(|error| {
            log::warn!("Error accessing collection '{name}': {error}");
            error.to_string()
        });
        collections.push((name, count));
    }

    Ok(ConnectionCheck {
        database: database.to_owned(),
        collections,
    })
}

impl fmt::Display for ConnectionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.collections.iter().map(|(name, _)| name.as_str()).collect();
        write!(f, "Connected to database: {}", self.database)?;
        write!(f, "\nAvailable collections: [{}]", names.join(", "))?;

        for (name, count) in &self.collections {
            match count {
                Ok(count) => write!(f, "\nCollection '{name}': {count} documents")?,
                Err(error) => write!(f, "\nError accessing collection '{name}': {error}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{TypedDocument, TypedValue};
    use crate::store::MemoryStore;

    #[test]
    fn counts_each_collection() {
        let document: TypedDocument = vec![("id", TypedValue::Integer(1))].into_iter().collect();
        let mut store = MemoryStore::new().failing_on("locked");
        store.insert_many("alerts", &[document.clone(), document.clone()]).unwrap();
        store.insert_many("products", &[document]).unwrap();

        let check = check_connection(&mut store, "shop").unwrap();
        assert_eq!(check.collections.len(), 3);
        assert_eq!(check.collections[0], ("alerts".to_string(), Ok(2)));

        insta::assert_snapshot!(check.to_string(), @r###"
        Connected to database: shop
        Available collections: [alerts, locked, products]
        Collection 'alerts': 2 documents
        Error accessing collection 'locked': collection `locked` is unavailable
        Collection 'products': 1 documents
        "###);
    }

    #[test]
    fn empty_database() {
        let mut store = MemoryStore::new();
        let check = check_connection(&mut store, "shop").unwrap();
        assert!(check.collections.is_empty());
        assert_eq!(
            check.to_string(),
            "Connected to database: shop\nAvailable collections: []"
        );
    }
}
