//! In-memory document collection.
//!
//! This module provides [`MemoryCollection`], an in-memory implementation of
//! [`DocumentCollection`] suitable for testing and development.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Documents are kept in a [`BTreeMap`] by id, so
//!   prefix queries are a single range scan
//!
//! # Example
//!
//! ```
//! use instancedb::{DocumentCollection, MemoryCollection};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let collection = MemoryCollection::new();
//!
//!     let document = json!({ "_id": "default:instance:invoker:inv:1", "status": "ok" });
//!     collection.insert(document.as_object().unwrap().clone()).await.unwrap();
//!
//!     let found = collection.find_prefix("default:instance:invoker:inv:").await.unwrap();
//!     assert_eq!(found.len(), 1);
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits

use std::{collections::BTreeMap, ops::Bound, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::{
    document::{Document, DocumentCollection, ID_FIELD},
    error::{DbError, DbResult},
};

/// In-memory [`DocumentCollection`] using [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryCollection` is cheaply cloneable via [`Arc`]. All clones share the
/// same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    documents: Arc<RwLock<BTreeMap<String, Document>>>,
}

impl MemoryCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns `true` if no document is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Ids of every stored document, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }
}

fn prefixed<'a>(
    documents: &'a BTreeMap<String, Document>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Document)> + 'a {
    documents
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(id, _)| id.starts_with(prefix))
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, id: &str) -> DbResult<Option<Document>> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn find_prefix(&self, prefix: &str) -> DbResult<Vec<Document>> {
        let documents = self.documents.read();
        Ok(prefixed(&documents, prefix).map(|(_, document)| document.clone()).collect())
    }

    async fn insert(&self, document: Document) -> DbResult<()> {
        let Some(id) = document.get(ID_FIELD).and_then(JsonValue::as_str).map(str::to_owned)
        else {
            return Err(DbError::backend(format!("document has no string `{ID_FIELD}`")));
        };

        let mut documents = self.documents.write();
        if documents.contains_key(&id) {
            return Err(DbError::backend(format!("unique constraint violated for `{id}`")));
        }
        documents.insert(id, document);
        Ok(())
    }

    async fn update(&self, id: &str, document: Document) -> DbResult<u64> {
        let mut documents = self.documents.write();
        match documents.get_mut(id) {
            Some(existing) => {
                *existing = document;
                Ok(1)
            },
            None => Ok(0),
        }
    }

    async fn remove(&self, id: &str) -> DbResult<u64> {
        Ok(u64::from(self.documents.write().remove(id).is_some()))
    }

    async fn remove_prefix(&self, prefix: &str) -> DbResult<u64> {
        let mut documents = self.documents.write();
        let ids: Vec<String> = prefixed(&documents, prefix).map(|(id, _)| id.clone()).collect();
        for id in &ids {
            documents.remove(id);
        }
        Ok(u64::try_from(ids.len()).unwrap_or(u64::MAX))
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(id: &str, n: i64) -> Document {
        json!({ "_id": id, "n": n }).as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let collection = MemoryCollection::new();

        collection.insert(doc("k1", 1)).await.unwrap();
        assert_eq!(collection.find_one("k1").await.unwrap(), Some(doc("k1", 1)));

        assert_eq!(collection.update("k1", doc("k1", 2)).await.unwrap(), 1);
        assert_eq!(collection.find_one("k1").await.unwrap(), Some(doc("k1", 2)));

        assert_eq!(collection.remove("k1").await.unwrap(), 1);
        assert_eq!(collection.remove("k1").await.unwrap(), 0);
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let collection = MemoryCollection::new();
        collection.insert(doc("k", 1)).await.unwrap();

        let err = collection.insert(doc("k", 2)).await.unwrap_err();
        assert!(matches!(err, DbError::Backend { .. }));
        assert_eq!(collection.find_one("k").await.unwrap(), Some(doc("k", 1)));
    }

    #[tokio::test]
    async fn test_insert_requires_an_id() {
        let collection = MemoryCollection::new();
        let err = collection.insert(Document::new()).await.unwrap_err();
        assert!(err.to_string().contains("_id"));
    }

    #[tokio::test]
    async fn test_update_missing_is_a_no_op() {
        let collection = MemoryCollection::new();
        assert_eq!(collection.update("ghost", doc("ghost", 1)).await.unwrap(), 0);
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_operations() {
        let collection = MemoryCollection::new();
        for id in ["s:parameter:a:1:x", "s:parameter:a:1:y", "s:parameter:a:10:x", "s:result:a:1:x"]
        {
            collection.insert(doc(id, 0)).await.unwrap();
        }

        let found = collection.find_prefix("s:parameter:a:1:").await.unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(collection.remove_prefix("s:parameter:a:1:").await.unwrap(), 2);
        assert_eq!(collection.ids(), vec!["s:parameter:a:10:x", "s:result:a:1:x"]);

        assert_eq!(collection.remove_prefix("nothing:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_documents() {
        let collection = MemoryCollection::new();
        let clone = collection.clone();
        clone.insert(doc("shared", 1)).await.unwrap();
        assert_eq!(collection.len(), 1);
    }
}
