//! In-memory document store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::collection::Collection;
use super::record::Document;
use super::store::{document_id, merge_changes, DocumentStore, Write};
use super::DatabaseError;
use crate::filter::{matcher, Filter};

type Collections = HashMap<Collection, Vec<Document>>;

/// Documents kept per collection in insertion order
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching<'a>(docs: &'a [Document], filter: &Filter) -> Result<Vec<&'a Document>, DatabaseError> {
        let nodes = filter.where_nodes()?;
        let exclude_deleted = filter.excludes_deleted();

        let mut found: Vec<&Document> = docs
            .iter()
            .filter(|doc| !(exclude_deleted && matcher::is_deleted(doc)))
            .filter(|doc| matcher::matches(&nodes, doc))
            .collect();

        let order = filter.order_info();
        if !order.is_empty() {
            found.sort_by(|a, b| matcher::compare_documents(a, b, order));
        }
        Ok(found)
    }

    fn apply_insert(collections: &mut Collections, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        let id = document_id(&doc)?;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| d.get("id").and_then(|v| v.as_str()) == Some(id.as_str())) {
            return Err(DatabaseError::Conflict(format!("{} {} already exists", collection, id)));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    fn apply_update(
        collections: &mut Collections,
        collection: Collection,
        id: &str,
        changes: Document,
    ) -> Result<Document, DatabaseError> {
        let doc = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.get("id").and_then(|v| v.as_str()) == Some(id)))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", collection.label())))?;
        merge_changes(doc, changes);
        Ok(doc.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let docs = collections.get(&collection).map(Vec::as_slice).unwrap_or(&[]);

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(Self::matching(docs, filter)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, DatabaseError> {
        let collections = self.collections.read().await;
        let docs = collections.get(&collection).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Self::matching(docs, filter)?.len() as i64)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.get("id").and_then(|v| v.as_str()) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        let mut collections = self.collections.write().await;
        Self::apply_insert(&mut collections, collection, doc)
    }

    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Document, DatabaseError> {
        let mut collections = self.collections.write().await;
        Self::apply_update(&mut collections, collection, id, changes)
    }

    async fn apply_batch(&self, writes: Vec<Write>) -> Result<Vec<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;

        // Work on a copy of the touched collections; commit only if every write succeeds
        let mut staged: Collections = HashMap::new();
        for write in &writes {
            let collection = match write {
                Write::Insert { collection, .. } | Write::Update { collection, .. } => *collection,
            };
            if !staged.contains_key(&collection) {
                staged.insert(collection, collections.get(&collection).cloned().unwrap_or_default());
            }
        }

        let mut results = Vec::with_capacity(writes.len());
        for write in writes {
            let doc = match write {
                Write::Insert { collection, doc } => Self::apply_insert(&mut staged, collection, doc)?,
                Write::Update { collection, id, changes } => Self::apply_update(&mut staged, collection, &id, changes)?,
            };
            results.push(doc);
        }

        collections.extend(staged);
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
