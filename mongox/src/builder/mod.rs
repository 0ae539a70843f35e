//! Fluent constructors for filter, update and pipeline documents.

use mongodb::bson::{Bson, Document};

pub mod aggregation;
pub mod query;
pub mod update;

/// Inserts `value` under `operator` inside the sub-document stored at `key`,
/// creating it when missing. A non-document value at `key` is replaced.
fn merge_into(document: &mut Document, key: &str, operator: &str, value: Bson) {
    match document.get_mut(key) {
        Some(Bson::Document(inner)) => {
            inner.insert(operator, value);
        }
        _ => {
            let mut inner = Document::new();
            inner.insert(operator, value);
            document.insert(key, inner);
        }
    }
}
