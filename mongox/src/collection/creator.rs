use super::Collection;
use crate::{Model, OpType, Payload, Result, Schema, with_session};
use chrono::Utc;
use mongodb::{
    ClientSession,
    results::{InsertManyResult, InsertOneResult},
};
use serde::Serialize;

#[derive(Debug)]
pub struct Creator<'a, T: Send + Sync> {
    collection: &'a Collection<T>,
    session: Option<&'a mut ClientSession>,
}

impl<'a, T: Send + Sync> Creator<'a, T> {
    pub(super) fn new(collection: &'a Collection<T>) -> Self {
        Self {
            collection,
            session: None,
        }
    }

    pub fn session(mut self, session: &'a mut ClientSession) -> Self {
        self.session = Some(session);
        self
    }
}

impl<T> Creator<'_, T>
where
    T: Model + Schema + Serialize + Send + Sync + 'static,
{
    /// Inserts `doc` after filling its auto fields in place.
    pub async fn insert_one(self, doc: &mut T) -> Result<InsertOneResult> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();

        collection.run(
            collection
                .context(OpType::BeforeInsert, started_at)
                .with_payload(Payload::One(&mut *doc))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(collection = collection.name(), "insert one");

        let result = with_session!(collection.inner.insert_one(&*doc), self.session).await?;

        collection.run(
            collection
                .context(OpType::AfterInsert, started_at)
                .with_payload(Payload::One(doc))
                .with_fields(fields),
        )?;

        Ok(result)
    }

    /// Inserts `docs` after filling their auto fields in place. All documents
    /// share one timestamp.
    pub async fn insert_many(self, docs: &mut [T]) -> Result<InsertManyResult> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();

        collection.run(
            collection
                .context(OpType::BeforeInsert, started_at)
                .with_payload(Payload::many(&mut *docs))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(collection = collection.name(), count = docs.len(), "insert many");

        let result = with_session!(collection.inner.insert_many(docs.iter()), self.session).await?;

        collection.run(
            collection
                .context(OpType::AfterInsert, started_at)
                .with_payload(Payload::many(docs))
                .with_fields(fields),
        )?;

        Ok(result)
    }
}
