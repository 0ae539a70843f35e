use super::Collection;
use crate::{Model, OpType, Payload, Result, with_session};
use chrono::Utc;
use mongodb::{ClientSession, bson::Document, results::DeleteResult};

#[derive(Debug)]
pub struct Deleter<'a, T: Send + Sync> {
    collection: &'a Collection<T>,
    filter: Document,
    model: Option<&'a mut T>,
    session: Option<&'a mut ClientSession>,
}

impl<'a, T: Send + Sync> Deleter<'a, T> {
    pub(super) fn new(collection: &'a Collection<T>) -> Self {
        Self {
            collection,
            filter: Document::new(),
            model: None,
            session: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<Document>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Model whose delete hooks run around the operation.
    pub fn model(mut self, model: &'a mut T) -> Self {
        self.model = Some(model);
        self
    }

    pub fn session(mut self, session: &'a mut ClientSession) -> Self {
        self.session = Some(session);
        self
    }
}

impl<T> Deleter<'_, T>
where
    T: Model + Send + Sync + 'static,
{
    pub async fn delete_one(self) -> Result<DeleteResult> {
        self.execute(false).await
    }

    pub async fn delete_many(self) -> Result<DeleteResult> {
        self.execute(true).await
    }

    async fn execute(mut self, many: bool) -> Result<DeleteResult> {
        let collection = self.collection;
        let started_at = Utc::now();

        collection.run(
            collection
                .context(OpType::BeforeDelete, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        tracing::debug!(collection = collection.name(), filter = %self.filter, many, "delete");

        let filter = self.filter.clone();
        let result = if many {
            with_session!(collection.inner.delete_many(filter), self.session).await
        } else {
            with_session!(collection.inner.delete_one(filter), self.session).await
        }?;

        collection.run(
            collection
                .context(OpType::AfterDelete, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        Ok(result)
    }
}
