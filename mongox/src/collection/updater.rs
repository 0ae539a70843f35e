use super::Collection;
use crate::{Model, OpType, Payload, Result, Schema, with_session};
use chrono::Utc;
use mongodb::{ClientSession, bson::Document, results::UpdateResult};

#[derive(Debug)]
pub struct Updater<'a, T: Send + Sync> {
    collection: &'a Collection<T>,
    filter: Document,
    updates: Document,
    model: Option<&'a mut T>,
    session: Option<&'a mut ClientSession>,
}

#[derive(Clone, Copy)]
enum Mode {
    One,
    Many,
    Upsert,
}

impl<'a, T: Send + Sync> Updater<'a, T> {
    pub(super) fn new(collection: &'a Collection<T>) -> Self {
        Self {
            collection,
            filter: Document::new(),
            updates: Document::new(),
            model: None,
            session: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<Document>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn updates(mut self, updates: impl Into<Document>) -> Self {
        self.updates = updates.into();
        self
    }

    /// Model whose update or upsert hooks run around the operation.
    pub fn model(mut self, model: &'a mut T) -> Self {
        self.model = Some(model);
        self
    }

    pub fn session(mut self, session: &'a mut ClientSession) -> Self {
        self.session = Some(session);
        self
    }
}

impl<T> Updater<'_, T>
where
    T: Model + Schema + Send + Sync + 'static,
{
    pub async fn update_one(self) -> Result<UpdateResult> {
        self.execute(Mode::One).await
    }

    pub async fn update_many(self) -> Result<UpdateResult> {
        self.execute(Mode::Many).await
    }

    /// Updates the first match or inserts a new document. Generated ids and
    /// creation times go to `$setOnInsert`.
    pub async fn upsert(self) -> Result<UpdateResult> {
        self.execute(Mode::Upsert).await
    }

    async fn execute(mut self, mode: Mode) -> Result<UpdateResult> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();

        let (before, after) = match mode {
            Mode::One | Mode::Many => (OpType::BeforeUpdate, OpType::AfterUpdate),
            Mode::Upsert => (OpType::BeforeUpsert, OpType::AfterUpsert),
        };

        collection.run(
            collection
                .context(before, started_at)
                .with_filter(&mut self.filter)
                .with_updates(&mut self.updates)
                .with_payload(Payload::optional(self.model.as_deref_mut()))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(
            collection = collection.name(),
            filter = %self.filter,
            updates = %self.updates,
            "update"
        );

        let filter = self.filter.clone();
        let updates = self.updates.clone();
        let result = match mode {
            Mode::One => with_session!(collection.inner.update_one(filter, updates), self.session).await,
            Mode::Many => with_session!(collection.inner.update_many(filter, updates), self.session).await,
            Mode::Upsert => {
                with_session!(collection.inner.update_one(filter, updates).upsert(true), self.session)
                    .await
            }
        }?;

        collection.run(
            collection
                .context(after, started_at)
                .with_filter(&mut self.filter)
                .with_updates(&mut self.updates)
                .with_payload(Payload::optional(self.model.as_deref_mut()))
                .with_fields(fields),
        )?;

        Ok(result)
    }
}
