use super::Collection;
use crate::{Model, OpType, Payload, Result, Schema, with_session};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    ClientSession,
    bson::{Bson, Document},
    options::ReturnDocument,
};
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub struct Finder<'a, T: Send + Sync> {
    collection: &'a Collection<T>,
    filter: Document,
    sort: Option<Document>,
    skip: Option<u64>,
    limit: Option<i64>,
    projection: Option<Document>,
    model: Option<&'a mut T>,
    session: Option<&'a mut ClientSession>,
}

impl<'a, T: Send + Sync> Finder<'a, T> {
    pub(super) fn new(collection: &'a Collection<T>) -> Self {
        Self {
            collection,
            filter: Document::new(),
            sort: None,
            skip: None,
            limit: None,
            projection: None,
            model: None,
            session: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<Document>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Model whose `BeforeFind` hook runs before the query. For
    /// [`Finder::find_one_and_update`] it receives the update hooks instead.
    pub fn model(mut self, model: &'a mut T) -> Self {
        self.model = Some(model);
        self
    }

    pub fn session(mut self, session: &'a mut ClientSession) -> Self {
        self.session = Some(session);
        self
    }
}

impl<T> Finder<'_, T>
where
    T: Model + Schema + DeserializeOwned + Send + Sync + Unpin + 'static,
{
    pub async fn find_one(mut self) -> Result<Option<T>> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();

        collection.run(
            collection
                .context(OpType::BeforeFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut()))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(collection = collection.name(), filter = %self.filter, "find one");

        let mut query = collection.inner.find_one(self.filter.clone());
        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }
        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }
        if let Some(projection) = self.projection {
            query = query.projection(projection);
        }

        let mut found = with_session!(query, self.session).await?;

        if let Some(doc) = found.as_mut() {
            collection.run(
                collection
                    .context(OpType::AfterFind, started_at)
                    .with_filter(&mut self.filter)
                    .with_payload(Payload::One(doc))
                    .with_fields(fields),
            )?;
        }

        Ok(found)
    }

    pub async fn find(mut self) -> Result<Vec<T>> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();

        collection.run(
            collection
                .context(OpType::BeforeFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut()))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(collection = collection.name(), filter = %self.filter, "find");

        let mut query = collection.inner.find(self.filter.clone());
        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }
        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(projection) = self.projection {
            query = query.projection(projection);
        }

        let mut docs: Vec<T> = match self.session {
            Some(session) => {
                query
                    .session(&mut *session)
                    .await?
                    .stream(&mut *session)
                    .try_collect()
                    .await
            }
            None => query.await?.try_collect().await,
        }?;

        collection.run(
            collection
                .context(OpType::AfterFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::many(&mut docs))
                .with_fields(fields),
        )?;

        Ok(docs)
    }

    pub async fn count(mut self) -> Result<u64> {
        let collection = self.collection;
        let started_at = Utc::now();

        collection.run(
            collection
                .context(OpType::BeforeFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        let mut query = collection.inner.count_documents(self.filter.clone());
        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit.unsigned_abs());
        }

        let count = with_session!(query, self.session).await?;

        collection.run(
            collection
                .context(OpType::AfterFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        Ok(count)
    }

    pub async fn distinct(mut self, field: &str) -> Result<Vec<Bson>> {
        let collection = self.collection;
        let started_at = Utc::now();

        collection.run(
            collection
                .context(OpType::BeforeFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        let query = collection.inner.distinct(field, self.filter.clone());
        let values = with_session!(query, self.session).await?;

        collection.run(
            collection
                .context(OpType::AfterFind, started_at)
                .with_filter(&mut self.filter)
                .with_payload(Payload::optional(self.model.as_deref_mut())),
        )?;

        Ok(values)
    }

    /// Applies `updates` to the first match and returns the updated document.
    /// Runs the update slots, so auto-update timestamps are added to `$set`.
    pub async fn find_one_and_update(mut self, updates: impl Into<Document>) -> Result<Option<T>> {
        let collection = self.collection;
        let started_at = Utc::now();
        let fields = T::descriptors();
        let mut updates = updates.into();

        collection.run(
            collection
                .context(OpType::BeforeUpdate, started_at)
                .with_filter(&mut self.filter)
                .with_updates(&mut updates)
                .with_payload(Payload::optional(self.model.as_deref_mut()))
                .with_fields(fields.clone()),
        )?;

        tracing::debug!(collection = collection.name(), filter = %self.filter, %updates, "find one and update");

        let mut query = collection
            .inner
            .find_one_and_update(self.filter.clone(), updates.clone())
            .return_document(ReturnDocument::After);
        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }
        if let Some(projection) = self.projection {
            query = query.projection(projection);
        }

        let mut found = with_session!(query, self.session).await?;

        collection.run(
            collection
                .context(OpType::AfterUpdate, started_at)
                .with_filter(&mut self.filter)
                .with_updates(&mut updates)
                .with_payload(found.as_mut().map_or(Payload::None, |doc| Payload::One(doc)))
                .with_fields(fields),
        )?;

        Ok(found)
    }
}
