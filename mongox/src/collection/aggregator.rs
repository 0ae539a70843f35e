use super::Collection;
use crate::{Model, OpType, Payload, Result};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    ClientSession,
    bson::{self, Document},
};
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub struct Aggregator<'a, T: Send + Sync> {
    collection: &'a Collection<T>,
    pipeline: Vec<Document>,
    session: Option<&'a mut ClientSession>,
}

impl<'a, T: Send + Sync> Aggregator<'a, T> {
    pub(super) fn new(collection: &'a Collection<T>) -> Self {
        Self {
            collection,
            pipeline: Vec::new(),
            session: None,
        }
    }

    pub fn pipeline(mut self, pipeline: impl Into<Vec<Document>>) -> Self {
        self.pipeline = pipeline.into();
        self
    }

    pub fn session(mut self, session: &'a mut ClientSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Runs the pipeline and decodes every result as `R`.
    pub async fn aggregate_as<R: DeserializeOwned>(self) -> Result<Vec<R>> {
        let collection = self.collection;
        let started_at = Utc::now();

        let (results, mut pipeline) = self.run_pipeline(started_at).await?;

        collection.run(
            collection
                .context(OpType::AfterAggregate, started_at)
                .with_pipeline(&mut pipeline),
        )?;

        Ok(results)
    }

    async fn run_pipeline<R: DeserializeOwned>(
        mut self,
        started_at: DateTime<Utc>,
    ) -> Result<(Vec<R>, Vec<Document>)> {
        let collection = self.collection;

        collection.run(
            collection
                .context(OpType::BeforeAggregate, started_at)
                .with_pipeline(&mut self.pipeline),
        )?;

        tracing::debug!(collection = collection.name(), stages = self.pipeline.len(), "aggregate");

        let query = collection.inner.aggregate(self.pipeline.clone());
        let documents: Vec<Document> = match self.session {
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

        let results = documents
            .into_iter()
            .map(bson::from_document)
            .collect::<std::result::Result<Vec<R>, _>>()?;

        Ok((results, self.pipeline))
    }
}

impl<T> Aggregator<'_, T>
where
    T: Model + DeserializeOwned + Send + Sync,
{
    /// Runs the pipeline and decodes every result as the collection's model.
    pub async fn aggregate(self) -> Result<Vec<T>> {
        let collection = self.collection;
        let started_at = Utc::now();

        let (mut results, mut pipeline) = self.run_pipeline::<T>(started_at).await?;

        collection.run(
            collection
                .context(OpType::AfterAggregate, started_at)
                .with_pipeline(&mut pipeline)
                .with_payload(Payload::many(&mut results)),
        )?;

        Ok(results)
    }
}
