//! Aggregation pipelines and accumulator expressions.
//!
//! ```
//! use mongox::aggregation::{self, sum};
//! use mongodb::bson::doc;
//!
//! let pipeline = aggregation::builder()
//!     .match_(doc! { "status": "paid" })
//!     .group("$customer", doc! { "total": sum("$amount") })
//!     .sort(doc! { "total": -1 })
//!     .limit(10)
//!     .build();
//!
//! assert_eq!(pipeline.len(), 4);
//! ```

use mongodb::bson::{Bson, Document, doc};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageBuilder {
    stages: Vec<Document>,
}

pub fn builder() -> StageBuilder {
    StageBuilder::default()
}

macro_rules! accumulators {
    ($( $name:ident => $operator:literal ),* $(,)?) => {
        $(
            #[doc = concat!("`{ \"", $operator, "\": expression }`")]
            pub fn $name(expression: impl Into<Bson>) -> Bson {
                Bson::Document(doc! { $operator: expression.into() })
            }
        )*
    };
}

accumulators! {
    sum => "$sum",
    avg => "$avg",
    min => "$min",
    max => "$max",
    first => "$first",
    last => "$last",
    push => "$push",
    add_to_set => "$addToSet",
}

/// `{ "$sum": 1 }`
pub fn count_acc() -> Bson {
    sum(1)
}

impl StageBuilder {
    fn stage(mut self, name: &str, body: impl Into<Bson>) -> Self {
        let mut stage = Document::new();
        stage.insert(name, body.into());
        self.stages.push(stage);
        self
    }

    pub fn match_(self, filter: impl Into<Document>) -> Self {
        self.stage("$match", filter.into())
    }

    pub fn project(self, projection: Document) -> Self {
        self.stage("$project", projection)
    }

    /// `{ "$group": { "_id": id, ...accumulators } }`
    pub fn group(self, id: impl Into<Bson>, accumulators: Document) -> Self {
        let mut body = doc! { "_id": id.into() };
        for (key, value) in accumulators {
            body.insert(key, value);
        }
        self.stage("$group", body)
    }

    pub fn sort(self, sort: Document) -> Self {
        self.stage("$sort", sort)
    }

    pub fn skip(self, skip: i64) -> Self {
        self.stage("$skip", skip)
    }

    pub fn limit(self, limit: i64) -> Self {
        self.stage("$limit", limit)
    }

    /// Unwinds `path` (with or without the leading `$`).
    pub fn unwind(self, path: &str) -> Self {
        let path = if path.starts_with('$') {
            path.to_owned()
        } else {
            format!("${path}")
        };
        self.stage("$unwind", path)
    }

    pub fn lookup(self, from: &str, local_field: &str, foreign_field: &str, as_: &str) -> Self {
        self.stage(
            "$lookup",
            doc! {
                "from": from,
                "localField": local_field,
                "foreignField": foreign_field,
                "as": as_,
            },
        )
    }

    pub fn add_fields(self, fields: Document) -> Self {
        self.stage("$addFields", fields)
    }

    pub fn replace_root(self, new_root: impl Into<Bson>) -> Self {
        self.stage("$replaceRoot", doc! { "newRoot": new_root.into() })
    }

    pub fn count(self, field: &str) -> Self {
        self.stage("$count", field)
    }

    pub fn sample(self, size: i64) -> Self {
        self.stage("$sample", doc! { "size": size })
    }

    pub fn facet(self, facets: impl IntoIterator<Item = (String, Vec<Document>)>) -> Self {
        let body = facets
            .into_iter()
            .map(|(name, stages)| (name, Bson::Array(stages.into_iter().map(Bson::Document).collect())))
            .collect::<Document>();
        self.stage("$facet", body)
    }

    /// Appends an arbitrary stage document.
    pub fn raw(mut self, stage: Document) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Vec<Document> {
        self.stages
    }
}

impl From<StageBuilder> for Vec<Document> {
    fn from(value: StageBuilder) -> Self {
        value.build()
    }
}
