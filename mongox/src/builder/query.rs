//! Filter documents.
//!
//! ```
//! use mongox::query;
//! use mongodb::bson::doc;
//!
//! let filter = query::builder().gte("age", 18).lt("age", 65).eq("active", true).build();
//! assert_eq!(filter, doc! { "age": { "$gte": 18, "$lt": 65 }, "active": { "$eq": true } });
//! ```

use super::merge_into;
use mongodb::bson::{Bson, Document, Regex, doc};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuilder {
    document: Document,
}

pub fn builder() -> QueryBuilder {
    QueryBuilder::default()
}

/// `{ "_id": id }`
pub fn id(id: impl Into<Bson>) -> Document {
    doc! { "_id": id.into() }
}

pub fn eq(key: &str, value: impl Into<Bson>) -> Document {
    builder().eq(key, value).build()
}

pub fn ne(key: &str, value: impl Into<Bson>) -> Document {
    builder().ne(key, value).build()
}

pub fn in_<V: Into<Bson>>(key: &str, values: impl IntoIterator<Item = V>) -> Document {
    builder().in_(key, values).build()
}

pub fn and(filters: impl IntoIterator<Item = Document>) -> Document {
    builder().and(filters).build()
}

pub fn or(filters: impl IntoIterator<Item = Document>) -> Document {
    builder().or(filters).build()
}

fn array<V: Into<Bson>>(values: impl IntoIterator<Item = V>) -> Bson {
    Bson::Array(values.into_iter().map(Into::into).collect())
}

fn filters(filters: impl IntoIterator<Item = Document>) -> Bson {
    Bson::Array(filters.into_iter().map(Bson::Document).collect())
}

impl QueryBuilder {
    fn operator(mut self, key: &str, operator: &str, value: Bson) -> Self {
        merge_into(&mut self.document, key, operator, value);
        self
    }

    pub fn id(mut self, id: impl Into<Bson>) -> Self {
        self.document.insert("_id", id.into());
        self
    }

    /// Adds a raw `key: value` condition.
    pub fn key_value(mut self, key: &str, value: impl Into<Bson>) -> Self {
        self.document.insert(key, value.into());
        self
    }

    pub fn eq(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$eq", value.into())
    }

    pub fn ne(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$ne", value.into())
    }

    pub fn gt(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$gt", value.into())
    }

    pub fn gte(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$gte", value.into())
    }

    pub fn lt(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$lt", value.into())
    }

    pub fn lte(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator(key, "$lte", value.into())
    }

    pub fn in_<V: Into<Bson>>(self, key: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.operator(key, "$in", array(values))
    }

    pub fn nin<V: Into<Bson>>(self, key: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.operator(key, "$nin", array(values))
    }

    pub fn all<V: Into<Bson>>(self, key: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.operator(key, "$all", array(values))
    }

    pub fn exists(self, key: &str, exists: bool) -> Self {
        self.operator(key, "$exists", exists.into())
    }

    pub fn size(self, key: &str, size: i32) -> Self {
        self.operator(key, "$size", size.into())
    }

    pub fn regex(self, key: &str, pattern: &str, options: &str) -> Self {
        let regex = Regex {
            pattern: pattern.to_owned(),
            options: options.to_owned(),
        };
        self.operator(key, "$regex", Bson::RegularExpression(regex))
    }

    pub fn elem_match(self, key: &str, condition: Document) -> Self {
        self.operator(key, "$elemMatch", condition.into())
    }

    /// `{ key: { "$not": condition } }`
    pub fn not(self, key: &str, condition: Document) -> Self {
        self.operator(key, "$not", condition.into())
    }

    pub fn and(mut self, conditions: impl IntoIterator<Item = Document>) -> Self {
        self.document.insert("$and", filters(conditions));
        self
    }

    pub fn or(mut self, conditions: impl IntoIterator<Item = Document>) -> Self {
        self.document.insert("$or", filters(conditions));
        self
    }

    pub fn nor(mut self, conditions: impl IntoIterator<Item = Document>) -> Self {
        self.document.insert("$nor", filters(conditions));
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

impl From<QueryBuilder> for Document {
    fn from(value: QueryBuilder) -> Self {
        value.build()
    }
}
