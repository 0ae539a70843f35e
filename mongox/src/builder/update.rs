//! Update documents.

use super::merge_into;
use mongodb::bson::{Bson, Document, doc};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateBuilder {
    document: Document,
}

pub fn builder() -> UpdateBuilder {
    UpdateBuilder::default()
}

/// `{ "$set": { key: value } }`
pub fn set(key: &str, value: impl Into<Bson>) -> Document {
    builder().set(key, value).build()
}

/// `{ "$set": fields }`
pub fn set_fields(fields: Document) -> Document {
    doc! { "$set": fields }
}

impl UpdateBuilder {
    fn operator(mut self, operator: &str, key: &str, value: Bson) -> Self {
        merge_into(&mut self.document, operator, key, value);
        self
    }

    pub fn set(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$set", key, value.into())
    }

    /// Merges every key of `fields` into `$set`.
    pub fn set_fields(self, fields: Document) -> Self {
        fields
            .into_iter()
            .fold(self, |builder, (key, value)| builder.operator("$set", &key, value))
    }

    pub fn set_on_insert(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$setOnInsert", key, value.into())
    }

    pub fn unset(self, key: &str) -> Self {
        self.operator("$unset", key, Bson::String(String::new()))
    }

    pub fn inc(self, key: &str, by: impl Into<Bson>) -> Self {
        self.operator("$inc", key, by.into())
    }

    pub fn mul(self, key: &str, by: impl Into<Bson>) -> Self {
        self.operator("$mul", key, by.into())
    }

    pub fn min(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$min", key, value.into())
    }

    pub fn max(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$max", key, value.into())
    }

    pub fn rename(self, key: &str, to: &str) -> Self {
        self.operator("$rename", key, to.into())
    }

    pub fn push(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$push", key, value.into())
    }

    /// `{ "$push": { key: { "$each": values } } }`
    pub fn push_each<V: Into<Bson>>(self, key: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator("$push", key, doc! { "$each": values }.into())
    }

    pub fn pull(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$pull", key, value.into())
    }

    pub fn add_to_set(self, key: &str, value: impl Into<Bson>) -> Self {
        self.operator("$addToSet", key, value.into())
    }

    /// Removes the first (`first = true`) or last element of an array.
    pub fn pop(self, key: &str, first: bool) -> Self {
        self.operator("$pop", key, Bson::Int32(if first { -1 } else { 1 }))
    }

    pub fn current_date(self, key: &str) -> Self {
        self.operator("$currentDate", key, Bson::Boolean(true))
    }

    pub fn build(self) -> Document {
        self.document
    }
}

impl From<UpdateBuilder> for Document {
    fn from(value: UpdateBuilder) -> Self {
        value.build()
    }
}
