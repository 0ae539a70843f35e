use crate::{FieldDescriptor, Model};
use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use std::{fmt, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforeUpsert,
    AfterUpsert,
    BeforeFind,
    AfterFind,
    BeforeAggregate,
    AfterAggregate,
    /// Registration wildcard for every `Before*` slot.
    BeforeAny,
    /// Registration wildcard for every `After*` slot.
    AfterAny,
}

impl OpType {
    pub const BEFORE: [Self; 6] = [
        Self::BeforeInsert,
        Self::BeforeUpdate,
        Self::BeforeDelete,
        Self::BeforeUpsert,
        Self::BeforeFind,
        Self::BeforeAggregate,
    ];

    pub const AFTER: [Self; 6] = [
        Self::AfterInsert,
        Self::AfterUpdate,
        Self::AfterDelete,
        Self::AfterUpsert,
        Self::AfterFind,
        Self::AfterAggregate,
    ];

    /// Concrete slots addressed by this type: itself, or every slot of a phase
    /// for the wildcards.
    pub fn slots(&self) -> &[Self] {
        match self {
            Self::BeforeAny => &Self::BEFORE,
            Self::AfterAny => &Self::AFTER,
            op => std::slice::from_ref(op),
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Documents an operation acts on.
#[derive(Default)]
pub enum Payload<'a> {
    #[default]
    None,
    One(&'a mut dyn Model),
    Many(Vec<&'a mut dyn Model>),
}

impl<'a> Payload<'a> {
    pub fn many<T: Model>(docs: &'a mut [T]) -> Self {
        Self::Many(docs.iter_mut().map(|doc| doc as &mut dyn Model).collect())
    }

    /// `One` for a model handed to an operation, `None` otherwise.
    pub fn optional<T: Model>(doc: Option<&'a mut T>) -> Self {
        match doc {
            Some(doc) => Self::One(doc),
            None => Self::None,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Model + 'a)> {
        let (one, many): (Option<&mut (dyn Model + 'a)>, &mut [&'a mut dyn Model]) = match self {
            Self::None => (None, &mut []),
            Self::One(doc) => (Some(&mut **doc), &mut []),
            Self::Many(docs) => (None, docs.as_mut_slice()),
        };

        one.into_iter().chain(many.iter_mut().map(|doc| &mut **doc))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::One(_) => false,
            Self::Many(docs) => docs.is_empty(),
        }
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::One(_) => f.write_str("One"),
            Self::Many(docs) => write!(f, "Many({})", docs.len()),
        }
    }
}

/// State of one logical operation, handed to every callback of every phase.
#[derive(Debug)]
pub struct OpContext<'a> {
    pub op: OpType,
    pub collection: &'a str,
    /// Taken once per operation so all fields share one timestamp.
    pub started_at: DateTime<Utc>,
    pub filter: Option<&'a mut Document>,
    pub updates: Option<&'a mut Document>,
    pub pipeline: Option<&'a mut Vec<Document>>,
    pub payload: Payload<'a>,
    pub fields: Option<Arc<[FieldDescriptor]>>,
}

impl<'a> OpContext<'a> {
    pub fn new(op: OpType, collection: &'a str, started_at: DateTime<Utc>) -> Self {
        Self {
            op,
            collection,
            started_at,
            filter: None,
            updates: None,
            pipeline: None,
            payload: Payload::None,
            fields: None,
        }
    }

    pub fn with_filter(mut self, filter: &'a mut Document) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_updates(mut self, updates: &'a mut Document) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn with_pipeline(mut self, pipeline: &'a mut Vec<Document>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_payload(mut self, payload: Payload<'a>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_fields(mut self, fields: Option<Arc<[FieldDescriptor]>>) -> Self {
        self.fields = fields;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_expand_to_phase() {
        assert_eq!(OpType::BeforeAny.slots(), &OpType::BEFORE);
        assert_eq!(OpType::AfterAny.slots(), &OpType::AFTER);
        assert_eq!(OpType::AfterFind.slots(), &[OpType::AfterFind]);
    }

    #[test]
    fn payload_iterates_every_document() {
        let mut docs = vec![Document::new(), Document::new(), Document::new()];
        let mut payload = Payload::many(&mut docs);
        assert_eq!(payload.iter_mut().count(), 3);

        let mut single = Document::new();
        let mut payload = Payload::One(&mut single);
        assert_eq!(payload.iter_mut().count(), 1);

        assert_eq!(Payload::None.iter_mut().count(), 0);
        assert!(Payload::None.is_empty());
    }

    #[test]
    fn optional_payload() {
        let mut doc = Document::new();
        assert_eq!(Payload::optional(Some(&mut doc)).iter_mut().count(), 1);
        assert!(Payload::optional::<Document>(None).is_empty());
    }
}
