//! Auto-population of identifier and timestamp fields, per operation type.

use super::{
    FieldDescriptor, FieldKind, FieldSlot, TimeUnit,
    value::{bson_datetime, unix},
};
use crate::{OpContext, OpType, Result};
use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, Document, oid::ObjectId};

/// Field callback: fills auto fields of the payload (inserts) or of the update
/// document (updates and upserts).
pub fn execute(ctx: &mut OpContext<'_>) -> Result<()> {
    let Some(fields) = ctx.fields.clone() else {
        return Ok(());
    };
    let now = ctx.started_at;

    match ctx.op {
        OpType::BeforeInsert => {
            for doc in ctx.payload.iter_mut() {
                before_insert(doc.auto_fields(), now, &fields);
            }
        }
        OpType::BeforeUpdate => {
            if let Some(updates) = ctx.updates.as_deref_mut() {
                before_update(updates, now, &fields);
            }
        }
        OpType::BeforeUpsert => {
            if let Some(updates) = ctx.updates.as_deref_mut() {
                before_upsert(updates, now, &fields);
            }
        }
        _ => {}
    }

    Ok(())
}

/// Fills zero-valued auto fields of a live value. Fields that already hold a
/// value are kept.
pub fn before_insert(slots: Vec<FieldSlot<'_>>, now: DateTime<Utc>, fields: &[FieldDescriptor]) {
    for (slot, field) in slots.into_iter().zip(fields) {
        match slot {
            FieldSlot::Inline(children) => {
                if let Some(inlined) = &field.inlined_fields {
                    before_insert(children, now, inlined);
                }
            }
            FieldSlot::Id(value) if field.auto_id => {
                if value.is_zero() {
                    value.assign_id(ObjectId::new());
                    tracing::trace!(field = field.mongo_field, "assigned generated id");
                }
            }
            FieldSlot::Time(value) => {
                if let Some(unit) = field.auto_create_time.or(field.auto_update_time) {
                    if value.is_zero() {
                        value.stamp(now, unit);
                        tracing::trace!(field = field.mongo_field, ?unit, "stamped time");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Adds auto-update timestamps to `$set`. Keys already present win.
pub fn before_update(updates: &mut Document, now: DateTime<Utc>, fields: &[FieldDescriptor]) {
    let Ok(set) = updates.get_document_mut("$set") else {
        return;
    };

    merge_update_times(set, now, fields);
}

/// Same as [`before_update`], and also adds generated ids and creation times to
/// `$setOnInsert`.
pub fn before_upsert(updates: &mut Document, now: DateTime<Utc>, fields: &[FieldDescriptor]) {
    before_update(updates, now, fields);

    let mut on_insert = Document::new();
    collect_insert_values(&mut on_insert, now, fields);

    if on_insert.is_empty() {
        return;
    }

    match updates.get_mut("$setOnInsert") {
        Some(Bson::Document(existing)) => {
            for (key, value) in on_insert {
                if !existing.contains_key(&key) {
                    existing.insert(key, value);
                }
            }
        }
        Some(other) => {
            tracing::warn!(
                found = ?other.element_type(),
                "`$setOnInsert` is not a document, auto fields were not added"
            );
        }
        None => {
            updates.insert("$setOnInsert", on_insert);
        }
    }
}

fn merge_update_times(set: &mut Document, now: DateTime<Utc>, fields: &[FieldDescriptor]) {
    for field in fields {
        if let Some(inlined) = &field.inlined_fields {
            merge_update_times(set, now, inlined);
        } else if let Some(unit) = field.auto_update_time {
            if !set.contains_key(field.mongo_field) {
                set.insert(field.mongo_field, encode_time(now, unit, field.kind));
                tracing::trace!(field = field.mongo_field, ?unit, "added update time");
            }
        }
    }
}

fn collect_insert_values(on_insert: &mut Document, now: DateTime<Utc>, fields: &[FieldDescriptor]) {
    for field in fields {
        if let Some(inlined) = &field.inlined_fields {
            collect_insert_values(on_insert, now, inlined);
        } else if field.auto_id {
            on_insert.insert(field.mongo_field, encode_id(ObjectId::new(), field.kind));
        } else if let Some(unit) = field.auto_create_time {
            on_insert.insert(field.mongo_field, encode_time(now, unit, field.kind));
        }
    }
}

/// Wire value of a timestamp for a field of the given kind.
pub fn encode_time(now: DateTime<Utc>, unit: TimeUnit, kind: FieldKind) -> Bson {
    match (unit, kind) {
        (TimeUnit::Native, _) | (_, FieldKind::Time) => Bson::DateTime(bson_datetime(now)),
        (unit, _) => Bson::Int64(unix(now, unit)),
    }
}

fn encode_id(id: ObjectId, kind: FieldKind) -> Bson {
    match kind {
        FieldKind::String => Bson::String(id.to_hex()),
        _ => Bson::ObjectId(id),
    }
}


#[cfg(all(test, feature = "derive"))]
mod derived {
    use super::*;
    use crate::{Model, Schema};
    use chrono::TimeZone;
    use mongodb::bson::{self, doc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, crate::Schema)]
    struct Audit {
        #[mongox(auto_create_time = "nano")]
        opened: i64,
        updated_at: Option<bson::DateTime>,
    }

    #[derive(Debug, Serialize, Deserialize, crate::Model)]
    #[serde(rename_all = "camelCase")]
    struct Account {
        #[serde(rename = "_id")]
        #[mongox(auto_id)]
        id: Option<ObjectId>,
        owner_name: String,
        created_at: bson::DateTime,
        #[mongox(auto_update_time = "milli")]
        touched: i64,
        #[mongox(auto_create_time = "fortnight")]
        ignored: i64,
        #[serde(flatten)]
        audit: Audit,
    }

    impl Account {
        fn new(owner_name: &str) -> Self {
            Self {
                id: None,
                owner_name: owner_name.to_owned(),
                created_at: bson::DateTime::from_millis(0),
                touched: 0,
                ignored: 0,
                audit: Audit {
                    opened: 0,
                    updated_at: None,
                },
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + chrono::Duration::nanoseconds(123_456_789)
    }

    fn native_now() -> bson::DateTime {
        bson::DateTime::from_millis(1_704_164_645_123)
    }

    #[test]
    fn derived_descriptors() {
        let fields = Account::descriptors().unwrap();

        let keys = fields.iter().map(|field| field.mongo_field).collect::<Vec<_>>();
        assert_eq!(keys, ["_id", "ownerName", "createdAt", "touched", "ignored", "audit"]);

        assert!(fields[0].auto_id);
        assert_eq!(fields[2].auto_create_time, Some(TimeUnit::Native));
        assert_eq!(fields[3].auto_update_time, Some(TimeUnit::Milli));
        assert_eq!(fields[4].auto_create_time, None);

        let inlined = fields[5].inlined_fields.as_ref().unwrap();
        assert_eq!(inlined[0].auto_create_time, Some(TimeUnit::Nano));
        assert_eq!(inlined[1].auto_update_time, Some(TimeUnit::Native));
    }

    #[test]
    fn insert_fills_zero_fields() {
        let fields = Account::descriptors().unwrap();
        let mut account = Account::new("ada");

        before_insert(account.auto_fields(), now(), &fields);

        assert!(account.id.is_some());
        assert_eq!(account.owner_name, "ada");
        assert_eq!(account.created_at, native_now());
        assert_eq!(account.touched, 1_704_164_645_123);
        assert_eq!(account.ignored, 0);
        assert_eq!(account.audit.opened, 1_704_164_645_123_456_789);
        assert_eq!(account.audit.updated_at, Some(native_now()));
    }

    #[test]
    fn insert_keeps_existing_values() {
        let fields = Account::descriptors().unwrap();
        let id = ObjectId::new();

        let mut preset = Account::new("ada");
        preset.id = Some(id);
        preset.touched = 7;
        before_insert(preset.auto_fields(), now(), &fields);

        assert_eq!(preset.id, Some(id));
        assert_eq!(preset.touched, 7);

        let mut first = Account::new("a");
        let mut second = Account::new("b");
        before_insert(first.auto_fields(), now(), &fields);
        before_insert(second.auto_fields(), now(), &fields);

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn upsert_from_derived_fields() {
        let fields = Account::descriptors().unwrap();
        let mut updates = doc! { "$set": { "ownerName": "ada" } };

        before_upsert(&mut updates, now(), &fields);

        let set = updates.get_document("$set").unwrap();
        assert_eq!(set.get_str("ownerName").unwrap(), "ada");
        assert_eq!(set.get_i64("touched").unwrap(), 1_704_164_645_123);
        assert_eq!(set.get_datetime("updated_at").unwrap(), &native_now());

        let on_insert = updates.get_document("$setOnInsert").unwrap();
        assert!(on_insert.get_object_id("_id").is_ok());
        assert_eq!(on_insert.get_datetime("createdAt").unwrap(), &native_now());
        assert_eq!(on_insert.get_i64("opened").unwrap(), 1_704_164_645_123_456_789);
        assert!(!on_insert.contains_key("ignored"));
    }

    #[derive(Debug, Serialize, Deserialize, crate::Model)]
    struct Note {
        #[serde(rename(serialize = "noteId", deserialize = "note_id"))]
        #[mongox(auto_id)]
        id: String,
        #[serde(skip)]
        updated_at: i64,
        #[serde(rename(deserialize = "edited"))]
        #[mongox(auto_update_time)]
        edited_at: i64,
    }

    #[test]
    fn serialized_names_and_skipped_fields() {
        let fields = Note::descriptors().unwrap();

        let keys = fields.iter().map(|field| field.mongo_field).collect::<Vec<_>>();
        assert_eq!(keys, ["noteId", "updated_at", "edited_at"]);
        assert_eq!(fields[1].auto_update_time, None);

        let mut updates = doc! { "$set": { "body": "hi" } };
        before_upsert(&mut updates, now(), &fields);

        assert_eq!(
            updates.get_document("$set").unwrap(),
            &doc! { "body": "hi", "edited_at": 1_704_164_645_i64 }
        );
        let id = updates.get_document("$setOnInsert").unwrap().get_str("noteId").unwrap();
        assert!(ObjectId::parse_str(id).is_ok());

        let mut note = Note {
            id: String::new(),
            updated_at: 0,
            edited_at: 0,
        };
        before_insert(note.auto_fields(), now(), &fields);

        assert_eq!(note.id.len(), 24);
        assert_eq!(note.updated_at, 0);
        assert_eq!(note.edited_at, 1_704_164_645);
    }

    #[test]
    fn models_without_hooks_expose_none() {
        let mut account = Account::new("ada");

        assert!(account.as_before_insert().is_none());
        assert!(account.as_after_find().is_none());
    }
}
