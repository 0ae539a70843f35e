//! mongox is a fluent `MongoDB` builder library with model hooks and
//! auto-populated fields.
//!
//! ## Example
//!
//! ```ignore
//! // Define a model
//! #[derive(Default, Serialize, Deserialize, Model)]
//! #[mongox(hooks(before_insert))]
//! struct User {
//!   #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!   #[mongox(auto_id)]
//!   id: Option<ObjectId>,
//!   name: String,
//!   created_at: Option<bson::DateTime>,
//!   #[mongox(auto_update_time = "milli")]
//!   touched_at: i64,
//! }
//!
//! let users = mongox::Collection::new(db.collection::<User>("users"));
//!
//! // `id` and `created_at` are filled in before the document is sent
//! let mut user = User { name: "Ada".into(), ..Default::default() };
//! users.creator().insert_one(&mut user).await?;
//!
//! // Select users by custom fields
//! let found = users
//!     .finder()
//!     .filter(query::builder().eq("name", "Ada").build())
//!     .find()
//!     .await?;
//!
//! // `touched_at` is added to `$set` unless the update already sets it
//! users
//!     .updater()
//!     .filter(query::id(user.id))
//!     .updates(update::builder().set("name", "Ada Lovelace").build())
//!     .update_one()
//!     .await?;
//! ```

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate self as mongox;

use mongodb::bson::Document;

#[cfg(feature = "derive")]
pub use mongox_macros::{Model, Schema};

pub use builder::{aggregation, query, update};
pub use callback::Callbacks;
pub use collection::{Aggregator, Collection, Creator, Deleter, Finder, Updater};
pub use error::{Error, Result};
pub use field::{FieldDescriptor, FieldSlot, TimeUnit};
pub use hook::HookContext;
pub use operation::{OpContext, OpType, Payload};
pub use transaction::transaction;

pub use mongodb;

pub mod builder;
pub mod callback;
pub mod collection;
pub mod error;
pub mod field;
pub mod hook;
pub mod operation;
mod transaction;

/// Static shape of a document type.
///
/// Implemented by `#[derive(Model)]` and `#[derive(Schema)]`; the latter is meant
/// for structs embedded with `#[serde(flatten)]`.
pub trait Schema {
    /// Field metadata in declaration order, or `None` for types without a
    /// struct shape.
    const FIELDS: Option<&'static [field::FieldDef]>;

    /// Mutable handles to the fields, positionally matching [`Schema::FIELDS`].
    fn field_slots(&mut self) -> Vec<FieldSlot<'_>>;

    fn descriptors() -> Option<std::sync::Arc<[FieldDescriptor]>>
    where
        Self: Sized + 'static,
    {
        field::descriptors_of::<Self>()
    }
}

/// Object-safe side of a document type: auto-populated fields and the lifecycle
/// hooks it opts into.
pub trait Model: Send {
    fn auto_fields(&mut self) -> Vec<FieldSlot<'_>>;

    fn as_before_insert(&mut self) -> Option<&mut dyn hook::BeforeInsert> {
        None
    }

    fn as_after_insert(&mut self) -> Option<&mut dyn hook::AfterInsert> {
        None
    }

    fn as_before_update(&mut self) -> Option<&mut dyn hook::BeforeUpdate> {
        None
    }

    fn as_after_update(&mut self) -> Option<&mut dyn hook::AfterUpdate> {
        None
    }

    fn as_before_upsert(&mut self) -> Option<&mut dyn hook::BeforeUpsert> {
        None
    }

    fn as_after_upsert(&mut self) -> Option<&mut dyn hook::AfterUpsert> {
        None
    }

    fn as_before_delete(&mut self) -> Option<&mut dyn hook::BeforeDelete> {
        None
    }

    fn as_after_delete(&mut self) -> Option<&mut dyn hook::AfterDelete> {
        None
    }

    fn as_before_find(&mut self) -> Option<&mut dyn hook::BeforeFind> {
        None
    }

    fn as_after_find(&mut self) -> Option<&mut dyn hook::AfterFind> {
        None
    }
}

impl Schema for Document {
    const FIELDS: Option<&'static [field::FieldDef]> = None;

    fn field_slots(&mut self) -> Vec<FieldSlot<'_>> {
        Vec::new()
    }
}

impl Model for Document {
    fn auto_fields(&mut self) -> Vec<FieldSlot<'_>> {
        Vec::new()
    }
}

#[macro_export]
#[doc(hidden)]
macro_rules! with_session {
    ($query: expr, $session: expr) => {
        match $session {
            Some(session) => $query.session(session),
            None => $query,
        }
    };
}
