//! Ordered, named handlers run before and after each operation.

use crate::{OpContext, OpType, Result, field, hook};
use std::{collections::HashMap, fmt, sync::Arc};

pub type Handler = Arc<dyn Fn(&mut OpContext<'_>) -> Result<()> + Send + Sync>;

pub const FIELD_HANDLER: &str = "mongox:field";
pub const MODEL_HANDLER: &str = "mongox:model";

#[derive(Clone)]
struct Entry {
    name: String,
    handler: Handler,
}

#[derive(Clone)]
pub struct Callbacks {
    slots: HashMap<OpType, Vec<Entry>>,
}

impl Callbacks {
    /// Registry with the built-in handlers: field auto-population first, then
    /// model hooks, so hooks observe generated ids and timestamps.
    pub fn new() -> Self {
        let mut callbacks = Self::empty();

        for op in [OpType::BeforeAny, OpType::AfterAny] {
            callbacks.register(op, FIELD_HANDLER, field::execute);
            callbacks.register(op, MODEL_HANDLER, hook::execute);
        }

        callbacks
    }

    pub fn empty() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Appends a handler to a slot, or to every slot of a phase for
    /// [`OpType::BeforeAny`] and [`OpType::AfterAny`].
    pub fn register<F>(&mut self, op: OpType, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut OpContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let entry = Entry {
            name: name.into(),
            handler: Arc::new(handler),
        };

        for slot in op.slots() {
            self.slots.entry(*slot).or_default().push(entry.clone());
        }

        self
    }

    /// Removes the first handler with the given name from each addressed slot.
    pub fn remove(&mut self, op: OpType, name: &str) -> &mut Self {
        for slot in op.slots() {
            if let Some(entries) = self.slots.get_mut(slot) {
                if let Some(index) = entries.iter().position(|entry| entry.name == name) {
                    entries.remove(index);
                }
            }
        }

        self
    }

    pub fn names(&self, op: OpType) -> Vec<&str> {
        self.slots
            .get(&op)
            .map(|entries| entries.iter().map(|entry| entry.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Runs the handlers of `ctx.op` in registration order. The first error
    /// stops the slot and is returned.
    pub fn execute(&self, ctx: &mut OpContext<'_>) -> Result<()> {
        let Some(entries) = self.slots.get(&ctx.op) else {
            return Ok(());
        };

        for entry in entries {
            tracing::debug!(op = %ctx.op, collection = ctx.collection, handler = %entry.name, "running callback");
            (entry.handler)(ctx)?;
        }

        Ok(())
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for op in OpType::BEFORE.iter().chain(&OpType::AFTER) {
            map.entry(op, &self.names(*op));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use mongodb::bson::{Document, doc};

    fn ctx<'a>(op: OpType) -> OpContext<'a> {
        OpContext::new(op, "items", chrono::Utc::now())
    }

    fn tag(name: &'static str) -> impl Fn(&mut OpContext<'_>) -> Result<()> + Send + Sync {
        move |ctx: &mut OpContext<'_>| {
            if let Some(updates) = ctx.updates.as_deref_mut() {
                let mut order = updates.get_array("order").cloned().unwrap_or_default();
                order.push(name.into());
                updates.insert("order", order);
            }
            Ok(())
        }
    }

    fn order(updates: &Document) -> Vec<&str> {
        updates
            .get_array("order")
            .map(|order| order.iter().filter_map(|name| name.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn defaults_run_fields_before_models() {
        let callbacks = Callbacks::new();

        for op in OpType::BEFORE.iter().chain(&OpType::AFTER) {
            assert_eq!(callbacks.names(*op), [FIELD_HANDLER, MODEL_HANDLER]);
        }
    }

    #[test]
    fn runs_in_registration_order() {
        let mut callbacks = Callbacks::empty();
        callbacks
            .register(OpType::BeforeUpdate, "first", tag("first"))
            .register(OpType::BeforeUpdate, "second", tag("second"))
            .register(OpType::AfterUpdate, "other", tag("other"));

        let mut updates = doc! {};
        callbacks
            .execute(&mut ctx(OpType::BeforeUpdate).with_updates(&mut updates))
            .unwrap();

        assert_eq!(order(&updates), ["first", "second"]);
    }

    #[test]
    fn wildcard_fans_out() {
        let mut callbacks = Callbacks::empty();
        callbacks.register(OpType::AfterAny, "audit", tag("audit"));

        for op in OpType::AFTER {
            assert_eq!(callbacks.names(op), ["audit"]);
        }
        for op in OpType::BEFORE {
            assert!(callbacks.names(op).is_empty());
        }

        callbacks.remove(OpType::AfterAny, "audit");
        for op in OpType::AFTER {
            assert!(callbacks.names(op).is_empty());
        }
    }

    #[test]
    fn remove_drops_first_match_only() {
        let mut callbacks = Callbacks::empty();
        callbacks
            .register(OpType::BeforeFind, "dup", tag("a"))
            .register(OpType::BeforeFind, "keep", tag("b"))
            .register(OpType::BeforeFind, "dup", tag("c"));

        callbacks.remove(OpType::BeforeFind, "dup");
        assert_eq!(callbacks.names(OpType::BeforeFind), ["keep", "dup"]);

        callbacks.remove(OpType::BeforeFind, "missing");
        assert_eq!(callbacks.names(OpType::BeforeFind), ["keep", "dup"]);
    }

    #[test]
    fn first_error_stops_the_slot() {
        let mut callbacks = Callbacks::empty();
        callbacks
            .register(OpType::BeforeDelete, "ok", tag("ok"))
            .register(OpType::BeforeDelete, "fail", |_: &mut OpContext<'_>| {
                Err(Error::hook("refused"))
            })
            .register(OpType::BeforeDelete, "never", tag("never"));

        let mut updates = doc! {};
        let err = callbacks
            .execute(&mut ctx(OpType::BeforeDelete).with_updates(&mut updates))
            .unwrap_err();

        assert_eq!(err.to_string(), "refused");
        assert_eq!(order(&updates), ["ok"]);
    }

    #[test]
    fn default_registry_stamps_update_time() {
        let fields: Arc<[crate::FieldDescriptor]> = Arc::new([crate::FieldDescriptor {
            name: "updated_at",
            mongo_field: "updated_at",
            kind: field::FieldKind::Int64,
            auto_id: false,
            auto_create_time: None,
            auto_update_time: Some(crate::TimeUnit::Milli),
            inlined_fields: None,
        }]);

        let started_at = chrono::Utc::now();
        let mut updates = doc! { "$set": { "name": "X" } };
        {
            let mut ctx = OpContext::new(OpType::BeforeUpdate, "items", started_at)
                .with_updates(&mut updates)
                .with_fields(Some(fields));

            Callbacks::new().execute(&mut ctx).unwrap();
        }

        assert_eq!(
            updates,
            doc! { "$set": { "name": "X", "updated_at": started_at.timestamp_millis() } }
        );
    }
}
