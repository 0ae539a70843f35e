//! Lifecycle hooks implemented by models.
//!
//! A model opts into a hook by implementing its trait and listing it in
//! `#[mongox(hooks(...))]`, which makes the matching `Model::as_*` capability
//! query return the model itself.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Model)]
//! #[mongox(hooks(before_insert))]
//! struct User {
//!     name: String,
//! }
//!
//! impl BeforeInsert for User {
//!     fn before_insert(&mut self, _ctx: &HookContext<'_>) -> mongox::Result<()> {
//!         self.name = self.name.trim().to_owned();
//!         Ok(())
//!     }
//! }
//! ```

use crate::{Model, OpContext, OpType, Result};
use chrono::{DateTime, Utc};

/// What a hook learns about the operation it runs in.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub op: OpType,
    pub collection: &'a str,
    pub started_at: DateTime<Utc>,
}

macro_rules! hook_traits {
    ($( $(#[$meta:meta])* $hook:ident :: $method:ident ),* $(,)?) => {
        $(
            $(#[$meta])*
            pub trait $hook {
                fn $method(&mut self, ctx: &HookContext<'_>) -> Result<()>;
            }
        )*
    };
}

hook_traits! {
    BeforeInsert::before_insert,
    AfterInsert::after_insert,
    BeforeUpdate::before_update,
    AfterUpdate::after_update,
    BeforeUpsert::before_upsert,
    AfterUpsert::after_upsert,
    BeforeDelete::before_delete,
    AfterDelete::after_delete,
    BeforeFind::before_find,
    AfterFind::after_find,
}

/// Runs the hook matching `ctx.op` on every document of the payload, stopping
/// at the first error.
pub fn execute(ctx: &mut OpContext<'_>) -> Result<()> {
    let hook_ctx = HookContext {
        op: ctx.op,
        collection: ctx.collection,
        started_at: ctx.started_at,
    };

    for doc in ctx.payload.iter_mut() {
        run(doc, &hook_ctx)?;
    }

    Ok(())
}

fn run(doc: &mut dyn Model, ctx: &HookContext<'_>) -> Result<()> {
    match ctx.op {
        OpType::BeforeInsert => doc.as_before_insert().map_or(Ok(()), |m| m.before_insert(ctx)),
        OpType::AfterInsert => doc.as_after_insert().map_or(Ok(()), |m| m.after_insert(ctx)),
        OpType::BeforeUpdate => doc.as_before_update().map_or(Ok(()), |m| m.before_update(ctx)),
        OpType::AfterUpdate => doc.as_after_update().map_or(Ok(()), |m| m.after_update(ctx)),
        OpType::BeforeUpsert => doc.as_before_upsert().map_or(Ok(()), |m| m.before_upsert(ctx)),
        OpType::AfterUpsert => doc.as_after_upsert().map_or(Ok(()), |m| m.after_upsert(ctx)),
        OpType::BeforeDelete => doc.as_before_delete().map_or(Ok(()), |m| m.before_delete(ctx)),
        OpType::AfterDelete => doc.as_after_delete().map_or(Ok(()), |m| m.after_delete(ctx)),
        OpType::BeforeFind => doc.as_before_find().map_or(Ok(()), |m| m.before_find(ctx)),
        OpType::AfterFind => doc.as_after_find().map_or(Ok(()), |m| m.after_find(ctx)),
        OpType::BeforeAggregate
        | OpType::AfterAggregate
        | OpType::BeforeAny
        | OpType::AfterAny => Ok(()),
    }
}

#[cfg(all(test, feature = "derive"))]
mod tests {
    use super::*;
    use crate::{Error, Payload};
    use mongodb::bson::Document;

    #[derive(Debug, Default, crate::Model)]
    #[mongox(hooks(before_insert, after_find))]
    struct Counter {
        index: usize,
        fail: bool,
        calls: u32,
    }

    impl BeforeInsert for Counter {
        fn before_insert(&mut self, ctx: &HookContext<'_>) -> Result<()> {
            assert_eq!(ctx.op, OpType::BeforeInsert);
            self.calls += 1;

            if self.fail {
                return Err(Error::hook(format!("document {} rejected", self.index)));
            }

            Ok(())
        }
    }

    impl AfterFind for Counter {
        fn after_find(&mut self, _ctx: &HookContext<'_>) -> Result<()> {
            self.calls += 10;
            Ok(())
        }
    }

    fn ctx<'a>(op: OpType, payload: Payload<'a>) -> OpContext<'a> {
        OpContext::new(op, "counters", chrono::Utc::now()).with_payload(payload)
    }

    #[test]
    fn runs_matching_hook_only() {
        let mut doc = Counter::default();

        execute(&mut ctx(OpType::BeforeInsert, Payload::One(&mut doc))).unwrap();
        assert_eq!(doc.calls, 1);

        execute(&mut ctx(OpType::AfterFind, Payload::One(&mut doc))).unwrap();
        assert_eq!(doc.calls, 11);

        execute(&mut ctx(OpType::BeforeUpdate, Payload::One(&mut doc))).unwrap();
        execute(&mut ctx(OpType::AfterDelete, Payload::One(&mut doc))).unwrap();
        assert_eq!(doc.calls, 11);
    }

    #[test]
    fn stops_at_first_failing_document() {
        let mut docs = (0..6)
            .map(|index| Counter {
                index,
                fail: index == 3,
                calls: 0,
            })
            .collect::<Vec<_>>();

        let err = execute(&mut ctx(OpType::BeforeInsert, Payload::many(&mut docs))).unwrap_err();

        assert!(matches!(err, Error::Hook(_)));
        assert_eq!(err.to_string(), "document 3 rejected");
        assert_eq!(
            docs.iter().map(|doc| doc.calls).collect::<Vec<_>>(),
            [1, 1, 1, 1, 0, 0]
        );
    }

    #[test]
    fn empty_and_hookless_payloads_are_no_ops() {
        execute(&mut ctx(OpType::BeforeInsert, Payload::None)).unwrap();

        let mut plain = Document::new();
        execute(&mut ctx(OpType::BeforeInsert, Payload::One(&mut plain))).unwrap();

        let mut none: Vec<Counter> = Vec::new();
        execute(&mut ctx(OpType::BeforeInsert, Payload::many(&mut none))).unwrap();
    }
}
