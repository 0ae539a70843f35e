//! Field metadata and the auto-population strategies applied before writes.
//!
//! `#[derive(Model)]` emits a [`FieldDef`] per struct field. [`parse_fields`]
//! turns those into [`FieldDescriptor`]s once per type, and the
//! [`strategy`] functions consume the descriptors positionally alongside the
//! [`FieldSlot`]s of a live value or the keys of an update document.

use crate::Schema;
use dashmap::DashMap;
use std::{
    any::TypeId,
    sync::{Arc, LazyLock},
};

pub use strategy::{before_insert, before_update, before_upsert, execute};
pub use value::{AutoId, AutoTime};

pub mod strategy;
mod value;

/// Static description of one struct field, as written in source.
#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    /// Wire tag. Only the first comma-separated segment names the key.
    pub bson: Option<&'static str>,
    /// `None` when the field has no `#[mongox(...)]` attribute.
    pub mongox: Option<AuxTag>,
    pub kind: FieldKind,
    /// Fields of a `#[serde(flatten)]` struct.
    pub inline: Option<&'static [FieldDef]>,
}

/// Directives from a `#[mongox(...)]` field attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuxTag {
    pub auto_id: bool,
    /// Raw unit text; empty when the directive has no value.
    pub auto_create_time: Option<&'static str>,
    pub auto_update_time: Option<&'static str>,
}

/// Declared type of a field, as far as auto-population cares. `Option<T>`
/// fields take the kind of `T`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Time,
    Int,
    Int64,
    ObjectId,
    String,
    Other,
}

impl FieldKind {
    fn holds_unix_time(self) -> bool {
        matches!(self, Self::Int | Self::Int64)
    }
}

/// How an automatic timestamp is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Native,
    Second,
    Milli,
    Nano,
}

impl TimeUnit {
    /// Parses the unit of an `auto_*_time` directive. Unknown units disable the
    /// directive.
    pub fn parse(unit: &str) -> Option<Self> {
        match unit {
            "" | "second" => Some(Self::Second),
            "milli" => Some(Self::Milli),
            "nano" => Some(Self::Nano),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub mongo_field: &'static str,
    pub kind: FieldKind,
    pub auto_id: bool,
    pub auto_create_time: Option<TimeUnit>,
    pub auto_update_time: Option<TimeUnit>,
    pub inlined_fields: Option<Vec<FieldDescriptor>>,
}

impl FieldDescriptor {
    fn inline(def: &FieldDef, children: Vec<FieldDescriptor>) -> Self {
        Self {
            name: def.name,
            mongo_field: mongo_field(def),
            kind: def.kind,
            auto_id: false,
            auto_create_time: None,
            auto_update_time: None,
            inlined_fields: Some(children),
        }
    }

    fn scalar(def: &FieldDef) -> Self {
        let mut descriptor = Self {
            name: def.name,
            mongo_field: mongo_field(def),
            kind: def.kind,
            auto_id: false,
            auto_create_time: None,
            auto_update_time: None,
            inlined_fields: None,
        };

        match def.mongox {
            Some(tag) => {
                descriptor.auto_id = tag.auto_id;
                descriptor.auto_create_time = tag.auto_create_time.and_then(TimeUnit::parse);
                descriptor.auto_update_time = tag.auto_update_time.and_then(TimeUnit::parse);
            }
            None => {
                let unit = match def.kind {
                    FieldKind::Time => Some(TimeUnit::Native),
                    kind if kind.holds_unix_time() => Some(TimeUnit::Second),
                    _ => None,
                };

                match def.name {
                    "created_at" => descriptor.auto_create_time = unit,
                    "updated_at" => descriptor.auto_update_time = unit,
                    _ => {}
                }
            }
        }

        descriptor
    }
}

fn mongo_field(def: &FieldDef) -> &'static str {
    def.bson
        .and_then(|tag| tag.split(',').next())
        .filter(|key| !key.is_empty())
        .unwrap_or(def.name)
}

/// Builds descriptors from field definitions, in order. Returns `None` when the
/// type has no struct shape.
pub fn parse_fields(defs: Option<&[FieldDef]>) -> Option<Vec<FieldDescriptor>> {
    let defs = defs?;

    let descriptors = defs
        .iter()
        .map(|def| match def.inline {
            Some(children) => {
                FieldDescriptor::inline(def, parse_fields(Some(children)).unwrap_or_default())
            }
            None => FieldDescriptor::scalar(def),
        })
        .collect();

    Some(descriptors)
}

/// Parsed descriptors of `T`, built on first use and shared afterwards.
pub fn descriptors_of<T: Schema + 'static>() -> Option<Arc<[FieldDescriptor]>> {
    static DESCRIPTORS: LazyLock<DashMap<TypeId, Arc<[FieldDescriptor]>>> =
        LazyLock::new(DashMap::new);

    let defs = T::FIELDS?;
    let type_id = TypeId::of::<T>();

    if let Some(descriptors) = DESCRIPTORS.get(&type_id) {
        return Some(descriptors.clone());
    }

    let descriptors: Arc<[FieldDescriptor]> = parse_fields(Some(defs))?.into();
    DESCRIPTORS.insert(type_id, descriptors.clone());

    Some(descriptors)
}

/// Mutable access to one field of a live value.
pub enum FieldSlot<'a> {
    /// A field without auto behavior.
    Opaque,
    Id(&'a mut dyn AutoId),
    Time(&'a mut dyn AutoTime),
    Inline(Vec<FieldSlot<'a>>),
}

impl std::fmt::Debug for FieldSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opaque => f.write_str("Opaque"),
            Self::Id(_) => f.write_str("Id"),
            Self::Time(_) => f.write_str("Time"),
            Self::Inline(slots) => f.debug_tuple("Inline").field(slots).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: FieldDef = FieldDef {
        name: "plain",
        bson: None,
        mongox: None,
        kind: FieldKind::Other,
        inline: None,
    };

    fn def(name: &'static str, kind: FieldKind) -> FieldDef {
        FieldDef {
            name,
            kind,
            ..PLAIN
        }
    }

    fn parse_one(def: FieldDef) -> FieldDescriptor {
        parse_fields(Some(&[def])).unwrap().remove(0)
    }

    #[test]
    fn missing_shape_is_not_applicable() {
        assert_eq!(parse_fields(None), None);
        assert!(descriptors_of::<mongodb::bson::Document>().is_none());
    }

    #[test]
    fn wire_key_uses_first_tag_segment() {
        let tagged = FieldDef {
            bson: Some("_id,omitempty"),
            ..def("id", FieldKind::ObjectId)
        };
        assert_eq!(parse_one(tagged).mongo_field, "_id");

        let empty = FieldDef {
            bson: Some(",omitempty"),
            ..def("name", FieldKind::String)
        };
        assert_eq!(parse_one(empty).mongo_field, "name");

        assert_eq!(parse_one(def("name", FieldKind::String)).mongo_field, "name");
    }

    #[test]
    fn explicit_directives() {
        let tag = |auto_id, create, update| AuxTag {
            auto_id,
            auto_create_time: create,
            auto_update_time: update,
        };

        let id = parse_one(FieldDef {
            mongox: Some(tag(true, None, None)),
            ..def("id", FieldKind::ObjectId)
        });
        assert!(id.auto_id);
        assert_eq!(id.auto_create_time, None);

        let cases = [
            ("", Some(TimeUnit::Second)),
            ("second", Some(TimeUnit::Second)),
            ("milli", Some(TimeUnit::Milli)),
            ("nano", Some(TimeUnit::Nano)),
            ("hour", None),
        ];

        for (unit, expected) in cases {
            let created = parse_one(FieldDef {
                mongox: Some(tag(false, Some(unit), None)),
                ..def("born", FieldKind::Int64)
            });
            assert_eq!(created.auto_create_time, expected, "unit {unit:?}");

            let updated = parse_one(FieldDef {
                mongox: Some(tag(false, None, Some(unit))),
                ..def("seen", FieldKind::Int64)
            });
            assert_eq!(updated.auto_update_time, expected, "unit {unit:?}");
        }
    }

    #[test]
    fn conventional_timestamps() {
        let created = parse_one(def("created_at", FieldKind::Time));
        assert_eq!(created.auto_create_time, Some(TimeUnit::Native));
        assert_eq!(created.auto_update_time, None);

        let updated = parse_one(def("updated_at", FieldKind::Int64));
        assert_eq!(updated.auto_update_time, Some(TimeUnit::Second));

        let machine = parse_one(def("updated_at", FieldKind::Int));
        assert_eq!(machine.auto_update_time, Some(TimeUnit::Second));

        let text = parse_one(def("created_at", FieldKind::String));
        assert_eq!(text.auto_create_time, None);

        let other = parse_one(def("deleted_at", FieldKind::Time));
        assert_eq!(other.auto_create_time, None);
        assert_eq!(other.auto_update_time, None);
    }

    #[test]
    fn explicit_tag_disables_convention() {
        let created = parse_one(FieldDef {
            mongox: Some(AuxTag::default()),
            ..def("created_at", FieldKind::Time)
        });
        assert_eq!(created.auto_create_time, None);
    }

    #[test]
    fn inline_group_stays_grouped() {
        static CHILDREN: [FieldDef; 2] = [
            FieldDef {
                name: "created_at",
                bson: None,
                mongox: None,
                kind: FieldKind::Time,
                inline: None,
            },
            FieldDef {
                name: "updated_at",
                bson: None,
                mongox: None,
                kind: FieldKind::Time,
                inline: None,
            },
        ];

        let defs = [
            def("name", FieldKind::String),
            FieldDef {
                inline: Some(&CHILDREN),
                ..def("created_at", FieldKind::Other)
            },
        ];

        let descriptors = parse_fields(Some(&defs)).unwrap();
        assert_eq!(descriptors.len(), 2);

        let group = &descriptors[1];
        assert_eq!(group.auto_create_time, None);
        assert_eq!(group.auto_update_time, None);

        let children = group.inlined_fields.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].auto_create_time, Some(TimeUnit::Native));
        assert_eq!(children[1].auto_update_time, Some(TimeUnit::Native));
    }
}
