use super::TimeUnit;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};

/// A field that can receive a generated identifier.
pub trait AutoId {
    fn is_zero(&self) -> bool;

    fn assign_id(&mut self, id: ObjectId);
}

/// A field that can receive an automatic timestamp.
pub trait AutoTime {
    fn is_zero(&self) -> bool;

    fn stamp(&mut self, now: DateTime<Utc>, unit: TimeUnit);
}

pub(crate) fn unix(now: DateTime<Utc>, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Native | TimeUnit::Second => now.timestamp(),
        TimeUnit::Milli => now.timestamp_millis(),
        TimeUnit::Nano => now.timestamp_nanos_opt().unwrap_or(if now.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        }),
    }
}

pub(crate) fn bson_datetime(now: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(now.timestamp_millis())
}

impl AutoId for ObjectId {
    fn is_zero(&self) -> bool {
        self.bytes() == [0; 12]
    }

    fn assign_id(&mut self, id: ObjectId) {
        *self = id;
    }
}

impl AutoId for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn assign_id(&mut self, id: ObjectId) {
        *self = id.to_hex();
    }
}

impl<T: AutoId + Default> AutoId for Option<T> {
    fn is_zero(&self) -> bool {
        self.as_ref().is_none_or(AutoId::is_zero)
    }

    fn assign_id(&mut self, id: ObjectId) {
        self.get_or_insert_with(T::default).assign_id(id);
    }
}

macro_rules! impl_auto_time {
    ($ty:ty, $zero:expr, |$now:ident, $unit:ident| $encode:expr) => {
        impl AutoTime for $ty {
            fn is_zero(&self) -> bool {
                *self == $zero
            }

            fn stamp(&mut self, $now: DateTime<Utc>, $unit: TimeUnit) {
                *self = $encode;
            }
        }

        impl AutoTime for Option<$ty> {
            fn is_zero(&self) -> bool {
                self.is_none_or(|value| value == $zero)
            }

            fn stamp(&mut self, $now: DateTime<Utc>, $unit: TimeUnit) {
                *self = Some($encode);
            }
        }
    };
}

impl_auto_time!(bson::DateTime, bson::DateTime::from_millis(0), |now, _unit| {
    bson_datetime(now)
});

impl_auto_time!(DateTime<Utc>, DateTime::<Utc>::UNIX_EPOCH, |now, _unit| now);

impl_auto_time!(i64, 0, |now, unit| unix(now, unit));

#[allow(clippy::cast_possible_truncation)]
mod machine {
    use super::{AutoTime, DateTime, TimeUnit, Utc, unix};

    impl_auto_time!(isize, 0, |now, unit| unix(now, unit) as isize);
}
