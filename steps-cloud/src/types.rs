//! Shared types for the canteen service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use steps_types::Day;
use uuid::Uuid;

/// A reserved meal for a given day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: String,
    pub booking_date: NaiveDateTime,
    /// Only present when the query expanded the menu navigation.
    #[serde(default)]
    pub menu_booked: Option<Menu>,
}

impl Booking {
    /// Calorie goal for the day: the main course's calories.
    pub fn calorie_goal(&self) -> Option<u32> {
        self.menu_booked.as_ref().and_then(|m| m.kcal_for_main)
    }
}

/// A canteen menu.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub menu_id: String,
    /// Some backends serialize integers as strings (Edm.Int64 in OData JSON).
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_str_or_num")]
    pub kcal_for_main: Option<u32>,
}

/// Accepts a JSON number, a string-encoded number, or null.
fn deserialize_opt_u32_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct U32Visitor;
    impl<'de> de::Visitor<'de> for U32Visitor {
        type Value = Option<u32>;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a non-negative integer, a string-encoded integer, or null")
        }
        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> { Ok(None) }
        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> { Ok(None) }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u32::try_from(v).map(Some).map_err(de::Error::custom)
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u32::try_from(v).map(Some).map_err(de::Error::custom)
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.trim().parse().map(Some).map_err(de::Error::custom)
        }
    }
    deserializer.deserialize_any(U32Visitor)
}

/// Half-open datetime range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// `[day 00:00, next day 00:00)`.
    pub fn day(day: Day) -> Self {
        Self {
            start: day.start(),
            end: day.succ().start(),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// OData `$filter` expression restricting `field` to this range.
    pub fn to_filter(&self, field: &str) -> String {
        format!(
            "{field} ge {} and {field} lt {}",
            self.start.format("%Y-%m-%dT%H:%M:%S"),
            self.end.format("%Y-%m-%dT%H:%M:%S"),
        )
    }
}

/// Kind of a locally made booking change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Upsert,
    Delete,
}

/// A booking change made while offline, waiting for upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingChange {
    pub change_id: Uuid,
    pub kind: ChangeKind,
    pub booking: Booking,
}

impl BookingChange {
    pub fn upsert(booking: Booking) -> Self {
        Self {
            change_id: Uuid::new_v4(),
            kind: ChangeKind::Upsert,
            booking,
        }
    }

    pub fn delete(booking: Booking) -> Self {
        Self {
            change_id: Uuid::new_v4(),
            kind: ChangeKind::Delete,
            booking,
        }
    }
}

/// OData collection envelope (`{ "value": [...] }`).
#[derive(Debug, Deserialize)]
pub(crate) struct ODataCollection<T> {
    pub value: Vec<T>,
}
