use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A committed slot on a detailer's calendar: the interval a `pending`
/// booking occupies. Intervals are half-open `[start, end)`, so a booking
/// ending at 10:00 and another starting at 10:00 sit back to back without
/// conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledSlot {
    pub booking_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl ScheduledSlot {
    /// Standard half-open overlap: `[s, e)` intersects `[start, end)` iff
    /// `s < end && e > start`. Touching boundaries do not intersect.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end && end > self.start
    }
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn format_time(t: &NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Serde adapter for wall-clock times as "HH:MM" strings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::format_time(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        super::parse_time(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid time (expected HH:MM): {s}")))
    }
}

/// Same as [`hhmm`] for optional fields.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, ser: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => ser.serialize_some(&super::format_time(t)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveTime>, D::Error> {
        let s: Option<String> = Option::deserialize(de)?;
        match s {
            Some(s) => super::parse_time(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time (expected HH:MM): {s}"))),
            None => Ok(None),
        }
    }
}
