use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ScheduleError;

/// Minutes in a full day; the effective end of a slot that runs to midnight.
pub const END_OF_DAY: u32 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekDay {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekDay {
    /// Case-insensitive lookup; underscores, hyphens and whitespace are
    /// stripped before matching. Anything else is an error, never a default.
    pub fn parse(input: &str) -> Result<WeekDay, ScheduleError> {
        let key: String = input
            .chars()
            .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "sunday" => Ok(WeekDay::Sunday),
            "monday" => Ok(WeekDay::Monday),
            "tuesday" => Ok(WeekDay::Tuesday),
            "wednesday" => Ok(WeekDay::Wednesday),
            "thursday" => Ok(WeekDay::Thursday),
            "friday" => Ok(WeekDay::Friday),
            "saturday" => Ok(WeekDay::Saturday),
            _ => Err(ScheduleError::InvalidDay(input.to_string())),
        }
    }

    /// Sunday = 0 … Saturday = 6, matching the UTC day-of-week convention.
    pub fn index(self) -> usize {
        match self {
            WeekDay::Sunday => 0,
            WeekDay::Monday => 1,
            WeekDay::Tuesday => 2,
            WeekDay::Wednesday => 3,
            WeekDay::Thursday => 4,
            WeekDay::Friday => 5,
            WeekDay::Saturday => 6,
        }
    }

    pub fn from_index(index: usize) -> Option<WeekDay> {
        match index {
            0 => Some(WeekDay::Sunday),
            1 => Some(WeekDay::Monday),
            2 => Some(WeekDay::Tuesday),
            3 => Some(WeekDay::Wednesday),
            4 => Some(WeekDay::Thursday),
            5 => Some(WeekDay::Friday),
            6 => Some(WeekDay::Saturday),
            _ => None,
        }
    }

    pub fn previous(self) -> WeekDay {
        WeekDay::from_index((self.index() + 6) % 7).unwrap_or(WeekDay::Saturday)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeekDay::Sunday => "Sunday",
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
        }
    }
}

/// A wall-clock time with minute precision, stored as minutes since midnight
/// UTC (0–1439).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Strict `HH:mm` first; falls back to extracting the UTC hour/minute
    /// from a full datetime string (legacy payloads stored whole instants).
    pub fn parse(input: &str) -> Result<TimeOfDay, ScheduleError> {
        let trimmed = input.trim();

        if let Some((h, m)) = trimmed.split_once(':') {
            if (1..=2).contains(&h.len()) && m.len() == 2 {
                if let (Ok(hour), Ok(minute)) = (h.parse::<u16>(), m.parse::<u16>()) {
                    if hour <= 23 && minute <= 59 {
                        return Ok(TimeOfDay(hour * 60 + minute));
                    }
                }
            }
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
            let utc = dt.naive_utc();
            return Ok(TimeOfDay::from_naive(&utc));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(TimeOfDay::from_naive(&dt));
            }
        }

        Err(ScheduleError::InvalidTimeFormat(input.to_string()))
    }

    fn from_naive(dt: &chrono::NaiveDateTime) -> TimeOfDay {
        use chrono::Timelike;
        TimeOfDay((dt.hour() * 60 + dt.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Zero-padded `HH:mm` for a stored minute-of-day value.
pub fn format_minutes(minutes: u16) -> String {
    let m = minutes % 1440;
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// A stored weekly availability slot. `day` is text in the store; rows we
/// write carry the canonical capitalized name, but legacy rows may not.
#[derive(Debug, Clone)]
pub struct AvailabilitySlot {
    pub id: String,
    pub tutor_id: String,
    pub day: String,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl AvailabilitySlot {
    /// Closed-open minute range. An end of `00:00` with a later start is the
    /// legacy serialization of "until midnight" and reads as 1440; it is not
    /// a general wraparound.
    pub fn effective_range(&self) -> (u32, u32) {
        effective_range(self.start_minute, self.end_minute)
    }

    /// Sort key for listings: canonical days in week order, anything
    /// unrecognizable after them.
    pub fn day_index(&self) -> usize {
        WeekDay::parse(&self.day).map(|d| d.index()).unwrap_or(7)
    }

    /// Bucket key for per-day overlap checks, tolerant of legacy day text.
    pub fn day_key(&self) -> String {
        match WeekDay::parse(&self.day) {
            Ok(day) => day.as_str().to_lowercase(),
            Err(_) => self.day.trim().to_lowercase(),
        }
    }
}

pub fn effective_range(start_minute: u16, end_minute: u16) -> (u32, u32) {
    let start = start_minute as u32;
    let end = end_minute as u32;
    if end == 0 && start > 0 {
        (start, END_OF_DAY)
    } else {
        (start, end)
    }
}

/// A slot from a batch payload after day/time normalization. Start and end
/// keep the minute values as given; comparisons go through `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSlot {
    pub day: WeekDay,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl NormalizedSlot {
    pub fn range(&self) -> (u32, u32) {
        effective_range(self.start_minute, self.end_minute)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub day: String,
    #[serde(alias = "startTime")]
    pub start_time: String,
    #[serde(alias = "endTime")]
    pub end_time: String,
}

/// Availability payloads accept a single slot object or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SlotBatch {
    One(SlotInput),
    Many(Vec<SlotInput>),
}

impl SlotBatch {
    pub fn into_vec(self) -> Vec<SlotInput> {
        match self {
            SlotBatch::One(slot) => vec![slot],
            SlotBatch::Many(slots) => slots,
        }
    }
}

/// Partial update for one slot. Built from raw JSON so that unknown keys are
/// rejected explicitly instead of silently dropped.
#[derive(Debug, Clone, Default)]
pub struct SlotPatch {
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl SlotPatch {
    pub fn from_value(value: &Value) -> Result<SlotPatch, ScheduleError> {
        let map = value
            .as_object()
            .ok_or_else(|| ScheduleError::InvalidField("(body must be an object)".to_string()))?;

        let mut patch = SlotPatch::default();
        for (key, val) in map {
            let text = val
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| ScheduleError::InvalidField(key.clone()))?;
            match key.as_str() {
                "day" => patch.day = Some(text),
                "start_time" | "startTime" => patch.start_time = Some(text),
                "end_time" | "endTime" => patch.end_time = Some(text),
                other => return Err(ScheduleError::InvalidField(other.to_string())),
            }
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }
}

/// External form of a slot: canonical day name, zero-padded `HH:mm` times.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<&AvailabilitySlot> for SlotView {
    fn from(slot: &AvailabilitySlot) -> SlotView {
        let day = match WeekDay::parse(&slot.day) {
            Ok(d) => d.as_str().to_string(),
            Err(_) => slot.day.clone(),
        };
        SlotView {
            id: slot.id.clone(),
            day,
            start_time: format_minutes(slot.start_minute),
            end_time: format_minutes(slot.end_minute),
        }
    }
}
