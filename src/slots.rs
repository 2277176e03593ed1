use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SLOT_CAPACITY: usize = 2;

/// A bookable start time. Keys are accepted as `fri-9am`, `sat-930am` or
/// `sun-10:30am`; `key` always holds the colon-free form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: String,
    pub day: Weekday,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKeyError {
    Malformed(String),
    UnknownDay(String),
    BadTime(String),
}

impl fmt::Display for SlotKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(key) => write!(f, "slot key '{key}' must look like 'fri-9am'"),
            Self::UnknownDay(day) => write!(f, "unknown day token '{day}'"),
            Self::BadTime(time) => write!(f, "unparsable time token '{time}'"),
        }
    }
}

impl std::error::Error for SlotKeyError {}

impl Slot {
    pub fn parse(key: &str) -> Result<Self, SlotKeyError> {
        let raw = key.trim().to_ascii_lowercase();
        let (day_token, time_token) = raw
            .split_once('-')
            .ok_or_else(|| SlotKeyError::Malformed(raw.clone()))?;
        let day = parse_day(day_token)?;
        let time = parse_time(time_token)?;

        Ok(Self {
            key: canonical_key(day, time),
            day,
            time,
        })
    }

    pub fn same_start(&self, other: &Slot) -> bool {
        self.day == other.day && self.time == other.time
    }

    pub fn label(&self) -> String {
        format!("{} {}", day_name(self.day), self.time.format("%-I:%M %p"))
    }

    pub fn starts_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.time)
    }
}

/// How a slot is presented: computed on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotState {
    Available,
    OneLeft,
    Full,
    Passed,
}

impl SlotState {
    pub fn derive(booked: usize, passed: bool) -> Self {
        if passed {
            Self::Passed
        } else if booked >= SLOT_CAPACITY {
            Self::Full
        } else if booked + 1 == SLOT_CAPACITY {
            Self::OneLeft
        } else {
            Self::Available
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Available | Self::OneLeft => "available",
            Self::Full => "booked",
            Self::Passed => "passed",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Self::Available => "2 spots open",
            Self::OneLeft => "1 spot left",
            Self::Full => "Full",
            Self::Passed => "Time passed",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::OneLeft => "one-left",
            Self::Full => "full",
            Self::Passed => "passed",
        }
    }

    pub fn is_bookable(self) -> bool {
        matches!(self, Self::Available | Self::OneLeft)
    }
}

fn parse_day(token: &str) -> Result<Weekday, SlotKeyError> {
    match token {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        other => Err(SlotKeyError::UnknownDay(other.to_string())),
    }
}

pub fn day_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_time(token: &str) -> Result<NaiveTime, SlotKeyError> {
    let bad = || SlotKeyError::BadTime(token.to_string());

    let (digits, pm) = if let Some(rest) = token.strip_suffix("am") {
        (rest, false)
    } else if let Some(rest) = token.strip_suffix("pm") {
        (rest, true)
    } else {
        return Err(bad());
    };

    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    let (hour, minute) = if digits.len() <= 2 {
        (digits.as_str(), "0")
    } else {
        digits.split_at(digits.len() - 2)
    };
    let hour: u32 = hour.parse().map_err(|_| bad())?;
    let minute: u32 = minute.parse().map_err(|_| bad())?;
    if !(1..=12).contains(&hour) {
        return Err(bad());
    }

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(bad)
}

/// `fri-9am`, `fri-930am`, `sat-12pm`: one spelling per start time.
pub fn canonical_key(day: Weekday, time: NaiveTime) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    let (hour12, suffix) = match hour {
        0 => (12, "am"),
        1..=11 => (hour, "am"),
        12 => (12, "pm"),
        h => (h - 12, "pm"),
    };
    if minute == 0 {
        format!("{}-{hour12}{suffix}", day_token(day))
    } else {
        format!("{}-{hour12}{minute:02}{suffix}", day_token(day))
    }
}

/// Rewrites any accepted spelling of a key into its canonical form; keys that
/// do not parse come back unchanged.
pub fn normalize_key(key: &str) -> String {
    Slot::parse(key).map_or_else(|_| key.to_string(), |slot| slot.key)
}

/// Keys for `count` consecutive half-hour slots starting at `start_hour`
/// (24h clock) on `day`.
pub fn half_hour_keys(day: Weekday, start_hour: u32, count: u32) -> Vec<String> {
    (0..count)
        .filter_map(|step| {
            let minutes = start_hour * 60 + step * 30;
            NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        })
        .map(|time| canonical_key(day, time))
        .collect()
}
