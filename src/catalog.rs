use crate::slots::{Slot, SlotKeyError, day_name, half_hour_keys};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, path::Path};
use tokio::fs;
use tracing::info;

/// On-disk shape of one event, as read from `SWIM_EVENTS_PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfig {
    pub id: String,
    pub label: String,
    pub location: String,
    pub storage_key: String,
    pub remote_action: String,
    pub dates: Vec<NaiveDate>,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub label: String,
    pub location: String,
    pub storage_key: String,
    pub remote_action: String,
    pub dates: Vec<NaiveDate>,
    pub slots: Vec<Slot>,
}

impl Event {
    pub fn from_config(config: EventConfig) -> Result<Self, CatalogError> {
        let valid_key = !config.storage_key.is_empty()
            && config
                .storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_key {
            return Err(CatalogError::BadStorageKey(config.storage_key));
        }

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(config.slots.len());
        for key in &config.slots {
            let slot = Slot::parse(key).map_err(|err| CatalogError::Slot(config.id.clone(), err))?;
            if !config.dates.iter().any(|date| date.weekday() == slot.day) {
                return Err(CatalogError::NoDateForDay(config.id.clone(), slot.day));
            }
            if !seen.insert(slot.key.clone()) {
                return Err(CatalogError::DuplicateSlot(config.id.clone(), slot.key));
            }
            slots.push(slot);
        }

        Ok(Self {
            id: config.id,
            label: config.label,
            location: config.location,
            storage_key: config.storage_key,
            remote_action: config.remote_action,
            dates: config.dates,
            slots,
        })
    }

    /// Looks a slot up by any accepted spelling of its key.
    pub fn slot(&self, key: &str) -> Option<&Slot> {
        let wanted = Slot::parse(key).ok()?;
        self.slots.iter().find(|slot| slot.same_start(&wanted))
    }

    pub fn starts_at(&self, slot: &Slot) -> Option<NaiveDateTime> {
        self.dates
            .iter()
            .find(|date| date.weekday() == slot.day)
            .map(|date| slot.starts_at(*date))
    }

    /// Strictly after the start instant; a slot starting exactly now is
    /// still open.
    pub fn is_passed(&self, slot: &Slot, now: NaiveDateTime) -> bool {
        self.starts_at(slot).is_some_and(|start| now > start)
    }

    pub fn date_labels(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|date| format!("{} {}", day_name(date.weekday()), date.format("%B %-d, %Y")))
            .collect()
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Empty,
    DuplicateEvent(String),
    BadStorageKey(String),
    Slot(String, SlotKeyError),
    DuplicateSlot(String, String),
    NoDateForDay(String, Weekday),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read events file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse events file: {err}"),
            Self::Empty => write!(f, "events file lists no events"),
            Self::DuplicateEvent(id) => write!(f, "event id '{id}' appears twice"),
            Self::BadStorageKey(key) => write!(f, "storage key '{key}' is not a plain file stem"),
            Self::Slot(id, err) => write!(f, "event '{id}': {err}"),
            Self::DuplicateSlot(id, key) => write!(f, "event '{id}': slot '{key}' appears twice"),
            Self::NoDateForDay(id, day) => {
                write!(f, "event '{id}': no calendar date falls on {}", day_name(*day))
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub events: Vec<Event>,
}

impl Catalog {
    pub fn from_configs(configs: Vec<EventConfig>) -> Result<Self, CatalogError> {
        if configs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut ids = HashSet::new();
        let mut events = Vec::with_capacity(configs.len());
        for config in configs {
            if !ids.insert(config.id.clone()) {
                return Err(CatalogError::DuplicateEvent(config.id));
            }
            events.push(Event::from_config(config)?);
        }

        Ok(Self { events })
    }

    pub async fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            return Self::from_configs(default_configs());
        };

        let bytes = fs::read(path).await.map_err(CatalogError::Io)?;
        let configs: Vec<EventConfig> = serde_json::from_slice(&bytes).map_err(CatalogError::Parse)?;
        let catalog = Self::from_configs(configs)?;
        info!(path = %path.display(), events = catalog.events.len(), "loaded event catalog");
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }
}

/// The two events the site ships with.
pub fn default_configs() -> Vec<EventConfig> {
    let mut weekend_slots = half_hour_keys(Weekday::Fri, 9, 12);
    weekend_slots.extend(half_hour_keys(Weekday::Sat, 9, 12));

    vec![
        EventConfig {
            id: "event1".into(),
            label: "Fall Splash Weekend".into(),
            location: "Main Street Community Pool".into(),
            storage_key: "swimReservations".into(),
            remote_action: "getReservations".into(),
            dates: vec![date(2026, 11, 13), date(2026, 11, 14)],
            slots: weekend_slots,
        },
        EventConfig {
            id: "event2".into(),
            label: "California Splash Day".into(),
            location: "Pasadena, CA".into(),
            storage_key: "swimReservationsCA".into(),
            remote_action: "getReservationsCA".into(),
            dates: vec![date(2026, 12, 5)],
            slots: half_hour_keys(Weekday::Sat, 9, 12),
        },
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
