use crate::models::Reservation;
use crate::slots::{SLOT_CAPACITY, normalize_key};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Slot key to reservations, each list in arrival order.
///
/// Serializes as a bare JSON object so persisted files and the remote
/// `reservations` payload share one format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    slots: BTreeMap<String, Vec<Reservation>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelBy {
    /// Child name and email must both match the stored record.
    Owner { child_name: String, email: String },
    /// Position in the slot's list. Callers gate this behind the admin token.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    UnknownSlot(String),
    SlotFull(String),
    SlotPassed(String),
    MissingField(&'static str),
    NotFound,
    EmailMismatch,
    NotAuthorized,
}

impl LedgerError {
    /// Short stable code used in redirect notices.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownSlot(_) => "unknown-slot",
            Self::SlotFull(_) => "full",
            Self::SlotPassed(_) => "passed",
            Self::MissingField(_) => "missing-field",
            Self::NotFound => "not-found",
            Self::EmailMismatch => "email-mismatch",
            Self::NotAuthorized => "not-authorized",
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot(key) => write!(f, "no time slot '{key}' for this event"),
            Self::SlotFull(label) => write!(f, "{label} is already full"),
            Self::SlotPassed(label) => write!(f, "{label} has already passed"),
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::NotFound => write!(f, "no matching reservation"),
            Self::EmailMismatch => write!(f, "email does not match the reservation"),
            Self::NotAuthorized => write!(f, "admin token required"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl Ledger {
    pub fn count(&self, key: &str) -> usize {
        self.slots.get(key).map_or(0, Vec::len)
    }

    pub fn has_room(&self, key: &str) -> bool {
        self.count(key) < SLOT_CAPACITY
    }

    pub fn reservations(&self, key: &str) -> &[Reservation] {
        self.slots.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Appends when the slot has room; returns the new count.
    pub fn reserve(&mut self, key: &str, reservation: Reservation) -> Result<usize, LedgerError> {
        if !self.has_room(key) {
            return Err(LedgerError::SlotFull(reservation.time_slot));
        }

        let list = self.slots.entry(key.to_string()).or_default();
        list.push(reservation);
        Ok(list.len())
    }

    pub fn cancel(&mut self, key: &str, by: &CancelBy) -> Result<Reservation, LedgerError> {
        let list = self.slots.get_mut(key).ok_or(LedgerError::NotFound)?;

        let index = match by {
            CancelBy::Index(index) if *index < list.len() => *index,
            CancelBy::Index(_) => return Err(LedgerError::NotFound),
            CancelBy::Owner { child_name, email } => {
                let mut named = list
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| same_text(&r.child_name, child_name))
                    .peekable();
                if named.peek().is_none() {
                    return Err(LedgerError::NotFound);
                }
                named
                    .find(|(_, r)| r.email.as_deref().is_some_and(|stored| same_text(stored, email)))
                    .map(|(index, _)| index)
                    .ok_or(LedgerError::EmailMismatch)?
            }
        };

        let removed = list.remove(index);
        if list.is_empty() {
            self.slots.remove(key);
        }
        Ok(removed)
    }

    /// Union with `remote`, keyed by `(child_name, time_slot)`. Nothing is
    /// removed and nothing already present is duplicated. Incoming slot keys
    /// are rewritten to their canonical spelling. Returns the number of
    /// records appended.
    pub fn merge(&mut self, remote: Ledger) -> usize {
        let mut appended = 0;
        for (key, incoming) in remote.slots {
            if incoming.is_empty() {
                continue;
            }
            let local = self.slots.entry(normalize_key(&key)).or_default();
            for reservation in incoming {
                if local
                    .iter()
                    .any(|existing| existing.dedup_key() == reservation.dedup_key())
                {
                    continue;
                }
                local.push(reservation);
                appended += 1;
            }
        }
        appended
    }

    /// Same records with every slot key in canonical spelling. Lists whose
    /// keys collapse onto one slot are merged.
    pub fn canonicalized(self) -> Ledger {
        let mut canonical = Ledger::default();
        canonical.merge(self);
        canonical
    }

    /// Slots holding more than capacity, which only merging can produce.
    pub fn overbooked(&self) -> impl Iterator<Item = (&str, usize)> {
        self.slots
            .iter()
            .filter(|(_, list)| list.len() > SLOT_CAPACITY)
            .map(|(key, list)| (key.as_str(), list.len()))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.total();
        self.slots.clear();
        removed
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
