//! Registration and cancellation rules over an explicitly passed ledger.
//!
//! Callers hold the event's ledger lock for the whole check-then-mutate
//! sequence and persist afterwards.

use crate::catalog::Event;
use crate::ledger::{CancelBy, Ledger, LedgerError};
use crate::models::{CancelRequest, RegistrationRequest, Reservation, SlotView};
use crate::slots::{SLOT_CAPACITY, Slot, SlotState};
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat};

pub fn slot_views(event: &Event, ledger: &Ledger, now: NaiveDateTime) -> Vec<SlotView> {
    event
        .slots
        .iter()
        .map(|slot| {
            let booked = ledger.count(&slot.key);
            SlotView {
                key: slot.key.clone(),
                label: slot.label(),
                booked,
                remaining: SLOT_CAPACITY.saturating_sub(booked),
                state: SlotState::derive(booked, event.is_passed(slot, now)),
            }
        })
        .collect()
}

/// Resolves `key` and confirms it can take one more booking right now.
pub fn check_available<'a>(
    event: &'a Event,
    ledger: &Ledger,
    key: &str,
    now: NaiveDateTime,
) -> Result<&'a Slot, LedgerError> {
    let slot = event
        .slot(key)
        .ok_or_else(|| LedgerError::UnknownSlot(key.trim().to_string()))?;

    if event.is_passed(slot, now) {
        return Err(LedgerError::SlotPassed(slot.label()));
    }
    if !ledger.has_room(&slot.key) {
        return Err(LedgerError::SlotFull(slot.label()));
    }
    Ok(slot)
}

pub fn is_available(event: &Event, ledger: &Ledger, key: &str, now: NaiveDateTime) -> bool {
    check_available(event, ledger, key, now).is_ok()
}

pub fn register(
    event: &Event,
    ledger: &mut Ledger,
    request: RegistrationRequest,
    now: DateTime<Local>,
) -> Result<Reservation, LedgerError> {
    if request.slot.trim().is_empty() {
        return Err(LedgerError::MissingField("time slot"));
    }
    let child_name = required(request.child_name, "child name")?;
    let phone = required(request.phone, "phone")?;

    let slot = check_available(event, ledger, &request.slot, now.naive_local())?;

    let location = optional(request.location).unwrap_or_else(|| event.location.clone());
    let reservation = Reservation {
        child_name,
        age: request.age.trim().to_string(),
        swimming_level: request.swimming_level.trim().to_string(),
        goals: request.goals.trim().to_string(),
        phone,
        email: optional(request.email),
        location,
        additional_info: optional(request.additional_info),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, false),
        time_slot: slot.label(),
        event: Some(event.label.clone()),
    };

    ledger.reserve(&slot.key, reservation.clone())?;
    Ok(reservation)
}

/// Owner cancellation needs child name and email; index cancellation needs
/// `is_admin`.
pub fn cancel(
    event: &Event,
    ledger: &mut Ledger,
    request: CancelRequest,
    is_admin: bool,
) -> Result<Reservation, LedgerError> {
    let slot = event
        .slot(&request.slot)
        .ok_or_else(|| LedgerError::UnknownSlot(request.slot.trim().to_string()))?;

    let by = match request.index {
        Some(_) if !is_admin => return Err(LedgerError::NotAuthorized),
        Some(index) => CancelBy::Index(index),
        None => CancelBy::Owner {
            child_name: required(request.child_name, "child name")?,
            email: required(request.email, "email")?,
        },
    };

    ledger.cancel(&slot.key, &by)
}

fn required(value: String, field: &'static str) -> Result<String, LedgerError> {
    optional(value).ok_or(LedgerError::MissingField(field))
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
