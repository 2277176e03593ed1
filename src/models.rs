use crate::slots::SlotState;
use serde::{Deserialize, Deserializer, Serialize};

/// One family's booking for a slot, in the shape shared by the persisted
/// ledger files and the remote spreadsheet endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub child_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub age: String,
    #[serde(default)]
    pub swimming_level: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub time_slot: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub event: Option<String>,
}

impl Reservation {
    /// Two records with the same child and slot label are the same booking
    /// as far as merging is concerned.
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.child_name.as_str(), self.time_slot.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default)]
    pub slot: String,
    #[serde(default)]
    pub child_name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub swimming_level: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub additional_info: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub slot: String,
    #[serde(default)]
    pub child_name: String,
    #[serde(default)]
    pub email: String,
    pub index: Option<usize>,
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotView {
    pub key: String,
    pub label: String,
    pub booked: usize,
    pub remaining: usize,
    pub state: SlotState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub event: String,
    pub label: String,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: String,
    pub label: String,
    pub location: String,
    pub dates: Vec<String>,
    pub slot_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub message: String,
    pub reservation: Reservation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub remote_enabled: bool,
    pub appended: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty()))
}
