use crate::ledger::Ledger;
use crate::models::Reservation;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum RemoteError {
    Http(reqwest::Error),
    Endpoint(String),
    UnexpectedShape(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "remote request failed: {err}"),
            Self::Endpoint(message) => write!(f, "remote endpoint reported an error: {message}"),
            Self::UnexpectedShape(detail) => write!(f, "unexpected remote response: {detail}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

/// Client for the spreadsheet-backed endpoint that acts as system of record.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationForm<'a> {
    event: &'a str,
    child_name: &'a str,
    age: &'a str,
    swimming_level: &'a str,
    goals: &'a str,
    phone: &'a str,
    email: &'a str,
    location: &'a str,
    additional_info: &'a str,
    time_slot: &'a str,
    timestamp: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancellationForm<'a> {
    action: &'static str,
    event: &'a str,
    child_name: &'a str,
    email: &'a str,
    time_slot: &'a str,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch_reservations(&self, action: &str) -> Result<Ledger, RemoteError> {
        let body: Value = self
            .http
            .get(&self.base_url)
            .query(&[("action", action)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_reservations(body)
    }

    pub async fn submit_registration(
        &self,
        event: &str,
        reservation: &Reservation,
    ) -> Result<(), RemoteError> {
        let form = RegistrationForm {
            event,
            child_name: &reservation.child_name,
            age: &reservation.age,
            swimming_level: &reservation.swimming_level,
            goals: &reservation.goals,
            phone: &reservation.phone,
            email: reservation.email.as_deref().unwrap_or_default(),
            location: &reservation.location,
            additional_info: reservation.additional_info.as_deref().unwrap_or_default(),
            time_slot: &reservation.time_slot,
            timestamp: &reservation.timestamp,
        };

        self.http
            .post(&self.base_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        debug!(event, child = %reservation.child_name, "registration forwarded");
        Ok(())
    }

    /// Returns whether the endpoint confirmed with `{"result": "cancelled"}`.
    pub async fn submit_cancellation(
        &self,
        event: &str,
        reservation: &Reservation,
    ) -> Result<bool, RemoteError> {
        let form = CancellationForm {
            action: "cancel",
            event,
            child_name: &reservation.child_name,
            email: reservation.email.as_deref().unwrap_or_default(),
            time_slot: &reservation.time_slot,
        };

        let text = self
            .http
            .post(&self.base_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let confirmed = cancellation_confirmed(&text);
        if !confirmed {
            warn!(event, child = %reservation.child_name, "cancellation not confirmed by remote: {text}");
        }
        Ok(confirmed)
    }
}

/// Accepts `{success: true, reservations: {...}}`; `{error: "..."}` and
/// anything else is rejected without touching local state.
pub fn parse_reservations(body: Value) -> Result<Ledger, RemoteError> {
    if let Some(message) = body.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(RemoteError::Endpoint(message));
    }

    if body.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(RemoteError::UnexpectedShape("missing success flag".into()));
    }

    let reservations = body
        .get("reservations")
        .filter(|value| value.is_object())
        .cloned()
        .ok_or_else(|| RemoteError::UnexpectedShape("reservations is not an object".into()))?;

    serde_json::from_value(reservations).map_err(|err| RemoteError::UnexpectedShape(err.to_string()))
}

fn cancellation_confirmed(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| value.get("result").and_then(Value::as_str).map(str::to_string))
        .is_some_and(|result| result == "cancelled")
}
