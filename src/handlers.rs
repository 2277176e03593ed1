use crate::booking;
use crate::errors::AppError;
use crate::ledger::{Ledger, LedgerError};
use crate::models::{
    BookingResponse, CancelRequest, EventSummary, NoticeQuery, RegistrationRequest, Reservation,
    SlotsResponse, SyncResponse,
};
use crate::state::{AppState, EventBook};
use crate::storage::persist_ledger;
use crate::sync::sync_event;
use crate::ui::{EventPanel, render_page};
use crate::views::{MAIN_SECTION, MEMBERS_SECTION, ViewSwitcher};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, Redirect},
    Form, Json,
};
use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

const ADMIN_HEADER: &str = "x-admin-token";

pub async fn index(State(state): State<AppState>, Query(query): Query<NoticeQuery>) -> Html<String> {
    render_view(&state, MAIN_SECTION, query.notice.as_deref()).await
}

pub async fn event_page(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<NoticeQuery>,
) -> Html<String> {
    render_view(&state, &event_id, query.notice.as_deref()).await
}

pub async fn members_page(State(state): State<AppState>) -> Html<String> {
    render_view(&state, MEMBERS_SECTION, None).await
}

pub async fn list_events(State(state): State<AppState>) -> Json<Vec<EventSummary>> {
    let events = state
        .books
        .iter()
        .map(|book| EventSummary {
            id: book.event.id.clone(),
            label: book.event.label.clone(),
            location: book.event.location.clone(),
            dates: book.event.dates.iter().map(|date| date.to_string()).collect(),
            slot_count: book.event.slots.len(),
        })
        .collect();
    Json(events)
}

pub async fn get_slots(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<SlotsResponse>, AppError> {
    let book = state.book(&event_id)?;
    let ledger = book.ledger.lock().await;

    Ok(Json(SlotsResponse {
        event: book.event.id.clone(),
        label: book.event.label.clone(),
        slots: booking::slot_views(&book.event, &ledger, now()),
    }))
}

pub async fn get_reservations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Ledger>, AppError> {
    let book = state.book(&event_id)?;
    let ledger = book.ledger.lock().await;
    Ok(Json(ledger.clone()))
}

pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let book = state.book(&event_id)?;
    let reservation = apply_registration(&state, book, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            message: format!("{} is booked for {}", reservation.child_name, reservation.time_slot),
            reservation,
        }),
    ))
}

pub async fn register_form(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Form(payload): Form<RegistrationRequest>,
) -> Result<Redirect, AppError> {
    let book = state.book(&event_id)?;
    let notice = match apply_registration(&state, book, payload).await {
        Ok(_) => "registered",
        Err(Outcome::Rejected(err)) => err.code(),
        Err(Outcome::Failed(err)) => return Err(err),
    };
    Ok(Redirect::to(&format!("/events/{}?notice={notice}", book.event.id)))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let book = state.book(&event_id)?;
    let reservation = apply_cancellation(&state, book, payload).await?;

    Ok(Json(BookingResponse {
        message: format!(
            "{}'s reservation for {} was cancelled",
            reservation.child_name, reservation.time_slot
        ),
        reservation,
    }))
}

pub async fn cancel_form(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Form(payload): Form<CancelRequest>,
) -> Result<Redirect, AppError> {
    let book = state.book(&event_id)?;
    let notice = match apply_cancellation(&state, book, payload).await {
        Ok(_) => "cancelled",
        Err(Outcome::Rejected(err)) => err.code(),
        Err(Outcome::Failed(err)) => return Err(err),
    };
    Ok(Redirect::to(&format!("/events/{}?notice={notice}", book.event.id)))
}

pub async fn sync_now(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<SyncResponse>, AppError> {
    let book = state.book(&event_id)?;
    let appended = sync_event(&state, book).await.map_err(|err| {
        warn!(event = %book.event.id, "on-demand sync failed: {err}");
        AppError::bad_gateway(err.to_string())
    })?;

    Ok(Json(SyncResponse {
        remote_enabled: state.remote.is_some(),
        appended,
    }))
}

/// The "clear all" maintenance action.
pub async fn clear_reservations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let book = state.book(&event_id)?;
    let presented = headers.get(ADMIN_HEADER).and_then(|value| value.to_str().ok());
    if !state.is_admin(presented) {
        return Err(LedgerError::NotAuthorized.into());
    }

    let mut ledger = book.ledger.lock().await;
    let mut draft = ledger.clone();
    let removed = draft.clear();
    persist_ledger(&book.path, &draft).await?;
    *ledger = draft;
    warn!(event = %book.event.id, removed, "ledger cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Keeps rule violations apart from infrastructure failures so the form
/// routes can turn the former into a notice.
enum Outcome {
    Rejected(LedgerError),
    Failed(AppError),
}

impl From<Outcome> for AppError {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Rejected(err) => err.into(),
            Outcome::Failed(err) => err,
        }
    }
}

/// Rule checks and the file write both run against a draft; the shared
/// ledger only changes once the write has succeeded.
async fn apply_registration(
    state: &AppState,
    book: &EventBook,
    payload: RegistrationRequest,
) -> Result<Reservation, Outcome> {
    let reservation = {
        let mut ledger = book.ledger.lock().await;
        let mut draft = ledger.clone();
        let reservation =
            booking::register(&book.event, &mut draft, payload, Local::now()).map_err(Outcome::Rejected)?;
        persist_ledger(&book.path, &draft).await.map_err(Outcome::Failed)?;
        *ledger = draft;
        reservation
    };

    info!(
        event = %book.event.id,
        slot = %reservation.time_slot,
        child = %reservation.child_name,
        "reservation added"
    );

    if let Some(remote) = state.remote.clone() {
        let event_label = book.event.label.clone();
        let forwarded = reservation.clone();
        tokio::spawn(async move {
            if let Err(err) = remote.submit_registration(&event_label, &forwarded).await {
                warn!(event = %event_label, "failed to forward registration: {err}");
            }
        });
    }

    Ok(reservation)
}

async fn apply_cancellation(
    state: &AppState,
    book: &EventBook,
    payload: CancelRequest,
) -> Result<Reservation, Outcome> {
    let is_admin = state.is_admin(payload.admin_token.as_deref());
    let reservation = {
        let mut ledger = book.ledger.lock().await;
        let mut draft = ledger.clone();
        let reservation =
            booking::cancel(&book.event, &mut draft, payload, is_admin).map_err(Outcome::Rejected)?;
        persist_ledger(&book.path, &draft).await.map_err(Outcome::Failed)?;
        *ledger = draft;
        reservation
    };

    info!(
        event = %book.event.id,
        slot = %reservation.time_slot,
        child = %reservation.child_name,
        "reservation cancelled"
    );

    if let Some(remote) = state.remote.clone() {
        let event_label = book.event.label.clone();
        let forwarded = reservation.clone();
        tokio::spawn(async move {
            if let Err(err) = remote.submit_cancellation(&event_label, &forwarded).await {
                warn!(event = %event_label, "failed to forward cancellation: {err}");
            }
        });
    }

    Ok(reservation)
}

async fn render_view(state: &AppState, target: &str, notice: Option<&str>) -> Html<String> {
    let now = now();
    let mut panels = Vec::with_capacity(state.books.len());
    for book in state.books.iter() {
        let ledger = book.ledger.lock().await;
        panels.push(EventPanel {
            event: &book.event,
            slots: booking::slot_views(&book.event, &ledger, now),
        });
    }

    let switcher = ViewSwitcher::new(state.books.iter().map(|book| book.event.id.as_str()));
    Html(render_page(&switcher.show(target), &panels, notice))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
