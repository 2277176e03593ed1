use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/members", get(handlers::members_page))
        .route("/events/:event_id", get(handlers::event_page))
        .route("/events/:event_id/register", post(handlers::register_form))
        .route("/events/:event_id/cancel", post(handlers::cancel_form))
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/:event_id/slots", get(handlers::get_slots))
        .route(
            "/api/events/:event_id/reservations",
            get(handlers::get_reservations)
                .post(handlers::register)
                .delete(handlers::clear_reservations),
        )
        .route("/api/events/:event_id/cancel", post(handlers::cancel))
        .route("/api/events/:event_id/sync", post(handlers::sync_now))
        .with_state(state)
}
