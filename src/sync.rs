use crate::remote::RemoteError;
use crate::state::{AppState, EventBook};
use crate::storage::persist_ledger;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Fetches the event's remote reservations and unions them into the local
/// ledger. The fetch happens outside the ledger lock. Returns the number of
/// records appended; always `0` when no remote endpoint is configured.
pub async fn sync_event(state: &AppState, book: &EventBook) -> Result<usize, RemoteError> {
    let Some(remote) = state.remote.as_ref() else {
        debug!(event = %book.event.id, "remote sync skipped: no endpoint configured");
        return Ok(0);
    };

    let incoming = remote.fetch_reservations(&book.event.remote_action).await?;

    let mut ledger = book.ledger.lock().await;
    let appended = ledger.merge(incoming);
    for (key, count) in ledger.overbooked() {
        warn!(event = %book.event.id, slot = key, count, "slot holds more bookings than capacity after merge");
    }

    if appended > 0 {
        if let Err(err) = persist_ledger(&book.path, &ledger).await {
            warn!(event = %book.event.id, "failed to persist merged ledger: {}", err.message);
        }
        info!(event = %book.event.id, appended, "merged remote reservations");
    }

    Ok(appended)
}

/// Syncs every event, logging failures and carrying on with local data.
pub async fn sync_all(state: &AppState) {
    for book in state.books.iter() {
        if let Err(err) = sync_event(state, book).await {
            warn!(event = %book.event.id, "remote sync failed, continuing with local data: {err}");
        }
    }
}

/// Runs `sync_all` immediately and then every `every`.
pub fn spawn_periodic_sync(state: AppState, every: Duration) -> Option<JoinHandle<()>> {
    state.remote.as_ref()?;

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sync_all(&state).await;
        }
    }))
}
