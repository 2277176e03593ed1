use crate::catalog::{Catalog, Event};
use crate::config::Config;
use crate::errors::AppError;
use crate::ledger::Ledger;
use crate::remote::RemoteClient;
use crate::storage::{ledger_path, load_ledger};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

/// One event together with its ledger and the file that backs it.
pub struct EventBook {
    pub event: Event,
    pub path: PathBuf,
    pub ledger: Mutex<Ledger>,
}

#[derive(Clone)]
pub struct AppState {
    pub books: Arc<Vec<EventBook>>,
    pub remote: Option<RemoteClient>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(books: Vec<EventBook>, remote: Option<RemoteClient>, admin_token: Option<String>) -> Self {
        Self {
            books: Arc::new(books),
            remote,
            admin_token: admin_token.map(Arc::from),
        }
    }

    pub async fn load(config: &Config, catalog: Catalog, remote: Option<RemoteClient>) -> Self {
        let mut books = Vec::with_capacity(catalog.events.len());
        for event in catalog.events {
            let path = ledger_path(&config.data_dir, &event.storage_key);
            let ledger = load_ledger(&path).await;
            info!(
                event = %event.id,
                reservations = ledger.total(),
                path = %path.display(),
                "ledger loaded"
            );
            books.push(EventBook {
                event,
                path,
                ledger: Mutex::new(ledger),
            });
        }

        Self::new(books, remote, config.admin_token.clone())
    }

    pub fn book(&self, event_id: &str) -> Result<&EventBook, AppError> {
        self.books
            .iter()
            .find(|book| book.event.id == event_id)
            .ok_or_else(|| AppError::not_found(format!("unknown event '{event_id}'")))
    }

    pub fn is_admin(&self, presented: Option<&str>) -> bool {
        match (self.admin_token.as_deref(), presented) {
            (Some(expected), Some(given)) => expected == given.trim(),
            _ => false,
        }
    }
}
