use crate::errors::AppError;
use crate::ledger::Ledger;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::error;

pub fn ledger_path(data_dir: &Path, storage_key: &str) -> PathBuf {
    data_dir.join(format!("{storage_key}.json"))
}

pub async fn load_ledger(path: &Path) -> Ledger {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Ledger>(&bytes) {
            Ok(ledger) => ledger.canonicalized(),
            Err(err) => {
                error!(path = %path.display(), "discarding unparsable ledger file: {err}");
                Ledger::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ledger::default(),
        Err(err) => {
            error!(path = %path.display(), "failed to read ledger file: {err}");
            Ledger::default()
        }
    }
}

pub async fn persist_ledger(path: &Path, ledger: &Ledger) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(ledger).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
