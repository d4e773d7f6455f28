//! storage::source — dataset fetch; the only asynchronous boundary in the system
use std::path::Path;
use tracing::{debug, info};

use crate::records::RecordStore;

/// Read the dataset text and parse it, falling back to a header-only store when the
/// file cannot be read. Returns the store and whether the fetch succeeded.
pub async fn fetch_dataset(path: &Path) -> (RecordStore, bool) {
    debug!("fetching dataset from {}", path.display());
    settle(path, tokio::fs::read_to_string(path).await)
}

/// Same as [`fetch_dataset`] for callers without a runtime.
pub fn fetch_dataset_blocking(path: &Path) -> (RecordStore, bool) {
    settle(path, std::fs::read_to_string(path))
}

fn settle(path: &Path, fetched: std::io::Result<String>) -> (RecordStore, bool) {
    let ok = fetched.is_ok();
    let store = RecordStore::from_fetch(fetched.map_err(|e| format!("{}: {e}", path.display())));
    if ok { info!("loaded {} ticket(s) from {}", store.total(), path.display()); }
    (store, ok)
}
