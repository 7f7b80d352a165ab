//! Conversation history backends for voxloop.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use voxloop_core::error::HistoryError;
use voxloop_core::history::HistoryStore;

pub use file_backend::FileHistory;
pub use in_memory::InMemoryHistory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteHistory;

/// Open the named backend. `path` is ignored by the in-memory store.
pub async fn open_backend(
    backend: &str,
    path: &Path,
) -> Result<Arc<dyn HistoryStore>, HistoryError> {
    match backend {
        "memory" => Ok(Arc::new(InMemoryHistory::new())),
        "file" => Ok(Arc::new(FileHistory::new(path.to_path_buf()))),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HistoryError::Storage(format!("Failed to create history directory: {e}"))
                })?;
            }
            let url = format!("sqlite://{}", path.display());
            Ok(Arc::new(SqliteHistory::new(&url).await?))
        }
        other => Err(HistoryError::Storage(format!(
            "Unsupported history backend: {other}"
        ))),
    }
}
