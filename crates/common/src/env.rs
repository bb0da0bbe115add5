//! Environment/runtime helpers
//!
//! Sanity checks to ensure the storage files have somewhere to live at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the data directory and the parent directories of every backing file exist.
///
/// A backing file that does not exist yet is only reported; the stores treat a
/// missing file as an empty record set and create it on the first write.
pub async fn ensure_env(data_dir: &str, files: &[&str]) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    for file in files {
        if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
        }
        if tokio::fs::metadata(file).await.is_err() {
            warn!(%file, "backing file not found; starting with an empty record set");
        } else {
            info!(%file, "backing file found");
        }
    }
    Ok(())
}
