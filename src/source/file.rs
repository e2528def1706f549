//! File-based source.
//!
//! Reads a JSON fleet file holding snapshots and pre-aggregated series.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use fleetwatch_types::SeriesBundle;
use parking_lot::Mutex;
use tracing::debug;

use super::{FleetFile, Reducer, SeriesAggregator, SnapshotSet, SnapshotSource};
use crate::error::{Error, Result};

/// A source that reads snapshots and series from a JSON fleet file.
///
/// The parsed file is kept alongside its modification time and only
/// re-read when the file has been updated, so calling both `latest` and
/// `series` during one recompute parses the file once.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    loaded: Mutex<Option<Loaded>>,
}

#[derive(Debug)]
struct Loaded {
    modified: Option<SystemTime>,
    file: Arc<FleetFile>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            loaded: Mutex::new(None),
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file, reusing the previous parse if it has not changed.
    async fn load(&self) -> Result<Arc<FleetFile>> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok());

        {
            let loaded = self.loaded.lock();
            if let Some(loaded) = loaded.as_ref() {
                if modified.is_some() && loaded.modified == modified {
                    return Ok(loaded.file.clone());
                }
            }
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let file: FleetFile = serde_json::from_str(&content)
            .map_err(|e| Error::Source(format!("{}: {}", self.path.display(), e)))?;
        let file = Arc::new(file);

        debug!(
            "Loaded {} snapshots from {}",
            file.snapshots.len(),
            self.path.display()
        );

        *self.loaded.lock() = Some(Loaded {
            modified,
            file: file.clone(),
        });
        Ok(file)
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn latest(&self, kind: &str) -> Result<SnapshotSet> {
        Ok(self.load().await?.snapshots(kind))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[async_trait]
impl SeriesAggregator for FileSource {
    async fn series(&self, metrics: &[&str], _reducer: Reducer) -> Result<SeriesBundle> {
        let mut bundle = self.load().await?.series.clone();
        bundle.retain_metrics(metrics);
        Ok(bundle)
    }
}
