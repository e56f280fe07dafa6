//! Generated artifacts on disk: content directory keyed by generated id,
//! size/creation metadata for the share endpoint, and a pure age-based
//! retention sweep.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use crate::error::{VersereelError, VersereelResult};

/// What the metadata/share operation reports for one artifact.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ArtifactMeta {
    pub id: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created: DateTime<Utc>,
}

pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> VersereelResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create output directory '{}'", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a fresh artifact id and its on-disk path.
    pub fn allocate(&self) -> (String, PathBuf) {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self.root.join(format!("{id}.mp4"));
        (id, path)
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.mp4"))
    }

    pub fn metadata(&self, id: &str) -> VersereelResult<ArtifactMeta> {
        let path = self.path_for(id);
        let meta = std::fs::metadata(&path).map_err(|_| {
            VersereelError::validation(format!("no artifact with id '{id}'"))
        })?;
        let modified = meta
            .modified()
            .with_context(|| format!("read mtime of '{}'", path.display()))?;
        Ok(ArtifactMeta {
            id: id.to_string(),
            path,
            size_bytes: meta.len(),
            created: DateTime::<Utc>::from(modified),
        })
    }

    /// Delete artifacts older than `max_age`, returning how many were
    /// removed. Age is the only criterion.
    pub fn sweep_older_than(&self, max_age: chrono::Duration) -> VersereelResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0usize;

        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("list output directory '{}'", self.root.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| "read output directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if DateTime::<Utc>::from(modified) < cutoff {
                std::fs::remove_file(&path)
                    .with_context(|| format!("remove expired artifact '{}'", path.display()))?;
                tracing::info!(path = %path.display(), "removed expired artifact");
                removed += 1;
            }
        }
        Ok(removed)
    }
}
