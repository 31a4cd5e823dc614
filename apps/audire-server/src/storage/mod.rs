//! Temp-area document storage
//!
//! Uploads are written to the temp directory as `{document_id}_{filename}`
//! and registered in an in-memory session map. Exports find their source
//! by id, or by the most recently modified file carrying the filename
//! when no id is given. A background reaper removes files past their TTL.

mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use types::{StorageError, StoredDocument};

// ============================================================================
// Document Store
// ============================================================================

/// Uploaded documents awaiting export
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

struct DocumentStoreInner {
    temp_dir: PathBuf,
    /// Uploads of this process, by id
    sessions: RwLock<HashMap<Uuid, StoredDocument>>,
}

/// Reduce a client-supplied filename to a bare, safe file name
pub fn sanitize_filename(name: &str) -> Result<String, StorageError> {
    let leaf = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = leaf.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(StorageError::InvalidFilename(name.to_string()));
    }
    Ok(cleaned.to_string())
}

impl DocumentStore {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DocumentStoreInner {
                temp_dir: temp_dir.into(),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.inner.temp_dir
    }

    // ========================================================================
    // Upload / Lookup
    // ========================================================================

    /// Copy an upload into the temp area and register it
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<StoredDocument, StorageError> {
        let filename = sanitize_filename(filename)?;
        let id = Uuid::new_v4();

        tokio::fs::create_dir_all(&self.inner.temp_dir).await?;
        let path = self
            .inner
            .temp_dir
            .join(StoredDocument::stored_name(id, &filename));
        tokio::fs::write(&path, data).await?;

        let document = StoredDocument {
            id,
            original_filename: filename,
            path,
            size: data.len() as u64,
            created_at: Utc::now(),
        };

        self.inner
            .sessions
            .write()
            .await
            .insert(id, document.clone());

        tracing::debug!(
            document_id = %id,
            filename = %document.original_filename,
            size = document.size,
            "Stored upload"
        );

        Ok(document)
    }

    /// Registered upload by id, if its file still exists
    pub async fn get(&self, id: Uuid) -> Option<StoredDocument> {
        let document = self.inner.sessions.read().await.get(&id).cloned()?;
        tokio::fs::metadata(&document.path)
            .await
            .is_ok()
            .then_some(document)
    }

    /// Find the source of an export
    ///
    /// With an id, only that upload qualifies (files left by an earlier
    /// process are found on disk). Without one, the most recently modified
    /// `*_{filename}` wins.
    pub async fn resolve(
        &self,
        document_id: Option<&str>,
        filename: &str,
    ) -> Result<StoredDocument, StorageError> {
        match document_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| StorageError::NotFound(format!("document {}", raw)))?;
                if let Some(document) = self.get(id).await {
                    return Ok(document);
                }
                self.scan(|doc_id, _| doc_id == id)
                    .await?
                    .ok_or_else(|| StorageError::NotFound(format!("document {}", raw)))
            }
            None => {
                let filename = sanitize_filename(filename)?;
                self.scan(|_, name| name == filename)
                    .await?
                    .ok_or_else(|| StorageError::NotFound(filename.clone()))
            }
        }
    }

    /// Most recently modified stored file matching `keep`
    async fn scan<F>(&self, keep: F) -> Result<Option<StoredDocument>, StorageError>
    where
        F: Fn(Uuid, &str) -> bool,
    {
        let mut entries = match tokio::fs::read_dir(&self.inner.temp_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut best: Option<(SystemTime, StoredDocument)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some((id, original)) = StoredDocument::parse_stored_name(&name) else {
                continue;
            };
            if !keep(id, original) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if best.as_ref().map_or(true, |(t, _)| modified > *t) {
                best = Some((
                    modified,
                    StoredDocument {
                        id,
                        original_filename: original.to_string(),
                        path: entry.path(),
                        size: meta.len(),
                        created_at: chrono::DateTime::<Utc>::from(modified),
                    },
                ));
            }
        }

        Ok(best.map(|(_, document)| document))
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Delete temp files older than `ttl` and forget their sessions
    ///
    /// Returns the number of files removed
    pub async fn reap(&self, ttl: Duration) -> Result<usize, StorageError> {
        let now = SystemTime::now();
        let mut expired = Vec::new();

        match tokio::fs::read_dir(&self.inner.temp_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let meta = entry.metadata().await?;
                    if !meta.is_file() {
                        continue;
                    }
                    let age = meta
                        .modified()
                        .ok()
                        .and_then(|m| now.duration_since(m).ok())
                        .unwrap_or_default();
                    if age > ttl {
                        expired.push(entry.path());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        }

        let mut removed = 0;
        for path in &expired {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired upload"),
            }
        }

        // Sessions whose file is gone, whoever removed it
        {
            let mut sessions = self.inner.sessions.write().await;
            sessions.retain(|_, document| !expired.contains(&document.path) && document.path.exists());
        }

        if removed > 0 {
            tracing::info!(count = removed, "Reaped expired uploads");
        }

        Ok(removed)
    }

    /// Start the background reaper
    pub fn start_reaper(self, interval: Duration, ttl: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.reap(ttl).await {
                    tracing::warn!(error = %e, "Upload reaper failed");
                }
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
