//! Persistent cache store backed by an append-only JSON-lines log
//!
//! Every entry is one line in `<dir>/query_cache.jsonl`. On open the log is
//! replayed into an in-memory table; inserts append one line and fsync it
//! before the entry becomes visible to readers. Removals rewrite the log into
//! a temporary file that atomically replaces the old one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::table::EntryTable;
use crate::domain::query_cache::{
    CacheEntry, CacheStore, EntryId, ScopeFilter, ScoredEntry, SimilarityMetric,
};
use crate::domain::DomainError;

const LOG_FILE_NAME: &str = "query_cache.jsonl";
const TMP_FILE_NAME: &str = "query_cache.jsonl.tmp";

#[derive(Debug)]
struct LogState {
    table: EntryTable,
    writer: File,
    /// Byte length of the log up to the last complete record
    len: u64,
}

/// File-backed cache store
///
/// Single writer, many readers: the write guard is held across the durable
/// append so concurrent inserts serialize and readers only ever see
/// complete entries.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    state: RwLock<LogState>,
}

impl FileCacheStore {
    /// Open the store in `dir`, creating the directory and log if needed
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        Self::open_with_metric(dir, SimilarityMetric::default()).await
    }

    pub async fn open_with_metric(
        dir: impl AsRef<Path>,
        metric: SimilarityMetric,
    ) -> Result<Self, DomainError> {
        let dir = dir.as_ref().to_path_buf();

        fs::create_dir_all(&dir).await.map_err(|e| {
            DomainError::storage(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let log_path = dir.join(LOG_FILE_NAME);
        let (entries, torn_tail) = load_entries(&log_path).await?;

        let (writer, len) = if torn_tail {
            warn!(
                "Dropping incomplete trailing record in {}",
                log_path.display()
            );
            write_log(&dir, &entries).await?
        } else {
            let writer = open_writer(&log_path).await?;
            let len = file_len(&writer).await?;
            (writer, len)
        };

        if entries.is_empty() {
            info!("Creating new query cache at {}", dir.display());
        } else {
            info!(
                "Loaded existing query cache from {} ({} entries)",
                dir.display(),
                entries.len()
            );
        }

        Ok(Self {
            dir,
            state: RwLock::new(LogState {
                table: EntryTable::from_entries(entries, metric),
                writer,
                len,
            }),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Vector dimension of the stored entries, `None` while the store is empty
    pub async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.table.dimensions()
    }

    /// Rewrite the log with `table` and install it once the new log is in place
    ///
    /// On error both the in-memory table and the log are left as they were.
    async fn replace_table(
        &self,
        state: &mut LogState,
        table: EntryTable,
    ) -> Result<(), DomainError> {
        let (writer, len) = write_log(&self.dir, table.entries()).await?;

        debug!("Rewrote query cache log with {} entries", table.len());

        state.table = table;
        state.writer = writer;
        state.len = len;

        Ok(())
    }

    /// Cut the log back to the last complete record and reopen the writer
    async fn truncate_to_valid(&self, state: &mut LogState) -> Result<(), DomainError> {
        let log_path = self.log_path();
        let writer = open_writer(&log_path).await?;

        writer.set_len(state.len).await.map_err(|e| {
            DomainError::storage(format!("Failed to truncate {}: {}", log_path.display(), e))
        })?;
        state.writer = writer;

        Ok(())
    }

    /// Make sure the next append starts right after the last complete record
    async fn ensure_clean_tail(&self, state: &mut LogState) -> Result<(), DomainError> {
        let on_disk = file_len(&state.writer).await?;

        if on_disk > state.len {
            warn!(
                "Discarding {} bytes of incomplete record in {}",
                on_disk - state.len,
                self.log_path().display()
            );
            self.truncate_to_valid(state).await?;
        } else if on_disk < state.len {
            return Err(DomainError::storage(format!(
                "{} shrank from {} to {} bytes while open",
                self.log_path().display(),
                state.len,
                on_disk
            )));
        }

        Ok(())
    }
}

async fn file_len(file: &File) -> Result<u64, DomainError> {
    file.metadata()
        .await
        .map(|meta| meta.len())
        .map_err(|e| DomainError::storage(format!("Failed to stat query cache log: {}", e)))
}

async fn append_line(writer: &mut File, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    writer.sync_data().await
}

async fn load_entries(path: &Path) -> Result<(Vec<CacheEntry>, bool), DomainError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
        Err(e) => {
            return Err(DomainError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let complete = contents.ends_with('\n');
    let lines: Vec<&str> = contents.lines().collect();
    let mut entries = Vec::with_capacity(lines.len());
    let mut torn_tail = false;

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CacheEntry>(line) {
            Ok(entry) => entries.push(entry),
            // a crash mid-append leaves an unterminated last line
            Err(_) if idx + 1 == lines.len() && !complete => torn_tail = true,
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Corrupt record at {}:{}: {}",
                    path.display(),
                    idx + 1,
                    e
                )))
            }
        }
    }

    if let Some(first) = entries.first() {
        let expected = first.dimensions();
        if let Some(bad) = entries.iter().position(|e| e.dimensions() != expected) {
            return Err(DomainError::storage(format!(
                "Record {} in {} has dimension {}, expected {}",
                bad + 1,
                path.display(),
                entries[bad].dimensions(),
                expected
            )));
        }
    }

    Ok((entries, torn_tail))
}

async fn open_writer(path: &Path) -> Result<File, DomainError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to open {}: {}", path.display(), e)))
}

fn encode(entry: &CacheEntry) -> Result<String, DomainError> {
    let mut line = serde_json::to_string(entry)
        .map_err(|e| DomainError::storage(format!("Failed to serialize cache entry: {}", e)))?;
    line.push('\n');
    Ok(line)
}

/// Atomically replace the log with `entries`
///
/// Returns an append handle on the new log and its length. The handle is
/// opened before the rename so a successful return never leaves the caller
/// writing into the replaced file.
async fn write_log(dir: &Path, entries: &[CacheEntry]) -> Result<(File, u64), DomainError> {
    let tmp_path = dir.join(TMP_FILE_NAME);
    let log_path = dir.join(LOG_FILE_NAME);

    let mut buffer = String::new();
    for entry in entries {
        buffer.push_str(&encode(entry)?);
    }

    let io_err = |e: std::io::Error| {
        DomainError::storage(format!("Failed to write {}: {}", tmp_path.display(), e))
    };

    let mut tmp = File::create(&tmp_path).await.map_err(io_err)?;
    tmp.write_all(buffer.as_bytes()).await.map_err(io_err)?;
    tmp.flush().await.map_err(io_err)?;
    tmp.sync_all().await.map_err(io_err)?;
    drop(tmp);

    let writer = open_writer(&tmp_path).await?;

    fs::rename(&tmp_path, &log_path).await.map_err(|e| {
        DomainError::storage(format!(
            "Failed to replace {}: {}",
            log_path.display(),
            e
        ))
    })?;

    Ok((writer, buffer.len() as u64))
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn insert(&self, entry: CacheEntry) -> Result<EntryId, DomainError> {
        let line = encode(&entry)?;
        let mut state = self.state.write().await;

        state.table.check_dimensions(entry.dimensions())?;
        self.ensure_clean_tail(&mut state).await?;

        if let Err(e) = append_line(&mut state.writer, &line).await {
            if let Err(repair) = self.truncate_to_valid(&mut state).await {
                warn!("Could not discard partial cache record: {}", repair);
            }
            return Err(DomainError::storage(format!(
                "Failed to append cache entry: {}",
                e
            )));
        }

        state.len += line.len() as u64;
        let id = entry.id().clone();
        state.table.push(entry);

        Ok(id)
    }

    async fn query_nearest(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &ScopeFilter,
    ) -> Result<Vec<ScoredEntry>, DomainError> {
        let state = self.state.read().await;

        state.table.nearest(vector, top_k, filter)
    }

    async fn clear(&self, filter: &ScopeFilter) -> Result<usize, DomainError> {
        let mut state = self.state.write().await;
        let (kept, removed) = state.table.without(|entry| filter.matches(entry.scope()));

        if removed > 0 {
            self.replace_table(&mut state, kept).await?;
        }

        Ok(removed)
    }

    async fn count(&self, filter: &ScopeFilter) -> Result<usize, DomainError> {
        let state = self.state.read().await;

        Ok(state.table.count(filter))
    }

    async fn remove_created_before(
        &self,
        cutoff: DateTime<Utc>,
        filter: &ScopeFilter,
    ) -> Result<usize, DomainError> {
        let mut state = self.state.write().await;
        let (kept, removed) = state
            .table
            .without(|entry| entry.created_at() < cutoff && filter.matches(entry.scope()));

        if removed > 0 {
            self.replace_table(&mut state, kept).await?;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::query_cache::Scope;

    fn create_entry(text: &str, vector: Vec<f32>, scope: Scope) -> CacheEntry {
        CacheEntry::new(text, vector, format!("answer for {}", text), scope, Utc::now())
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("query_cache_db");

        let store = FileCacheStore::open(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(store.directory(), dir.as_path());
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 0);
        assert_eq!(store.dimensions().await, None);

        store.insert(create_entry("a", vec![1.0, 2.0], Scope::Global)).await.unwrap();
        assert_eq!(store.dimensions().await, Some(2));
    }

    #[tokio::test]
    async fn test_entries_survive_reopen_in_order() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let store = FileCacheStore::open(tmp.path()).await.unwrap();
            store.insert(create_entry("first", vec![1.0, 1.0], Scope::Global)).await.unwrap();
            store
                .insert(create_entry("second", vec![1.0, 1.0], Scope::session("s")))
                .await
                .unwrap();
        }

        let reopened = FileCacheStore::open(tmp.path()).await.unwrap();
        let results = reopened
            .query_nearest(&[1.0, 1.0], 5, &ScopeFilter::All)
            .await
            .unwrap();

        let texts: Vec<&str> = results.iter().map(|r| r.entry.query_text()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(results[1].entry.scope(), &Scope::session("s"));
    }

    #[tokio::test]
    async fn test_clear_is_durable_and_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        store.insert(create_entry("a", vec![1.0], Scope::session("a"))).await.unwrap();
        store.insert(create_entry("g", vec![2.0], Scope::Global)).await.unwrap();

        store.clear(&ScopeFilter::Exact(Scope::session("a"))).await.unwrap();
        drop(store);

        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 1);

        store.clear(&ScopeFilter::All).await.unwrap();
        store.clear(&ScopeFilter::All).await.unwrap();
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 0);

        // inserts after a rewrite land in the new log
        store.insert(create_entry("later", vec![3.0], Scope::Global)).await.unwrap();
        drop(store);

        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_torn_tail_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = FileCacheStore::open(tmp.path()).await.unwrap();
            store.insert(create_entry("ok", vec![1.0], Scope::Global)).await.unwrap();
        }

        let log = tmp.path().join(LOG_FILE_NAME);
        let mut contents = std::fs::read_to_string(&log).unwrap();
        contents.push_str("{\"id\":\"qc:partial\",\"query_te");
        std::fs::write(&log, contents).unwrap();

        let store = FileCacheStore::open(tmp.path()).await.unwrap();

        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 1);
        assert!(std::fs::read_to_string(&log).unwrap().ends_with('\n'));
    }

    #[tokio::test]
    async fn test_partial_append_is_discarded_before_next_insert() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        store.insert(create_entry("a", vec![1.0], Scope::Global)).await.unwrap();

        // leftovers of an append that failed halfway
        {
            let mut state = store.state.write().await;
            state.writer.write_all(b"{\"id\":\"qc:torn\",\"query_te").await.unwrap();
            state.writer.flush().await.unwrap();
        }

        store.insert(create_entry("b", vec![2.0], Scope::Global)).await.unwrap();
        drop(store);

        let reopened = FileCacheStore::open(tmp.path()).await.unwrap();
        let results = reopened.query_nearest(&[1.0], 5, &ScopeFilter::All).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.entry.query_text()).collect();

        assert_eq!(texts, vec!["a", "b"]);
        let contents = std::fs::read_to_string(tmp.path().join(LOG_FILE_NAME)).unwrap();
        assert!(!contents.contains("qc:torn"));
    }

    #[tokio::test]
    async fn test_failed_rewrite_keeps_table_and_log() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        let old = CacheEntry::new(
            "old",
            vec![1.0],
            "r",
            Scope::Global,
            Utc::now() - chrono::Duration::days(2),
        );
        store.insert(old).await.unwrap();
        store.insert(create_entry("fresh", vec![2.0], Scope::Global)).await.unwrap();

        // a directory where the rewrite wants its temp file
        let blocker = tmp.path().join(TMP_FILE_NAME);
        std::fs::create_dir(&blocker).unwrap();

        assert!(store.clear(&ScopeFilter::All).await.is_err());
        assert!(store
            .remove_created_before(Utc::now() - chrono::Duration::days(1), &ScopeFilter::All)
            .await
            .is_err());
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 2);

        // the original writer is still live
        store.insert(create_entry("after", vec![3.0], Scope::Global)).await.unwrap();

        std::fs::remove_dir(&blocker).unwrap();
        let removed = store
            .remove_created_before(Utc::now() - chrono::Duration::days(1), &ScopeFilter::All)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        store.insert(create_entry("last", vec![4.0], Scope::Global)).await.unwrap();
        drop(store);

        let reopened = FileCacheStore::open(tmp.path()).await.unwrap();
        let results = reopened.query_nearest(&[1.0], 5, &ScopeFilter::All).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.entry.query_text()).collect();

        assert_eq!(texts, vec!["fresh", "after", "last"]);
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_open() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(LOG_FILE_NAME), "not json\n{}\n").unwrap();

        let result = FileCacheStore::open(tmp.path()).await;

        match result {
            Err(DomainError::Storage { message }) => assert!(message.contains(":1:")),
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_purge_rewrites_log() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        let old = CacheEntry::new(
            "old",
            vec![1.0],
            "r",
            Scope::Global,
            Utc::now() - chrono::Duration::days(2),
        );
        store.insert(old).await.unwrap();
        store.insert(create_entry("fresh", vec![1.0], Scope::Global)).await.unwrap();

        let removed = store
            .remove_created_before(Utc::now() - chrono::Duration::days(1), &ScopeFilter::All)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        drop(store);

        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        let left = store.query_nearest(&[1.0], 5, &ScopeFilter::All).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].entry.query_text(), "fresh");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_all_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCacheStore::open(tmp.path()).await.unwrap());

        let tasks = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .insert(create_entry(&format!("q{}", i), vec![i as f32], Scope::Global))
                    .await
                    .unwrap()
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }
        drop(store);

        let store = FileCacheStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.count(&ScopeFilter::All).await.unwrap(), 16);
    }
}
