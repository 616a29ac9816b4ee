//! Severity lookup store built from the summary document.
//!
//! One pass over the summary document's grouped issues fills the store; after
//! that it is read-only. The summary grows with finding count, so the store
//! sits behind [`SeverityBackend`] with two interchangeable backends: an
//! in-memory map, and an LMDB database inside a scoped temporary directory
//! that is removed when the store is dropped, on success and failure alike.

use std::collections::HashMap;
use std::io::BufRead;

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use tempfile::TempDir;
use tracing::debug;

use crate::config::{GROUPED_ISSUE_PATH, SEVERITY_OVERFLOW_BYTES};
use crate::decode::Decoder;
use crate::error::Result;
use crate::xml::PathDispatchParser;

/// Uniform get/put contract over the store's backing engine.
pub trait SeverityBackend {
    /// Insert or overwrite one instance-id → bucket-label mapping.
    ///
    /// Backends may buffer writes; [`SeverityBackend::flush`] makes them
    /// durable.
    fn put(&mut self, instance_id: &str, bucket: &str) -> Result<()>;

    /// Look up the bucket label for an instance id.
    fn get(&self, instance_id: &str) -> Result<Option<String>>;

    /// Write out any buffered entries.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Number of stored entries. Exact only after a flush.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plain in-memory backend for ordinarily-sized summaries.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: HashMap<String, String>,
}

impl SeverityBackend for MemoryBackend {
    fn put(&mut self, instance_id: &str, bucket: &str) -> Result<()> {
        self.map.insert(instance_id.to_string(), bucket.to_string());
        Ok(())
    }

    fn get(&self, instance_id: &str) -> Result<Option<String>> {
        Ok(self.map.get(instance_id).cloned())
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// LMDB map size: a virtual-memory reservation, not an allocation.
const DISK_MAP_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// Entries buffered per LMDB write transaction.
///
/// The disk backend only exists for summaries past the overflow threshold,
/// where one committed transaction per entry would dominate the build pass.
const WRITE_CHUNK: usize = 1024;

/// Disk-backed backend for large corpora.
///
/// Writes are buffered and committed one chunk per transaction; lookups see
/// buffered entries, but `len` counts only committed ones. The environment
/// lives in its own temporary directory; dropping the backend closes the
/// environment and removes the directory. Field order matters: the
/// environment must close before the directory guard deletes its files.
pub struct DiskBackend {
    env: Env,
    db: Database<Str, Str>,
    entries: usize,
    pending: Vec<(String, String)>,
    _dir: TempDir,
}

impl DiskBackend {
    /// Open a fresh disk-backed store in a scoped temporary directory.
    pub fn open() -> Result<Self> {
        let dir = TempDir::with_prefix("fpr-severity-")?;
        // Safety contract of the mmap: the directory is exclusively ours and
        // freshly created, so no other process maps the same files.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(DISK_MAP_SIZE)
                .max_dbs(1)
                .open(dir.path())?
        };
        let mut wtxn = env.write_txn()?;
        let db = env.create_database(&mut wtxn, None)?;
        wtxn.commit()?;
        debug!(path = %dir.path().display(), "opened disk-backed severity store");
        Ok(Self {
            env,
            db,
            entries: 0,
            pending: Vec::new(),
            _dir: dir,
        })
    }
}

impl SeverityBackend for DiskBackend {
    fn put(&mut self, instance_id: &str, bucket: &str) -> Result<()> {
        self.pending
            .push((instance_id.to_string(), bucket.to_string()));
        if self.pending.len() >= WRITE_CHUNK {
            self.flush()?;
        }
        Ok(())
    }

    fn get(&self, instance_id: &str) -> Result<Option<String>> {
        // Buffered entries shadow committed ones; the latest write wins.
        if let Some((_, bucket)) = self.pending.iter().rev().find(|(id, _)| id == instance_id) {
            return Ok(Some(bucket.clone()));
        }
        let rtxn = self.env.read_txn()?;
        Ok(self.db.get(&rtxn, instance_id)?.map(str::to_string))
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut wtxn = self.env.write_txn()?;
        for (instance_id, bucket) in self.pending.drain(..) {
            if self.db.get(&wtxn, &instance_id)?.is_none() {
                self.entries += 1;
            }
            self.db.put(&mut wtxn, &instance_id, &bucket)?;
        }
        wtxn.commit()?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries
    }
}

/// Instance-id → severity-bucket store, write-once then read-only.
pub struct SeverityStore {
    backend: Box<dyn SeverityBackend>,
}

impl SeverityStore {
    /// Create a store over the in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::default()),
        }
    }

    /// Create a store over the disk-backed backend.
    pub fn on_disk() -> Result<Self> {
        Ok(Self {
            backend: Box::new(DiskBackend::open()?),
        })
    }

    /// Pick a backend from the summary document's size.
    ///
    /// # Arguments
    /// * `summary_bytes` - Size of the summary document on disk
    pub fn for_summary_size(summary_bytes: u64) -> Result<Self> {
        if summary_bytes > SEVERITY_OVERFLOW_BYTES {
            debug!(summary_bytes, "summary exceeds overflow threshold");
            Self::on_disk()
        } else {
            Ok(Self::in_memory())
        }
    }

    /// Fill the store with one pass over the summary document.
    ///
    /// # Arguments
    /// * `source` - Reader over the summary document
    /// * `decoder` - Shared decode configuration
    pub fn build<R: BufRead>(&mut self, source: R, decoder: &Decoder) -> Result<()> {
        let backend = &mut self.backend;
        let mut parser = PathDispatchParser::new().register(GROUPED_ISSUE_PATH, |cursor| {
            let entry = decoder.severity_entry(&cursor.read_tree()?)?;
            backend.put(&entry.instance_id, &entry.bucket)
        });
        parser.run(source)?;
        drop(parser);
        self.backend.flush()?;
        debug!(entries = self.backend.len(), "severity store built");
        Ok(())
    }

    /// Look up the bucket label for an instance id.
    pub fn lookup(&self, instance_id: &str) -> Result<Option<String>> {
        self.backend.get(instance_id)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }
}
