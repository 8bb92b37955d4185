//! Disk Store
//!
//! Directory-backed store: one directory per named store, one metadata file
//! and one body file per entry.
//!
//! Body files carry the entry's sequence number in their name and the
//! metadata record points at it, so renaming the metadata file is the single
//! commit point of a write. Writes to the same key are serialized in-process;
//! temp files are unique per write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::cache::{EntryMetadata, HttpResponse, RequestKey, StoredEntry, DEFAULT_CHUNK_SIZE};
use crate::error::{CacheError, Result};
use crate::store::{BodyStream, CacheStore, StoreHandle};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";
const TMP_EXT: &str = "tmp";

/// Number of per-key write lock stripes
const WRITE_LOCK_STRIPES: usize = 64;

// == Entry Record ==
/// On-disk metadata for one entry; the body lives in a sibling file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    key: RequestKey,
    status: u16,
    headers: Vec<(String, String)>,
    metadata: Option<EntryMetadata>,
    /// Insertion sequence; defines key enumeration order and names the body
    /// file
    seq: u64,
}

// == Entry Location ==
/// Directory and file stem of one key's files.
struct EntryLocation {
    dir: PathBuf,
    stem: String,
}

impl EntryLocation {
    fn meta(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, META_EXT))
    }

    fn body(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{}.{}.{}", self.stem, seq, BODY_EXT))
    }
}

// == Disk Store ==
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    next_seq: AtomicU64,
    chunk_size: usize,
    write_locks: Vec<Mutex<()>>,
}

impl DiskStore {
    /// Creates a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_seq: AtomicU64::new(Utc::now().timestamp_micros().max(0) as u64),
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_locks: (0..WRITE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, store_name: &str) -> Result<PathBuf> {
        validate_store_name(store_name)?;
        Ok(self.root.join(store_name))
    }

    fn locate(&self, handle: &StoreHandle, key: &RequestKey) -> Result<EntryLocation> {
        Ok(EntryLocation {
            dir: self.store_dir(handle.name())?,
            stem: key_digest(key),
        })
    }

    /// Lock stripe guarding writes to the key with digest `stem`.
    fn write_lock(&self, stem: &str) -> &Mutex<()> {
        let index = u64::from_str_radix(&stem[..stem.len().min(8)], 16).unwrap_or(0) as usize;
        &self.write_locks[index % self.write_locks.len()]
    }

    async fn read_record(path: &Path) -> Result<Option<EntryRecord>> {
        match fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| CacheError::CacheRead(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(read_error(path, e)),
        }
    }
}

// == Helpers ==
/// Store names map to directory names, so only a safe charset is accepted.
fn validate_store_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidRequest(format!(
            "Store name '{}' is not usable as a directory name",
            name
        )))
    }
}

fn key_digest(key: &RequestKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.method.as_bytes());
    hasher.update(b" ");
    hasher.update(key.url.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn read_error(path: &Path, err: std::io::Error) -> CacheError {
    CacheError::CacheRead(format!("{}: {}", path.display(), err))
}

fn write_error(path: &Path, err: std::io::Error) -> CacheError {
    CacheError::CacheWrite(format!("{}: {}", path.display(), err))
}

/// Writes through a temp file unique to `seq` and renames so readers never
/// see partial data.
async fn write_atomic(path: &Path, data: &[u8], seq: u64) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.{}", seq, TMP_EXT));
    let tmp = PathBuf::from(tmp);

    let written = match fs::write(&tmp, data).await {
        Ok(()) => fs::rename(&tmp, path).await.map_err(|e| write_error(path, e)),
        Err(e) => Err(write_error(&tmp, e)),
    };
    if written.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    written
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(write_error(path, e)),
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, store_name: &str) -> Result<StoreHandle> {
        let dir = self.store_dir(store_name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| write_error(&dir, e))?;
        Ok(StoreHandle::new(store_name))
    }

    async fn lookup(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<StoredEntry>> {
        let location = self.locate(handle, key)?;

        let Some(record) = Self::read_record(&location.meta()).await? else {
            return Ok(None);
        };

        // A concurrent replace may have removed this body; that reads as a miss
        let body_path = location.body(record.seq);
        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(&body_path, e)),
        };

        Ok(Some(StoredEntry {
            response: HttpResponse {
                status: record.status,
                headers: record.headers,
                body: Bytes::from(body),
            },
            metadata: record.metadata,
        }))
    }

    async fn put(&self, handle: &StoreHandle, key: &RequestKey, entry: StoredEntry) -> Result<()> {
        let location = self.locate(handle, key)?;
        fs::create_dir_all(&location.dir)
            .await
            .map_err(|e| write_error(&location.dir, e))?;

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let meta_path = location.meta();
        let record = EntryRecord {
            key: key.clone(),
            status: entry.response.status,
            headers: entry.response.headers,
            metadata: entry.metadata,
            seq,
        };
        let raw = serde_json::to_vec(&record)
            .map_err(|e| CacheError::CacheWrite(format!("{}: {}", meta_path.display(), e)))?;

        let _guard = self.write_lock(&location.stem).lock().await;
        let previous = Self::read_record(&meta_path).await.ok().flatten();

        // Body first: the metadata rename is what makes an entry visible
        let body_path = location.body(seq);
        write_atomic(&body_path, &entry.response.body, seq).await?;
        if let Err(err) = write_atomic(&meta_path, &raw, seq).await {
            let _ = fs::remove_file(&body_path).await;
            return Err(err);
        }

        // The new entry is committed; a leftover body only costs disk space
        if let Some(previous) = previous.filter(|p| p.seq != seq) {
            if let Err(err) = remove_if_exists(&location.body(previous.seq)).await {
                warn!("Failed to remove replaced body: {}", err);
            }
        }
        Ok(())
    }

    async fn delete(&self, handle: &StoreHandle, key: &RequestKey) -> Result<bool> {
        let location = self.locate(handle, key)?;
        let _guard = self.write_lock(&location.stem).lock().await;

        let meta_path = location.meta();
        let record = Self::read_record(&meta_path).await.ok().flatten();
        let existed = remove_if_exists(&meta_path).await?;
        if let Some(record) = record {
            remove_if_exists(&location.body(record.seq)).await?;
        }
        Ok(existed)
    }

    async fn keys(&self, handle: &StoreHandle) -> Result<Vec<RequestKey>> {
        let dir = self.store_dir(handle.name())?;
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(&dir, e)),
        };

        let mut records = Vec::new();
        while let Some(item) = read_dir.next_entry().await.map_err(|e| read_error(&dir, e))? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable cache record: {}", e),
            }
        }

        records.sort_by_key(|r| r.seq);
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    async fn open_body(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<BodyStream>> {
        let location = self.locate(handle, key)?;
        let Some(record) = Self::read_record(&location.meta()).await? else {
            return Ok(None);
        };

        let body_path = location.body(record.seq);
        let file = match fs::File::open(&body_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(&body_path, e)),
        };

        let chunk_size = self.chunk_size;
        let body = stream::try_unfold(file, move |mut file| async move {
            let mut buf = vec![0u8; chunk_size];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            Ok::<_, std::io::Error>(Some((Bytes::from(buf), file)))
        });

        Ok(Some(body.boxed()))
    }

    async fn delete_store(&self, store_name: &str) -> Result<bool> {
        let dir = self.store_dir(store_name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_error(&dir, e)),
        }
    }

    async fn list_store_names(&self) -> Result<Vec<String>> {
        let mut read_dir = match fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(&self.root, e)),
        };

        let mut names = Vec::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| read_error(&self.root, e))?
        {
            let is_dir = item
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if let (true, Some(name)) = (is_dir, item.file_name().to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
