//! Upload file cache
//!
//! Flat-directory store for uploads. Each upload lives at
//! `<dir>/<id>.<original-name>`; the in-memory index maps IDs to file
//! metadata and is the source of truth after the startup scan. Oldest
//! uploads are evicted first when a size or count budget is exceeded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use super::{CacheConfig, CacheError};

/// Bytes drawn from the hash per ID attempt.
const HASH_DRAW: usize = 64;

/// Upper bound on collision retries. The XOF never runs dry, so hitting
/// this means the ID space is effectively full for the configured length.
const MAX_ID_ATTEMPTS: u32 = 256;

/// Filename prefix reserved for uploads stored under their own name by
/// older deployments. Never minted as an ID.
const RESERVED_PREFIX: &str = "dummy";

/// Called with the ID of every upload that leaves the cache, whether by
/// explicit removal or eviction. Fired after the cache lock is released.
type RemoveHook = Box<dyn Fn(&str) + Send + Sync>;

/// Metadata captured for one upload at commit time.
#[derive(Debug, Clone)]
struct Entry {
    /// On-disk basename, `<id>.<original-name>`.
    stored_name: String,
    /// Byte length of the file.
    size: u64,
    /// Filesystem modification time; doubles as the insertion timestamp
    /// and the key for age- and recency-based eviction.
    mod_time: SystemTime,
}

/// Snapshot of one upload's metadata, as returned by [`FileCache::stat`].
#[derive(Debug, Clone)]
pub struct UploadStat {
    pub stored_name: String,
    pub original_name: String,
    pub size: u64,
    pub mod_time: SystemTime,
}

#[derive(Default)]
struct Index {
    files: HashMap<String, Entry>,
    total_size: u64,
}

/// Disk-backed upload store keyed by short content-derived IDs.
///
/// A single readers-writer lock guards the index and the running size
/// total. [`FileCache::put`] streams and hashes outside the lock; only the
/// final index commit and the eviction passes serialize, so large
/// concurrent uploads do not block each other.
pub struct FileCache {
    dir: PathBuf,
    index: RwLock<Index>,
    on_remove: OnceLock<RemoveHook>,
}

impl FileCache {
    /// Open the cache rooted at `dir`, creating the directory if needed and
    /// rebuilding the index from the files already present.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::io("creating upload directory", e))?;
        restrict_dir_permissions(&dir);

        let mut index = Index::default();
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| CacheError::io("scanning upload directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io("scanning upload directory", e))?;
            let meta = entry
                .metadata()
                .map_err(|e| CacheError::io("statting upload", e))?;
            if meta.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let (prefix, rest) = match name.split_once('.') {
                Some((p, r)) => (p.to_string(), r.to_string()),
                None => (name.clone(), String::new()),
            };
            if prefix.is_empty() {
                info!(file = %name, "skipping hidden file in upload directory");
                continue;
            }
            // legacy name-keyed uploads: "dummy.<name>" is keyed by <name>
            let id = if prefix == RESERVED_PREFIX { rest } else { prefix };
            let mod_time = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            index.total_size += meta.len();
            index.files.insert(
                id,
                Entry {
                    stored_name: name,
                    size: meta.len(),
                    mod_time,
                },
            );
        }

        info!(
            dir = %dir.display(),
            uploads = index.files.len(),
            bytes = index.total_size,
            "upload cache loaded"
        );

        Ok(Self {
            dir,
            index: RwLock::new(index),
            on_remove: OnceLock::new(),
        })
    }

    /// Install the removal hook. May be set once; later calls are ignored.
    pub fn on_remove<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if self.on_remove.set(Box::new(hook)).is_err() {
            warn!("upload removal hook already installed, ignoring");
        }
    }

    fn notify_removed(&self, ids: &[String]) {
        if let Some(hook) = self.on_remove.get() {
            for id in ids {
                hook(id);
            }
        }
    }

    /// Store an upload, returning its freshly minted ID.
    ///
    /// The body is streamed to a temp file in the cache directory while
    /// being fed to a SHAKE-256 hash; the ID is folded out of the hash and
    /// re-drawn until it collides with nothing. Size and count budgets are
    /// enforced before the new entry is committed, so an upload never
    /// evicts itself.
    pub async fn put<S>(
        &self,
        mut content: S,
        filename: &str,
        conf: &dyn CacheConfig,
    ) -> Result<String, CacheError>
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
    {
        let tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::io("creating upload temp file", e))?;
        let std_handle = tmp
            .reopen()
            .map_err(|e| CacheError::io("opening upload temp file", e))?;
        let mut out = tokio::fs::File::from_std(std_handle);

        let mut hasher = Shake256::default();
        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(|e| CacheError::io("reading upload body", e))?;
            hasher.update(&chunk);
            out.write_all(&chunk)
                .await
                .map_err(|e| CacheError::io("writing upload", e))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| CacheError::io("writing upload", e))?;
        drop(out);

        let id = self.mint_id(hasher, conf)?;

        let stored_name = format!("{id}.{filename}");
        let dest = self.dir.join(&stored_name);
        tmp.persist(&dest)
            .map_err(|e| CacheError::io("renaming upload", e.error))?;

        let meta = match tokio::fs::metadata(&dest).await {
            Ok(m) => m,
            Err(e) => {
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(CacheError::io("statting upload", e));
            }
        };
        let size = meta.len();
        let mod_time = meta.modified().unwrap_or_else(|_| SystemTime::now());

        // Make room before committing: evict down to (budget - incoming)
        // so the total is back under budget once this entry lands.
        if conf.max_size() > 0 {
            let budget = conf.max_size() * 1024 * 1024;
            let target = budget.saturating_sub(size).max(1);
            if let Err(e) = self.cut_to_size(target) {
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(e);
            }
        }
        if conf.max_count() > 0 {
            if let Err(e) = self.cut_to_count(conf.max_count() - 1) {
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(e);
            }
        }

        let collided = {
            let mut index = self.index.write().unwrap();
            if index.files.contains_key(&id) {
                // lost a race with a concurrent upload that minted the
                // same ID between our draw and this commit
                true
            } else {
                index.total_size += size;
                index.files.insert(
                    id.clone(),
                    Entry {
                        stored_name,
                        size,
                        mod_time,
                    },
                );
                false
            }
        };
        if collided {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(CacheError::CollisionExhausted(MAX_ID_ATTEMPTS));
        }

        info!(id = %id, name = %filename, bytes = written, "stored upload");
        Ok(id)
    }

    /// Fold IDs out of the finished hash until one is unused.
    fn mint_id(&self, hasher: Shake256, conf: &dyn CacheConfig) -> Result<String, CacheError> {
        let mut xof = hasher.finalize_xof();
        let mut buf = [0u8; HASH_DRAW];
        for _ in 0..MAX_ID_ATTEMPTS {
            xof.read(&mut buf);
            let id = conf.process_hash(&buf);
            let taken = {
                let index = self.index.read().unwrap();
                index.files.contains_key(&id)
            };
            if taken || id == RESERVED_PREFIX {
                debug!(id = %id, "ID collision, drawing again");
                continue;
            }
            return Ok(id);
        }
        Err(CacheError::CollisionExhausted(MAX_ID_ATTEMPTS))
    }

    /// Full path of the upload with the given ID, or `None` if absent.
    /// Never touches the disk.
    pub fn get(&self, id: &str) -> Option<PathBuf> {
        let index = self.index.read().unwrap();
        index.files.get(id).map(|e| self.dir.join(&e.stored_name))
    }

    /// Metadata snapshot for an upload, or `None` if absent.
    pub fn stat(&self, id: &str) -> Option<UploadStat> {
        let index = self.index.read().unwrap();
        index.files.get(id).map(|e| UploadStat {
            stored_name: e.stored_name.clone(),
            original_name: e
                .stored_name
                .split_once('.')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_default(),
            size: e.size,
            mod_time: e.mod_time,
        })
    }

    /// Number of uploads in the cache.
    pub fn len(&self) -> usize {
        self.index.read().unwrap().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes taken up by uploads.
    pub fn size(&self) -> u64 {
        self.index.read().unwrap().total_size
    }

    /// Remove one upload. Removing an unknown ID is an error and leaves
    /// the cache untouched.
    pub fn remove(&self, id: &str) -> Result<(), CacheError> {
        let result = {
            let mut index = self.index.write().unwrap();
            self.remove_locked(&mut index, id)
        };
        if result.is_ok() {
            let removed = [id.to_string()];
            self.notify_removed(&removed);
        }
        result
    }

    /// Delete the file and drop the index entry. Caller holds the write
    /// lock; the removal hook is NOT fired here.
    fn remove_locked(&self, index: &mut Index, id: &str) -> Result<(), CacheError> {
        let entry = index
            .files
            .get(id)
            .ok_or_else(|| CacheError::NotFound(id.to_string()))?;
        let path = self.dir.join(&entry.stored_name);
        let size = entry.size;
        std::fs::remove_file(&path)
            .map_err(|e| CacheError::io(format!("pruning {}", entry.stored_name), e))?;
        index.total_size -= size;
        index.files.remove(id);
        Ok(())
    }

    /// Remove the oldest upload. Caller holds the write lock.
    fn remove_oldest_locked(&self, index: &mut Index) -> Result<Option<String>, CacheError> {
        let oldest = index
            .files
            .iter()
            .min_by_key(|(id, e)| (e.mod_time, id.as_str()))
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                self.remove_locked(index, &id)?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Remove every upload whose modification time strictly precedes `t`,
    /// returning the IDs actually removed. Stops at the first failed
    /// removal, leaving the remainder in place.
    pub fn remove_older_than(&self, t: SystemTime) -> Result<Vec<String>, CacheError> {
        let mut removed = Vec::new();
        let result = {
            let mut index = self.index.write().unwrap();
            let stale: Vec<String> = index
                .files
                .iter()
                .filter(|(_, e)| e.mod_time < t)
                .map(|(id, _)| id.clone())
                .collect();
            let mut result = Ok(());
            for id in stale {
                match self.remove_locked(&mut index, &id) {
                    Ok(()) => removed.push(id),
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            result
        };
        self.notify_removed(&removed);
        result.map(|()| removed)
    }

    /// Number of uploads [`Self::remove_older_than`] would delete.
    pub fn maybe_remove_older_than(&self, t: SystemTime) -> usize {
        let index = self.index.read().unwrap();
        index.files.values().filter(|e| e.mod_time < t).count()
    }

    /// Remove the most recently modified upload and return its ID, or
    /// `None` when the cache is empty.
    pub fn remove_newest(&self) -> Result<Option<String>, CacheError> {
        let (result, removed) = {
            let mut index = self.index.write().unwrap();
            let newest = index
                .files
                .iter()
                .max_by_key(|(id, e)| (e.mod_time, id.as_str()))
                .map(|(id, _)| id.clone());
            match newest {
                Some(id) => match self.remove_locked(&mut index, &id) {
                    Ok(()) => (Ok(Some(id.clone())), vec![id]),
                    Err(e) => (Err(e), Vec::new()),
                },
                None => (Ok(None), Vec::new()),
            }
        };
        self.notify_removed(&removed);
        result
    }

    /// Evict oldest-first until the total size is at most `n` bytes,
    /// returning the IDs evicted. `n == 0` is a no-op; emptying the cache
    /// is what [`Self::purge`] is for.
    pub fn cut_to_size(&self, n: u64) -> Result<Vec<String>, CacheError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut removed = Vec::new();
        let result = {
            let mut index = self.index.write().unwrap();
            let mut result = Ok(());
            while index.total_size > n && !index.files.is_empty() {
                match self.remove_oldest_locked(&mut index) {
                    Ok(Some(id)) => removed.push(id),
                    Ok(None) => break,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            result
        };
        self.notify_removed(&removed);
        result.map(|()| removed)
    }

    /// Number of uploads [`Self::cut_to_size`] would evict.
    pub fn maybe_cut_to_size(&self, n: u64) -> usize {
        if n == 0 {
            return 0;
        }
        let index = self.index.read().unwrap();
        let mut by_age: Vec<&Entry> = index.files.values().collect();
        by_age.sort_by_key(|e| e.mod_time);
        let mut remaining = index.total_size;
        let mut count = 0;
        for entry in by_age {
            if remaining <= n {
                break;
            }
            remaining -= entry.size;
            count += 1;
        }
        count
    }

    /// Evict oldest-first until at most `n` uploads remain, returning how
    /// many were evicted.
    pub fn cut_to_count(&self, n: usize) -> Result<usize, CacheError> {
        let mut removed = Vec::new();
        let result = {
            let mut index = self.index.write().unwrap();
            let mut result = Ok(());
            while index.files.len() > n {
                match self.remove_oldest_locked(&mut index) {
                    Ok(Some(id)) => removed.push(id),
                    Ok(None) => break,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            result
        };
        self.notify_removed(&removed);
        result.map(|()| removed.len())
    }

    /// Remove every upload. The removal hook fires for each.
    pub fn purge(&self) -> Result<(), CacheError> {
        let mut removed = Vec::new();
        let result = {
            let mut index = self.index.write().unwrap();
            let ids: Vec<String> = index.files.keys().cloned().collect();
            let mut result = Ok(());
            for id in ids {
                match self.remove_locked(&mut index, &id) {
                    Ok(()) => removed.push(id),
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            result
        };
        self.notify_removed(&removed);
        result
    }

    /// Every upload ID, sorted ascending by modification time (oldest
    /// first). Ties break on the ID so the order is stable.
    pub fn sorted_ids(&self) -> Vec<String> {
        let index = self.index.read().unwrap();
        let mut pairs: Vec<(&String, &Entry)> = index.files.iter().collect();
        pairs.sort_by_key(|(id, e)| (e.mod_time, id.as_str()));
        pairs.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Long-running age enforcement. Once per day, at local midnight,
    /// refreshes the config and prunes uploads past the age limit. Errors
    /// are logged, never fatal. Run this in its own task.
    pub async fn watch_ages(&self, conf: &dyn CacheConfig) {
        loop {
            conf.refresh();
            let before = chrono::Local::now();
            let max_age = conf.max_age();
            if max_age > 0 {
                let cutoff =
                    SystemTime::now() - Duration::from_secs(u64::from(max_age) * 24 * 60 * 60);
                match self.remove_older_than(cutoff) {
                    Ok(ids) if !ids.is_empty() => {
                        info!(count = ids.len(), days = max_age, "pruned uploads past age limit");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "age prune failed"),
                }
            }

            let wake = (before + chrono::Duration::days(1))
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|t| t.and_local_timezone(chrono::Local).earliest())
                .unwrap_or_else(|| before + chrono::Duration::hours(24));
            let until = (wake - chrono::Local::now())
                .to_std()
                .unwrap_or_else(|_| Duration::from_secs(60));
            tokio::time::sleep(until).await;
        }
    }
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
        warn!(dir = %dir.display(), error = %e, "could not restrict directory permissions");
    }
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) {}
