//! Thumbnail cache coordinator
//!
//! All cache state (the rendition index, the in-flight request map, the
//! size total) is owned by a single task; every public operation is a
//! message to it with a one-shot reply channel. Generation jobs run on
//! blocking threads and report back with a completion message, so at most
//! one job is ever in flight per (source, dimensions) pair and every
//! concurrent requester for that pair shares its result.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::codec::{self, ThumbEncoder};
use crate::cache::CacheError;

/// Source of the files being thumbnailed. The only capability the
/// thumbnail cache assumes about the upload store.
pub trait FileStore: Send + Sync + 'static {
    /// Path to the file with the given ID, or `None` if unknown.
    fn get(&self, id: &str) -> Option<PathBuf>;
}

/// Rendition bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub w: u32,
    pub h: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// One rendition: a source ID at a bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThumbKey {
    id: String,
    dims: Dimensions,
}

enum Message {
    Get {
        key: ThumbKey,
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    Remove {
        id: String,
        /// `None` for fire-and-forget removal (the upload-cache hook).
        reply: Option<oneshot::Sender<Result<(), CacheError>>>,
    },
    Purge {
        reply: oneshot::Sender<Result<(), CacheError>>,
    },
    Stats {
        reply: oneshot::Sender<(u64, usize)>,
    },
    /// A generation job finished, successfully or not.
    Generated {
        key: ThumbKey,
        result: Option<(PathBuf, u64)>,
    },
}

/// Handle to the thumbnail cache. Cheap to clone; all clones talk to the
/// same coordinator.
#[derive(Clone)]
pub struct ThumbCache {
    tx: mpsc::UnboundedSender<Message>,
}

impl ThumbCache {
    /// Scan `dir` (creating it if needed), then spawn the coordinator.
    /// Must be called from within a tokio runtime.
    pub fn start(
        dir: impl Into<PathBuf>,
        enc: impl ThumbEncoder,
        store: Arc<dyn FileStore>,
    ) -> Result<Self, CacheError> {
        let coordinator = Coordinator::new(dir.into(), Arc::new(enc), store)?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(coordinator.run(rx, tx.clone()));
        Ok(Self { tx })
    }

    /// Path to a usable rendition of `id` within a `w`×`h` box, generating
    /// or freshening it first if needed. `None` means no rendition can be
    /// produced (unknown ID, unsupported format, or decode failure); the
    /// HTTP layer turns that into the placeholder.
    pub async fn get(&self, id: &str, w: u32, h: u32) -> Option<PathBuf> {
        let (reply, rx) = oneshot::channel();
        let key = ThumbKey {
            id: id.to_string(),
            dims: Dimensions { w, h },
        };
        self.tx.send(Message::Get { key, reply }).ok()?;
        rx.await.ok().flatten()
    }

    /// Delete every rendition of `id`. Unknown IDs are a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), CacheError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Remove {
                id: id.to_string(),
                reply: Some(reply),
            })
            .map_err(|_| coordinator_gone())?;
        rx.await.map_err(|_| coordinator_gone())?
    }

    /// Queue removal of every rendition of `id` without waiting for it to
    /// be applied. Failures are logged by the coordinator. This is the
    /// form the upload cache's removal hook uses, since the hook is
    /// synchronous.
    pub fn remove_detached(&self, id: &str) {
        let _ = self.tx.send(Message::Remove {
            id: id.to_string(),
            reply: None,
        });
    }

    /// Delete every rendition.
    pub async fn purge(&self) -> Result<(), CacheError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Purge { reply })
            .map_err(|_| coordinator_gone())?;
        rx.await.map_err(|_| coordinator_gone())?
    }

    /// Total rendition bytes on disk and rendition count.
    pub async fn stats(&self) -> (u64, usize) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Message::Stats { reply }).is_err() {
            return (0, 0);
        }
        rx.await.unwrap_or((0, 0))
    }
}

fn coordinator_gone() -> CacheError {
    CacheError::io(
        "reaching thumbnail coordinator",
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "coordinator stopped"),
    )
}

struct Coordinator {
    dir: PathBuf,
    enc: Arc<dyn ThumbEncoder>,
    store: Arc<dyn FileStore>,
    /// Which bounding boxes exist on disk for each source ID.
    files: HashMap<String, HashSet<Dimensions>>,
    /// Waiters per rendition currently being generated. The first waiter
    /// starts the job; the rest just queue.
    inflight: HashMap<ThumbKey, Vec<oneshot::Sender<Option<PathBuf>>>>,
    total_size: u64,
}

impl Coordinator {
    /// Build the index from the files already in `dir`. Files whose names
    /// don't parse as `<id>_<w>_<h>.<ext>` are deleted.
    fn new(
        dir: PathBuf,
        enc: Arc<dyn ThumbEncoder>,
        store: Arc<dyn FileStore>,
    ) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::io("creating thumbnail directory", e))?;

        let mut files: HashMap<String, HashSet<Dimensions>> = HashMap::new();
        let mut total_size = 0u64;
        let mut loaded = 0usize;
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| CacheError::io("scanning thumbnail directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io("scanning thumbnail directory", e))?;
            let meta = entry
                .metadata()
                .map_err(|e| CacheError::io("statting thumbnail", e))?;
            if meta.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match parse_name(&name) {
                Some((id, dims)) => {
                    files.entry(id).or_default().insert(dims);
                    total_size += meta.len();
                    loaded += 1;
                }
                None => {
                    warn!(file = %name, "thumbnail filename has wrong format, removing");
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        info!(dir = %dir.display(), thumbs = loaded, bytes = total_size, "thumbnail cache loaded");

        Ok(Self {
            dir,
            enc,
            store,
            files,
            inflight: HashMap::new(),
            total_size,
        })
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Message>,
        tx: mpsc::UnboundedSender<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            match msg {
                Message::Get { key, reply } => self.handle_get(key, reply, &tx),
                Message::Remove { id, reply } => {
                    let result = self.apply_remove(&id);
                    match reply {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                warn!(id = %id, error = %e, "detached thumbnail removal failed");
                            }
                        }
                    }
                }
                Message::Purge { reply } => {
                    let _ = reply.send(self.apply_purge());
                }
                Message::Stats { reply } => {
                    let count = self.files.values().map(HashSet::len).sum();
                    let _ = reply.send((self.total_size, count));
                }
                Message::Generated { key, result } => self.finish_generation(key, result),
            }
        }
    }

    fn thumb_path(&self, key: &ThumbKey) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}{}",
            key.id,
            key.dims.w,
            key.dims.h,
            self.enc.extension()
        ))
    }

    fn handle_get(
        &mut self,
        key: ThumbKey,
        reply: oneshot::Sender<Option<PathBuf>>,
        tx: &mpsc::UnboundedSender<Message>,
    ) {
        if self
            .files
            .get(&key.id)
            .is_some_and(|dims| dims.contains(&key.dims))
        {
            let path = self.thumb_path(&key);
            let (fresh, on_disk) = self.check_fresh(&key, &path);
            if fresh {
                let _ = reply.send(Some(path));
                return;
            }
            // stale or missing rendition: drop it from the books and fall
            // through to regeneration, which overwrites the file in place
            debug!(id = %key.id, dims = %key.dims, "rendition stale, regenerating");
            self.total_size = self.total_size.saturating_sub(on_disk);
            if let Some(dims) = self.files.get_mut(&key.id) {
                dims.remove(&key.dims);
                if dims.is_empty() {
                    self.files.remove(&key.id);
                }
            }
        }

        let queued = {
            let waiters = self.inflight.entry(key.clone()).or_default();
            waiters.push(reply);
            waiters.len()
        };
        if queued == 1 {
            self.spawn_generation(key, tx.clone());
        }
    }

    /// Whether the rendition at `path` exists and is no older than its
    /// source. Returns the rendition's on-disk size alongside, for the
    /// regeneration bookkeeping.
    fn check_fresh(&self, key: &ThumbKey, path: &Path) -> (bool, u64) {
        let thumb_meta = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => return (false, 0),
        };
        let size = thumb_meta.len();
        let Some(src) = self.store.get(&key.id) else {
            return (false, size);
        };
        let src_meta = match std::fs::metadata(&src) {
            Ok(m) => m,
            Err(_) => return (false, size),
        };
        match (src_meta.modified(), thumb_meta.modified()) {
            (Ok(src_time), Ok(thumb_time)) => (src_time <= thumb_time, size),
            _ => (false, size),
        }
    }

    fn spawn_generation(&self, key: ThumbKey, tx: mpsc::UnboundedSender<Message>) {
        let store = Arc::clone(&self.store);
        let enc = Arc::clone(&self.enc);
        let dest = self.thumb_path(&key);
        tokio::spawn(async move {
            let result = generate(store, enc, &key, dest).await;
            let _ = tx.send(Message::Generated { key, result });
        });
    }

    fn finish_generation(&mut self, key: ThumbKey, result: Option<(PathBuf, u64)>) {
        match &result {
            Some((_, size)) => {
                self.files.entry(key.id.clone()).or_default().insert(key.dims);
                self.total_size += size;
            }
            None => {
                // a stale rendition may have been deindexed on the way in;
                // don't leave its file orphaned
                let _ = std::fs::remove_file(self.thumb_path(&key));
            }
        }
        if let Some(waiters) = self.inflight.remove(&key) {
            let path = result.map(|(p, _)| p);
            for waiter in waiters {
                let _ = waiter.send(path.clone());
            }
        }
    }

    /// Delete every rendition of `id`. Files already gone are fine; the
    /// index entry is dropped no matter what.
    fn apply_remove(&mut self, id: &str) -> Result<(), CacheError> {
        let Some(dims) = self.files.remove(id) else {
            return Ok(());
        };
        for d in dims {
            let path = self.thumb_path(&ThumbKey {
                id: id.to_string(),
                dims: d,
            });
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::io("statting thumbnail", e)),
            };
            std::fs::remove_file(&path)
                .map_err(|e| CacheError::io(format!("pruning {}", path.display()), e))?;
            self.total_size = self.total_size.saturating_sub(meta.len());
        }
        debug!(id = %id, "removed renditions");
        Ok(())
    }

    fn apply_purge(&mut self) -> Result<(), CacheError> {
        let ids: Vec<String> = self.files.keys().cloned().collect();
        for id in ids {
            self.apply_remove(&id)?;
        }
        Ok(())
    }
}

/// Resolve the source and run the decode/scale/encode pipeline on a
/// blocking thread. `None` covers every failure: the waiters will be told
/// there is no rendition.
async fn generate(
    store: Arc<dyn FileStore>,
    enc: Arc<dyn ThumbEncoder>,
    key: &ThumbKey,
    dest: PathBuf,
) -> Option<(PathBuf, u64)> {
    let src = store.get(&key.id)?;
    let Some(format) = codec::format_for(&src) else {
        debug!(id = %key.id, src = %src.display(), "no decoder for source, skipping");
        return None;
    };

    let dims = key.dims;
    let out = dest.clone();
    let job = tokio::task::spawn_blocking(move || {
        codec::generate(&src, &out, format, dims, enc.as_ref())
    })
    .await;

    match job {
        Ok(Ok(size)) => Some((dest, size)),
        Ok(Err(e)) => {
            warn!(id = %key.id, dims = %key.dims, error = %e, "thumbnail generation failed");
            None
        }
        Err(e) => {
            warn!(id = %key.id, error = %e, "thumbnail generation panicked");
            None
        }
    }
}

/// Parse `<id>_<w>_<h>.<ext>` into its ID and dimensions. The two numeric
/// components are the last two `_`-separated pieces before the extension.
fn parse_name(name: &str) -> Option<(String, Dimensions)> {
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    let mut parts = stem.rsplitn(3, '_');
    let h: u32 = parts.next()?.parse().ok()?;
    let w: u32 = parts.next()?.parse().ok()?;
    let id = parts.next()?;
    if id.is_empty() {
        return None;
    }
    Some((id.to_string(), Dimensions { w, h }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumb::JpegEncoder;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<String, PathBuf>>);

    impl MapStore {
        fn insert(&self, id: &str, path: PathBuf) {
            self.0.lock().unwrap().insert(id.to_string(), path);
        }
        fn forget(&self, id: &str) {
            self.0.lock().unwrap().remove(id);
        }
    }

    impl FileStore for MapStore {
        fn get(&self, id: &str) -> Option<PathBuf> {
            self.0.lock().unwrap().get(id).cloned()
        }
    }

    /// Encoder wrapper that counts how many renditions are produced.
    struct CountingEncoder {
        hits: Arc<AtomicUsize>,
        inner: JpegEncoder,
    }

    impl ThumbEncoder for CountingEncoder {
        fn extension(&self) -> &'static str {
            self.inner.extension()
        }
        fn encode(
            &self,
            thumb: &image::DynamicImage,
            dst: &mut dyn std::io::Write,
        ) -> image::ImageResult<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(thumb, dst)
        }
    }

    fn write_png(path: &Path, w: u32, h: u32, shade: u8) {
        RgbImage::from_pixel(w, h, Rgb([shade, 40, 40]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_parse_name() {
        let (id, dims) = parse_name("abcd_100_100.jpg").unwrap();
        assert_eq!(id, "abcd");
        assert_eq!(dims, Dimensions { w: 100, h: 100 });

        // IDs containing underscores parse from the right
        let (id, dims) = parse_name("a_b_700_375.jpg").unwrap();
        assert_eq!(id, "a_b");
        assert_eq!(dims, Dimensions { w: 700, h: 375 });

        assert!(parse_name("noformat.jpg").is_none());
        assert!(parse_name("only_1.jpg").is_none());
        assert!(parse_name("x_abc_100.jpg").is_none());
        assert!(parse_name("_100_100.jpg").is_none());
    }

    #[tokio::test]
    async fn test_get_generates_rendition() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.photo.png");
        write_png(&src, 300, 200, 200);

        let store = Arc::new(MapStore::default());
        store.insert("abcd", src);
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();

        let path = cache.get("abcd", 100, 100).await.expect("rendition");
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "abcd_100_100.jpg"
        );
        let rendition = image::open(&path).unwrap();
        assert_eq!(rendition.dimensions(), (100, 66));

        let (bytes, count) = cache.stats().await;
        assert_eq!(count, 1);
        assert_eq!(bytes, std::fs::metadata(&path).unwrap().len());
    }

    #[tokio::test]
    async fn test_get_unknown_source_is_none() {
        let thumbs = tempfile::tempdir().unwrap();
        let store = Arc::new(MapStore::default());
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();
        assert_eq!(cache.get("zzzz", 100, 100).await, None);
    }

    #[tokio::test]
    async fn test_get_unsupported_format_is_none() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.notes.txt");
        std::fs::write(&src, b"plain text").unwrap();

        let store = Arc::new(MapStore::default());
        store.insert("abcd", src);
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();
        assert_eq!(cache.get("abcd", 100, 100).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_source_is_none() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.fake.png");
        std::fs::write(&src, b"these are not pixels").unwrap();

        let store = Arc::new(MapStore::default());
        store.insert("abcd", src);
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();
        assert_eq!(cache.get("abcd", 100, 100).await, None);
        // nothing left behind in the thumb dir
        assert_eq!(std::fs::read_dir(thumbs.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_gets_coalesce() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.photo.png");
        write_png(&src, 800, 600, 120);

        let hits = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MapStore::default());
        store.insert("abcd", src);
        let cache = ThumbCache::start(
            thumbs.path(),
            CountingEncoder {
                hits: hits.clone(),
                inner: JpegEncoder { quality: 88 },
            },
            store,
        )
        .unwrap();

        let results = futures::future::join_all(
            (0..10).map(|_| cache.get("abcd", 100, 100)),
        )
        .await;

        let first = results[0].clone().expect("rendition");
        for r in &results {
            assert_eq!(r.as_ref(), Some(&first));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1, "one decode for ten gets");
    }

    #[tokio::test]
    async fn test_stale_rendition_is_regenerated() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.photo.png");
        write_png(&src, 300, 200, 10);

        let hits = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MapStore::default());
        store.insert("abcd", src.clone());
        let cache = ThumbCache::start(
            thumbs.path(),
            CountingEncoder {
                hits: hits.clone(),
                inner: JpegEncoder { quality: 88 },
            },
            store,
        )
        .unwrap();

        let path = cache.get("abcd", 100, 100).await.expect("rendition");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // a second get serves the cached rendition
        cache.get("abcd", 100, 100).await.expect("rendition");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // rewrite the source; its newer mtime makes the rendition stale
        tokio::time::sleep(Duration::from_millis(30)).await;
        write_png(&src, 300, 200, 250);

        let path2 = cache.get("abcd", 100, 100).await.expect("rendition");
        assert_eq!(path2, path);
        assert_eq!(hits.load(Ordering::SeqCst), 2, "stale rendition regenerated");
        let src_time = std::fs::metadata(&src).unwrap().modified().unwrap();
        let thumb_time = std::fs::metadata(&path2).unwrap().modified().unwrap();
        assert!(thumb_time >= src_time);
    }

    #[tokio::test]
    async fn test_remove_deletes_every_size() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.photo.png");
        write_png(&src, 300, 200, 77);

        let store = Arc::new(MapStore::default());
        store.insert("abcd", src);
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();

        let small = cache.get("abcd", 100, 100).await.unwrap();
        let large = cache.get("abcd", 700, 375).await.unwrap();

        cache.remove("abcd").await.unwrap();
        assert!(!small.exists());
        assert!(!large.exists());
        assert_eq!(cache.stats().await, (0, 0));

        // removing again is a quiet no-op
        cache.remove("abcd").await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_clears_directory() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let store = Arc::new(MapStore::default());
        for id in ["aaaa", "bbbb"] {
            let src = uploads.path().join(format!("{id}.photo.png"));
            write_png(&src, 200, 200, 50);
            store.insert(id, src);
        }
        let cache = ThumbCache::start(
            thumbs.path(),
            JpegEncoder { quality: 88 },
            store.clone(),
        )
        .unwrap();

        cache.get("aaaa", 100, 100).await.unwrap();
        cache.get("bbbb", 100, 100).await.unwrap();

        cache.purge().await.unwrap();
        assert_eq!(cache.stats().await, (0, 0));
        assert_eq!(std::fs::read_dir(thumbs.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_startup_scan_removes_malformed_names() {
        let thumbs = tempfile::tempdir().unwrap();
        std::fs::write(thumbs.path().join("abcd_100_100.jpg"), b"jpegish").unwrap();
        std::fs::write(thumbs.path().join("garbage.jpg"), b"junk").unwrap();
        std::fs::write(thumbs.path().join("x_onlyone.jpg"), b"junk").unwrap();

        let store = Arc::new(MapStore::default());
        let cache =
            ThumbCache::start(thumbs.path(), JpegEncoder { quality: 88 }, store).unwrap();

        let (bytes, count) = cache.stats().await;
        assert_eq!(count, 1);
        assert_eq!(bytes, 7);
        assert!(thumbs.path().join("abcd_100_100.jpg").exists());
        assert!(!thumbs.path().join("garbage.jpg").exists());
        assert!(!thumbs.path().join("x_onlyone.jpg").exists());
    }

    #[tokio::test]
    async fn test_source_removal_makes_get_none() {
        let uploads = tempfile::tempdir().unwrap();
        let thumbs = tempfile::tempdir().unwrap();
        let src = uploads.path().join("abcd.photo.png");
        write_png(&src, 300, 200, 99);

        let store = Arc::new(MapStore::default());
        store.insert("abcd", src.clone());
        let cache = ThumbCache::start(
            thumbs.path(),
            JpegEncoder { quality: 88 },
            store.clone(),
        )
        .unwrap();

        cache.get("abcd", 100, 100).await.expect("rendition");

        // the upload disappears; the detached removal (what the upload
        // cache's hook sends) lands before any later get
        std::fs::remove_file(&src).unwrap();
        store.forget("abcd");
        cache.remove_detached("abcd");

        assert_eq!(cache.get("abcd", 100, 100).await, None);
        assert_eq!(std::fs::read_dir(thumbs.path()).unwrap().count(), 0);
    }
}
