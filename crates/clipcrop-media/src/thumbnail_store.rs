// crates/clipcrop-media/src/thumbnail_store.rs
//
// ThumbnailStore: session-owned LRU of decoded, already-resized thumbnails,
// bounded by a byte budget. Reopening the same file (or relaying out at the
// same tile size) serves tiles from here instead of decoding again.
//
// LRU bookkeeping uses an access stamp per entry plus a queue of
// (key, stamp) pairs; queue pairs whose stamp no longer matches the entry are
// stale and skipped during eviction.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use log::debug;

use crate::helpers::rgba::image_size_bytes;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThumbKey {
    pub path:   PathBuf,
    /// Timestamp rounded to whole milliseconds.
    pub millis: i64,
    pub width:  u32,
    pub height: u32,
}

struct Entry {
    image:      Arc<RgbaImage>,
    size_bytes: usize,
    last_used:  u64,
}

pub struct ThumbnailStore {
    max_bytes:      usize,
    total_bytes:    usize,
    access_counter: u64,
    entries:        HashMap<ThumbKey, Entry>,
    lru_order:      VecDeque<(ThumbKey, u64)>,
}

impl ThumbnailStore {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            total_bytes:    0,
            access_counter: 0,
            entries:        HashMap::new(),
            lru_order:      VecDeque::new(),
        }
    }

    pub fn len(&self)         -> usize { self.entries.len() }
    pub fn is_empty(&self)    -> bool  { self.entries.is_empty() }
    pub fn total_bytes(&self) -> usize { self.total_bytes }

    pub fn get(&mut self, key: &ThumbKey) -> Option<Arc<RgbaImage>> {
        let entry = self.entries.get_mut(key)?;
        self.access_counter = self.access_counter.wrapping_add(1);
        entry.last_used = self.access_counter;
        let image = Arc::clone(&entry.image);
        self.lru_order.push_back((key.clone(), self.access_counter));
        self.compact_if_needed();
        Some(image)
    }

    /// Insert, evicting least-recently-used entries past the budget. Images
    /// larger than the whole budget are not stored.
    pub fn insert(&mut self, key: ThumbKey, image: Arc<RgbaImage>) {
        let size_bytes = image_size_bytes(&image);
        if size_bytes == 0 || size_bytes > self.max_bytes {
            return;
        }
        if let Some(old) = self.entries.remove(&key) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
        }

        self.access_counter = self.access_counter.wrapping_add(1);
        let last_used = self.access_counter;
        self.entries.insert(key.clone(), Entry { image, size_bytes, last_used });
        self.total_bytes = self.total_bytes.saturating_add(size_bytes);
        self.lru_order.push_back((key, last_used));
        self.evict_if_needed();
    }

    /// Drop every thumbnail of `path`.
    pub fn evict(&mut self, path: &Path) {
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|k, e| {
            let keep = k.path != path;
            if !keep { freed += e.size_bytes; }
            keep
        });
        self.total_bytes = self.total_bytes.saturating_sub(freed);
        self.lru_order.retain(|(k, _)| k.path != path);
        debug!("[thumbs] evicted {} entries of {}", before - self.entries.len(), path.display());
    }

    fn evict_if_needed(&mut self) {
        while self.total_bytes > self.max_bytes {
            let Some((key, stamp)) = self.lru_order.pop_front() else { break };
            let Some(entry) = self.entries.get(&key) else { continue };
            if entry.last_used != stamp {
                continue;
            }
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
            self.entries.remove(&key);
        }
    }

    /// Repeated `get`s leave stale queue pairs behind; rebuild once they
    /// dominate the queue.
    fn compact_if_needed(&mut self) {
        if self.lru_order.len() <= self.entries.len() * 4 + 64 {
            return;
        }
        let entries = &self.entries;
        self.lru_order.retain(|(k, stamp)| entries.get(k).is_some_and(|e| e.last_used == *stamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str, millis: i64) -> ThumbKey {
        ThumbKey { path: PathBuf::from(path), millis, width: 10, height: 10 }
    }

    fn tile() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(10, 10)) // 400 bytes
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut s = ThumbnailStore::new(1200);
        s.insert(key("a", 0), tile());
        s.insert(key("a", 1), tile());
        s.insert(key("a", 2), tile());
        assert!(s.get(&key("a", 0)).is_some()); // refresh 0
        s.insert(key("a", 3), tile());
        assert!(s.get(&key("a", 1)).is_none());
        assert!(s.get(&key("a", 0)).is_some());
        assert_eq!(s.total_bytes(), 1200);
    }

    #[test]
    fn oversized_images_are_skipped() {
        let mut s = ThumbnailStore::new(100);
        s.insert(key("a", 0), tile());
        assert!(s.is_empty());
    }

    #[test]
    fn reinsert_does_not_double_count() {
        let mut s = ThumbnailStore::new(10_000);
        s.insert(key("a", 0), tile());
        s.insert(key("a", 0), tile());
        assert_eq!(s.len(), 1);
        assert_eq!(s.total_bytes(), 400);
    }

    #[test]
    fn evict_path_frees_bytes() {
        let mut s = ThumbnailStore::new(10_000);
        s.insert(key("a", 0), tile());
        s.insert(key("b", 0), tile());
        s.evict(Path::new("a"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.total_bytes(), 400);
        assert!(s.get(&key("b", 0)).is_some());
    }

    #[test]
    fn stale_queue_is_compacted() {
        let mut s = ThumbnailStore::new(10_000);
        s.insert(key("a", 0), tile());
        for _ in 0..1000 {
            s.get(&key("a", 0));
        }
        assert!(s.lru_order.len() <= 4 + 64 + 1);
    }
}
