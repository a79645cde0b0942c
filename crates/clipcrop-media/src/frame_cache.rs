// crates/clipcrop-media/src/frame_cache.rs
//
// PreviewFrameCache: thumbnails that tile the scrub strip.
//
// Lifecycle of one request:
//   PreviewFrameCache::request  plan timestamps, serve what the store has
//   FrameBatch::spawn           one background thread runs the FrameSource
//   PendingFrames::poll         UI thread drains results; yields the ordered
//                               frame list exactly once
//
// Fan-in is a counting join. Slots are preallocated in timestamp order and
// written by index; completion fires when every requested timestamp has
// resolved, whether it decoded, failed or was cancelled. Failed and cancelled
// slots become a transparent placeholder tile.
//
// Timestamps are deduplicated by millisecond key, so two slots that round to
// the same instant share one decode.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use image::RgbaImage;
use log::{debug, info, warn};

use clipcrop_core::error::EditError;
use clipcrop_core::helpers::time::millis_key;

use crate::helpers::rgba::aspect_fill_resize;
use crate::source::{FrameOutcome, FrameSource};
use crate::thumbnail_store::{ThumbKey, ThumbnailStore};

/// Evenly spaced sample times for `duration` at `fps`: `ceil(duration × fps)`
/// samples at `i / fps`.
///
/// ```
/// use clipcrop_media::frame_cache::sample_times;
/// assert_eq!(sample_times(3.0, 2.0), vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
/// assert_eq!(sample_times(1.2, 2.0).len(), 3);
/// ```
pub fn sample_times(duration: f64, fps: f64) -> Vec<f64> {
    assert!(duration > 0.0 && fps > 0.0, "sample_times needs positive inputs");
    let n = ((duration * fps - 1e-9).ceil() as usize).max(1);
    (0..n).map(|i| (i as f64 / fps).min(duration)).collect()
}

/// One tile of the scrub strip.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    pub timestamp:   f64,
    pub image:       Arc<RgbaImage>,
    /// True when decoding failed or was cancelled and `image` is blank.
    pub placeholder: bool,
}

/// One decode shared by every slot whose timestamp rounds to `key`.
#[derive(Clone, Debug, PartialEq)]
struct Job {
    key:   i64,
    time:  f64,
    slots: Vec<usize>,
}

fn plan_jobs(times: &[f64]) -> Vec<Job> {
    let mut by_key: HashMap<i64, usize> = HashMap::new();
    let mut jobs: Vec<Job> = Vec::new();
    for (slot, &t) in times.iter().enumerate() {
        let key = millis_key(t);
        match by_key.get(&key) {
            Some(&j) => jobs[j].slots.push(slot),
            None => {
                by_key.insert(key, jobs.len());
                jobs.push(Job { key, time: t, slots: vec![slot] });
            }
        }
    }
    jobs
}

// ── PreviewFrameCache ─────────────────────────────────────────────────────────

pub struct PreviewFrameCache {
    source:    Arc<dyn FrameSource>,
    source_id: PathBuf,
    fps:       f64,
    thumb_px:  (u32, u32),
}

impl PreviewFrameCache {
    /// `source_id` keys the thumbnail store (normally the file path);
    /// `thumb_px` is the exact tile size in physical pixels.
    pub fn new(source: Arc<dyn FrameSource>, source_id: impl Into<PathBuf>, fps: f64, thumb_px: (u32, u32)) -> Self {
        Self { source, source_id: source_id.into(), fps, thumb_px: (thumb_px.0.max(1), thumb_px.1.max(1)) }
    }

    pub fn sample_times(&self) -> Vec<f64> {
        sample_times(self.source.duration(), self.fps)
    }

    /// Plan a batch. Nothing decodes until `FrameBatch::spawn`.
    pub fn request(&self, store: &mut ThumbnailStore) -> FrameBatch {
        let times = self.sample_times();
        let (w, h) = self.thumb_px;
        let mut slots: Vec<Option<Arc<RgbaImage>>> = vec![None; times.len()];
        let mut jobs = Vec::new();
        for job in plan_jobs(&times) {
            let key = ThumbKey { path: self.source_id.clone(), millis: job.key, width: w, height: h };
            match store.get(&key) {
                Some(img) => {
                    for &s in &job.slots {
                        slots[s] = Some(Arc::clone(&img));
                    }
                }
                None => jobs.push(job),
            }
        }
        debug!(
            "[frames] planned {} slots, {} decodes ({} from store)",
            times.len(), jobs.len(), times.len() - jobs.iter().map(|j| j.slots.len()).sum::<usize>()
        );
        FrameBatch {
            source:    Arc::clone(&self.source),
            source_id: self.source_id.clone(),
            thumb_px:  self.thumb_px,
            times,
            slots,
            jobs,
        }
    }
}

// ── FrameBatch ────────────────────────────────────────────────────────────────

/// A planned, not yet started request. Consumed by `spawn`, so a batch can
/// only ever run once.
pub struct FrameBatch {
    source:    Arc<dyn FrameSource>,
    source_id: PathBuf,
    thumb_px:  (u32, u32),
    times:     Vec<f64>,
    slots:     Vec<Option<Arc<RgbaImage>>>,
    jobs:      Vec<Job>,
}

enum FrameMsg {
    Resolved(usize, FrameOutcome),
    /// The source returned from `generate`; anything unreported failed.
    Finished,
}

impl FrameBatch {
    pub fn len(&self) -> usize { self.times.len() }
    pub fn is_empty(&self) -> bool { self.times.is_empty() }

    pub fn spawn(self) -> PendingFrames {
        let (tx, rx)  = unbounded();
        let cancel    = Arc::new(AtomicBool::new(false));
        let job_count = self.jobs.len();

        let mut pending = PendingFrames {
            rx,
            source_id: self.source_id,
            thumb_px:  self.thumb_px,
            times:     self.times,
            slots:     self.slots,
            resolved:  vec![false; job_count],
            jobs:      self.jobs,
            completed: 0,
            cancel:    Arc::clone(&cancel),
            fresh:     Vec::new(),
            delivered: false,
            started:   Instant::now(),
        };
        if job_count == 0 {
            return pending;
        }

        let job_times: Vec<f64> = pending.jobs.iter().map(|j| j.time).collect();
        let source = self.source;
        let (w, h) = pending.thumb_px;
        let spawned = thread::Builder::new()
            .name("clipcrop-frames".into())
            .spawn(move || {
                source.generate(&job_times, &cancel, &|i: usize, outcome: FrameOutcome| {
                    // Resize here so the UI thread only ever copies pointers.
                    let outcome = match outcome {
                        FrameOutcome::Decoded(img) => FrameOutcome::Decoded(aspect_fill_resize(&img, w, h)),
                        other => other,
                    };
                    let _ = tx.send(FrameMsg::Resolved(i, outcome));
                });
                let _ = tx.send(FrameMsg::Finished);
            });
        if let Err(e) = spawned {
            warn!("[frames] could not start decode thread: {e}");
            pending.fail_remaining("decode thread did not start");
        }
        pending
    }
}

// ── PendingFrames ─────────────────────────────────────────────────────────────

/// Handle to an in-flight batch. Dropping it cancels the remaining decodes.
pub struct PendingFrames {
    rx:        Receiver<FrameMsg>,
    source_id: PathBuf,
    thumb_px:  (u32, u32),
    times:     Vec<f64>,
    slots:     Vec<Option<Arc<RgbaImage>>>,
    jobs:      Vec<Job>,
    resolved:  Vec<bool>,
    completed: usize,
    cancel:    Arc<AtomicBool>,
    /// Decoded tiles not yet handed to the store: (job index, image).
    fresh:     Vec<(usize, Arc<RgbaImage>)>,
    delivered: bool,
    started:   Instant,
}

impl PendingFrames {
    /// Number of frames the batch will deliver.
    pub fn len(&self) -> usize { self.times.len() }
    pub fn is_empty(&self) -> bool { self.times.is_empty() }
    pub fn is_delivered(&self) -> bool { self.delivered }

    /// Ask the source to stop. Unstarted timestamps resolve as cancelled and
    /// the batch still completes.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Drain whatever has arrived. Returns the ordered frames exactly once,
    /// on the call that observes the last resolution.
    pub fn poll(&mut self, store: &mut ThumbnailStore) -> Option<Vec<PreviewFrame>> {
        if self.delivered {
            return None;
        }
        loop {
            match self.rx.try_recv() {
                Ok(msg) => self.handle(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail_remaining("frame source stopped early");
                    break;
                }
            }
        }
        self.take_if_complete(store)
    }

    /// Blocking variant of `poll` for headless callers. `None` on timeout or
    /// when already delivered.
    pub fn wait(&mut self, store: &mut ThumbnailStore, timeout: Duration) -> Option<Vec<PreviewFrame>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frames) = self.poll(store) {
                return Some(frames);
            }
            if self.delivered {
                return None;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(msg) => self.handle(msg),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => self.fail_remaining("frame source stopped early"),
            }
        }
    }

    fn handle(&mut self, msg: FrameMsg) {
        match msg {
            FrameMsg::Resolved(j, outcome) => self.resolve(j, outcome),
            FrameMsg::Finished => self.fail_remaining("frame source skipped this timestamp"),
        }
    }

    fn resolve(&mut self, j: usize, outcome: FrameOutcome) {
        if j >= self.jobs.len() || self.resolved[j] {
            return;
        }
        self.resolved[j] = true;
        self.completed  += 1;

        let job = &self.jobs[j];
        match outcome {
            FrameOutcome::Decoded(img) => {
                let img = Arc::new(img);
                for &s in &job.slots {
                    self.slots[s] = Some(Arc::clone(&img));
                }
                self.fresh.push((j, img));
            }
            FrameOutcome::Failed(reason) => {
                warn!("[frames] {}", EditError::FrameDecodeFailure { timestamp: job.time, reason });
            }
            FrameOutcome::Cancelled => {
                debug!("[frames] {:.3}s cancelled", job.time);
            }
        }
    }

    fn fail_remaining(&mut self, reason: &str) {
        for j in 0..self.jobs.len() {
            if !self.resolved[j] {
                self.resolve(j, FrameOutcome::Failed(reason.to_string()));
            }
        }
    }

    fn take_if_complete(&mut self, store: &mut ThumbnailStore) -> Option<Vec<PreviewFrame>> {
        if self.completed < self.jobs.len() {
            return None;
        }
        self.delivered = true;

        let (w, h) = self.thumb_px;
        for (j, img) in self.fresh.drain(..) {
            let key = ThumbKey { path: self.source_id.clone(), millis: self.jobs[j].key, width: w, height: h };
            store.insert(key, img);
        }

        let blank = Arc::new(RgbaImage::new(w, h));
        let frames: Vec<PreviewFrame> = self.times.iter()
            .zip(self.slots.iter_mut())
            .map(|(&timestamp, slot)| match slot.take() {
                Some(image) => PreviewFrame { timestamp, image, placeholder: false },
                None        => PreviewFrame { timestamp, image: Arc::clone(&blank), placeholder: true },
            })
            .collect();

        let blanks = frames.iter().filter(|f| f.placeholder).count();
        info!(
            "[frames] delivered {} thumbnails ({} placeholders) in {:.0}ms",
            frames.len(), blanks, self.started.elapsed().as_secs_f64() * 1000.0
        );
        Some(frames)
    }
}

impl Drop for PendingFrames {
    fn drop(&mut self) {
        if !self.delivered {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use parking_lot::Mutex;

    const WAIT: Duration = Duration::from_secs(10);

    /// Reports frames in reverse order; every decoded frame is a solid colour
    /// whose red channel encodes the request index.
    struct ReverseSource {
        duration: f64,
        fail:     bool,
        calls:    Mutex<usize>,
    }

    impl ReverseSource {
        fn new(duration: f64, fail: bool) -> Arc<Self> {
            Arc::new(Self { duration, fail, calls: Mutex::new(0) })
        }
    }

    impl FrameSource for ReverseSource {
        fn duration(&self) -> f64 { self.duration }

        fn generate(&self, times: &[f64], cancel: &AtomicBool, on_frame: &(dyn Fn(usize, FrameOutcome) + Sync)) {
            *self.calls.lock() += times.len();
            for i in (0..times.len()).rev() {
                let outcome = if cancel.load(Ordering::Relaxed) {
                    FrameOutcome::Cancelled
                } else if self.fail {
                    FrameOutcome::Failed("forced".into())
                } else {
                    FrameOutcome::Decoded(RgbaImage::from_pixel(8, 8, Rgba([i as u8, 0, 0, 255])))
                };
                on_frame(i, outcome);
            }
        }
    }

    /// Reports nothing at all.
    struct SilentSource;

    impl FrameSource for SilentSource {
        fn duration(&self) -> f64 { 2.0 }
        fn generate(&self, _: &[f64], _: &AtomicBool, _: &(dyn Fn(usize, FrameOutcome) + Sync)) {}
    }

    fn store() -> ThumbnailStore {
        ThumbnailStore::new(1 << 20)
    }

    #[test]
    fn three_seconds_at_two_fps_is_six_ordered_frames() {
        let src   = ReverseSource::new(3.0, false);
        let cache = PreviewFrameCache::new(src, "clip.mp4", 2.0, (4, 4));
        let mut s = store();
        let mut p = cache.request(&mut s).spawn();
        let frames = p.wait(&mut s, WAIT).expect("batch completes");

        assert_eq!(frames.len(), 6);
        let ts: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
        assert_eq!(ts, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        for (i, f) in frames.iter().enumerate() {
            assert!(!f.placeholder);
            assert_eq!(f.image.dimensions(), (4, 4));
            assert_eq!(f.image.get_pixel(0, 0)[0], i as u8);
        }
        assert!(p.poll(&mut s).is_none(), "completion fires once");
    }

    #[test]
    fn all_failures_become_placeholders() {
        let src   = ReverseSource::new(3.0, true);
        let cache = PreviewFrameCache::new(src, "clip.mp4", 2.0, (6, 8));
        let mut s = store();
        let mut p = cache.request(&mut s).spawn();
        let frames = p.wait(&mut s, WAIT).expect("batch completes");

        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.placeholder && f.image.dimensions() == (6, 8)));
        assert!(p.wait(&mut s, Duration::from_millis(10)).is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn silent_source_still_completes() {
        let cache = PreviewFrameCache::new(Arc::new(SilentSource), "x.mp4", 1.0, (4, 4));
        let mut s = store();
        let frames = cache.request(&mut s).spawn().wait(&mut s, WAIT).expect("completes");
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.placeholder));
    }

    #[test]
    fn cancelled_batch_completes_with_placeholders() {
        let src   = ReverseSource::new(3.0, false);
        let cache = PreviewFrameCache::new(src, "clip.mp4", 2.0, (4, 4));
        let mut s = store();
        let batch = cache.request(&mut s);
        let mut p = batch.spawn();
        p.cancel();
        let frames = p.wait(&mut s, WAIT).expect("completes");
        assert_eq!(frames.len(), 6);
    }

    #[test]
    fn second_request_is_served_from_store() {
        let src   = ReverseSource::new(3.0, false);
        let cache = PreviewFrameCache::new(Arc::clone(&src) as Arc<dyn FrameSource>, "clip.mp4", 2.0, (4, 4));
        let mut s = store();
        cache.request(&mut s).spawn().wait(&mut s, WAIT).expect("first");
        assert_eq!(*src.calls.lock(), 6);
        assert_eq!(s.len(), 6);

        let mut again = cache.request(&mut s).spawn();
        let frames = again.poll(&mut s).expect("no decode needed");
        assert_eq!(frames.len(), 6);
        assert_eq!(*src.calls.lock(), 6);
        assert!(frames.iter().all(|f| !f.placeholder));
    }

    #[test]
    fn duplicate_timestamps_share_a_decode() {
        let jobs = plan_jobs(&[0.0, 0.1, 0.1000001, 0.3, 0.3]);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[1].slots, vec![1, 2]);
        assert_eq!(jobs[2].slots, vec![3, 4]);
    }

    #[test]
    fn sample_count_is_duration_times_fps_rounded_up() {
        assert_eq!(sample_times(3.0, 2.0).len(), 6);
        assert_eq!(sample_times(1.25, 2.0), vec![0.0, 0.5, 1.0]);
        assert_eq!(sample_times(0.2, 1.0), vec![0.0]);
        // Never a sample at or past the end.
        for (d, fps) in [(3.0, 2.0), (1.25, 2.0), (7.3, 3.0), (0.2, 1.0)] {
            let t = sample_times(d, fps);
            assert_eq!(t.len(), (d * fps).ceil() as usize);
            assert!(t.iter().all(|&x| x < d));
        }
    }
}
