// crates/clipcrop-media/src/worker.rs
//
// MediaWorker: background probing and the crop-preview frame thread.
// All ffmpeg work the UI triggers outside an EditSession goes through here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use clipcrop_core::media_types::MediaResult;

use crate::decode::{SeekDecoder, PREVIEW_DECODE_BOX};
use crate::probe::probe_source;

// ── Internal types ────────────────────────────────────────────────────────────

struct FrameRequest {
    id:        Uuid,
    path:      PathBuf,
    timestamp: f64,
}

type FrameSlot = Arc<(Mutex<Option<FrameRequest>>, Condvar)>;

// ── MediaWorker ───────────────────────────────────────────────────────────────

pub struct MediaWorker {
    /// Probe results and errors.
    pub rx:       Receiver<MediaResult>,
    tx:           Sender<MediaResult>,

    /// Crop-preview frames. Separate from `rx` so a slow probe never delays
    /// the frame under the user's finger.
    pub scrub_rx: Receiver<MediaResult>,

    /// Latest-wins slot for preview frames.
    frame_req:    FrameSlot,
    shutdown:     Arc<AtomicBool>,
}

impl Default for MediaWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaWorker {
    pub fn new() -> Self {
        let (tx, rx)             = bounded(64);
        let (scrub_tx, scrub_rx) = bounded(8);

        let frame_req: FrameSlot = Arc::new((Mutex::new(None), Condvar::new()));

        // ── Preview frame thread ──────────────────────────────────────────────
        // Blocks on the latest-wins slot; keeps one decoder open per file.
        let slot = Arc::clone(&frame_req);
        let spawned = thread::Builder::new()
            .name("clipcrop-scrub".into())
            .spawn(move || scrub_loop(slot, scrub_tx));
        if let Err(e) = spawned {
            warn!("[scrub] could not start preview thread: {e}");
        }

        Self { rx, tx, scrub_rx, frame_req, shutdown: Arc::new(AtomicBool::new(false)) }
    }

    /// Probe `path` in the background; answers `Probed` or `Error` on `rx`.
    pub fn probe(&self, id: Uuid, path: PathBuf) {
        let tx = self.tx.clone();
        let sd = Arc::clone(&self.shutdown);
        thread::spawn(move || {
            if sd.load(Ordering::Relaxed) { return; }
            let result = match probe_source(&path) {
                Ok(info) => MediaResult::Probed { id, info },
                Err(e)   => MediaResult::Error { id, msg: format!("{e:#}") },
            };
            let _ = tx.send(result);
        });
    }

    /// Ask for the preview frame at `timestamp`. Overwrites any request the
    /// thread has not picked up yet.
    pub fn request_frame(&self, id: Uuid, path: PathBuf, timestamp: f64) {
        let (lock, cvar) = &*self.frame_req;
        *lock.lock() = Some(FrameRequest { id, path, timestamp });
        cvar.notify_one();
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Poison-pill: a nil id wakes the preview thread and makes it exit.
        let (lock, cvar) = &*self.frame_req;
        *lock.lock() = Some(FrameRequest { id: Uuid::nil(), path: PathBuf::new(), timestamp: 0.0 });
        cvar.notify_one();
    }
}

fn scrub_loop(slot: FrameSlot, tx: Sender<MediaResult>) {
    let mut live: Option<SeekDecoder> = None;
    loop {
        let req = {
            let (lock, cvar) = &*slot;
            let mut guard = lock.lock();
            loop {
                if let Some(req) = guard.take() {
                    break req;
                }
                cvar.wait(&mut guard);
            }
        };

        if req.id == Uuid::nil() { return; }

        if live.as_ref().map_or(true, |d| d.path != req.path) {
            live = match SeekDecoder::open(&req.path, PREVIEW_DECODE_BOX.0, PREVIEW_DECODE_BOX.1) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("[scrub] open {}: {e}", req.path.display());
                    let _ = tx.send(MediaResult::Error { id: req.id, msg: e.to_string() });
                    None
                }
            };
        }
        let Some(d) = live.as_mut() else { continue };

        match d.frame_at(req.timestamp) {
            Ok(img) => {
                let (width, height) = img.dimensions();
                debug!("[scrub] {:.3}s → {width}x{height}", req.timestamp);
                let msg = MediaResult::ScrubFrame {
                    id: req.id, timestamp: req.timestamp, width, height, data: img.into_raw(),
                };
                if tx.send(msg).is_err() { return; }
            }
            Err(e) => warn!("[scrub] frame at {:.3}s: {e}", req.timestamp),
        }
    }
}
