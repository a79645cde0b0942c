// crates/clipcrop-media/src/decode.rs
//
// SeekDecoder: stateful ffmpeg video decoder for one file. Two access modes:
//   frame_at(t)   the frame on screen at t; short forward steps keep
//                 decoding from the current position, anything else seeks
//   next_frame()  sequential decode from wherever the demuxer sits (export)
//
// VideoFrameSource: FrameSource over a video file. One batch = one decoder,
// timestamps visited in ascending order so close samples decode forward
// without seeking.
//
// Frames come out RGBA, scaled to fit the decoder's box and rotated by the
// stream's display rotation, so callers only ever see display-oriented pixels.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Result};
use image::RgbaImage;
use log::{debug, warn};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use clipcrop_core::state::SourceInfo;

use crate::helpers::rgba::{fit_dimensions, pack_rgba, rotate};
use crate::helpers::seek::{plan_reposition, seek_to_secs, Reposition, PTS_EPSILON};
use crate::probe::stream_rotation;
use crate::source::{FrameOutcome, FrameSource};

/// Decode box for thumbnail batches. Thumbnails are tiny; decoding straight
/// into this box keeps the aspect-fill resize cheap.
pub const THUMB_DECODE_BOX: (u32, u32) = (320, 320);

/// Decode box for the crop preview.
pub const PREVIEW_DECODE_BOX: (u32, u32) = (960, 960);

// ── Stateful per-file decoder ─────────────────────────────────────────────────

pub struct SeekDecoder {
    pub path:      PathBuf,
    ictx:          ffmpeg::format::context::Input,
    decoder:       ffmpeg::decoder::video::Video,
    video_idx:     usize,
    secs_per_tick: f64,
    scaler:        SwsContext,
    rotation:      u32,
    eof_sent:      bool,
    /// False until the first decode or seek on this context.
    touched:       bool,
    /// Frame last returned by `frame_at`, with its presentation time.
    shown:         Option<(f64, VideoFrame)>,
    /// Frame decoded past the last `frame_at` target, held for the next call.
    ahead:         Option<(f64, VideoFrame)>,
    /// Presentation time of the most recently decoded frame.
    last_secs:     f64,
}

impl SeekDecoder {
    /// Open `path` for decoding, scaling output to fit `max_w × max_h` in
    /// display orientation. Pass `u32::MAX` for native size.
    pub fn open(path: &Path, max_w: u32, max_h: u32) -> Result<Self> {
        let ictx = input(path)?;
        let (video_idx, secs_per_tick, rotation) = {
            let stream = ictx.streams().best(Type::Video)
                .ok_or_else(|| anyhow!("no video stream in {}", path.display()))?;
            (stream.index(), f64::from(stream.time_base()), stream_rotation(&stream))
        };

        // Second context for decoder params (avoids borrow conflict with ictx).
        let ictx2   = input(path)?;
        let stream2 = ictx2.stream(video_idx).ok_or_else(|| anyhow!("stream gone"))?;
        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())?;
        let decoder = dec_ctx.decoder().video()?;

        // Fit the box in display orientation, then scale in storage orientation.
        let (box_w, box_h) = if rotation % 180 == 90 { (max_h, max_w) } else { (max_w, max_h) };
        let (out_w, out_h) = fit_dimensions(decoder.width(), decoder.height(), box_w, box_h);

        let scaler = SwsContext::get(
            decoder.format(), decoder.width(), decoder.height(),
            Pixel::RGBA, out_w, out_h, Flags::BILINEAR,
        )?;

        debug!(
            "[decode] open {} {}x{} → {out_w}x{out_h} rot={rotation}",
            path.display(), decoder.width(), decoder.height()
        );

        Ok(Self {
            path: path.to_path_buf(),
            ictx, decoder, video_idx, secs_per_tick, scaler, rotation,
            eof_sent: false,
            touched: false,
            shown: None,
            ahead: None,
            last_secs: 0.0,
        })
    }

    fn pts_to_secs(&self, pts: i64) -> f64 {
        pts as f64 * self.secs_per_tick
    }

    fn to_image(&mut self, decoded: &VideoFrame) -> Result<RgbaImage> {
        let mut out = VideoFrame::empty();
        self.scaler.run(decoded, &mut out)?;
        let img = pack_rgba(&out).ok_or_else(|| anyhow!("scaled frame has no pixels"))?;
        Ok(rotate(img, self.rotation))
    }

    /// Pull the next decoded frame, draining the decoder at end of stream.
    fn receive(&mut self) -> Option<VideoFrame> {
        loop {
            let mut decoded = VideoFrame::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or_else(|| (self.last_secs / self.secs_per_tick) as i64 + 1);
                self.last_secs = self.pts_to_secs(pts);
                return Some(decoded);
            }
            if self.eof_sent {
                return None;
            }
            match self.ictx.packets().flatten().find(|(s, _)| s.index() == self.video_idx) {
                Some((_, packet)) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        debug!("[decode] send_packet: {e}");
                    }
                }
                None => {
                    self.eof_sent = true;
                    let _ = self.decoder.send_eof();
                }
            }
        }
    }

    /// Seek to the keyframe at or before `t` and drop all decoder state.
    /// A context that refuses the seek is reopened, which leaves it at 0;
    /// decoding forward from there still reaches `t`.
    fn reposition(&mut self, t: f64, label: &str) {
        if !seek_to_secs(&mut self.ictx, t, label) {
            match input(&self.path) {
                Ok(ictx) => self.ictx = ictx,
                Err(e)   => warn!("[decode] reopen {} after failed seek: {e}", self.path.display()),
            }
        }
        self.decoder.flush();
        self.eof_sent = false;
        self.shown    = None;
        self.ahead    = None;
    }

    /// Frame on screen at `t` (the last frame whose PTS ≤ t). Zero tolerance:
    /// pre-roll from the keyframe is decoded and discarded. Past the end of
    /// stream this is the final frame.
    ///
    /// A `t` slightly ahead of the previous call continues decoding from the
    /// current position, so playback costs one decode per displayed frame.
    pub fn frame_at(&mut self, t: f64) -> Result<RgbaImage> {
        let shown_secs = self.shown.as_ref().map(|(secs, _)| *secs);
        if plan_reposition(self.touched, shown_secs, t) == Reposition::Seek {
            self.reposition(t, "frame_at");
        }
        self.touched = true;

        loop {
            if let Some((secs, _)) = &self.ahead {
                if *secs > t + PTS_EPSILON {
                    break;
                }
                self.shown = self.ahead.take();
                continue;
            }
            match self.receive() {
                Some(decoded) => self.ahead = Some((self.last_secs, decoded)),
                None          => break,
            }
        }
        // Seek landed late: nothing at or before t, show the first frame.
        if self.shown.is_none() {
            self.shown = self.ahead.take();
        }

        let (secs, frame) = self.shown.take()
            .ok_or_else(|| anyhow!("no frame decoded at {t:.3}s"))?;
        let img = self.to_image(&frame);
        self.shown = Some((secs, frame));
        img
    }

    /// Decode the next frame in stream order. `None` at end of stream.
    pub fn next_frame(&mut self) -> Option<Result<(f64, RgbaImage)>> {
        self.touched = true;
        self.shown   = None;
        let (secs, decoded) = match self.ahead.take() {
            Some(held) => held,
            None => {
                let decoded = self.receive()?;
                (self.last_secs, decoded)
            }
        };
        Some(self.to_image(&decoded).map(|img| (secs, img)))
    }

    /// Position the demuxer for sequential decoding from `t`.
    pub fn seek(&mut self, t: f64) {
        if plan_reposition(self.touched, None, t) == Reposition::Seek {
            self.reposition(t, "seek");
        }
        self.touched = true;
    }
}

// ── FrameSource over a video file ─────────────────────────────────────────────

pub struct VideoFrameSource {
    path:       PathBuf,
    duration:   f64,
    decode_box: (u32, u32),
}

impl VideoFrameSource {
    pub fn new(info: &SourceInfo) -> Self {
        Self { path: info.path.clone(), duration: info.duration, decode_box: THUMB_DECODE_BOX }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for VideoFrameSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn generate(
        &self,
        times:    &[f64],
        cancel:   &AtomicBool,
        on_frame: &(dyn Fn(usize, FrameOutcome) + Sync),
    ) {
        let mut decoder = match SeekDecoder::open(&self.path, self.decode_box.0, self.decode_box.1) {
            Ok(d) => d,
            Err(e) => {
                warn!("[frames] cannot open {}: {e}", self.path.display());
                let msg = e.to_string();
                for i in 0..times.len() {
                    on_frame(i, FrameOutcome::Failed(msg.clone()));
                }
                return;
            }
        };

        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        for i in order {
            if cancel.load(Ordering::Relaxed) {
                on_frame(i, FrameOutcome::Cancelled);
                continue;
            }
            match decoder.frame_at(times[i]) {
                Ok(img) => on_frame(i, FrameOutcome::Decoded(img)),
                Err(e)  => on_frame(i, FrameOutcome::Failed(e.to_string())),
            }
        }
    }
}
