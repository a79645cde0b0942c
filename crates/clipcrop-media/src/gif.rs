// crates/clipcrop-media/src/gif.rs
//
// Animated GIF support. The whole animation is decoded into memory once with
// the image crate; previews, thumbnails and export all index into it.
//
// Frame lookup is uniform over the animation: frame i sits at
// i / (count - 1) of the duration, regardless of per-frame delays.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use log::info;
use rayon::prelude::*;

use crate::source::{FrameOutcome, FrameSource};

/// Delay assumed for frames that declare none (or an unplayably short one).
const DEFAULT_FRAME_DELAY: f64 = 0.1;
const MIN_FRAME_DELAY:     f64 = 0.02;

pub struct AnimatedImage {
    frames:   Vec<Arc<RgbaImage>>,
    duration: f64,
    size:     (u32, u32),
}

impl AnimatedImage {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("read GIF header of {}", path.display()))?;
        let decoded = decoder
            .into_frames()
            .collect_frames()
            .with_context(|| format!("decode GIF frames of {}", path.display()))?;

        let mut delays = Vec::with_capacity(decoded.len());
        let mut frames = Vec::with_capacity(decoded.len());
        for frame in decoded {
            let (num, den) = frame.delay().numer_denom_ms();
            delays.push(if den == 0 { 0.0 } else { num as f64 / den as f64 / 1000.0 });
            frames.push(frame.into_buffer());
        }
        let anim = Self::from_frames(frames, &delays)?;
        info!(
            "[gif] {} frames, {:.2}s, {}x{} ← {}",
            anim.frame_count(), anim.duration, anim.size.0, anim.size.1, path.display()
        );
        Ok(anim)
    }

    /// Build from already-decoded frames. `delays` are seconds per frame;
    /// missing or too-short delays fall back to 0.1 s.
    pub fn from_frames(frames: Vec<RgbaImage>, delays: &[f64]) -> Result<Self> {
        let first = frames.first().context("animation has no frames")?;
        let size  = first.dimensions();
        let duration = (0..frames.len())
            .map(|i| match delays.get(i) {
                Some(&d) if d >= MIN_FRAME_DELAY => d,
                _ => DEFAULT_FRAME_DELAY,
            })
            .sum();
        Ok(Self { frames: frames.into_iter().map(Arc::new).collect(), duration, size })
    }

    pub fn frame_count(&self) -> usize { self.frames.len() }
    pub fn duration(&self)    -> f64   { self.duration }
    pub fn size(&self)        -> (u32, u32) { self.size }

    pub fn frame_rate(&self) -> f64 {
        self.frames.len() as f64 / self.duration
    }

    /// Frame shown at `t`: `round(min(1, t / duration) × (count − 1))`.
    pub fn index_at(&self, t: f64) -> usize {
        let last = self.frames.len().saturating_sub(1);
        let p    = (t / self.duration).clamp(0.0, 1.0);
        ((p * last as f64).round() as usize).min(last)
    }

    pub fn frame_at(&self, t: f64) -> Arc<RgbaImage> {
        Arc::clone(&self.frames[self.index_at(t)])
    }

    /// Frames covering `[start, end)` in display order.
    pub fn frames_between(&self, start: f64, end: f64) -> impl Iterator<Item = &Arc<RgbaImage>> + '_ {
        let a = self.index_at(start);
        let b = self.index_at(end).max(a + 1).min(self.frames.len());
        self.frames[a..b].iter()
    }
}

impl FrameSource for AnimatedImage {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn generate(
        &self,
        times:    &[f64],
        cancel:   &AtomicBool,
        on_frame: &(dyn Fn(usize, FrameOutcome) + Sync),
    ) {
        times.par_iter().enumerate().for_each(|(i, &t)| {
            if cancel.load(Ordering::Relaxed) {
                on_frame(i, FrameOutcome::Cancelled);
            } else {
                on_frame(i, FrameOutcome::Decoded((*self.frame_at(t)).clone()));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use parking_lot::Mutex;

    fn solid(n: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([n, n, n, 255]))
    }

    fn anim(count: u8, delay: f64) -> AnimatedImage {
        let frames = (0..count).map(solid).collect();
        AnimatedImage::from_frames(frames, &vec![delay; count as usize]).unwrap()
    }

    #[test]
    fn duration_sums_delays_with_fallback() {
        let a = AnimatedImage::from_frames(vec![solid(0), solid(1), solid(2)], &[0.05, 0.0]).unwrap();
        assert!((a.duration() - 0.25).abs() < 1e-9);
        assert!(AnimatedImage::from_frames(Vec::new(), &[]).is_err());
    }

    #[test]
    fn index_is_uniform_and_clamped() {
        let a = anim(11, 0.1); // 1.1s, indices 0..=10
        assert_eq!(a.index_at(-1.0), 0);
        assert_eq!(a.index_at(0.0), 0);
        assert_eq!(a.index_at(0.55), 5);
        assert_eq!(a.index_at(1.1), 10);
        assert_eq!(a.index_at(50.0), 10);
        assert_eq!(a.frame_at(0.55).get_pixel(0, 0)[0], 5);
    }

    #[test]
    fn frames_between_never_empty() {
        let a = anim(10, 0.1);
        assert_eq!(a.frames_between(0.0, 1.0).count(), 9);
        assert_eq!(a.frames_between(0.5, 0.5).count(), 1);
    }

    #[test]
    fn generate_reports_every_index_once() {
        let a      = anim(8, 0.1);
        let times  = [0.0, 0.2, 0.4, 0.8];
        let seen   = Mutex::new(Vec::new());
        let cancel = AtomicBool::new(false);
        a.generate(&times, &cancel, &|i: usize, o: FrameOutcome| {
            assert!(matches!(o, FrameOutcome::Decoded(_)));
            seen.lock().push(i);
        });
        let mut seen = seen.into_inner();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn generate_honours_cancel() {
        let a      = anim(4, 0.1);
        let cancel = AtomicBool::new(true);
        let count  = Mutex::new(0);
        a.generate(&[0.0, 0.1], &cancel, &|_: usize, o: FrameOutcome| {
            assert!(matches!(o, FrameOutcome::Cancelled));
            *count.lock() += 1;
        });
        assert_eq!(*count.lock(), 2);
    }
}
