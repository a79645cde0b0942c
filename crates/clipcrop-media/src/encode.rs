// crates/clipcrop-media/src/encode.rs
//
// Single-source trim + crop → H.264 MP4.
//
// Design:
//   • `encode_clip()`: blocking; runs on the export thread started by
//     FfmpegExporter. Reports progress every PROGRESS_INTERVAL frames and
//     returns Err(CANCELLED) when the monitor asks it to stop.
//   • Source frames arrive as display-oriented RGBA (video via SeekDecoder at
//     native size, GIFs from memory), so the crop rect applies directly in
//     natural-size pixels.
//   • Each frame: crop → RGBA VideoFrame → swscale to YUV420P → encoder.
//
// Stream layout in the output MP4:
//   Stream 0: H.264 video (YUV420P, CRF 18, preset fast). No audio.
//
// PTS strategy:
//   Monotonically increasing frame counter in 1/fps, starting at zero, so the
//   output always begins at t = 0 regardless of the trim in-point.

use std::path::Path;

use image::imageops;
use image::RgbaImage;
use log::{debug, info};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::{output as open_output, Pixel};
use ffmpeg::software::scaling::{Context as ScaleCtx, Flags as ScaleFlags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use clipcrop_core::media_types::CANCELLED;
use clipcrop_core::state::MediaKind;

use crate::decode::SeekDecoder;
use crate::export::{ExportReporter, ExportRequest};
use crate::gif::AnimatedImage;
use crate::helpers::rgba::{even_crop_box, write_rgba};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Send a progress update every this many encoded video frames.
const PROGRESS_INTERVAL: u64 = 15;

/// Output frame-rate bounds. Source rates are rounded into this range.
const MIN_FPS: i32 = 1;
const MAX_FPS: i32 = 120;

// ── Public entry point ────────────────────────────────────────────────────────

/// Encode `req` to `req.output`. Blocking: run this on a dedicated thread.
pub fn encode_clip(req: &ExportRequest, reporter: &ExportReporter) -> Result<(), String> {
    if !(req.end > req.start) {
        return Err(format!("empty export range {:.3}s → {:.3}s", req.start, req.end));
    }

    let fps = (req.source.frame_rate.round() as i32).clamp(MIN_FPS, MAX_FPS);
    let crop = even_crop_box(req.crop, req.source.natural_size);
    let total_frames = (((req.end - req.start) * fps as f64).ceil() as u64).max(1);

    let mut sink = H264Sink::open(&req.output, crop.2, crop.3, fps)?;
    let mut push = |image: &RgbaImage| -> Result<(), String> {
        let (x, y, w, h) = crop;
        let cropped = imageops::crop_imm(image, x, y, w, h).to_image();
        sink.push(&cropped)?;
        if sink.frames % PROGRESS_INTERVAL == 0 {
            reporter.progress((sink.frames as f32 / total_frames as f32).min(1.0));
        }
        if reporter.is_cancelled() {
            return Err(CANCELLED.into());
        }
        Ok(())
    };

    match req.source.kind {
        MediaKind::Video         => video_frames(&req.source.path, req.start, req.end, fps, &mut push)?,
        MediaKind::AnimatedImage => animated_frames(&req.source.path, req.start, req.end, &mut push)?,
    }

    if sink.frames == 0 {
        return Err(format!("no frames between {:.3}s and {:.3}s", req.start, req.end));
    }
    sink.finish()?;
    reporter.progress(1.0);
    Ok(())
}

// ── Frame producers ───────────────────────────────────────────────────────────

fn video_frames(
    path:  &Path,
    start: f64,
    end:   f64,
    fps:   i32,
    push:  &mut dyn FnMut(&RgbaImage) -> Result<(), String>,
) -> Result<(), String> {
    let mut decoder = SeekDecoder::open(path, u32::MAX, u32::MAX)
        .map_err(|e| format!("open '{}': {e}", path.display()))?;
    decoder.seek(start);

    let half_frame = 0.5 / fps as f64;
    while let Some(next) = decoder.next_frame() {
        let (secs, image) = next.map_err(|e| format!("decode video frame: {e}"))?;
        // Skip pre-roll frames before the trim in-point.
        if secs < start - half_frame { continue; }
        if secs >= end { break; }
        push(&image)?;
    }
    Ok(())
}

fn animated_frames(
    path:  &Path,
    start: f64,
    end:   f64,
    push:  &mut dyn FnMut(&RgbaImage) -> Result<(), String>,
) -> Result<(), String> {
    let anim = AnimatedImage::open(path).map_err(|e| format!("{e:#}"))?;
    for frame in anim.frames_between(start, end) {
        push(&**frame)?;
    }
    Ok(())
}

// ── H.264 sink ────────────────────────────────────────────────────────────────

struct H264Sink {
    octx:     ffmpeg::format::context::Output,
    encoder:  ffmpeg::encoder::video::Video,
    scaler:   Option<ScaleCtx>,
    width:    u32,
    height:   u32,
    frame_tb: Rational,
    ost_tb:   Rational,
    frames:   u64,
}

impl H264Sink {
    fn open(output: &Path, width: u32, height: u32, fps: i32) -> Result<Self, String> {
        let mut octx = open_output(output)
            .map_err(|e| format!("could not open output '{}': {e}", output.display()))?;

        let frame_tb = Rational::new(1, fps);

        let h264 = encoder::find(CodecId::H264)
            .ok_or_else(|| "H.264 encoder not found, is libx264 available?".to_string())?;

        let mut ost = octx.add_stream(h264)
            .map_err(|e| format!("add video stream: {e}"))?;
        ost.set_time_base(frame_tb);

        let enc_ctx = codec::context::Context::new_with_codec(h264);
        let mut enc = enc_ctx.encoder().video()
            .map_err(|e| format!("create video encoder context: {e}"))?;

        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(frame_tb);
        enc.set_frame_rate(Some(Rational::new(fps, 1)));
        enc.set_bit_rate(0); // CRF controls quality

        let mut opts = ffmpeg::Dictionary::new();
        opts.set("crf",    "18");
        opts.set("preset", "fast");

        let mut encoder = enc.open_as_with(h264, opts)
            .map_err(|e| format!("open H.264 encoder: {e}"))?;

        // libavcodec resets the SAR while opening; set it on the opened context.
        encoder.set_aspect_ratio(Rational::new(1, 1));

        // encoder::Video has no AsPtr<AVCodecParameters>; copy through FFI.
        unsafe {
            let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
            );
            if ret < 0 {
                return Err(format!("avcodec_parameters_from_context failed: {ret}"));
            }
        }

        octx.write_header()
            .map_err(|e| format!("write output header: {e}"))?;

        let ost_tb = octx.stream(0)
            .map(|s| s.time_base())
            .ok_or_else(|| "output stream vanished after header".to_string())?;

        debug!("[export] encoder {width}x{height} @ {fps}fps → {}", output.display());
        Ok(Self { octx, encoder, scaler: None, width, height, frame_tb, ost_tb, frames: 0 })
    }

    fn push(&mut self, image: &RgbaImage) -> Result<(), String> {
        let rgba = write_rgba(image);

        // Created on the first frame: the cropped size is only known once a
        // real frame has been clipped against its bounds.
        if self.scaler.is_none() {
            let sc = ScaleCtx::get(
                Pixel::RGBA,    rgba.width(), rgba.height(),
                Pixel::YUV420P, self.width,   self.height,
                ScaleFlags::BILINEAR,
            ).map_err(|e| format!("create swscale context: {e}"))?;
            self.scaler = Some(sc);
        }
        let Some(sc) = self.scaler.as_mut() else {
            return Err("scaler missing".into());
        };

        let mut yuv = VideoFrame::empty();
        sc.run(&rgba, &mut yuv)
            .map_err(|e| format!("scale video frame: {e}"))?;
        yuv.set_pts(Some(self.frames as i64));
        // swscale leaves SAR unset; no safe setter exists in ffmpeg-the-third 4.
        unsafe {
            (*yuv.as_mut_ptr()).sample_aspect_ratio = ffmpeg::ffi::AVRational { num: 1, den: 1 };
        }

        self.encoder.send_frame(&yuv)
            .map_err(|e| format!("send video frame to encoder: {e}"))?;
        self.drain()?;
        self.frames += 1;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), String> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, self.ost_tb);
            pkt.write_interleaved(&mut self.octx)
                .map_err(|e| format!("write video packet: {e}"))?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(), String> {
        self.encoder.send_eof()
            .map_err(|e| format!("send EOF to video encoder: {e}"))?;
        self.drain()?;
        self.octx.write_trailer()
            .map_err(|e| format!("write trailer: {e}"))?;
        info!("[export] wrote {} frames", self.frames);
        Ok(())
    }
}
