// crates/clipcrop-media/src/helpers/rgba.rs
//
// RGBA pixel plumbing between ffmpeg frames and `image::RgbaImage`.
//
// ffmpeg frame rows may carry stride padding; `RgbaImage` is always tightly
// packed (`width * 4` bytes per row). Every copy in either direction goes
// through `pack_rgba` / `write_rgba` so the stride handling lives in one place.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::util::frame::video::Video as VideoFrame;
use image::imageops::{self, FilterType};
use image::RgbaImage;

use clipcrop_core::helpers::geometry::Rect;

/// Copy an RGBA `VideoFrame` into a packed image. `None` for empty frames or
/// a stride shorter than one row.
pub fn pack_rgba(frame: &VideoFrame) -> Option<RgbaImage> {
    let width  = frame.width() as usize;
    let height = frame.height() as usize;
    if width == 0 || height == 0 {
        return None;
    }
    let stride    = frame.stride(0);
    let row_bytes = width * 4;
    if stride < row_bytes {
        return None;
    }

    let data = frame.data(0);
    let mut buffer = vec![0_u8; row_bytes * height];
    for y in 0..height {
        let src = data.get(y * stride..y * stride + row_bytes)?;
        buffer[y * row_bytes..(y + 1) * row_bytes].copy_from_slice(src);
    }
    RgbaImage::from_vec(width as u32, height as u32, buffer)
}

/// Copy a packed image into a freshly allocated RGBA `VideoFrame`.
pub fn write_rgba(image: &RgbaImage) -> VideoFrame {
    let (w, h)    = image.dimensions();
    let mut frame = VideoFrame::new(Pixel::RGBA, w, h);
    let stride    = frame.stride(0);
    let row_bytes = w as usize * 4;
    let src       = image.as_raw();
    let dst       = frame.data_mut(0);
    for y in 0..h as usize {
        dst[y * stride..y * stride + row_bytes]
            .copy_from_slice(&src[y * row_bytes..(y + 1) * row_bytes]);
    }
    frame
}

/// Bytes held by a decoded image. Used for the thumbnail store's budget.
pub fn image_size_bytes(image: &RgbaImage) -> usize {
    (image.width() as usize)
        .saturating_mul(image.height() as usize)
        .saturating_mul(4)
}

/// Scale to fit inside `max_w × max_h`, never upscaling. Always ≥ 1×1.
pub fn fit_dimensions(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let max_w = max_w.max(1);
    let max_h = max_h.max(1);
    if src_w <= max_w && src_h <= max_h {
        return (src_w.max(1), src_h.max(1));
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64).max(0.0001);
    (
        (src_w as f64 * scale).round().max(1.0) as u32,
        (src_h as f64 * scale).round().max(1.0) as u32,
    )
}

/// Aspect-fill into exactly `w × h`: scale until the box is covered, then
/// crop the overflow evenly from both sides.
pub fn aspect_fill_resize(image: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    let (w, h)   = (w.max(1), h.max(1));
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        return RgbaImage::new(w, h);
    }
    let scale = (w as f64 / iw as f64).max(h as f64 / ih as f64);
    let sw    = ((iw as f64 * scale).ceil() as u32).max(w);
    let sh    = ((ih as f64 * scale).ceil() as u32).max(h);
    let scaled = imageops::resize(image, sw, sh, FilterType::Triangle);
    imageops::crop_imm(&scaled, (sw - w) / 2, (sh - h) / 2, w, h).to_image()
}

/// Apply a clockwise display rotation tag (0 / 90 / 180 / 270).
pub fn rotate(image: RgbaImage, rotation: u32) -> RgbaImage {
    match rotation % 360 {
        90  => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _   => image,
    }
}

/// Pixel crop box `(x, y, w, h)` for an encoder: rounded into `bounds`,
/// with even width/height (YUV420P chroma subsampling) and at least 2×2.
pub fn even_crop_box(rect: Rect, bounds: (u32, u32)) -> (u32, u32, u32, u32) {
    let (bw, bh) = (bounds.0.max(2), bounds.1.max(2));
    let x = (rect.x.max(0.0).round() as u32).min(bw - 2);
    let y = (rect.y.max(0.0).round() as u32).min(bh - 2);
    let w = ((rect.width.round()  as u32).min(bw - x) & !1).max(2);
    let h = ((rect.height.round() as u32).min(bh - y) & !1).max(2);
    (x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fill_resize_hits_exact_box() {
        let src = RgbaImage::from_pixel(1920, 1080, Rgba([10, 20, 30, 255]));
        let out = aspect_fill_resize(&src, 60, 80);
        assert_eq!(out.dimensions(), (60, 80));
        assert_eq!(out.get_pixel(30, 40), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn fill_resize_upscales_tiny_sources() {
        let src = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        assert_eq!(aspect_fill_resize(&src, 90, 120).dimensions(), (90, 120));
    }

    #[test]
    fn fill_resize_crops_centered() {
        // left half red, right half blue; a square crop keeps both colours
        let mut src = RgbaImage::new(200, 100);
        for (x, _, p) in src.enumerate_pixels_mut() {
            *p = if x < 100 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) };
        }
        let out = aspect_fill_resize(&src, 10, 10);
        assert_eq!(out.get_pixel(0, 5)[0], 255);
        assert_eq!(out.get_pixel(9, 5)[2], 255);
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_dimensions(320, 240, 960, 540), (320, 240));
        assert_eq!(fit_dimensions(3840, 2160, 960, 540), (960, 540));
        assert_eq!(fit_dimensions(1080, 1920, 960, 540), (304, 540));
    }

    #[test]
    fn crop_box_is_even_and_inside() {
        let (x, y, w, h) = even_crop_box(Rect::new(10.4, 3.6, 101.0, 57.0), (120, 60));
        assert_eq!((x, y), (10, 4));
        assert_eq!((w, h), (100, 56));
        assert!(x + w <= 120 && y + h <= 60);

        let (_, _, w, h) = even_crop_box(Rect::new(500.0, 500.0, 0.3, 0.3), (64, 64));
        assert_eq!((w, h), (2, 2));
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let img = RgbaImage::new(4, 2);
        assert_eq!(rotate(img.clone(), 90).dimensions(), (2, 4));
        assert_eq!(rotate(img.clone(), 180).dimensions(), (4, 2));
        assert_eq!(rotate(img, 0).dimensions(), (4, 2));
    }
}
