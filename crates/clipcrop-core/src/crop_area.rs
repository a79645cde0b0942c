// crates/clipcrop-core/src/crop_area.rs
//
// CropAreaModel: fixed-aspect crop frame over a zoomable, pannable preview.
//
// Three spaces are involved:
//   viewport  the preview container, top-left origin, points
//   preview   the unzoomed preview image (`base_size`), top-left origin
//   source    native pixels of the media, orientation already applied
//
// The crop frame is fixed in viewport space; zoom/pan move the preview under
// it. `offset` is the viewport→content translation: a viewport point p sits
// over content point p + offset, and content = preview × zoom.
//
// Every rect produced here is top-left origin. `export_rect` converts to the
// convention an exporter declares, so the flip happens in exactly one place.

use log::debug;

use crate::config::EditorConfig;
use crate::helpers::geometry::{
    aspect_fill, aspect_fit, aspect_ratio_size, flip_vertical, CoordinateOrigin, Point, Rect, Size,
};
use crate::state::AspectRatio;

#[derive(Clone, Debug, PartialEq)]
pub struct CropAreaModel {
    source_size:    Size,
    aspect:         AspectRatio,
    crop_inset:     f64,
    max_zoom_floor: f64,
    viewport:       Size,
    crop_frame:     Rect,
    base_size:      Size,
    zoom:           f64,
    min_zoom:       f64,
    max_zoom:       f64,
    offset:         Point,
}

impl CropAreaModel {
    /// Panics on an empty source size; probing substitutes a fallback size
    /// for media without a video track.
    pub fn new(source_size: Size, aspect: AspectRatio, config: &EditorConfig) -> Self {
        assert!(!source_size.is_empty(), "crop source must have a size, got {source_size:?}");
        Self {
            source_size,
            aspect,
            crop_inset:     config.crop_inset,
            max_zoom_floor: config.max_zoom_floor,
            viewport:       Size::default(),
            crop_frame:     Rect::default(),
            base_size:      Size::default(),
            zoom:           1.0,
            min_zoom:       1.0,
            max_zoom:       config.max_zoom_floor,
            offset:         Point::default(),
        }
    }

    pub fn source_size(&self) -> Size        { self.source_size }
    pub fn aspect(&self)      -> AspectRatio { self.aspect }
    pub fn viewport(&self)    -> Size        { self.viewport }
    pub fn crop_frame(&self)  -> Rect        { self.crop_frame }
    pub fn base_size(&self)   -> Size        { self.base_size }
    pub fn zoom(&self)        -> f64         { self.zoom }
    pub fn zoom_range(&self)  -> (f64, f64)  { (self.min_zoom, self.max_zoom) }
    pub fn offset(&self)      -> Point       { self.offset }

    /// Zoomed preview in viewport coordinates.
    pub fn content_rect(&self) -> Rect {
        Rect::new(
            -self.offset.x,
            -self.offset.y,
            self.base_size.width  * self.zoom,
            self.base_size.height * self.zoom,
        )
    }

    /// Container resized (or first shown). Resets zoom to the smallest scale
    /// that still covers the crop frame and centers the preview.
    pub fn layout(&mut self, viewport: Size) {
        self.viewport   = viewport;
        let bounds      = Rect::from_size(viewport);
        self.crop_frame = aspect_fit(aspect_ratio_size(self.aspect), bounds.inset(self.crop_inset));

        let fill = aspect_fill(self.source_size, bounds);
        // Snap to whole points; the epsilon keeps an exact fit from flooring down a pixel.
        self.base_size = Size::new((fill.width + 1e-6).floor(), (fill.height + 1e-6).floor());

        if self.base_size.is_empty() || self.crop_frame.size().is_empty() {
            self.min_zoom = 1.0;
            self.max_zoom = self.max_zoom_floor;
            self.zoom     = 1.0;
            self.offset   = Point::default();
            return;
        }

        self.min_zoom = (self.crop_frame.width  / self.base_size.width)
            .max(self.crop_frame.height / self.base_size.height);
        self.max_zoom = (self.min_zoom + 1.0).ceil().max(self.max_zoom_floor);
        self.zoom     = self.min_zoom;

        let content = self.content_rect();
        self.offset = Point::new(
            (content.width  - viewport.width)  * 0.5,
            (content.height - viewport.height) * 0.5,
        );
        self.clamp_offset();
        debug!(
            "[crop] layout viewport={:.0}x{:.0} frame={:?} zoom={:.3}..{:.3}",
            viewport.width, viewport.height, self.crop_frame, self.min_zoom, self.max_zoom
        );
    }

    /// Switch the crop preset. Re-runs layout against the current container.
    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        let viewport = self.viewport;
        self.layout(viewport);
    }

    /// Set the absolute zoom, clamped to the allowed range, keeping the
    /// content under `anchor` (viewport coordinates) fixed on screen.
    pub fn zoom_to(&mut self, scale: f64, anchor: Point) {
        if self.base_size.is_empty() {
            return;
        }
        let scale = scale.max(self.min_zoom).min(self.max_zoom);
        let px = (anchor.x + self.offset.x) / self.zoom;
        let py = (anchor.y + self.offset.y) / self.zoom;
        self.zoom   = scale;
        self.offset = Point::new(px * scale - anchor.x, py * scale - anchor.y);
        self.clamp_offset();
    }

    /// Drag the preview by (`dx`, `dy`) viewport points.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x -= dx;
        self.offset.y -= dy;
        self.clamp_offset();
    }

    /// Keep the crop frame entirely over the content.
    fn clamp_offset(&mut self) {
        let content = self.content_rect();
        let clamp_axis = |v: f64, lo: f64, hi: f64| if hi < lo { (lo + hi) * 0.5 } else { v.max(lo).min(hi) };
        self.offset.x = clamp_axis(
            self.offset.x,
            -self.crop_frame.min_x(),
            content.width - self.crop_frame.max_x(),
        );
        self.offset.y = clamp_axis(
            self.offset.y,
            -self.crop_frame.min_y(),
            content.height - self.crop_frame.max_y(),
        );
    }

    /// Crop frame mapped into unzoomed preview coordinates.
    pub fn crop_rect_in_preview(&self) -> Rect {
        let z = self.zoom;
        Rect::new(
            (self.crop_frame.x + self.offset.x) / z,
            (self.crop_frame.y + self.offset.y) / z,
            self.crop_frame.width  / z,
            self.crop_frame.height / z,
        )
    }

    /// Crop in native source pixels, top-left origin, clamped to the source.
    /// Before the first layout this is the whole source.
    pub fn crop_rect_pixels(&self) -> Rect {
        let full = Rect::from_size(self.source_size);
        if self.base_size.is_empty() || self.crop_frame.size().is_empty() {
            return full;
        }
        self.crop_rect_in_preview()
            .scaled(
                self.source_size.width  / self.base_size.width,
                self.source_size.height / self.base_size.height,
            )
            .intersection(&full)
    }

    /// Crop as fractions of the source size, in [0, 1] × [0, 1].
    pub fn normalized_rect(&self) -> Rect {
        self.crop_rect_pixels()
            .scaled(1.0 / self.source_size.width, 1.0 / self.source_size.height)
    }

    /// Crop in source pixels expressed in the exporter's origin convention.
    pub fn export_rect(&self, origin: CoordinateOrigin) -> Rect {
        let r = self.crop_rect_pixels();
        match origin {
            CoordinateOrigin::TopLeft    => r,
            CoordinateOrigin::BottomLeft => flip_vertical(r, self.source_size.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn approx(a: Rect, b: Rect) -> bool {
        (a.x - b.x).abs() < EPS
            && (a.y - b.y).abs() < EPS
            && (a.width - b.width).abs() < EPS
            && (a.height - b.height).abs() < EPS
    }

    fn model(src: (f64, f64), aspect: AspectRatio, inset: f64, viewport: (f64, f64)) -> CropAreaModel {
        let cfg = EditorConfig { crop_inset: inset, ..Default::default() };
        let mut m = CropAreaModel::new(Size::new(src.0, src.1), aspect, &cfg);
        m.layout(Size::new(viewport.0, viewport.1));
        m
    }

    #[test]
    fn full_frame_maps_to_full_source() {
        let m = model((1920.0, 1440.0), AspectRatio::FourThree, 0.0, (400.0, 300.0));
        assert_eq!(m.crop_frame(), Rect::new(0.0, 0.0, 400.0, 300.0));
        assert!((m.zoom() - 1.0).abs() < EPS);
        assert!(approx(m.crop_rect_pixels(), Rect::new(0.0, 0.0, 1920.0, 1440.0)));
        assert!(approx(m.normalized_rect(), Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(approx(m.export_rect(CoordinateOrigin::BottomLeft), Rect::new(0.0, 0.0, 1920.0, 1440.0)));
    }

    #[test]
    fn zoom_limits() {
        let m = model((1920.0, 1080.0), AspectRatio::OneOne, 20.0, (375.0, 500.0));
        let (lo, hi) = m.zoom_range();
        // square frame 335×335 over an aspect-filled 888×500 preview
        assert!((lo - 335.0 / 500.0).abs() < EPS);
        assert_eq!(hi, 5.0);

        let tiny = model((100.0, 100.0), AspectRatio::OneOne, 0.0, (1000.0, 1000.0));
        // min 1.0 → max(ceil(2.0), 5.0)
        assert_eq!(tiny.zoom_range().1, 5.0);
    }

    #[test]
    fn square_crop_of_landscape_is_centered() {
        let m = model((1920.0, 1080.0), AspectRatio::OneOne, 20.0, (375.0, 500.0));
        let n = m.normalized_rect();
        assert!((n.height - 1.0).abs() < 1e-3);
        assert!((n.mid_x() - 0.5).abs() < 1e-3);
        // whole-point flooring of the preview allows ~0.1% anisotropy
        assert!((n.width * 1920.0 / (n.height * 1080.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn pan_and_zoom_never_leave_source() {
        let mut m = model((1280.0, 720.0), AspectRatio::NineSixteen, 20.0, (390.0, 600.0));
        let src   = Rect::from_size(m.source_size());
        let steps = [(500.0, 0.0), (-2000.0, 300.0), (0.0, -900.0), (40.0, 40.0)];
        for (i, (dx, dy)) in steps.into_iter().enumerate() {
            m.zoom_to(1.0 + i as f64 * 1.7, Point::new(100.0, 250.0));
            m.pan_by(dx, dy);
            let px = m.crop_rect_pixels();
            assert!(src.contains_rect(&px, EPS), "{px:?} escaped {src:?}");
            assert!(m.content_rect().contains_rect(&m.crop_frame(), EPS));
        }
    }

    #[test]
    fn zoom_is_clamped_and_anchor_stays_put() {
        let mut m = model((1920.0, 1080.0), AspectRatio::SixteenNine, 20.0, (400.0, 400.0));
        let anchor = Point::new(200.0, 200.0);
        let before = m.crop_rect_in_preview();
        m.zoom_to(2.0 * m.zoom(), anchor);
        let after = m.crop_rect_in_preview();
        assert!((before.mid_x() - after.mid_x()).abs() < EPS);
        assert!((before.mid_y() - after.mid_y()).abs() < EPS);

        m.zoom_to(1000.0, anchor);
        assert_eq!(m.zoom(), m.zoom_range().1);
        m.zoom_to(0.0, anchor);
        assert_eq!(m.zoom(), m.zoom_range().0);
    }

    #[test]
    fn bottom_left_export_is_a_mirror() {
        let mut m = model((1000.0, 800.0), AspectRatio::OneOne, 20.0, (400.0, 400.0));
        m.zoom_to(3.0, Point::new(200.0, 200.0));
        m.pan_by(0.0, 1000.0); // clamped: crop pinned to the top edge
        let top = m.export_rect(CoordinateOrigin::TopLeft);
        let bot = m.export_rect(CoordinateOrigin::BottomLeft);
        assert!(top.y < 1.0);
        assert!((bot.max_y() - 800.0).abs() < 1.0);
        assert!(approx(flip_vertical(bot, 800.0), top));
    }

    #[test]
    fn changing_aspect_relayouts() {
        let mut m = model((1920.0, 1080.0), AspectRatio::SixteenNine, 20.0, (400.0, 400.0));
        m.set_aspect(AspectRatio::NineSixteen);
        let f = m.crop_frame();
        assert!((f.width / f.height - 9.0 / 16.0).abs() < EPS);
    }

    #[test]
    fn before_layout_crop_is_whole_source() {
        let m = CropAreaModel::new(Size::new(640.0, 480.0), AspectRatio::OneOne, &EditorConfig::default());
        assert_eq!(m.crop_rect_pixels(), Rect::new(0.0, 0.0, 640.0, 480.0));
    }
}
