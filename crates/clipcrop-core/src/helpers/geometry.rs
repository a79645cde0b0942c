// crates/clipcrop-core/src/helpers/geometry.rs
//
// Plain f64 geometry shared by the scrub strip and the crop preview, plus the
// aspect-ratio helpers the crop presets use.
//
// All rects are top-left origin (y grows downward) unless a function says
// otherwise. `flip_vertical` is the single place that converts to a
// bottom-left convention.

use serde::{Deserialize, Serialize};

use crate::state::AspectRatio;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width:  f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x:      f64,
    pub y:      f64,
    pub width:  f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size { Size::new(self.width, self.height) }
    pub fn min_x(&self) -> f64 { self.x }
    pub fn min_y(&self) -> f64 { self.y }
    pub fn max_x(&self) -> f64 { self.x + self.width }
    pub fn max_y(&self) -> f64 { self.y + self.height }
    pub fn mid_x(&self) -> f64 { self.x + self.width * 0.5 }
    pub fn mid_y(&self) -> f64 { self.y + self.height * 0.5 }

    /// Shrink by `d` on every side. Never produces a negative size.
    pub fn inset(&self, d: f64) -> Self {
        Self::new(
            self.x + d,
            self.y + d,
            (self.width  - 2.0 * d).max(0.0),
            (self.height - 2.0 * d).max(0.0),
        )
    }

    /// Scale every component independently (origin included).
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Overlapping area, or an empty rect at `self`'s origin when disjoint.
    pub fn intersection(&self, other: &Rect) -> Self {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            return Self::new(self.x, self.y, 0.0, 0.0);
        }
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// True when `other` lies inside `self`, allowing `eps` of float slack.
    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        other.min_x() >= self.min_x() - eps
            && other.min_y() >= self.min_y() - eps
            && other.max_x() <= self.max_x() + eps
            && other.max_y() <= self.max_y() + eps
    }
}

/// Which corner a consumer treats as (0, 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateOrigin {
    TopLeft,
    BottomLeft,
}

/// Largest rect with `aspect`'s proportions that fits inside `bounds`, centered.
///
/// ```
/// use clipcrop_core::helpers::geometry::{aspect_fit, Rect, Size};
/// let r = aspect_fit(Size::new(16.0, 9.0), Rect::new(0.0, 0.0, 160.0, 160.0));
/// assert_eq!(r, Rect::new(0.0, 35.0, 160.0, 90.0));
/// ```
pub fn aspect_fit(aspect: Size, bounds: Rect) -> Rect {
    if aspect.is_empty() || bounds.size().is_empty() {
        return Rect::new(bounds.mid_x(), bounds.mid_y(), 0.0, 0.0);
    }
    let scale = (bounds.width / aspect.width).min(bounds.height / aspect.height);
    centered(aspect.scaled(scale), bounds)
}

/// Smallest rect with `aspect`'s proportions that covers `bounds`, centered.
///
/// ```
/// use clipcrop_core::helpers::geometry::{aspect_fill, Rect, Size};
/// let r = aspect_fill(Size::new(16.0, 9.0), Rect::new(0.0, 0.0, 90.0, 90.0));
/// assert_eq!(r, Rect::new(-35.0, 0.0, 160.0, 90.0));
/// ```
pub fn aspect_fill(aspect: Size, bounds: Rect) -> Rect {
    if aspect.is_empty() || bounds.size().is_empty() {
        return Rect::new(bounds.mid_x(), bounds.mid_y(), 0.0, 0.0);
    }
    let scale = (bounds.width / aspect.width).max(bounds.height / aspect.height);
    centered(aspect.scaled(scale), bounds)
}

fn centered(size: Size, bounds: Rect) -> Rect {
    Rect::new(
        bounds.mid_x() - size.width  * 0.5,
        bounds.mid_y() - size.height * 0.5,
        size.width,
        size.height,
    )
}

/// Mirror `rect` inside a space `height` tall, converting between top-left and
/// bottom-left origins. Applying it twice is the identity.
///
/// ```
/// use clipcrop_core::helpers::geometry::{flip_vertical, Rect};
/// let r = Rect::new(10.0, 20.0, 100.0, 50.0);
/// assert_eq!(flip_vertical(r, 200.0), Rect::new(10.0, 130.0, 100.0, 50.0));
/// assert_eq!(flip_vertical(flip_vertical(r, 200.0), 200.0), r);
/// ```
pub fn flip_vertical(rect: Rect, height: f64) -> Rect {
    Rect::new(rect.x, height - rect.max_y(), rect.width, rect.height)
}

// ── Aspect-ratio presets ──────────────────────────────────────────────────────

/// Width × height proportions of a crop preset.
///
/// ```
/// use clipcrop_core::state::AspectRatio;
/// use clipcrop_core::helpers::geometry::aspect_ratio_size;
/// let s = aspect_ratio_size(AspectRatio::NineSixteen);
/// assert!((s.width / s.height - 9.0 / 16.0).abs() < 1e-9);
/// ```
pub fn aspect_ratio_size(ar: AspectRatio) -> Size {
    match ar {
        AspectRatio::SixteenNine             => Size::new(16.0, 9.0),
        AspectRatio::NineSixteen             => Size::new(9.0, 16.0),
        AspectRatio::FourThree               => Size::new(4.0, 3.0),
        AspectRatio::ThreeFour               => Size::new(3.0, 4.0),
        AspectRatio::OneOne                  => Size::new(1.0, 1.0),
        AspectRatio::FourFive                => Size::new(4.0, 5.0),
        AspectRatio::Custom { width, height } => Size::new(width.max(1) as f64, height.max(1) as f64),
    }
}

/// Short label shown in the crop preset picker.
pub fn aspect_ratio_label(ar: AspectRatio) -> String {
    match ar {
        AspectRatio::SixteenNine => "16:9  Landscape".into(),
        AspectRatio::NineSixteen => "9:16  Portrait".into(),
        AspectRatio::FourThree   => "4:3   Classic".into(),
        AspectRatio::ThreeFour   => "3:4   Tall".into(),
        AspectRatio::OneOne      => "1:1   Square".into(),
        AspectRatio::FourFive    => "4:5   Portrait post".into(),
        AspectRatio::Custom { width, height } => format!("{width}:{height}  Original"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_inside_wide_bounds_is_pillarboxed() {
        let r = aspect_fit(Size::new(1.0, 1.0), Rect::new(0.0, 0.0, 300.0, 100.0));
        assert_eq!(r, Rect::new(100.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn fill_always_covers_bounds() {
        let bounds = Rect::new(0.0, 0.0, 375.0, 500.0);
        let r = aspect_fill(Size::new(1920.0, 1080.0), bounds);
        assert!(r.contains_rect(&bounds, 1e-9));
        assert!((r.width / r.height - 1920.0 / 1080.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_give_empty_rects() {
        assert!(aspect_fit(Size::new(0.0, 9.0), Rect::new(0.0, 0.0, 10.0, 10.0)).size().is_empty());
        assert!(aspect_fill(Size::new(16.0, 9.0), Rect::default()).size().is_empty());
    }

    #[test]
    fn inset_clamps_to_zero() {
        let r = Rect::new(0.0, 0.0, 30.0, 10.0).inset(20.0);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 0.0);
    }

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert!(a.intersection(&b).size().is_empty());
        assert_eq!(a.intersection(&Rect::new(5.0, -5.0, 10.0, 10.0)), Rect::new(5.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn custom_preset_never_zero() {
        let s = aspect_ratio_size(AspectRatio::Custom { width: 0, height: 720 });
        assert_eq!(s, Size::new(1.0, 720.0));
    }
}
