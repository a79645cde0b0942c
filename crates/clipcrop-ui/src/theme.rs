// crates/clipcrop-ui/src/theme.rs
use egui::{Color32, Context, Stroke, Style, Visuals};

// ── Palette ──────────────────────────────────────────────────────────────────
pub const ACCENT:        Color32 = Color32::from_rgb(255, 204,   0);
pub const ACCENT_DIM:    Color32 = Color32::from_rgb(170, 136,   0);
pub const ACCENT_HOVER:  Color32 = Color32::from_rgb(255, 222,  90);

pub const DARK_BG_0:     Color32 = Color32::from_rgb( 10,  10,  12);
pub const DARK_BG_1:     Color32 = Color32::from_rgb( 18,  18,  22);
pub const DARK_BG_2:     Color32 = Color32::from_rgb( 28,  28,  34);
pub const DARK_BG_3:     Color32 = Color32::from_rgb( 40,  40,  48);

pub const DARK_TEXT:     Color32 = Color32::from_rgb(225, 225, 232);
pub const DARK_TEXT_DIM: Color32 = Color32::from_rgb(125, 125, 140);
pub const DARK_BORDER:   Color32 = Color32::from_rgb( 58,  58,  70);

/// Shade over the parts of the preview outside the crop frame, and over
/// the strip outside the selection window.
pub const MASK:          Color32 = Color32::from_black_alpha(150);
pub const PLAYHEAD:      Color32 = Color32::WHITE;
pub const ERROR_TEXT:    Color32 = Color32::from_rgb(235,  90,  80);

pub fn configure_style(ctx: &Context) {
    let mut style = Style::default();

    style.spacing.item_spacing   = egui::vec2(6.0, 6.0);
    style.spacing.window_margin  = egui::Margin::same(10);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    let cr = egui::CornerRadius::same(4);

    let mut v = Visuals::dark();
    v.panel_fill       = DARK_BG_1;
    v.window_fill      = DARK_BG_2;
    v.faint_bg_color   = DARK_BG_0;
    v.extreme_bg_color = DARK_BG_0;
    v.window_stroke    = Stroke::new(1.0, DARK_BORDER);

    v.selection.bg_fill = ACCENT;
    v.selection.stroke  = Stroke::new(1.0, Color32::BLACK);

    v.widgets.noninteractive.bg_fill       = DARK_BG_2;
    v.widgets.noninteractive.fg_stroke     = Stroke::new(1.0, DARK_TEXT_DIM);
    v.widgets.noninteractive.corner_radius = cr;

    v.widgets.inactive.bg_fill       = DARK_BG_3;
    v.widgets.inactive.weak_bg_fill  = DARK_BG_3;
    v.widgets.inactive.fg_stroke     = Stroke::new(1.0, DARK_TEXT);
    v.widgets.inactive.corner_radius = cr;

    v.widgets.hovered.bg_stroke     = Stroke::new(1.0, ACCENT_DIM);
    v.widgets.hovered.fg_stroke     = Stroke::new(1.5, ACCENT_HOVER);
    v.widgets.hovered.corner_radius = cr;

    v.widgets.active.bg_fill       = ACCENT_DIM;
    v.widgets.active.fg_stroke     = Stroke::new(2.0, Color32::WHITE);
    v.widgets.active.corner_radius = cr;

    v.override_text_color = Some(DARK_TEXT);

    ctx.set_visuals(v);
    ctx.set_style(style);
}
