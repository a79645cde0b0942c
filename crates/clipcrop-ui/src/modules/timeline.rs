// crates/clipcrop-ui/src/modules/timeline.rs
//
// Scrub strip: thumbnails laid end to end, a fixed-span selection window with
// a handle on each side, a 0.1 s ruler underneath and the playhead line.
//
// Gestures map onto ScrubTimeline commands:
//   handle drag     → BeginHandleDrag / DragHandle / EndHandleDrag, with the
//                     pointer's total travel since the press
//   strip drag      → ScrollTimeline(offset − Δx), EndTimelineScroll on release
//   wheel / swipe   → ScrollTimeline; EndTimelineDeceleration once the wheel
//                     has been idle for WHEEL_SETTLE_SECS
//   ruler click     → Seek to the time under the pointer
//
// Handles are registered after the strip so they win the hit-test.
use super::{EditorModule, TextureCache};
use crate::helpers::format::selection_caption;
use crate::theme::{ACCENT, DARK_BG_0, DARK_BG_3, DARK_TEXT_DIM, MASK, PLAYHEAD};
use clipcrop_core::commands::EditorCommand;
use clipcrop_core::events::Edge;
use clipcrop_core::helpers::geometry::Rect as ContentRect;
use clipcrop_core::scrub::ScrubTimeline;
use clipcrop_media::EditSession;
use egui::{Color32, Id, Pos2, Rect, RichText, Sense, Stroke, Ui};

const RULER_H:           f32 = 22.0;
const GRIP_W:            f32 = 10.0;
const WHEEL_SETTLE_SECS: f64 = 0.25;

#[derive(Default)]
pub struct TimelineModule {
    /// Handle being dragged and the pointer travel since the press.
    handle_drag: Option<(Edge, f32)>,
    /// Time of the last wheel scroll that has not been settled yet.
    wheel_since: Option<f64>,
}

impl EditorModule for TimelineModule {
    fn name(&self) -> &str { "Timeline" }

    fn ui(&mut self, ui: &mut Ui, session: &EditSession, textures: &TextureCache, cmd: &mut Vec<EditorCommand>) {
        let timeline = session.timeline();
        let thumb_h  = session.config().preview_thumb_size.height as f32;

        ui.horizontal(|ui| {
            ui.label(RichText::new(selection_caption(timeline.range().span())).size(12.0).color(ACCENT));
            ui.label(RichText::new("Drag the handles to trim, the strip to move").size(11.0).color(DARK_TEXT_DIM));
        });

        let (strip, strip_resp) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), thumb_h + RULER_H), Sense::click_and_drag());
        cmd.push(EditorCommand::LayoutTimeline { width: strip.width() as f64 });

        let thumbs = Rect::from_min_size(strip.min, egui::vec2(strip.width(), thumb_h));
        let ruler  = Rect::from_min_max(Pos2::new(strip.min.x, thumbs.max.y), strip.max);

        paint_thumbnails(ui, thumbs, timeline, textures);
        paint_ruler(ui, ruler, timeline);
        paint_selection(ui, thumbs, timeline);

        let px = thumbs.min.x + timeline.to_viewport_x(timeline.progress_x(session.current_time())) as f32;
        ui.painter_at(strip).line_segment(
            [Pos2::new(px, thumbs.min.y), Pos2::new(px, thumbs.max.y)],
            Stroke::new(2.0, PLAYHEAD));

        self.scroll_input(ui, &strip_resp, timeline, cmd);
        if strip_resp.clicked() {
            if let Some(pos) = strip_resp.interact_pointer_pos().filter(|p| ruler.contains(*p)) {
                cmd.push(EditorCommand::Seek(timeline.time_at_viewport_x((pos.x - thumbs.min.x) as f64)));
            }
        }

        let (start_hit, end_hit) = timeline.handle_rects();
        self.handle_input(ui, Edge::Start, to_screen(thumbs, timeline, start_hit), cmd);
        self.handle_input(ui, Edge::End,   to_screen(thumbs, timeline, end_hit),   cmd);
    }
}

impl TimelineModule {
    fn scroll_input(&mut self, ui: &Ui, resp: &egui::Response, timeline: &ScrubTimeline, cmd: &mut Vec<EditorCommand>) {
        if self.handle_drag.is_some() {
            return;
        }
        if resp.dragged() {
            let dx = resp.drag_delta().x as f64;
            if dx != 0.0 {
                cmd.push(EditorCommand::ScrollTimeline(timeline.scroll_offset() - dx));
            }
        }
        if resp.drag_stopped() {
            cmd.push(EditorCommand::EndTimelineScroll { decelerate: false });
        }

        let now = ui.input(|i| i.time);
        if resp.hovered() {
            let delta = ui.input(|i| i.smooth_scroll_delta);
            // Vertical wheels scroll the strip too.
            let d = f64::from(if delta.x != 0.0 { delta.x } else { delta.y });
            if d != 0.0 {
                cmd.push(EditorCommand::ScrollTimeline(timeline.scroll_offset() - d));
                self.wheel_since = Some(now);
            }
        }
        if let Some(t) = self.wheel_since {
            if now - t >= WHEEL_SETTLE_SECS {
                self.wheel_since = None;
                cmd.push(EditorCommand::EndTimelineDeceleration);
            } else {
                ui.ctx().request_repaint();
            }
        }
    }

    fn handle_input(&mut self, ui: &Ui, edge: Edge, hit: Rect, cmd: &mut Vec<EditorCommand>) {
        let id = match edge {
            Edge::Start => Id::new("scrub_handle_start"),
            Edge::End   => Id::new("scrub_handle_end"),
        };
        let resp = ui.interact(hit, id, Sense::drag());

        if resp.drag_started() {
            self.handle_drag = Some((edge, 0.0));
            cmd.push(EditorCommand::BeginHandleDrag(edge));
        }
        if let Some((e, travel)) = self.handle_drag.as_mut() {
            if *e != edge {
                return;
            }
            if resp.dragged() {
                let dx = resp.drag_delta().x;
                if dx != 0.0 {
                    *travel += dx;
                    cmd.push(EditorCommand::DragHandle { edge, translation: *travel as f64 });
                }
            }
            if resp.drag_stopped() {
                cmd.push(EditorCommand::EndHandleDrag { edge, translation: *travel as f64 });
                self.handle_drag = None;
            }
        }

        if resp.dragged() || resp.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
        }
    }
}

// ── Painting ──────────────────────────────────────────────────────────────────

fn to_screen(area: Rect, timeline: &ScrubTimeline, r: ContentRect) -> Rect {
    Rect::from_min_size(
        Pos2::new(area.min.x + timeline.to_viewport_x(r.x) as f32, area.min.y + r.y as f32),
        egui::vec2(r.width as f32, r.height as f32),
    )
}

fn paint_thumbnails(ui: &Ui, area: Rect, timeline: &ScrubTimeline, textures: &TextureCache) {
    let painter = ui.painter_at(area);
    painter.rect_filled(area, 0.0, DARK_BG_0);

    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
    for (tile, thumb) in timeline.thumbnail_tiles(textures.thumbs.len()).into_iter().zip(&textures.thumbs) {
        let r = to_screen(area, timeline, tile);
        if r.max.x < area.min.x || r.min.x > area.max.x {
            continue;
        }
        if thumb.placeholder {
            painter.rect_filled(r, 0.0, DARK_BG_3);
        } else {
            painter.image(thumb.texture.id(), r, uv, Color32::WHITE);
        }
    }
}

fn paint_ruler(ui: &Ui, area: Rect, timeline: &ScrubTimeline) {
    let painter = ui.painter_at(area);
    for tick in timeline.ruler_ticks() {
        let x = area.min.x + timeline.to_viewport_x(tick.x) as f32;
        if x < area.min.x - 20.0 || x > area.max.x + 20.0 {
            continue;
        }
        let len   = if tick.major { 8.0 } else { 4.0 };
        let color = Color32::from_white_alpha((tick.alpha * 200.0) as u8);
        painter.line_segment([Pos2::new(x, area.min.y), Pos2::new(x, area.min.y + len)], Stroke::new(1.0, color));
        if let Some(label) = &tick.label {
            painter.text(Pos2::new(x, area.min.y + len + 1.0), egui::Align2::CENTER_TOP,
                label, egui::FontId::monospace(9.0), DARK_TEXT_DIM);
        }
    }
}

fn paint_selection(ui: &Ui, area: Rect, timeline: &ScrubTimeline) {
    let painter = ui.painter_at(area);
    let win = to_screen(area, timeline, timeline.window_rect());

    let left  = Rect::from_min_max(area.min, Pos2::new(win.min.x, area.max.y));
    let right = Rect::from_min_max(Pos2::new(win.max.x, area.min.y), area.max);
    for r in [left, right] {
        if r.is_positive() {
            painter.rect_filled(r, 0.0, MASK);
        }
    }

    let active = timeline.is_dragging();
    painter.rect_stroke(win, 2.0, Stroke::new(if active { 3.0 } else { 2.0 }, ACCENT), egui::StrokeKind::Inside);

    let (start_hit, end_hit) = timeline.handle_rects();
    for hit in [start_hit, end_hit] {
        let h = to_screen(area, timeline, hit);
        let grip = Rect::from_center_size(h.center(), egui::vec2(GRIP_W, area.height()));
        painter.rect_filled(grip, 3.0, ACCENT);
        painter.line_segment(
            [Pos2::new(grip.center().x, grip.min.y + 12.0), Pos2::new(grip.center().x, grip.max.y - 12.0)],
            Stroke::new(1.5, Color32::BLACK));
    }
}
