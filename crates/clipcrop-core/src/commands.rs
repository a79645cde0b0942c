// crates/clipcrop-core/src/commands.rs
//
// Every user action on the trim/crop screen is expressed as an EditorCommand.
// UI modules push these; EditSession::process applies them after the UI pass.
// Adding a new interaction = add a variant here + one match arm in session.rs.

use crate::events::Edge;
use crate::state::AspectRatio;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    // ── Playback ─────────────────────────────────────────────────────────────
    Play,
    Pause,
    TogglePlayback,
    /// Preview-seek without touching the selection.
    Seek(f64),

    // ── Scrub strip ──────────────────────────────────────────────────────────
    /// Viewport width of the strip changed (first layout or window resize).
    LayoutTimeline { width: f64 },
    BeginHandleDrag(Edge),
    /// `translation` is the total pointer travel since the drag began, in points.
    DragHandle    { edge: Edge, translation: f64 },
    EndHandleDrag { edge: Edge, translation: f64 },
    /// New horizontal scroll offset of the strip content.
    ScrollTimeline(f64),
    /// Pointer released. `decelerate` is true when a fling continues the scroll.
    EndTimelineScroll { decelerate: bool },
    EndTimelineDeceleration,

    // ── Crop preview ─────────────────────────────────────────────────────────
    LayoutPreview { width: f64, height: f64 },
    /// Absolute zoom scale, anchored at a point in preview coordinates.
    ZoomPreview   { scale: f64, anchor_x: f64, anchor_y: f64 },
    PanPreview    { dx: f64, dy: f64 },
    SetCropAspect(AspectRatio),

    // ── Export ───────────────────────────────────────────────────────────────
    /// The user confirmed: crop + trim the selection into a new file.
    Confirm,
    CancelExport,
    /// Dismiss a done/failed/cancelled banner.
    ClearExportStatus,
}
