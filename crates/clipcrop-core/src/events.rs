// crates/clipcrop-core/src/events.rs
//
// Events the scrub strip emits while the user edits the range. The session
// drains them after every command and routes them to the playback controller.

use serde::{Deserialize, Serialize};

use crate::time_range::TimeRangeSnapshot;

/// Which trim handle a gesture belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Start,
    End,
}

/// What moved the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    Handle(Edge),
    /// The strip scrolled under a fixed-span window.
    Scroll,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimelineEvent {
    /// Bounds moved during a gesture. Consumers pause and preview-seek.
    Changed      { origin: ChangeOrigin, range: TimeRangeSnapshot },
    /// A handle drag finished. Consumers rebind the playback range.
    ChangeEnded  { edge: Edge, range: TimeRangeSnapshot },
    /// A scroll came to rest. Consumers rebind the playback range.
    StoppedScrolling { range: TimeRangeSnapshot },
}

impl TimelineEvent {
    pub fn range(&self) -> TimeRangeSnapshot {
        match self {
            TimelineEvent::Changed { range, .. }
            | TimelineEvent::ChangeEnded { range, .. }
            | TimelineEvent::StoppedScrolling { range } => *range,
        }
    }

    /// True for events that end a gesture and should rebind playback.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TimelineEvent::Changed { .. })
    }
}
