// crates/clipcrop-core/src/lib.rs
//
// Pure editing model for the trim + crop screen: no egui, no ffmpeg, no threads.
// Everything here is driven synchronously by clipcrop-media's EditSession and
// is unit-testable without a media file.

pub mod commands;
pub mod config;
pub mod crop_area;
pub mod error;
pub mod events;
pub mod media_types;
pub mod scrub;
pub mod state;
pub mod time_range;

pub mod helpers {
    pub mod geometry;
    pub mod time;
}

pub use config::EditorConfig;
pub use crop_area::CropAreaModel;
pub use error::EditError;
pub use scrub::ScrubTimeline;
pub use time_range::{TimeRangeModel, TimeRangeSnapshot};
