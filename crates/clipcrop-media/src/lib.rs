// crates/clipcrop-media/src/lib.rs
//
// No egui dependency: talks to clipcrop-ui through EditSession and channels.
//
// To add a new media capability:
//   1. Create a new module file here
//   2. Add `pub mod mymodule;` below
//   3. Reach it from session.rs (per-screen work) or worker.rs (background
//      work the UI triggers before a session exists)

pub mod decode;
pub mod encode;
pub mod export;
pub mod frame_cache;
pub mod gif;
pub mod helpers;
pub mod player;
pub mod probe;
pub mod session;
pub mod source;
pub mod thumbnail_store;
pub mod worker;

// Re-export the main public API so clipcrop-ui imports are simple.
pub use clipcrop_core::media_types::MediaResult;
pub use export::{Exporter, ExportPoll, FfmpegExporter};
pub use frame_cache::{PreviewFrame, PreviewFrameCache};
pub use player::{PreviewPlaybackController, MediaPlayer};
pub use session::{EditSession, SessionEvent, SessionLayout};
pub use source::MediaSource;
pub use thumbnail_store::ThumbnailStore;
pub use worker::MediaWorker;
