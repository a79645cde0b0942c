// crates/clipcrop-core/src/error.rs
//
// Domain errors surfaced by the editing model and its media collaborators.
// Internal plumbing in clipcrop-media uses anyhow and converts to these at the
// session boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// The requested bound cannot be applied because min/max constraints leave
    /// no valid position. Callers treat this as "no movement".
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A single preview frame could not be decoded. Never fatal: the frame
    /// cache substitutes a placeholder and keeps going.
    #[error("frame at {timestamp:.3}s failed to decode: {reason}")]
    FrameDecodeFailure { timestamp: f64, reason: String },

    #[error("export failed: {0}")]
    ExportFailure(String),

    /// The media has no video track. Dimensions fall back to 512×512.
    #[error("media has no video track")]
    AssetTrackMissing,
}
