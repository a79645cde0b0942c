// crates/clipcrop-media/src/helpers/mod.rs
//
// Internal helper modules for clipcrop-media.
// Not re-exported from lib.rs: these are decode/encode implementation
// details, not part of the API clipcrop-ui consumes.

pub mod rgba;
pub mod seek;
