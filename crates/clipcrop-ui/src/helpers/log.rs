// crates/clipcrop-ui/src/helpers/log.rs
//
// Logger setup for the binary. Every crate logs through the `log` facade;
// this is the one place that decides where the records go.
//
// In release builds with `windows_subsystem = "windows"` (double-click launch)
// there is no console, so stderr output would vanish. There the logger writes
// to %TEMP%\clipcrop.log instead, appending across runs.
//
// RUST_LOG is honoured everywhere; without it the level is `info`.

use env_logger::{Builder, Env};

pub const LOG_FILE_NAME: &str = "clipcrop.log";

pub fn init_logging() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    if cfg!(all(windows, not(debug_assertions))) {
        let path = std::env::temp_dir().join(LOG_FILE_NAME);
        // On failure there is nowhere better to report it; keep the default target.
        if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }

    // A second init (tests, embedding) is harmless.
    let _ = builder.try_init();
}
