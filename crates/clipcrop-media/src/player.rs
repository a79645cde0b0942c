// crates/clipcrop-media/src/player.rs
//
// Preview playback.
//
//   MediaPlayer                 what the controller drives: play/pause/seek plus
//                               boundary-time observers fired from `advance`
//   ClockPlayer                 wall-clock player for video; the UI decodes the
//                               frame at `current_time` through the scrub worker
//   FramePlayer                 frame-stepping player for in-memory GIFs
//   PreviewPlaybackController   keeps playback inside the selected range and
//                               reports the position back to the timeline
//
// Players are advanced explicitly by the UI's frame delta (`stable_dt`), the
// same way the editor's playhead always has been. Nothing here owns a thread.

use log::{debug, info};

use clipcrop_core::config::EditorConfig;

/// Handle for a registered boundary observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

pub trait MediaPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;

    /// Frame-accurate seek. Play/pause state is unchanged.
    fn seek(&mut self, t: f64);

    /// Fire when playback crosses `time` moving forward.
    fn add_boundary_observer(&mut self, time: f64) -> ObserverToken;
    /// Returns false when `token` was not registered.
    fn remove_boundary_observer(&mut self, token: ObserverToken) -> bool;
    fn observer_count(&self) -> usize;

    /// Move playback forward by `dt` seconds if playing. Returns the observers
    /// whose time was crossed.
    fn advance(&mut self, dt: f64) -> Vec<ObserverToken>;
}

impl<P: MediaPlayer + ?Sized> MediaPlayer for Box<P> {
    fn play(&mut self)                { (**self).play() }
    fn pause(&mut self)               { (**self).pause() }
    fn is_playing(&self) -> bool      { (**self).is_playing() }
    fn current_time(&self) -> f64     { (**self).current_time() }
    fn duration(&self) -> f64         { (**self).duration() }
    fn seek(&mut self, t: f64)        { (**self).seek(t) }
    fn add_boundary_observer(&mut self, time: f64) -> ObserverToken { (**self).add_boundary_observer(time) }
    fn remove_boundary_observer(&mut self, token: ObserverToken) -> bool { (**self).remove_boundary_observer(token) }
    fn observer_count(&self) -> usize { (**self).observer_count() }
    fn advance(&mut self, dt: f64) -> Vec<ObserverToken> { (**self).advance(dt) }
}

impl<P: MediaPlayer + ?Sized> MediaPlayer for &mut P {
    fn play(&mut self)                { (**self).play() }
    fn pause(&mut self)               { (**self).pause() }
    fn is_playing(&self) -> bool      { (**self).is_playing() }
    fn current_time(&self) -> f64     { (**self).current_time() }
    fn duration(&self) -> f64         { (**self).duration() }
    fn seek(&mut self, t: f64)        { (**self).seek(t) }
    fn add_boundary_observer(&mut self, time: f64) -> ObserverToken { (**self).add_boundary_observer(time) }
    fn remove_boundary_observer(&mut self, token: ObserverToken) -> bool { (**self).remove_boundary_observer(token) }
    fn observer_count(&self) -> usize { (**self).observer_count() }
    fn advance(&mut self, dt: f64) -> Vec<ObserverToken> { (**self).advance(dt) }
}

// ── Boundary observer bookkeeping ─────────────────────────────────────────────

#[derive(Default)]
struct Observers {
    next: u64,
    list: Vec<(ObserverToken, f64)>,
}

impl Observers {
    fn add(&mut self, time: f64) -> ObserverToken {
        self.next += 1;
        let token = ObserverToken(self.next);
        self.list.push((token, time));
        token
    }

    fn remove(&mut self, token: ObserverToken) -> bool {
        let before = self.list.len();
        self.list.retain(|(t, _)| *t != token);
        self.list.len() != before
    }

    /// Observers in `(from, to]`.
    fn crossed(&self, from: f64, to: f64) -> Vec<ObserverToken> {
        self.list.iter()
            .filter(|(_, time)| from < *time && *time <= to)
            .map(|(token, _)| *token)
            .collect()
    }
}

// ── ClockPlayer ───────────────────────────────────────────────────────────────

pub struct ClockPlayer {
    duration:  f64,
    position:  f64,
    playing:   bool,
    observers: Observers,
}

impl ClockPlayer {
    pub fn new(duration: f64) -> Self {
        Self { duration, position: 0.0, playing: false, observers: Observers::default() }
    }
}

impl MediaPlayer for ClockPlayer {
    fn play(&mut self)            { self.playing = true; }
    fn pause(&mut self)           { self.playing = false; }
    fn is_playing(&self) -> bool  { self.playing }
    fn current_time(&self) -> f64 { self.position }
    fn duration(&self) -> f64     { self.duration }

    fn seek(&mut self, t: f64) {
        self.position = t.clamp(0.0, self.duration);
    }

    fn add_boundary_observer(&mut self, time: f64) -> ObserverToken {
        self.observers.add(time)
    }

    fn remove_boundary_observer(&mut self, token: ObserverToken) -> bool {
        self.observers.remove(token)
    }

    fn observer_count(&self) -> usize {
        self.observers.list.len()
    }

    fn advance(&mut self, dt: f64) -> Vec<ObserverToken> {
        if !self.playing || dt <= 0.0 {
            return Vec::new();
        }
        let prev = self.position;
        self.position = (prev + dt).min(self.duration);
        let fired = self.observers.crossed(prev, self.position);
        if self.position >= self.duration {
            self.playing = false;
        }
        fired
    }
}

// ── FramePlayer ───────────────────────────────────────────────────────────────

/// Steps through `frame_count` frames, one every `duration / frame_count`
/// seconds. Frame i is shown at `i / (count − 1) × duration`, the inverse of
/// the GIF thumbnail mapping.
pub struct FramePlayer {
    frame_count: usize,
    duration:    f64,
    interval:    f64,
    index:       usize,
    carry:       f64,
    playing:     bool,
    observers:   Observers,
}

impl FramePlayer {
    pub fn new(frame_count: usize, duration: f64) -> Self {
        let frame_count = frame_count.max(1);
        Self {
            frame_count,
            duration,
            interval: duration / frame_count as f64,
            index:    0,
            carry:    0.0,
            playing:  false,
            observers: Observers::default(),
        }
    }

    pub fn frame_index(&self) -> usize {
        self.index
    }

    fn time_of(&self, index: usize) -> f64 {
        if self.frame_count <= 1 {
            return 0.0;
        }
        index as f64 / (self.frame_count - 1) as f64 * self.duration
    }

    fn index_of(&self, t: f64) -> usize {
        let last = self.frame_count - 1;
        let p    = (t / self.duration).clamp(0.0, 1.0);
        ((p * last as f64).round() as usize).min(last)
    }
}

impl MediaPlayer for FramePlayer {
    fn play(&mut self)            { self.playing = true; }
    fn pause(&mut self)           { self.playing = false; }
    fn is_playing(&self) -> bool  { self.playing }
    fn current_time(&self) -> f64 { self.time_of(self.index) }
    fn duration(&self) -> f64     { self.duration }

    fn seek(&mut self, t: f64) {
        if t < 0.0 || !t.is_finite() {
            return;
        }
        self.index = self.index_of(t);
        self.carry = 0.0;
    }

    fn add_boundary_observer(&mut self, time: f64) -> ObserverToken {
        self.observers.add(time)
    }

    fn remove_boundary_observer(&mut self, token: ObserverToken) -> bool {
        self.observers.remove(token)
    }

    fn observer_count(&self) -> usize {
        self.observers.list.len()
    }

    fn advance(&mut self, dt: f64) -> Vec<ObserverToken> {
        if !self.playing || dt <= 0.0 || self.interval <= 0.0 {
            return Vec::new();
        }
        let last = self.frame_count - 1;
        self.carry += dt;
        let mut fired = Vec::new();
        while self.carry >= self.interval {
            self.carry -= self.interval;
            if self.index >= last {
                self.playing = false;
                self.carry   = 0.0;
                break;
            }
            let prev = self.time_of(self.index);
            self.index += 1;
            fired = self.observers.crossed(prev, self.time_of(self.index));
            if !fired.is_empty() {
                self.carry = 0.0;
                break;
            }
        }
        fired
    }
}

// ── PreviewPlaybackController ─────────────────────────────────────────────────

/// Binds the selected range to a player: playback loops inside
/// `[start, end]` and the position is reported at a fixed rate while playing.
///
/// Dropping the controller pauses the player and removes its boundary
/// observer.
pub struct PreviewPlaybackController<P: MediaPlayer> {
    player:          P,
    start:           f64,
    end:             f64,
    boundary:        Option<ObserverToken>,
    reporting:       bool,
    since_report:    f64,
    report_interval: f64,
    loop_epsilon:    f64,
}

impl<P: MediaPlayer> PreviewPlaybackController<P> {
    /// Starts unbound, covering the whole media.
    pub fn new(player: P, config: &EditorConfig) -> Self {
        let end = player.duration();
        Self {
            player,
            start:           0.0,
            end,
            boundary:        None,
            reporting:       false,
            since_report:    0.0,
            report_interval: config.report_interval(),
            loop_epsilon:    config.loop_epsilon,
        }
    }

    pub fn player(&self)       -> &P         { &self.player }
    pub fn is_playing(&self)   -> bool       { self.player.is_playing() }
    pub fn current_time(&self) -> f64        { self.player.current_time() }
    pub fn range(&self)        -> (f64, f64) { (self.start, self.end) }

    pub fn play(&mut self) {
        if self.player.is_playing() {
            return;
        }
        if self.player.current_time() >= self.end - self.loop_epsilon {
            self.player.seek(self.start);
        }
        self.player.play();
        self.reporting    = true;
        self.since_report = self.report_interval;
        debug!("[player] play from {:.3}s", self.player.current_time());
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.reporting = false;
    }

    pub fn toggle(&mut self) {
        if self.player.is_playing() { self.pause() } else { self.play() }
    }

    /// Move the playhead without touching play/pause state. Non-finite,
    /// negative and past-the-end times are ignored; returns whether the seek
    /// happened.
    pub fn seek(&mut self, t: f64) -> bool {
        if !t.is_finite() || t < 0.0 || t > self.player.duration() {
            debug!("[player] ignored seek to {t}");
            return false;
        }
        self.player.seek(t);
        true
    }

    /// Loop playback inside `[start, end]`. The previous boundary observer is
    /// removed before the new one is installed.
    pub fn bind_range(&mut self, start: f64, end: f64) {
        if let Some(token) = self.boundary.take() {
            self.player.remove_boundary_observer(token);
            debug!("[player] boundary observer removed");
        }
        self.start    = start;
        self.end      = end;
        self.boundary = Some(self.player.add_boundary_observer(end));
        info!("[player] looping {start:.3}s → {end:.3}s");
    }

    /// Advance by one UI frame. Returns the position when a report is due.
    pub fn tick(&mut self, dt: f64) -> Option<f64> {
        let fired = self.player.advance(dt);
        if self.boundary.is_some_and(|b| fired.contains(&b)) {
            self.player.seek(self.start);
            self.player.play();
            debug!("[player] loop → {:.3}s", self.start);
        }
        if !self.player.is_playing() {
            // Ran off the end of an unbound player.
            self.reporting = false;
            return None;
        }
        if !self.reporting {
            return None;
        }
        self.since_report += dt;
        if self.since_report + 1e-9 < self.report_interval {
            return None;
        }
        self.since_report = 0.0;
        Some(self.player.current_time())
    }

    /// Pause and remove the boundary observer. Also run on drop.
    pub fn teardown(&mut self) {
        self.pause();
        if let Some(token) = self.boundary.take() {
            self.player.remove_boundary_observer(token);
            debug!("[player] boundary observer removed on teardown");
        }
    }
}

impl<P: MediaPlayer> Drop for PreviewPlaybackController<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EditorConfig {
        EditorConfig::default()
    }

    #[test]
    fn range_loops_instead_of_stopping() {
        let mut clock = ClockPlayer::new(10.0);
        let mut c = PreviewPlaybackController::new(&mut clock, &cfg());
        c.bind_range(1.0, 2.0);
        assert!(c.seek(1.0));
        c.play();
        for _ in 0..3 {
            c.tick(0.25);
        }
        assert_eq!(c.current_time(), 1.75);
        c.tick(0.25); // reaches 2.0
        assert!(c.is_playing());
        assert_eq!(c.current_time(), 1.0);
        c.tick(0.25);
        assert_eq!(c.current_time(), 1.25);
    }

    #[test]
    fn play_at_end_restarts_from_start() {
        let mut c = PreviewPlaybackController::new(ClockPlayer::new(10.0), &cfg());
        c.bind_range(3.0, 5.0);
        c.seek(4.995);
        c.play();
        assert!((c.current_time() - 3.0).abs() < 1e-9);

        c.pause();
        c.seek(4.0);
        c.play();
        assert!((c.current_time() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn pause_is_idempotent_and_seek_keeps_state() {
        let mut c = PreviewPlaybackController::new(ClockPlayer::new(10.0), &cfg());
        c.pause();
        c.pause();
        assert!(!c.is_playing());
        c.play();
        assert!(c.seek(2.0));
        assert!(c.is_playing());
        c.toggle();
        assert!(!c.is_playing());
        assert_eq!(c.tick(1.0), None);
        assert!((c.current_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_seeks_are_ignored() {
        let mut c = PreviewPlaybackController::new(ClockPlayer::new(10.0), &cfg());
        c.seek(3.0);
        assert!(!c.seek(-1.0));
        assert!(!c.seek(10.5));
        assert!(!c.seek(f64::NAN));
        assert!((c.current_time() - 3.0).abs() < 1e-9);
        assert!(c.seek(0.0));
    }

    #[test]
    fn rebinding_keeps_a_single_observer() {
        let mut clock = ClockPlayer::new(10.0);
        {
            let mut c = PreviewPlaybackController::new(&mut clock, &cfg());
            c.bind_range(0.0, 6.0);
            c.bind_range(1.0, 7.0);
            c.bind_range(2.0, 8.0);
            assert_eq!(c.player().observer_count(), 1);
            assert_eq!(c.range(), (2.0, 8.0));
        }
        assert_eq!(clock.observer_count(), 0, "drop removes the observer");
    }

    #[test]
    fn reports_at_configured_rate() {
        let mut c = PreviewPlaybackController::new(ClockPlayer::new(10.0), &cfg());
        c.play();
        assert!(c.tick(0.001).is_some(), "first tick reports immediately");
        assert!(c.tick(0.005).is_none());
        assert!(c.tick(0.012).is_some());
    }

    #[test]
    fn unbound_clock_stops_at_end() {
        let mut c = PreviewPlaybackController::new(ClockPlayer::new(1.0), &cfg());
        c.play();
        c.tick(0.6);
        c.tick(0.6);
        assert!(!c.is_playing());
        assert!((c.current_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn frame_player_wraps_to_start_frame() {
        // 5 frames over 1.25s: frame i at i × 0.3125s, one step per 0.25s.
        let mut gif = FramePlayer::new(5, 1.25);
        let mut c = PreviewPlaybackController::new(&mut gif, &cfg());
        c.bind_range(0.3125, 0.9375);
        c.seek(0.3125);
        c.play();
        assert_eq!(c.player().frame_index(), 1);
        c.tick(0.25);
        assert_eq!(c.player().frame_index(), 2);
        c.tick(0.25); // frame 3 sits on the boundary
        assert_eq!(c.player().frame_index(), 1);
        assert!(c.is_playing());
    }

    #[test]
    fn frame_player_ignores_negative_seek() {
        let mut p = FramePlayer::new(5, 1.0);
        p.seek(0.5);
        assert_eq!(p.frame_index(), 2);
        p.seek(-0.5);
        assert_eq!(p.frame_index(), 2);
        p.seek(0.0);
        assert_eq!(p.frame_index(), 0);
    }
}
