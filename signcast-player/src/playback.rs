use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::snapshot::{SlideItem, Snapshot};
use crate::PlayerState;

/// Slides with missing or non-positive durations fall back to this instead of
/// stalling the rotation or firing in a tight loop.
pub const MIN_SLIDE_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// No snapshot has been applied yet
    Idle,
    /// A slide is on screen with a timer armed until `armed_until`
    Showing { slide_id: i32, armed_until: Instant },
    /// Snapshot applied but there is nothing to play
    Empty,
    /// The server has no record of this display
    ConfigMissing,
}

/// Slide-rotation state machine for one display.
///
/// The active slide list is passed in on every transition and never cached
/// here, so the machine always acts on the latest known assignment. The only
/// externally visible transitions are `sync` (assignment changed) and `tick`
/// (timer expired).
#[derive(Debug)]
pub struct SlideScheduler {
    state: PlaybackState,
    index: usize,
}

impl SlideScheduler {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            index: 0,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_slide_id(&self) -> Option<i32> {
        match self.state {
            PlaybackState::Showing { slide_id, .. } => Some(slide_id),
            _ => None,
        }
    }

    /// When a timer is armed, the instant it expires.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PlaybackState::Showing { armed_until, .. } => Some(armed_until),
            _ => None,
        }
    }

    /// Re-derives state from the latest snapshot.
    ///
    /// If the current index survived the change, the in-flight timer is kept:
    /// the slide on screen finishes out before the next advance. An edit to
    /// the showing slide's duration therefore takes effect the next time that
    /// slide is armed. An invalidated index resets to 0 and re-arms now.
    pub fn sync(&mut self, snapshot: &Snapshot, now: Instant) {
        match snapshot {
            Snapshot::Unsynced => {
                self.state = PlaybackState::Idle;
                self.index = 0;
            }
            Snapshot::Missing => {
                self.state = PlaybackState::ConfigMissing;
                self.index = 0;
            }
            Snapshot::Ready { slides, .. } => {
                if slides.is_empty() {
                    self.state = PlaybackState::Empty;
                    self.index = 0;
                    return;
                }

                if self.index >= slides.len() {
                    self.index = 0;
                    self.arm(slides, now);
                    return;
                }

                match self.state {
                    PlaybackState::Showing { armed_until, .. } => {
                        self.state = PlaybackState::Showing {
                            slide_id: slides[self.index].id,
                            armed_until,
                        };
                    }
                    _ => self.arm(slides, now),
                }
            }
        }
    }

    /// Advances the rotation when the armed timer has expired. Calls before
    /// the deadline, or in a state without a timer, change nothing beyond a
    /// re-sync against the snapshot.
    pub fn tick(&mut self, snapshot: &Snapshot, now: Instant) {
        let Snapshot::Ready { slides, .. } = snapshot else {
            self.sync(snapshot, now);
            return;
        };
        if slides.is_empty() {
            self.sync(snapshot, now);
            return;
        }

        match self.state {
            PlaybackState::Showing { armed_until, .. } => {
                if now < armed_until {
                    return;
                }
                if self.index >= slides.len() {
                    self.index = 0;
                } else {
                    self.index = (self.index + 1) % slides.len();
                }
                self.arm(slides, now);
            }
            _ => self.sync(snapshot, now),
        }
    }

    fn arm(&mut self, slides: &[SlideItem], now: Instant) {
        let slide = &slides[self.index];
        let duration = slide.duration.max(MIN_SLIDE_DURATION);
        self.state = PlaybackState::Showing {
            slide_id: slide.id,
            armed_until: now + duration,
        };
    }
}

impl Default for SlideScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the scheduler for this display until cancelled.
///
/// Exactly one sleep is armed at a time; it is dropped by the `select!` on a
/// change notification or shutdown, so a stale timer can never fire against
/// an outdated index. While no timer is armed (nothing to play), the loop
/// re-checks the server on the configured poll interval.
pub async fn run_player_loop(state: PlayerState, cancel: CancellationToken) {
    let mut scheduler = SlideScheduler::new();
    let mut last_announced: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let snapshot = state.snapshot.current().await;
        scheduler.sync(&snapshot, Instant::now());
        announce(&state, &scheduler, &snapshot, &mut last_announced).await;

        match scheduler.deadline() {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let snapshot = state.snapshot.current().await;
                        scheduler.tick(&snapshot, Instant::now());
                    }
                    _ = state.refresh_signal.notified() => {
                        // Assignment changed; re-derive on the next pass. The
                        // in-flight deadline survives sync when still valid.
                    }
                    _ = cancel.cancelled() => return,
                }
            }
            None => {
                let poll = Duration::from_secs(state.config.poll_interval_secs.max(1));
                tokio::select! {
                    _ = tokio::time::sleep(poll) => {
                        if let Err(e) = state.snapshot.refresh().await {
                            tracing::warn!("Content refresh failed: {}", e);
                        }
                    }
                    _ = state.refresh_signal.notified() => {}
                    _ = cancel.cancelled() => return,
                }
            }
        }
    }
}

async fn announce(
    state: &PlayerState,
    scheduler: &SlideScheduler,
    snapshot: &Snapshot,
    last: &mut Option<String>,
) {
    let line = match scheduler.state() {
        PlaybackState::Showing { slide_id, .. } => match snapshot {
            Snapshot::Ready { slides, .. } => slides
                .iter()
                .find(|s| s.id == *slide_id)
                .map(|s| {
                    format!(
                        "Showing slide {} ({}) for {}s",
                        s.id,
                        s.source_url,
                        s.duration.as_secs()
                    )
                })
                .unwrap_or_else(|| format!("Showing slide {}", slide_id)),
            _ => format!("Showing slide {}", slide_id),
        },
        PlaybackState::Idle => "Waiting for first content sync...".to_string(),
        PlaybackState::Empty => "Waiting for content...".to_string(),
        PlaybackState::ConfigMissing => "Display configuration not found on server".to_string(),
    };

    if last.as_deref() != Some(line.as_str()) {
        tracing::info!("{}", line);
        *last = Some(line);
    }

    *state.current_slide_id.write().await = scheduler.current_slide_id();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DisplayProfile;

    fn slide(id: i32, secs: u64) -> SlideItem {
        SlideItem {
            id,
            source_url: format!("https://cdn.example.com/{}.jpg", id),
            duration: Duration::from_secs(secs),
        }
    }

    fn ready(slides: Vec<SlideItem>) -> Snapshot {
        Snapshot::Ready {
            display: DisplayProfile {
                id: 1,
                name: "Lobby".to_string(),
                width: 1920,
                height: 1080,
                orientation: "landscape".to_string(),
            },
            slides,
        }
    }

    #[test]
    fn cycles_through_slides_and_wraps() {
        let snapshot = ready(vec![slide(1, 5), slide(2, 5), slide(3, 5)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();

        s.sync(&snapshot, t0);
        assert_eq!(s.index(), 0);
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(5)));

        s.tick(&snapshot, t0 + Duration::from_secs(5));
        assert_eq!(s.index(), 1);

        s.tick(&snapshot, t0 + Duration::from_secs(10));
        assert_eq!(s.index(), 2);

        // Wraps back to the start after the last slide
        s.tick(&snapshot, t0 + Duration::from_secs(15));
        assert_eq!(s.index(), 0);
        assert_eq!(s.current_slide_id(), Some(1));
    }

    #[test]
    fn full_cycle_returns_to_starting_index() {
        let snapshot = ready(vec![slide(1, 2), slide(2, 3), slide(3, 4), slide(4, 5)]);
        let mut now = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&snapshot, now);

        let start = s.index();
        for _ in 0..4 {
            now = s.deadline().unwrap();
            s.tick(&snapshot, now);
        }
        assert_eq!(s.index(), start);
    }

    #[test]
    fn early_tick_is_a_no_op() {
        let snapshot = ready(vec![slide(1, 5), slide(2, 5)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&snapshot, t0);

        s.tick(&snapshot, t0 + Duration::from_secs(1));
        assert_eq!(s.index(), 0);
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn empty_list_arms_no_timer() {
        let snapshot = ready(vec![]);
        let mut s = SlideScheduler::new();
        s.sync(&snapshot, Instant::now());

        assert_eq!(s.state(), &PlaybackState::Empty);
        assert_eq!(s.deadline(), None);
    }

    #[test]
    fn shrinking_list_resets_the_index() {
        let three = ready(vec![slide(1, 5), slide(2, 5), slide(3, 5)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&three, t0);
        s.tick(&three, t0 + Duration::from_secs(5));
        s.tick(&three, t0 + Duration::from_secs(10));
        assert_eq!(s.index(), 2);

        // Admin removed two slides while the third was showing
        let one = ready(vec![slide(1, 5)]);
        let t_edit = t0 + Duration::from_secs(12);
        s.sync(&one, t_edit);

        assert_eq!(s.index(), 0);
        assert_eq!(s.deadline(), Some(t_edit + Duration::from_secs(5)));
    }

    #[test]
    fn in_bounds_edit_keeps_the_inflight_timer() {
        let original = ready(vec![slide(1, 5), slide(2, 5)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&original, t0);

        // Duration of the showing slide changed mid-flight; the armed timer
        // is not restarted
        let edited = ready(vec![slide(1, 30), slide(2, 5)]);
        s.sync(&edited, t0 + Duration::from_secs(2));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(5)));

        // The new duration applies once the slide comes around again
        s.tick(&edited, t0 + Duration::from_secs(5));
        assert_eq!(s.index(), 1);
        s.tick(&edited, t0 + Duration::from_secs(10));
        assert_eq!(s.index(), 0);
        assert_eq!(
            s.deadline(),
            Some(t0 + Duration::from_secs(10) + Duration::from_secs(30))
        );
    }

    #[test]
    fn zero_duration_slides_are_clamped() {
        let snapshot = ready(vec![slide(1, 0)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&snapshot, t0);

        assert_eq!(s.deadline(), Some(t0 + MIN_SLIDE_DURATION));
    }

    #[test]
    fn missing_display_is_terminal_until_a_refresh_finds_it() {
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();

        s.sync(&Snapshot::Missing, t0);
        assert_eq!(s.state(), &PlaybackState::ConfigMissing);
        assert_eq!(s.deadline(), None);

        // A tick in this state changes nothing
        s.tick(&Snapshot::Missing, t0 + Duration::from_secs(60));
        assert_eq!(s.state(), &PlaybackState::ConfigMissing);

        // The record appearing on a later refresh resumes playback
        let snapshot = ready(vec![slide(1, 5)]);
        let t1 = t0 + Duration::from_secs(120);
        s.sync(&snapshot, t1);
        assert_eq!(s.index(), 0);
        assert_eq!(s.deadline(), Some(t1 + Duration::from_secs(5)));
    }

    #[test]
    fn content_appearing_after_empty_resumes_playback() {
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&ready(vec![]), t0);
        assert_eq!(s.state(), &PlaybackState::Empty);

        let snapshot = ready(vec![slide(7, 8)]);
        s.sync(&snapshot, t0 + Duration::from_secs(30));
        assert_eq!(s.current_slide_id(), Some(7));
    }

    #[test]
    fn unsynced_snapshot_is_idle() {
        let mut s = SlideScheduler::new();
        s.sync(&Snapshot::Unsynced, Instant::now());
        assert_eq!(s.state(), &PlaybackState::Idle);
        assert_eq!(s.deadline(), None);
    }

    #[test]
    fn list_emptied_mid_show_drops_the_timer() {
        let snapshot = ready(vec![slide(1, 5)]);
        let t0 = Instant::now();
        let mut s = SlideScheduler::new();
        s.sync(&snapshot, t0);
        assert!(s.deadline().is_some());

        s.sync(&ready(vec![]), t0 + Duration::from_secs(2));
        assert_eq!(s.state(), &PlaybackState::Empty);
        assert_eq!(s.deadline(), None);
    }
}
