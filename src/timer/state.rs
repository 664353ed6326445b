use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::utils::percentage::Percentage;

use super::durations::TimerDurations;

pub const DEFAULT_CYCLES: u32 = 3;

/// Pause between two phases. Ticks during it don't advance the timer.
pub const PHASE_BREATH: Duration = Duration::seconds(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Focus,
    Break,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Focus => write!(f, "Focus time"),
            Phase::Break => write!(f, "Break time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    TransitioningTo {
        phase: Phase,
        until: DateTime<Utc>,
    },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerNotification {
    Started(Phase),
    Paused,
    Resumed,
    PhaseChanged { phase: Phase, cycle: u32 },
    Completed,
    Reset,
}

/// What the timer tells the rest of the daemon about focus. `session` grows by one every time a
/// focus phase begins, so pausing and resuming within a phase keeps the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusMode {
    pub active: bool,
    pub session: u64,
}

/// Pomodoro session. Phase and every readout are derived from `elapsed_seconds`, so the only real
/// state is the elapsed counter and the status.
#[derive(Debug, Clone)]
pub struct TimerState {
    elapsed_seconds: u64,
    durations: TimerDurations,
    cycles: u32,
    status: TimerStatus,
    observed_phase: Phase,
    observed_cycle: u32,
    focus_session: u64,
    background_since: Option<DateTime<Utc>>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerDurations::default(), DEFAULT_CYCLES)
    }
}

impl TimerState {
    pub fn new(durations: TimerDurations, cycles: u32) -> Self {
        Self {
            elapsed_seconds: 0,
            durations,
            cycles: cycles.max(1),
            status: TimerStatus::Idle,
            observed_phase: Phase::Focus,
            observed_cycle: 1,
            focus_session: 0,
            background_since: None,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn durations(&self) -> TimerDurations {
        self.durations
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn total_seconds(&self) -> u64 {
        self.durations
            .cycle_seconds()
            .saturating_mul(self.cycles as u64)
    }

    fn cycle_progress(&self) -> u64 {
        self.elapsed_seconds % self.durations.cycle_seconds()
    }

    pub fn phase(&self) -> Phase {
        if self.cycle_progress() < self.durations.focus_seconds {
            Phase::Focus
        } else {
            Phase::Break
        }
    }

    pub fn time_left(&self) -> u64 {
        if self.status == TimerStatus::Complete {
            return 0;
        }
        let progress = self.cycle_progress();
        match self.phase() {
            Phase::Focus => self.durations.focus_seconds - progress,
            Phase::Break => self.durations.cycle_seconds() - progress,
        }
    }

    pub fn cycle_number(&self) -> u32 {
        let cycle = self.elapsed_seconds / self.durations.cycle_seconds() + 1;
        (cycle as u32).min(self.cycles)
    }

    pub fn progress(&self) -> Percentage {
        Percentage::of(self.elapsed_seconds, self.total_seconds())
    }

    fn is_active(&self) -> bool {
        matches!(
            self.status,
            TimerStatus::Running | TimerStatus::TransitioningTo { .. }
        )
    }

    /// Whether focus mode should be on. Only the timer decides this.
    pub fn focus_active(&self) -> bool {
        self.is_active() && self.phase() == Phase::Focus
    }

    pub fn focus_mode(&self) -> FocusMode {
        FocusMode {
            active: self.focus_active(),
            session: self.focus_session,
        }
    }

    pub fn start(&mut self) -> Option<TimerNotification> {
        match self.status {
            TimerStatus::Idle => {
                self.status = TimerStatus::Running;
                self.focus_session += 1;
                Some(TimerNotification::Started(self.phase()))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    pub fn pause(&mut self) -> Option<TimerNotification> {
        if !self.is_active() {
            return None;
        }
        self.status = TimerStatus::Paused;
        self.background_since = None;
        Some(TimerNotification::Paused)
    }

    pub fn resume(&mut self) -> Option<TimerNotification> {
        if self.status != TimerStatus::Paused {
            return None;
        }
        self.status = TimerStatus::Running;
        Some(TimerNotification::Resumed)
    }

    pub fn toggle(&mut self) -> Option<TimerNotification> {
        if self.is_active() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Option<TimerNotification> {
        let was_pristine = self.status == TimerStatus::Idle && self.elapsed_seconds == 0;
        self.elapsed_seconds = 0;
        self.status = TimerStatus::Idle;
        self.observed_phase = Phase::Focus;
        self.observed_cycle = 1;
        self.background_since = None;
        (!was_pristine).then_some(TimerNotification::Reset)
    }

    /// Changing durations always restarts the session from scratch.
    pub fn set_durations(&mut self, durations: TimerDurations) -> Option<TimerNotification> {
        self.durations = durations;
        self.reset()
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimerNotification> {
        match self.status {
            TimerStatus::Running => self.advance(1, now),
            TimerStatus::TransitioningTo { until, .. } if now >= until => {
                self.status = TimerStatus::Running;
                None
            }
            _ => None,
        }
    }

    /// Remembers when the process stopped getting ticks. Ignored unless the timer is running.
    pub fn enter_background(&mut self, at: DateTime<Utc>) {
        if self.is_active() {
            self.background_since = Some(at);
        }
    }

    /// Adds the whole seconds spent in the background, clamped to the session length.
    pub fn return_to_foreground(&mut self, at: DateTime<Utc>) -> Option<TimerNotification> {
        let since = self.background_since.take()?;
        if !self.is_active() {
            return None;
        }
        let missed = (at - since).num_seconds().max(0) as u64;
        self.status = TimerStatus::Running;
        self.advance(missed, at)
    }

    fn advance(&mut self, seconds: u64, now: DateTime<Utc>) -> Option<TimerNotification> {
        let total = self.total_seconds();
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(seconds).min(total);
        if self.elapsed_seconds >= total {
            self.status = TimerStatus::Complete;
            return Some(TimerNotification::Completed);
        }

        let phase = self.phase();
        let cycle = self.cycle_number();
        if phase == self.observed_phase && cycle == self.observed_cycle {
            return None;
        }
        self.observed_phase = phase;
        self.observed_cycle = cycle;
        if phase == Phase::Focus {
            self.focus_session += 1;
        }
        self.status = TimerStatus::TransitioningTo {
            phase,
            until: now + PHASE_BREATH,
        };
        Some(TimerNotification::PhaseChanged { phase, cycle })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::timer::durations::TimerDurations;

    use super::{FocusMode, Phase, TimerNotification, TimerState, TimerStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 14, 0, 0).unwrap()
    }

    fn test_timer() -> TimerState {
        TimerState::new(TimerDurations::TEST, 3)
    }

    /// Ticks once per second from `t0`, returning every notification produced.
    fn run_ticks(timer: &mut TimerState, ticks: i64) -> Vec<TimerNotification> {
        (1..=ticks)
            .filter_map(|i| timer.tick(t0() + Duration::seconds(i)))
            .collect()
    }

    #[test]
    fn test_derived_phase_follows_elapsed() {
        let mut timer = test_timer();
        assert_eq!(timer.total_seconds(), 24);
        assert_eq!(timer.phase(), Phase::Focus);

        timer.elapsed_seconds = 5;
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.time_left(), 3);
        timer.elapsed_seconds = 8;
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.cycle_number(), 2);
        assert_eq!(timer.time_left(), 5);
    }

    #[test]
    fn test_full_session_with_breaths() {
        let mut timer = test_timer();
        assert_eq!(timer.start(), Some(TimerNotification::Started(Phase::Focus)));

        let notifications = run_ticks(&mut timer, 5);
        assert_eq!(
            notifications,
            [TimerNotification::PhaseChanged {
                phase: Phase::Break,
                cycle: 1
            }]
        );
        assert_eq!(timer.elapsed_seconds(), 5);
        assert!(matches!(
            timer.status(),
            TimerStatus::TransitioningTo {
                phase: Phase::Break,
                ..
            }
        ));

        // The breath tick doesn't advance.
        assert_eq!(timer.tick(t0() + Duration::seconds(6)), None);
        assert_eq!(timer.elapsed_seconds(), 5);
        assert_eq!(timer.status(), TimerStatus::Running);

        for i in 7..=9 {
            timer.tick(t0() + Duration::seconds(i));
        }
        assert_eq!(timer.elapsed_seconds(), 8);
        assert_eq!(timer.phase(), Phase::Focus);

        // Three cycles with a breath after each of the five phase changes.
        let rest = (10..=40)
            .filter_map(|i| timer.tick(t0() + Duration::seconds(i)))
            .collect::<Vec<_>>();
        assert_eq!(rest.last(), Some(&TimerNotification::Completed));
        assert_eq!(timer.elapsed_seconds(), 24);
        assert_eq!(timer.status(), TimerStatus::Complete);
        assert_eq!(timer.time_left(), 0);
        assert_eq!(timer.cycle_number(), 3);
        assert_eq!(timer.progress().value(), 100);

        // No auto restart.
        assert_eq!(timer.start(), None);
        assert_eq!(timer.tick(t0() + Duration::seconds(60)), None);
    }

    #[test]
    fn test_background_correction() {
        let mut timer = TimerState::new(TimerDurations::SHORT, 3);
        timer.start();
        run_ticks(&mut timer, 10);

        timer.enter_background(t0() + Duration::seconds(10));
        assert_eq!(
            timer.return_to_foreground(t0() + Duration::milliseconds(17_400)),
            None
        );
        assert_eq!(timer.elapsed_seconds(), 17);
        assert_eq!(timer.status(), TimerStatus::Running);
    }

    #[test]
    fn test_background_correction_is_clamped() {
        let mut timer = test_timer();
        timer.start();
        timer.enter_background(t0());
        assert_eq!(
            timer.return_to_foreground(t0() + Duration::hours(1)),
            Some(TimerNotification::Completed)
        );
        assert_eq!(timer.elapsed_seconds(), 24);
    }

    #[test]
    fn test_background_while_paused_is_ignored() {
        let mut timer = test_timer();
        timer.start();
        timer.pause();
        timer.enter_background(t0());
        assert_eq!(timer.return_to_foreground(t0() + Duration::seconds(30)), None);
        assert_eq!(timer.elapsed_seconds(), 0);
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut timer = test_timer();
        timer.start();
        run_ticks(&mut timer, 2);
        assert_eq!(timer.toggle(), Some(TimerNotification::Paused));
        assert!(!timer.focus_active());
        run_ticks(&mut timer, 3);
        assert_eq!(timer.elapsed_seconds(), 2);
        assert_eq!(timer.toggle(), Some(TimerNotification::Resumed));
        assert!(timer.focus_active());
    }

    #[test]
    fn test_changing_durations_resets() {
        let mut timer = test_timer();
        timer.start();
        run_ticks(&mut timer, 3);
        assert_eq!(
            timer.set_durations(TimerDurations::LONG),
            Some(TimerNotification::Reset)
        );
        assert_eq!(timer.elapsed_seconds(), 0);
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.time_left(), 50 * 60);
        assert_eq!(timer.reset(), None);
    }

    #[test]
    fn test_skipped_break_is_still_a_phase_change() {
        let mut timer = test_timer();
        timer.start();
        run_ticks(&mut timer, 2);
        assert_eq!(timer.focus_mode().session, 1);

        // 2s into focus, 7s away lands 1s into the focus of the next cycle.
        timer.enter_background(t0() + Duration::seconds(2));
        assert_eq!(
            timer.return_to_foreground(t0() + Duration::seconds(9)),
            Some(TimerNotification::PhaseChanged {
                phase: Phase::Focus,
                cycle: 2
            })
        );
        assert_eq!(timer.elapsed_seconds(), 9);
        assert_eq!(timer.focus_mode().session, 2);
    }

    #[test]
    fn test_focus_session_survives_pause() {
        let mut timer = test_timer();
        assert_eq!(timer.focus_mode(), FocusMode::default());
        timer.start();
        run_ticks(&mut timer, 2);
        timer.pause();
        assert_eq!(
            timer.focus_mode(),
            FocusMode {
                active: false,
                session: 1
            }
        );
        timer.resume();
        assert_eq!(
            timer.focus_mode(),
            FocusMode {
                active: true,
                session: 1
            }
        );

        timer.reset();
        timer.start();
        assert_eq!(timer.focus_mode().session, 2);
    }

    #[test]
    fn test_huge_session_does_not_overflow() {
        let durations = TimerDurations {
            focus_seconds: u64::MAX / 2,
            break_seconds: u64::MAX / 2,
        };
        let mut timer = TimerState::new(durations, 3);
        assert_eq!(timer.total_seconds(), u64::MAX);
        timer.start();
        timer.enter_background(t0());
        assert_eq!(timer.return_to_foreground(t0() + Duration::seconds(5)), None);
        assert_eq!(timer.elapsed_seconds(), 5);
    }
}
