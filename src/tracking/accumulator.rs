use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, trace};

use crate::{
    daemon::storage::{entities::UsageSnapshot, snapshot_storage::SnapshotStorage},
    utils::config::TrackingSettings,
};

use super::classifier::DistractionList;

/// Every foreground tick accounts for exactly this much screen time.
pub const TICK_MS: u64 = 1000;

/// How visibility losses are classified and penalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPolicy {
    pub quick_threshold_ms: u64,
    pub quick_penalty_ms: u64,
    pub base_penalty_ms: u64,
}

impl Default for SwitchPolicy {
    fn default() -> Self {
        Self::from(&TrackingSettings::default())
    }
}

impl From<&TrackingSettings> for SwitchPolicy {
    fn from(settings: &TrackingSettings) -> Self {
        Self {
            quick_threshold_ms: settings.quick_switch_threshold_ms,
            quick_penalty_ms: settings.quick_switch_penalty_ms,
            base_penalty_ms: settings.base_switch_penalty_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// Happened within the quick switch threshold of the previous switch. Counts as a distraction.
    Quick,
    Regular,
}

/// Owns the counters of a single day. Events mutate the in-memory snapshot, writing it out is a
/// separate, explicit [UsageAccumulator::persist] call.
pub struct UsageAccumulator {
    date: NaiveDate,
    snapshot: UsageSnapshot,
    classifier: DistractionList,
    policy: SwitchPolicy,
    focus_mode: bool,
    counted_session: Option<u64>,
    last_switch: DateTime<Utc>,
    dirty: bool,
}

impl UsageAccumulator {
    /// `stored` is whatever was persisted for `date` earlier, so a restart keeps counting where it
    /// left off.
    pub fn new(
        date: NaiveDate,
        stored: Option<UsageSnapshot>,
        now: DateTime<Utc>,
        classifier: DistractionList,
        policy: SwitchPolicy,
    ) -> Self {
        Self {
            date,
            snapshot: stored.unwrap_or_else(|| UsageSnapshot::empty(now)),
            classifier,
            policy,
            focus_mode: false,
            counted_session: None,
            last_switch: now,
            dirty: false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn snapshot(&self) -> &UsageSnapshot {
        &self.snapshot
    }

    pub fn is_focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One second of foreground time.
    pub fn on_foreground_tick(&mut self, now: DateTime<Utc>, context: Option<&str>) {
        self.snapshot.screen_time_ms += TICK_MS;
        if self.focus_mode || self.classifier.is_productive(context) {
            self.snapshot.focus_time_ms += TICK_MS;
        }
        trace!(
            "Tick: screen {} focus {}",
            self.snapshot.screen_time_ms,
            self.snapshot.focus_time_ms
        );
        self.touch(now);
    }

    pub fn on_visibility_lost(&mut self, now: DateTime<Utc>) -> SwitchKind {
        self.snapshot.tab_switch_count += 1;
        let since_last_switch = (now - self.last_switch).num_milliseconds();
        let kind = if since_last_switch < self.policy.quick_threshold_ms as i64 {
            self.snapshot.distraction_count += 1;
            self.snapshot.switch_penalty_ms += self.policy.quick_penalty_ms;
            SwitchKind::Quick
        } else {
            self.snapshot.switch_penalty_ms += self.policy.base_penalty_ms;
            SwitchKind::Regular
        };
        debug!("Visibility lost {since_last_switch}ms after previous switch: {kind:?}");
        self.last_switch = now;
        self.touch(now);
        kind
    }

    pub fn on_visibility_restored(&mut self, now: DateTime<Utc>) {
        self.last_switch = now;
    }

    /// Turns focus mode on for the timer's focus `session`. Returns `true` if that session wasn't
    /// counted yet. Repeated calls and resuming a paused session don't count another one.
    pub fn start_focus_mode(&mut self, now: DateTime<Utc>, session: u64) -> bool {
        self.focus_mode = true;
        if self.counted_session == Some(session) {
            return false;
        }
        self.counted_session = Some(session);
        self.snapshot.focus_session_count += 1;
        self.touch(now);
        true
    }

    pub fn stop_focus_mode(&mut self) {
        self.focus_mode = false;
    }

    /// Switches to a new day. Returns the finished snapshot so the caller can persist it. Focus
    /// mode carries over but doesn't count as a new session.
    pub fn roll_over(
        &mut self,
        date: NaiveDate,
        stored: Option<UsageSnapshot>,
        now: DateTime<Utc>,
    ) -> (NaiveDate, UsageSnapshot) {
        let previous_date = std::mem::replace(&mut self.date, date);
        let previous = std::mem::replace(
            &mut self.snapshot,
            stored.unwrap_or_else(|| UsageSnapshot::empty(now)),
        );
        self.dirty = true;
        (previous_date, previous)
    }

    /// Writes the snapshot if anything changed since the last successful write. A failed write
    /// leaves the in-memory counters untouched and the snapshot dirty.
    pub async fn persist(&mut self, storage: &impl SnapshotStorage) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        storage.save(self.date, &self.snapshot).await?;
        self.dirty = false;
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.snapshot.distraction_time_ms = UsageSnapshot::estimate_distraction_ms(
            self.snapshot.focus_time_ms,
            self.snapshot.screen_time_ms,
        );
        self.snapshot.last_update = now;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        daemon::storage::{
            entities::UsageSnapshot,
            snapshot_storage::{SnapshotStorage, SnapshotStorageImpl},
        },
        tracking::classifier::DistractionList,
    };

    use super::{SwitchKind, SwitchPolicy, UsageAccumulator};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()
    }

    fn accumulator() -> UsageAccumulator {
        UsageAccumulator::new(
            t0().date_naive(),
            None,
            t0(),
            DistractionList::new(["youtube.com"]),
            SwitchPolicy::default(),
        )
    }

    #[test]
    fn test_ticks_add_one_second_of_screen_time() {
        let mut acc = accumulator();
        let contexts = [Some("github.com"), Some("youtube.com"), None, Some("youtube.com")];
        for (i, context) in contexts.iter().enumerate() {
            acc.on_foreground_tick(t0() + Duration::seconds(i as i64), *context);
            let snapshot = acc.snapshot();
            assert_eq!(snapshot.screen_time_ms, 1000 * (i as u64 + 1));
            assert!(snapshot.focus_time_ms <= snapshot.screen_time_ms);
            assert!(snapshot.distraction_time_ms <= snapshot.screen_time_ms);
        }
        assert_eq!(acc.snapshot().focus_time_ms, 2000);
        assert_eq!(acc.snapshot().distraction_time_ms, 2000);
    }

    #[test]
    fn test_focus_mode_counts_distraction_domains_as_focus() {
        let mut acc = accumulator();
        assert!(acc.start_focus_mode(t0(), 1));
        acc.on_foreground_tick(t0(), Some("youtube.com"));
        assert_eq!(acc.snapshot().focus_time_ms, 1000);

        acc.stop_focus_mode();
        acc.on_foreground_tick(t0(), Some("youtube.com"));
        assert_eq!(acc.snapshot().focus_time_ms, 1000);
        assert_eq!(acc.snapshot().screen_time_ms, 2000);
    }

    #[test]
    fn test_start_focus_mode_is_idempotent() {
        let mut acc = accumulator();
        assert!(acc.start_focus_mode(t0(), 1));
        assert!(!acc.start_focus_mode(t0(), 1));
        assert_eq!(acc.snapshot().focus_session_count, 1);

        // Paused and resumed within the same focus phase.
        acc.stop_focus_mode();
        assert!(!acc.start_focus_mode(t0(), 1));
        assert!(acc.is_focus_mode());
        assert_eq!(acc.snapshot().focus_session_count, 1);

        acc.stop_focus_mode();
        assert!(acc.start_focus_mode(t0(), 2));
        assert_eq!(acc.snapshot().focus_session_count, 2);
    }

    #[test]
    fn test_quick_switch_is_a_distraction() {
        let mut acc = accumulator();
        let kind = acc.on_visibility_lost(t0() + Duration::milliseconds(20_000));
        assert_eq!(kind, SwitchKind::Quick);
        assert_eq!(acc.snapshot().tab_switch_count, 1);
        assert_eq!(acc.snapshot().distraction_count, 1);
        assert_eq!(acc.snapshot().switch_penalty_ms, 180_000);
    }

    #[test]
    fn test_slow_switch_only_gets_base_penalty() {
        let mut acc = accumulator();
        let kind = acc.on_visibility_lost(t0() + Duration::milliseconds(60_000));
        assert_eq!(kind, SwitchKind::Regular);
        assert_eq!(acc.snapshot().tab_switch_count, 1);
        assert_eq!(acc.snapshot().distraction_count, 0);
        assert_eq!(acc.snapshot().switch_penalty_ms, 120_000);
    }

    #[test]
    fn test_restoring_visibility_restarts_switch_timer() {
        let mut acc = accumulator();
        acc.on_visibility_lost(t0() + Duration::seconds(60));
        acc.on_visibility_restored(t0() + Duration::seconds(200));
        // 10 seconds after coming back.
        let kind = acc.on_visibility_lost(t0() + Duration::seconds(210));
        assert_eq!(kind, SwitchKind::Quick);
        assert_eq!(acc.snapshot().tab_switch_count, 2);
        assert_eq!(acc.snapshot().distraction_count, 1);
        assert_eq!(acc.snapshot().switch_penalty_ms, 300_000);
        // Penalties are informational and don't leak into the estimate.
        assert_eq!(acc.snapshot().distraction_time_ms, 0);
    }

    #[test]
    fn test_roll_over_returns_previous_day() {
        let mut acc = accumulator();
        acc.on_foreground_tick(t0(), None);
        let next = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let (date, previous) = acc.roll_over(next, None, t0() + Duration::days(1));
        assert_eq!(date, t0().date_naive());
        assert_eq!(previous.screen_time_ms, 1000);
        assert_eq!(acc.date(), next);
        assert_eq!(acc.snapshot().screen_time_ms, 0);
    }

    #[tokio::test]
    async fn test_persist_only_when_dirty() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned())?;
        let mut acc = accumulator();

        acc.persist(&storage).await?;
        assert_eq!(storage.load(acc.date()).await?, None);

        acc.on_foreground_tick(t0(), None);
        assert!(acc.is_dirty());
        acc.persist(&storage).await?;
        assert!(!acc.is_dirty());
        assert_eq!(storage.load(acc.date()).await?.as_ref(), Some(acc.snapshot()));
        Ok(())
    }

    #[tokio::test]
    async fn test_counters_survive_restart() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned())?;
        let mut acc = accumulator();
        for i in 0..3 {
            acc.on_foreground_tick(t0() + Duration::seconds(i), None);
        }
        acc.persist(&storage).await?;

        let stored = storage.load(t0().date_naive()).await?;
        let mut restarted = UsageAccumulator::new(
            t0().date_naive(),
            stored,
            t0() + Duration::seconds(10),
            DistractionList::new(["youtube.com"]),
            SwitchPolicy::default(),
        );
        restarted.on_foreground_tick(t0() + Duration::seconds(11), None);
        assert_eq!(restarted.snapshot().screen_time_ms, 4000);
        Ok(())
    }

    struct FailingStorage;

    impl SnapshotStorage for FailingStorage {
        async fn load(&self, _date: NaiveDate) -> Result<Option<UsageSnapshot>> {
            Ok(None)
        }

        async fn save(&self, _date: NaiveDate, _snapshot: &UsageSnapshot) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_counters() {
        let mut acc = accumulator();
        acc.on_foreground_tick(t0(), None);
        assert!(acc.persist(&FailingStorage).await.is_err());
        assert!(acc.is_dirty());
        assert_eq!(acc.snapshot().screen_time_ms, 1000);
    }
}
