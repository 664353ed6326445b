use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use futures::{stream::FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    daemon::storage::snapshot_storage::SnapshotStorage, remote::entities::DateRange,
    utils::clock::Clock,
};

use super::{derive::UsageStats, source::StatsSource};

/// Generation counter. Only the result of the most recently started request may be applied.
#[derive(Clone, Default)]
pub struct LatestOnly {
    generation: Arc<AtomicU64>,
}

#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl LatestOnly {
    pub fn begin(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            latest: self.generation.clone(),
        }
    }
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Periodically re-reads stats and publishes them. A range change starts a new request right
/// away and makes any older one a no-op when it lands. A periodic refresh is skipped while a
/// request is still running, so a slow remote can't keep every result stale.
pub struct StatsRefreshModule<S> {
    source: Arc<StatsSource<S>>,
    range: Option<watch::Receiver<DateRange>>,
    stats: watch::Sender<Option<UsageStats>>,
    latest: LatestOnly,
    shutdown: CancellationToken,
    refresh_interval: Duration,
    time_provider: Arc<dyn Clock>,
}

impl<S: SnapshotStorage + Send + Sync + 'static> StatsRefreshModule<S> {
    /// Without a `range` the module always follows the current day. Remote requests are cut off
    /// at `refresh_interval`.
    pub fn new(
        mut source: StatsSource<S>,
        range: Option<watch::Receiver<DateRange>>,
        stats: watch::Sender<Option<UsageStats>>,
        shutdown: CancellationToken,
        refresh_interval: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        source.cap_remote_timeout(refresh_interval);
        Self {
            source: Arc::new(source),
            range,
            stats,
            latest: LatestOnly::default(),
            shutdown,
            refresh_interval,
            time_provider,
        }
    }

    fn current_range(&self) -> DateRange {
        match &self.range {
            Some(range) => *range.borrow(),
            None => DateRange::day(self.time_provider.time().date_naive()),
        }
    }

    fn start_request(&self) -> impl Future<Output = (Ticket, UsageStats)> {
        let ticket = self.latest.begin();
        let source = self.source.clone();
        let range = self.current_range();
        let now = self.time_provider.time();
        async move { (ticket, source.collect(range, now).await) }
    }

    /// Executes the refresh event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut in_flight = FuturesUnordered::new();
        in_flight.push(self.start_request());
        let mut next_refresh = self.time_provider.instant() + self.refresh_interval;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = self.time_provider.sleep_until(next_refresh) => {
                    next_refresh += self.refresh_interval;
                    if in_flight.is_empty() {
                        in_flight.push(self.start_request());
                    } else {
                        debug!("Previous refresh still running, skipping");
                    }
                }
                changed = range_changed(&mut self.range) => {
                    if changed {
                        in_flight.push(self.start_request());
                    } else {
                        warn!("Range sender is gone, following today from now on");
                        self.range = None;
                    }
                }
                Some((ticket, stats)) = in_flight.next() => {
                    if ticket.is_current() {
                        self.stats.send_replace(Some(stats));
                    } else {
                        debug!("Discarding stale stats {ticket:?}");
                    }
                }
            }
        }
    }
}

async fn range_changed(range: &mut Option<watch::Receiver<DateRange>>) -> bool {
    match range {
        Some(range) => range.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::sync::watch;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::storage::{
            entities::UsageSnapshot,
            snapshot_storage::{SnapshotStorage, SnapshotStorageImpl},
        },
        remote::{
            client::{RemoteApi, RemoteError},
            entities::{ActivityLog, ActivityStats, DateRange, DistractionLog, FocusStats},
        },
        stats::{
            derive::{SourceStatus, StatsOrigin},
            source::StatsSource,
        },
        utils::clock::test_clock::TestClock,
    };

    use super::{LatestOnly, StatsRefreshModule};

    #[test]
    fn test_only_latest_ticket_is_current() {
        let latest = LatestOnly::default();
        let first = latest.begin();
        assert!(first.is_current());
        let second = latest.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    /// Answers requests for the 1st of the month slowly, everything else right away. Screen time
    /// tells which range a response belongs to.
    struct SlowFirstDay;

    #[async_trait]
    impl RemoteApi for SlowFirstDay {
        async fn focus_stats(&self, range: DateRange) -> Result<FocusStats, RemoteError> {
            if range.start.format("%d").to_string() == "01" {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Ok(FocusStats::default())
        }

        async fn activity_stats(&self, range: DateRange) -> Result<ActivityStats, RemoteError> {
            Ok(ActivityStats {
                total_screen_time: range.start.format("%d").to_string().parse::<u64>().unwrap_or(0),
                ..Default::default()
            })
        }

        async fn start_focus_session(&self) -> Result<String, RemoteError> {
            Ok("unused".into())
        }

        async fn end_focus_session(&self, _session_id: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn log_distraction(&self, _distraction: &DistractionLog) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn log_activity(&self, _activity: &ActivityLog) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned())?;
        let source = StatsSource::new(storage, Some(Arc::new(SlowFirstDay)), Duration::from_secs(10));
        let (range_sender, range) = watch::channel(DateRange::day(day(1)));
        let (stats_sender, mut stats) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let clock = TestClock::new(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap());

        let module = StatsRefreshModule::new(
            source,
            Some(range),
            stats_sender,
            shutdown.clone(),
            Duration::from_secs(60),
            Arc::new(clock),
        );

        let (result, _) = tokio::join!(module.run(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            range_sender.send(DateRange::day(day(2))).unwrap();

            stats.changed().await.unwrap();
            let current = stats.borrow_and_update().clone().unwrap();
            assert_eq!(current.screen_time_ms, 2);
            assert_eq!(current.origin, StatsOrigin::Remote);

            // Let the slow request for the 1st finish. It must not overwrite the newer result.
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert!(!stats.has_changed().unwrap());
            assert_eq!(stats.borrow().as_ref().unwrap().screen_time_ms, 2);
            shutdown.cancel();
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_today_and_refreshes() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(SnapshotStorageImpl::new(dir.path().to_owned())?);
        let start = Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap();
        let source = StatsSource::new(storage.clone(), None, Duration::from_secs(1));
        let (stats_sender, stats) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let module = StatsRefreshModule::new(
            source,
            None,
            stats_sender,
            shutdown.clone(),
            Duration::from_secs(5),
            Arc::new(TestClock::new(start)),
        );

        let (result, _) = tokio::join!(module.run(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(stats.borrow().as_ref().unwrap().screen_time_ms, 0);

            let mut snapshot = UsageSnapshot::empty(start);
            snapshot.screen_time_ms = 4000;
            storage.save(day(7), &snapshot).await.unwrap();

            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(stats.borrow().as_ref().unwrap().screen_time_ms, 4000);
            shutdown.cancel();
        });
        result
    }

    /// Every request takes longer than the refresh interval.
    struct SlowRemote;

    #[async_trait]
    impl RemoteApi for SlowRemote {
        async fn focus_stats(&self, _range: DateRange) -> Result<FocusStats, RemoteError> {
            tokio::time::sleep(Duration::from_secs(6)).await;
            Ok(FocusStats::default())
        }

        async fn activity_stats(&self, _range: DateRange) -> Result<ActivityStats, RemoteError> {
            Ok(ActivityStats::default())
        }

        async fn start_focus_session(&self) -> Result<String, RemoteError> {
            Ok("unused".into())
        }

        async fn end_focus_session(&self, _session_id: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn log_distraction(&self, _distraction: &DistractionLog) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn log_activity(&self, _activity: &ActivityLog) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_remote_still_publishes() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned())?;
        let source = StatsSource::new(storage, Some(Arc::new(SlowRemote)), Duration::from_secs(10));
        let (stats_sender, stats) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let module = StatsRefreshModule::new(
            source,
            None,
            stats_sender,
            shutdown.clone(),
            Duration::from_secs(5),
            Arc::new(TestClock::new(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap())),
        );

        let (result, _) = tokio::join!(module.run(), async {
            tokio::time::sleep(Duration::from_millis(5500)).await;
            let current = stats.borrow().clone().expect("published");
            assert_eq!(current.origin, StatsOrigin::Local);
            assert_eq!(
                current.status,
                SourceStatus::RemoteUnavailable(RemoteError::Timeout.to_string())
            );

            tokio::time::sleep(Duration::from_secs(60)).await;
            assert!(stats.borrow().is_some());
            shutdown.cancel();
        });
        result
    }
}
