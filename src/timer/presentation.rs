use std::{io::Write, sync::Arc};

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    insights::service::InsightService, stats::derive::UsageStats, utils::time::format_clock,
};

use super::{
    module::TimerReadout,
    state::{Phase, TimerNotification},
};

const BELL: &str = "\x07";

/// Terminal side of the daemon. Timer notifications become lines on `output` with an audible
/// bell, stats updates are logged and a distraction alert is printed once per episode.
pub struct PresentationModule<W> {
    notifications: broadcast::Receiver<TimerNotification>,
    readout: Option<watch::Receiver<TimerReadout>>,
    stats: Option<watch::Receiver<Option<UsageStats>>>,
    insights: Arc<InsightService>,
    shutdown: CancellationToken,
    output: W,
    alerted: bool,
}

impl<W: Write> PresentationModule<W> {
    pub fn new(
        notifications: broadcast::Receiver<TimerNotification>,
        readout: Option<watch::Receiver<TimerReadout>>,
        stats: Option<watch::Receiver<Option<UsageStats>>>,
        insights: Arc<InsightService>,
        shutdown: CancellationToken,
        output: W,
    ) -> Self {
        Self {
            notifications,
            readout,
            stats,
            insights,
            shutdown,
            output,
            alerted: false,
        }
    }

    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.output, "{line}").and_then(|_| self.output.flush()) {
            warn!("Couldn't write to output {e}");
        }
    }

    /// ` (12:30 left, cycle 1/3)` when the timer readout is available.
    fn time_left(&self) -> String {
        match &self.readout {
            Some(readout) => {
                let readout = readout.borrow();
                format!(
                    " ({} left, cycle {}/{})",
                    format_clock(readout.time_left_seconds),
                    readout.cycle,
                    readout.cycles
                )
            }
            None => String::new(),
        }
    }

    async fn handle_notification(&mut self, notification: TimerNotification) {
        info!("Timer notification {notification:?}");
        match notification {
            TimerNotification::Started(phase) => {
                let left = self.time_left();
                self.print(&format!("{phase} started{left}"))
            }
            TimerNotification::Paused => {
                let left = self.time_left();
                self.print(&format!("Timer paused{left}"))
            }
            TimerNotification::Resumed => self.print("Timer resumed"),
            TimerNotification::Reset => self.print("Timer reset"),
            TimerNotification::PhaseChanged { phase, cycle } => {
                self.print(&format!("{BELL}{phase}! (cycle {cycle})"));
                if phase == Phase::Break {
                    let activity = self.insights.break_activity(cycle as usize).await;
                    self.print(&format!("Break idea: {activity}"));
                }
            }
            TimerNotification::Completed => {
                self.print(&format!("{BELL}All cycles complete. Well done!"))
            }
        }
    }

    fn handle_stats(&mut self, stats: &UsageStats) {
        info!(
            "Focus {} / distraction {} of {}s screen time, {} switches",
            stats.focus_percentage,
            stats.distraction_percentage,
            stats.screen_time_ms / 1000,
            stats.tab_switch_count
        );
        let distracted = stats.is_distracted();
        if distracted && !self.alerted {
            self.print(&format!(
                "{BELL}You seem distracted (score {:.1}). Try a focus session?",
                stats.distraction_score
            ));
        }
        self.alerted = distracted;
    }

    /// Executes the presentation loop until shutdown or until every source is gone.
    pub async fn run(mut self) -> Result<()> {
        let mut notifications_open = true;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                notification = self.notifications.recv(), if notifications_open => {
                    match notification {
                        Ok(v) => self.handle_notification(v).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Missed {skipped} timer notifications")
                        }
                        Err(broadcast::error::RecvError::Closed) => notifications_open = false,
                    }
                }
                stats = stats_changed(&mut self.stats) => {
                    match stats {
                        Some(Some(v)) => self.handle_stats(&v),
                        Some(None) => {}
                        None => self.stats = None,
                    }
                }
                else => break,
            }
            if !notifications_open && self.stats.is_none() {
                break;
            }
        }
        Ok(())
    }
}

/// `None` once the sender is gone.
async fn stats_changed(
    stats: &mut Option<watch::Receiver<Option<UsageStats>>>,
) -> Option<Option<UsageStats>> {
    match stats {
        Some(stats) => match stats.changed().await {
            Ok(()) => Some(stats.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tokio::sync::{broadcast, watch};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::storage::entities::UsageSnapshot,
        insights::{fallback::UNCONFIGURED_BREAK_ACTIVITY, service::InsightService},
        stats::derive::{SourceStatus, StatsOrigin, UsageStats},
        timer::{
            durations::TimerDurations,
            module::TimerReadout,
            state::{Phase, TimerNotification, TimerState},
        },
    };

    use super::PresentationModule;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn distracted_stats() -> UsageStats {
        let mut snapshot = UsageSnapshot::empty(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap());
        snapshot.screen_time_ms = 60_000;
        snapshot.focus_time_ms = 18_000;
        snapshot.distraction_time_ms = 42_000;
        snapshot.tab_switch_count = 4;
        UsageStats::from_snapshot(&snapshot, StatsOrigin::Local, SourceStatus::LocalOnly)
    }

    #[tokio::test]
    async fn test_break_rings_bell_and_suggests_activity() -> Result<()> {
        let (notifications, receiver) = broadcast::channel(8);
        let output = SharedBuffer::default();
        let module = PresentationModule::new(
            receiver,
            None,
            None,
            Arc::new(InsightService::new(None)),
            CancellationToken::new(),
            output.clone(),
        );

        notifications.send(TimerNotification::Started(Phase::Focus))?;
        notifications.send(TimerNotification::PhaseChanged {
            phase: Phase::Break,
            cycle: 1,
        })?;
        notifications.send(TimerNotification::Completed)?;
        drop(notifications);
        module.run().await?;

        let text = output.text();
        assert!(text.starts_with("Focus time started\n"));
        assert!(text.contains("\x07Break time! (cycle 1)"));
        assert!(text.contains(UNCONFIGURED_BREAK_ACTIVITY));
        assert!(text.ends_with("\x07All cycles complete. Well done!\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_pause_shows_time_left() -> Result<()> {
        let (notifications, receiver) = broadcast::channel(8);
        let mut state = TimerState::new(TimerDurations::TEST, 3);
        state.start();
        state.tick(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 1).unwrap());
        state.pause();
        let (_readout_sender, readout) = watch::channel(TimerReadout::from(&state));
        let output = SharedBuffer::default();
        let module = PresentationModule::new(
            receiver,
            Some(readout),
            None,
            Arc::new(InsightService::new(None)),
            CancellationToken::new(),
            output.clone(),
        );

        notifications.send(TimerNotification::Paused)?;
        drop(notifications);
        module.run().await?;

        assert_eq!(output.text(), "Timer paused (00:04 left, cycle 1/3)\n");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_distraction_alert_once_per_episode() -> Result<()> {
        let (_notifications, receiver) = broadcast::channel(8);
        let (stats_sender, stats) = watch::channel(None);
        let output = SharedBuffer::default();
        let shutdown = CancellationToken::new();
        let module = PresentationModule::new(
            receiver,
            None,
            Some(stats),
            Arc::new(InsightService::new(None)),
            shutdown.clone(),
            output.clone(),
        );

        let (result, _) = tokio::join!(module.run(), async {
            stats_sender.send_replace(Some(distracted_stats()));
            tokio::time::sleep(Duration::from_millis(10)).await;
            stats_sender.send_replace(Some(distracted_stats()));
            tokio::time::sleep(Duration::from_millis(10)).await;
            shutdown.cancel();
        });
        result?;

        assert_eq!(output.text().matches("You seem distracted").count(), 1);
        Ok(())
    }
}
