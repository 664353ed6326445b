use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{
        collection::usage_event::UsageEvent,
        storage::{entities::UsageSnapshot, snapshot_storage::SnapshotStorage},
    },
    remote::session::DistractionReport,
    timer::state::FocusMode,
    tracking::{
        accumulator::{SwitchKind, SwitchPolicy, UsageAccumulator},
        classifier::DistractionList,
    },
    utils::{clock::Clock, config::TrackingSettings},
};

use super::module::EventProcessor;

/// Bridges the collector and [SnapshotStorage]. Owns today's accumulator, follows the focus flag
/// published by the timer, and reports switches made during focus.
pub struct UsageProcessor<S: SnapshotStorage> {
    storage: S,
    accumulator: UsageAccumulator,
    focus_mode: watch::Receiver<FocusMode>,
    distractions: Option<mpsc::Sender<DistractionReport>>,
    flush_every_events: u32,
    pending_events: u32,
}

impl<S: SnapshotStorage> UsageProcessor<S> {
    /// Continues from whatever is stored for today. An unreadable snapshot is logged and replaced.
    pub async fn load(
        storage: S,
        clock: &dyn Clock,
        settings: &TrackingSettings,
        focus_mode: watch::Receiver<FocusMode>,
        distractions: Option<mpsc::Sender<DistractionReport>>,
    ) -> Self {
        let now = clock.time();
        let today = now.date_naive();
        let stored = load_or_log(&storage, today).await;
        let accumulator = UsageAccumulator::new(
            today,
            stored,
            now,
            DistractionList::new(settings.distraction_domains.iter().map(String::as_str)),
            SwitchPolicy::from(settings),
        );

        Self {
            storage,
            accumulator,
            focus_mode,
            distractions,
            flush_every_events: settings.flush_every_events.max(1),
            pending_events: 0,
        }
    }

    pub fn accumulator(&self) -> &UsageAccumulator {
        &self.accumulator
    }

    async fn roll_over_if_needed(&mut self, date: NaiveDate, event: &UsageEvent) {
        if date <= self.accumulator.date() {
            return;
        }
        info!("Day changed to {date}");
        self.flush().await;
        let stored = load_or_log(&self.storage, date).await;
        let (previous_date, previous) = self.accumulator.roll_over(date, stored, event.at());
        debug!("Closed {previous_date} with {previous:?}");
    }

    fn report_distraction(&self, event: &UsageEvent, kind: SwitchKind) {
        let Some(sender) = self.distractions.as_ref() else {
            return;
        };
        let report = DistractionReport {
            at: event.at(),
            quick: kind == SwitchKind::Quick,
        };
        if let Err(e) = sender.try_send(report) {
            warn!("Dropping distraction report {e}");
        }
    }

    /// Storage failures are only logged. Counters stay in memory and the next flush retries.
    async fn flush(&mut self) {
        self.pending_events = 0;
        if let Err(e) = self.accumulator.persist(&self.storage).await {
            error!("Failed to persist snapshot for {} {e:?}", self.accumulator.date());
        }
    }
}

async fn load_or_log(
    storage: &impl SnapshotStorage,
    date: NaiveDate,
) -> Option<UsageSnapshot> {
    storage
        .load(date)
        .await
        .inspect_err(|e| error!("Couldn't read snapshot for {date}, starting over {e:?}"))
        .ok()
        .flatten()
}

impl<S: SnapshotStorage> EventProcessor for UsageProcessor<S> {
    async fn process_next(&mut self, message: UsageEvent) -> Result<()> {
        let now = message.at();
        self.roll_over_if_needed(now.date_naive(), &message).await;

        let focus = *self.focus_mode.borrow_and_update();
        if focus.active {
            let resumed = !self.accumulator.is_focus_mode();
            if self.accumulator.start_focus_mode(now, focus.session) {
                info!("Focus session {} started", focus.session);
            } else if resumed {
                info!("Focus mode resumed");
            }
        } else if self.accumulator.is_focus_mode() {
            info!("Focus mode stopped");
            self.accumulator.stop_focus_mode();
        }

        match &message {
            UsageEvent::ForegroundTick { at, context } => {
                self.accumulator.on_foreground_tick(*at, context.as_deref())
            }
            UsageEvent::VisibilityLost(at) => {
                let kind = self.accumulator.on_visibility_lost(*at);
                if self.accumulator.is_focus_mode() {
                    self.report_distraction(&message, kind);
                }
            }
            UsageEvent::VisibilityRestored(at) => self.accumulator.on_visibility_restored(*at),
        }

        self.pending_events += 1;
        if message.is_visibility_change() || self.pending_events >= self.flush_every_events {
            self.flush().await;
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.accumulator.persist(&self.storage).await
    }
}
