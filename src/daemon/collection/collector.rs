use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};

use crate::utils::clock::Clock;

use super::{
    usage_event::UsageEvent,
    visibility::{VisibilitySource, VisibilityState},
};

pub struct DataCollectionModule {
    next: mpsc::Sender<UsageEvent>,
    source: Box<dyn VisibilitySource>,
    shutdown: CancellationToken,
    collection_frequency: Duration,
    time_provider: Box<dyn Clock>,
    visible: Option<bool>,
}

impl DataCollectionModule {
    pub fn new(
        next: mpsc::Sender<UsageEvent>,
        source: Box<dyn VisibilitySource>,
        shutdown: CancellationToken,
        collection_frequency: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            source,
            shutdown,
            collection_frequency,
            time_provider,
            visible: None,
        }
    }

    fn observe(&mut self) -> VisibilityState {
        match self.source.current() {
            Ok(Some(state)) => state,
            Ok(None) => VisibilityState::default(),
            Err(e) => {
                error!("Visibility source failed, assuming visible {e:?}");
                VisibilityState::default()
            }
        }
    }

    /// Turns the current observation into events. Transitions are only reported after the first
    /// observation, so a restart never counts as a switch.
    fn collect_data(&mut self) -> Vec<UsageEvent> {
        let state = self.observe();
        let now = self.time_provider.time();
        let previous = self.visible.replace(state.visible);

        let mut events = Vec::with_capacity(2);
        match (previous, state.visible) {
            (Some(true), false) => events.push(UsageEvent::VisibilityLost(now)),
            (Some(false), true) => events.push(UsageEvent::VisibilityRestored(now)),
            _ => {}
        }
        if state.visible {
            events.push(UsageEvent::ForegroundTick {
                at: now,
                context: state.context,
            });
        }
        events
    }

    /// Executes the collector event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            for event in self.collect_data() {
                let span = info_span!("Processing collected event");
                debug!("Sending event {:?}", event);
                self.next
                    .send(event)
                    .instrument(span)
                    .await
                    .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
            }

            tokio::select! {
                // Cancellation drops the sender, which in turn stops the processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::collection::{
            usage_event::UsageEvent,
            visibility::{MockVisibilitySource, VisibilityState},
        },
        utils::{clock::test_clock::TestClock, logging::TEST_LOGGING},
    };

    use super::DataCollectionModule;

    fn state(visible: bool) -> Option<VisibilityState> {
        Some(VisibilityState {
            visible,
            context: Some("github.com".into()),
        })
    }

    async fn collect(
        source: MockVisibilitySource,
        run_for: Duration,
    ) -> Result<Vec<UsageEvent>> {
        let (sender, mut receiver) = mpsc::channel(32);
        let shutdown = CancellationToken::new();
        let clock = TestClock::new(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap());
        let collector = DataCollectionModule::new(
            sender,
            Box::new(source),
            shutdown.clone(),
            Duration::from_secs(1),
            Box::new(clock),
        );

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(run_for).await;
                shutdown.cancel();
            },
            collector.run()
        );
        result?;

        let mut events = vec![];
        while let Some(event) = receiver.recv().await {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_transitions_and_ticks() -> Result<()> {
        *TEST_LOGGING;
        let mut states = [true, true, false, false, true].into_iter();
        let mut source = MockVisibilitySource::new();
        source
            .expect_current()
            .times(5)
            .returning(move || Ok(state(states.next().unwrap())));

        let events = collect(source, Duration::from_millis(4500)).await?;
        let kinds = events
            .iter()
            .map(|v| match v {
                UsageEvent::ForegroundTick { .. } => "tick",
                UsageEvent::VisibilityLost(_) => "lost",
                UsageEvent::VisibilityRestored(_) => "restored",
            })
            .collect::<Vec<_>>();
        assert_eq!(kinds, ["tick", "tick", "lost", "restored", "tick"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_hidden_observation_is_not_a_switch() -> Result<()> {
        let mut source = MockVisibilitySource::new();
        source.expect_current().returning(|| Ok(state(false)));

        let events = collect(source, Duration::from_millis(2500)).await?;
        assert!(events.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_signal_counts_as_visible() -> Result<()> {
        let mut calls = 0;
        let mut source = MockVisibilitySource::new();
        source.expect_current().returning(move || {
            calls += 1;
            if calls == 1 {
                Err(anyhow!("permission denied"))
            } else {
                Ok(None)
            }
        });

        let events = collect(source, Duration::from_millis(1500)).await?;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            UsageEvent::ForegroundTick { context: None, .. }
        ));
        Ok(())
    }
}
