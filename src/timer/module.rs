use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::utils::clock::Clock;

use super::{
    durations::TimerDurations,
    state::{FocusMode, Phase, TimerNotification, TimerState, TimerStatus},
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Toggle,
    Reset,
    SetDurations(TimerDurations),
    /// The host is about to stop delivering ticks, e.g. the machine goes to sleep.
    EnterBackground,
    ReturnToForeground,
}

/// What the presentation layer shows every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerReadout {
    pub running: bool,
    pub complete: bool,
    pub phase: Phase,
    pub elapsed_seconds: u64,
    pub time_left_seconds: u64,
    pub cycle: u32,
    pub cycles: u32,
    pub progress: u8,
}

impl From<&TimerState> for TimerReadout {
    fn from(state: &TimerState) -> Self {
        Self {
            running: matches!(
                state.status(),
                TimerStatus::Running | TimerStatus::TransitioningTo { .. }
            ),
            complete: state.status() == TimerStatus::Complete,
            phase: state.phase(),
            elapsed_seconds: state.elapsed_seconds(),
            time_left_seconds: state.time_left(),
            cycle: state.cycle_number(),
            cycles: state.cycles(),
            progress: state.progress().value(),
        }
    }
}

/// Drives a [TimerState] once per tick. This module is the only writer of the focus mode flag.
pub struct TimerModule {
    state: TimerState,
    commands: mpsc::Receiver<TimerCommand>,
    notifications: broadcast::Sender<TimerNotification>,
    focus_mode: watch::Sender<FocusMode>,
    readout: watch::Sender<TimerReadout>,
    shutdown: CancellationToken,
    tick_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl TimerModule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: TimerState,
        commands: mpsc::Receiver<TimerCommand>,
        notifications: broadcast::Sender<TimerNotification>,
        focus_mode: watch::Sender<FocusMode>,
        readout: watch::Sender<TimerReadout>,
        shutdown: CancellationToken,
        tick_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            state,
            commands,
            notifications,
            focus_mode,
            readout,
            shutdown,
            tick_interval,
            time_provider,
        }
    }

    fn handle_command(&mut self, command: TimerCommand) -> Option<TimerNotification> {
        debug!("Timer command {command:?}");
        let now = self.time_provider.time();
        match command {
            TimerCommand::Start => self.state.start(),
            TimerCommand::Pause => self.state.pause(),
            TimerCommand::Resume => self.state.resume(),
            TimerCommand::Toggle => self.state.toggle(),
            TimerCommand::Reset => self.state.reset(),
            TimerCommand::SetDurations(durations) => {
                info!("Timer set to {durations}");
                self.state.set_durations(durations)
            }
            TimerCommand::EnterBackground => {
                self.state.enter_background(now);
                None
            }
            TimerCommand::ReturnToForeground => self.state.return_to_foreground(now),
        }
    }

    /// A wall clock gap much longer than the tick means the process was suspended. The missed time
    /// is added through the background correction instead of a regular tick.
    fn handle_tick(&mut self, last_tick: DateTime<Utc>) -> Option<TimerNotification> {
        let now = self.time_provider.time();
        let gap = now - last_tick;
        let suspension_threshold = chrono::Duration::from_std(self.tick_interval * 2)
            .unwrap_or_else(|_| chrono::Duration::seconds(2));
        if gap > suspension_threshold {
            info!("Detected suspension of {}s", gap.num_seconds());
            self.state.enter_background(last_tick);
            self.state.return_to_foreground(now)
        } else {
            self.state.tick(now)
        }
    }

    fn publish(&mut self, notification: Option<TimerNotification>) {
        if let Some(notification) = notification {
            info!("Timer {notification:?}");
            // No subscribers is fine, the presentation loop might not be running.
            let _ = self.notifications.send(notification);
        }

        let focus = self.state.focus_mode();
        self.focus_mode.send_if_modified(|current| {
            let changed = *current != focus;
            *current = focus;
            changed
        });
        let readout = TimerReadout::from(&self.state);
        self.readout.send_if_modified(|current| {
            let changed = *current != readout;
            *current = readout;
            changed
        });
    }

    /// Executes the timer event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut next_tick = self.time_provider.instant() + self.tick_interval;
        let mut last_tick = self.time_provider.time();
        let mut commands_open = true;
        self.publish(None);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            let notification = self.handle_command(command);
                            self.publish(notification);
                        }
                        None => commands_open = false,
                    }
                }
                _ = self.time_provider.sleep_until(next_tick) => {
                    let notification = self.handle_tick(last_tick);
                    last_tick = self.time_provider.time();
                    self.publish(notification);

                    next_tick += self.tick_interval;
                    let now = self.time_provider.instant();
                    if next_tick < now {
                        warn!("Timer fell behind, skipping missed ticks");
                        next_tick = now + self.tick_interval;
                    }
                }
            }
        }

        // Focus mode ends with the timer.
        self.focus_mode.send_modify(|v| v.active = false);
        Ok(())
    }
}
