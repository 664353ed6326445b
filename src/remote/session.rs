use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::timer::state::{Phase, TimerNotification};

use super::{client::RemoteApi, entities::DistractionLog};

/// Visibility was lost while focus mode was on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistractionReport {
    pub at: DateTime<Utc>,
    /// The switch came right after the previous one.
    pub quick: bool,
}

/// Mirrors focus phases as remote focus sessions and logs distractions against the open one.
pub struct RemoteSessionModule {
    api: Arc<dyn RemoteApi>,
    notifications: broadcast::Receiver<TimerNotification>,
    distractions: mpsc::Receiver<DistractionReport>,
    shutdown: CancellationToken,
    session_id: Option<String>,
}

impl RemoteSessionModule {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        notifications: broadcast::Receiver<TimerNotification>,
        distractions: mpsc::Receiver<DistractionReport>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            notifications,
            distractions,
            shutdown,
            session_id: None,
        }
    }

    async fn start_session(&mut self) {
        if self.session_id.is_some() {
            return;
        }
        match self.api.start_focus_session().await {
            Ok(id) => {
                info!("Started remote focus session {id}");
                self.session_id = Some(id);
            }
            Err(e) => warn!("Couldn't start remote focus session {e}"),
        }
    }

    async fn end_session(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        match self.api.end_focus_session(&id).await {
            Ok(()) => info!("Ended remote focus session {id}"),
            Err(e) => warn!("Couldn't end remote focus session {id} {e}"),
        }
    }

    async fn handle_notification(&mut self, notification: TimerNotification) {
        match notification {
            TimerNotification::Started(Phase::Focus) => self.start_session().await,
            // A new focus phase always gets its own session, even if the break in between was
            // skipped over while suspended.
            TimerNotification::PhaseChanged {
                phase: Phase::Focus,
                ..
            } => {
                self.end_session().await;
                self.start_session().await;
            }
            TimerNotification::PhaseChanged {
                phase: Phase::Break,
                ..
            }
            | TimerNotification::Completed
            | TimerNotification::Reset => self.end_session().await,
            _ => {}
        }
    }

    async fn handle_distraction(&mut self, report: DistractionReport) {
        let distraction = DistractionLog {
            session_id: self.session_id.clone(),
            kind: "click_away".into(),
            details: if report.quick {
                "User quickly switched away from focus".into()
            } else {
                "User switched away from focus".into()
            },
            url: None,
            domain: None,
        };
        debug!("Logging distraction at {}", report.at);
        if let Err(e) = self.api.log_distraction(&distraction).await {
            warn!("Couldn't log distraction {e}");
        }
    }

    /// Executes the session event loop. An open session is closed on shutdown.
    pub async fn run(mut self) -> Result<()> {
        let mut notifications_open = true;
        let mut distractions_open = true;
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
                report = self.distractions.recv(), if distractions_open => {
                    match report {
                        Some(v) => self.handle_distraction(v).await,
                        None => distractions_open = false,
                    }
                }
            }
            if !notifications_open && !distractions_open {
                break;
            }
        }
        self.end_session().await;
        Ok(())
    }
}
