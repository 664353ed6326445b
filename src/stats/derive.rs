use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    daemon::storage::entities::UsageSnapshot,
    remote::{client::RemoteError, entities::RemoteTotals},
    utils::percentage::Percentage,
};

/// Scores above this raise a distraction alert.
pub const DISTRACTION_ALERT_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatsOrigin {
    Local,
    Remote,
}

/// Soft status attached to stats. Never an error, the numbers are always usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Fresh,
    /// No remote source is configured.
    LocalOnly,
    /// Remote source is configured but couldn't be used, local numbers are shown instead.
    RemoteUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub focus_time_ms: u64,
    pub screen_time_ms: u64,
    pub distraction_time_ms: u64,
    pub tab_switch_count: u64,
    pub distraction_count: u64,
    pub focus_session_count: u64,
    pub focus_percentage: Percentage,
    pub distraction_percentage: Percentage,
    pub distraction_score: f64,
    pub origin: StatsOrigin,
    pub status: SourceStatus,
}

impl UsageStats {
    pub fn from_snapshot(snapshot: &UsageSnapshot, origin: StatsOrigin, status: SourceStatus) -> Self {
        Self {
            focus_time_ms: snapshot.focus_time_ms,
            screen_time_ms: snapshot.screen_time_ms,
            distraction_time_ms: snapshot.distraction_time_ms,
            tab_switch_count: snapshot.tab_switch_count,
            distraction_count: snapshot.distraction_count,
            focus_session_count: snapshot.focus_session_count,
            focus_percentage: Percentage::of(snapshot.focus_time_ms, snapshot.screen_time_ms),
            distraction_percentage: Percentage::of(
                snapshot.distraction_time_ms,
                snapshot.screen_time_ms,
            ),
            distraction_score: distraction_score(
                snapshot.tab_switch_count,
                snapshot.focus_time_ms,
                snapshot.screen_time_ms,
            ),
            origin,
            status,
        }
    }

    pub fn is_distracted(&self) -> bool {
        self.distraction_score > DISTRACTION_ALERT_THRESHOLD
    }
}

/// Rule based score in `[0, 1]`. Lots of switching combined with little focus is a strong signal.
pub fn distraction_score(switches: u64, focus_time_ms: u64, screen_time_ms: u64) -> f64 {
    if screen_time_ms == 0 {
        return 0.;
    }
    let screen_seconds = screen_time_ms as f64 / 1000.;
    let switch_rate = switches as f64 / screen_seconds;
    let focus_ratio = focus_time_ms as f64 / screen_time_ms as f64;
    if switch_rate > 0.05 && focus_ratio < 0.5 {
        0.8
    } else {
        0.2
    }
}

/// Picks the source for display. Remote totals are only used when they are complete, otherwise
/// the local snapshot is used as is.
pub fn derive_stats(
    local: &UsageSnapshot,
    remote: Option<Result<RemoteTotals, RemoteError>>,
    now: DateTime<Utc>,
) -> UsageStats {
    match remote {
        None => UsageStats::from_snapshot(local, StatsOrigin::Local, SourceStatus::LocalOnly),
        Some(Ok(totals)) => UsageStats::from_snapshot(
            &totals.to_snapshot(now),
            StatsOrigin::Remote,
            SourceStatus::Fresh,
        ),
        Some(Err(e)) => UsageStats::from_snapshot(
            local,
            StatsOrigin::Local,
            SourceStatus::RemoteUnavailable(e.to_string()),
        ),
    }
}

/// Sums snapshots of several days.
pub fn aggregate(snapshots: impl IntoIterator<Item = UsageSnapshot>, now: DateTime<Utc>) -> UsageSnapshot {
    snapshots
        .into_iter()
        .fold(UsageSnapshot::empty(now), |acc, v| acc.merge(&v))
}
