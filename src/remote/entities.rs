use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::daemon::storage::entities::UsageSnapshot;

/// `GET /focus/stats/:userId`. Missing fields are treated as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusStats {
    pub total_focus_time: u64,
    pub total_distractions: u64,
    pub session_count: u64,
}

/// `GET /activity/stats/:userId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityStats {
    pub app_switches: u64,
    pub distraction_time: u64,
    pub total_screen_time: u64,
    pub distraction_count: u64,
}

/// Both halves of the remote statistics. Only ever built when both requests succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTotals {
    pub focus: FocusStats,
    pub activity: ActivityStats,
}

impl RemoteTotals {
    /// Remote numbers in the local snapshot shape so both go through the same derivation.
    pub fn to_snapshot(&self, now: DateTime<Utc>) -> UsageSnapshot {
        let screen_time_ms = self.activity.total_screen_time;
        let focus_time_ms = self.focus.total_focus_time;
        UsageSnapshot {
            focus_time_ms,
            screen_time_ms,
            tab_switch_count: self.activity.app_switches,
            distraction_count: self.activity.distraction_count,
            distraction_time_ms: self.activity.distraction_time.min(screen_time_ms),
            focus_session_count: self.focus.session_count,
            switch_penalty_ms: 0,
            last_update: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartFocusRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct FocusSessionResponse {
    #[serde(rename = "_id", alias = "sessionId")]
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EndFocusRequest<'a> {
    pub session_id: &'a str,
    pub user_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractionLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_distraction: Option<bool>,
}

/// Request bodies carry the user next to the payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WithUser<'a, T> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub body: &'a T,
}
