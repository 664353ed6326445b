use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Daily aggregate of usage counters. One document per calendar day, keyed by the date. Field names
/// match the persisted JSON layout.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub focus_time_ms: u64,
    pub screen_time_ms: u64,
    pub tab_switch_count: u64,
    pub distraction_count: u64,
    pub distraction_time_ms: u64,
    pub focus_session_count: u64,
    /// Sum of quick/base switch penalties. Informational only, it never feeds
    /// `distraction_time_ms`.
    #[serde(default)]
    pub switch_penalty_ms: u64,
    pub last_update: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            focus_time_ms: 0,
            screen_time_ms: 0,
            tab_switch_count: 0,
            distraction_count: 0,
            distraction_time_ms: 0,
            focus_session_count: 0,
            switch_penalty_ms: 0,
            last_update: now,
        }
    }

    /// Estimated distraction time: foreground time that wasn't classified as focus. Capped at
    /// screen time, and never negative.
    pub fn estimate_distraction_ms(focus_time_ms: u64, screen_time_ms: u64) -> u64 {
        screen_time_ms.saturating_sub(focus_time_ms).min(screen_time_ms)
    }

    /// Combines counters of several days. Used for range statistics.
    pub fn merge(mut self, other: &UsageSnapshot) -> Self {
        self.focus_time_ms += other.focus_time_ms;
        self.screen_time_ms += other.screen_time_ms;
        self.tab_switch_count += other.tab_switch_count;
        self.distraction_count += other.distraction_count;
        self.distraction_time_ms += other.distraction_time_ms;
        self.focus_session_count += other.focus_session_count;
        self.switch_penalty_ms += other.switch_penalty_ms;
        self.last_update = self.last_update.max(other.last_update);
        self
    }
}

/// Flat, undated copy of today's counters for simple readers.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TodayMirror {
    pub today_focus_time: u64,
    pub today_screen_time: u64,
    pub today_tab_switches: u64,
    pub today_distractions: u64,
    pub today_focus_sessions: u64,
}

impl From<&UsageSnapshot> for TodayMirror {
    fn from(snapshot: &UsageSnapshot) -> Self {
        TodayMirror {
            today_focus_time: snapshot.focus_time_ms,
            today_screen_time: snapshot.screen_time_ms,
            today_tab_switches: snapshot.tab_switch_count,
            today_distractions: snapshot.distraction_count,
            today_focus_sessions: snapshot.focus_session_count,
        }
    }
}
