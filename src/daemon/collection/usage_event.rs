use chrono::{DateTime, Utc};

/// Events produced by the collector and applied to the accumulator in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageEvent {
    /// One more second in the foreground. `context` is the active domain if the source knows it.
    ForegroundTick {
        at: DateTime<Utc>,
        context: Option<String>,
    },
    VisibilityLost(DateTime<Utc>),
    VisibilityRestored(DateTime<Utc>),
}

impl UsageEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            UsageEvent::ForegroundTick { at, .. } => *at,
            UsageEvent::VisibilityLost(at) | UsageEvent::VisibilityRestored(at) => *at,
        }
    }

    pub fn is_visibility_change(&self) -> bool {
        !matches!(self, UsageEvent::ForegroundTick { .. })
    }
}
