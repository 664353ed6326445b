use std::sync::Arc;

use serde::Serialize;
use tracing::{error, warn};

use crate::{stats::derive::UsageStats, utils::config::InsightSettings};

use super::{
    fallback::{self, UNCONFIGURED_BREAK_ACTIVITY, UNCONFIGURED_FOCUS_TIP},
    gemini::GeminiClient,
    InsightError, InsightProvider,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub summary: String,
    pub suggestion: Option<String>,
}

/// Feedback texts for a day of usage. Every method returns something printable, failures only
/// show up in the logs.
pub struct InsightService {
    provider: Option<Arc<dyn InsightProvider>>,
}

fn minutes(ms: u64) -> u64 {
    ms / 60_000
}

fn usage_payload(stats: &UsageStats) -> String {
    format!(
        "- Total screen time: {} minutes\n- Focus time: {} minutes\n- Focus percentage: {}\n- App/tab switches: {}\n- Distraction time: {} minutes\n- Focus sessions completed: {}\n- Total distractions: {}",
        minutes(stats.screen_time_ms),
        minutes(stats.focus_time_ms),
        stats.focus_percentage,
        stats.tab_switch_count,
        minutes(stats.distraction_time_ms),
        stats.focus_session_count,
        stats.distraction_count,
    )
}

/// Text after a trailing "Want to ... ?" question on the last line.
pub fn extract_suggestion(text: &str) -> Option<String> {
    let question = text.trim_end().lines().last()?.strip_suffix('?')?;
    let start = question.find("Want to ")?;
    let suggestion = &question[start + "Want to ".len()..];
    (!suggestion.is_empty()).then(|| suggestion.to_owned())
}

impl InsightService {
    pub fn new(provider: Option<Arc<dyn InsightProvider>>) -> Self {
        Self { provider }
    }

    /// Uses Gemini when a key is configured.
    pub fn from_settings(settings: &InsightSettings) -> Self {
        match GeminiClient::new(settings) {
            Ok(client) => Self::new(Some(Arc::new(client))),
            Err(InsightError::NotConfigured) => Self::new(None),
            Err(e) => {
                error!("Couldn't create insight client {e}");
                Self::new(None)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        let provider = self.provider.as_ref().ok_or(InsightError::NotConfigured)?;
        provider
            .generate(prompt)
            .await
            .inspect_err(|e| warn!("Insight request failed {e}"))
    }

    pub async fn analyze_usage(&self, stats: &UsageStats) -> String {
        let prompt = format!(
            "Analyze the following digital usage and give a short assessment of focus quality, 2-3 actionable recommendations and one positive aspect.\n\nDaily statistics:\n{}",
            usage_payload(stats)
        );
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => e.fallback_message().to_owned(),
        }
    }

    /// `seed` picks among the canned summaries when the request fails.
    pub async fn daily_summary(&self, stats: &UsageStats, seed: usize) -> DailySummary {
        let focus = stats.focus_percentage.value();
        if !self.is_configured() {
            let many_distractions = stats.distraction_count > 5;
            return DailySummary {
                summary: format!(
                    "You stayed focused {focus}% of the time today. {}",
                    if many_distractions {
                        "Consider using app blocking during focus sessions."
                    } else {
                        "Good job maintaining focus!"
                    }
                ),
                suggestion: many_distractions
                    .then(|| "Block distracting apps during focus sessions".to_owned()),
            };
        }

        let prompt = format!(
            "Write a 2-3 sentence daily summary in second person. If focus was below 60%, end with a question starting with \"Want to\".\n\nUsage data:\n{}",
            usage_payload(stats)
        );
        match self.generate(&prompt).await {
            Ok(text) => DailySummary {
                suggestion: extract_suggestion(&text),
                summary: text,
            },
            Err(_) => DailySummary {
                summary: fallback_summary(stats, seed),
                suggestion: (focus < 60)
                    .then(|| "block distracting apps during focus sessions".to_owned()),
            },
        }
    }

    pub async fn focus_tip(&self, seed: usize) -> String {
        if !self.is_configured() {
            return UNCONFIGURED_FOCUS_TIP.to_owned();
        }
        self.generate("Give a single practical focus tip under 50 words, formatted as a tip.")
            .await
            .unwrap_or_else(|_| fallback::focus_tip(seed).to_owned())
    }

    pub async fn break_activity(&self, seed: usize) -> String {
        if !self.is_configured() {
            return UNCONFIGURED_BREAK_ACTIVITY.to_owned();
        }
        self.generate("Suggest one refreshing 5 minute break activity in a single sentence.")
            .await
            .unwrap_or_else(|_| fallback::break_activity(seed).to_owned())
    }
}

fn fallback_summary(stats: &UsageStats, seed: usize) -> String {
    let focus = stats.focus_percentage.value();
    let focus_minutes = minutes(stats.focus_time_ms);
    let low = focus < 60;
    match seed % 3 {
        0 => format!(
            "You maintained focus for {focus_minutes} minutes today ({focus}% of screen time). {}",
            if low {
                "Consider using app blocking during your next focus session."
            } else {
                "Great consistency with your focus goals!"
            }
        ),
        1 => format!(
            "Focus time reached {focus_minutes} minutes with {} app switches. {}",
            stats.tab_switch_count,
            if low {
                "Try the Pomodoro technique tomorrow for better focus."
            } else {
                "Keep up the excellent focus discipline!"
            }
        ),
        _ => format!(
            "You stayed focused {focus}% of the time during {} minutes of screen time. {} {}",
            minutes(stats.screen_time_ms),
            if stats.distraction_count > 10 {
                "Multiple distractions broke your flow."
            } else {
                "You handled distractions well."
            },
            if low {
                "Consider turning off notifications during deep work."
            } else {
                "Your focus consistency is improving!"
            }
        ),
    }
}
