use crate::{stats::derive::UsageStats, utils::percentage::Percentage};

const HIGH_SWITCHING: u64 = 75;

/// End of day summary built from fixed rules, no network involved. `yesterday` is the focus
/// percentage of the previous day, when there was one.
pub fn rule_based_summary(today: &UsageStats, yesterday: Option<Percentage>) -> String {
    let focus = today.focus_percentage.value();
    let mut summary = if focus > 60 {
        format!("Great focus today! You stayed concentrated {focus}% of the time")
    } else if focus > 40 {
        format!("Decent focus session - {focus}% focused time")
    } else {
        format!("Challenging day with {focus}% focus time")
    };

    if let Some(yesterday) = yesterday {
        let improvement = i16::from(focus) - i16::from(yesterday.value());
        if improvement > 0 {
            summary += &format!(", {improvement}% higher than yesterday!");
        } else if improvement < 0 {
            summary += &format!(", {}% lower than yesterday.", improvement.abs());
        }
    }
    if !summary.ends_with(['!', '.']) {
        summary.push('.');
    }

    if today.tab_switch_count > HIGH_SWITCHING {
        summary += &format!(
            " High app switching detected ({} switches).",
            today.tab_switch_count
        );
    }

    if today.distraction_time_ms > today.focus_time_ms {
        summary += " Consider blocking social apps during peak work hours tomorrow?";
    } else {
        summary += " Keep up the great work!";
    }
    summary
}
