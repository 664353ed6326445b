use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::{Parser, ValueEnum};
use tracing::debug;

use crate::{
    insights::{service::InsightService, summary::rule_based_summary},
    remote::entities::DateRange,
    utils::percentage::Percentage,
};

use super::{
    stats::{parse_day, DateStyle},
    CliContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsightKind {
    /// Assessment of the day with recommendations.
    Analysis,
    /// A short summary, possibly ending with a suggestion.
    Summary,
    /// Summary built from fixed rules, works offline.
    Rules,
    Tip,
    Break,
}

#[derive(Debug, Parser)]
pub struct InsightCommand {
    #[arg(value_enum, default_value_t = InsightKind::Summary)]
    kind: InsightKind,
    #[arg(long, help = "Day to describe. Defaults to today")]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk)]
    date_style: DateStyle,
    #[arg(long, help = "Only use local snapshots even if a remote service is configured")]
    local: bool,
}

pub async fn process_insight_command(
    context: &CliContext,
    InsightCommand {
        kind,
        date,
        date_style,
        local,
    }: InsightCommand,
) -> Result<()> {
    let now = Utc::now();
    let day = match date {
        Some(v) => parse_day(&v, date_style, "insight", now)?,
        None => now.date_naive(),
    };
    let seed = day.ordinal() as usize;
    let service = InsightService::from_settings(&context.settings.insights);
    debug!("Insight {kind:?} for {day}, generated: {}", service.is_configured());

    match kind {
        InsightKind::Tip => println!("{}", service.focus_tip(seed).await),
        InsightKind::Break => println!("{}", service.break_activity(seed).await),
        InsightKind::Analysis => {
            let stats = context.stats_source(!local)?.collect(DateRange::day(day), now).await;
            println!("{}", service.analyze_usage(&stats).await)
        }
        InsightKind::Summary => {
            let stats = context.stats_source(!local)?.collect(DateRange::day(day), now).await;
            let summary = service.daily_summary(&stats, seed).await;
            println!("{}", summary.summary);
            if let Some(suggestion) = summary.suggestion {
                println!("Suggestion: {suggestion}");
            }
        }
        InsightKind::Rules => {
            let source = context.stats_source(!local)?;
            let stats = source.collect(DateRange::day(day), now).await;
            let yesterday = match day.pred_opt() {
                Some(previous) => {
                    let snapshot = source.load_local(DateRange::day(previous), now).await;
                    (snapshot.screen_time_ms > 0)
                        .then(|| Percentage::of(snapshot.focus_time_ms, snapshot.screen_time_ms))
                }
                None => None,
            };
            println!("{}", rule_based_summary(&stats, yesterday));
        }
    }
    Ok(())
}
