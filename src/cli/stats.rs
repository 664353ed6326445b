use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    remote::entities::DateRange,
    stats::derive::{SourceStatus, StatsOrigin, UsageStats},
    utils::time::format_duration,
};

use super::{Args, CliContext};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[arg(
        long = "start",
        short,
        help = "First day of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, help = "Only use local snapshots even if a remote service is configured")]
    local: bool,
    #[arg(long, help = "Print stats as JSON")]
    json: bool,
}

/// Parses a date expression into the calendar day it names. Relative expressions are resolved
/// against `now` in UTC, the same clock snapshots are keyed by.
pub fn parse_day(
    value: &str,
    style: DateStyle,
    name: &str,
    now: DateTime<Utc>,
) -> Result<NaiveDate> {
    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
    }
}

/// Missing ends default to today. A single given end makes a single day range.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    style: DateStyle,
    now: DateTime<Utc>,
) -> Result<DateRange> {
    let today = now.date_naive();
    let start = start_date
        .map(|v| parse_day(&v, style, "start", now))
        .transpose()?;
    let end = end_date
        .map(|v| parse_day(&v, style, "end", now))
        .transpose()?;
    let range = match (start, end) {
        (Some(start), Some(end)) => DateRange { start, end },
        (Some(day), None) => DateRange {
            start: day,
            end: today.max(day),
        },
        (None, Some(day)) => DateRange::day(day),
        (None, None) => DateRange::day(today),
    };
    if range.start > range.end {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Start {} is after end {}", range.start, range.end),
            )
            .into());
    }
    Ok(range)
}

pub async fn process_stats_command(
    context: &CliContext,
    StatsCommand {
        start_date,
        end_date,
        date_style,
        local,
        json,
    }: StatsCommand,
) -> Result<()> {
    let now = Utc::now();
    let range = parse_range(start_date, end_date, date_style, now)?;
    let stats = context.stats_source(!local)?.collect(range, now).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_stats(range, &stats));
    }
    Ok(())
}

fn ms(value: u64) -> String {
    format_duration(chrono::Duration::milliseconds(value as i64))
}

pub fn render_stats(range: DateRange, stats: &UsageStats) -> String {
    let period = if range.start == range.end {
        range.start.to_string()
    } else {
        format!("{} - {}", range.start, range.end)
    };
    let source = match (&stats.origin, &stats.status) {
        (StatsOrigin::Remote, _) => "remote".to_owned(),
        (StatsOrigin::Local, SourceStatus::RemoteUnavailable(reason)) => {
            format!("local, remote unavailable: {reason}")
        }
        (StatsOrigin::Local, _) => "local".to_owned(),
    };
    let mut output = format!(
        "{period} ({source})\n\
         Focus\t\t{}\t{}\n\
         Distraction\t{}\t{}\n\
         Screen time\t\t{}\n\
         Tab switches\t{}\n\
         Distractions\t{}\n\
         Focus sessions\t{}\n",
        stats.focus_percentage,
        ms(stats.focus_time_ms),
        stats.distraction_percentage,
        ms(stats.distraction_time_ms),
        ms(stats.screen_time_ms),
        stats.tab_switch_count,
        stats.distraction_count,
        stats.focus_session_count,
    );
    if stats.is_distracted() {
        output += "Lots of switching with little focus. Try a focus session?\n";
    }
    output
}
