use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use crate::utils::time::format_duration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("'{0}' is not a duration, expected something like 25, 25m or 90s")]
    Invalid(String),
    #[error("durations have to be positive")]
    NotPositive,
    #[error("durations can't be longer than {} hours", MAX_PHASE_SECONDS / 3600)]
    TooLong,
    #[error("unknown preset '{0}', expected test, 25/5, 50/10 or <focus>/<break>")]
    UnknownPreset(String),
}

pub const MAX_PHASE_SECONDS: u64 = 24 * 60 * 60;

/// Lengths of the two phases of a Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDurations {
    pub focus_seconds: u64,
    pub break_seconds: u64,
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self {
            focus_seconds: 25 * 60,
            break_seconds: 5 * 60,
        }
    }
}

impl TimerDurations {
    pub const TEST: TimerDurations = TimerDurations {
        focus_seconds: 5,
        break_seconds: 3,
    };
    pub const SHORT: TimerDurations = TimerDurations {
        focus_seconds: 25 * 60,
        break_seconds: 5 * 60,
    };
    pub const LONG: TimerDurations = TimerDurations {
        focus_seconds: 50 * 60,
        break_seconds: 10 * 60,
    };

    pub fn new(focus_seconds: u64, break_seconds: u64) -> Result<Self, DurationError> {
        if focus_seconds == 0 || break_seconds == 0 {
            return Err(DurationError::NotPositive);
        }
        if focus_seconds > MAX_PHASE_SECONDS || break_seconds > MAX_PHASE_SECONDS {
            return Err(DurationError::TooLong);
        }
        Ok(Self {
            focus_seconds,
            break_seconds,
        })
    }

    pub fn cycle_seconds(&self) -> u64 {
        self.focus_seconds.saturating_add(self.break_seconds)
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name.trim() {
            "test" | "test/test" => Some(Self::TEST),
            "25/5" => Some(Self::SHORT),
            "50/10" => Some(Self::LONG),
            _ => None,
        }
    }

    /// Plain numbers are minutes. `m` and `s` suffixes pick the unit explicitly.
    pub fn parse_seconds(input: &str) -> Result<u64, DurationError> {
        let input = input.trim();
        let invalid = || DurationError::Invalid(input.to_owned());
        let (number, multiplier) = if let Some(v) = input.strip_suffix('s') {
            (v, 1)
        } else if let Some(v) = input.strip_suffix('m') {
            (v, 60)
        } else {
            (input, 60)
        };
        let value = number.trim().parse::<i64>().map_err(|_| invalid())?;
        if value <= 0 {
            return Err(DurationError::NotPositive);
        }
        let seconds = (value as u64).checked_mul(multiplier).ok_or_else(invalid)?;
        if seconds > MAX_PHASE_SECONDS {
            return Err(DurationError::TooLong);
        }
        Ok(seconds)
    }

    pub fn parse(focus: &str, break_: &str) -> Result<Self, DurationError> {
        Self::new(Self::parse_seconds(focus)?, Self::parse_seconds(break_)?)
    }

    /// Applies user input on top of the current durations. Each half that doesn't parse keeps its
    /// previous value.
    pub fn updated(self, focus: &str, break_: &str) -> Self {
        Self {
            focus_seconds: Self::parse_seconds(focus).unwrap_or(self.focus_seconds),
            break_seconds: Self::parse_seconds(break_).unwrap_or(self.break_seconds),
        }
    }
}

impl FromStr for TimerDurations {
    type Err = DurationError;

    /// Either a preset name or `<focus>/<break>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = Self::preset(s) {
            return Ok(preset);
        }
        let (focus, break_) = s
            .split_once('/')
            .ok_or_else(|| DurationError::UnknownPreset(s.to_owned()))?;
        Self::parse(focus, break_)
    }
}

impl Display for TimerDurations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} focus / {} break",
            format_duration(phase_length(self.focus_seconds)),
            format_duration(phase_length(self.break_seconds)),
        )
    }
}

fn phase_length(seconds: u64) -> chrono::Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::{DurationError, TimerDurations, MAX_PHASE_SECONDS};

    #[test]
    fn test_parse_units() {
        assert_eq!(TimerDurations::parse_seconds("25"), Ok(1500));
        assert_eq!(TimerDurations::parse_seconds("25m"), Ok(1500));
        assert_eq!(TimerDurations::parse_seconds(" 90s "), Ok(90));
        assert_eq!(
            TimerDurations::parse_seconds("abc"),
            Err(DurationError::Invalid("abc".into()))
        );
        assert_eq!(TimerDurations::parse_seconds("0"), Err(DurationError::NotPositive));
        assert_eq!(TimerDurations::parse_seconds("-5m"), Err(DurationError::NotPositive));
    }

    #[test]
    fn test_invalid_input_keeps_last_valid_value() {
        let current = TimerDurations::LONG;
        let updated = current.updated("oops", "90s");
        assert_eq!(updated.focus_seconds, 50 * 60);
        assert_eq!(updated.break_seconds, 90);

        assert_eq!(TimerDurations::default().updated("", "-1"), TimerDurations::default());
    }

    #[test]
    fn test_presets_and_custom() {
        assert_eq!("test".parse(), Ok(TimerDurations::TEST));
        assert_eq!("50/10".parse(), Ok(TimerDurations::LONG));
        assert_eq!(
            "45m/90s".parse(),
            Ok(TimerDurations {
                focus_seconds: 45 * 60,
                break_seconds: 90
            })
        );
        assert!("forever".parse::<TimerDurations>().is_err());
        assert_eq!(
            "0/5".parse::<TimerDurations>(),
            Err(DurationError::NotPositive)
        );
    }

    #[test]
    fn test_huge_durations_are_rejected() {
        assert_eq!(
            "10000000000000000s/1s".parse::<TimerDurations>(),
            Err(DurationError::TooLong)
        );
        assert_eq!(
            TimerDurations::parse_seconds("1441m"),
            Err(DurationError::TooLong)
        );
        assert_eq!(
            TimerDurations::parse_seconds("1440m"),
            Ok(MAX_PHASE_SECONDS)
        );
        assert_eq!(TimerDurations::new(1, u64::MAX), Err(DurationError::TooLong));
        assert_eq!(
            TimerDurations::LONG.updated("9000000000000000000s", "1s"),
            TimerDurations {
                focus_seconds: 50 * 60,
                break_seconds: 1
            }
        );

        // Hand built values still print and add up without panicking.
        let huge = TimerDurations {
            focus_seconds: u64::MAX,
            break_seconds: u64::MAX,
        };
        assert!(!huge.to_string().is_empty());
        assert_eq!(huge.cycle_seconds(), u64::MAX);
    }
}
