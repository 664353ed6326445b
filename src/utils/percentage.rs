use std::{fmt::Display, ops::Deref};

use serde::Serialize;

/// Whole-number percentage, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Percentage(u8);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    /// `round(part / whole * 100)`. A zero `whole` yields 0 rather than dividing by zero.
    pub fn of(part: u64, whole: u64) -> Percentage {
        if whole == 0 {
            return Percentage(0);
        }
        let value = (part as f64 / whole as f64 * 100.).round();
        Percentage(value.clamp(0., 100.) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Deref for Percentage {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::Percentage;

    #[test]
    fn test_percentage_rounds_and_clamps() {
        assert_eq!(Percentage::of(1_500_000, 7_000_000).value(), 21);
        assert_eq!(Percentage::of(1, 3).value(), 33);
        assert_eq!(Percentage::of(2, 3).value(), 67);
        assert_eq!(Percentage::of(10, 5).value(), 100);
        assert_eq!(Percentage::of(0, 0).value(), 0);
        assert_eq!(Percentage::of(5, 0).value(), 0);
        assert_eq!(Percentage::of(1, 4).to_string(), "25%");
    }
}
