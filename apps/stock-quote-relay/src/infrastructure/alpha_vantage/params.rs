//! Intraday request parameters.

use std::fmt;
use std::str::FromStr;

/// Bar resolution for `TIME_SERIES_INTRADAY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarInterval {
    /// One-minute bars.
    #[default]
    OneMinute,
    /// Five-minute bars.
    FiveMinutes,
    /// Fifteen-minute bars.
    FifteenMinutes,
    /// Thirty-minute bars.
    ThirtyMinutes,
    /// Sixty-minute bars.
    SixtyMinutes,
}

impl BarInterval {
    /// Value of the `interval` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::ThirtyMinutes => "30min",
            Self::SixtyMinutes => "60min",
        }
    }

    /// Key of the time series section in the response body.
    #[must_use]
    pub fn series_key(&self) -> String {
        format!("Time Series ({})", self.as_str())
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1min" | "1" => Ok(Self::OneMinute),
            "5min" | "5" => Ok(Self::FiveMinutes),
            "15min" | "15" => Ok(Self::FifteenMinutes),
            "30min" | "30" => Ok(Self::ThirtyMinutes),
            "60min" | "60" => Ok(Self::SixtyMinutes),
            other => Err(format!(
                "unsupported bar interval {other:?} (expected 1min, 5min, 15min, 30min or 60min)"
            )),
        }
    }
}

/// How many bars the provider returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSize {
    /// The latest 100 bars.
    #[default]
    Compact,
    /// The full available history.
    Full,
}

impl OutputSize {
    /// Value of the `outputsize` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!(
                "unsupported output size {other:?} (expected compact or full)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("1min", BarInterval::OneMinute)]
    #[test_case("5MIN", BarInterval::FiveMinutes)]
    #[test_case(" 15min ", BarInterval::FifteenMinutes)]
    #[test_case("30", BarInterval::ThirtyMinutes)]
    #[test_case("60min", BarInterval::SixtyMinutes)]
    fn bar_interval_parsing(input: &str, expected: BarInterval) {
        assert_eq!(input.parse::<BarInterval>(), Ok(expected));
    }

    #[test]
    fn bar_interval_rejects_unknown() {
        assert!("2min".parse::<BarInterval>().is_err());
    }

    #[test]
    fn series_key_matches_interval() {
        assert_eq!(BarInterval::OneMinute.series_key(), "Time Series (1min)");
        assert_eq!(BarInterval::SixtyMinutes.series_key(), "Time Series (60min)");
    }

    #[test]
    fn output_size_parsing() {
        assert_eq!("Compact".parse::<OutputSize>(), Ok(OutputSize::Compact));
        assert_eq!("full".parse::<OutputSize>(), Ok(OutputSize::Full));
        assert!("tiny".parse::<OutputSize>().is_err());
        assert_eq!(OutputSize::default().as_str(), "compact");
    }
}
