use std::fmt;
use std::str::FromStr;

use crate::types::{SignalFloat, SimTime};

/// A time unit token that isn't one of the supported units.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown time unit `{0}`")]
pub struct UnknownUnit(pub String);

/// The time units a simulator may print in front of a trace record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Femtoseconds,
    Picoseconds,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 8] = [
        TimeUnit::Femtoseconds,
        TimeUnit::Picoseconds,
        TimeUnit::Nanoseconds,
        TimeUnit::Microseconds,
        TimeUnit::Milliseconds,
        TimeUnit::Seconds,
        TimeUnit::Minutes,
        TimeUnit::Hours,
    ];

    /// The length of one of this unit in seconds.
    pub const fn seconds(self) -> SignalFloat {
        match self {
            TimeUnit::Femtoseconds => 1e-15,
            TimeUnit::Picoseconds => 1e-12,
            TimeUnit::Nanoseconds => 1e-9,
            TimeUnit::Microseconds => 1e-6,
            TimeUnit::Milliseconds => 1e-3,
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
        }
    }

    /// The length of one of this unit in femtoseconds.
    pub const fn femtoseconds(self) -> SimTime {
        match self {
            TimeUnit::Femtoseconds => 1,
            TimeUnit::Picoseconds => 1_000,
            TimeUnit::Nanoseconds => 1_000_000,
            TimeUnit::Microseconds => 1_000_000_000,
            TimeUnit::Milliseconds => 1_000_000_000_000,
            TimeUnit::Seconds => 1_000_000_000_000_000,
            TimeUnit::Minutes => 60_000_000_000_000_000,
            TimeUnit::Hours => 3_600_000_000_000_000_000,
        }
    }

    /// The token used for this unit when writing a trace.
    pub const fn symbol(self) -> &'static str {
        match self {
            TimeUnit::Femtoseconds => "fs",
            TimeUnit::Picoseconds => "ps",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "hr",
        }
    }

    /// Convert a value in this unit to the given unit.
    pub fn convert(self, value: SignalFloat, to: TimeUnit) -> SignalFloat {
        self.seconds() / to.seconds() * value
    }
}

impl FromStr for TimeUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs" => Ok(TimeUnit::Femtoseconds),
            "ps" => Ok(TimeUnit::Picoseconds),
            "ns" => Ok(TimeUnit::Nanoseconds),
            "us" => Ok(TimeUnit::Microseconds),
            "ms" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" => Ok(TimeUnit::Seconds),
            "min" => Ok(TimeUnit::Minutes),
            "hr" => Ok(TimeUnit::Hours),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert a value between two named time units, e.g. `convert(50.0, "ns", "sec")`.
pub fn convert(
    value: SignalFloat,
    unit_from: &str,
    unit_to: &str,
) -> Result<SignalFloat, UnknownUnit> {
    let from: TimeUnit = unit_from.parse()?;
    let to: TimeUnit = unit_to.parse()?;
    Ok(from.convert(value, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_close(a: SignalFloat, b: SignalFloat) {
        let scale = a.abs().max(b.abs()).max(SignalFloat::MIN_POSITIVE);
        assert!((a - b).abs() / scale < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_seconds_to_seconds() {
        assert_eq!(convert(5.0, "sec", "sec"), Ok(5.0));
        assert_eq!(convert(5.0, "s", "sec"), Ok(5.0));
    }

    #[test]
    fn test_nanoseconds_to_seconds() {
        for i in (0..100).step_by(10) {
            let converted = convert(i as SignalFloat, "ns", "sec").unwrap();
            assert_close(converted, i as SignalFloat * 1e-9);
        }
    }

    #[rstest]
    #[case("fs")]
    #[case("ps")]
    #[case("ns")]
    #[case("us")]
    #[case("ms")]
    #[case("s")]
    #[case("sec")]
    #[case("min")]
    #[case("hr")]
    fn test_conversion_is_self_inverse(#[case] unit: &str) {
        for other in TimeUnit::ALL {
            for value in [0.0, 1.0, 37.5, 123456789.0] {
                let there = convert(value, unit, other.symbol()).unwrap();
                let back = convert(there, other.symbol(), unit).unwrap();
                if value == 0.0 {
                    assert_eq!(back, 0.0);
                } else {
                    assert_close(back, value);
                }
            }
        }
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(convert(1.0, "ks", "sec"), Err(UnknownUnit("ks".to_string())));
        assert_eq!(convert(1.0, "ns", "NS"), Err(UnknownUnit("NS".to_string())));
    }

    #[test]
    fn test_femtoseconds_agree_with_seconds() {
        for unit in TimeUnit::ALL {
            let femtoseconds = unit.convert(1.0, TimeUnit::Femtoseconds);
            assert_close(unit.femtoseconds() as SignalFloat, femtoseconds);
        }
    }

    #[test]
    fn test_symbols_round_trip() {
        for unit in TimeUnit::ALL {
            assert_eq!(unit.symbol().parse::<TimeUnit>(), Ok(unit));
            assert_eq!(unit.to_string(), unit.symbol());
        }
    }
}
