/// Rational time bases and timestamp rescaling
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rational unit in which timestamps are expressed (`num / den` seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    /// Numerator
    pub num: u32,
    /// Denominator
    pub den: u32,
}

impl TimeBase {
    /// Create a time base; a zero denominator is treated as 1
    pub const fn new(num: u32, den: u32) -> Self {
        Self {
            num,
            den: if den == 0 { 1 } else { den },
        }
    }

    /// One tick per sample at `sample_rate`
    pub const fn for_sample_rate(sample_rate: u32) -> Self {
        Self::new(1, sample_rate)
    }

    /// Rescale `ts` from this time base into `to`, rounding half away from zero
    pub fn rescale(self, ts: i64, to: TimeBase) -> i64 {
        if self == to {
            return ts;
        }
        let numer = i128::from(ts) * i128::from(self.num) * i128::from(to.den);
        let denom = i128::from(self.den) * i128::from(to.num.max(1));
        let half = denom / 2;
        let rounded = if numer >= 0 {
            (numer + half) / denom
        } else {
            (numer - half) / denom
        };
        i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
    }

    /// Duration of `ts` ticks in seconds
    pub fn seconds(self, ts: i64) -> f64 {
        ts as f64 * f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identity_rescale() {
        let tb = TimeBase::for_sample_rate(44_100);
        assert_eq!(tb.rescale(12345, tb), 12345);
    }

    #[test]
    fn sample_rate_to_millis() {
        let samples = TimeBase::for_sample_rate(48_000);
        let millis = TimeBase::new(1, 1000);
        assert_eq!(samples.rescale(48_000, millis), 1000);
        assert_eq!(samples.rescale(24, millis), 1); // 0.5ms rounds away from zero
        assert_eq!(samples.rescale(-24, millis), -1);
    }

    #[test]
    fn rate_change_rescale() {
        let from = TimeBase::for_sample_rate(44_100);
        let to = TimeBase::for_sample_rate(48_000);
        assert_eq!(from.rescale(44_100, to), 48_000);
        assert_eq!(from.rescale(1152, to), 1254); // 1253.877...
    }

    #[test]
    fn zero_denominator_is_clamped() {
        assert_eq!(TimeBase::new(1, 0).den, 1);
    }

    proptest! {
        #[test]
        fn rescale_is_monotonic(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
            let from = TimeBase::for_sample_rate(44_100);
            let to = TimeBase::for_sample_rate(48_000);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(from.rescale(lo, to) <= from.rescale(hi, to));
        }
    }
}
