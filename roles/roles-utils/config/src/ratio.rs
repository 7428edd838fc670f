//! Exact reserve ratios.
//!
//! Ratios are kept as reduced `numerator / denominator` pairs and are only
//! ever built from decimal text, so a configured `0.34` is exactly
//! `17/50` and never the nearest binary float.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Longest fractional part accepted when parsing decimal ratios.
const MAX_FRACTION_DIGITS: usize = 18;

/// A fraction in `(0, 1]` of the custodial balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReserveRatio {
    numerator: u64,
    denominator: u64,
}

impl ReserveRatio {
    /// The whole balance.
    pub const ONE: ReserveRatio = ReserveRatio {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: u64, denominator: u64) -> Result<Self, ConfigError> {
        Self::from_wide(u128::from(numerator), u128::from(denominator))
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// `floor(value * self)`. Never exceeds `value`.
    pub fn apply_floor(&self, value: u64) -> u64 {
        let scaled = u128::from(value) * u128::from(self.numerator) / u128::from(self.denominator);
        // numerator <= denominator, so the quotient fits back into u64
        scaled as u64
    }

    /// Exact sum of `ratios` as a reduced `(numerator, denominator)` pair,
    /// without the `(0, 1]` bound. `None` on overflow.
    pub fn checked_sum(ratios: impl IntoIterator<Item = ReserveRatio>) -> Option<(u128, u128)> {
        let mut acc: (u128, u128) = (0, 1);
        for ratio in ratios {
            let (n, d) = (u128::from(ratio.numerator), u128::from(ratio.denominator));
            let lcm = acc.1.checked_mul(d / gcd(acc.1, d))?;
            let lhs = acc.0.checked_mul(lcm / acc.1)?;
            let rhs = n.checked_mul(lcm / d)?;
            let sum = lhs.checked_add(rhs)?;
            let g = gcd(sum, lcm).max(1);
            acc = (sum / g, lcm / g);
        }
        Some(acc)
    }

    fn from_wide(numerator: u128, denominator: u128) -> Result<Self, ConfigError> {
        if denominator == 0 || numerator == 0 || numerator > denominator {
            return Err(ConfigError::RatioOutOfRange(format!("{}/{}", numerator, denominator)));
        }
        let g = gcd(numerator, denominator);
        let (numerator, denominator) = (numerator / g, denominator / g);
        match (u64::try_from(numerator), u64::try_from(denominator)) {
            (Ok(numerator), Ok(denominator)) => Ok(Self {
                numerator,
                denominator,
            }),
            _ => Err(ConfigError::InvalidRatio(format!(
                "{}/{} does not reduce to 64-bit terms",
                numerator, denominator
            ))),
        }
    }
}

impl FromStr for ReserveRatio {
    type Err = ConfigError;

    /// Accepts `34%`, `33.5%`, `0.34` or `17/50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some((n, d)) = text.split_once('/') {
            let numerator = parse_digits(n.trim(), text)?;
            let denominator = parse_digits(d.trim(), text)?;
            return Self::from_wide(numerator, denominator);
        }

        let (digits, percent) = match text.strip_suffix('%') {
            Some(rest) => (rest.trim_end(), true),
            None => (text, false),
        };
        let (numerator, mut denominator) = parse_decimal(digits, text)?;
        if percent {
            denominator = denominator
                .checked_mul(100)
                .ok_or_else(|| ConfigError::InvalidRatio(text.to_string()))?;
        }
        Self::from_wide(numerator, denominator)
    }
}

impl TryFrom<String> for ReserveRatio {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReserveRatio> for String {
    fn from(value: ReserveRatio) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ReserveRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if 100 % self.denominator == 0 {
            write!(f, "{}%", self.numerator * (100 / self.denominator))
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

fn parse_digits(digits: &str, whole: &str) -> Result<u128, ConfigError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidRatio(whole.to_string()));
    }
    digits
        .parse::<u128>()
        .map_err(|_| ConfigError::InvalidRatio(whole.to_string()))
}

fn parse_decimal(digits: &str, whole: &str) -> Result<(u128, u128), ConfigError> {
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if frac_part.len() > MAX_FRACTION_DIGITS {
        return Err(ConfigError::InvalidRatio(whole.to_string()));
    }
    let int_value = if int_part.is_empty() && !frac_part.is_empty() {
        0
    } else {
        parse_digits(int_part, whole)?
    };
    let frac_value = if frac_part.is_empty() {
        0
    } else {
        parse_digits(frac_part, whole)?
    };
    let denominator = 10u128.pow(frac_part.len() as u32);
    let numerator = int_value
        .checked_mul(denominator)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| ConfigError::InvalidRatio(whole.to_string()))?;
    Ok((numerator, denominator))
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_percent_decimal_and_fraction_to_the_same_value() {
        let percent: ReserveRatio = "34%".parse().unwrap();
        let decimal: ReserveRatio = "0.34".parse().unwrap();
        let fraction: ReserveRatio = "17/50".parse().unwrap();
        assert_eq!(percent, decimal);
        assert_eq!(decimal, fraction);
        assert_eq!(percent.numerator(), 17);
        assert_eq!(percent.denominator(), 50);
    }

    #[test]
    fn parses_fractional_percent() {
        let ratio: ReserveRatio = "33.5%".parse().unwrap();
        assert_eq!((ratio.numerator(), ratio.denominator()), (67, 200));
        assert_eq!(ratio.to_string(), "67/200");
    }

    #[test]
    fn whole_balance_is_allowed() {
        assert_eq!("100%".parse::<ReserveRatio>().unwrap(), ReserveRatio::ONE);
        assert_eq!("1".parse::<ReserveRatio>().unwrap(), ReserveRatio::ONE);
        assert_eq!(ReserveRatio::ONE.to_string(), "100%");
    }

    #[test]
    fn rejects_ratios_outside_unit_interval() {
        for text in ["0", "0%", "0.0", "101%", "1.01", "3/2", "0/5"] {
            assert!(
                matches!(text.parse::<ReserveRatio>(), Err(ConfigError::RatioOutOfRange(_))),
                "{} should be out of range",
                text
            );
        }
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "%", "abc", "-0.3", "0.3.4", "1/0x", "1e-2", "/4"] {
            assert!(text.parse::<ReserveRatio>().is_err(), "{} should not parse", text);
        }
    }

    #[test]
    fn apply_floor_rounds_down() {
        let ratio: ReserveRatio = "34%".parse().unwrap();
        assert_eq!(ratio.apply_floor(100_000_000), 34_000_000);
        assert_eq!(ratio.apply_floor(1), 0);
        assert_eq!(ratio.apply_floor(3), 1);
        assert_eq!(ratio.apply_floor(u64::MAX), (u128::from(u64::MAX) * 17 / 50) as u64);
    }

    #[test]
    fn checked_sum_adds_exactly() {
        let ratios = ["33%", "33%", "34%"].map(|r| r.parse::<ReserveRatio>().unwrap());
        assert_eq!(ReserveRatio::checked_sum(ratios), Some((1, 1)));

        let thirds = ["1/3", "1/3", "1/3"].map(|r| r.parse::<ReserveRatio>().unwrap());
        assert_eq!(ReserveRatio::checked_sum(thirds), Some((1, 1)));

        assert_eq!(ReserveRatio::checked_sum([]), Some((0, 1)));
    }

    proptest! {
        #[test]
        fn apply_floor_never_exceeds_input(
            value in any::<u64>(),
            denominator in 1u64..=1_000_000_000_000,
            seed in any::<u64>(),
        ) {
            let numerator = seed % denominator + 1;
            let ratio = ReserveRatio::new(numerator, denominator).unwrap();
            prop_assert!(ratio.apply_floor(value) <= value);
        }
    }
}
