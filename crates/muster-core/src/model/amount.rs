//! Exact decimal currency amounts.
//!
//! An amount is an integer mantissa with its own decimal scale, so every
//! digit the remote store held survives decoding and sums over any number of
//! penalties are exact. The store keeps amounts as JSON numbers; decoding
//! accepts integers, floats and numeric strings.

use serde::de::{self, Visitor};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Most fractional digits an amount can carry.
pub const MAX_SCALE: u8 = 18;

/// A signed decimal value, `units * 10^-scale`.
///
/// Values are kept with trailing fractional zeros stripped, so `1.50` and
/// `1.5` are the same value and compare and hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Amount {
    units: i128,
    scale: u8,
}

/// Error returned when text cannot be read as an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{input}': {reason}")]
pub struct ParseAmountError {
    pub input: String,
    pub reason: &'static str,
}

#[allow(clippy::cast_lossless)]
const fn pow10(exp: u8) -> i128 {
    10_i128.pow(exp as u32)
}

impl Amount {
    pub const ZERO: Self = Self { units: 0, scale: 0 };

    const fn normalized(mut units: i128, mut scale: u8) -> Self {
        while scale > 0 && units % 10 == 0 {
            units /= 10;
            scale -= 1;
        }
        Self { units, scale }
    }

    /// Build an amount from hundredths (`12_345` is `123.45`).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self::normalized(i128::from(minor), 2)
    }

    /// Build an amount from whole currency units.
    #[must_use]
    pub fn from_major(major: i64) -> Self {
        Self {
            units: i128::from(major),
            scale: 0,
        }
    }

    /// Number of fractional digits needed to write this amount exactly.
    #[must_use]
    pub const fn scale(self) -> u8 {
        self.scale
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.units == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.units < 0
    }

    /// Mantissa of `self` written at `scale`, which must not be below `self.scale`.
    const fn units_at(self, scale: u8) -> i128 {
        self.units.saturating_mul(pow10(scale - self.scale))
    }

    const fn aligned(self, other: Self) -> (i128, i128, u8) {
        let scale = if self.scale > other.scale {
            self.scale
        } else {
            other.scale
        };
        (self.units_at(scale), other.units_at(scale), scale)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Self::normalized(lhs.saturating_add(rhs), scale)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Self::normalized(lhs.saturating_sub(rhs), scale)
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = self.aligned(*other);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Always at least two fractional digits; more when the value needs them.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let scale = self.scale.max(2);
        let digits = self.units_at(scale).unsigned_abs();
        let divisor = pow10(scale).unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            digits / divisor,
            digits % divisor,
            width = usize::from(scale)
        )
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses plain decimal text, keeping every fractional digit given.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseAmountError {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if digits.is_empty() {
            return Err(fail("empty"));
        }
        if digits.contains(['e', 'E']) {
            return Err(fail("exponent notation is not supported"));
        }

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(fail("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(fail("not a decimal number"));
        }

        let frac = frac.trim_end_matches('0');
        let scale = u8::try_from(frac.len())
            .ok()
            .filter(|scale| *scale <= MAX_SCALE)
            .ok_or_else(|| fail("too many decimal places"))?;

        let whole_units: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| fail("out of range"))?
        };
        let frac_units: i128 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| fail("out of range"))?
        };

        let units = whole_units
            .checked_mul(pow10(scale))
            .and_then(|v| v.checked_add(frac_units))
            .ok_or_else(|| fail("out of range"))?;

        Ok(Self::normalized(if negative { -units } else { units }, scale))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.scale, i64::try_from(self.units)) {
            (0, Ok(whole)) => serializer.serialize_i64(whole),
            _ => {
                let value: f64 = self.to_string().parse().map_err(S::Error::custom)?;
                serializer.serialize_f64(value)
            }
        }
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::from_major(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount {
            units: i128::from(v),
            scale: 0,
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // Display for f64 yields the shortest round-tripping decimal form.
        format!("{v}").parse().map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
