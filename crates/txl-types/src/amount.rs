use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Largest number of fractional digits an [`Amount`] can carry.
pub const MAX_SCALE: u32 = 18;

/// A non-negative decimal quantity with an explicit scale.
///
/// The ledger never interprets magnitude, so an amount is kept exactly as
/// written: `100.00` and `100` are distinct values (scale 2 vs scale 0).
/// Serializes as a JSON string (`"100.00"`); deserialization additionally
/// accepts JSON numbers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount {
    units: u128,
    scale: u32,
}

impl Amount {
    pub const fn zero() -> Self {
        Self { units: 0, scale: 0 }
    }

    /// Build an amount from integer units and a scale: `(10000, 2)` is `100.00`.
    pub fn from_units(units: u128, scale: u32) -> Result<Self, TypeError> {
        if scale > MAX_SCALE {
            return Err(TypeError::InvalidAmount {
                value: format!("{units}e-{scale}"),
                reason: format!("scale exceeds {MAX_SCALE}"),
            });
        }
        Ok(Self { units, scale })
    }

    /// Parse a plain decimal such as `0`, `100`, `100.00` or `0.005`.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidAmount {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let (int_part, frac_part) = match input.split_once('.') {
            Some((int_part, frac_part)) => {
                if frac_part.is_empty() {
                    return Err(invalid("missing digits after decimal point"));
                }
                (int_part, frac_part)
            }
            None => (input, ""),
        };

        if int_part.is_empty() {
            return Err(invalid("missing integer digits"));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected only ASCII digits and one decimal point"));
        }

        let scale = frac_part.len() as u32;
        if scale > MAX_SCALE {
            return Err(invalid("too many fractional digits"));
        }

        let mut units: u128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(u128::from(b - b'0')))
                .ok_or_else(|| invalid("value out of range"))?;
        }

        Ok(Self { units, scale })
    }

    pub fn units(&self) -> u128 {
        self.units
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::str::FromStr for Amount {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.units);
        }
        let divisor = 10u128.pow(self.scale);
        write!(
            f,
            "{}.{:0width$}",
            self.units / divisor,
            self.units % divisor,
            width = self.scale as usize
        )
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount {
            units: u128::from(v),
            scale: 0,
        })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(format!("amount must be non-negative, got {v}")))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() || v < 0.0 {
            return Err(E::custom(format!("amount must be a finite non-negative number, got {v}")));
        }
        // `Display` for f64 prints the shortest exact decimal, never an exponent.
        Amount::parse(&v.to_string()).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
