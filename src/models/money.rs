//! Monetary amounts stored as integer cents.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Currency symbol used for display.
pub const CURRENCY_SYMBOL: &str = "R$";

/// Largest amount accepted from input: R$ 1,000,000,000,000.00.
pub const MAX_CENTS: i64 = 100_000_000_000_000;

/// An amount of money in cents.
///
/// Input amounts are non-negative (see [`FromStr`]) and at most
/// [`MAX_CENTS`]; sums such as a balance may go negative. Arithmetic
/// saturates instead of overflowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse an amount, allowing a leading minus sign.
    ///
    /// Accepts `R$` prefixes, `.` or `,` as decimal separator and the other
    /// one as thousands separator: `1234.5`, `1.234,50`, `R$ 1,234.50`.
    pub fn parse_signed(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid amount: '{}'", input));

        let mut s = input.trim();
        if let Some(rest) = s.strip_prefix(CURRENCY_SYMBOL) {
            s = rest.trim_start();
        }
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, s),
        };
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if s.is_empty() {
            return Err(invalid());
        }

        let last_dot = s.rfind('.');
        let last_comma = s.rfind(',');
        let decimal_sep = match (last_dot, last_comma) {
            (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
            (Some(_), None) => single_separator_role(&s, '.'),
            (None, Some(_)) => single_separator_role(&s, ','),
            (None, None) => None,
        };

        let (int_part, frac_part) = match decimal_sep {
            Some(sep) => {
                let idx = s.rfind(sep).ok_or_else(invalid)?;
                (&s[..idx], &s[idx + 1..])
            }
            None => (s.as_str(), ""),
        };

        let int_digits: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
        if !int_digits.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if int_digits.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > 2 {
            return Err(Error::InvalidInput(format!(
                "invalid amount: '{}' (at most two decimal places)",
                input
            )));
        }

        let units: i64 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| invalid())?
        };
        let cents: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac_part.parse().map_err(|_| invalid())?,
        };
        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;
        if total > MAX_CENTS {
            return Err(Error::InvalidInput(format!(
                "amount too large: '{}' (maximum {})",
                input,
                Amount(MAX_CENTS).to_currency()
            )));
        }

        Ok(Self(if negative { -total } else { total }))
    }

    /// Format for display, e.g. `R$ 1,234.56` or `R$ -40.00`.
    pub fn to_currency(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!(
            "{} {}{}.{:02}",
            CURRENCY_SYMBOL,
            sign,
            group_thousands(abs / 100),
            abs % 100
        )
    }
}

/// Decide whether a lone separator kind is a decimal point.
///
/// One occurrence followed by exactly three digits reads as thousands
/// grouping (`1.234`); anything else with a single occurrence is decimal.
fn single_separator_role(s: &str, sep: char) -> Option<char> {
    let count = s.matches(sep).count();
    if count > 1 {
        return None;
    }
    let after = s.rsplit(sep).next().unwrap_or("");
    if after.len() == 3 { None } else { Some(sep) }
}

fn group_thousands(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut groups = Vec::new();
    while value > 0 {
        groups.push(value % 1000);
        value /= 1000;
    }
    let mut out = String::new();
    for (i, group) in groups.iter().rev().enumerate() {
        if i == 0 {
            out.push_str(&group.to_string());
        } else {
            out.push_str(&format!(",{:03}", group));
        }
    }
    out
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a user-entered amount; negative values are rejected.
    fn from_str(s: &str) -> Result<Self> {
        let amount = Self::parse_signed(s)?;
        if amount.is_negative() {
            return Err(Error::InvalidInput(format!(
                "amount must not be negative: '{}'",
                s
            )));
        }
        Ok(amount)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Amount::parse_signed(&s).map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(Amount((n * 100.0).round() as i64)),
        }
    }
}
