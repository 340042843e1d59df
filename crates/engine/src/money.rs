use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine};

/// Signed money amount represented as integer **minor units** of the
/// account currency (cents for USD/EUR/GBP, yen for JPY).
///
/// Use this type for **all** monetary values in the engine (balances, credit
/// limits, transaction and bill amounts) to avoid floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.format(Currency::Usd), "12.34 USD");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more decimals than the currency has):
///
/// ```rust
/// use engine::{Currency, Money};
///
/// assert_eq!(Money::parse("10,5", Currency::Usd).unwrap().minor(), 1050);
/// assert_eq!(Money::parse("1500", Currency::Jpy).unwrap().minor(), 1500);
/// assert!(Money::parse("12.345", Currency::Usd).is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(i64::MAX);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Formats the amount in major units followed by the currency code.
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let digits = u32::from(currency.minor_units());
        if digits == 0 {
            return format!("{sign}{abs} {}", currency.code());
        }
        let scale = 10u64.pow(digits);
        let major = abs / scale;
        let minor = abs % scale;
        let width = digits as usize;
        format!("{sign}{major}.{minor:0width$} {}", currency.code())
    }

    /// Parses a decimal string in major units of `currency`.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    pub fn parse(s: &str, currency: Currency) -> ResultEngine<Money> {
        let invalid = || EngineError::InvalidState(format!("invalid amount: {s:?}"));
        let overflow = || EngineError::InvalidState("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidState("empty amount".to_string()));
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        let mut parts = rest.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let fraction_str = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = usize::from(currency.minor_units());
        let major: i64 = major_str.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                if frac.len() > digits {
                    return Err(EngineError::InvalidState(format!(
                        "too many decimals for {}",
                        currency.code()
                    )));
                }
                let padded = format!("{frac:0<digits$}");
                padded.parse::<i64>().map_err(|_| invalid())?
            }
        };

        let scale = 10i64.pow(u32::from(currency.minor_units()));
        let total = major
            .checked_mul(scale)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(overflow)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Currency::default()))
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uses_currency_minor_units() {
        assert_eq!(Money::new(0).format(Currency::Usd), "0.00 USD");
        assert_eq!(Money::new(1).format(Currency::Eur), "0.01 EUR");
        assert_eq!(Money::new(1050).format(Currency::Gbp), "10.50 GBP");
        assert_eq!(Money::new(-1050).format(Currency::Usd), "-10.50 USD");
        assert_eq!(Money::new(1500).format(Currency::Jpy), "1500 JPY");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        let usd = Currency::Usd;
        assert_eq!(Money::parse("10", usd).unwrap().minor(), 1000);
        assert_eq!(Money::parse("10.5", usd).unwrap().minor(), 1050);
        assert_eq!(Money::parse("10,50", usd).unwrap().minor(), 1050);
        assert_eq!(Money::parse("-0.01", usd).unwrap().minor(), -1);
        assert_eq!(Money::parse("+1.00", usd).unwrap().minor(), 100);
        assert_eq!(Money::parse("  2.30 ", usd).unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_more_decimals_than_currency() {
        assert!(Money::parse("12.345", Currency::Usd).is_err());
        assert!(Money::parse("0.001", Currency::Eur).is_err());
        assert!(Money::parse("10.5", Currency::Jpy).is_err());
        assert!(Money::parse("1.2.3", Currency::Usd).is_err());
        assert!(Money::parse("abc", Currency::Usd).is_err());
    }
}
