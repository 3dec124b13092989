//! Monetary amounts in minor units, and the split/re-sum round-trip checker

use std::fmt;
use std::str::FromStr;

use oracle::{CheckError, DiscardReason, InvariantChecker, Violation};
use thiserror::Error;

/// Upper bound on the parts [`Money::split`] will materialise
pub const MAX_SPLIT_PARTS: i64 = 1 << 16;

/// Supported ISO 4217 currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Currency {
    GBP,
    USD,
    EUR,
    JPY,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::GBP => "GBP",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::JPY => "JPY",
        }
    }

    /// Digits after the decimal point in the major unit
    pub fn fraction_digits(self) -> u32 {
        match self {
            Currency::JPY => 0,
            Currency::GBP | Currency::USD | Currency::EUR => 2,
        }
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GBP" => Ok(Currency::GBP),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "JPY" => Ok(Currency::JPY),
            _ => Err(MoneyError::UnknownCurrency(s.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("cannot split {amount} into {parts} part(s)")]
    InvalidSplit { amount: i64, parts: i64 },

    #[error("{parts} parts exceeds the limit of {max}")]
    TooManyParts { parts: i64, max: i64 },

    #[error("amount overflow")]
    Overflow,

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("unknown currency {0:?}")]
    UnknownCurrency(String),
}

/// An amount of money in the currency's smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition of two amounts in the same currency
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Split into `parts` amounts that differ by at most one minor unit.
    ///
    /// The remainder is handed out one unit at a time, with the sign of the
    /// amount, to the leading parts. `parts` must be positive, no larger
    /// than the amount in minor units and at most [`MAX_SPLIT_PARTS`].
    pub fn split(&self, parts: i64) -> Result<Vec<Money>, MoneyError> {
        if parts > MAX_SPLIT_PARTS {
            return Err(MoneyError::TooManyParts {
                parts,
                max: MAX_SPLIT_PARTS,
            });
        }
        if parts <= 0 || parts.unsigned_abs() > self.amount.unsigned_abs() {
            return Err(MoneyError::InvalidSplit {
                amount: self.amount,
                parts,
            });
        }

        let base = self.amount / parts;
        let remainder = self.amount % parts;

        let mut shares = vec![Money::new(base, self.currency); parts as usize];
        for share in shares.iter_mut().take(remainder.unsigned_abs() as usize) {
            share.amount += remainder.signum();
        }
        Ok(shares)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.currency.fraction_digits();
        if digits == 0 {
            return write!(f, "{} {}", self.amount, self.currency);
        }

        let scale = 10u64.pow(digits);
        let magnitude = self.amount.unsigned_abs();
        let sign = if self.amount < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            magnitude / scale,
            magnitude % scale,
            self.currency,
            width = digits as usize
        )
    }
}

/// Input for [`RoundTripChecker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitInput {
    pub amount: i64,
    pub parts: i64,
    pub currency: Currency,
}

/// Splitting an amount and adding the parts back gives the amount
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundTripChecker;

impl InvariantChecker for RoundTripChecker {
    type Input = SplitInput;

    fn name(&self) -> &'static str {
        "money_split_round_trip"
    }

    fn check(&self, input: &SplitInput) -> Result<(), CheckError> {
        let original = Money::new(input.amount, input.currency);
        let shares = original
            .split(input.parts)
            .map_err(|err| DiscardReason::out_of_bounds(err.to_string()))?;

        let mut total = Money::zero(input.currency);
        for share in &shares {
            total = total.add(share).map_err(|err| {
                Violation::new(self.name(), "adding split parts back together failed")
                    .with_context(format!("{} + {}: {}", total, share, err))
            })?;
        }

        if total != original {
            return Err(Violation::new(
                self.name(),
                format!("splitting into {} parts and re-adding produced a mismatch", input.parts),
            )
            .with_context(format!("{} != {}", total, original))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_distributes_remainder() {
        let shares = Money::new(100, Currency::GBP).split(3).unwrap();
        let amounts: Vec<i64> = shares.iter().map(Money::amount).collect();
        assert_eq!(amounts, vec![34, 33, 33]);
    }

    #[test]
    fn test_split_negative_amount() {
        let shares = Money::new(-100, Currency::GBP).split(3).unwrap();
        let amounts: Vec<i64> = shares.iter().map(Money::amount).collect();
        assert_eq!(amounts, vec![-34, -33, -33]);
    }

    #[test]
    fn test_split_rejects_invalid_parts() {
        let money = Money::new(5, Currency::USD);
        assert!(money.split(0).is_err());
        assert!(money.split(-2).is_err());
        assert!(money.split(6).is_err());
        assert_eq!(money.split(5).unwrap().len(), 5);
        assert!(Money::zero(Currency::USD).split(1).is_err());
    }

    #[test]
    fn test_split_caps_parts() {
        let max = Money::new(i64::MAX, Currency::GBP);
        assert_eq!(
            max.split(i64::MAX),
            Err(MoneyError::TooManyParts {
                parts: i64::MAX,
                max: MAX_SPLIT_PARTS,
            })
        );
        assert!(max.split(MAX_SPLIT_PARTS + 1).is_err());
        assert_eq!(max.split(MAX_SPLIT_PARTS).unwrap().len(), MAX_SPLIT_PARTS as usize);
    }

    #[test]
    fn test_add_checks_overflow_and_currency() {
        let max = Money::new(i64::MAX, Currency::EUR);
        assert_eq!(max.add(&Money::new(1, Currency::EUR)), Err(MoneyError::Overflow));
        assert!(matches!(
            max.add(&Money::new(1, Currency::GBP)),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(1234, Currency::GBP).to_string(), "12.34 GBP");
        assert_eq!(Money::new(-5, Currency::USD).to_string(), "-0.05 USD");
        assert_eq!(Money::new(500, Currency::JPY).to_string(), "500 JPY");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("gbp".parse::<Currency>(), Ok(Currency::GBP));
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn test_round_trip_checker() {
        let checker = RoundTripChecker;
        let input = SplitInput {
            amount: 100,
            parts: 3,
            currency: Currency::GBP,
        };
        assert!(checker.check(&input).is_ok());

        let invalid = SplitInput { parts: 0, ..input };
        assert!(checker.check(&invalid).unwrap_err().is_discard());

        let huge = SplitInput {
            amount: i64::MAX,
            parts: MAX_SPLIT_PARTS + 1,
            currency: Currency::GBP,
        };
        assert!(checker.check(&huge).unwrap_err().is_discard());
    }
}
