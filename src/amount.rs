use rust_decimal::Decimal;
use std::{
    fmt,
    str::FromStr,
};

/// Shown whenever an entered amount fails [`is_valid_amount`].
pub const INVALID_AMOUNT_MESSAGE: &str = "Enter a valid amount (up to 2 decimal places)";

const MAX_FRACTION_DIGITS: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Deposit,
    Withdraw,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Deposit => "Deposit",
            Direction::Withdraw => "Withdraw",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{}", INVALID_AMOUNT_MESSAGE)]
pub struct InvalidAmount {
    pub input: String,
}

/// A non-negative monetary amount with at most two fractional digits,
/// as typed by the operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Amount(Decimal);

impl Amount {
    /// Accepts exactly `digits` or `digits.d` / `digits.dd`. Signs,
    /// exponents, separators and whitespace are all rejected.
    pub fn parse(raw: &str) -> Result<Self, InvalidAmount> {
        let invalid = || InvalidAmount {
            input: raw.to_string(),
        };
        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (raw, None),
        };
        if !is_ascii_digits(whole) {
            return Err(invalid());
        }
        if let Some(fraction) = fraction
            && (!is_ascii_digits(fraction) || fraction.len() > MAX_FRACTION_DIGITS)
        {
            return Err(invalid());
        }
        let value = Decimal::from_str(raw).map_err(|_| invalid())?;
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Signed delta sent to the server: `+amount` to deposit, `-amount` to withdraw.
    pub fn delta(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Deposit => self.0,
            Direction::Withdraw => -self.0,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = InvalidAmount;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn is_valid_amount(raw: &str) -> bool {
    Amount::parse(raw).is_ok()
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
