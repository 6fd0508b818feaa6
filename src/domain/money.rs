use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

// Monetary amounts use exact decimal arithmetic with at most two
// fractional digits. Binary floating point is never involved: repeated
// transfer/reversal cycles must reproduce pre-transaction balances exactly.

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, "100" -> 100
pub fn parse_amount(input: &str) -> Result<Decimal, ParseAmountError> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| ParseAmountError::InvalidFormat)?;
    // Trailing zeros don't count against the scale limit ("12.30" is fine)
    if amount.normalize().scale() > 2 {
        return Err(ParseAmountError::TooManyFractionalDigits);
    }
    Ok(amount)
}

/// Format an amount with exactly two fractional digits.
/// Example: 50 -> "50.00", 12.5 -> "12.50"
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    TooManyFractionalDigits,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::TooManyFractionalDigits => {
                write!(f, "amounts carry at most two fractional digits")
            }
        }
    }
}

impl std::error::Error for ParseAmountError {}
