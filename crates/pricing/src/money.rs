//! Exact decimal money, tagged with an ISO-4217 currency.
//!
//! Percentage application is overflow-checked, and the whole crate shares one
//! rounding rule: **half away from zero** at the currency's minor-unit
//! precision.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::iso;
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, ValueObject};

/// A recognized ISO-4217 currency code ("TRY", "USD", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a currency code.
    ///
    /// Accepts any case, normalizes to uppercase. Fails with `Validation` when
    /// the code is not a 3-letter code or is unknown to the ISO table.
    pub fn new(code: &str) -> DomainResult<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "'{code}' is not a 3-letter currency code"
            )));
        }
        if iso::find(&code).is_none() {
            return Err(DomainError::validation(format!(
                "'{code}' is not a recognized ISO-4217 currency"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit digits for this currency (2 for TRY, 0 for JPY).
    pub fn minor_units(&self) -> u32 {
        // The code was validated at construction; an unknown code here would
        // only come from a hand-edited serialized form.
        iso::find(&self.0).map(|c| c.exponent).unwrap_or(2)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for CurrencyCode {}

/// An exact decimal amount in a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Apply a percentage change: `amount * (1 + pct / 100)`, rounded.
    ///
    /// `pct` of `-10` means a 10% reduction. The result is rounded half away
    /// from zero at the currency's minor-unit precision. Fails with
    /// `Validation` when the adjusted amount is not representable.
    pub fn apply_percentage(&self, pct: Decimal) -> DomainResult<Money> {
        let factor = pct
            .checked_div(Decimal::ONE_HUNDRED)
            .and_then(|f| f.checked_add(Decimal::ONE))
            .ok_or_else(|| {
                DomainError::validation(format!("percentage change {pct} is out of range"))
            })?;
        let adjusted = self.amount.checked_mul(factor).ok_or_else(|| {
            DomainError::validation(format!(
                "applying {pct}% to {self} overflows the representable amount"
            ))
        })?;
        Ok(Money::new(
            round_minor(adjusted, &self.currency),
            self.currency.clone(),
        ))
    }

    /// Normalize to the currency's minor-unit precision (same rounding rule).
    pub fn rounded(&self) -> Money {
        Money::new(round_minor(self.amount, &self.currency), self.currency.clone())
    }
}

fn round_minor(amount: Decimal, currency: &CurrencyCode) -> Decimal {
    amount.round_dp_with_strategy(currency.minor_units(), RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl ValueObject for Money {}
