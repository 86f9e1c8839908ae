//! Inclusive `[from, to?]` validity windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, ValueObject};

/// An inclusive validity interval, open-ended when `to` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Build a window; fails with `Validation` when `to` precedes `from`.
    pub fn new(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> DomainResult<Self> {
        if let Some(to) = to {
            if to < from {
                return Err(DomainError::validation(format!(
                    "valid_to ({to}) precedes valid_from ({from})"
                )));
            }
        }
        Ok(Self { from, to })
    }

    /// Open-ended window starting at `from`.
    pub fn starting_at(from: DateTime<Utc>) -> Self {
        Self { from, to: None }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    /// Point-in-time containment, inclusive on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && self.to.is_none_or(|to| at <= to)
    }
}

impl ValueObject for ValidityWindow {}
