// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exact dollar accounting for agent usage.
//!
//! Agents report cost as a string (`"$0.0423"`); these are parsed into
//! fixed-point decimals and **summed** across jobs and workers. Floating
//! point is never used for money.

use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A dollar amount with exact decimal arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cost(Decimal);

impl Cost {
    pub const ZERO: Cost = Cost(Decimal::ZERO);

    /// Parse a dollar string. Tolerates a leading `$` and surrounding
    /// whitespace: `"$1.23"`, `" 0.0042 "`, `"3"`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let trimmed = s.trim().trim_start_matches('$').trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidCost(s.to_string()));
        }
        Decimal::from_str(trimmed)
            .map(Cost)
            .map_err(|_| CoreError::InvalidCost(s.to_string()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0 + rhs.0)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
