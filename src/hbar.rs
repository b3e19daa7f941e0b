use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HbarError {
    #[error("{0} has more precision than one tinybar")]
    SubTinybar(Decimal),
    #[error("{0} does not fit into a tinybar amount")]
    Overflow(Decimal),
}

/// Amount of the network's native currency, stored in tinybars.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Hbar(i64);

impl Hbar {
    pub const ZERO: Hbar = Hbar(0);

    pub const fn new(hbars: i64) -> Self {
        Self(hbars * TINYBARS_PER_HBAR)
    }

    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    pub const fn to_tinybars(self) -> i64 {
        self.0
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 8)
    }

    pub fn from_decimal(hbars: Decimal) -> Result<Self, HbarError> {
        let tinybars = hbars
            .checked_mul(Decimal::from(TINYBARS_PER_HBAR))
            .ok_or(HbarError::Overflow(hbars))?;
        if !tinybars.fract().is_zero() {
            return Err(HbarError::SubTinybar(hbars));
        }
        tinybars
            .to_i64()
            .map(Self)
            .ok_or(HbarError::Overflow(hbars))
    }

    pub fn checked_add(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_neg(self) -> Option<Hbar> {
        self.0.checked_neg().map(Self)
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl std::ops::Neg for Hbar {
    type Output = Hbar;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ℏ", self.to_decimal().normalize())
    }
}
