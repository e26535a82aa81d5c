//! Monetary amounts using decimal arithmetic.
//!
//! Stores never mix currencies inside one tenant, so an amount is a plain
//! decimal with two fractional digits. Amounts arrive from two places with
//! different provenance: the total a caller declares when creating an order,
//! and the unit price read from the catalog when sales are materialized. Both
//! are `Money`; the fields that hold them keep their provenance in the name.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// Amount has more fractional digits than cents.
    #[error("amount must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum number of decimal places.
        max: u32,
    },
    /// Amount exceeds the storage column's range.
    #[error("amount exceeds {max}")]
    TooLarge {
        /// Largest storable amount.
        max: Decimal,
    },
    /// Multiplication overflowed.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount of money with at most two decimal places.
///
/// ## Examples
///
/// ```
/// use mercato_core::Money;
/// use rust_decimal::Decimal;
///
/// let price = Money::new(Decimal::new(1999, 2)).unwrap(); // 19.99
/// assert_eq!(price.times(3).unwrap().to_string(), "59.97");
///
/// assert!(Money::new(Decimal::new(-1, 0)).is_err());
/// assert!(Money::new(Decimal::new(1, 3)).is_err()); // 0.001
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Decimal places kept for every amount.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount a `NUMERIC(12, 2)` column can hold.
    #[must_use]
    pub fn max_value() -> Decimal {
        Decimal::new(9_999_999_999_99, Self::SCALE)
    }

    /// Create an amount, rejecting negative, over-precise, or unstorable values.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] when the value cannot be stored as money.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(MoneyError::TooPrecise { max: Self::SCALE });
        }
        if normalized > Self::max_value() {
            return Err(MoneyError::TooLarge {
                max: Self::max_value(),
            });
        }
        let mut value = normalized;
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] on overflow or when the result is out of range.
    pub fn times(self, quantity: i32) -> Result<Self, MoneyError> {
        let total = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Self::new(total)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] on overflow or when the result is out of range.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        let sum = self.0.checked_add(other.0).ok_or(MoneyError::Overflow)?;
        Self::new(sum)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
