//! Status and role types.
//!
//! Order status is an open set: stores name their own intermediate states
//! (`Pending`, `Processing`, `Shipped`, ...). Exactly one value,
//! [`OrderStatus::DELIVERED`], is terminal and triggers sales materialization.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderStatus`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderStatusError {
    /// The status is empty or only whitespace.
    #[error("status cannot be empty")]
    Empty,
    /// The status is longer than the column allows.
    #[error("status must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The status contains control characters.
    #[error("status contains control characters")]
    ControlCharacters,
}

/// An order status.
///
/// ## Constraints
///
/// - Length: 1-32 characters after trimming surrounding whitespace
/// - No control characters
/// - Case-sensitive: `Delivered` is terminal, `delivered` is not
///
/// ## Examples
///
/// ```
/// use mercato_core::OrderStatus;
///
/// let status = OrderStatus::parse("Processing").unwrap();
/// assert!(!status.is_terminal());
/// assert!(OrderStatus::parse(" Delivered ").unwrap().is_terminal());
/// assert!(OrderStatus::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderStatus(String);

impl OrderStatus {
    /// Maximum length of a status (matches the `orders.status` column).
    pub const MAX_LENGTH: usize = 32;

    /// The terminal fulfillment status.
    pub const DELIVERED: &'static str = "Delivered";

    /// Status given to orders when a caller does not pick one.
    pub const PENDING: &'static str = "Pending";

    /// Parse an `OrderStatus` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or contains
    /// control characters.
    pub fn parse(s: &str) -> Result<Self, OrderStatusError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(OrderStatusError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(OrderStatusError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(OrderStatusError::ControlCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The terminal `Delivered` status.
    #[must_use]
    pub fn delivered() -> Self {
        Self(Self::DELIVERED.to_owned())
    }

    /// The default `Pending` status.
    #[must_use]
    pub fn pending() -> Self {
        Self(Self::PENDING.to_owned())
    }

    /// Whether this is the terminal fulfillment status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.0 == Self::DELIVERED
    }

    /// Returns the status as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.0
    }
}

impl AsRef<str> for OrderStatus {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Statuses are stored as VARCHAR(32)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values were validated on the way in
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Role carried by an authenticated principal within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreRole {
    /// Store owner; full access to the store's orders.
    Owner,
    /// Store staff; may create orders and move them through statuses.
    Staff,
    /// Read-only access to store data.
    Viewer,
}

impl StoreRole {
    /// Whether this role may create orders and change their status.
    #[must_use]
    pub const fn can_manage_orders(self) -> bool {
        matches!(self, Self::Owner | Self::Staff)
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Staff => write!(f, "staff"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for StoreRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" | "store_owner" => Ok(Self::Owner),
            "staff" => Ok(Self::Staff),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid store role: {s}")),
        }
    }
}

/// Channel a sale was made through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel {
    /// Orders placed through the API. Every materialized order uses this.
    #[default]
    Online,
    /// Counter sales recorded by other systems.
    InStore,
}

impl SaleChannel {
    /// Returns the stored representation (the `sales_record.sale_channel` text).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::InStore => "in_store",
        }
    }
}

impl fmt::Display for SaleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SaleChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "in_store" => Ok(Self::InStore),
            _ => Err(format!("invalid sale channel: {s}")),
        }
    }
}
