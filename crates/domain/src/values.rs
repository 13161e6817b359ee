//! Value objects shared by the ledger aggregates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a single ledger entry (a production run, a sale, a
/// return, or a leave span). Entries are not aggregates themselves;
/// they live inside the stream of the aggregate they affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entry ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EntryId> for Uuid {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

/// Monetary amount in cents.
///
/// Stored as an integer to avoid floating-point issues with money.
/// May be negative: a customer balance of debt minus credit below zero
/// means the store owes the customer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Creates a money value from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a money value from a floating-point major-unit amount,
    /// rounding to the nearest cent. Used only at the JSON boundary.
    pub fn from_major_units(amount: f64) -> Self {
        Self((amount * 100.0).round() as i64)
    }

    /// Returns the amount in cents.
    pub fn as_cents(&self) -> i64 {
        self.0
    }

    /// Returns the amount in major units as a float. Used only at the
    /// JSON boundary.
    pub fn as_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies this per-unit amount by a quantity, rounding to the
    /// nearest cent.
    pub fn scale_by(&self, quantity: Quantity) -> Money {
        let product = self.0 as i128 * quantity.as_thousandths() as i128;
        // Round half away from zero
        let rounded = if product >= 0 {
            (product + 500) / 1000
        } else {
            (product - 500) / 1000
        };
        Money(rounded as i64)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Quantity of product in thousandths of a unit.
///
/// By-weight products are measured in fractional kilograms, so a fixed
/// three-decimal representation covers both discrete and weighed stock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from thousandths of a unit.
    pub fn from_thousandths(value: i64) -> Self {
        Self(value)
    }

    /// Creates a quantity from whole units.
    pub fn from_units(units: i64) -> Self {
        Self(units * 1000)
    }

    /// Creates a quantity from a floating-point unit count, rounding to
    /// the nearest thousandth. Used only at the JSON boundary.
    pub fn from_units_f64(units: f64) -> Self {
        Self((units * 1000.0).round() as i64)
    }

    /// Returns the raw value in thousandths of a unit.
    pub fn as_thousandths(&self) -> i64 {
        self.0
    }

    /// Returns the quantity in units as a float. Used only at the JSON
    /// boundary.
    pub fn as_units_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Returns true if the quantity is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the quantity is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:03}", sign, abs / 1000, abs % 1000)
    }
}

/// Wax material of a product or a returned batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Brown,
    White,
    Pure,
}

impl Material {
    /// Credit value per kilogram of returned wax for this material.
    pub fn return_rate(&self) -> Money {
        match self {
            Material::Pure => Money::from_cents(320),
            Material::Brown | Material::White => Money::from_cents(70),
        }
    }

    /// Returns the material name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Brown => "Brown",
            Material::White => "White",
            Material::Pure => "Pure",
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
