//! # Money Module
//!
//! Provides the `Money` and `Quantity` types: exact decimal values for every
//! price, total, balance and stock figure in the system.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A hardware store sells 2.5 kg of nails at 3.35/kg and 7 bags of       │
//! │  cement: quantities are fractional, prices carry cents, and the        │
//! │  client ledger must add up to the cent after thousands of entries.     │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal (96-bit mantissa, 28 digits)               │
//! │    0.1 + 0.2 = 0.3 exactly                                             │
//! │    2.5 kg × 3.35 = 8.375 → round2 (half-up) = 8.38                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::money::{Money, Quantity};
//!
//! let price: Money = "3.35".parse().unwrap();
//! let qty: Quantity = "2.5".parse().unwrap();
//!
//! // Exact product, then rounded to cents (half-up)
//! let line = price.line_amount(qty);
//! assert_eq!(line.to_string(), "8.38");
//!
//! let total = line + Money::from_minor(162);
//! assert_eq!(total, Money::from_major(10));
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::{MAX_QUANTITY_SCALE, MONEY_SCALE};

fn parse_decimal(input: &str) -> CoreResult<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidDecimal {
            input: input.to_string(),
            reason: "empty input".to_string(),
        });
    }
    Decimal::from_str(trimmed).map_err(|e| CoreError::InvalidDecimal {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn from_float(value: f64) -> CoreResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| CoreError::InvalidDecimal {
        input: value.to_string(),
        reason: "not representable as a decimal".to_string(),
    })
}

// =============================================================================
// Money Type
// =============================================================================

/// A signed monetary amount.
///
/// ## Design Decisions
/// - **Decimal, signed**: client balances go negative (debt), deltas are signed
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serialized as a string**: `"12.50"`, never a JSON float
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.unit_price ──► TransactionItem.unit_price (snapshot)           │
/// │                              │                                          │
/// │                              ▼                                          │
/// │         line_amount(qty) - discount = TransactionItem.subtotal          │
/// │                              │                                          │
/// │                              ▼                                          │
/// │  Transaction.subtotal - discount = total ──► payment policy             │
/// │                              │                                          │
/// │                              ▼                                          │
/// │                 Client.balance (ledger entry)                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(#[ts(as = "String")] Decimal);

impl Money {
    /// Zero money.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps a raw decimal without rounding.
    #[inline]
    pub const fn from_decimal(value: Decimal) -> Self {
        Money(value)
    }

    /// Creates a Money value from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, MONEY_SCALE))
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub fn from_major(major: i64) -> Self {
        Money(Decimal::from(major))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn decimal(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// `max(self, 0)`: the part of a balance that is spendable credit.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(50).non_negative(), Money::from_major(50));
    /// assert_eq!(Money::from_major(-30).non_negative(), Money::ZERO);
    /// ```
    #[inline]
    pub fn non_negative(&self) -> Self {
        if self.is_negative() {
            Money::ZERO
        } else {
            *self
        }
    }

    /// Rounds half-up (away from zero at the midpoint) to `dp` places.
    ///
    /// ```text
    /// 8.375  → round_dp(2) → 8.38
    /// 8.3749 → round_dp(2) → 8.37
    /// -0.005 → round_dp(2) → -0.01
    /// ```
    #[inline]
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounds to the money scale (2 places, half-up).
    #[inline]
    pub fn rounded(&self) -> Self {
        self.round_dp(MONEY_SCALE)
    }

    /// `round2(self × quantity)`: the gross amount of a line before discount.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Nails 3.35/kg
    /// Quantity: 2.5 kg
    ///      │
    ///      ▼
    /// line_amount(2.5) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// 8.375 → 8.38
    /// ```
    pub fn line_amount(&self, quantity: Quantity) -> Money {
        (*self * quantity).rounded()
    }

    /// Division that reports a zero divisor instead of panicking.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let share = Money::from_major(10).checked_div(Decimal::from(4)).unwrap();
    /// assert_eq!(share.to_string(), "2.50");
    /// assert!(Money::from_major(10).checked_div(Decimal::ZERO).is_err());
    /// ```
    pub fn checked_div(&self, divisor: Decimal) -> CoreResult<Money> {
        self.0
            .checked_div(divisor)
            .map(Money)
            .ok_or_else(|| CoreError::InvalidDecimal {
                input: format!("{} / {}", self.0, divisor),
                reason: "division by zero or overflow".to_string(),
            })
    }

    /// Addition that reports overflow instead of panicking.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let sum = Money::from_major(2).checked_add(Money::from_minor(50)).unwrap();
    /// assert_eq!(sum.to_string(), "2.50");
    /// assert!(Money::from_decimal(Decimal::MAX).checked_add(Money::from_major(1)).is_err());
    /// ```
    pub fn checked_add(&self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::InvalidDecimal {
                input: format!("{} + {}", self.0, other.0),
                reason: "overflow".to_string(),
            })
    }

    /// Subtraction that reports overflow instead of panicking.
    pub fn checked_sub(&self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::InvalidDecimal {
                input: format!("{} - {}", self.0, other.0),
                reason: "overflow".to_string(),
            })
    }

    /// True when the value carries no more than two significant decimal places.
    pub fn fits_money_scale(&self) -> bool {
        self.0.normalize().scale() <= MONEY_SCALE
    }

    /// Lossy conversion for display/analytics boundaries only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Converts a float from an external boundary, rounded to cents.
    ///
    /// NaN and infinities are rejected with `InvalidDecimal`.
    pub fn try_from_f64(value: f64) -> CoreResult<Money> {
        Ok(Money(from_float(value)?).rounded())
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s).map(Money)
    }
}

/// Always at least two decimal places (`5` prints as `5.00`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.0;
        if value.scale() < MONEY_SCALE {
            value.rescale(MONEY_SCALE);
        }
        write!(f, "{}", value)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Exact product; callers round with [`Money::rounded`] when a stored figure
/// is needed.
impl Mul<Quantity> for Money {
    type Output = Money;

    #[inline]
    fn mul(self, quantity: Quantity) -> Money {
        Money(self.0 * quantity.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Quantity Type
// =============================================================================

/// A stock or line quantity in the product's unit.
///
/// Piece-like units (bag, carton, ...) use whole numbers; measured units
/// (kg, litre, ...) allow up to three decimal places. The check lives in
/// `validation::validate_quantity` because it needs the unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(#[ts(as = "String")] Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    #[inline]
    pub const fn from_decimal(value: Decimal) -> Self {
        Quantity(value)
    }

    /// Creates a whole-number quantity.
    #[inline]
    pub fn from_int(value: i64) -> Self {
        Quantity(Decimal::from(value))
    }

    #[inline]
    pub const fn decimal(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    #[inline]
    pub fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }

    /// True for whole numbers (`3`, `3.000`).
    pub fn is_whole(&self) -> bool {
        self.0.fract().is_zero()
    }

    /// Number of significant decimal places (`2.500` → 1).
    pub fn significant_places(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// True when the value fits the measured-unit scale.
    pub fn fits_measured_scale(&self) -> bool {
        self.significant_places() <= MAX_QUANTITY_SCALE
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Converts a float from an external boundary, rounded to three places.
    pub fn try_from_f64(value: f64) -> CoreResult<Quantity> {
        Ok(Quantity(from_float(value)?.round_dp_with_strategy(
            MAX_QUANTITY_SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }
}

impl FromStr for Quantity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s).map(Quantity)
    }
}

/// Canonical form without trailing zeros (`2.500` prints as `2.5`).
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, |acc, q| acc + q)
    }
}

// =============================================================================
// SQLite encoding (TEXT columns)
// =============================================================================

/// Decimals are stored as canonical TEXT so SQLite never coerces them to REAL.
#[cfg(feature = "sqlx")]
mod sqlite_text {
    use super::{Money, Quantity};
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
    use sqlx::{Database, Decode, Encode, Type};

    macro_rules! impl_sqlite_text_decimal {
        ($ty:ident) => {
            impl Type<Sqlite> for $ty {
                fn type_info() -> SqliteTypeInfo {
                    <String as Type<Sqlite>>::type_info()
                }

                fn compatible(ty: &SqliteTypeInfo) -> bool {
                    <String as Type<Sqlite>>::compatible(ty)
                }
            }

            impl<'q> Encode<'q, Sqlite> for $ty {
                fn encode_by_ref(
                    &self,
                    buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
                ) -> Result<IsNull, BoxDynError> {
                    <String as Encode<'q, Sqlite>>::encode(self.to_string(), buf)
                }
            }

            impl<'r> Decode<'r, Sqlite> for $ty {
                fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
                    let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
                    Ok(text.parse::<$ty>()?)
                }
            }
        };
    }

    impl_sqlite_text_decimal!(Money);
    impl_sqlite_text_decimal!(Quantity);
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn qty(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_point_one_plus_point_two_is_exact() {
        assert_eq!(money("0.1") + money("0.2"), money("0.3"));
    }

    #[test]
    fn test_display_pads_to_two_places() {
        assert_eq!(Money::from_major(5).to_string(), "5.00");
        assert_eq!(money("12.5").to_string(), "12.50");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_quantity_display_is_canonical() {
        assert_eq!(qty("2.500").to_string(), "2.5");
        assert_eq!(qty("3.000").to_string(), "3");
        assert_eq!(Quantity::from_int(7).to_string(), "7");
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(money("8.375").rounded(), money("8.38"));
        assert_eq!(money("8.3749").rounded(), money("8.37"));
        assert_eq!(money("-0.005").rounded(), money("-0.01"));
        assert_eq!(money("1.2345").round_dp(3), money("1.235"));
    }

    #[test]
    fn test_line_amount_rounds_after_multiplying() {
        assert_eq!(money("3.35").line_amount(qty("2.5")), money("8.38"));
        assert_eq!(money("0.333").line_amount(qty("3")), money("1.00"));
        assert_eq!(money("19.99").line_amount(Quantity::from_int(3)), money("59.97"));
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = money("10.00");
        let b = money("2.75");
        assert_eq!(a + b, money("12.75"));
        assert_eq!(a - b, money("7.25"));
        assert_eq!(-b, money("-2.75"));

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, money("15.50"));

        let stock: Quantity = vec![qty("1.5"), qty("2.25")].into_iter().sum();
        assert_eq!(stock, qty("3.75"));
    }

    #[test]
    fn test_non_negative_clamps_debt() {
        assert_eq!(money("-30").non_negative(), Money::ZERO);
        assert_eq!(money("50").non_negative(), money("50"));
    }

    #[test]
    fn test_checked_div_by_zero_is_invalid_decimal() {
        let err = money("10").checked_div(Decimal::ZERO).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDecimal { .. }));
        assert_eq!(money("10").checked_div(Decimal::from(3)).unwrap().rounded(), money("3.33"));
    }

    #[test]
    fn test_checked_add_and_sub_report_overflow() {
        let top = Money::from_decimal(Decimal::MAX);
        let err = top.checked_add(money("1")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDecimal { ref reason, .. } if reason == "overflow"));
        assert!(Money::from_decimal(Decimal::MIN).checked_sub(money("1")).is_err());

        assert_eq!(money("10.00").checked_add(money("2.75")).unwrap(), money("12.75"));
        assert_eq!(money("10.00").checked_sub(money("12.75")).unwrap(), money("-2.75"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "twelve".parse::<Money>(),
            Err(CoreError::InvalidDecimal { .. })
        ));
        assert!(matches!("".parse::<Quantity>(), Err(CoreError::InvalidDecimal { .. })));
        assert_eq!(" 4.20 ".parse::<Money>().unwrap(), money("4.2"));
    }

    #[test]
    fn test_scale_checks() {
        assert!(money("12.50").fits_money_scale());
        assert!(money("12.500").fits_money_scale());
        assert!(!money("12.505").fits_money_scale());

        assert!(qty("1.125").fits_measured_scale());
        assert!(!qty("1.1255").fits_measured_scale());
        assert!(qty("4.000").is_whole());
        assert!(!qty("4.5").is_whole());
    }

    #[test]
    fn test_float_boundaries() {
        assert_eq!(Money::try_from_f64(10.994).unwrap(), money("10.99"));
        assert!(Money::try_from_f64(f64::NAN).is_err());
        assert!((money("2.5").to_f64() - 2.5).abs() < f64::EPSILON);
        assert_eq!(Quantity::try_from_f64(0.12345).unwrap(), qty("0.123"));
    }

    #[test]
    fn test_serde_uses_strings() {
        let json = serde_json::to_string(&money("12.50")).unwrap();
        assert_eq!(json, "\"12.50\"");
        let back: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(back, money("12.5"));
    }
}
