//! Fixed-point currency arithmetic.
//!
//! All amounts are integer minor units (cents). Percentages are basis points
//! applied with half-up rounding; per-line rounding drift is bounded by one
//! minor unit per line, which is the documented policy rather than a defect.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Monetary amount in minor currency units (e.g. cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition; never silently wraps.
    pub fn add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("money addition overflow"))
    }

    /// Checked subtraction; never silently wraps.
    ///
    /// Negative results are representable (e.g. a credit balance after an
    /// acknowledged overpayment); callers enforce their own sign guards.
    pub fn subtract(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("money subtraction overflow"))
    }

    /// Apply a basis-point rate (e.g. 875 = 8.75%), rounding half-up to the
    /// nearest minor unit.
    pub fn apply_percentage(self, rate_bps: u32) -> DomainResult<Money> {
        let scaled = (self.0 as i128) * (rate_bps as i128);
        let rounded = (scaled + 5_000) / 10_000;
        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| DomainError::invariant("money percentage overflow"))
    }

    /// Multiply a unit price by a fixed-point quantity, rounding half-up
    /// after the multiplication (not before).
    pub fn multiply_by_quantity(self, quantity: Quantity) -> DomainResult<Money> {
        let scaled = (self.0 as i128) * (quantity.thousandths() as i128);
        let rounded = (scaled + 500) / 1_000;
        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| DomainError::invariant("money quantity overflow"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// Fixed-point quantity in thousandths (supports fractional hours/units).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    pub const fn from_whole(units: i32) -> Self {
        Self(units as i64 * 1_000)
    }

    pub const fn thousandths(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0 % 1_000 == 0 {
            write!(f, "{}", self.0 / 1_000)
        } else {
            let sign = if self.0 < 0 { "-" } else { "" };
            let abs = self.0.unsigned_abs();
            write!(f, "{sign}{}.{:03}", abs / 1_000, abs % 1_000)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_and_subtract_are_checked() {
        let a = Money::from_minor_units(150);
        let b = Money::from_minor_units(50);
        assert_eq!(a.add(b).unwrap(), Money::from_minor_units(200));
        assert_eq!(a.subtract(b).unwrap(), Money::from_minor_units(100));

        let max = Money::from_minor_units(i64::MAX);
        let err = max.add(Money::from_minor_units(1)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("overflow") => {}
            _ => panic!("Expected overflow invariant"),
        }
    }

    #[test]
    fn subtraction_below_zero_is_representable() {
        let a = Money::from_minor_units(100);
        let b = Money::from_minor_units(150);
        let result = a.subtract(b).unwrap();
        assert_eq!(result.minor_units(), -50);
        assert!(result.is_negative());
    }

    #[test]
    fn percentage_rounds_half_up() {
        // 8.75% of $9.99 = 87.4125 cents -> 87
        assert_eq!(
            Money::from_minor_units(999).apply_percentage(875).unwrap(),
            Money::from_minor_units(87)
        );
        // 5% of $0.50 = 2.5 cents -> 3 (half-up)
        assert_eq!(
            Money::from_minor_units(50).apply_percentage(500).unwrap(),
            Money::from_minor_units(3)
        );
        // 0% is always zero
        assert_eq!(
            Money::from_minor_units(12_345).apply_percentage(0).unwrap(),
            Money::ZERO
        );
    }

    #[test]
    fn quantity_multiplication_rounds_after_multiplying() {
        // 3 x $19.99 = $59.97, no rounding involved
        let price = Money::from_minor_units(1_999);
        assert_eq!(
            price.multiply_by_quantity(Quantity::from_whole(3)).unwrap(),
            Money::from_minor_units(5_997)
        );

        // 2.5 hours x $75.99/hr = 18997.5 cents -> 18998 (half-up)
        let rate = Money::from_minor_units(7_599);
        assert_eq!(
            rate.multiply_by_quantity(Quantity::from_thousandths(2_500))
                .unwrap(),
            Money::from_minor_units(18_998)
        );

        // 0.333 x $1.00 = 33.3 cents -> 33
        let dollar = Money::from_minor_units(100);
        assert_eq!(
            dollar
                .multiply_by_quantity(Quantity::from_thousandths(333))
                .unwrap(),
            Money::from_minor_units(33)
        );
    }

    #[test]
    fn display_formats_minor_units_as_dollars() {
        assert_eq!(Money::from_minor_units(0).to_string(), "$0.00");
        assert_eq!(Money::from_minor_units(5).to_string(), "$0.05");
        assert_eq!(Money::from_minor_units(100_000).to_string(), "$1000.00");
        assert_eq!(Money::from_minor_units(-50).to_string(), "-$0.50");
    }

    #[test]
    fn quantity_display_trims_whole_values() {
        assert_eq!(Quantity::from_whole(4).to_string(), "4");
        assert_eq!(Quantity::from_thousandths(2_500).to_string(), "2.500");
        assert_eq!(Quantity::from_thousandths(-1_250).to_string(), "-1.250");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: half-up percentage rounding never drifts more than half a
        /// minor unit from the exact rational result.
        #[test]
        fn percentage_drift_is_bounded(
            amount in 0i64..1_000_000_000i64,
            rate_bps in 0u32..20_000u32,
        ) {
            let applied = Money::from_minor_units(amount)
                .apply_percentage(rate_bps)
                .unwrap();
            let exact = (amount as i128) * (rate_bps as i128);
            let drift = (applied.minor_units() as i128) * 10_000 - exact;
            prop_assert!(drift.abs() <= 5_000);
        }

        /// Property: addition and subtraction are inverses when no overflow occurs.
        #[test]
        fn add_then_subtract_round_trips(
            a in -1_000_000_000i64..1_000_000_000i64,
            b in -1_000_000_000i64..1_000_000_000i64,
        ) {
            let sum = Money::from_minor_units(a).add(Money::from_minor_units(b)).unwrap();
            let back = sum.subtract(Money::from_minor_units(b)).unwrap();
            prop_assert_eq!(back, Money::from_minor_units(a));
        }
    }
}
