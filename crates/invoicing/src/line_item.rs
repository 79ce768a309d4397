//! Invoice line items.

use serde::{Deserialize, Serialize};

use fieldbill_core::{DomainError, DomainResult, Money, Quantity};

/// One billed line: description, quantity, unit price, extended total.
///
/// Validated at construction; malformed items are rejected at the boundary
/// instead of entering the ledger. The extended total is computed from
/// quantity and unit price with half-up rounding after multiplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    description: String,
    quantity: Quantity,
    unit_price: Money,
    total: Money,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Quantity,
        unit_price: Money,
    ) -> DomainResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::validation(
                "line item description must not be empty",
            ));
        }
        if !quantity.is_positive() {
            return Err(DomainError::validation(
                "line item quantity must be positive",
            ));
        }
        if unit_price.is_negative() {
            return Err(DomainError::validation(
                "line item unit price must not be negative",
            ));
        }

        let total = unit_price.multiply_by_quantity(quantity)?;

        Ok(Self {
            description,
            quantity,
            unit_price,
            total,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total(&self) -> Money {
        self.total
    }
}
