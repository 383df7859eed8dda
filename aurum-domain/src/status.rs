//! Order and payment status state machines.
//!
//! All status writes in the system go through the predicates defined here.
//! Transitions:
//!
//! ```text
//! pending ──► paid ──► cancelled
//!    │                    ▲
//!    ├────────────────────┘
//!    └──► delivered
//! ```
//!
//! `delivered` and `cancelled` are terminal: neither customers nor
//! privileged callers may move an order out of them.

use crate::value_objects::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OrderStatus
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    /// Payment settled
    Paid,
    /// Cancelled by the customer or an operator
    Cancelled,
    /// Shipped and delivered
    Delivered,
}

impl OrderStatus {
    /// Whether the customer may cancel an order in this status.
    ///
    /// Cancellation is only legal before delivery; a cancelled order
    /// cannot be cancelled again.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Whether a privileged status update may overwrite this status.
    ///
    /// Terminal states are frozen even for operators.
    pub fn can_change(&self) -> bool {
        !self.is_terminal()
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }

    /// Status as its wire/storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PaymentStatus
// =============================================================================

/// Lifecycle status of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Intent created at the gateway, awaiting confirmation
    Pending,
    /// Gateway confirmed the charge
    Succeeded,
    /// Attempt failed (gateway rejection or exhausted retries)
    Failed,
}

impl PaymentStatus {
    /// Status as its wire/storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_cancel_from_pending_and_paid() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
    }

    #[test]
    fn test_cannot_cancel_terminal_states() {
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_can_change_rejects_terminal_states() {
        assert!(OrderStatus::Pending.can_change());
        assert!(OrderStatus::Paid.can_change());
        assert!(!OrderStatus::Cancelled.can_change());
        assert!(!OrderStatus::Delivered.can_change());
    }

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
            OrderStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_order_status_rejects_unknown() {
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
        assert!("PENDING".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_status_round_trip() {
        for status in [PaymentStatus::Pending, PaymentStatus::Succeeded, PaymentStatus::Failed] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
    }
}
