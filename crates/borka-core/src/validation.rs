//! # Validation Module
//!
//! Input validation for Borka POS requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Back-office UI                                               │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: shape of refund / sale / policy input                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Refund rules (`refund` module)                               │
//! │  └── Policy, window, refundable amount, per-item quantities            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use borka_core::validation::{validate_quantity, validate_search_query};
//!
//! validate_quantity(2).unwrap();
//! assert_eq!(validate_search_query("  nida abaya ").unwrap(), "nida abaya");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::refund::{PolicyUpdate, RefundRequest};
use crate::types::NewSale;
use crate::{MAX_AMOUNT_PAISA, MAX_ITEM_QUANTITY, MAX_LINES_PER_REQUEST};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_REASON_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 1000;
const MAX_WINDOW_DAYS: i64 = 365;

// =============================================================================
// String Validators
// =============================================================================

/// Checks a required free-text field: non-blank and at most `max` chars.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Checks optional notes for length only.
pub fn validate_notes(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a product search query.
///
/// ## Rules
/// - Can be empty (returns all active products)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero (tax, discount, prices of gifts).
pub fn validate_amount_paisa(field: &str, paisa: i64) -> ValidationResult<()> {
    if paisa < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if paisa > MAX_AMOUNT_PAISA {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISA,
        });
    }

    Ok(())
}

/// Sums line totals, rejecting a sum that does not fit in i64.
pub fn sum_amounts<I>(field: &str, amounts: I) -> ValidationResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    amounts
        .into_iter()
        .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        })
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }

    Ok(())
}

fn validate_line_count(field: &str, lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if lines > MAX_LINES_PER_REQUEST {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINES_PER_REQUEST as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates the shape of a refund request.
///
/// ## Rules
/// ```text
/// items          1..=100 lines, each quantity 1..=999
/// line total     unit price × quantity
/// subtotal       sum of line totals
/// tax, discount  not negative
/// amounts        0..=MAX_AMOUNT_PAISA (refund amount positive)
/// refund reason  required, ≤ 200 chars
/// ```
///
/// The refund amount is not derived from the totals: the store may keep a
/// restocking penalty, so the UI sends the amount it actually pays out.
pub fn validate_refund_request(request: &RefundRequest) -> ValidationResult<()> {
    validate_required_text("sale id", &request.sale_id, 64)?;
    validate_line_count("items", request.items.len())?;

    for item in &request.items {
        validate_required_text("product id", &item.product_id, 64)?;
        validate_quantity(item.quantity)?;
        validate_amount_paisa("unit price", item.unit_price_paisa)?;

        let expected = Money::from_paisa(item.unit_price_paisa)
            .checked_multiply_quantity(item.quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: format!("total price of {}", item.product_name),
                min: 0,
                max: i64::MAX,
            })?;
        if expected != item.total_price() {
            return Err(ValidationError::Mismatch {
                field: format!("total price of {}", item.product_name),
                expected,
                actual: item.total_price(),
            });
        }
    }

    let lines = sum_amounts("subtotal", request.items.iter().map(|i| i.total_price()))?;
    if lines.paisa() != request.subtotal_paisa {
        return Err(ValidationError::Mismatch {
            field: "subtotal".to_string(),
            expected: lines,
            actual: Money::from_paisa(request.subtotal_paisa),
        });
    }

    validate_amount_paisa("tax", request.tax_paisa)?;
    validate_amount_paisa("discount", request.discount_paisa)?;

    if request.refund_amount_paisa <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "refund amount".to_string(),
        });
    }
    validate_amount_paisa("refund amount", request.refund_amount_paisa)?;

    validate_required_text("refund reason", &request.refund_reason, MAX_REASON_LEN)?;
    validate_notes("refund notes", request.refund_notes.as_deref())
}

/// Validates a partial refund policy update.
pub fn validate_policy_update(update: &PolicyUpdate) -> ValidationResult<()> {
    if let Some(days) = update.refund_window_days {
        validate_range("refund window days", days, 0, MAX_WINDOW_DAYS)?;
    }
    if let Some(pct) = update.max_refund_percentage {
        validate_range("max refund percentage", pct, 0, 100)?;
    }
    if let Some(days) = update.auto_complete_after_days {
        validate_range("auto complete after days", days, 0, MAX_WINDOW_DAYS)?;
    }
    if let Some(paisa) = update.require_manager_approval_above_paisa {
        validate_amount_paisa("manager approval threshold", paisa)?;
    }
    if let Some(paisa) = update.auto_approve_below_paisa {
        validate_amount_paisa("auto approve threshold", paisa)?;
    }
    if let Some(paisa) = update.restock_penalty_paisa {
        validate_amount_paisa("restock penalty", paisa)?;
    }
    if let Some(reasons) = &update.allowed_reasons {
        for reason in reasons {
            validate_required_text("allowed reason", reason, MAX_REASON_LEN)?;
        }
    }

    Ok(())
}

/// Validates a sale before it is priced.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_required_text("branch id", &sale.branch_id, 64)?;
    validate_line_count("items", sale.items.len())?;

    for item in &sale.items {
        validate_required_text("product id", &item.product_id, 64)?;
        validate_quantity(item.quantity)?;
    }

    if let Some(paid) = sale.paid_paisa {
        validate_amount_paisa("paid amount", paid)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refund::RefundItem;
    use crate::types::{NewSaleItem, PaymentMethod};

    fn item(qty: i64, unit: i64) -> RefundItem {
        RefundItem {
            product_id: "p1".into(),
            product_name: "Nida Abaya".into(),
            quantity: qty,
            unit_price_paisa: unit,
            total_price_paisa: unit * qty,
            size: None,
            reason: "defective".into(),
            condition: "unworn".into(),
            notes: None,
        }
    }

    fn request(items: Vec<RefundItem>) -> RefundRequest {
        let subtotal = items.iter().map(|i| i.total_price_paisa).sum();
        RefundRequest {
            sale_id: "sale-1".into(),
            items,
            subtotal_paisa: subtotal,
            tax_paisa: 0,
            discount_paisa: 0,
            refund_amount_paisa: subtotal,
            refund_method: PaymentMethod::Cash,
            refund_reason: "defective".into(),
            refund_notes: None,
            restock_required: true,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_required_text() {
        assert!(validate_required_text("reason", "defective", 20).is_ok());
        assert!(matches!(
            validate_required_text("reason", "   ", 20),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_required_text("reason", &"x".repeat(21), 20),
            Err(ValidationError::TooLong { max: 20, .. })
        ));
    }

    #[test]
    fn test_valid_refund_request() {
        assert!(validate_refund_request(&request(vec![item(2, 1500)])).is_ok());
    }

    #[test]
    fn test_refund_request_needs_items_and_reason() {
        assert!(matches!(
            validate_refund_request(&request(vec![])),
            Err(ValidationError::Required { .. })
        ));

        let mut req = request(vec![item(1, 1500)]);
        req.refund_reason = String::new();
        assert!(validate_refund_request(&req).is_err());
    }

    #[test]
    fn test_huge_unit_price_rejected_without_overflow() {
        let mut line = item(1, 1500);
        line.quantity = 2;
        line.unit_price_paisa = i64::MAX / 2 + 1;
        line.total_price_paisa = line.unit_price_paisa.wrapping_mul(2);
        let mut req = request(vec![line]);
        req.subtotal_paisa = req.items[0].total_price_paisa;
        req.refund_amount_paisa = 1;

        match validate_refund_request(&req) {
            Err(ValidationError::OutOfRange { field, max, .. }) => {
                assert_eq!(field, "unit price");
                assert_eq!(max, crate::MAX_AMOUNT_PAISA);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        let mut req = request(vec![item(1, 1500)]);
        req.refund_amount_paisa = crate::MAX_AMOUNT_PAISA + 1;
        assert!(matches!(
            validate_refund_request(&req),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_sum_amounts_overflow() {
        let big = Money::from_paisa(i64::MAX - 10);
        assert!(matches!(
            sum_amounts("subtotal", [big, Money::from_paisa(11)]),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(
            sum_amounts("subtotal", [big, Money::from_paisa(10)]).unwrap(),
            Money::from_paisa(i64::MAX)
        );
    }

    #[test]
    fn test_refund_request_totals_must_agree() {
        let mut bad_line = item(2, 1500);
        bad_line.total_price_paisa = 2000;
        let mut req = request(vec![bad_line]);
        req.subtotal_paisa = 2000;
        assert!(matches!(
            validate_refund_request(&req),
            Err(ValidationError::Mismatch { .. })
        ));

        let mut req = request(vec![item(1, 1500)]);
        req.subtotal_paisa = 1400;
        assert!(matches!(
            validate_refund_request(&req),
            Err(ValidationError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_refund_amount_must_be_positive() {
        let mut req = request(vec![item(1, 1500)]);
        req.refund_amount_paisa = 0;
        assert!(matches!(
            validate_refund_request(&req),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut req = request(vec![item(1, 1500)]);
        req.tax_paisa = -1;
        assert!(matches!(
            validate_refund_request(&req),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_policy_update() {
        assert!(validate_policy_update(&PolicyUpdate::default()).is_ok());

        let update = PolicyUpdate {
            max_refund_percentage: Some(101),
            ..PolicyUpdate::default()
        };
        assert!(validate_policy_update(&update).is_err());

        let update = PolicyUpdate {
            refund_window_days: Some(-1),
            ..PolicyUpdate::default()
        };
        assert!(validate_policy_update(&update).is_err());

        let update = PolicyUpdate {
            allowed_reasons: Some(vec!["defective".into(), " ".into()]),
            ..PolicyUpdate::default()
        };
        assert!(validate_policy_update(&update).is_err());
    }

    #[test]
    fn test_validate_new_sale() {
        let mut sale = NewSale {
            branch_id: "br-1".into(),
            customer_id: None,
            items: vec![NewSaleItem {
                product_id: "p1".into(),
                quantity: 1,
                size: None,
            }],
            payment_method: PaymentMethod::Card,
            paid_paisa: None,
            discount_code: None,
        };
        assert!(validate_new_sale(&sale).is_ok());

        sale.items[0].quantity = 0;
        assert!(validate_new_sale(&sale).is_err());

        sale.items.clear();
        assert!(validate_new_sale(&sale).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1500).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  hijab ").unwrap(), "hijab");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }
}
