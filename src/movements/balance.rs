use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::movements::repo_types::MovementRow;
use crate::movements::services::MovementKind;

/// Derived balance for one user. `available` mirrors `total` (kept as a
/// separate field for compatibility with older clients) and debts never touch
/// it: they only feed `pending_debt` and, through it, `real_balance`.
#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub owner_id: Uuid,
    pub total: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub available: f64,
    pub pending_debt: f64,
    pub real_balance: f64,
}

/// Zeroed balance for a freshly registered user.
pub fn initial_balance(owner_id: Uuid) -> Balance {
    Balance {
        owner_id,
        total: 0.0,
        last_updated: OffsetDateTime::now_utc(),
        available: 0.0,
        pending_debt: 0.0,
        real_balance: 0.0,
    }
}

/// Full recompute over a set of stored movement rows. Income adds to the
/// total, expenses subtract, debts add their total amount to pending debt
/// only. Rows whose numeric field fails to coerce are skipped individually.
pub fn compute_balance_from_rows(rows: &[MovementRow], owner_id: Uuid) -> Balance {
    let mut total = 0.0;
    let mut pending_debt = 0.0;

    for row in rows {
        match MovementKind::from_raw(&row.kind) {
            Some(MovementKind::Income) => match coerce_number(row.value.as_deref()) {
                Some(v) => total += v,
                None => {
                    debug!(id = %row.id, "skipping movement with malformed value");
                    continue;
                }
            },
            Some(MovementKind::Expense) => match coerce_number(row.value.as_deref()) {
                Some(v) => total -= v,
                None => {
                    debug!(id = %row.id, "skipping movement with malformed value");
                    continue;
                }
            },
            Some(MovementKind::Debt) => match coerce_number(row.total_amount.as_deref()) {
                Some(v) => pending_debt += v,
                None => {
                    debug!(id = %row.id, "skipping debt with malformed total amount");
                    continue;
                }
            },
            // Unrecognized kinds contribute nothing but are not an error.
            None => {}
        }
    }

    let available = total;
    Balance {
        owner_id,
        total,
        last_updated: OffsetDateTime::now_utc(),
        available,
        pending_debt,
        real_balance: available - pending_debt,
    }
}

/// Applies a single movement to an existing balance, returning a new value.
/// For debts, `value` is the debt's total amount. The input is never mutated.
pub fn apply_incremental_update(balance: &Balance, value: f64, kind: MovementKind) -> Balance {
    let mut total = balance.total;
    let mut pending_debt = balance.pending_debt;

    match kind {
        MovementKind::Income => total += value,
        MovementKind::Expense => total -= value,
        MovementKind::Debt => pending_debt += value,
    }

    let available = total;
    Balance {
        owner_id: balance.owner_id,
        total,
        last_updated: OffsetDateTime::now_utc(),
        available,
        pending_debt,
        real_balance: available - pending_debt,
    }
}

/// Consistency check over a balance: a real owner, finite numbers, available
/// equal to total and the real balance equal to available minus pending debt,
/// both within a rounding tolerance of one cent.
pub fn validate_balance_consistency(balance: &Balance) -> bool {
    if balance.owner_id.is_nil() {
        return false;
    }
    let numbers = [
        balance.total,
        balance.available,
        balance.pending_debt,
        balance.real_balance,
    ];
    if numbers.iter().any(|n| !n.is_finite()) {
        return false;
    }
    if (balance.available - balance.total).abs() > 0.01 {
        return false;
    }
    if (balance.real_balance - (balance.available - balance.pending_debt)).abs() > 0.01 {
        return false;
    }
    true
}

/// Missing numeric fields default to zero; present but unparsable ones yield
/// `None`, which callers treat as "skip this record".
pub(crate) fn coerce_number(raw: Option<&str>) -> Option<f64> {
    match raw {
        None => Some(0.0),
        Some(s) => s.trim().parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, value: Option<&str>, total_amount: Option<&str>) -> MovementRow {
        MovementRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            kind: kind.into(),
            name: Some("test".into()),
            created_at: Some("2025-03-01T10:00:00Z".into()),
            value: value.map(Into::into),
            total_amount: total_amount.map(Into::into),
            monthly_payment: None,
            term_months: None,
        }
    }

    #[test]
    fn income_and_expense_move_the_total() {
        let owner = Uuid::new_v4();
        let rows = vec![
            row("ingreso", Some("100"), None),
            row("gasto", Some("40"), None),
        ];
        let b = compute_balance_from_rows(&rows, owner);
        assert_eq!(b.total, 60.0);
        assert_eq!(b.available, 60.0);
        assert_eq!(b.pending_debt, 0.0);
        assert_eq!(b.real_balance, 60.0);
        assert!(validate_balance_consistency(&b));
    }

    #[test]
    fn debts_only_touch_pending_debt() {
        let owner = Uuid::new_v4();
        let rows = vec![
            row("income", Some("500"), None),
            row("debt", Some("60"), Some("600")),
        ];
        let b = compute_balance_from_rows(&rows, owner);
        assert_eq!(b.total, 500.0);
        assert_eq!(b.available, 500.0);
        assert_eq!(b.pending_debt, 600.0);
        assert_eq!(b.real_balance, -100.0);
        assert!(validate_balance_consistency(&b));
    }

    #[test]
    fn malformed_rows_are_skipped_individually() {
        let owner = Uuid::new_v4();
        let rows = vec![
            row("income", Some("100"), None),
            row("income", Some("not-a-number"), None),
            row("debt", None, Some("garbage")),
            row("expense", Some("25"), None),
        ];
        let b = compute_balance_from_rows(&rows, owner);
        assert_eq!(b.total, 75.0);
        assert_eq!(b.pending_debt, 0.0);
    }

    #[test]
    fn missing_numeric_fields_count_as_zero() {
        let owner = Uuid::new_v4();
        let rows = vec![row("income", None, None), row("debt", None, None)];
        let b = compute_balance_from_rows(&rows, owner);
        assert_eq!(b.total, 0.0);
        assert_eq!(b.pending_debt, 0.0);
    }

    #[test]
    fn unknown_kinds_contribute_nothing() {
        let owner = Uuid::new_v4();
        let rows = vec![
            row("transfer", Some("9999"), None),
            row("income", Some("10"), None),
        ];
        let b = compute_balance_from_rows(&rows, owner);
        assert_eq!(b.total, 10.0);
    }

    #[test]
    fn incremental_update_matches_full_recompute_semantics() {
        let owner = Uuid::new_v4();
        let b0 = initial_balance(owner);

        let b1 = apply_incremental_update(&b0, 100.0, MovementKind::Income);
        assert_eq!(b1.total, 100.0);
        assert_eq!(b1.available, 100.0);

        let b2 = apply_incremental_update(&b1, 40.0, MovementKind::Expense);
        assert_eq!(b2.total, 60.0);

        let b3 = apply_incremental_update(&b2, 600.0, MovementKind::Debt);
        assert_eq!(b3.total, 60.0);
        assert_eq!(b3.available, 60.0);
        assert_eq!(b3.pending_debt, 600.0);
        assert_eq!(b3.real_balance, -540.0);

        for b in [&b1, &b2, &b3] {
            assert!(validate_balance_consistency(b));
        }
        // The input balances were not mutated.
        assert_eq!(b0.total, 0.0);
        assert_eq!(b2.pending_debt, 0.0);
    }

    #[test]
    fn consistency_rejects_drift_and_bad_numbers() {
        let owner = Uuid::new_v4();
        let mut b = initial_balance(owner);
        b.available = 5.0; // diverges from total
        assert!(!validate_balance_consistency(&b));

        let mut b = initial_balance(owner);
        b.total = f64::NAN;
        b.available = f64::NAN;
        assert!(!validate_balance_consistency(&b));

        let mut b = initial_balance(owner);
        b.real_balance = 1.0;
        assert!(!validate_balance_consistency(&b));

        let b = initial_balance(Uuid::nil());
        assert!(!validate_balance_consistency(&b));
    }
}
