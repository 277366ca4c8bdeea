use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Movement row as persisted. The store kept the loose shape of the original
/// document collection: numeric fields are text, timestamps are RFC 3339
/// strings, and legacy rows may omit any optional column. Coercion to real
/// numbers happens in the conversion layer, never here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MovementRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub value: Option<String>,
    pub total_amount: Option<String>,
    pub monthly_payment: Option<String>,
    pub term_months: Option<String>,
}

/// Balance row as persisted. One row per user. The derived columns are
/// optional because rows written by older versions only carried `total` and
/// `last_updated`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BalanceRow {
    pub owner_id: Uuid,
    pub total: f64,
    pub last_updated: String,
    pub available: Option<f64>,
    pub pending_debt: Option<f64>,
    pub real_balance: Option<f64>,
}

impl BalanceRow {
    /// Validates a stored row into a domain balance, defaulting the derived
    /// fields for legacy rows: available mirrors total, pending debt is zero,
    /// and the real balance is recomputed from the other two.
    pub fn into_balance(self) -> crate::movements::balance::Balance {
        let available = self.available.unwrap_or(self.total);
        let pending_debt = self.pending_debt.unwrap_or(0.0);
        let real_balance = self.real_balance.unwrap_or(available - pending_debt);
        crate::movements::balance::Balance {
            owner_id: self.owner_id,
            total: self.total,
            last_updated: parse_rfc3339(&self.last_updated)
                .unwrap_or_else(OffsetDateTime::now_utc),
            available,
            pending_debt,
            real_balance,
        }
    }
}

pub(crate) fn parse_rfc3339(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

pub(crate) fn format_rfc3339(ts: OffsetDateTime) -> String {
    // UTC timestamps always format under RFC 3339
    ts.format(&Rfc3339).expect("rfc3339 formatting")
}

pub(crate) fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_balance_row_defaults_derived_fields() {
        let row = BalanceRow {
            owner_id: Uuid::new_v4(),
            total: 150.0,
            last_updated: "2025-03-01T10:00:00Z".into(),
            available: None,
            pending_debt: None,
            real_balance: None,
        };
        let balance = row.into_balance();
        assert_eq!(balance.available, 150.0);
        assert_eq!(balance.pending_debt, 0.0);
        assert_eq!(balance.real_balance, 150.0);
    }

    #[test]
    fn full_balance_row_keeps_stored_values() {
        let row = BalanceRow {
            owner_id: Uuid::new_v4(),
            total: 100.0,
            last_updated: "2025-03-01T10:00:00Z".into(),
            available: Some(100.0),
            pending_debt: Some(40.0),
            real_balance: Some(60.0),
        };
        let balance = row.into_balance();
        assert_eq!(balance.pending_debt, 40.0);
        assert_eq!(balance.real_balance, 60.0);
    }

    #[test]
    fn unparsable_last_updated_falls_back_to_now() {
        let row = BalanceRow {
            owner_id: Uuid::new_v4(),
            total: 0.0,
            last_updated: "not-a-date".into(),
            available: None,
            pending_debt: None,
            real_balance: None,
        };
        // Must not panic; the timestamp is replaced with the current time.
        let _ = row.into_balance();
    }
}
