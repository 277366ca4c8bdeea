use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::movements::balance::coerce_number;
use crate::movements::repo_types::{now_rfc3339, parse_rfc3339, MovementRow};
use crate::validation::ValidationResult;

pub const UNKNOWN_DATE_LABEL: &str = "Unknown date";

/// The three movement kinds. Stored rows may carry either the English names
/// or the Spanish ones written by earlier versions of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Income,
    Expense,
    Debt,
}

impl MovementKind {
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "income" | "ingreso" => Some(Self::Income),
            "expense" | "gasto" => Some(Self::Expense),
            "debt" | "deuda" => Some(Self::Debt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Debt => "debt",
        }
    }
}

/// Display-ready movement derived from a stored row: numbers coerced, value
/// rounded to two decimals, `time` carrying just HH:MM:SS for the list view
/// while `created_at` keeps the full timestamp for grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub kind: MovementKind,
    pub name: String,
    pub time: String,
    pub created_at: String,
    pub value: f64,
    pub owner_id: Uuid,
    pub total_amount: f64,
    pub monthly_payment: f64,
    pub term_months: i64,
}

/// One date bucket of movements, labeled "Today", "Yesterday", "DD/MM/YYYY"
/// or "Unknown date". Derived for display, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementGroup {
    pub label: String,
    pub movements: Vec<Movement>,
}

/// Validates new-entry input for a movement. Name is required for every
/// kind; income and expense need a positive value; debts need positive
/// terms whose payments actually cover the amount owed.
pub fn validate_movement_input(
    kind: &str,
    name: &str,
    value: f64,
    total_amount: f64,
    monthly_payment: f64,
    term_months: i64,
) -> ValidationResult {
    if name.trim().is_empty() {
        return ValidationResult::fail("name is required");
    }

    match MovementKind::from_raw(kind) {
        Some(parsed @ (MovementKind::Income | MovementKind::Expense)) => {
            if value <= 0.0 {
                return ValidationResult::fail(format!(
                    "the {} value must be greater than 0",
                    parsed.as_str()
                ));
            }
        }
        Some(MovementKind::Debt) => {
            if total_amount <= 0.0 {
                return ValidationResult::fail("the debt total amount must be greater than 0");
            }
            if monthly_payment <= 0.0 {
                return ValidationResult::fail("the monthly payment must be greater than 0");
            }
            if term_months <= 0 {
                return ValidationResult::fail("the term must be at least 1 month");
            }
            let total_paid = monthly_payment * term_months as f64;
            if total_paid < total_amount {
                return ValidationResult::fail(format!(
                    "the monthly payment is insufficient: {monthly_payment} over \
                     {term_months} months pays {total_paid:.2}, but the debt is \
                     {total_amount:.2}"
                ));
            }
        }
        None => {
            return ValidationResult::fail(format!("invalid movement kind: {kind}"));
        }
    }

    ValidationResult::ok()
}

/// Builds a store row for an already-validated movement. For income and
/// expense, `value` is the principal field and the debt columns are zeroed.
/// For debts, the generic `value` column holds the monthly payment so every
/// kind renders uniformly in the list.
pub fn build_movement_record(
    kind: MovementKind,
    name: &str,
    owner_id: Uuid,
    value: f64,
    total_amount: f64,
    monthly_payment: f64,
    term_months: i64,
) -> MovementRow {
    let (value, total_amount, monthly_payment, term_months) = match kind {
        MovementKind::Income | MovementKind::Expense => (value, 0.0, 0.0, 0),
        MovementKind::Debt => (monthly_payment, total_amount, monthly_payment, term_months),
    };
    MovementRow {
        id: Uuid::new_v4(),
        owner_id,
        kind: kind.as_str().to_string(),
        name: Some(name.to_string()),
        created_at: Some(now_rfc3339()),
        value: Some(value.to_string()),
        total_amount: Some(total_amount.to_string()),
        monthly_payment: Some(monthly_payment.to_string()),
        term_months: Some(term_months.to_string()),
    }
}

/// Converts stored rows into display movements. A pure function: the same
/// input always yields the same output. Rows whose numeric fields fail to
/// coerce are skipped silently; the rest of the batch is unaffected.
pub fn convert_rows_to_movements(rows: &[MovementRow]) -> Vec<Movement> {
    let time_format = format_description!("[hour]:[minute]:[second]");
    let mut movements = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(kind) = MovementKind::from_raw(&row.kind) else {
            debug!(id = %row.id, kind = %row.kind, "skipping movement with unknown kind");
            continue;
        };
        let Some(value) = coerce_number(row.value.as_deref()) else {
            debug!(id = %row.id, "skipping movement with malformed value");
            continue;
        };
        let Some(total_amount) = coerce_number(row.total_amount.as_deref()) else {
            debug!(id = %row.id, "skipping movement with malformed total amount");
            continue;
        };
        let Some(monthly_payment) = coerce_number(row.monthly_payment.as_deref()) else {
            debug!(id = %row.id, "skipping movement with malformed monthly payment");
            continue;
        };
        let term_months = match row.term_months.as_deref() {
            None => 0,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    debug!(id = %row.id, "skipping movement with malformed term");
                    continue;
                }
            },
        };

        let created_at = row.created_at.clone().unwrap_or_else(now_rfc3339);
        // Show just the clock time; fall back to the raw string when the
        // timestamp does not parse.
        let time = parse_rfc3339(&created_at)
            .and_then(|ts| ts.format(&time_format).ok())
            .unwrap_or_else(|| created_at.clone());

        movements.push(Movement {
            kind,
            name: row.name.clone().unwrap_or_default(),
            time,
            created_at,
            value: (value * 100.0).round() / 100.0,
            owner_id: row.owner_id,
            total_amount,
            monthly_payment,
            term_months,
        });
    }

    movements
}

/// Stores an already-validated movement and applies the matching incremental
/// balance update (the debt delta being the total amount owed, not the list
/// value). Returns the stored row and the updated balance. Concurrent writers
/// for the same balance are last-write-wins.
pub async fn record_movement(
    db: &sqlx::PgPool,
    owner_id: Uuid,
    kind: MovementKind,
    name: &str,
    value: f64,
    total_amount: f64,
    monthly_payment: f64,
    term_months: i64,
) -> Result<(MovementRow, crate::movements::balance::Balance), crate::error::AppError> {
    use crate::movements::balance::{
        apply_incremental_update, compute_balance_from_rows, initial_balance,
        validate_balance_consistency,
    };
    use crate::movements::repo;

    let row = build_movement_record(
        kind,
        name.trim(),
        owner_id,
        value,
        total_amount,
        monthly_payment,
        term_months,
    );
    repo::insert_movement(db, &row).await?;

    let current = repo::get_balance(db, owner_id)
        .await?
        .map(|r| r.into_balance())
        .unwrap_or_else(|| initial_balance(owner_id));

    let updated = if validate_balance_consistency(&current) {
        let delta = match kind {
            MovementKind::Debt => total_amount,
            MovementKind::Income | MovementKind::Expense => value,
        };
        apply_incremental_update(&current, delta, kind)
    } else {
        // A drifted stored balance is rebuilt from the rows, which already
        // include the movement inserted above.
        tracing::warn!(owner_id = %owner_id, "stored balance inconsistent, rebuilding from movements");
        let rows = repo::list_recent_by_owner(db, owner_id).await?;
        compute_balance_from_rows(&rows, owner_id)
    };
    repo::upsert_balance(db, &updated).await?;

    Ok((row, updated))
}

/// Groups movements under friendly date labels, relative to the current UTC
/// date.
pub fn group_movements_by_date(movements: &[Movement]) -> Vec<MovementGroup> {
    group_movements_relative_to(movements, OffsetDateTime::now_utc().date())
}

/// Grouping core, parameterized over "today" so it can be tested against a
/// fixed date. Groups appear in first-seen order, not chronologically sorted.
pub fn group_movements_relative_to(movements: &[Movement], today: Date) -> Vec<MovementGroup> {
    let date_format = format_description!("[day]/[month]/[year]");
    let yesterday = today.previous_day();
    let mut groups: Vec<MovementGroup> = Vec::new();

    for movement in movements {
        let label = match parse_rfc3339(&movement.created_at) {
            Some(ts) => {
                let date = ts.date();
                if date == today {
                    "Today".to_string()
                } else if Some(date) == yesterday {
                    "Yesterday".to_string()
                } else {
                    date.format(&date_format)
                        .unwrap_or_else(|_| UNKNOWN_DATE_LABEL.to_string())
                }
            }
            None => UNKNOWN_DATE_LABEL.to_string(),
        };

        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.movements.push(movement.clone()),
            None => groups.push(MovementGroup {
                label,
                movements: vec![movement.clone()],
            }),
        }
    }

    groups
}
