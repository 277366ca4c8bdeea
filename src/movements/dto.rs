use serde::{Deserialize, Serialize};

use crate::movements::balance::Balance;
use crate::movements::services::{Movement, MovementGroup};

/// Request body for adding a movement. Debt fields default to zero so income
/// and expense clients can omit them.
#[derive(Debug, Deserialize)]
pub struct NewMovementRequest {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub monthly_payment: f64,
    #[serde(default)]
    pub term_months: i64,
}

/// The movement listing: current balance plus the date-grouped movements the
/// page renders.
#[derive(Debug, Serialize)]
pub struct MovementsResponse {
    pub balance: Balance,
    pub groups: Vec<MovementGroup>,
}

#[derive(Debug, Serialize)]
pub struct CreatedMovementResponse {
    pub movement: Movement,
    pub balance: Balance,
}
