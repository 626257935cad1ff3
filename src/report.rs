use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::{compute_balances, Summary};
use crate::error::SettleError;
use crate::exchange::{compute_payments, Payment};
use crate::money::serialize_cents;
use crate::schemas::{Expense, Participant};

/// Settlement report for one snapshot of participants and expenses.
///
/// Amounts keep full precision; serializing rounds them to cents.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    #[serde(serialize_with = "serialize_cents")]
    pub total: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub per_head: Decimal,
    pub summary: Summary,
    pub payments: Vec<Payment>,
}

pub fn compute_report(
    participants: &[Participant],
    expenses: &[Expense],
) -> Result<Report, SettleError> {
    let balances = compute_balances(participants, expenses)?;
    let payments = compute_payments(&balances.summary)?;
    Ok(Report {
        total: balances.total,
        per_head: balances.per_head,
        summary: balances.summary,
        payments,
    })
}
