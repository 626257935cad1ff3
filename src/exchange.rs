use rust_decimal::prelude::{Signed, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::Summary;
use crate::error::SettleError;
use crate::money::{checked_sum, is_settled, round_cents, serialize_cents, CENT, EPSILON};
use crate::schemas::Participant;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Payment {
    pub from: Participant,
    pub to: Participant,
    #[serde(serialize_with = "serialize_cents")]
    pub amount: Decimal,
}

#[derive(Clone, Debug)]
struct PersonalBalance {
    id: Participant,
    // Outstanding magnitude, always positive while the entry is alive.
    balance: Decimal,
}

/// Plans the transfers that bring every balance in `summary` back to zero.
///
/// Greedy: the largest debtor pays the largest creditor as much as either
/// can take, ties going to whoever comes first in `summary`. Each step
/// clears at least one side, so `n` participants need at most `n - 1`
/// payments.
pub fn compute_payments(summary: &Summary) -> Result<Vec<Payment>, SettleError> {
    let balances: Vec<Decimal> = summary.iter().map(|(_, entry)| entry.balance).collect();
    let residual = checked_sum(balances.iter().copied()).ok_or(SettleError::AmountOverflow)?;
    if residual.abs() > EPSILON {
        return Err(SettleError::UnbalancedLedger { residual });
    }

    let mut payers = Vec::new();
    let mut receivers = Vec::new();
    for ((id, _), balance) in summary.iter().zip(to_cents(&balances)) {
        if is_settled(balance) {
            continue;
        }
        let person = PersonalBalance {
            id: id.clone(),
            balance: balance.abs(),
        };
        if balance.is_sign_negative() {
            payers.push(person);
        } else {
            receivers.push(person);
        }
    }

    let mut payments = Vec::new();
    while let (Some(p), Some(r)) = (largest(&payers), largest(&receivers)) {
        let amount = round_cents(payers[p].balance.min(receivers[r].balance));
        payments.push(Payment {
            from: payers[p].id.clone(),
            to: receivers[r].id.clone(),
            amount,
        });
        payers[p].balance -= amount;
        receivers[r].balance -= amount;
        if is_settled(payers[p].balance) {
            payers.remove(p);
        }
        if is_settled(receivers[r].balance) {
            receivers.remove(r);
        }
    }

    if !payers.is_empty() || !receivers.is_empty() {
        let owed: Decimal = receivers.iter().map(|person| person.balance).sum();
        let owing: Decimal = payers.iter().map(|person| person.balance).sum();
        return Err(SettleError::UnbalancedLedger {
            residual: owed - owing,
        });
    }
    Ok(payments)
}

// First index holding the maximum, so equal magnitudes keep summary order.
fn largest(people: &[PersonalBalance]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, person) in people.iter().enumerate() {
        match best {
            Some(current) if people[current].balance >= person.balance => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Rounds balances to cents keeping their sum at zero.
///
/// Rounding each balance on its own can leave a few cents of drift. Each
/// drifting cent is taken back from the balance that rounding moved furthest
/// in the drift's direction.
fn to_cents(balances: &[Decimal]) -> Vec<Decimal> {
    let mut rounded: Vec<Decimal> = balances.iter().map(|balance| round_cents(*balance)).collect();
    let drift: Decimal = rounded.iter().copied().sum();
    let steps = (drift / CENT).abs().to_usize().unwrap_or(0);
    if steps == 0 || rounded.is_empty() {
        return rounded;
    }

    let direction = drift.signum();
    let gain = |index: usize| (rounded[index] - balances[index]) * direction;
    let mut order: Vec<usize> = (0..rounded.len()).collect();
    order.sort_by(|a, b| gain(*b).cmp(&gain(*a)));

    for step in 0..steps {
        let index = order[step % order.len()];
        rounded[index] -= CENT * direction;
    }
    rounded
}
