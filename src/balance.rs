use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::error::SettleError;
use crate::money::{checked_sum, serialize_cents};
use crate::schemas::{Expense, Participant};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BalanceEntry {
    #[serde(serialize_with = "serialize_cents")]
    pub paid: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub share: Decimal,
    #[serde(serialize_with = "serialize_cents")]
    pub balance: Decimal,
}

/// Per participant balances, kept in participant order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    entries: Vec<(Participant, BalanceEntry)>,
}

impl Summary {
    pub fn get(&self, participant: &str) -> Option<&BalanceEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == participant)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Participant, &BalanceEntry)> {
        self.entries.iter().map(|(name, entry)| (name, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Participant, BalanceEntry)> for Summary {
    fn from_iter<I: IntoIterator<Item = (Participant, BalanceEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// Serialized as a JSON object whose keys keep participant order.
impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, entry) in &self.entries {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Balances {
    pub total: Decimal,
    pub per_head: Decimal,
    pub summary: Summary,
}

/// Splits every expense equally among the participants.
///
/// Values keep full precision. An expense paid by someone outside
/// `participants` still counts toward `total` but is nobody's `paid`, which
/// leaves the resulting balances short by that amount. Totals beyond the
/// range of [`Decimal`] fail with [`SettleError::AmountOverflow`].
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
) -> Result<Balances, SettleError> {
    let mut paid: Vec<(Participant, Decimal)> = Vec::with_capacity(participants.len());
    let mut index: HashMap<&str, usize> = HashMap::new();
    for participant in participants {
        if !index.contains_key(participant.as_str()) {
            index.insert(participant.as_str(), paid.len());
            paid.push((participant.clone(), Decimal::ZERO));
        }
    }
    if paid.is_empty() {
        return Err(SettleError::NoParticipants);
    }

    let total = checked_sum(expenses.iter().map(|expense| expense.amount))
        .ok_or(SettleError::AmountOverflow)?;
    // Each running `paid` is bounded by the running total, so these adds fit.
    for expense in expenses {
        if let Some(&slot) = index.get(expense.payer.as_str()) {
            paid[slot].1 += expense.amount;
        }
    }

    let per_head = total / Decimal::from(paid.len());
    let summary = paid
        .into_iter()
        .map(|(name, paid)| {
            let entry = BalanceEntry {
                paid,
                share: per_head,
                balance: paid - per_head,
            };
            (name, entry)
        })
        .collect();

    Ok(Balances {
        total,
        per_head,
        summary,
    })
}
