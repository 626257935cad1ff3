use uuid::Uuid;

use crate::error::ApiError;
use crate::money::{check_amount, parse_amount};
use crate::report::{compute_report, Report};
use crate::schemas::{
    parse_date, EventSettings, Expense, ExpenseDraft, ExpensePatch, Ledger, Participant,
    SettingsPatch,
};
use crate::undo::{ParticipantSnapshot, Snapshot};

impl Ledger {
    fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|participant| participant == name)
    }

    fn check_payer(&self, payer: &str) -> Result<(), ApiError> {
        if self.has_participant(payer) {
            Ok(())
        } else {
            Err(ApiError::PayerNotParticipant)
        }
    }

    /// Replaces the participant list. Names are trimmed, blanks and repeats
    /// dropped; expenses of anyone no longer listed go away.
    pub fn set_participants(&mut self, names: Vec<String>) -> &[Participant] {
        let mut participants: Vec<Participant> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if !name.is_empty() && !participants.iter().any(|known| known == name) {
                participants.push(name.to_string());
            }
        }
        self.participants = participants;
        let participants = &self.participants;
        self.expenses
            .retain(|expense| participants.contains(&expense.payer));
        &self.participants
    }

    pub fn add_participant(&mut self, name: &str) -> Result<&[Participant], ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidPayload("name required".to_string()));
        }
        if self.has_participant(name) {
            return Err(ApiError::AlreadyExists(name.to_string()));
        }
        self.participants.push(name.to_string());
        Ok(&self.participants)
    }

    pub fn rename_participant(&mut self, old: &str, new: &str) -> Result<&[Participant], ApiError> {
        let new = new.trim();
        if old.is_empty() || new.is_empty() {
            return Err(ApiError::InvalidPayload("old and new required".to_string()));
        }
        let Some(slot) = self.participants.iter().position(|name| name == old) else {
            return Err(ApiError::NotFound(old.to_string()));
        };
        if new == old || self.has_participant(new) {
            return Err(ApiError::AlreadyExists(new.to_string()));
        }
        self.participants[slot] = new.to_string();
        for expense in self.expenses.iter_mut().filter(|expense| expense.payer == old) {
            expense.payer = new.to_string();
        }
        Ok(&self.participants)
    }

    /// Removes a participant and every expense they paid.
    pub fn remove_participant(&mut self, name: &str) -> Result<Snapshot, ApiError> {
        if !self.has_participant(name) {
            return Err(ApiError::NotFound(name.to_string()));
        }
        self.participants.retain(|participant| participant != name);
        let (removed, kept): (Vec<Expense>, Vec<Expense>) = std::mem::take(&mut self.expenses)
            .into_iter()
            .partition(|expense| expense.payer == name);
        self.expenses = kept;
        Ok(Snapshot::Participant(ParticipantSnapshot {
            name: name.to_string(),
            expenses: removed,
        }))
    }

    pub fn add_expense(&mut self, draft: ExpenseDraft) -> Result<&Expense, ApiError> {
        self.check_payer(&draft.payer)?;
        let amount = parse_amount(&draft.amount)?;
        let date = match draft.date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => None,
        };
        self.expenses.push(Expense {
            id: Uuid::new_v4().to_string(),
            payer: draft.payer,
            amount,
            description: draft.description,
            date,
        });
        Ok(&self.expenses[self.expenses.len() - 1])
    }

    /// Applies the fields present in `patch`; nothing changes if any of them
    /// is invalid.
    pub fn update_expense(&mut self, id: &str, patch: ExpensePatch) -> Result<&Expense, ApiError> {
        let slot = self
            .expenses
            .iter()
            .position(|expense| expense.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;

        let mut updated = self.expenses[slot].clone();
        if let Some(payer) = patch.payer {
            updated.payer = payer;
        }
        if let Some(amount) = patch.amount {
            updated.amount = parse_amount(&amount)?;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(date) = patch.date {
            updated.date = parse_date(&date)?;
        }
        self.check_payer(&updated.payer)?;

        self.expenses[slot] = updated;
        Ok(&self.expenses[slot])
    }

    pub fn remove_expense(&mut self, id: &str) -> Result<Expense, ApiError> {
        let slot = self
            .expenses
            .iter()
            .position(|expense| expense.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        Ok(self.expenses.remove(slot))
    }

    /// Puts back a value removed earlier, keeping its original ids.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), ApiError> {
        match snapshot {
            Snapshot::Expense(expense) => {
                if expense.id.is_empty() {
                    return Err(ApiError::InvalidItem("missing id".to_string()));
                }
                if self.expenses.iter().any(|known| known.id == expense.id) {
                    return Err(ApiError::AlreadyExists(expense.id));
                }
                self.check_payer(&expense.payer)?;
                check_amount(expense.amount)?;
                self.expenses.push(expense);
            }
            Snapshot::Participant(ParticipantSnapshot { name, expenses }) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ApiError::InvalidItem("missing name".to_string()));
                }
                if let Some(foreign) = expenses.iter().find(|expense| expense.payer != name) {
                    return Err(ApiError::InvalidItem(format!(
                        "expense {} is not paid by {name}",
                        foreign.id
                    )));
                }
                for expense in &expenses {
                    check_amount(expense.amount)?;
                }
                if !self.has_participant(name) {
                    self.participants.push(name.to_string());
                }
                for expense in expenses {
                    if !self.expenses.iter().any(|known| known.id == expense.id) {
                        self.expenses.push(expense);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> EventSettings {
        EventSettings {
            event: self.event.clone(),
            currency: self.currency.clone(),
        }
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> EventSettings {
        if let Some(event) = patch.event {
            self.event = event;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        self.settings()
    }

    pub fn report(&self) -> Result<Report, ApiError> {
        Ok(compute_report(&self.participants, &self.expenses)?)
    }
}
