use std::sync::Mutex;

use bson::doc;
use mongodb::{options::ReplaceOptions, Client, Collection};
use tokio::sync::Mutex as WriteLock;

use crate::error::ApiError;
use crate::schemas::Ledger;

pub const COLLECTION: &str = "Ledgers";

enum Backend {
    Mongo(Collection<Ledger>),
    Memory(Mutex<Ledger>),
}

pub struct Store {
    ledger_id: String,
    backend: Backend,
    writer: WriteLock<()>,
}

impl Store {
    pub async fn mongo(uri: &str, database: &str, ledger_id: &str) -> Result<Self, ApiError> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client.database(database).collection::<Ledger>(COLLECTION);
        Ok(Self {
            ledger_id: ledger_id.to_string(),
            backend: Backend::Mongo(collection),
            writer: WriteLock::new(()),
        })
    }

    pub fn memory(ledger_id: &str) -> Self {
        Self {
            ledger_id: ledger_id.to_string(),
            backend: Backend::Memory(Mutex::new(Ledger::empty(ledger_id))),
            writer: WriteLock::new(()),
        }
    }

    pub async fn load(&self) -> Result<Ledger, ApiError> {
        match &self.backend {
            Backend::Mongo(collection) => Ok(collection
                .find_one(doc! { "_id": self.ledger_id.as_str() }, None)
                .await?
                .unwrap_or_else(|| Ledger::empty(self.ledger_id.as_str()))),
            Backend::Memory(ledger) => Ok(lock(ledger).clone()),
        }
    }

    async fn save(&self, ledger: &Ledger) -> Result<(), ApiError> {
        match &self.backend {
            Backend::Mongo(collection) => {
                let options = ReplaceOptions::builder().upsert(true).build();
                collection
                    .replace_one(doc! { "_id": ledger.id.as_str() }, ledger, options)
                    .await?;
            }
            Backend::Memory(stored) => *lock(stored) = ledger.clone(),
        }
        Ok(())
    }

    /// Loads the ledger, applies `change` and stores the result. Nothing is
    /// written when `change` fails.
    pub async fn update<T, F>(&self, change: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, ApiError>,
    {
        let _turn = self.writer.lock().await;
        let mut ledger = self.load().await?;
        let outcome = change(&mut ledger)?;
        self.save(&ledger).await?;
        Ok(outcome)
    }
}

// A poisoned lock still holds a whole ledger value.
fn lock(ledger: &Mutex<Ledger>) -> std::sync::MutexGuard<'_, Ledger> {
    ledger
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::ExpenseDraft;
    use serde_json::json;

    #[actix_web::test]
    async fn memory_store_starts_empty() {
        let store = Store::memory("trip");
        assert_eq!(store.load().await.unwrap(), Ledger::empty("trip"));
    }

    #[actix_web::test]
    async fn failed_update_writes_nothing() {
        let store = Store::memory("trip");
        store
            .update(|ledger| {
                ledger.set_participants(vec!["A".to_string()]);
                Ok(())
            })
            .await
            .unwrap();

        let outcome = store
            .update(|ledger| {
                ledger.set_participants(vec![]);
                ledger
                    .add_expense(ExpenseDraft {
                        payer: "A".to_string(),
                        amount: json!(1),
                        description: String::new(),
                        date: None,
                    })
                    .map(|_| ())
            })
            .await;
        assert!(matches!(outcome, Err(ApiError::PayerNotParticipant)));
        assert_eq!(store.load().await.unwrap().participants, ["A"]);
    }
}
