use std::num::ParseIntError;

use chrono::{DateTime, Duration, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::schemas::{Expense, Participant};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_WINDOW_SECS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParticipantSnapshot {
    pub name: Participant,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "item", rename_all = "lowercase")]
pub enum Snapshot {
    Expense(Expense),
    Participant(ParticipantSnapshot),
}

/// A removed value handed back to the client, valid until `expires_at`.
/// `signature` is an HMAC-SHA256 over both, in hex.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UndoToken {
    pub snapshot: Snapshot,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub signature: String,
}

impl UndoToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Issues and checks undo tokens. The server keeps nothing else: a token is
/// redeemable exactly when its signature matches and its window is open.
#[derive(Clone)]
pub struct UndoSigner {
    mac: HmacSha256,
    window: Duration,
}

impl UndoSigner {
    pub fn new(secret: &str, window: Duration) -> Result<Self, InvalidLength> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let key = hasher.finalize();
        Ok(Self {
            mac: HmacSha256::new_from_slice(&key)?,
            window,
        })
    }

    pub fn issue(&self, snapshot: Snapshot, now: DateTime<Utc>) -> UndoToken {
        let expires_at = now + self.window;
        let mut mac = self.mac.clone();
        mac.update(&signed_bytes(&snapshot, expires_at));
        let signature = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        UndoToken {
            snapshot,
            expires_at,
            signature,
        }
    }

    /// Gives back the snapshot of a token this signer issued, if its window
    /// is still open at `now`.
    pub fn redeem(&self, token: UndoToken, now: DateTime<Utc>) -> Result<Snapshot, ApiError> {
        let signature = decode_hex(&token.signature).map_err(|_| ApiError::UndoRejected)?;
        let mut mac = self.mac.clone();
        mac.update(&signed_bytes(&token.snapshot, token.expires_at));
        mac.verify_slice(&signature)
            .map_err(|_| ApiError::UndoRejected)?;
        if token.is_expired(now) {
            return Err(ApiError::UndoExpired);
        }
        Ok(token.snapshot)
    }
}

// Amounts go in as exact decimal text so the bytes do not depend on how the
// client echoed the JSON numbers back.
fn signed_bytes(snapshot: &Snapshot, expires_at: DateTime<Utc>) -> Vec<u8> {
    let item = match snapshot {
        Snapshot::Expense(expense) => json!(["expense", expense_fields(expense)]),
        Snapshot::Participant(ParticipantSnapshot { name, expenses }) => {
            let expenses: Vec<_> = expenses.iter().map(expense_fields).collect();
            json!(["participant", name, expenses])
        }
    };
    json!([item, expires_at.timestamp_micros()])
        .to_string()
        .into_bytes()
}

fn expense_fields(expense: &Expense) -> serde_json::Value {
    json!([
        expense.id,
        expense.payer,
        expense.amount.normalize().to_string(),
        expense.description,
        expense.date,
    ])
}

fn decode_hex(text: &str) -> Result<Vec<u8>, ParseIntError> {
    text.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(&String::from_utf8_lossy(pair), 16))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> Snapshot {
        Snapshot::Expense(Expense {
            id: "e1".to_string(),
            payer: "A".to_string(),
            amount: dec!(10),
            description: "X".to_string(),
            date: None,
        })
    }

    fn signer() -> UndoSigner {
        UndoSigner::new("secret", Duration::seconds(DEFAULT_WINDOW_SECS)).unwrap()
    }

    #[test]
    fn redeem_within_window() {
        let now = Utc::now();
        let token = signer().issue(snapshot(), now);
        assert_eq!(token.signature.len(), 64);
        assert!(!token.is_expired(now + Duration::seconds(DEFAULT_WINDOW_SECS)));
        assert_eq!(signer().redeem(token, now + Duration::seconds(3)).unwrap(), snapshot());
    }

    #[test]
    fn redeem_after_window() {
        let now = Utc::now();
        let token = signer().issue(snapshot(), now);
        assert!(matches!(
            signer().redeem(token, now + Duration::seconds(8)),
            Err(ApiError::UndoExpired)
        ));
    }

    #[test]
    fn extended_expiry_is_rejected() {
        let now = Utc::now();
        let mut token = signer().issue(snapshot(), now);
        token.expires_at = now + Duration::days(365);
        assert!(matches!(
            signer().redeem(token, now + Duration::seconds(8)),
            Err(ApiError::UndoRejected)
        ));
    }

    #[test]
    fn edited_snapshot_is_rejected() {
        let now = Utc::now();
        let mut token = signer().issue(snapshot(), now);
        if let Snapshot::Expense(expense) = &mut token.snapshot {
            expense.amount = dec!(-500);
        }
        assert!(matches!(signer().redeem(token, now), Err(ApiError::UndoRejected)));
    }

    #[test]
    fn other_secret_or_bad_hex_is_rejected() {
        let now = Utc::now();
        let token = signer().issue(snapshot(), now);
        let stranger = UndoSigner::new("other", Duration::seconds(DEFAULT_WINDOW_SECS)).unwrap();
        assert!(matches!(stranger.redeem(token.clone(), now), Err(ApiError::UndoRejected)));

        let mut garbled = token;
        garbled.signature = "zz".to_string();
        assert!(matches!(signer().redeem(garbled, now), Err(ApiError::UndoRejected)));
    }

    #[test]
    fn survives_a_json_round_trip() {
        let now = Utc::now();
        let token = signer().issue(
            Snapshot::Expense(Expense {
                id: "e2".to_string(),
                payer: "B".to_string(),
                amount: dec!(12.35),
                description: "taxi".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2025, 1, 2),
            }),
            now,
        );
        let echoed: UndoToken =
            serde_json::from_str(&serde_json::to_string(&token).unwrap()).unwrap();
        assert!(signer().redeem(echoed, now).is_ok());
    }

    #[test]
    fn snapshot_wire_format() {
        let participant = Snapshot::Participant(ParticipantSnapshot {
            name: "P1".to_string(),
            expenses: vec![],
        });
        assert_eq!(
            serde_json::to_value(&participant).unwrap(),
            json!({ "type": "participant", "item": { "name": "P1", "expenses": [] } })
        );
        let parsed: Snapshot =
            serde_json::from_value(json!({ "type": "participant", "item": { "name": "P1" } })).unwrap();
        assert_eq!(parsed, participant);
    }
}
