use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettleError {
    #[error("no participants")]
    NoParticipants,
    #[error("unbalanced ledger: balances leave {residual} unsettled")]
    UnbalancedLedger { residual: Decimal },
    #[error("amounts exceed the supported range")]
    AmountOverflow,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Settle(#[from] SettleError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("\"{0}\" already exists")]
    AlreadyExists(String),
    #[error("payer not in participants")]
    PayerNotParticipant,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid item: {0}")]
    InvalidItem(String),
    #[error("invalid request: {0}")]
    InvalidPayload(String),
    #[error("undo window expired")]
    UndoExpired,
    #[error("undo token rejected")]
    UndoRejected,
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Settle(SettleError::UnbalancedLedger { .. }) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "ok": false,
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;
    use rust_decimal_macros::dec;

    #[test]
    fn not_found_maps_to_404() {
        let res = ApiError::NotFound("x".to_string()).error_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn no_participants_maps_to_400() {
        let err = ApiError::from(SettleError::NoParticipants);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "no participants");
    }

    #[test]
    fn unbalanced_ledger_maps_to_500() {
        let err = ApiError::from(SettleError::UnbalancedLedger { residual: dec!(10) });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejected_undo_maps_to_400() {
        let err = ApiError::UndoRejected;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "undo token rejected");
    }

    #[test]
    fn body_carries_ok_false() {
        let body = ApiError::InvalidAmount
            .error_response()
            .into_body()
            .try_into_bytes()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "ok": false, "error": "invalid amount" }));
    }
}
