use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::schemas::{ExpenseDraft, ExpensePatch, SettingsPatch};
use crate::store::Store;
use crate::undo::{Snapshot, UndoSigner, UndoToken};

pub struct AppState {
    pub store: Store,
    pub undo: UndoSigner,
}

#[derive(Deserialize)]
struct NamesJson {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Deserialize)]
struct NameJson {
    name: String,
}

#[derive(Deserialize)]
struct RenameJson {
    #[serde(default)]
    old: String,
    #[serde(default)]
    new: String,
}

#[derive(Serialize)]
struct Reply<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

fn ok<T: Serialize>(body: T) -> HttpResponse {
    HttpResponse::Ok().json(Reply { ok: true, body })
}

#[get("/api/data")]
async fn get_data(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ledger = state.store.load().await?;
    Ok(HttpResponse::Ok().json(ledger))
}

#[post("/api/participants")]
async fn set_participants(
    state: web::Data<AppState>,
    json: web::Json<NamesJson>,
) -> Result<HttpResponse, ApiError> {
    let names = json.into_inner().names;
    let participants = state
        .store
        .update(|ledger| Ok(ledger.set_participants(names).to_vec()))
        .await?;
    tracing::info!(count = participants.len(), "participants replaced");
    Ok(ok(json!({ "participants": participants })))
}

#[post("/api/participant")]
async fn add_participant(
    state: web::Data<AppState>,
    json: web::Json<NameJson>,
) -> Result<HttpResponse, ApiError> {
    let name = json.into_inner().name;
    let participants = state
        .store
        .update(|ledger| ledger.add_participant(&name).map(<[_]>::to_vec))
        .await?;
    tracing::info!(name = name.trim(), "participant added");
    Ok(ok(json!({ "participants": participants })))
}

#[post("/api/participants/rename")]
async fn rename_participant(
    state: web::Data<AppState>,
    json: web::Json<RenameJson>,
) -> Result<HttpResponse, ApiError> {
    let RenameJson { old, new } = json.into_inner();
    let participants = state
        .store
        .update(|ledger| ledger.rename_participant(&old, &new).map(<[_]>::to_vec))
        .await?;
    tracing::info!(%old, %new, "participant renamed");
    Ok(ok(json!({ "participants": participants })))
}

#[delete("/api/participant/{name}")]
async fn delete_participant(
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let name = name.into_inner();
    let (snapshot, participants) = state
        .store
        .update(|ledger| {
            let snapshot = ledger.remove_participant(&name)?;
            Ok((snapshot, ledger.participants.clone()))
        })
        .await?;
    tracing::info!(%name, "participant deleted");
    Ok(ok(json!({
        "participants": participants,
        "undo": state.undo.issue(snapshot, Utc::now()),
    })))
}

#[post("/api/expense")]
async fn add_expense(
    state: web::Data<AppState>,
    draft: web::Json<ExpenseDraft>,
) -> Result<HttpResponse, ApiError> {
    let draft = draft.into_inner();
    let expense = state
        .store
        .update(|ledger| ledger.add_expense(draft).cloned())
        .await?;
    tracing::info!(id = %expense.id, payer = %expense.payer, "expense added");
    Ok(ok(json!({ "expense": expense })))
}

#[put("/api/expense/{id}")]
async fn edit_expense(
    state: web::Data<AppState>,
    id: web::Path<String>,
    patch: web::Json<ExpensePatch>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let patch = patch.into_inner();
    let expense = state
        .store
        .update(|ledger| ledger.update_expense(&id, patch).cloned())
        .await?;
    tracing::info!(%id, "expense updated");
    Ok(ok(json!({ "expense": expense })))
}

#[delete("/api/expense/{id}")]
async fn delete_expense(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let removed = state
        .store
        .update(|ledger| ledger.remove_expense(&id))
        .await?;
    tracing::info!(%id, "expense deleted");
    Ok(ok(json!({ "undo": state.undo.issue(Snapshot::Expense(removed), Utc::now()) })))
}

#[post("/api/restore")]
async fn restore(
    state: web::Data<AppState>,
    token: web::Json<UndoToken>,
) -> Result<HttpResponse, ApiError> {
    let snapshot = state
        .undo
        .redeem(token.into_inner(), Utc::now())
        .inspect_err(|err| tracing::warn!("restore refused: {err}"))?;
    let expense = match &snapshot {
        Snapshot::Expense(expense) => Some(expense.clone()),
        Snapshot::Participant(_) => None,
    };
    let participants = state
        .store
        .update(|ledger| {
            ledger.restore(snapshot)?;
            Ok(ledger.participants.clone())
        })
        .await?;
    tracing::info!("deletion undone");
    Ok(match expense {
        Some(expense) => ok(json!({ "expense": expense })),
        None => ok(json!({ "participants": participants })),
    })
}

#[get("/api/settings")]
async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ledger = state.store.load().await?;
    Ok(ok(json!({ "settings": ledger.settings() })))
}

#[post("/api/settings")]
async fn update_settings(
    state: web::Data<AppState>,
    patch: web::Json<SettingsPatch>,
) -> Result<HttpResponse, ApiError> {
    let patch = patch.into_inner();
    let settings = state
        .store
        .update(|ledger| Ok(ledger.update_settings(patch)))
        .await?;
    Ok(ok(json!({ "settings": settings })))
}

#[get("/api/report")]
async fn report(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ledger = state.store.load().await?;
    let report = ledger.report().inspect_err(|err| {
        tracing::warn!("report failed: {err}");
    })?;
    Ok(ok(report))
}

/// Registers every endpoint; malformed JSON bodies answer in the same
/// `{ok: false, error}` shape as the other failures.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        ApiError::InvalidPayload(err.to_string()).into()
    }))
    .service(get_data)
    .service(set_participants)
    .service(add_participant)
    .service(rename_participant)
    .service(delete_participant)
    .service(add_expense)
    .service(edit_expense)
    .service(delete_expense)
    .service(restore)
    .service(get_settings)
    .service(update_settings)
    .service(report);
}
