use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;

use groupsplit::routes::{self, AppState};
use groupsplit::settings::{self, Settings};
use groupsplit::store::Store;
use groupsplit::undo::UndoSigner;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "groupsplit={level},actix_web={level}",
            level = settings.app.level
        ))
        .init();

    let store = match &settings.store {
        settings::Store::Memory { ledger } => {
            tracing::warn!("using the in-memory store, data is lost on exit");
            Store::memory(ledger)
        }
        settings::Store::Mongo {
            uri,
            database,
            ledger,
        } => {
            tracing::info!(%database, %ledger, "connecting to MongoDB");
            Store::mongo(uri, database, ledger).await?
        }
    };

    let secret = match &settings.server.undo_secret {
        Some(secret) => secret.clone(),
        None => uuid::Uuid::new_v4().to_string(),
    };
    let undo = UndoSigner::new(&secret, Duration::seconds(settings.server.undo_window_secs))
        .map_err(|err| format!("undo secret: {err}"))?;
    let state = web::Data::new(AppState { store, undo });

    let addr = (settings.server.bind.clone(), settings.server.port);
    tracing::info!("listening on {}:{}", addr.0, addr.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
