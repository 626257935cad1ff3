use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::undo::DEFAULT_WINDOW_SECS;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub undo_window_secs: i64,
    // Key for undo token signatures; a random one is drawn per run when unset.
    pub undo_secret: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Store {
    Memory {
        ledger: String,
    },
    Mongo {
        uri: String,
        database: String,
        ledger: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub store: Store,
}

impl Settings {
    // Defaults, then `settings.toml`, then `GROUPSPLIT__SECTION__KEY`.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_sources(std::env::var("MONGODB_URI").ok())
    }

    fn from_sources(mongodb_uri: Option<String>) -> Result<Self, ConfigError> {
        let mongo_kind = mongodb_uri.as_ref().map(|_| "mongo");
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 5000_i64)?
            .set_default("server.undo_window_secs", DEFAULT_WINDOW_SECS)?
            .set_default("store.kind", "memory")?
            .set_default("store.database", "GroupSplit")?
            .set_default("store.ledger", "default")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("GROUPSPLIT").separator("__"))
            .set_override_option("store.kind", mongo_kind)?
            .set_override_option("store.uri", mongodb_uri)?
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_memory_store() {
        let settings = Settings::from_sources(None).unwrap();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.undo_window_secs, 7);
        assert_eq!(settings.server.undo_secret, None);
        assert_eq!(
            settings.store,
            Store::Memory {
                ledger: "default".to_string()
            }
        );
    }

    #[test]
    fn mongodb_uri_selects_mongo() {
        let settings = Settings::from_sources(Some("mongodb://db:27017".to_string())).unwrap();
        assert_eq!(
            settings.store,
            Store::Mongo {
                uri: "mongodb://db:27017".to_string(),
                database: "GroupSplit".to_string(),
                ledger: "default".to_string(),
            }
        );
    }
}
