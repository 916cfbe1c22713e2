//! Handles settings for the application. Configuration is read from an
//! optional `seisan.toml` and from `SEISAN__*` environment variables, e.g.
//! `SEISAN__APP__LEVEL=debug`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "./seisan.db"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "seisan";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./seisan.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    /// Load the settings file at `path` (without extension is fine) when it
    /// exists, then apply the environment on top.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SEISAN").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = from_toml("");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./seisan.db?mode=rwc");
    }

    #[test]
    fn sqlite_path_and_level() {
        let settings = from_toml(
            r#"
            [app]
            level = "debug"

            [database]
            sqlite = "/tmp/trip.db"
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database, Database::Sqlite("/tmp/trip.db".to_string()));
    }

    #[test]
    fn memory_database() {
        let settings = from_toml(r#"database = "memory""#);
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.database.url(), "sqlite::memory:");
    }
}
