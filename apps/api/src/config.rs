use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Directory holding the CSV tables.
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Technician served by `GET /work-orders`.
    pub default_tech_name: String,
    pub rust_log: String,
}

/// The subset of configuration that is safe to expose over `GET /config`.
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    pub defaults: PublicDefaults,
    pub api: PublicApi,
    pub database: PublicDatabase,
    pub llm: PublicLlm,
}

#[derive(Debug, Serialize)]
pub struct PublicDefaults {
    pub tech_name: String,
}

#[derive(Debug, Serialize)]
pub struct PublicApi {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct PublicDatabase {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data_dir: String,
}

#[derive(Debug, Serialize)]
pub struct PublicLlm {
    pub model: &'static str,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "Database".to_string()),
            ),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            default_tech_name: std::env::var("DEFAULT_TECH_NAME").unwrap_or_default(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn public_view(&self, model: &'static str) -> PublicConfig {
        PublicConfig {
            defaults: PublicDefaults {
                tech_name: self.default_tech_name.clone(),
            },
            api: PublicApi {
                host: self.host.clone(),
                port: self.port,
            },
            database: PublicDatabase {
                kind: "csv",
                data_dir: self.data_dir.display().to_string(),
            },
            llm: PublicLlm { model },
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_hides_api_key() {
        let config = Config {
            anthropic_api_key: "sk-secret".to_string(),
            data_dir: PathBuf::from("Database"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            default_tech_name: "Jane Doe".to_string(),
            rust_log: "info".to_string(),
        };
        let json = serde_json::to_string(&config.public_view("claude-sonnet-4-5")).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"type\":\"csv\""));
        assert!(json.contains("Jane Doe"));
    }
}
