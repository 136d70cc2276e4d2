use std::path::PathBuf;

use anyhow::{Context, Result};

/// Where the evaluation data lives and which running service to replay it
/// against. Read from the same `.env` as the service.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Base URL of a running field-services API.
    pub api_url: String,
    /// Labeled datasets and result files.
    pub eval_dir: PathBuf,
    /// The service's CSV tables, for work order metadata.
    pub data_dir: PathBuf,
    /// Used for similarity grading and simulated technician answers. Without
    /// it every similarity scores 0.
    pub anthropic_api_key: Option<String>,
    pub rust_log: String,
}

impl EvalConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = match std::env::var("EVALS_API_URL") {
            Ok(url) => url,
            Err(_) => {
                let host = std::env::var("HOST").unwrap_or_else(|_| "localhost".to_string());
                let port = std::env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?;
                service_url(&host, port)
            }
        };

        Ok(EvalConfig {
            api_url,
            eval_dir: PathBuf::from(
                std::env::var("EVALS_DIR").unwrap_or_else(|_| "Data/test_data".to_string()),
            ),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "Database".to_string()),
            ),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// The service binds `0.0.0.0`; clients reach it on localhost.
fn service_url(host: &str, port: u16) -> String {
    let host = if host == "0.0.0.0" { "localhost" } else { host };
    format!("http://{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_bind_maps_to_localhost() {
        assert_eq!(service_url("0.0.0.0", 8000), "http://localhost:8000");
        assert_eq!(service_url("10.0.0.5", 9000), "http://10.0.0.5:9000");
    }
}
