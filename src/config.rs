use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

const DEFAULT_DATA_PATH: &str = "data/brightspots.csv";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Local survey export read when no override URL is supplied.
    pub data_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let data_path = std::env::var("SURVEY_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT value {:?}: {}", raw, e))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Config { data_path, port })
    }
}
