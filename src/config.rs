use anyhow::{Context, Result};
use std::time::Duration;

/// Employers fetched when EMPLOYER_IDS is not set: a handful of large
/// hh.ru companies with steady vacancy volume.
const DEFAULT_EMPLOYER_IDS: [i64; 10] = [
    1740,    // Yandex
    3529,    // Sber
    78638,   // T-Bank
    15478,   // VK
    2180,    // Ozon
    3776,    // MTS
    2748,    // Rostelecom
    1057,    // Kaspersky
    87021,   // Wildberries
    80,      // Alfa-Bank
];

/// Runtime configuration, read once from the environment in `main` and
/// passed to each component explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_name: String,
    pub employer_ids: Vec<i64>,
    pub base_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_name =
            std::env::var("DATABASE_NAME").unwrap_or_else(|_| "vacdb".to_string());

        let employer_ids = match std::env::var("EMPLOYER_IDS") {
            Ok(raw) => parse_id_list(&raw)
                .context("invalid EMPLOYER_IDS (expected comma-separated integers)")?,
            Err(_) => DEFAULT_EMPLOYER_IDS.to_vec(),
        };

        let base_url =
            std::env::var("HH_BASE_URL").unwrap_or_else(|_| "https://api.hh.ru".to_string());

        let timeout_secs: u64 = match std::env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid HTTP_TIMEOUT_SECS: {raw}"))?,
            Err(_) => 10,
        };

        Ok(Self {
            database_name,
            employer_ids,
            base_url,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().with_context(|| format!("bad id: {s}")))
        .collect()
}
