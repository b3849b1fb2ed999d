//! Demo configuration from `.env` and the process environment

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use simplelog::LevelFilter;

/// Settings for one demo run.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// `ANIMORA_LOG_LEVEL`, default `debug`.
    pub log_level: LevelFilter,
    /// `ANIMORA_LOG_FILE`, default `animora-demo.log`.
    pub log_file: PathBuf,
    /// `ANIMORA_PAGE_SIZE`, default 5.
    pub page_size: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Debug,
            log_file: PathBuf::from("animora-demo.log"),
            page_size: 5,
        }
    }
}

impl DemoConfig {
    /// Loads `.env` if present, then reads the `ANIMORA_*` variables.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            log_level: parse_var("ANIMORA_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: env::var_os("ANIMORA_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            page_size: parse_var("ANIMORA_PAGE_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.page_size),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
