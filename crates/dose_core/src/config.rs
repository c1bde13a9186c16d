use std::path::PathBuf;

use anyhow::Result;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::projector::REFERENCE_TIMEZONE;

pub const HISTORY_DIR_VAR: &str = "DOSE_HISTORY_DIR";
pub const TIMEZONE_VAR: &str = "DOSE_TIMEZONE";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub history_dir: PathBuf,
    pub timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; unset or blank values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup(HISTORY_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.history_dir = PathBuf::from(dir.trim());
            info!(path = %config.history_dir.display(), "using history directory");
        }
        if let Some(name) = lookup(TIMEZONE_VAR).filter(|v| !v.trim().is_empty()) {
            match name.trim().parse::<Tz>() {
                Ok(tz) => config.timezone = tz,
                Err(err) => warn!(%name, %err, "ignoring unknown timezone"),
            }
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(".dose-history"),
            timezone: REFERENCE_TIMEZONE,
        }
    }
}
