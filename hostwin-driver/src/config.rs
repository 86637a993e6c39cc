//! Driver settings.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::DriverError;

/// Tunables read at driver start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// How long each wait for the first desktop size may take.
    pub desktop_wait_ms: u64,
    /// Screen size assumed before the host reports one. Zero means unknown,
    /// and desktop creation waits for the host.
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            desktop_wait_ms: 2000,
            screen_width: 0,
            screen_height: 0,
        }
    }
}

impl DriverConfig {
    pub fn from_json(text: &str) -> Result<Self, DriverError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Defaults overridden by `HOSTWIN_DESKTOP_WAIT_MS`,
    /// `HOSTWIN_SCREEN_WIDTH` and `HOSTWIN_SCREEN_HEIGHT`.
    pub fn from_env() -> Result<Self, DriverError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DriverError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "HOSTWIN_DESKTOP_WAIT_MS")? {
            config.desktop_wait_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "HOSTWIN_SCREEN_WIDTH")? {
            config.screen_width = v;
        }
        if let Some(v) = parse_var(&lookup, "HOSTWIN_SCREEN_HEIGHT")? {
            config.screen_height = v;
        }
        Ok(config)
    }

    pub fn desktop_wait(&self) -> Duration {
        Duration::from_millis(self.desktop_wait_ms)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, DriverError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DriverError::InvalidEnv { name, value }),
    }
}
