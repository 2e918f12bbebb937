// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Persistent program settings. Routes are not settings; they live in their
//! own store (see [crate::storage]).

use super::Paths;
use crate::activity::ActivityLog;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Tracks whether a settings struct has unsaved changes.
pub trait HasSettings {
    /// Whether the struct matches what's on disk.
    fn has_been_saved(&self) -> bool;

    /// Marks the struct as changed since the last save.
    fn needs_save(&mut self);

    /// Marks the struct as matching what's on disk.
    fn mark_clean(&mut self);
}

/// Contains persistent router settings.
#[derive(Debug, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub struct RouterSettings {
    /// How many lines the activity log keeps.
    #[serde(default = "RouterSettings::default_log_capacity")]
    #[derivative(Default(value = "ActivityLog::DEFAULT_CAPACITY"))]
    log_capacity: usize,

    /// How often the hardware backend looks for connected and disconnected
    /// ports.
    #[serde(default = "RouterSettings::default_poll_interval_ms")]
    #[derivative(Default(value = "500"))]
    poll_interval_ms: u64,

    /// Overrides where routes are stored.
    #[serde(default)]
    routes_path: Option<PathBuf>,

    #[serde(skip)]
    has_been_saved: bool,
}
impl HasSettings for RouterSettings {
    fn has_been_saved(&self) -> bool {
        self.has_been_saved
    }

    fn needs_save(&mut self) {
        self.has_been_saved = false;
    }

    fn mark_clean(&mut self) {
        self.has_been_saved = true;
    }
}
impl RouterSettings {
    fn default_log_capacity() -> usize {
        ActivityLog::DEFAULT_CAPACITY
    }

    fn default_poll_interval_ms() -> u64 {
        500
    }

    /// Loads settings from the default location, falling back to defaults if
    /// the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let path = Paths::settings_path();
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!("Using default settings: {e}");
                Self::default()
            }
        }
    }

    /// Loads settings from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        log::debug!("Loading settings from {path:?}");
        let mut contents = String::new();
        let mut file = File::open(path)
            .map_err(|e| anyhow::format_err!("Couldn't open {path:?}: {}", e))?;
        file.read_to_string(&mut contents)
            .map_err(|e| anyhow::format_err!("Couldn't read {path:?}: {}", e))?;
        let mut settings: Self = serde_json::from_str(&contents)
            .map_err(|e| anyhow::format_err!("Couldn't parse {path:?}: {}", e))?;
        settings.mark_clean();
        Ok(settings)
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save(&mut self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self)
            .map_err(|_| anyhow::format_err!("Unable to serialize settings JSON"))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                anyhow::format_err!("Unable to create {path:?} parent directories: {}", e)
            })?;
        }
        let mut file = File::create(path)
            .map_err(|e| anyhow::format_err!("Unable to create {path:?}: {}", e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| anyhow::format_err!("Unable to write {path:?}: {}", e))?;

        self.mark_clean();
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    #[allow(missing_docs)]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Where routes are stored: the override if set, otherwise the default.
    pub fn routes_path(&self) -> PathBuf {
        self.routes_path.clone().unwrap_or_else(Paths::routes_path)
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_log_capacity(&mut self, log_capacity: usize) {
        if log_capacity != self.log_capacity {
            self.log_capacity = log_capacity;
            self.needs_save();
        }
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        let poll_interval_ms = interval.as_millis() as u64;
        if poll_interval_ms != self.poll_interval_ms {
            self.poll_interval_ms = poll_interval_ms;
            self.needs_save();
        }
    }

    /// Updates the field and marks the struct eligible to save.
    pub fn set_routes_path(&mut self, routes_path: Option<PathBuf>) {
        if routes_path != self.routes_path {
            self.routes_path = routes_path;
            self.needs_save();
        }
    }
}
