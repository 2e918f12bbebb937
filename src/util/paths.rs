// Copyright (c) 2024 Mike Tsao. All rights reserved.

use app_dirs2::{get_app_root, AppDataType, AppInfo};
use std::path::PathBuf;

/// Where the router keeps its files.
///
/// Everything lives under the per-user config directory, e.g.
/// `~/.config/midi-router/` on Linux.
#[derive(Debug)]
pub struct Paths {}
impl Paths {
    const APP_INFO: AppInfo = AppInfo {
        name: "midi-router",
        author: "Ensnare",
    };
    const SETTINGS_FILENAME: &'static str = "settings.json";
    const ROUTES_FILENAME: &'static str = "routes.json";

    /// The per-user config directory, or the current directory if the
    /// platform doesn't have one.
    pub fn config_dir() -> PathBuf {
        get_app_root(AppDataType::UserConfig, &Self::APP_INFO).unwrap_or_else(|e| {
            log::warn!("Couldn't find a config directory ({e}); using the current directory");
            PathBuf::from(".")
        })
    }

    #[allow(missing_docs)]
    pub fn settings_path() -> PathBuf {
        Self::config_dir().join(Self::SETTINGS_FILENAME)
    }

    /// The default home of the stored routes.
    pub fn routes_path() -> PathBuf {
        Self::config_dir().join(Self::ROUTES_FILENAME)
    }
}
