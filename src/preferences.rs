//! User-configured settings, persisted as a JSON file with write-through
//! setters. Read by the tracking core, mutated only through explicit user
//! action pass-through.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::PathBuf,
    sync::RwLock,
};

/// Interval sentinel meaning "10 seconds", used for demos and manual testing.
pub const DEMO_INTERVAL_SENTINEL: i32 = -1;
const DEMO_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PreferenceData {
    show_banner: bool,
    banner_interval_minutes: i32,
    banner_duration_seconds: u32,
    monitored_packages: BTreeSet<String>,
    dark_mode: bool,
}

impl Default for PreferenceData {
    fn default() -> Self {
        Self {
            show_banner: true,
            banner_interval_minutes: 5,
            banner_duration_seconds: 5,
            monitored_packages: BTreeSet::new(),
            dark_mode: false,
        }
    }
}

pub struct UserPreferences {
    path: PathBuf,
    data: RwLock<PreferenceData>,
}

impl UserPreferences {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read preferences from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Preferences file unreadable, using defaults: {err}");
                PreferenceData::default()
            })
        } else {
            PreferenceData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn show_banner(&self) -> bool {
        self.read().show_banner
    }

    pub fn set_show_banner(&self, value: bool) -> Result<()> {
        self.update(|data| data.show_banner = value)
    }

    pub fn banner_interval_minutes(&self) -> i32 {
        self.read().banner_interval_minutes
    }

    pub fn set_banner_interval_minutes(&self, minutes: i32) -> Result<()> {
        self.update(|data| data.banner_interval_minutes = minutes)
    }

    /// Configured banner interval in milliseconds. The `-1` sentinel maps to
    /// a 10-second demo interval.
    pub fn banner_interval_ms(&self) -> u64 {
        let minutes = self.banner_interval_minutes();
        if minutes == DEMO_INTERVAL_SENTINEL {
            debug!("Banner interval: 10 seconds (demo)");
            DEMO_INTERVAL_MS
        } else {
            minutes.max(0) as u64 * 60_000
        }
    }

    pub fn banner_interval_display_text(&self) -> String {
        match self.banner_interval_minutes() {
            DEMO_INTERVAL_SENTINEL => "10 seconds (demo)".to_string(),
            minutes => format!("{minutes} minutes"),
        }
    }

    pub fn banner_duration_seconds(&self) -> u32 {
        self.read().banner_duration_seconds
    }

    pub fn set_banner_duration_seconds(&self, seconds: u32) -> Result<()> {
        self.update(|data| data.banner_duration_seconds = seconds)
    }

    pub fn monitored_packages(&self) -> BTreeSet<String> {
        self.read().monitored_packages.clone()
    }

    pub fn is_monitored(&self, package_name: &str) -> bool {
        self.read().monitored_packages.contains(package_name)
    }

    pub fn add_monitored_package(&self, package_name: &str) -> Result<()> {
        self.update(|data| {
            data.monitored_packages.insert(package_name.to_string());
        })
    }

    pub fn remove_monitored_package(&self, package_name: &str) -> Result<()> {
        self.update(|data| {
            data.monitored_packages.remove(package_name);
        })
    }

    pub fn clear_monitored_packages(&self) -> Result<()> {
        self.update(|data| data.monitored_packages.clear())
    }

    pub fn dark_mode(&self) -> bool {
        self.read().dark_mode
    }

    pub fn set_dark_mode(&self, value: bool) -> Result<()> {
        self.update(|data| data.dark_mode = value)
    }

    /// Re-reads the file, picking up edits made by other handles.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: PreferenceData = serde_json::from_str(&contents)?;
        let mut guard = self.write();
        *guard = data;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PreferenceData> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PreferenceData> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, mutate: impl FnOnce(&mut PreferenceData)) -> Result<()> {
        let mut guard = self.write();
        mutate(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &PreferenceData) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write preferences to {}", self.path.display()))
    }
}
