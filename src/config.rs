use crate::error::Result;
use crate::sources::SourceList;
use crate::views::ViewSettings;
use async_trait::async_trait;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use tokio::io::AsyncWriteExt;
use std::path::{Path, PathBuf};

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Everything the settings tab edits, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub sources: SourceList,
    #[serde(default)]
    pub default_calendar_index: usize,
    /// 0 = Sunday
    #[serde(default)]
    pub first_day_of_week: u8,
    #[serde(default)]
    pub time_format_24h: bool,
    #[serde(default = "default_click_to_create")]
    pub click_to_create_event_from_month_view: bool,
    #[serde(default)]
    pub views: ViewSettings,
}

fn default_click_to_create() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: SourceList::default(),
            default_calendar_index: 0,
            first_day_of_week: 0,
            time_format_24h: false,
            click_to_create_event_from_month_view: true,
            views: ViewSettings::default(),
        }
    }
}

impl Settings {
    pub fn first_weekday(&self) -> Weekday {
        WEEKDAYS
            .get(self.first_day_of_week as usize)
            .copied()
            .unwrap_or(Weekday::Sun)
    }

    /// Repair values that cannot be produced by the editing paths
    pub fn normalize(&mut self) {
        if self.first_day_of_week as usize >= WEEKDAYS.len() {
            tracing::warn!(value = self.first_day_of_week, "first day of week out of range, reset");
            self.first_day_of_week = 0;
        }
        if self.default_calendar_index >= self.sources.len().max(1) {
            self.default_calendar_index = 0;
        }
        self.views.normalize();
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calendar-settings")
}

/// Persistence round trip for [`Settings`]
#[async_trait(?Send)]
pub trait SettingsStore {
    async fn load(&self) -> Result<Settings>;
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept as pretty JSON on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` in the user config directory
    pub fn default_location() -> Self {
        Self::new(config_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait(?Send)]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Settings> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Settings::default());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(settings)?;

        // CalDAV sources carry passwords: owner-only from the first byte
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // an existing file keeps its old mode on open
            file.set_permissions(fs::Permissions::from_mode(0o600)).await?;
        }
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Where the notes live, for the directory and heading listers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    #[serde(default = "default_vault_root")]
    pub root: PathBuf,
    /// Daily note template, relative to `root`
    #[serde(default)]
    pub daily_note_template: Option<String>,
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_vault_root(),
            daily_note_template: None,
        }
    }
}

impl VaultConfig {
    pub fn config_path() -> PathBuf {
        config_dir().join("vault.json")
    }

    pub fn load() -> Result<VaultConfig> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<VaultConfig> {
        if !path.exists() {
            return Ok(VaultConfig::default());
        }

        let content = fs::read_to_string(path)?;
        let config: VaultConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Template note path with the `.md` extension the host omits
    pub fn template_note(&self) -> Option<PathBuf> {
        let template = self.daily_note_template.as_deref()?.trim();
        if template.is_empty() {
            return None;
        }
        let file = if template.ends_with(".md") {
            template.to_string()
        } else {
            format!("{}.md", template)
        };
        Some(self.root.join(file))
    }
}
