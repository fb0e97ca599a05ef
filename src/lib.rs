//! Calendar source and view settings.
//!
//! Holds the configured calendar sources and display preferences, the
//! add-calendar form, CalDAV account import, and the rules that keep the
//! per-device view settings consistent.

pub mod auth;
pub mod caldav;
pub mod config;
pub mod error;
pub mod form;
pub mod host;
pub mod import;
pub mod logging;
pub mod picker;
pub mod settings;
pub mod source;
pub mod sources;
pub mod views;

pub use auth::Credentials;
pub use caldav::CalDavClient;
pub use config::{JsonFileStore, Settings, SettingsStore, VaultConfig};
pub use error::{Result, SettingsError};
pub use form::{Field, FormRejection, SourceForm};
pub use host::{DirectoryLister, FsVault, HeadingLister, Notices, Notifier};
pub use import::{CalendarDiscovery, RemoteCalendar, import_calendars, import_into};
pub use picker::MultiSelectPicker;
pub use settings::SettingsTab;
pub use source::{CalendarSource, CalendarSourceDraft, SourceKind};
pub use sources::SourceList;
pub use views::{DeviceClass, ViewId, ViewSettings};
