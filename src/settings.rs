//! The settings tab controller.
//!
//! Owns the [`Settings`] aggregate and is the only place that mutates it.
//! A change is kept only once the store has saved it; refusals, import
//! failures and failed saves leave the settings untouched.

use crate::auth::Credentials;
use crate::config::{Settings, SettingsStore, WEEKDAYS};
use crate::error::Result;
use crate::form::SourceForm;
use crate::host::{DirectoryLister, HeadingLister, Notifier};
use crate::import::{CalendarDiscovery, import_calendars};
use crate::picker::MultiSelectPicker;
use crate::source::{CalendarSource, CalendarSourceDraft};
use crate::views::{DeviceClass, ViewId};
use std::path::Path;

pub struct SettingsTab<S, N> {
    settings: Settings,
    store: S,
    notifier: N,
}

impl<S: SettingsStore, N: Notifier> SettingsTab<S, N> {
    /// Load persisted settings, repairing anything inconsistent
    pub async fn load(store: S, notifier: N) -> Result<Self> {
        let mut settings = store.load().await?;
        settings.normalize();
        Ok(Self::with_settings(settings, store, notifier))
    }

    pub fn with_settings(settings: Settings, store: S, notifier: N) -> Self {
        Self {
            settings,
            store,
            notifier,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Apply `change` to a copy and keep it only once the store accepted it
    async fn commit<T>(&mut self, change: impl FnOnce(&mut Settings) -> T) -> Result<T> {
        let mut next = self.settings.clone();
        let output = change(&mut next);
        self.store.save(&next).await.inspect_err(|e| {
            tracing::error!(error = %e, "settings not saved, change discarded");
        })?;
        self.settings = next;
        Ok(output)
    }

    /// Open the add-calendar form.
    ///
    /// Directories already used by local sources are not offered. Headings
    /// come from the daily note template when there is one.
    pub fn open_add_form(
        &self,
        directories: &dyn DirectoryLister,
        headings: &dyn HeadingLister,
        daily_template: Option<&Path>,
    ) -> SourceForm {
        let headings = daily_template
            .map(|note| headings.headings(note))
            .unwrap_or_default();
        SourceForm::new(
            directories.directories(),
            &self.settings.sources.used_directories(),
            headings,
        )
    }

    /// Submit the form; nothing happens unless it is valid and idle.
    ///
    /// Returns how many sources were added.
    pub async fn submit_form<D>(&mut self, form: &mut SourceForm, discovery: &D) -> Result<usize>
    where
        D: CalendarDiscovery + ?Sized,
    {
        let draft = match form.begin_submit() {
            Ok(draft) => draft,
            Err(rejection) => {
                tracing::debug!(%rejection, "form submission refused");
                return Ok(0);
            }
        };
        let result = self.submit_draft(draft, discovery).await;
        form.finish_submit();
        result
    }

    /// Confirm a validated draft.
    ///
    /// A CalDAV draft is imported: each discovered calendar becomes its own
    /// source. If the import fails or finds nothing, the notifier says so and
    /// no source is added.
    pub async fn submit_draft<D>(&mut self, draft: CalendarSourceDraft, discovery: &D) -> Result<usize>
    where
        D: CalendarDiscovery + ?Sized,
    {
        let sources = match draft {
            CalendarSourceDraft::CalDav { url, username, password, .. } => {
                let credentials = Credentials::basic(username, password);
                match import_calendars(discovery, &credentials, &url).await {
                    Ok(sources) if sources.is_empty() => {
                        self.notifier.notify(&format!("No calendars found at {}", url));
                        return Ok(0);
                    }
                    Ok(sources) => sources,
                    Err(e) => {
                        self.notifier.notify(&e.to_string());
                        return Ok(0);
                    }
                }
            }
            other => other.into_source().into_iter().collect(),
        };

        if sources.is_empty() {
            return Ok(0);
        }
        self.commit(|settings| {
            let count = sources.len();
            for source in sources {
                settings.sources.add_source(source);
            }
            count
        })
        .await
    }

    pub async fn add_source(&mut self, source: CalendarSource) -> Result<()> {
        self.commit(|settings| settings.sources.add_source(source)).await
    }

    pub async fn remove_source(&mut self, index: usize) -> Result<Option<CalendarSource>> {
        if index >= self.settings.sources.len() {
            return Ok(None);
        }
        self.commit(|settings| {
            let removed = settings.sources.remove_source(index);
            let default = settings.default_calendar_index;
            if default > index {
                settings.default_calendar_index = default - 1;
            } else if default >= settings.sources.len() {
                settings.default_calendar_index = 0;
            }
            removed
        })
        .await
    }

    pub async fn move_source(&mut self, from: usize, to: usize) -> Result<bool> {
        let len = self.settings.sources.len();
        if from >= len || to >= len || from == to {
            return Ok(false);
        }
        self.commit(|settings| settings.sources.move_source(from, to)).await
    }

    pub async fn set_sources(&mut self, sources: Vec<CalendarSource>) -> Result<()> {
        self.commit(|settings| {
            settings.sources.set_sources(sources);
            if settings.default_calendar_index >= settings.sources.len() {
                settings.default_calendar_index = 0;
            }
        })
        .await
    }

    pub async fn set_default_calendar(&mut self, index: usize) -> Result<bool> {
        if index >= self.settings.sources.len() {
            return Ok(false);
        }
        self.commit(|settings| settings.default_calendar_index = index).await?;
        Ok(true)
    }

    /// Open a picker over the device's views, staged from the current set
    pub fn edit_views(&self, device: DeviceClass) -> MultiSelectPicker<ViewId> {
        MultiSelectPicker::new(
            format!("Select {} Views", device.label()),
            device.options(),
            self.settings.views.get(device).available(),
        )
    }

    /// Apply a committed picker selection
    pub async fn commit_views(&mut self, device: DeviceClass, selected: Vec<ViewId>) -> Result<bool> {
        let mut views = self.settings.views.clone();
        if let Err(refusal) = views.set_available(device, selected) {
            self.notifier.notify(&refusal.to_string());
            return Ok(false);
        }
        self.commit(|settings| settings.views = views).await?;
        Ok(true)
    }

    pub async fn set_initial_view(&mut self, device: DeviceClass, view: ViewId) -> Result<bool> {
        if !self.settings.views.get(device).is_available(view) {
            return Ok(false);
        }
        self.commit(|settings| settings.views.set_initial(device, view)).await
    }

    pub async fn cycle_initial_view(&mut self, device: DeviceClass, forward: bool) -> Result<bool> {
        let mut views = self.settings.views.clone();
        if !views.cycle_initial(device, forward) {
            return Ok(false);
        }
        self.commit(|settings| settings.views = views).await?;
        Ok(true)
    }

    /// 0 = Sunday through 6 = Saturday
    pub async fn set_first_day_of_week(&mut self, day: u8) -> Result<bool> {
        if day as usize >= WEEKDAYS.len() {
            return Ok(false);
        }
        self.commit(|settings| settings.first_day_of_week = day).await?;
        Ok(true)
    }

    pub async fn set_time_format_24h(&mut self, enabled: bool) -> Result<()> {
        self.commit(|settings| settings.time_format_24h = enabled).await
    }

    pub async fn set_click_to_create(&mut self, enabled: bool) -> Result<()> {
        self.commit(|settings| settings.click_to_create_event_from_month_view = enabled)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use crate::form::Field;
    use crate::host::Notices;
    use crate::import::RemoteCalendar;
    use crate::source::SourceKind;
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Vec<Settings>>,
    }

    #[async_trait(?Send)]
    impl SettingsStore for MemoryStore {
        async fn load(&self) -> Result<Settings> {
            Ok(self.saved.borrow().last().cloned().unwrap_or_default())
        }

        async fn save(&self, settings: &Settings) -> Result<()> {
            self.saved.borrow_mut().push(settings.clone());
            Ok(())
        }
    }

    struct ReadOnlyStore;

    #[async_trait(?Send)]
    impl SettingsStore for ReadOnlyStore {
        async fn load(&self) -> Result<Settings> {
            Ok(Settings::default())
        }

        async fn save(&self, _settings: &Settings) -> Result<()> {
            Err(SettingsError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )))
        }
    }

    struct StubDiscovery {
        calendars: Option<Vec<RemoteCalendar>>,
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl CalendarDiscovery for StubDiscovery {
        async fn discover(&self, _credentials: &Credentials, _endpoint: &str) -> Result<Vec<RemoteCalendar>> {
            self.calls.set(self.calls.get() + 1);
            self.calendars
                .clone()
                .ok_or_else(|| SettingsError::Auth("401 Unauthorized".to_string()))
        }
    }

    struct StubHost;

    impl DirectoryLister for StubHost {
        fn directories(&self) -> Vec<String> {
            vec!["Events".to_string(), "Journal".to_string()]
        }
    }

    impl HeadingLister for StubHost {
        fn headings(&self, _note: &Path) -> Vec<String> {
            vec!["Tasks".to_string(), "Events".to_string()]
        }
    }

    fn tab() -> SettingsTab<MemoryStore, Notices> {
        SettingsTab::with_settings(Settings::default(), MemoryStore::default(), Notices::new())
    }

    fn no_discovery() -> StubDiscovery {
        StubDiscovery {
            calendars: None,
            calls: Cell::new(0),
        }
    }

    fn remote(name: &str) -> RemoteCalendar {
        RemoteCalendar {
            url: format!("https://dav.example.com/cal/{}/", name.to_lowercase()),
            display_name: Some(name.to_string()),
            color: Some("#3366FFFF".to_string()),
        }
    }

    #[tokio::test]
    async fn test_local_source_gets_default_name() {
        let mut tab = tab();
        let mut form = tab.open_add_form(&StubHost, &StubHost, None);
        form.set_value(Field::Directory, "Events");
        form.set_name("");

        let added = tab.submit_form(&mut form, &no_discovery()).await.unwrap();

        assert_eq!(added, 1);
        let source = tab.settings().sources.get(0).unwrap();
        assert_eq!(source.kind(), SourceKind::Local);
        assert_eq!(source.name(), "local");
        assert_eq!(source.location(), "Events");
        assert_eq!(tab.store.saved.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_adds_nothing() {
        let mut tab = tab();
        let mut form = tab.open_add_form(&StubHost, &StubHost, None);
        form.select_kind(SourceKind::Ical);

        let added = tab.submit_form(&mut form, &no_discovery()).await.unwrap();

        assert_eq!(added, 0);
        assert!(tab.settings().sources.is_empty());
        assert!(tab.store.saved.borrow().is_empty());
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn test_used_directories_filtered_from_form() {
        let mut tab = tab();
        tab.add_source(CalendarSource::Local {
            name: "Events".to_string(),
            color: "#ffffff".to_string(),
            directory: "Events".to_string(),
        })
        .await
        .unwrap();

        let template = PathBuf::from("Daily.md");
        let form = tab.open_add_form(&StubHost, &StubHost, Some(&template));

        assert_eq!(form.directories(), ["Journal".to_string()]);
        assert!(form.is_choice(Field::Heading));
    }

    #[tokio::test]
    async fn test_caldav_import_adds_each_calendar() {
        let mut tab = tab();
        let discovery = StubDiscovery {
            calendars: Some(vec![remote("Home"), remote("Work"), remote("Family")]),
            calls: Cell::new(0),
        };
        let mut form = tab.open_add_form(&StubHost, &StubHost, None);
        form.select_kind(SourceKind::CalDav);
        form.set_value(Field::Url, "https://dav.example.com");
        form.set_value(Field::Username, "me");
        form.set_value(Field::Password, "secret");

        let added = tab.submit_form(&mut form, &discovery).await.unwrap();

        assert_eq!(added, 3);
        assert_eq!(discovery.calls.get(), 1);
        let names: Vec<&str> = tab.settings().sources.as_slice().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Home", "Work", "Family"]);
        assert_eq!(tab.settings().sources.get(0).unwrap().color(), "#3366ff");
        assert!(tab.notifier().drain().is_empty());
    }

    #[tokio::test]
    async fn test_caldav_failure_is_reported_once() {
        let mut tab = tab();
        let discovery = no_discovery();
        let draft = CalendarSourceDraft::CalDav {
            name: String::new(),
            url: "https://dav.example.com".to_string(),
            username: "me".to_string(),
            password: "wrong".to_string(),
        };

        let added = tab.submit_draft(draft, &discovery).await.unwrap();

        assert_eq!(added, 0);
        assert!(tab.settings().sources.is_empty());
        assert!(tab.store.saved.borrow().is_empty());
        assert_eq!(tab.notifier().drain(), vec!["Authentication error: 401 Unauthorized"]);
    }

    #[tokio::test]
    async fn test_account_without_calendars_is_reported() {
        let mut tab = tab();
        let discovery = StubDiscovery {
            calendars: Some(Vec::new()),
            calls: Cell::new(0),
        };
        let draft = CalendarSourceDraft::CalDav {
            name: String::new(),
            url: "https://dav.example.com".to_string(),
            username: "me".to_string(),
            password: "secret".to_string(),
        };

        let added = tab.submit_draft(draft, &discovery).await.unwrap();

        assert_eq!(added, 0);
        assert!(tab.store.saved.borrow().is_empty());
        assert_eq!(
            tab.notifier().drain(),
            vec!["No calendars found at https://dav.example.com"]
        );
    }

    #[tokio::test]
    async fn test_failed_save_discards_the_change() {
        let mut tab = SettingsTab::with_settings(Settings::default(), ReadOnlyStore, Notices::new());
        let draft = CalendarSourceDraft::Local {
            name: "Events".to_string(),
            color: "#ffffff".to_string(),
            directory: "Events".to_string(),
        };

        // a retry after a failed save must not stack up copies
        for _ in 0..2 {
            let result = tab.submit_draft(draft.clone(), &no_discovery()).await;
            assert!(matches!(result, Err(SettingsError::Io(_))));
        }
        assert!(tab.settings().sources.is_empty());

        assert!(tab.set_time_format_24h(true).await.is_err());
        assert!(tab.set_first_day_of_week(3).await.is_err());
        let mut picker = tab.edit_views(DeviceClass::Desktop);
        picker.set(ViewId::List, false);
        let selected = picker.commit(|selected| selected);
        assert!(tab.commit_views(DeviceClass::Desktop, selected).await.is_err());
        assert!(tab.cycle_initial_view(DeviceClass::Mobile, true).await.is_err());

        assert_eq!(tab.settings(), &Settings::default());
    }

    #[tokio::test]
    async fn test_commit_views_resets_initial_and_leaves_mobile() {
        let mut tab = tab();
        tab.set_initial_view(DeviceClass::Desktop, ViewId::Day).await.unwrap();
        let mobile = tab.settings().views.get(DeviceClass::Mobile).clone();

        let mut picker = tab.edit_views(DeviceClass::Desktop);
        picker.set(ViewId::Day, false);
        picker.set(ViewId::List, false);
        let selected = picker.commit(|selected| selected);
        assert_eq!(selected, vec![ViewId::Month, ViewId::Week]);
        assert!(tab.commit_views(DeviceClass::Desktop, selected).await.unwrap());

        let desktop = tab.settings().views.get(DeviceClass::Desktop);
        assert_eq!(desktop.initial(), ViewId::Month);
        assert_eq!(tab.settings().views.get(DeviceClass::Mobile), &mobile);
    }

    #[tokio::test]
    async fn test_empty_view_selection_is_refused() {
        let mut tab = tab();
        let before = tab.settings().clone();

        let mut picker = tab.edit_views(DeviceClass::Mobile);
        for view in DeviceClass::Mobile.catalog() {
            picker.set(*view, false);
        }
        let selected = picker.commit(|selected| selected);

        assert!(!tab.commit_views(DeviceClass::Mobile, selected).await.unwrap());
        assert_eq!(tab.settings(), &before);
        assert_eq!(tab.notifier().drain(), vec!["You must select at least one view."]);
        assert!(tab.store.saved.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_picker_changes_nothing() {
        let tab = tab();
        let before = tab.settings().clone();

        let mut picker = tab.edit_views(DeviceClass::Desktop);
        picker.toggle(ViewId::Month);
        picker.toggle(ViewId::Week);
        picker.cancel();

        assert_eq!(tab.settings(), &before);
    }

    #[tokio::test]
    async fn test_remove_source_keeps_default_index_valid() {
        let mut tab = tab();
        for name in ["a", "b", "c"] {
            tab.add_source(CalendarSource::Ical {
                name: name.to_string(),
                color: "#ffffff".to_string(),
                url: format!("https://example.com/{}.ics", name),
            })
            .await
            .unwrap();
        }
        assert!(tab.set_default_calendar(2).await.unwrap());
        assert!(!tab.set_default_calendar(3).await.unwrap());

        tab.remove_source(0).await.unwrap();
        assert_eq!(tab.settings().default_calendar_index, 1);
        assert_eq!(tab.settings().sources.get(1).unwrap().name(), "c");

        tab.remove_source(1).await.unwrap();
        assert_eq!(tab.settings().default_calendar_index, 0);
        assert!(tab.remove_source(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_general_settings() {
        let mut tab = tab();
        assert!(tab.set_first_day_of_week(1).await.unwrap());
        assert!(!tab.set_first_day_of_week(7).await.unwrap());
        tab.set_time_format_24h(true).await.unwrap();
        tab.set_click_to_create(false).await.unwrap();

        let saved = tab.store.load().await.unwrap();
        assert_eq!(saved.first_weekday(), chrono::Weekday::Mon);
        assert!(saved.time_format_24h);
        assert!(!saved.click_to_create_event_from_month_view);
    }

    #[tokio::test]
    async fn test_load_normalizes() {
        let store = MemoryStore::default();
        let mut broken = Settings::default();
        broken.first_day_of_week = 12;
        store.save(&broken).await.unwrap();

        let tab = SettingsTab::load(store, Notices::new()).await.unwrap();
        assert_eq!(tab.settings().first_day_of_week, 0);
    }
}
