//! Which calendar views each device class offers, and which one opens first.

use std::collections::BTreeSet;

use serde::de::IntoDeserializer;
use serde::de::value::{self, StrDeserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A calendar display mode.
///
/// Declaration order is the canonical view order; it decides the fallback
/// initial view when the current one stops being available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViewId {
    #[serde(rename = "dayGridMonth")]
    Month,
    #[serde(rename = "timeGrid3Days")]
    ThreeDays,
    #[serde(rename = "timeGridWeek")]
    Week,
    #[serde(rename = "timeGridDay")]
    Day,
    #[serde(rename = "listWeek")]
    List,
}

impl ViewId {
    pub fn label(self) -> &'static str {
        match self {
            ViewId::Month => "Month",
            ViewId::ThreeDays => "3 Days",
            ViewId::Week => "Week",
            ViewId::Day => "Day",
            ViewId::List => "List",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "Desktop",
            DeviceClass::Mobile => "Mobile",
        }
    }

    /// Views this device class can offer, in canonical order
    pub fn catalog(self) -> &'static [ViewId] {
        match self {
            DeviceClass::Desktop => &[ViewId::Month, ViewId::Week, ViewId::Day, ViewId::List],
            DeviceClass::Mobile => &[ViewId::Month, ViewId::ThreeDays, ViewId::Day, ViewId::List],
        }
    }

    /// Catalog as (id, label) pairs for a picker
    pub fn options(self) -> Vec<(ViewId, String)> {
        self.catalog()
            .iter()
            .map(|view| (*view, view.label().to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewSelectionError {
    #[error("You must select at least one view.")]
    Empty,
    #[error("The {0} view is not available on {1}.")]
    NotOffered(&'static str, &'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredViewConfig")]
pub struct ViewConfig {
    available: BTreeSet<ViewId>,
    initial: ViewId,
}

/// On-disk form of [`ViewConfig`]; view ids this build does not know are
/// dropped instead of failing the whole settings file
#[derive(Deserialize)]
struct StoredViewConfig {
    #[serde(default)]
    available: Vec<String>,
    #[serde(default)]
    initial: Option<String>,
}

fn parse_view(id: &str) -> Option<ViewId> {
    let de: StrDeserializer<'_, value::Error> = id.into_deserializer();
    match ViewId::deserialize(de) {
        Ok(view) => Some(view),
        Err(_) => {
            tracing::warn!(view = id, "unknown view id, dropped");
            None
        }
    }
}

impl From<StoredViewConfig> for ViewConfig {
    fn from(stored: StoredViewConfig) -> Self {
        let available: BTreeSet<ViewId> = stored.available.iter().filter_map(|id| parse_view(id)).collect();
        let initial = stored
            .initial
            .as_deref()
            .and_then(parse_view)
            .or_else(|| available.first().copied())
            .unwrap_or(ViewId::Month);
        Self { available, initial }
    }
}

impl ViewConfig {
    fn new(available: &[ViewId], initial: ViewId) -> Self {
        Self {
            available: available.iter().copied().collect(),
            initial,
        }
    }

    /// Available views in canonical order
    pub fn available(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.available.iter().copied()
    }

    pub fn is_available(&self, view: ViewId) -> bool {
        self.available.contains(&view)
    }

    pub fn initial(&self) -> ViewId {
        self.initial
    }

    /// Re-derive `initial` if it is no longer available; returns whether it changed
    fn reconcile_initial(&mut self) -> bool {
        if self.available.contains(&self.initial) {
            return false;
        }
        match self.available.first() {
            Some(first) => {
                self.initial = *first;
                true
            }
            None => false,
        }
    }
}

/// Desktop and mobile view configuration, each kept consistent on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    desktop: ViewConfig,
    mobile: ViewConfig,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            desktop: ViewConfig::new(
                &[ViewId::Day, ViewId::Week, ViewId::Month, ViewId::List],
                ViewId::Week,
            ),
            mobile: ViewConfig::new(&[ViewId::ThreeDays, ViewId::Day, ViewId::List], ViewId::ThreeDays),
        }
    }
}

impl ViewSettings {
    pub fn get(&self, device: DeviceClass) -> &ViewConfig {
        match device {
            DeviceClass::Desktop => &self.desktop,
            DeviceClass::Mobile => &self.mobile,
        }
    }

    fn get_mut(&mut self, device: DeviceClass) -> &mut ViewConfig {
        match device {
            DeviceClass::Desktop => &mut self.desktop,
            DeviceClass::Mobile => &mut self.mobile,
        }
    }

    /// Replace the available set for one device class.
    ///
    /// An empty set, or one containing views the device cannot show, is
    /// refused and leaves everything unchanged.
    pub fn set_available(
        &mut self,
        device: DeviceClass,
        views: impl IntoIterator<Item = ViewId>,
    ) -> Result<(), ViewSelectionError> {
        let views: BTreeSet<ViewId> = views.into_iter().collect();
        if views.is_empty() {
            return Err(ViewSelectionError::Empty);
        }
        if let Some(view) = views.iter().find(|v| !device.catalog().contains(*v)) {
            return Err(ViewSelectionError::NotOffered(view.label(), device.label()));
        }

        let config = self.get_mut(device);
        config.available = views;
        let previous = config.initial;
        if config.reconcile_initial() {
            tracing::info!(
                device = device.label(),
                from = previous.label(),
                to = config.initial.label(),
                "initial view no longer available, reset"
            );
        }
        Ok(())
    }

    /// Select the initial view; ignored unless the view is available
    pub fn set_initial(&mut self, device: DeviceClass, view: ViewId) -> bool {
        let config = self.get_mut(device);
        if !config.available.contains(&view) {
            tracing::debug!(device = device.label(), view = view.label(), "initial view not available, ignored");
            return false;
        }
        config.initial = view;
        true
    }

    /// Step the initial view through the available set
    pub fn cycle_initial(&mut self, device: DeviceClass, forward: bool) -> bool {
        let config = self.get(device);
        let views: Vec<ViewId> = config.available().collect();
        let Some(idx) = views.iter().position(|v| *v == config.initial) else {
            return false;
        };
        let next = if forward {
            views[(idx + 1) % views.len()]
        } else {
            views[(idx + views.len() - 1) % views.len()]
        };
        self.set_initial(device, next)
    }

    /// Repair state read from disk: drop views a device cannot show, restore
    /// the default set if nothing is left, and re-derive the initial view.
    pub fn normalize(&mut self) {
        let defaults = ViewSettings::default();
        for device in [DeviceClass::Desktop, DeviceClass::Mobile] {
            let config = self.get_mut(device);
            config.available.retain(|v| device.catalog().contains(v));
            if config.available.is_empty() {
                *config = defaults.get(device).clone();
            }
            config.reconcile_initial();
        }
    }
}
