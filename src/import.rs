//! Bulk import of a remote CalDAV account.
//!
//! One credential and endpoint turn into one confirmed source per discovered
//! calendar. The import succeeds or fails as a whole: if discovery fails, or
//! any single calendar cannot be converted, nothing is handed on.

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::error::{Result, SettingsError};
use crate::source::{CalendarSource, DEFAULT_COLOR};

/// A calendar collection found on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCalendar {
    /// Absolute URL of the collection
    pub url: String,
    pub display_name: Option<String>,
    pub color: Option<String>,
}

/// Lists the calendars an account can see
#[async_trait(?Send)]
pub trait CalendarDiscovery {
    async fn discover(&self, credentials: &Credentials, endpoint: &str) -> Result<Vec<RemoteCalendar>>;
}

/// Discover and convert every calendar of the account, in server order
pub async fn import_calendars<D>(
    discovery: &D,
    credentials: &Credentials,
    endpoint: &str,
) -> Result<Vec<CalendarSource>>
where
    D: CalendarDiscovery + ?Sized,
{
    tracing::info!(endpoint, username = credentials.username(), "importing calendars");

    let calendars = discovery.discover(credentials, endpoint).await.inspect_err(|e| {
        tracing::warn!(endpoint, error = %e, "calendar discovery failed");
    })?;

    let sources = calendars
        .into_iter()
        .map(|calendar| convert(calendar, credentials, endpoint))
        .collect::<Result<Vec<_>>>()
        .inspect_err(|e| {
            tracing::warn!(endpoint, error = %e, "calendar conversion failed, import aborted");
        })?;

    tracing::info!(endpoint, count = sources.len(), "calendars imported");
    Ok(sources)
}

/// Import and hand each source to `on_source` in discovery order.
///
/// On failure `on_source` is never called.
pub async fn import_into<D, F>(
    discovery: &D,
    credentials: &Credentials,
    endpoint: &str,
    mut on_source: F,
) -> Result<usize>
where
    D: CalendarDiscovery + ?Sized,
    F: FnMut(CalendarSource),
{
    let sources = import_calendars(discovery, credentials, endpoint).await?;
    let count = sources.len();
    for source in sources {
        on_source(source);
    }
    Ok(count)
}

fn convert(calendar: RemoteCalendar, credentials: &Credentials, endpoint: &str) -> Result<CalendarSource> {
    let name = match calendar.display_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => name_from_url(&calendar.url)?,
    };

    Ok(CalendarSource::CalDav {
        name,
        color: calendar
            .color
            .as_deref()
            .and_then(normalize_color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        url: endpoint.to_string(),
        home_url: calendar.url,
        username: credentials.username().to_string(),
        password: credentials.password().to_string(),
    })
}

/// Fall back to the last path segment of the collection URL
fn name_from_url(url: &str) -> Result<String> {
    let segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SettingsError::CalDav(format!("Calendar at {} has no name", url)))?;

    let decoded = urlencoding::decode(segment)
        .map_err(|e| SettingsError::CalDav(format!("Calendar at {} has an unreadable name: {}", url, e)))?;
    Ok(decoded.into_owned())
}

/// Servers send `#rrggbb` or `#rrggbbaa`; keep `#rrggbb`
fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim();
    let hex = color.strip_prefix('#')?;
    if (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex[..6].to_ascii_lowercase()))
    } else {
        None
    }
}
