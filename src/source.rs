//! Calendar source types.
//!
//! A [`CalendarSourceDraft`] is what the add form produces once every field its
//! kind requires is filled in. A [`CalendarSource`] is a confirmed entry in the
//! settings, with a name and color always present.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#ffffff";

/// The four kinds of calendar source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    DailyNote,
    Ical,
    CalDav,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Local,
        SourceKind::DailyNote,
        SourceKind::Ical,
        SourceKind::CalDav,
    ];

    /// The `type` discriminator, also used as the fallback calendar name
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::DailyNote => "dailynote",
            SourceKind::Ical => "ical",
            SourceKind::CalDav => "caldav",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Local => "Full note",
            SourceKind::DailyNote => "Daily Note",
            SourceKind::Ical => "Remote (.ics format)",
            SourceKind::CalDav => "CalDAV",
        }
    }

    pub fn next(self) -> SourceKind {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> SourceKind {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// A validated add-form submission.
///
/// `name` may still be empty here; the default is applied on confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSourceDraft {
    Local {
        name: String,
        color: String,
        directory: String,
    },
    DailyNote {
        name: String,
        color: String,
        heading: String,
    },
    Ical {
        name: String,
        color: String,
        url: String,
    },
    CalDav {
        name: String,
        url: String,
        username: String,
        password: String,
    },
}

impl CalendarSourceDraft {
    pub fn kind(&self) -> SourceKind {
        match self {
            CalendarSourceDraft::Local { .. } => SourceKind::Local,
            CalendarSourceDraft::DailyNote { .. } => SourceKind::DailyNote,
            CalendarSourceDraft::Ical { .. } => SourceKind::Ical,
            CalendarSourceDraft::CalDav { .. } => SourceKind::CalDav,
        }
    }

    /// Confirm a single-source draft, filling in the default name.
    ///
    /// CalDAV drafts describe an account rather than a calendar and are turned
    /// into sources by the importer, so they yield `None` here.
    pub fn into_source(self) -> Option<CalendarSource> {
        let kind = self.kind();
        let source = match self {
            CalendarSourceDraft::Local { name, color, directory } => CalendarSource::Local {
                name: name_or_kind(name, kind),
                color: color_or_default(color),
                directory,
            },
            CalendarSourceDraft::DailyNote { name, color, heading } => CalendarSource::DailyNote {
                name: name_or_kind(name, kind),
                color: color_or_default(color),
                heading,
            },
            CalendarSourceDraft::Ical { name, color, url } => CalendarSource::Ical {
                name: name_or_kind(name, kind),
                color: color_or_default(color),
                url,
            },
            CalendarSourceDraft::CalDav { .. } => return None,
        };
        Some(source)
    }
}

fn name_or_kind(name: String, kind: SourceKind) -> String {
    if name.trim().is_empty() {
        kind.as_str().to_string()
    } else {
        name
    }
}

fn color_or_default(color: String) -> String {
    if color.trim().is_empty() {
        DEFAULT_COLOR.to_string()
    } else {
        color
    }
}

/// A confirmed calendar source as stored in the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CalendarSource {
    Local {
        name: String,
        color: String,
        directory: String,
    },
    DailyNote {
        name: String,
        color: String,
        heading: String,
    },
    Ical {
        name: String,
        color: String,
        url: String,
    },
    CalDav {
        name: String,
        color: String,
        url: String,
        #[serde(rename = "homeUrl")]
        home_url: String,
        username: String,
        password: String,
    },
}

impl CalendarSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            CalendarSource::Local { .. } => SourceKind::Local,
            CalendarSource::DailyNote { .. } => SourceKind::DailyNote,
            CalendarSource::Ical { .. } => SourceKind::Ical,
            CalendarSource::CalDav { .. } => SourceKind::CalDav,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CalendarSource::Local { name, .. }
            | CalendarSource::DailyNote { name, .. }
            | CalendarSource::Ical { name, .. }
            | CalendarSource::CalDav { name, .. } => name,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            CalendarSource::Local { color, .. }
            | CalendarSource::DailyNote { color, .. }
            | CalendarSource::Ical { color, .. }
            | CalendarSource::CalDav { color, .. } => color,
        }
    }

    /// Short description of where events come from, for list display
    pub fn location(&self) -> &str {
        match self {
            CalendarSource::Local { directory, .. } => directory,
            CalendarSource::DailyNote { heading, .. } => heading,
            CalendarSource::Ical { url, .. } => url,
            CalendarSource::CalDav { home_url, .. } => home_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_defaults_to_kind() {
        let draft = CalendarSourceDraft::Local {
            name: String::new(),
            color: DEFAULT_COLOR.to_string(),
            directory: "Events".to_string(),
        };

        let source = draft.into_source().unwrap();
        assert_eq!(source.name(), "local");
        assert_eq!(source.location(), "Events");
    }

    #[test]
    fn test_caldav_draft_is_not_a_single_source() {
        let draft = CalendarSourceDraft::CalDav {
            name: "Work".to_string(),
            url: "https://dav.example.com".to_string(),
            username: "me".to_string(),
            password: "secret".to_string(),
        };
        assert!(draft.into_source().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let source = CalendarSource::CalDav {
            name: "Personal".to_string(),
            color: "#ff0000".to_string(),
            url: "https://dav.example.com".to_string(),
            home_url: "https://dav.example.com/calendars/me/personal/".to_string(),
            username: "me".to_string(),
            password: "secret".to_string(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "caldav");
        assert_eq!(json["homeUrl"], "https://dav.example.com/calendars/me/personal/");

        let daily: CalendarSource = serde_json::from_str(
            r##"{"type":"dailynote","name":"Journal","color":"#00ff00","heading":"Events"}"##,
        )
        .unwrap();
        assert_eq!(daily.kind(), SourceKind::DailyNote);
    }

    #[test]
    fn test_kind_cycle_is_total() {
        let mut kind = SourceKind::Local;
        for _ in 0..SourceKind::ALL.len() {
            kind = kind.next();
        }
        assert_eq!(kind, SourceKind::Local);
        assert_eq!(SourceKind::Local.prev(), SourceKind::CalDav);
    }
}
