//! Add-calendar form state.
//!
//! The form keeps every field it has ever been given, whatever kind is
//! selected, so switching kinds back and forth never loses input. Only the
//! fields of the selected kind are shown and validated.

use std::future::Future;

use thiserror::Error;

use crate::source::{CalendarSourceDraft, DEFAULT_COLOR, SourceKind};

/// An input on the add form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Directory,
    Heading,
    Url,
    Username,
    Password,
    Color,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Calendar Name",
            Field::Directory => "Directory",
            Field::Heading => "Heading",
            Field::Url => "Url",
            Field::Username => "Username",
            Field::Password => "Password",
            Field::Color => "Color",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Field::Name => "Provide a name for the calendar",
            Field::Directory => "Directory to store events",
            Field::Heading => "Heading to store events under in the daily note.",
            Field::Url => "Url of the server",
            Field::Username => "Username for the account",
            Field::Password => "Password for the account",
            Field::Color => "The color of events on the calendar",
        }
    }
}

/// How the daily-note heading is entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingInput {
    /// No headings could be found, any text is accepted
    Freeform,
    /// The heading must be one of these
    Choice(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitState {
    Idle,
    InFlight,
}

/// Why a submission did not start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormRejection {
    #[error("A calendar is already being added")]
    Busy,
    #[error("Missing required fields: {}", field_list(.0))]
    MissingFields(Vec<Field>),
}

fn field_list(fields: &[Field]) -> String {
    fields.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug)]
pub struct SourceForm {
    kind: SourceKind,
    /// `None` until the user types into the name field
    name: Option<String>,
    color: String,
    directory: String,
    heading: String,
    url: String,
    username: String,
    password: String,
    directories: Vec<String>,
    headings: HeadingInput,
    state: SubmitState,
}

impl SourceForm {
    /// Open a fresh form.
    ///
    /// `used_directories` are dropped from the offered directory choices.
    pub fn new(directories: Vec<String>, used_directories: &[String], headings: Vec<String>) -> Self {
        let mut offered: Vec<String> = directories
            .into_iter()
            .filter(|dir| !used_directories.contains(dir))
            .collect();
        offered.sort();

        let headings = if headings.is_empty() {
            HeadingInput::Freeform
        } else {
            HeadingInput::Choice(headings)
        };

        Self {
            kind: SourceKind::Local,
            name: None,
            color: DEFAULT_COLOR.to_string(),
            directory: String::new(),
            heading: String::new(),
            url: String::new(),
            username: String::new(),
            password: String::new(),
            directories: offered,
            headings,
            state: SubmitState::Idle,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn select_kind(&mut self, kind: SourceKind) {
        self.kind = kind;
    }

    /// The name as displayed: the typed value, or the kind while untouched
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.as_str())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn headings(&self) -> &HeadingInput {
        &self.headings
    }

    /// Fields shown for the selected kind, in display order
    pub fn visible_fields(&self) -> &'static [Field] {
        match self.kind {
            SourceKind::Local => &[Field::Name, Field::Directory, Field::Color],
            SourceKind::DailyNote => &[Field::Name, Field::Heading, Field::Color],
            SourceKind::Ical => &[Field::Name, Field::Url, Field::Color],
            SourceKind::CalDav => &[Field::Name, Field::Url, Field::Username, Field::Password],
        }
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => self.name(),
            Field::Directory => &self.directory,
            Field::Heading => &self.heading,
            Field::Url => &self.url,
            Field::Username => &self.username,
            Field::Password => &self.password,
            Field::Color => &self.color,
        }
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = Some(value),
            Field::Directory => self.directory = value,
            Field::Heading => self.heading = value,
            Field::Url => self.url = value,
            Field::Username => self.username = value,
            Field::Password => self.password = value,
            Field::Color => self.color = value,
        }
    }

    /// Whether a field is picked from a fixed list rather than typed
    pub fn is_choice(&self, field: Field) -> bool {
        match field {
            Field::Directory => true,
            Field::Heading => matches!(self.headings, HeadingInput::Choice(_)),
            _ => false,
        }
    }

    /// Step a choice field to the next or previous offered value
    pub fn cycle_choice(&mut self, field: Field, forward: bool) {
        let options: &[String] = match (field, &self.headings) {
            (Field::Directory, _) => &self.directories,
            (Field::Heading, HeadingInput::Choice(headings)) => headings,
            _ => return,
        };
        if options.is_empty() {
            return;
        }

        let current = self.value(field);
        let next = match options.iter().position(|o| o == current) {
            Some(idx) if forward => (idx + 1) % options.len(),
            Some(idx) => (idx + options.len() - 1) % options.len(),
            None if forward => 0,
            None => options.len() - 1,
        };
        let value = options[next].clone();
        self.set_value(field, value);
    }

    /// Required fields of the selected kind that are not filled in
    pub fn missing_fields(&self) -> Vec<Field> {
        self.visible_fields()
            .iter()
            .copied()
            .filter(|field| !self.is_satisfied(*field))
            .collect()
    }

    fn is_satisfied(&self, field: Field) -> bool {
        match field {
            // The name falls back to the kind on confirmation
            Field::Name => true,
            Field::Heading => match &self.headings {
                HeadingInput::Freeform => !self.heading.trim().is_empty(),
                HeadingInput::Choice(options) => options.contains(&self.heading),
            },
            other => !self.value(other).trim().is_empty(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.state == SubmitState::InFlight
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.kind, self.state) {
            (SourceKind::CalDav, SubmitState::Idle) => "Import Calendars",
            (SourceKind::CalDav, SubmitState::InFlight) => "Importing Calendars",
            (_, SubmitState::Idle) => "Add Calendar",
            (_, SubmitState::InFlight) => "Adding Calendar",
        }
    }

    /// Build the draft for the selected kind, if every required field is set
    pub fn draft(&self) -> Result<CalendarSourceDraft, FormRejection> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(FormRejection::MissingFields(missing));
        }

        let name = self.name().to_string();
        let draft = match self.kind {
            SourceKind::Local => CalendarSourceDraft::Local {
                name,
                color: self.color.clone(),
                directory: self.directory.clone(),
            },
            SourceKind::DailyNote => CalendarSourceDraft::DailyNote {
                name,
                color: self.color.clone(),
                heading: self.heading.clone(),
            },
            SourceKind::Ical => CalendarSourceDraft::Ical {
                name,
                color: self.color.clone(),
                url: self.url.trim().to_string(),
            },
            SourceKind::CalDav => CalendarSourceDraft::CalDav {
                name,
                url: self.url.trim().to_string(),
                username: self.username.clone(),
                password: self.password.clone(),
            },
        };
        Ok(draft)
    }

    /// Validate and mark the form busy.
    ///
    /// Every successful call must be paired with [`SourceForm::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<CalendarSourceDraft, FormRejection> {
        if self.is_busy() {
            return Err(FormRejection::Busy);
        }
        let draft = self.draft()?;
        self.state = SubmitState::InFlight;
        tracing::debug!(kind = self.kind.as_str(), "form submission started");
        Ok(draft)
    }

    pub fn finish_submit(&mut self) {
        self.state = SubmitState::Idle;
    }

    /// Run `submit` with the draft if the form is valid and idle
    pub async fn submit_with<F, Fut>(&mut self, submit: F) -> Result<(), FormRejection>
    where
        F: FnOnce(CalendarSourceDraft) -> Fut,
        Fut: Future<Output = ()>,
    {
        let draft = self.begin_submit()?;
        submit(draft).await;
        self.finish_submit();
        Ok(())
    }
}
