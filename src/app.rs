use calendar_settings::config::{Settings, WEEKDAYS};
use calendar_settings::form::{Field, SourceForm};
use calendar_settings::picker::MultiSelectPicker;
use calendar_settings::views::{DeviceClass, ViewId};

const DEVICES: [DeviceClass; 2] = [DeviceClass::Desktop, DeviceClass::Mobile];

/// One line of the settings list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    FirstDayOfWeek,
    TimeFormat,
    ClickToCreate,
    Views(DeviceClass),
    InitialView(DeviceClass),
    Source(usize),
    AddCalendar,
}

/// One line of the add-calendar form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormRow {
    Kind,
    Field(Field),
    Submit,
}

/// Which screen has the keyboard
pub enum Screen {
    Settings,
    AddSource { form: SourceForm, cursor: usize },
    PickViews {
        device: DeviceClass,
        picker: MultiSelectPicker<ViewId>,
        cursor: usize,
    },
}

/// Application state
pub struct App {
    pub screen: Screen,
    pub selected: usize,
    pub show_logs: bool,
    pub status_message: Option<String>,
    pub status_message_time: Option<std::time::Instant>,
}

pub fn rows(settings: &Settings) -> Vec<Row> {
    let mut rows = vec![Row::FirstDayOfWeek, Row::TimeFormat, Row::ClickToCreate];
    rows.extend(DEVICES.iter().map(|d| Row::Views(*d)));
    rows.extend(DEVICES.iter().map(|d| Row::InitialView(*d)));
    rows.extend((0..settings.sources.len()).map(Row::Source));
    rows.push(Row::AddCalendar);
    rows
}

pub fn form_rows(form: &SourceForm) -> Vec<FormRow> {
    let mut rows = vec![FormRow::Kind];
    rows.extend(form.visible_fields().iter().map(|f| FormRow::Field(*f)));
    rows.push(FormRow::Submit);
    rows
}

pub fn weekday_name(day: u8) -> String {
    WEEKDAYS
        .get(day as usize)
        .map(|d| d.to_string())
        .unwrap_or_default()
}

impl App {
    pub fn new() -> Self {
        Self {
            screen: Screen::Settings,
            selected: 0,
            show_logs: false,
            status_message: None,
            status_message_time: None,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(std::time::Instant::now());
    }

    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_message_time
            && time.elapsed() > std::time::Duration::from_secs(3)
        {
            self.status_message = None;
            self.status_message_time = None;
        }
    }

    pub fn selected_row(&self, settings: &Settings) -> Option<Row> {
        rows(settings).get(self.selected).copied()
    }

    pub fn select_next(&mut self, settings: &Settings) {
        let count = rows(settings).len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the cursor on the list after rows disappear
    pub fn clamp_selection(&mut self, settings: &Settings) {
        let count = rows(settings).len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }
    }

    /// Put the cursor on a row, if it exists
    pub fn select_row(&mut self, settings: &Settings, row: Row) {
        if let Some(idx) = rows(settings).iter().position(|r| *r == row) {
            self.selected = idx;
        }
    }

    pub fn open_form(&mut self, form: SourceForm) {
        self.screen = Screen::AddSource { form, cursor: 0 };
    }

    pub fn open_picker(&mut self, device: DeviceClass, picker: MultiSelectPicker<ViewId>) {
        self.screen = Screen::PickViews {
            device,
            picker,
            cursor: 0,
        };
    }

    /// Leave the current screen, handing it back to the caller
    pub fn take_screen(&mut self) -> Screen {
        std::mem::replace(&mut self.screen, Screen::Settings)
    }

    pub fn cursor_down(&mut self) {
        match &mut self.screen {
            Screen::AddSource { form, cursor } => {
                if *cursor + 1 < form_rows(form).len() {
                    *cursor += 1;
                }
            }
            Screen::PickViews { picker, cursor, .. } => {
                if *cursor + 1 < picker.options().len() {
                    *cursor += 1;
                }
            }
            Screen::Settings => {}
        }
    }

    pub fn cursor_up(&mut self) {
        match &mut self.screen {
            Screen::AddSource { cursor, .. } | Screen::PickViews { cursor, .. } => {
                *cursor = cursor.saturating_sub(1);
            }
            Screen::Settings => {}
        }
    }

    /// Current row of the add-calendar form
    pub fn form_row(&self) -> Option<FormRow> {
        match &self.screen {
            Screen::AddSource { form, cursor } => form_rows(form).get(*cursor).copied(),
            _ => None,
        }
    }

    /// Step the kind selector or a choice field
    pub fn form_cycle(&mut self, forward: bool) {
        let row = self.form_row();
        let Screen::AddSource { form, cursor } = &mut self.screen else {
            return;
        };
        match row {
            Some(FormRow::Kind) => {
                let kind = if forward { form.kind().next() } else { form.kind().prev() };
                form.select_kind(kind);
                *cursor = (*cursor).min(form_rows(form).len() - 1);
            }
            Some(FormRow::Field(field)) if form.is_choice(field) => form.cycle_choice(field, forward),
            _ => {}
        }
    }

    pub fn form_type(&mut self, c: char) {
        let row = self.form_row();
        let Screen::AddSource { form, .. } = &mut self.screen else {
            return;
        };
        if let Some(FormRow::Field(field)) = row
            && !form.is_choice(field)
        {
            let mut value = form.value(field).to_string();
            value.push(c);
            form.set_value(field, value);
        }
    }

    pub fn form_backspace(&mut self) {
        let row = self.form_row();
        let Screen::AddSource { form, .. } = &mut self.screen else {
            return;
        };
        if let Some(FormRow::Field(field)) = row
            && !form.is_choice(field)
        {
            let mut value = form.value(field).to_string();
            value.pop();
            form.set_value(field, value);
        }
    }

    pub fn picker_toggle(&mut self) {
        if let Screen::PickViews { picker, cursor, .. } = &mut self.screen
            && let Some((view, _)) = picker.options().get(*cursor).cloned()
        {
            picker.toggle(view);
        }
    }
}
