use crate::app::{self, App, FormRow, Row, Screen};
use calendar_settings::config::Settings;
use calendar_settings::form::{Field, SourceForm};
use calendar_settings::logging;
use calendar_settings::picker::MultiSelectPicker;
use calendar_settings::views::{DeviceClass, ViewId};
use crossterm::{
    cursor, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::io::{self, Write, stdout};

const LABEL_WIDTH: usize = 24;
const LOG_LINES: usize = 8;

pub fn render(app: &App, settings: &Settings) -> io::Result<()> {
    let mut out = stdout();
    let (term_width, term_height) = terminal::size().unwrap_or((80, 24));
    let width = term_width as usize;

    queue!(out, Clear(ClearType::All), cursor::Hide, cursor::MoveTo(0, 0))?;

    let controls = match &app.screen {
        Screen::Settings => {
            render_settings(&mut out, app, settings, width)?;
            " jk:move hl:change enter:edit a:add d:delete JK:reorder L:logs q:quit"
        }
        Screen::AddSource { form, cursor } => {
            render_form(&mut out, form, *cursor, width)?;
            " up/down:move left/right:choose type:edit enter:next esc:cancel"
        }
        Screen::PickViews { picker, cursor, .. } => {
            render_picker(&mut out, picker, *cursor)?;
            " jk:move space:toggle enter:save esc:cancel"
        }
    };

    if app.show_logs {
        render_logs(&mut out, term_height, width)?;
    }

    if let Some(msg) = &app.status_message {
        queue!(
            out,
            cursor::MoveTo(0, term_height.saturating_sub(2)),
            SetForegroundColor(Color::Yellow),
            Print(format!(" {}", truncate_str(msg, width.saturating_sub(2)))),
            ResetColor
        )?;
    }

    queue!(
        out,
        cursor::MoveTo(0, term_height.saturating_sub(1)),
        SetForegroundColor(Color::DarkGrey),
        Print(truncate_str(controls, width)),
        ResetColor
    )?;

    out.flush()
}

fn heading(out: &mut impl Write, text: &str) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(Color::Cyan),
        SetAttribute(Attribute::Bold),
        Print(format!(" {}\r\n", text)),
        SetAttribute(Attribute::Reset),
        ResetColor
    )
}

fn line(out: &mut impl Write, selected: bool, label: &str, value: &str, width: usize) -> io::Result<()> {
    let marker = if selected { ">" } else { " " };
    let text = format!("{} {:<w$} {}", marker, label, value, w = LABEL_WIDTH);
    if selected {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    queue!(
        out,
        Print(truncate_str(&text, width)),
        SetAttribute(Attribute::Reset),
        Print("\r\n")
    )
}

fn view_list(views: impl Iterator<Item = ViewId>) -> String {
    views.map(|v| v.label()).collect::<Vec<_>>().join(", ")
}

fn render_settings(out: &mut impl Write, app: &App, settings: &Settings, width: usize) -> io::Result<()> {
    heading(out, "CALENDAR SETTINGS")?;

    for (idx, row) in app::rows(settings).into_iter().enumerate() {
        let selected = idx == app.selected;
        match row {
            Row::FirstDayOfWeek => {
                line(out, selected, "First day of week", &app::weekday_name(settings.first_day_of_week), width)?;
            }
            Row::TimeFormat => {
                let value = if settings.time_format_24h { "24 hour" } else { "12 hour" };
                line(out, selected, "Time format", value, width)?;
            }
            Row::ClickToCreate => {
                let value = if settings.click_to_create_event_from_month_view { "on" } else { "off" };
                line(out, selected, "Click on a day to create", value, width)?;
            }
            Row::Views(device) => {
                let label = format!("{} views", device.label());
                line(out, selected, &label, &view_list(settings.views.get(device).available()), width)?;
            }
            Row::InitialView(device) => {
                let label = format!("{} initial view", device.label());
                line(out, selected, &label, settings.views.get(device).initial().label(), width)?;
            }
            Row::Source(i) => {
                if i == 0 {
                    queue!(out, Print("\r\n"))?;
                    heading(out, "CALENDARS")?;
                }
                let Some(source) = settings.sources.get(i) else {
                    continue;
                };
                let default = if i == settings.default_calendar_index { " *" } else { "" };
                let label = format!("{}{}", source.name(), default);
                let value = format!("{} {} {}", source.color(), source.kind().label(), source.location());
                line(out, selected, &label, &value, width)?;
            }
            Row::AddCalendar => {
                if settings.sources.is_empty() {
                    queue!(out, Print("\r\n"))?;
                    heading(out, "CALENDARS")?;
                }
                line(out, selected, "+ Add calendar", "", width)?;
            }
        }
    }
    Ok(())
}

fn render_form(out: &mut impl Write, form: &SourceForm, cursor: usize, width: usize) -> io::Result<()> {
    heading(out, "ADD CALENDAR")?;
    let missing = form.missing_fields();

    for (idx, row) in app::form_rows(form).into_iter().enumerate() {
        let selected = idx == cursor;
        match row {
            FormRow::Kind => line(out, selected, "Type", form.kind().label(), width)?,
            FormRow::Field(field) => {
                let value = match field {
                    Field::Password => "*".repeat(form.value(field).chars().count()),
                    _ => form.value(field).to_string(),
                };
                let value = if field == Field::Directory && form.directories().is_empty() {
                    "(no folders left)".to_string()
                } else if form.is_choice(field) {
                    format!("< {} >", value)
                } else {
                    value
                };
                let label = if missing.contains(&field) {
                    format!("{} (required)", field.label())
                } else {
                    field.label().to_string()
                };
                line(out, selected, &label, &value, width)?;
                if selected {
                    queue!(
                        out,
                        SetForegroundColor(Color::DarkGrey),
                        Print(format!("  {}\r\n", truncate_str(field.description(), width.saturating_sub(2)))),
                        ResetColor
                    )?;
                }
            }
            FormRow::Submit => {
                queue!(out, Print("\r\n"))?;
                let label = format!("[ {} ]", form.submit_label());
                if !form.is_valid() || form.is_busy() {
                    queue!(out, SetForegroundColor(Color::DarkGrey))?;
                }
                line(out, selected, &label, "", width)?;
                queue!(out, ResetColor)?;
            }
        }
    }
    Ok(())
}

fn render_picker(out: &mut impl Write, picker: &MultiSelectPicker<ViewId>, cursor: usize) -> io::Result<()> {
    heading(out, picker.title())?;
    for (idx, (view, label)) in picker.options().iter().enumerate() {
        let check = if picker.is_selected(*view) { "[x]" } else { "[ ]" };
        line(out, idx == cursor, &format!("{} {}", check, label), "", LABEL_WIDTH + 8)?;
    }
    Ok(())
}

fn render_logs(out: &mut impl Write, term_height: u16, width: usize) -> io::Result<()> {
    let top = term_height.saturating_sub(LOG_LINES as u16 + 3);
    queue!(
        out,
        cursor::MoveTo(0, top),
        SetForegroundColor(Color::DarkGrey),
        Print(format!("{}\r\n", "-".repeat(width))),
    )?;
    for entry in logging::get_recent_logs(LOG_LINES) {
        queue!(out, Print(format!(" {}\r\n", truncate_str(&entry, width.saturating_sub(2)))))?;
    }
    queue!(out, ResetColor)
}

/// Label for a device row in status messages
pub fn device_title(device: DeviceClass) -> String {
    format!("{} views", device.label())
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
