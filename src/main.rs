mod app;
mod ui;

use app::{App, FormRow, Row, Screen};
use calendar_settings::caldav::CalDavClient;
use calendar_settings::config::{self, JsonFileStore, VaultConfig, WEEKDAYS};
use calendar_settings::error::Result;
use calendar_settings::form::FormRejection;
use calendar_settings::host::{FsVault, Notices};
use calendar_settings::logging;
use calendar_settings::settings::SettingsTab;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

type Tab = SettingsTab<JsonFileStore, Notices>;

/// Host services the settings screens read from
struct Host {
    vault: FsVault,
    daily_template: Option<PathBuf>,
    caldav: CalDavClient,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    logging::init(&config::config_dir())?;

    let vault_config = VaultConfig::load()?;
    let host = Host {
        vault: FsVault::new(&vault_config.root),
        daily_template: vault_config.template_note(),
        caldav: CalDavClient::new(),
    };

    let store = JsonFileStore::default_location();
    tracing::info!(path = %store.path().display(), "loading settings");
    let mut tab = SettingsTab::load(store, Notices::new()).await?;
    let mut app = App::new();

    // Enable raw mode for single-keypress input
    enable_raw_mode()?;
    let result = run(&mut app, &mut tab, &host).await;

    // Cleanup: restore cursor, clear screen, disable raw mode
    disable_raw_mode()?;
    execute!(stdout(), cursor::Show, Clear(ClearType::All), cursor::MoveTo(0, 0))?;

    result
}

async fn run(app: &mut App, tab: &mut Tab, host: &Host) -> std::result::Result<(), Box<dyn std::error::Error>> {
    loop {
        while let Some(notice) = tab.notifier().pop() {
            app.set_status(notice);
        }
        app.clear_expired_status();
        ui::render(app, tab.settings())?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let handled = match app.screen {
            Screen::Settings => handle_settings_key(app, tab, host, key).await,
            Screen::AddSource { .. } => handle_form_key(app, tab, host, key).await.map(|_| false),
            Screen::PickViews { .. } => handle_picker_key(app, tab, key).await.map(|_| false),
        };

        match handled {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "settings update failed");
                app.set_status(format!("Error: {}", e));
            }
        }
    }
    Ok(())
}

/// Returns true when the user asked to quit
async fn handle_settings_key(app: &mut App, tab: &mut Tab, host: &Host, key: KeyEvent) -> Result<bool> {
    let row = app.selected_row(tab.settings());

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(tab.settings()),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('L') => app.show_logs = !app.show_logs,
        KeyCode::Char('a') => open_form(app, tab, host),
        KeyCode::Char('h') | KeyCode::Left => change(app, tab, row, false).await?,
        KeyCode::Char('l') | KeyCode::Right => change(app, tab, row, true).await?,
        KeyCode::Enter | KeyCode::Char(' ') => match row {
            Some(Row::Views(device)) => app.open_picker(device, tab.edit_views(device)),
            Some(Row::Source(i)) => {
                if tab.set_default_calendar(i).await?
                    && let Some(source) = tab.settings().sources.get(i)
                {
                    app.set_status(format!("Default calendar: {}", source.name()));
                }
            }
            Some(Row::AddCalendar) => open_form(app, tab, host),
            _ => change(app, tab, row, true).await?,
        },
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(Row::Source(i)) = row
                && let Some(removed) = tab.remove_source(i).await?
            {
                app.set_status(format!("Removed {}", removed.name()));
                app.clamp_selection(tab.settings());
            }
        }
        KeyCode::Char('J') => {
            if let Some(Row::Source(i)) = row
                && tab.move_source(i, i + 1).await?
            {
                app.select_row(tab.settings(), Row::Source(i + 1));
            }
        }
        KeyCode::Char('K') => {
            if let Some(Row::Source(i)) = row
                && i > 0
                && tab.move_source(i, i - 1).await?
            {
                app.select_row(tab.settings(), Row::Source(i - 1));
            }
        }
        _ => {}
    }
    Ok(false)
}

/// Step the value on a settings row
async fn change(app: &mut App, tab: &mut Tab, row: Option<Row>, forward: bool) -> Result<()> {
    let days = WEEKDAYS.len() as u8;
    match row {
        Some(Row::FirstDayOfWeek) => {
            let day = tab.settings().first_day_of_week;
            let next = if forward { (day + 1) % days } else { (day + days - 1) % days };
            tab.set_first_day_of_week(next).await?;
        }
        Some(Row::TimeFormat) => {
            let enabled = !tab.settings().time_format_24h;
            tab.set_time_format_24h(enabled).await?;
        }
        Some(Row::ClickToCreate) => {
            let enabled = !tab.settings().click_to_create_event_from_month_view;
            tab.set_click_to_create(enabled).await?;
        }
        Some(Row::InitialView(device)) => {
            if !tab.cycle_initial_view(device, forward).await? {
                app.set_status(format!("Only one {} view is enabled", device.label().to_lowercase()));
            }
        }
        _ => {}
    }
    Ok(())
}

fn open_form(app: &mut App, tab: &Tab, host: &Host) {
    let form = tab.open_add_form(&host.vault, &host.vault, host.daily_template.as_deref());
    app.open_form(form);
}

async fn handle_form_key(app: &mut App, tab: &mut Tab, host: &Host, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.take_screen();
        }
        KeyCode::Down | KeyCode::Tab => app.cursor_down(),
        KeyCode::Up | KeyCode::BackTab => app.cursor_up(),
        KeyCode::Left => app.form_cycle(false),
        KeyCode::Right => app.form_cycle(true),
        KeyCode::Backspace => app.form_backspace(),
        KeyCode::Enter => match app.form_row() {
            Some(FormRow::Submit) => submit_form(app, tab, host).await?,
            _ => app.cursor_down(),
        },
        KeyCode::Char(c) => app.form_type(c),
        _ => {}
    }
    Ok(())
}

async fn submit_form(app: &mut App, tab: &mut Tab, host: &Host) -> Result<()> {
    let Screen::AddSource { form, .. } = &mut app.screen else {
        return Ok(());
    };
    let draft = match form.begin_submit() {
        Ok(draft) => draft,
        Err(FormRejection::Busy) => return Ok(()),
        Err(FormRejection::MissingFields(fields)) => {
            let names: Vec<&str> = fields.iter().map(|f| f.label()).collect();
            app.set_status(format!("Required: {}", names.join(", ")));
            return Ok(());
        }
    };

    // Show the in-flight label while the import runs
    ui::render(app, tab.settings())?;
    let result = tab.submit_draft(draft, &host.caldav).await;
    if let Screen::AddSource { form, .. } = &mut app.screen {
        form.finish_submit();
    }

    let added = result?;
    if added > 0 {
        app.take_screen();
        app.select_row(tab.settings(), Row::AddCalendar);
        let noun = if added == 1 { "calendar" } else { "calendars" };
        app.set_status(format!("Added {} {}", added, noun));
    }
    Ok(())
}

async fn handle_picker_key(app: &mut App, tab: &mut Tab, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            if let Screen::PickViews { picker, .. } = app.take_screen() {
                picker.cancel();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.cursor_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor_up(),
        KeyCode::Char(' ') | KeyCode::Char('x') => app.picker_toggle(),
        KeyCode::Enter => {
            if let Screen::PickViews { device, picker, .. } = app.take_screen() {
                let selected = picker.commit(|selected| selected);
                if tab.commit_views(device, selected).await? {
                    app.set_status(format!("{} saved", ui::device_title(device)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
