//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{
    App, AppState, EditFocus, LoginFocus, ManualAddFocus, RegisterFocus, Tab, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // The expiry prompt overrides every other state while it is showing.
    if app.expiry.is_prompting() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.confirm_session_prompt();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.decline_session_prompt();
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle login overlay
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    // Handle registration overlay
    if matches!(app.state, AppState::Registering) {
        return handle_register_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle removal confirmation
    if matches!(app.state, AppState::ConfirmingRemove) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.remove_selected();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle search query typing
    if matches!(app.state, AppState::Searching) {
        match key.code {
            KeyCode::Enter => {
                app.state = AppState::Normal;
                app.trigger_search(Instant::now());
            }
            KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            KeyCode::Backspace => {
                app.search_input.pop();
            }
            KeyCode::Char(c) => {
                app.search_input.push(c.to_ascii_uppercase());
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle the manual-add form
    if matches!(app.state, AppState::AddingManual) {
        handle_manual_add_input(app, key);
        return Ok(false);
    }

    // Handle the edit form
    if matches!(app.state, AppState::EditingItem) {
        handle_edit_input(app, key);
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('1') => app.current_tab = Tab::Watchlist,
        KeyCode::Char('2') => app.current_tab = Tab::Search,
        KeyCode::Char('3') => app.current_tab = Tab::Performance,
        KeyCode::Left => app.current_tab = app.current_tab.prev(),
        KeyCode::Right => app.current_tab = app.current_tab.next(),
        KeyCode::Char('u') => app.refresh_watchlist_background(),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Up => app.move_selection(-1),
        KeyCode::Down => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => app.move_selection(PAGE_SCROLL_SIZE as isize),
        _ => {
            // Tab-specific keys
            match app.current_tab {
                Tab::Watchlist => handle_watchlist_keys(app, key),
                Tab::Search => handle_search_tab_keys(app, key),
                Tab::Performance => handle_performance_keys(app, key),
            }
        }
    }

    Ok(false)
}

fn handle_watchlist_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') => app.cycle_watchlist_sort(),
        KeyCode::Char('S') => app.toggle_watchlist_direction(),
        KeyCode::Char('a') => app.start_manual_add(),
        KeyCode::Char('e') => app.start_edit_selected(),
        KeyCode::Char('d') => {
            if app.selected_watchlist_item().is_some() {
                app.state = AppState::ConfirmingRemove;
            }
        }
        _ => {}
    }
}

fn handle_search_tab_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
            app.search_input.clear();
            app.selected_symbol = None;
        }
        KeyCode::Enter => app.select_search_result(Instant::now()),
        KeyCode::Esc => {
            // Back out of the detail view to the result list
            app.selected_symbol = None;
        }
        KeyCode::Char('[') => app.change_history_range(Instant::now(), false),
        KeyCode::Char(']') => app.change_history_range(Instant::now(), true),
        KeyCode::Char('w') => app.add_selected_to_watchlist(),
        KeyCode::Char('+') => adjust_quantity(&mut app.search_quantity, 1.0),
        KeyCode::Char('-') => adjust_quantity(&mut app.search_quantity, -1.0),
        _ => {}
    }
}

fn handle_performance_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') => app.cycle_performance_sort(),
        KeyCode::Char('S') => app.toggle_performance_direction(),
        _ => {}
    }
}

fn adjust_quantity(value: &mut String, delta: f64) {
    let current: f64 = value.trim().parse().unwrap_or(1.0);
    let next = (current + delta).max(1.0);
    *value = crate::utils::format_quantity(next);
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                // Errors surface through login_error on the overlay
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::F(2) => app.start_register(),
        KeyCode::Backspace => app.pop_login_char(),
        KeyCode::Char(c) => app.push_login_char(c),
        KeyCode::Esc => {
            return Ok(true);
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_register_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            app.register_focus = match app.register_focus {
                RegisterFocus::Email => RegisterFocus::Password,
                RegisterFocus::Password => RegisterFocus::Confirm,
                RegisterFocus::Confirm => RegisterFocus::Button,
                RegisterFocus::Button => RegisterFocus::Email,
            };
        }
        KeyCode::Up => {
            app.register_focus = match app.register_focus {
                RegisterFocus::Email => RegisterFocus::Button,
                RegisterFocus::Password => RegisterFocus::Email,
                RegisterFocus::Confirm => RegisterFocus::Password,
                RegisterFocus::Button => RegisterFocus::Confirm,
            };
        }
        KeyCode::Enter => match app.register_focus {
            RegisterFocus::Email => app.register_focus = RegisterFocus::Password,
            RegisterFocus::Password => app.register_focus = RegisterFocus::Confirm,
            RegisterFocus::Confirm | RegisterFocus::Button => {
                let _ = app.attempt_register().await;
            }
        },
        KeyCode::Backspace => app.pop_register_char(),
        KeyCode::Char(c) => app.push_register_char(c),
        KeyCode::Esc => app.start_login(),
        _ => {}
    }
    Ok(false)
}

fn handle_manual_add_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => app.manual_focus = app.manual_focus.next(),
        KeyCode::Enter => {
            if app.manual_focus == ManualAddFocus::Button {
                app.submit_manual_add();
            } else {
                app.manual_focus = app.manual_focus.next();
            }
        }
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Backspace => {
            manual_field_mut(app).pop();
        }
        KeyCode::Char(c) => {
            manual_field_mut(app).push(c);
        }
        _ => {}
    }
}

fn manual_field_mut(app: &mut App) -> &mut String {
    // The button has no text; route stray typing to the symbol field
    match app.manual_focus {
        ManualAddFocus::Symbol | ManualAddFocus::Button => &mut app.manual_symbol,
        ManualAddFocus::Quantity => &mut app.manual_quantity,
        ManualAddFocus::Price => &mut app.manual_price,
        ManualAddFocus::Date => &mut app.manual_date,
        ManualAddFocus::Industry => &mut app.manual_industry,
    }
}

fn handle_edit_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => app.edit_focus = app.edit_focus.next(),
        KeyCode::Enter => {
            if app.edit_focus == EditFocus::Button {
                app.submit_edit();
            } else {
                app.edit_focus = app.edit_focus.next();
            }
        }
        KeyCode::Esc => {
            app.editing_item_id = None;
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => {
            edit_field_mut(app).pop();
        }
        KeyCode::Char(c) => {
            edit_field_mut(app).push(c);
        }
        _ => {}
    }
}

fn edit_field_mut(app: &mut App) -> &mut String {
    match app.edit_focus {
        EditFocus::Quantity | EditFocus::Button => &mut app.edit_quantity,
        EditFocus::Price => &mut app.edit_price,
        EditFocus::Date => &mut app.edit_date,
    }
}
