use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{
    App, AppState, EditFocus, LoginFocus, ManualAddFocus, RegisterFocus, Tab,
};

use super::styles;
use super::tabs::{performance, search, watchlist};

pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(2), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::LoggingIn) {
        render_login_overlay(frame, app);
    }

    if matches!(app.state, AppState::Registering) {
        render_register_overlay(frame, app);
    }

    if matches!(app.state, AppState::AddingManual) {
        render_manual_add_overlay(frame, app);
    }

    if matches!(app.state, AppState::EditingItem) {
        render_edit_overlay(frame, app);
    }

    if matches!(app.state, AppState::ConfirmingRemove) {
        render_remove_overlay(frame, app);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }

    // The expiry prompt takes precedence over everything else so the
    // countdown is never hidden behind another dialog.
    if app.expiry.is_prompting() {
        render_session_prompt_overlay(frame, app);
    }

    if let Some(secs) = app.welcome_secs_left(now) {
        render_welcome_banner(frame, app, secs);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Stockdeck";
    let help_hint = "[?] Help";

    let user_text = match app.session.user() {
        Some(user) => format!("  {}", user.email),
        None => "  not signed in".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::styled(user_text.clone(), styles::muted_style()),
        Span::raw(" ".repeat(
            (area.width as usize)
                .saturating_sub(title.len() + user_text.len() + help_hint.len() + 2),
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = vec![
        ("[1] Watchlist", app.current_tab == Tab::Watchlist),
        ("[2] Search", app.current_tab == Tab::Search),
        ("[3] Performance", app.current_tab == Tab::Performance),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, selected)) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        if *selected {
            spans.push(Span::styled(*label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(*label, styles::muted_style()));
        }
    }

    let line = Line::from(spans);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Watchlist => watchlist::render(frame, app, area),
        Tab::Search => search::render(frame, app, area),
        Tab::Performance => performance::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[u]pdate | [q]uit";

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => " Ready ".to_string(),
    };
    let right_text = format!(" {} ", shortcuts);

    let (market_text, market_style) = match app.market_status {
        Some(ref status) if status.is_open() => ("● Market open", styles::market_open_style()),
        Some(_) => ("○ Market closed", styles::market_closed_style()),
        None => ("", styles::muted_style()),
    };

    let width = area.width as usize;

    if market_text.is_empty() {
        let padding = width
            .saturating_sub(left_text.len())
            .saturating_sub(right_text.len());
        let status_line = Line::from(vec![
            Span::styled(left_text, styles::muted_style()),
            Span::raw(" ".repeat(padding)),
            Span::styled(right_text, styles::muted_style()),
        ]);
        let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
        frame.render_widget(paragraph, area);
    } else {
        // Center the market indicator absolutely, regardless of the sides
        let center_start = width.saturating_sub(market_text.len()) / 2;
        let left_pad = center_start.saturating_sub(left_text.len());
        let right_start = center_start + market_text.len();
        let right_pad = width
            .saturating_sub(right_start)
            .saturating_sub(right_text.len());

        let status_line = Line::from(vec![
            Span::styled(left_text, styles::muted_style()),
            Span::raw(" ".repeat(left_pad)),
            Span::styled(market_text, market_style),
            Span::raw(" ".repeat(right_pad)),
            Span::styled(right_text, styles::muted_style()),
        ]);
        let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
        frame.render_widget(paragraph, area);
    }
}

/// One bracketed input field line for the form overlays.
fn field_line(label: &str, value: &str, focused: bool, mask: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let shown: String = if mask {
        "*".repeat(value.chars().count().min(20))
    } else {
        // Keep the tail visible while typing long values
        let skip = value.chars().count().saturating_sub(20);
        value.chars().skip(skip).collect()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:>10}: [", label), styles::muted_style()),
        Span::styled(format!("{:<20}{}", shown, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn button_line(label: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let text = if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    Line::from(vec![
        Span::raw("            ["),
        Span::styled(text, style),
        Span::raw("]"),
    ])
}

fn logo_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            "   ╔═╗╔╦╗╔═╗╔═╗╦╔═╔╦╗╔═╗╔═╗╦╔═",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            "   ╚═╗ ║ ║ ║║  ╠╩╗ ║║║╣ ║  ╠╩╗",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            "   ╚═╝ ╩ ╚═╝╚═╝╩ ╩═╩╝╚═╝╚═╝╩ ╩",
            styles::title_style(),
        )),
        Line::from(""),
    ]
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 15 } else { 13 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();

    lines.push(field_line(
        "Email",
        &app.login_email,
        app.login_focus == LoginFocus::Email,
        false,
    ));
    lines.push(field_line(
        "Password",
        &app.login_password,
        app.login_focus == LoginFocus::Password,
        true,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Login", app.login_focus == LoginFocus::Button));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("F2", styles::help_key_style()),
        Span::styled(" to create an account", styles::muted_style()),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_register_overlay(frame: &mut Frame, app: &App) {
    let height = if app.register_error.is_some() { 16 } else { 14 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();

    lines.push(field_line(
        "Email",
        &app.register_email,
        app.register_focus == RegisterFocus::Email,
        false,
    ));
    lines.push(field_line(
        "Password",
        &app.register_password,
        app.register_focus == RegisterFocus::Password,
        true,
    ));
    lines.push(field_line(
        "Confirm",
        &app.register_confirm,
        app.register_focus == RegisterFocus::Confirm,
        true,
    ));
    lines.push(Line::from(""));
    lines.push(button_line(
        "Register",
        app.register_focus == RegisterFocus::Button,
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to return to login", styles::muted_style()),
    ]));

    if let Some(ref error) = app.register_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_manual_add_overlay(frame: &mut Frame, app: &App) {
    let height = if app.manual_error.is_some() { 15 } else { 13 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            "  Add position manually",
            styles::title_style(),
        )),
        Line::from(""),
    ];

    lines.push(field_line(
        "Symbol",
        &app.manual_symbol,
        app.manual_focus == ManualAddFocus::Symbol,
        false,
    ));
    lines.push(field_line(
        "Quantity",
        &app.manual_quantity,
        app.manual_focus == ManualAddFocus::Quantity,
        false,
    ));
    lines.push(field_line(
        "Price",
        &app.manual_price,
        app.manual_focus == ManualAddFocus::Price,
        false,
    ));
    lines.push(field_line(
        "Date",
        &app.manual_date,
        app.manual_focus == ManualAddFocus::Date,
        false,
    ));
    lines.push(field_line(
        "Industry",
        &app.manual_industry,
        app.manual_focus == ManualAddFocus::Industry,
        false,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Add", app.manual_focus == ManualAddFocus::Button));

    if let Some(ref error) = app.manual_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_edit_overlay(frame: &mut Frame, app: &App) {
    let height = if app.edit_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let symbol = app
        .selected_watchlist_item()
        .map(|item| item.stock_symbol.clone())
        .unwrap_or_default();

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  Edit {}", symbol),
            styles::title_style(),
        )),
        Line::from(""),
    ];

    lines.push(field_line(
        "Quantity",
        &app.edit_quantity,
        app.edit_focus == EditFocus::Quantity,
        false,
    ));
    lines.push(field_line(
        "Price",
        &app.edit_price,
        app.edit_focus == EditFocus::Price,
        false,
    ));
    lines.push(field_line(
        "Date",
        &app.edit_date,
        app.edit_focus == EditFocus::Date,
        false,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Save", app.edit_focus == EditFocus::Button));

    if let Some(ref error) = app.edit_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_remove_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 8, frame.area());
    frame.render_widget(Clear, area);

    let symbol = app
        .selected_watchlist_item()
        .map(|item| item.stock_symbol.clone())
        .unwrap_or_default();

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("   Remove {} from the watchlist?", symbol),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to remove, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_session_prompt_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(50, 9, frame.area());
    frame.render_widget(Clear, area);

    let secs = app.expiry.seconds_left().unwrap_or(0);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you still there?",
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("   Your session ends in {} second{}.", secs, if secs == 1 { "" } else { "s" }),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to stay signed in, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to log out", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_welcome_banner(frame: &mut Frame, app: &App, secs: u64) {
    // Bottom-right corner, above the status bar
    let screen = frame.area();
    let width = 40u16.min(screen.width);
    let height = 4u16;
    let x = screen.x + screen.width.saturating_sub(width + 1);
    let y = screen.y + screen.height.saturating_sub(height + 2);
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let email = app
        .session
        .user()
        .map(|user| user.email)
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled(
            format!(" Welcome, {}!", email),
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!(" This message closes in {}s", secs),
            styles::muted_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 26, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(
            "     ╔═╗╔╦╗╔═╗╔═╗╦╔═╔╦╗╔═╗╔═╗╦╔═",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            "     ╚═╗ ║ ║ ║║  ╠╩╗ ║║║╣ ║  ╠╩╗",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            "     ╚═╝ ╩ ╚═╝╚═╝╩ ╩═╩╝╚═╝╚═╝╩ ╩",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            format!("              version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  1-3       ", styles::help_key_style()),
            Span::styled("Switch tabs", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  ←/→       ", styles::help_key_style()),
            Span::styled("Prev/next tab", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓       ", styles::help_key_style()),
            Span::styled("Navigate list", styles::help_desc_style()),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Watchlist", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  s / S     ", styles::help_key_style()),
            Span::styled("Cycle sort column / flip direction", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  a / e / d ", styles::help_key_style()),
            Span::styled("Add manually / edit / delete", styles::help_desc_style()),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Search", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  /         ", styles::help_key_style()),
            Span::styled("Type a ticker query", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  [ / ]     ", styles::help_key_style()),
            Span::styled("Shorter / longer chart range", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  w         ", styles::help_key_style()),
            Span::styled("Add shown stock to watchlist", styles::help_desc_style()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  u / L / q ", styles::help_key_style()),
            Span::styled("Update data / log out / quit", styles::help_desc_style()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 10, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(Span::styled(
        "   Are you sure you want to quit?",
        styles::highlight_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(" to quit, ", styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
