use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Sparkline},
    Frame,
};

use crate::app::{App, AppState};
use crate::ui::styles;
use crate::utils::{format_market_cap, format_money};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(chunks[0]);

    render_query(frame, app, left[0]);
    render_results(frame, app, left[1]);
    render_detail(frame, app, chunks[1]);
}

fn render_query(frame: &mut Frame, app: &App, area: Rect) {
    let typing = matches!(app.state, AppState::Searching);
    let cursor = if typing { "▌" } else { "" };

    let line = Line::from(vec![
        Span::styled(" Query: ", styles::muted_style()),
        Span::styled(
            format!("{}{}", app.search_input, cursor),
            if typing {
                styles::highlight_style()
            } else {
                styles::list_item_style()
            },
        ),
    ]);

    let title = if typing {
        " Search (Enter to run, Esc to cancel) "
    } else {
        " Search (press / to type) "
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(typing));

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .search_results
        .iter()
        .map(|result| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<7}", result.ticker), styles::highlight_style()),
                Span::styled(result.name.clone(), styles::list_item_style()),
            ]))
        })
        .collect();

    let title = format!(" Results ({}) - Enter to open ", app.search_results.len());

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(app.selected_symbol.is_none())),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    if !app.search_results.is_empty() {
        state.select(Some(app.search_selection));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref symbol) = app.selected_symbol else {
        let block = Block::default()
            .title(" Stock ")
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        let hint = Paragraph::new(Line::from(Span::styled(
            " Select a search result to view details",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Facts
            Constraint::Min(6),    // Chart
            Constraint::Length(7), // News
        ])
        .split(area);

    render_facts(frame, app, symbol, chunks[0]);
    render_chart(frame, app, chunks[1]);
    render_news(frame, app, chunks[2]);
}

fn render_facts(frame: &mut Frame, app: &App, symbol: &str, area: Rect) {
    let mut lines = vec![];

    match app.ticker_details {
        Some(ref details) => {
            lines.push(Line::from(Span::styled(
                format!("{} - {}", details.ticker, details.name),
                styles::title_style(),
            )));
            if let Some(cap) = details.market_cap {
                lines.push(Line::from(vec![
                    Span::styled("Market cap: ", styles::muted_style()),
                    Span::raw(format_market_cap(cap)),
                ]));
            }
            if let Some(ref industry) = details.sic_description {
                lines.push(Line::from(vec![
                    Span::styled("Industry:   ", styles::muted_style()),
                    Span::raw(industry.clone()),
                ]));
            }
        }
        None => {
            lines.push(Line::from(Span::styled(symbol, styles::title_style())));
        }
    }

    if let Some(ref bar) = app.prev_close {
        let change = bar.change() * 100.0;
        lines.push(Line::from(vec![
            Span::styled("Prev close: ", styles::muted_style()),
            Span::raw(format_money(bar.c)),
            Span::raw("  "),
            Span::styled(format!("{:+.2}%", change), styles::pnl_style(change)),
            Span::styled(
                format!("  O {}  H {}  L {}", bar.o, bar.h, bar.l),
                styles::muted_style(),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Quantity: ", styles::muted_style()),
        Span::styled(app.search_quantity.clone(), styles::highlight_style()),
        Span::styled("  (+/- to change, w to add to watchlist)", styles::muted_style()),
    ]));

    let block = Block::default()
        .title(format!(" {} ", symbol))
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    // Sparkline takes u64 values, so closes are scaled to cents
    let data: Vec<u64> = app
        .history
        .iter()
        .map(|bar| (bar.c * 100.0).max(0.0) as u64)
        .collect();

    let (low, high) = app
        .history
        .iter()
        .fold((f64::MAX, f64::MIN), |(low, high), bar| {
            (low.min(bar.c), high.max(bar.c))
        });

    let range_info = if app.history.is_empty() {
        format!(" {} - loading... ", app.history_range.label())
    } else {
        format!(
            " {} - low {} high {} - [ / ] to change range ",
            app.history_range.label(),
            format_money(low),
            format_money(high),
        )
    };

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(range_info)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .data(&data)
        .style(styles::gain_style());

    frame.render_widget(sparkline, area);
}

fn render_news(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .news
        .iter()
        .map(|article| {
            let date = article.published_utc.split('T').next().unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<11}", date), styles::muted_style()),
                Span::styled(
                    format!("{} ", article.publisher.name),
                    styles::highlight_style(),
                ),
                Span::styled(article.title.clone(), styles::list_item_style()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" News ")
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    if !app.news.is_empty() {
        state.select(Some(app.news_selection));
    }

    frame.render_stateful_widget(list, area, &mut state);
}
