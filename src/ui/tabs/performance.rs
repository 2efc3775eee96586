use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::portfolio::{distribution, performance_rows, sort_rows, totals};
use crate::ui::styles;
use crate::utils::{format_money, format_quantity, format_signed_money};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),      // Totals
            Constraint::Min(6),         // Per-position table
            Constraint::Percentage(30), // Distribution
        ])
        .split(area);

    let mut rows = performance_rows(&app.watchlist, &app.latest_prices);
    sort_rows(&mut rows, app.performance_sort, app.performance_sort_ascending);
    let totals = totals(&rows);

    render_totals(frame, &totals, chunks[0]);
    render_table(frame, app, &rows, chunks[1]);
    render_distribution(frame, app, chunks[2]);
}

fn render_totals(frame: &mut Frame, totals: &crate::portfolio::PortfolioTotals, area: Rect) {
    let lines = vec![
        Line::from(vec![
            Span::styled(" Invested: ", styles::muted_style()),
            Span::raw(format!("{:<14}", format_money(totals.invested))),
            Span::styled("Current: ", styles::muted_style()),
            Span::raw(format!("{:<14}", format_money(totals.current_value))),
            Span::styled("Net: ", styles::muted_style()),
            Span::styled(
                format_signed_money(totals.net()),
                styles::pnl_style(totals.net()),
            ),
        ]),
        Line::from(vec![
            Span::styled(" Gained:   ", styles::muted_style()),
            Span::styled(
                format!("{:<14}", format_money(totals.gained)),
                styles::gain_style(),
            ),
            Span::styled("Lost:    ", styles::muted_style()),
            Span::styled(format_money(totals.lost), styles::loss_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Portfolio ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_table(
    frame: &mut Frame,
    app: &App,
    rows: &[crate::portfolio::PerformanceRow],
    area: Rect,
) {
    let header = Row::new([
        Cell::from("Symbol"),
        Cell::from("Purchase"),
        Cell::from("Latest"),
        Cell::from("Quantity"),
        Cell::from("P/L"),
    ])
    .style(styles::title_style())
    .height(1);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.stock_symbol.clone()),
                Cell::from(format_money(row.purchase_price)),
                Cell::from(if row.latest_price > 0.0 {
                    format_money(row.latest_price)
                } else {
                    "-".to_string()
                }),
                Cell::from(format_quantity(row.quantity)),
                Cell::from(format_signed_money(row.profit_loss))
                    .style(styles::pnl_style(row.profit_loss)),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Fill(1),
    ];

    let direction = if app.performance_sort_ascending { "↑" } else { "↓" };
    let title = format!(
        " Positions - sorted by {} {} - [s]ort [S]direction ",
        app.performance_sort.label(),
        direction,
    );

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !rows.is_empty() {
        state.select(Some(app.performance_selection.min(rows.len() - 1)));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_distribution(frame: &mut Frame, app: &App, area: Rect) {
    let distribution = distribution(&app.watchlist);
    let total: f64 = distribution.iter().map(|(_, value)| value).sum();

    let block = Block::default()
        .title(" Distribution by symbol ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if distribution.is_empty() || total <= 0.0 {
        let hint = Paragraph::new(Line::from(Span::styled(
            " No positions yet",
            styles::muted_style(),
        )));
        frame.render_widget(hint, inner);
        return;
    }

    // One gauge row per symbol, as many as fit
    let visible = distribution.len().min(inner.height as usize);
    let constraints = vec![Constraint::Length(1); visible];
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, (symbol, value)) in distribution.iter().take(visible).enumerate() {
        let ratio = (value / total).clamp(0.0, 1.0);
        let gauge = Gauge::default()
            .ratio(ratio)
            .label(format!(
                "{} {} ({:.1}%)",
                symbol,
                format_money(*value),
                ratio * 100.0
            ))
            .gauge_style(styles::gain_style())
            .use_unicode(true);
        frame.render_widget(gauge, rows[i]);
    }
}
