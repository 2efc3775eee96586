use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::{format_money, format_quantity, format_signed_money};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    render_table(frame, app, chunks[0]);
    render_summary(frame, app, chunks[1]);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let header_cells = [
        Cell::from("Symbol"),
        Cell::from("Price"),
        Cell::from("Quantity"),
        Cell::from("Invested"),
        Cell::from("Latest"),
        Cell::from("P/L"),
        Cell::from("Added"),
    ];
    let header = Row::new(header_cells)
        .style(styles::title_style())
        .height(1);

    let rows: Vec<Row> = app
        .watchlist
        .iter()
        .map(|item| {
            let latest = app.latest_prices.get(&item.stock_symbol).copied();
            let (latest_text, pnl_cell) = match latest {
                Some(price) => {
                    let pnl = (price - item.price_at_time) * item.quantity;
                    (
                        format_money(price),
                        Cell::from(format_signed_money(pnl)).style(styles::pnl_style(pnl)),
                    )
                }
                None => (
                    "-".to_string(),
                    Cell::from("-").style(styles::muted_style()),
                ),
            };

            let symbol_text = if item.manual {
                format!("{} *", item.stock_symbol)
            } else {
                item.stock_symbol.clone()
            };

            Row::new(vec![
                Cell::from(symbol_text),
                Cell::from(format_money(item.price_at_time)),
                Cell::from(format_quantity(item.quantity)),
                Cell::from(format_money(item.invested())),
                Cell::from(latest_text),
                pnl_cell,
                Cell::from(item.added_date().to_string()),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(10), // Symbol
        Constraint::Length(12), // Price
        Constraint::Length(10), // Quantity
        Constraint::Length(14), // Invested
        Constraint::Length(12), // Latest
        Constraint::Length(14), // P/L
        Constraint::Fill(1),    // Added
    ];

    let direction = if app.watchlist_sort_ascending { "↑" } else { "↓" };
    let title = format!(
        " Watchlist ({}) - sorted by {} {} - [s]ort [S]direction [a]dd [e]dit [d]elete ",
        app.watchlist.len(),
        app.watchlist_sort.label(),
        direction,
    );

    let table = Table::new(rows, widths)
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
    state.select(Some(app.watchlist_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" Total invested: ", styles::muted_style()),
        Span::styled(format_money(app.watchlist_total), styles::highlight_style()),
        Span::styled("   * entered manually", styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(line).block(block), area);
}
