use crate::app::{App, OrderSide};
use crate::market::types::{format_price, MarketEntry, Timeframe};
use crate::state::{MarketState, PlayerState, SelectedAsset};
use crate::ui::Palette;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use std::hash::{DefaultHasher, Hash, Hasher};

const BOOK_DEPTH: usize = 5;
const BOOK_STEP: f64 = 0.0005;

pub(crate) fn draw(
    f: &mut Frame<'_>,
    area: Rect,
    app: &App,
    market: &MarketState,
    player: &PlayerState,
    colors: &Palette,
) {
    match &market.selected {
        Some(selected) => draw_detail(f, area, app, selected, player, colors),
        None => draw_listing(f, area, app, market, colors),
    }
}

fn draw_listing(f: &mut Frame<'_>, area: Rect, app: &App, market: &MarketState, colors: &Palette) {
    let block = Block::default()
        .title("Market")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let header = Line::from(Span::styled(
        format!(
            "{:>3}  {:<10} {:<18} {:>14} {:>8} {:>10}",
            "#", "Pair", "Name", "Price", "24h", "Volume"
        ),
        Style::default().fg(colors.dim).add_modifier(Modifier::BOLD),
    ));
    f.render_widget(Paragraph::new(header), rows[0]);

    let items: Vec<ListItem> = market
        .entries
        .iter()
        .map(|entry| listing_item(entry, colors))
        .collect();
    let list = List::new(items).highlight_style(
        Style::default()
            .fg(colors.warn)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(
        app.market_cursor
            .min(market.entries.len().saturating_sub(1)),
    ));
    f.render_stateful_widget(list, rows[1], &mut state);
}

fn listing_item(entry: &MarketEntry, colors: &Palette) -> ListItem<'static> {
    let change_style = if entry.change >= 0.0 {
        Style::default().fg(colors.up)
    } else {
        Style::default().fg(colors.down)
    };
    let mut spans = vec![
        Span::styled(
            format!("{:>3}  ", entry.rank),
            Style::default().fg(colors.dim),
        ),
        Span::styled(
            format!("{:<10} ", format!("{}/{}", entry.symbol, entry.pair)),
            Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{:<18} ", truncate(&entry.name, 17)),
            Style::default().fg(colors.dim),
        ),
        Span::styled(
            format!("{:>14} ", format_price(entry.price)),
            Style::default().fg(colors.text),
        ),
        Span::styled(format!("{:>+7.2}% ", entry.change), change_style),
        Span::styled(
            format!("{:>10}", entry.volume),
            Style::default().fg(colors.dim),
        ),
    ];
    if entry.is_new {
        spans.push(Span::styled(
            " NEW",
            Style::default().fg(colors.warn).add_modifier(Modifier::BOLD),
        ));
    }
    ListItem::new(vec![Line::from(spans)])
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}

fn draw_detail(
    f: &mut Frame<'_>,
    area: Rect,
    app: &App,
    selected: &SelectedAsset,
    player: &PlayerState,
    colors: &Palette,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(columns[0]);
    draw_entry_summary(f, left[0], selected, colors);
    draw_chart(f, left[1], selected, colors);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(9)])
        .split(columns[1]);
    draw_order_book(f, right[0], &selected.entry, colors);
    draw_ticket(f, right[1], app, selected, player, colors);
}

fn draw_entry_summary(f: &mut Frame<'_>, area: Rect, selected: &SelectedAsset, colors: &Palette) {
    let entry = &selected.entry;
    let block = Block::default()
        .title(format!("{}/{}", entry.symbol, entry.pair))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let change_style = if entry.change >= 0.0 {
        Style::default().fg(colors.up)
    } else {
        Style::default().fg(colors.down)
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", format_price(entry.price)),
                Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{:+.2}%", entry.change), change_style),
            Span::styled(
                format!("   H {}  L {}  Vol {}", format_price(entry.high), format_price(entry.low), entry.volume),
                Style::default().fg(colors.dim),
            ),
        ]),
        timeframe_line(selected.timeframe, colors),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn timeframe_line(current: Timeframe, colors: &Palette) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "Timeframe ".to_string(),
        Style::default().fg(colors.dim),
    )];
    for timeframe in [Timeframe::D1, Timeframe::D7, Timeframe::D30] {
        let style = if timeframe == current {
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.dim)
        };
        spans.push(Span::styled(format!("[{}] ", timeframe.as_str()), style));
    }
    spans.push(Span::styled(
        "(Tab cycles)".to_string(),
        Style::default().fg(colors.dim),
    ));
    Line::from(spans)
}

fn draw_chart(f: &mut Frame<'_>, area: Rect, selected: &SelectedAsset, colors: &Palette) {
    let title = if selected.chart_loading {
        format!("Price ({}) - loading...", selected.timeframe.as_str())
    } else {
        format!("Price ({})", selected.timeframe.as_str())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));

    if selected.chart.len() < 2 {
        f.render_widget(block.clone(), area);
        let placeholder = Paragraph::new("No chart data yet").wrap(Wrap { trim: true });
        f.render_widget(placeholder, block.inner(area));
        return;
    }

    let data: Vec<(f64, f64)> = selected
        .chart
        .iter()
        .enumerate()
        .map(|(index, point)| (index as f64, point.value))
        .collect();
    let (mut min, mut max) = (f64::MAX, f64::MIN);
    for (_, value) in &data {
        min = min.min(*value);
        max = max.max(*value);
    }
    if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }
    let pad = (max - min) * 0.05;
    let (floor, ceiling) = (min - pad, max + pad);

    let x_labels = vec![
        Span::raw(selected.chart.first().map(|p| p.time.clone()).unwrap_or_default()),
        Span::raw(
            selected
                .chart
                .get(selected.chart.len() / 2)
                .map(|p| p.time.clone())
                .unwrap_or_default(),
        ),
        Span::raw(selected.chart.last().map(|p| p.time.clone()).unwrap_or_default()),
    ];
    let y_labels = vec![
        Span::raw(format_price(floor)),
        Span::raw(format_price((floor + ceiling) / 2.0)),
        Span::raw(format_price(ceiling)),
    ];

    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(colors.accent))
        .data(&data)];
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(colors.dim))
                .bounds([0.0, (data.len() - 1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(colors.dim))
                .bounds([floor, ceiling])
                .labels(y_labels),
        );
    f.render_widget(chart, area);
}

// The ladder is synthetic; seeding by symbol keeps it stable across frames
// while the mid price keeps tracking the live listing.
fn draw_order_book(f: &mut Frame<'_>, area: Rect, entry: &MarketEntry, colors: &Palette) {
    let block = Block::default()
        .title("Book")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let mut hasher = DefaultHasher::new();
    entry.symbol.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());

    let mut lines: Vec<Line> = Vec::with_capacity(BOOK_DEPTH * 2 + 1);
    let mut asks = Vec::with_capacity(BOOK_DEPTH);
    for level in 1..=BOOK_DEPTH {
        let price = entry.price * (1.0 + BOOK_STEP * level as f64);
        let size: f64 = rng.gen_range(0.5..40.0);
        asks.push((price, size));
    }
    for (price, size) in asks.iter().rev() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:>14} ", format_price(*price)),
                Style::default().fg(colors.down),
            ),
            Span::styled(format!("{size:>9.3}"), Style::default().fg(colors.dim)),
        ]));
    }
    lines.push(Line::from(Span::styled(
        format!("{:>14} ", format_price(entry.price)),
        Style::default()
            .fg(colors.text)
            .add_modifier(Modifier::BOLD),
    )));
    for level in 1..=BOOK_DEPTH {
        let price = entry.price * (1.0 - BOOK_STEP * level as f64);
        let size: f64 = rng.gen_range(0.5..40.0);
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:>14} ", format_price(price)),
                Style::default().fg(colors.up),
            ),
            Span::styled(format!("{size:>9.3}"), Style::default().fg(colors.dim)),
        ]));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_ticket(
    f: &mut Frame<'_>,
    area: Rect,
    app: &App,
    selected: &SelectedAsset,
    player: &PlayerState,
    colors: &Palette,
) {
    let block = Block::default()
        .title("Ticket")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let form = &app.trade_form;
    let buy_style = if form.side == Some(OrderSide::Buy) {
        Style::default()
            .fg(colors.up)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(colors.dim)
    };
    let sell_style = if form.side == Some(OrderSide::Sell) {
        Style::default()
            .fg(colors.down)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(colors.dim)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" BUY ", buy_style),
            Span::raw("  "),
            Span::styled(" SELL ", sell_style),
            Span::styled("   b/s to pick", Style::default().fg(colors.dim)),
        ]),
        Line::from(vec![
            Span::styled("Amount ", Style::default().fg(colors.dim)),
            Span::styled(
                format!("{}_", form.amount),
                Style::default().fg(colors.text),
            ),
            match form.percent_label() {
                Some(percent) => Span::styled(
                    format!("  ({percent}%)"),
                    Style::default().fg(colors.accent),
                ),
                None => Span::raw(""),
            },
        ]),
    ];

    if let Some(amount) = form.parsed_amount() {
        lines.push(Line::from(vec![
            Span::styled("Cost   ", Style::default().fg(colors.dim)),
            Span::styled(
                format!("{} HPX", format_price(amount * selected.entry.price)),
                Style::default().fg(colors.accent),
            ),
        ]));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        format!("Avail  {} HPX", format_price(player.balance)),
        Style::default().fg(colors.dim),
    )));

    match &form.notice {
        Some(notice) => lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(colors.down),
        ))),
        None => lines.push(Line::from(Span::styled(
            "p percent | Enter submit",
            Style::default().fg(colors.dim),
        ))),
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_longer_than_the_column_are_truncated() {
        assert_eq!(truncate("Bitcoin", 17), "Bitcoin");
        assert_eq!(truncate("An Extremely Long Asset Name", 10), "An Extrem~");
    }
}
