use crate::market::types::format_price;
use crate::simulate::shorten_address;
use crate::state::{PlayerState, XP_PER_LEVEL};
use crate::ui::Palette;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratatui::Frame;

// Display-only conversion used for the portfolio estimate.
const HPX_USD_RATE: f64 = 0.04;
const TON_USD_RATE: f64 = 6.5;

pub(crate) fn draw(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Min(6),
        ])
        .split(area);

    draw_level(f, rows[0], player, colors);
    draw_wallet(f, rows[1], player, colors);
    draw_settings(f, rows[2], player, colors);
}

fn draw_level(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title(format!("Level {}", player.level))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let portfolio =
        player.balance * HPX_USD_RATE + player.ton_balance * TON_USD_RATE;
    let estimate = Line::from(vec![
        Span::styled("Portfolio ~ ", Style::default().fg(colors.dim)),
        Span::styled(
            format!("${}", format_price(portfolio)),
            Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(estimate), segments[0]);

    let progress = player.level_progress_percent();
    let gauge = Gauge::default()
        .ratio((progress / 100.0).clamp(0.0, 1.0))
        .gauge_style(
            Style::default()
                .fg(colors.accent)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .label(format!("{}/{} XP", player.xp % XP_PER_LEVEL, XP_PER_LEVEL));
    f.render_widget(gauge, segments[1]);
}

fn draw_wallet(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Wallet")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let mut lines = Vec::new();
    match &player.wallet_address {
        Some(address) => {
            lines.push(Line::from(vec![
                Span::styled("Connected ", Style::default().fg(colors.up)),
                Span::styled(shorten_address(address), Style::default().fg(colors.text)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("TON ", Style::default().fg(colors.dim)),
                Span::styled(
                    format!("{:.5}", player.ton_balance),
                    Style::default().fg(colors.accent),
                ),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "w withdraw | d deposit | p PIN | x disconnect",
                Style::default().fg(colors.dim),
            )));
        }
        None => {
            lines.push(Line::from(Span::styled(
                "No wallet connected",
                Style::default().fg(colors.dim),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Press c to connect the demo wallet",
                Style::default().fg(colors.dim),
            )));
        }
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_settings(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Settings")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let toggle = |enabled: bool| if enabled { "on" } else { "off" };
    let lines = vec![
        Line::from(vec![
            Span::styled("Theme          ", Style::default().fg(colors.dim)),
            Span::styled(
                player.theme.as_str(),
                Style::default().fg(colors.accent),
            ),
            Span::styled("  (t cycles)", Style::default().fg(colors.dim)),
        ]),
        Line::from(vec![
            Span::styled("Sound          ", Style::default().fg(colors.dim)),
            Span::raw(toggle(player.sound_enabled)),
            Span::styled("  (s toggles)", Style::default().fg(colors.dim)),
        ]),
        Line::from(vec![
            Span::styled("Notifications  ", Style::default().fg(colors.dim)),
            Span::raw(toggle(player.notifications_enabled)),
            Span::styled("  (n toggles)", Style::default().fg(colors.dim)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("hypenax v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(colors.dim),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}
