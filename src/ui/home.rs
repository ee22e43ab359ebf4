use crate::market::types::format_price;
use crate::state::{MiningType, PlayerState, DAILY_REWARD_AMOUNT, TON_RATE_PER_SECOND};
use crate::ui::Palette;
use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use std::time::Duration;

pub(crate) fn draw(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(6),
        ])
        .split(area);

    draw_balances(f, rows[0], player, colors);
    draw_mining(f, rows[1], player, colors);
    draw_daily(f, rows[2], player, colors);
}

fn draw_balances(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Balances")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let lines = vec![
        Line::from(vec![
            Span::styled("HPX  ", Style::default().fg(colors.dim)),
            Span::styled(
                format_price(player.balance),
                Style::default()
                    .fg(colors.text)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("TON  ", Style::default().fg(colors.dim)),
            Span::styled(
                format!("{:.5}", player.ton_balance),
                Style::default().fg(colors.accent),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rate ", Style::default().fg(colors.dim)),
            Span::styled(rate_label(player), Style::default().fg(colors.up)),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn rate_label(player: &PlayerState) -> String {
    match player.mining_type {
        MiningType::Ton => format!("+{TON_RATE_PER_SECOND:.5} TON/s"),
        MiningType::Hypenax => format!("+{:.2} HPX/hr", player.profit_per_hour),
    }
}

fn draw_mining(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Miner")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let mut lines = Vec::new();
    if player.is_mining {
        lines.push(Line::from(vec![
            Span::styled("Status  ", Style::default().fg(colors.dim)),
            Span::styled(
                format!("RUNNING ({})", player.mining_type.as_str()),
                Style::default().fg(colors.up).add_modifier(Modifier::BOLD),
            ),
        ]));
        let uptime = player
            .mining_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("Uptime  ", Style::default().fg(colors.dim)),
            Span::raw(format_uptime(uptime)),
        ]));
        let unit = match player.mining_type {
            MiningType::Ton => "TON",
            MiningType::Hypenax => "HPX",
        };
        lines.push(Line::from(vec![
            Span::styled("Session ", Style::default().fg(colors.dim)),
            Span::styled(
                format!("+{:.5} {unit}", player.session_mined),
                Style::default().fg(colors.accent),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press m to stop",
            Style::default().fg(colors.dim),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::styled("Status  ", Style::default().fg(colors.dim)),
            Span::styled("STOPPED", Style::default().fg(colors.down)),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Target  ", Style::default().fg(colors.dim)),
            Span::raw(player.mining_type.as_str()),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press m to start mining",
            Style::default().fg(colors.dim),
        )));
        if player.mining_type == MiningType::Hypenax {
            lines.push(Line::from(Span::styled(
                "Press t to unlock the TON miner (0.7 TON)",
                Style::default().fg(colors.dim),
            )));
        }
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_daily(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Daily Reward")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let today = Local::now().date_naive();
    let lines = if player.daily_reward_available(today) {
        vec![
            Line::from(vec![
                Span::styled(
                    format!("+{DAILY_REWARD_AMOUNT:.0} HPX "),
                    Style::default().fg(colors.up).add_modifier(Modifier::BOLD),
                ),
                Span::styled("ready to claim", Style::default().fg(colors.text)),
            ]),
            Line::from(Span::styled(
                "Press c to claim",
                Style::default().fg(colors.dim),
            )),
        ]
    } else {
        vec![
            Line::from(Span::styled(
                "Claimed for today",
                Style::default().fg(colors.dim),
            )),
            Line::from(Span::styled(
                "Come back tomorrow",
                Style::default().fg(colors.dim),
            )),
        ]
    };
    f.render_widget(Paragraph::new(lines), inner);
}

fn format_uptime(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{minutes}m {seconds:02}s")
    }
}
