mod earn;
mod home;
mod profile;
mod referral;
mod trade;

use crate::app::{App, Modal, Tab, WithdrawField};
use crate::market::poller::now_unix_ms;
use crate::market::types::{format_price, MarketFeedState};
use crate::simulate::shorten_address;
use crate::state::{MarketState, PlayerState, Theme};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use ratatui::Frame;

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

pub struct Palette {
    pub accent: Color,
    pub text: Color,
    pub dim: Color,
    pub up: Color,
    pub down: Color,
    pub warn: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: Color::Cyan,
            text: Color::White,
            dim: Color::DarkGray,
            up: Color::LightGreen,
            down: Color::LightRed,
            warn: Color::Yellow,
        },
        Theme::Light => Palette {
            accent: Color::Blue,
            text: Color::Black,
            dim: Color::Gray,
            up: Color::Green,
            down: Color::Red,
            warn: Color::Magenta,
        },
        Theme::Neon => Palette {
            accent: Color::LightMagenta,
            text: Color::LightCyan,
            dim: Color::DarkGray,
            up: Color::LightGreen,
            down: Color::LightRed,
            warn: Color::LightYellow,
        },
    }
}

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let player = app.state.player_snapshot();
    let market = app.state.market_snapshot();
    let colors = palette(player.theme);

    let stale = market.showing_cached_data();
    let mut constraints = vec![Constraint::Length(3)];
    if stale {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(7));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.size());

    draw_header(f, chunks[0], app, &player, &colors);
    let mut next = 1;
    if stale {
        draw_stale_banner(f, chunks[next], &colors);
        next += 1;
    }
    let body = chunks[next];
    let footer = chunks[next + 1];

    match app.active_tab {
        Tab::Home => home::draw(f, body, &player, &colors),
        Tab::Earn => earn::draw(f, body, &player, app.task_cursor, &colors),
        Tab::Trade => trade::draw(f, body, app, &market, &player, &colors),
        Tab::Refs => referral::draw(f, body, &colors),
        Tab::Profile => profile::draw(f, body, &player, &colors),
    }

    draw_footer(f, footer, app, &market, &colors);

    if let Some(modal) = &app.modal {
        draw_modal(f, modal, &player, &colors);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &App, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(inner);

    let badge = if player.is_mining {
        Span::styled(
            format!(" MINING {} ", player.mining_type.as_str()),
            Style::default()
                .fg(Color::Black)
                .bg(colors.up)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " IDLE ",
            Style::default().fg(colors.dim).add_modifier(Modifier::BOLD),
        )
    };
    let wallet = match &player.wallet_address {
        Some(address) => shorten_address(address),
        None => "no wallet".to_string(),
    };
    let strip = Line::from(vec![
        Span::styled(
            "HYPENAX ",
            Style::default().fg(colors.accent).add_modifier(Modifier::BOLD),
        ),
        badge,
        Span::raw("  "),
        Span::styled(
            format!("{} HPX", format_price(player.balance)),
            Style::default().fg(colors.text),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{:.5} TON", player.ton_balance),
            Style::default().fg(colors.accent),
        ),
        Span::raw("  "),
        Span::styled(wallet, Style::default().fg(colors.dim)),
    ]);
    f.render_widget(Paragraph::new(strip), columns[0]);

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|tab| Line::from(tab.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.active_tab.index())
        .style(Style::default().fg(colors.dim))
        .highlight_style(
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::raw("|"));
    f.render_widget(tabs, columns[1]);
}

fn draw_stale_banner(f: &mut Frame<'_>, area: Rect, colors: &Palette) {
    let banner = Paragraph::new(Line::from(Span::styled(
        " Live update failed. Showing cached data. ",
        Style::default()
            .fg(Color::Black)
            .bg(colors.warn)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(banner, area);
}

fn feed_status_line(market: &MarketState, colors: &Palette) -> Line<'static> {
    match market.feed.state {
        MarketFeedState::Idle => Line::from(Span::styled(
            "market: waiting for first refresh".to_string(),
            Style::default().fg(colors.dim),
        )),
        MarketFeedState::Refreshing => Line::from(Span::styled(
            "market: refreshing...".to_string(),
            Style::default().fg(colors.warn),
        )),
        MarketFeedState::Live => {
            let age = market
                .feed
                .last_success_unix_ms
                .map(|at| (now_unix_ms() - at).max(0) / 1_000)
                .unwrap_or_default();
            let source = market.feed.source.clone().unwrap_or_default();
            Line::from(Span::styled(
                format!("market: live via {source} ({age}s ago)"),
                Style::default().fg(colors.up),
            ))
        }
        MarketFeedState::Cached => {
            let reason = market.feed.reason.clone().unwrap_or_default();
            Line::from(Span::styled(
                format!("market: cached ({reason})"),
                Style::default().fg(colors.warn),
            ))
        }
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App, market: &MarketState, colors: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Keys & Feed")
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(inner);

    let mut left: Vec<Line> = Vec::new();
    if let Some(op) = &app.pending_op {
        let frame = (app.state.started_at.elapsed().as_millis() / 200) as usize
            % SPINNER_FRAMES.len();
        left.push(Line::from(Span::styled(
            format!("{} {}... Esc cancels", SPINNER_FRAMES[frame], op.label),
            Style::default().fg(colors.warn).add_modifier(Modifier::BOLD),
        )));
    } else {
        left.push(feed_status_line(market, colors));
    }
    left.push(Line::from(Span::styled(
        "Tab/arrows/1-5 switch view | q quit".to_string(),
        Style::default().fg(colors.dim),
    )));
    for hint in tab_hints(app.active_tab) {
        left.push(Line::from(Span::styled(
            hint.to_string(),
            Style::default().fg(colors.dim),
        )));
    }
    f.render_widget(Paragraph::new(left).wrap(Wrap { trim: true }), columns[0]);

    let mut feed_lines: Vec<Line> = Vec::new();
    for line in app.state.recent_feed(5) {
        feed_lines.push(Line::from(vec![
            Span::styled(
                line.at.format("%H:%M:%S").to_string(),
                Style::default().fg(colors.dim),
            ),
            Span::raw("  "),
            Span::styled(line.text, Style::default().fg(colors.text)),
        ]));
    }
    if feed_lines.is_empty() {
        feed_lines.push(Line::from(Span::styled(
            "No activity yet".to_string(),
            Style::default().fg(colors.dim),
        )));
    }
    f.render_widget(
        Paragraph::new(feed_lines).wrap(Wrap { trim: true }),
        columns[1],
    );
}

fn tab_hints(tab: Tab) -> &'static [&'static str] {
    match tab {
        Tab::Home => &["m mine/stop  c claim daily  t TON miner  h HPX target"],
        Tab::Earn => &["up/down pick task  Enter verify  c claim daily"],
        Tab::Trade => &[
            "up/down pick asset  Enter open  r refresh",
            "detail: Tab timeframe  b/s side  p percent  Enter order  Esc back",
        ],
        Tab::Refs => &[],
        Tab::Profile => &["c connect  x disconnect  w withdraw  d deposit  p PIN  t theme  s sound  n notify"],
    }
}

fn draw_modal(f: &mut Frame<'_>, modal: &Modal, player: &PlayerState, colors: &Palette) {
    let area = centered_rect(46, 12, f.size());
    f.render_widget(Clear, area);

    let (title, lines) = match modal {
        Modal::ConfirmTonPurchase => (
            "Activate TON Mining",
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Unlock the TON miner for 0.7 TON.",
                    Style::default().fg(colors.text),
                )),
                Line::from(Span::styled(
                    format!("Rate: +{:.5} TON/s", crate::state::TON_RATE_PER_SECOND),
                    Style::default().fg(colors.accent),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter confirm | Esc cancel",
                    Style::default().fg(colors.dim),
                )),
            ],
        ),
        Modal::Withdraw(form) => {
            let mut lines = vec![
                Line::from(""),
                field_line("Address", &form.address, form.focus == WithdrawField::Address, colors),
                field_line("Amount ", &form.amount, form.focus == WithdrawField::Amount, colors),
                Line::from(Span::styled(
                    format!("Available: {:.5} TON", player.ton_balance),
                    Style::default().fg(colors.dim),
                )),
            ];
            push_notice(&mut lines, form.notice.as_deref(), colors);
            lines.push(Line::from(Span::styled(
                "Tab field | Enter send | Esc cancel",
                Style::default().fg(colors.dim),
            )));
            ("Withdraw TON", lines)
        }
        Modal::Deposit(form) => {
            let mut lines = vec![
                Line::from(""),
                field_line("Amount ", &form.amount, true, colors),
            ];
            push_notice(&mut lines, form.notice.as_deref(), colors);
            lines.push(Line::from(Span::styled(
                "Enter confirm | Esc cancel",
                Style::default().fg(colors.dim),
            )));
            ("Deposit TON", lines)
        }
        Modal::Pin(form) => {
            let masked = "*".repeat(form.digits.len());
            let mut lines = vec![
                Line::from(""),
                field_line("PIN    ", &masked, true, colors),
            ];
            push_notice(&mut lines, form.notice.as_deref(), colors);
            lines.push(Line::from(Span::styled(
                "4 digits | Enter save | Esc cancel",
                Style::default().fg(colors.dim),
            )));
            ("Security PIN", lines)
        }
    };

    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(colors.accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent));
    f.render_widget(block.clone(), area);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        block.inner(area),
    );
}

fn field_line(label: &str, value: &str, focused: bool, colors: &Palette) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(
            format!("{marker}{label} "),
            Style::default().fg(if focused { colors.accent } else { colors.dim }),
        ),
        Span::styled(
            format!("{value}{cursor}"),
            Style::default().fg(colors.text),
        ),
    ])
}

fn push_notice(lines: &mut Vec<Line<'static>>, notice: Option<&str>, colors: &Palette) {
    match notice {
        Some(message) => lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(colors.down),
        ))),
        None => lines.push(Line::from("")),
    }
}

fn centered_rect(width: u16, height: u16, container: Rect) -> Rect {
    let width = width.min(container.width);
    let height = height.min(container.height);
    Rect {
        x: container.x + (container.width - width) / 2,
        y: container.y + (container.height - height) / 2,
        width,
        height,
    }
}
