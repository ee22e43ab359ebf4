use crate::ui::Palette;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

const INVITE_CODE: &str = "HPX-FRIENDS";
const REFERRAL_BONUS: &str = "+2,500 HPX";

struct ReferralRow {
    name: &'static str,
    joined: &'static str,
    earned: &'static str,
}

const REFERRALS: [ReferralRow; 3] = [
    ReferralRow { name: "Alex", joined: "2 days ago", earned: "+2.5K" },
    ReferralRow { name: "Sarah", joined: "5 days ago", earned: "+2.5K" },
    ReferralRow { name: "Mike", joined: "1 week ago", earned: "+2.5K" },
];

pub(crate) fn draw(f: &mut Frame<'_>, area: Rect, colors: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(area);

    draw_invite(f, rows[0], colors);
    draw_friends(f, rows[1], colors);
    draw_contest(f, rows[2], colors);
}

fn draw_invite(f: &mut Frame<'_>, area: Rect, colors: &Palette) {
    let block = Block::default()
        .title("Invite Friends")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let lines = vec![
        Line::from(vec![
            Span::styled("Code ", Style::default().fg(colors.dim)),
            Span::styled(
                INVITE_CODE,
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("You and your friend both get ", Style::default().fg(colors.text)),
            Span::styled(
                REFERRAL_BONUS,
                Style::default().fg(colors.up).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            "Share the code anywhere your friends hang out.",
            Style::default().fg(colors.dim),
        )),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_friends(f: &mut Frame<'_>, area: Rect, colors: &Palette) {
    let block = Block::default()
        .title(format!("Your Referrals ({})", REFERRALS.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let items: Vec<ListItem> = REFERRALS
        .iter()
        .map(|row| {
            ListItem::new(vec![Line::from(vec![
                Span::styled(
                    format!("{:<10}", row.name),
                    Style::default().fg(colors.text),
                ),
                Span::styled(
                    format!("{:<14}", row.joined),
                    Style::default().fg(colors.dim),
                ),
                Span::styled(row.earned, Style::default().fg(colors.up)),
            ])])
        })
        .collect();
    f.render_widget(List::new(items), inner);
}

fn draw_contest(f: &mut Frame<'_>, area: Rect, colors: &Palette) {
    let block = Block::default()
        .title("Contest")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.warn));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let lines = vec![Line::from(vec![
        Span::styled("Top 100 referrers win ", Style::default().fg(colors.text)),
        Span::styled(
            "100 TON",
            Style::default().fg(colors.warn).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" at the end of the season.", Style::default().fg(colors.text)),
    ])];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}
