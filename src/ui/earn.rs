use crate::state::{PlayerState, TaskStatus, DAILY_REWARD_AMOUNT};
use crate::ui::Palette;
use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

pub(crate) fn draw(
    f: &mut Frame<'_>,
    area: Rect,
    player: &PlayerState,
    cursor: usize,
    colors: &Palette,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    draw_daily_strip(f, rows[0], player, colors);
    draw_tasks(f, rows[1], player, cursor, colors);
}

fn draw_daily_strip(f: &mut Frame<'_>, area: Rect, player: &PlayerState, colors: &Palette) {
    let block = Block::default()
        .title("Daily")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let today = Local::now().date_naive();
    let line = if player.daily_reward_available(today) {
        Line::from(vec![
            Span::styled(
                format!("+{DAILY_REWARD_AMOUNT:.0} HPX"),
                Style::default().fg(colors.up).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" waiting. Press c to claim.", Style::default().fg(colors.text)),
        ])
    } else {
        Line::from(Span::styled(
            "Daily reward claimed. New one tomorrow.",
            Style::default().fg(colors.dim),
        ))
    };
    f.render_widget(Paragraph::new(line), inner);
}

fn draw_tasks(f: &mut Frame<'_>, area: Rect, player: &PlayerState, cursor: usize, colors: &Palette) {
    let block = Block::default()
        .title("Tasks")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.dim));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let items: Vec<ListItem> = player
        .tasks
        .iter()
        .map(|task| {
            let (icon, icon_style) = match task.status {
                TaskStatus::Completed => ("[done]", Style::default().fg(colors.up)),
                TaskStatus::Pending => ("[open]", Style::default().fg(colors.warn)),
            };
            ListItem::new(vec![Line::from(vec![
                Span::styled(format!("{icon} "), icon_style),
                Span::styled(
                    format!("{:<24}", task.title),
                    Style::default().fg(colors.text),
                ),
                Span::styled(
                    format!("+{:.0} HPX", task.reward),
                    Style::default().fg(colors.accent),
                ),
            ])])
        })
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .fg(colors.warn)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(cursor.min(player.tasks.len().saturating_sub(1))));
    f.render_stateful_widget(list, inner, &mut state);
}
