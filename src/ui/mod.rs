pub mod widgets;

use crate::app::App;
use crate::format::format_12h;
use crate::theme::Palette;
use chrono::{DateTime, Local, TimeZone, Timelike};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    let palette = app.theme().palette();

    f.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(1),    // Widget grid
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_grid(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);
}

/// `("October 15, 2025", "Tuesday, 2:30:45 PM")`
pub fn header_lines<Tz: TimeZone>(now: &DateTime<Tz>) -> (String, String)
where
    Tz::Offset: Display,
{
    let date = now.format("%B %-d, %Y").to_string();
    let time = format!(
        "{}, {}",
        now.format("%A"),
        format_12h(now.hour(), now.minute(), now.second())
    );
    (date, time)
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme().palette();
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(palette.secondary))
        .style(Style::default().bg(palette.background));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(30)])
        .split(inner);

    let tabs: Vec<Line> = (0..app.config().page_count())
        .map(|i| Line::from(format!("{} {}", i + 1, app.config().page_title(i))))
        .collect();
    let tabs = Tabs::new(tabs)
        .select(app.page())
        .style(Style::default().fg(palette.secondary))
        .highlight_style(
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("|");

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(columns[0]);

    f.render_widget(
        Paragraph::new(Span::styled(
            " homedash",
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        )),
        left[0],
    );
    f.render_widget(tabs, left[2]);

    let (date, time) = header_lines(&Local::now());
    let theme = app.theme();
    let right = Paragraph::new(vec![
        Line::from(Span::styled(date, Style::default().fg(palette.text))),
        Line::from(Span::styled(
            time,
            Style::default()
                .fg(palette.primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} d: {}", theme.toggle_icon(), theme.toggle_hint()),
            Style::default().fg(palette.secondary),
        )),
    ])
    .alignment(Alignment::Right);
    f.render_widget(right, columns[1]);
}

/// Widgets on the current page grouped by row, each row sorted by column.
fn rows_on_page(app: &App) -> BTreeMap<usize, Vec<usize>> {
    let mut rows: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for index in app.visible_widgets() {
        let (row, _) = app.widgets()[index].position();
        rows.entry(row).or_default().push(index);
    }
    rows
}

fn draw_grid(f: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme().palette();
    let rows = rows_on_page(app);

    if rows.is_empty() {
        draw_empty_page(f, palette, area);
        return;
    }

    let row_count = rows.len() as u32;
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count); rows.len()])
        .split(area);

    for (row_area, cells) in row_areas.iter().zip(rows.values()) {
        let col_count = cells.len() as u32;
        let cell_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, col_count); cells.len()])
            .split(*row_area);

        for (cell_area, &index) in cell_areas.iter().zip(cells) {
            let selected = index == app.selected_index();
            app.widgets()[index].render(f, *cell_area, selected, palette);
        }
    }
}

fn draw_empty_page(f: &mut Frame, palette: &Palette, area: Rect) {
    let empty = Paragraph::new("Nothing on this page. Enable widgets in the config file.")
        .style(Style::default().fg(palette.secondary))
        .alignment(Alignment::Center);
    f.render_widget(empty, area);
}

/// Draw the status bar
fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme().palette();

    let text = match app.status() {
        Some(status) => Line::from(Span::styled(
            format!(" {}", status),
            Style::default().fg(palette.primary),
        )),
        None => Line::from(Span::styled(
            " Tab: select | 1-9 [ ]: pages | r: refresh | d: theme | o: open | q: quit",
            Style::default().fg(palette.secondary),
        )),
    };

    f.render_widget(Paragraph::new(text), area);
}
