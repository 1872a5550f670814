use super::app_logic::TuiApp;
use super::app_state::{AppMode, Banner};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn draw_help_block(f: &mut Frame, _app: &TuiApp, area: Rect) {
    let help_text_lines_content = vec![
        Line::from("Arrows/jk: Nav | Space/Enter: Sel | a: Sel All Vis | d: Desel All Vis | c: Copy | q/Esc: Quit"),
        Line::from("s/S: Next/Prev Subdir | f: From Date | t: To Date | u: Repo URL | r: Pull & Reload"),
    ];
    let help_paragraph = Paragraph::new(help_text_lines_content).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Git Repository File Selector"),
    );
    f.render_widget(help_paragraph, area);
}

fn draw_filter_block(f: &mut Frame, app: &TuiApp, area: Rect) {
    let criteria = &app.session.criteria;
    let hint = app
        .session
        .date_span()
        .map(|(lo, hi)| format!(" (files span {lo} .. {hi})"))
        .unwrap_or_default();
    let bound = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    let line = format!(
        "Subdir: {} | From: {} | To: {}{} | Selected: {}",
        criteria.subdir,
        bound(criteria.date_from),
        bound(criteria.date_to),
        hint,
        app.session.selection.len()
    );
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Repository: {}", app.session.url())),
    );
    f.render_widget(paragraph, area);
}

fn draw_input_block(f: &mut Frame, app: &TuiApp, area: Rect) {
    let AppMode::Editing(field) = app.mode else {
        return;
    };
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(field.title()))
        .wrap(Wrap { trim: false });
    f.render_widget(input_paragraph, area);
    f.set_cursor_position((cursor_column(area, app.input_cursor_pos), area.y + 1));
}

/// Column of the input cursor, kept inside the block's borders.
fn cursor_column(area: Rect, cursor_pos: usize) -> u16 {
    let inner_width = area.width.saturating_sub(2);
    let offset = u16::try_from(cursor_pos)
        .unwrap_or(u16::MAX)
        .min(inner_width.saturating_sub(1));
    area.x.saturating_add(1).saturating_add(offset)
}

fn draw_main_list_block(f: &mut Frame, app: &mut TuiApp, area: Rect) {
    app.list_viewport_height = area.height.saturating_sub(2) as usize;
    // Adjust scroll to the current cursor before slicing the window.
    app.ensure_selection_is_visible_in_viewport();

    let num_visible_items = app.visible.len();
    let window_end = (app.scroll_offset + app.list_viewport_height).min(num_visible_items);
    let window = app.scroll_offset..window_end;
    let path_width = app
        .visible
        .iter()
        .map(|r| r.relative_path.chars().count())
        .max()
        .unwrap_or(0)
        .min(area.width.saturating_sub(40) as usize)
        .max(10);

    let list_items: Vec<ListItem> = app
        .visible
        .get(window)
        .unwrap_or(&[])
        .iter()
        .map(|record| {
            let selection_prefix = if app.session.selection.contains(&record.relative_path) {
                "[x] "
            } else {
                "[ ] "
            };
            let full_line = format!(
                "{}{:<path_width$}  {:<16}  {}",
                selection_prefix,
                record.relative_path,
                record.top_subdir,
                record.modified_at.format(DATE_FORMAT),
            );
            ListItem::new(full_line)
        })
        .collect();

    let list_title = format!(
        "Files ({} shown of {})",
        num_visible_items,
        app.session.records().len()
    );

    let list_widget = List::new(list_items)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("❯ ");

    let mut list_state_for_view = ratatui::widgets::ListState::default();
    if num_visible_items > 0
        && app.current_selection_idx >= app.scroll_offset
        && app.current_selection_idx < app.scroll_offset + app.list_viewport_height
    {
        list_state_for_view.select(Some(app.current_selection_idx - app.scroll_offset));
    }
    f.render_stateful_widget(list_widget, area, &mut list_state_for_view);
}

fn status_lines(app: &TuiApp) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &app.banner {
        Some(Banner::Info(text)) => {
            lines.push(Line::styled(text.clone(), Style::default().fg(Color::Green)))
        }
        Some(Banner::Error(text)) => {
            lines.push(Line::styled(text.clone(), Style::default().fg(Color::Red)))
        }
        None => {}
    }
    if let Some(summary) = &app.last_summary {
        for (path, reason) in &summary.failed {
            lines.push(Line::from(format!("  {path}: {reason}")));
        }
    }
    lines
}

pub(super) fn ui_frame(frame: &mut Frame, app: &mut TuiApp) {
    let help_lines = 2;
    let input_height = if matches!(app.mode, AppMode::Editing(_)) { 3 } else { 0 };
    let status = status_lines(app);
    let status_height = (status.len().clamp(1, 6) as u16) + 2;

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(help_lines + 2),
            Constraint::Length(3),
            Constraint::Length(input_height),
            Constraint::Min(0),
            Constraint::Length(status_height),
        ])
        .split(frame.area());

    draw_help_block(frame, app, main_chunks[0]);
    draw_filter_block(frame, app, main_chunks[1]);
    if input_height > 0 {
        draw_input_block(frame, app, main_chunks[2]);
    }
    draw_main_list_block(frame, app, main_chunks[3]);

    let status_paragraph = Paragraph::new(status)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: false });
    frame.render_widget(status_paragraph, main_chunks[4]);
}
