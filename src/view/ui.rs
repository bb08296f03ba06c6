//! Screen layout and drawing
//!
//! ```text
//! host:/current/dir                       <- title
//! browser list, or command output         <- main area
//! $ prompt / search prompt / pager hints  <- prompt line (panel only)
//! status message                          <- status line
//! ```

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::primitives::ansi::{StyledLine, StyledSpan};
use crate::view::command_panel::{CommandPanel, PanelMode};
use crate::view::output_buffer::OutputBuffer;

const MATCH_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Yellow);
const ACTIVE_MATCH_STYLE: Style = Style::new().fg(Color::Black).bg(Color::LightRed);

/// Draw the whole screen
pub fn draw(frame: &mut Frame, app: &mut App) {
    let panel_visible = app.panel().is_visible();
    let [title_area, main_area, prompt_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(if panel_visible { 1 } else { 0 }),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_title(frame, app, title_area);
    if panel_visible {
        draw_output(frame, app.panel_mut(), main_area);
        draw_prompt(frame, app.panel(), prompt_area);
    } else {
        draw_browser(frame, app, main_area);
    }
    draw_status(frame, app, status_area);
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let target = app.target();
    let title = Line::from(vec![
        Span::styled(
            target.host().to_string(),
            Style::new().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(":"),
        Span::styled(
            target.cwd().to_string(),
            Style::new().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn draw_browser(frame: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = app
        .browser()
        .entries()
        .iter()
        .map(|entry| {
            if entry.is_dir {
                ListItem::new(Line::styled(
                    format!("{}/", entry.name),
                    Style::new().fg(Color::Blue).add_modifier(Modifier::BOLD),
                ))
            } else {
                ListItem::new(entry.name.clone())
            }
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::TOP))
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, app.browser_mut().list_state_mut());
}

fn draw_output(frame: &mut Frame, panel: &mut CommandPanel, area: Rect) {
    let block = Block::default()
        .borders(Borders::TOP)
        .title(output_title(panel));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    panel.output_mut().set_page_height(inner.height as usize);
    let output = panel.output();
    let first = output.scroll_offset();
    let lines: Vec<Line> = output
        .visible_lines()
        .iter()
        .enumerate()
        .map(|(i, line)| highlighted_line(output, first + i, line))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn output_title(panel: &CommandPanel) -> String {
    let output = panel.output();
    let mut title = String::from(" Output ");
    if panel.is_running() {
        title.push_str("[running] ");
    }
    if output.total_lines() > 0 {
        let last = (output.scroll_offset() + output.page_height()).min(output.total_lines());
        title.push_str(&format!(
            "{}-{}/{} ",
            output.scroll_offset() + 1,
            last,
            output.total_lines()
        ));
    }
    if let (Some(pattern), Some(active)) = (output.search_pattern(), output.active_match()) {
        title.push_str(&format!(
            "/{} {}/{} ",
            pattern,
            active + 1,
            output.match_count()
        ));
    }
    title
}

/// A styled output line with search matches marked
fn highlighted_line(output: &OutputBuffer, index: usize, line: &StyledLine) -> Line<'static> {
    let pattern_len = output.search_pattern().map_or(0, |p| p.chars().count());
    let active = output.active_match_position();
    let ranges: Vec<(usize, usize, Style)> = output
        .matches()
        .iter()
        .filter(|(line_idx, _)| *line_idx == index)
        .map(|&(line_idx, col)| {
            let style = if active == Some((line_idx, col)) {
                ACTIVE_MATCH_STYLE
            } else {
                MATCH_STYLE
            };
            (col, col + pattern_len, style)
        })
        .collect();

    if ranges.is_empty() {
        return crate::primitives::ansi::to_ratatui_line(line);
    }

    let mut spans = Vec::new();
    let mut col = 0;
    for StyledSpan { text, style } in line {
        let base = style.to_style();
        for c in text.chars() {
            let style = ranges
                .iter()
                .rev()
                .find(|(start, end, _)| (*start..*end).contains(&col))
                .map_or(base, |(_, _, s)| base.patch(*s));
            push_char(&mut spans, c, style);
            col += 1;
        }
    }
    Line::from(spans)
}

fn push_char(spans: &mut Vec<Span<'static>>, c: char, style: Style) {
    if let Some(last) = spans.last_mut() {
        if last.style == style {
            last.content.to_mut().push(c);
            return;
        }
    }
    spans.push(Span::styled(c.to_string(), style));
}

fn draw_prompt(frame: &mut Frame, panel: &CommandPanel, area: Rect) {
    let (prefix, text, cursor) = match panel.mode() {
        PanelMode::Editing => ("$ ", panel.edit_text(), Some(panel.edit_cursor())),
        PanelMode::Searching => ("/", panel.search_text(), Some(panel.search_cursor())),
        PanelMode::Paging => {
            let hint = if panel.is_running() {
                "Ctrl-C cancel  / search  n/N next/prev  PgUp/PgDn page  q close"
            } else {
                "Enter new command  / search  n/N next/prev  PgUp/PgDn page  q close"
            };
            let line = Line::styled(hint, Style::new().add_modifier(Modifier::DIM));
            frame.render_widget(Paragraph::new(line), area);
            return;
        }
        PanelMode::Hidden => return,
    };

    let line = Line::from(vec![
        Span::styled(prefix, Style::new().add_modifier(Modifier::BOLD)),
        Span::raw(text.to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if let Some(cursor) = cursor {
        let before: String = text.chars().take(cursor).collect();
        let x = area.x as usize + prefix.width() + before.width();
        let x = x.min((area.x + area.width.saturating_sub(1)) as usize);
        frame.set_cursor_position((x as u16, area.y));
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let message = app
        .panel()
        .status()
        .filter(|_| app.panel().is_visible())
        .or(app.status());
    let line = match message {
        Some(message) if message.starts_with("Error") => {
            Line::styled(message.to_string(), Style::new().fg(Color::Red))
        }
        Some(message) => Line::raw(message.to_string()),
        None if app.panel().is_visible() => Line::raw(""),
        None => Line::styled(
            "Enter open  p parent  r reload  e edit  o view  : command  q quit",
            Style::new().add_modifier(Modifier::DIM),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}
