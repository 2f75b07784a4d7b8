// UI rendering logic
//
// One screen: title bar, transcript, optional product list, input box,
// log strip and a key-hint status line. Everything is recomputed from
// `App` and `ChatState` on each frame.

use super::app::App;
use crate::chat::{ChatState, ConnectionState, Message, ProductOption};
use crate::config::VERSION;
use crate::logging::{LogEntry, LogLevel};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Height of the log strip including borders
const LOG_STRIP_HEIGHT: u16 = 6;

/// Widest the product list may get beside the transcript
const OPTIONS_MAX_WIDTH: u16 = 48;

/// Below this width the product list goes under the transcript
const SIDE_BY_SIDE_MIN_WIDTH: u16 = 90;

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &App, chat: &ChatState, conversation: Option<&str>) {
    let logs_height = if app.show_logs { LOG_STRIP_HEIGHT } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),           // Title bar
            Constraint::Min(6),              // Transcript (+ options)
            Constraint::Length(3),           // Input
            Constraint::Length(logs_height), // Log strip
            Constraint::Length(1),           // Key hints
        ])
        .split(f.area());

    render_title(f, chunks[0], app, conversation);
    render_body(f, chunks[1], app, chat);
    render_input(f, chunks[2], app);
    if app.show_logs {
        render_logs_panel(f, chunks[3], app);
    }
    render_hints(f, chunks[4], chat);
}

fn render_title(f: &mut Frame, area: Rect, app: &App, conversation: Option<&str>) {
    let state_style = match app.connection {
        ConnectionState::Open => Style::default().fg(Color::Green),
        ConnectionState::Connecting => Style::default().fg(Color::Yellow),
        ConnectionState::Idle | ConnectionState::Closing => Style::default().fg(Color::DarkGray),
    };

    let mut spans = vec![
        Span::styled(
            " shopchat ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" v{} ", VERSION), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("● {}", app.connection.label()), state_style),
    ];
    if let Some(id) = conversation {
        spans.push(Span::styled(
            format!("  conversation {}", id),
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_body(f: &mut Frame, area: Rect, app: &App, chat: &ChatState) {
    let options = chat.product_options();
    if options.is_empty() {
        render_transcript(f, area, app, chat);
        return;
    }

    let (transcript_area, options_area) = if area.width >= SIDE_BY_SIDE_MIN_WIDTH {
        let width = OPTIONS_MAX_WIDTH.min(area.width / 2);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(width)])
            .split(area);
        (chunks[0], chunks[1])
    } else {
        let height = options_list_height(options.len()).min(area.height / 2);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(height)])
            .split(area);
        (chunks[0], chunks[1])
    };

    render_transcript(f, transcript_area, app, chat);
    render_options(f, options_area, app, options);
}

/// Two rows per option plus borders
fn options_list_height(count: usize) -> u16 {
    u16::try_from(count)
        .unwrap_or(u16::MAX)
        .saturating_mul(2)
        .saturating_add(2)
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let (who, style) = if message.is_user {
        ("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    } else {
        (
            "Assistant",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(who, style),
        Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
    ])];
    lines.extend(
        message
            .content
            .lines()
            .map(|l| Line::from(format!("  {}", l))),
    );
    lines.push(Line::default());
    lines
}

/// Rows a line occupies once wrapped to `width`
fn wrapped_rows(line: &Line, width: u16) -> usize {
    let width = usize::from(width.max(1));
    let text_width: usize = line.spans.iter().map(|s| s.content.width()).sum();
    text_width.max(1).div_ceil(width)
}

fn render_transcript(f: &mut Frame, area: Rect, app: &App, chat: &ChatState) {
    let mut lines: Vec<Line> = chat.messages().iter().flat_map(message_lines).collect();
    if chat.is_typing() {
        lines.push(Line::from(Span::styled(
            format!("Assistant is typing {}", app.spinner()),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let inner_width = area.width.saturating_sub(2);
    let inner_height = usize::from(area.height.saturating_sub(2));
    let total: usize = lines.iter().map(|l| wrapped_rows(l, inner_width)).sum();

    // Stick to the bottom unless the user scrolled back
    let bottom = total.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back);

    let title = if app.scroll_back > 0 {
        format!(" Chat (scrolled {}) ", app.scroll_back)
    } else {
        " Chat ".to_string()
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0));
    f.render_widget(paragraph, area);
}

fn render_options(f: &mut Frame, area: Rect, app: &App, options: &[ProductOption]) {
    let items: Vec<ListItem> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let selected = app.selected_option == Some(i);
            let marker = if selected { "▶" } else { " " };
            let title_style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut detail = vec![Span::raw("     ")];
            if let Some(price) = &option.price {
                detail.push(Span::styled(
                    price.to_string(),
                    Style::default().fg(Color::Green),
                ));
                detail.push(Span::raw("  "));
            }
            detail.push(Span::styled(
                option.platform.clone(),
                Style::default().fg(Color::DarkGray),
            ));

            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(format!("{} {}. ", marker, i + 1)),
                    Span::styled(option.title.clone(), title_style),
                ]),
                Line::from(detail),
            ])
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Products ")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(list, area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let inner_width = usize::from(area.width.saturating_sub(3));
    let draft_width = app.input.width();

    // Keep the end of a long draft visible
    let visible: String = if draft_width > inner_width {
        let mut skipped = 0;
        let overflow = draft_width - inner_width;
        app.input
            .chars()
            .skip_while(|c| {
                let skip = skipped < overflow;
                skipped += unicode_width::UnicodeWidthChar::width(*c).unwrap_or(0);
                skip
            })
            .collect()
    } else {
        app.input.clone()
    };

    let input = Paragraph::new(visible.as_str())
        .block(Block::default().borders(Borders::ALL).title(" Message "));
    f.render_widget(input, area);

    let cursor_x = area.x + 1 + u16::try_from(visible.width()).unwrap_or(0);
    f.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

pub fn render_logs_panel(f: &mut Frame, area: Rect, app: &App) {
    let height = usize::from(area.height.saturating_sub(2));
    let items: Vec<ListItem> = app
        .log_buffer
        .tail(height)
        .iter()
        .map(|entry| ListItem::new(format_log_entry(entry)).style(log_level_style(&entry.level)))
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Logs "));
    f.render_widget(list, area);
}

fn format_log_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {:5} {}",
        entry.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        entry.level.as_str(),
        entry.message
    )
}

fn log_level_style(level: &LogLevel) -> Style {
    match level {
        LogLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        LogLevel::Warn => Style::default().fg(Color::Yellow),
        LogLevel::Info => Style::default().fg(Color::Blue),
        LogLevel::Debug => Style::default().fg(Color::Gray),
        LogLevel::Trace => Style::default().fg(Color::DarkGray),
    }
}

fn render_hints(f: &mut Frame, area: Rect, chat: &ChatState) {
    let mut hints = Vec::new();
    if !chat.product_options().is_empty() {
        hints.extend(["Tab pick", "Enter on empty select", "^F similar"]);
    }
    hints.extend(["Enter send", "PgUp/PgDn scroll", "^N new chat", "^L logs", "^C quit"]);
    let line = Line::from(Span::styled(
        format!(" {}", hints.join(" · ")),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(line), area);
}
