use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, ConnectionStatus, Mode, TextInput};
use crate::message::ChatMessage;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, messages, composer, footer
    let [header_area, messages_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_messages(app, frame, messages_area);
    render_composer(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.mode == Mode::NamePrompt {
        render_name_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Websocket chat ", Style::default().fg(Color::Cyan).bold()),
    ];

    if !app.user_name.is_empty() {
        spans.push(Span::styled(
            format!(" {} ", app.user_name),
            Style::default().fg(Color::White),
        ));
    }

    // No indicator without a configured endpoint.
    let status = match app.status {
        ConnectionStatus::Idle => None,
        ConnectionStatus::Connecting => Some(("connecting", Color::Yellow)),
        ConnectionStatus::Open => Some(("online", Color::Green)),
        ConnectionStatus::Closed => Some(("offline", Color::Red)),
    };
    if let Some((label, color)) = status {
        spans.push(Span::styled(format!(" [{}]", label), Style::default().fg(color)));
    }
    if let Some(url) = app.server_url() {
        spans.push(Span::styled(format!(" {}", url), Style::default().fg(Color::Gray)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_line(message: &ChatMessage, dimmed: bool) -> Line<'static> {
    let mut line = Line::from(vec![
        Span::styled(message.date.clone(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("{}:", message.name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(message.message.clone()),
    ]);
    if dimmed {
        line = line.patch_style(Style::default().add_modifier(Modifier::DIM));
    }
    line
}

/// Break a line into rows of at most `width` columns, keeping span styles.
///
/// The pane renders these rows as-is, so the row count used for scrolling is
/// exactly what ends up on screen.
fn wrap_rows(line: &Line<'_>, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0;

    for grapheme in line.styled_graphemes(Style::default()) {
        let w = Span::raw(grapheme.symbol).width();
        if row_width > 0 && row_width + w > width {
            rows.push(Line::from(std::mem::take(&mut row)));
            row_width = 0;
        }
        match row.last_mut() {
            Some(last) if last.style == grapheme.style => last.content.to_mut().push_str(grapheme.symbol),
            _ => row.push(Span::styled(grapheme.symbol.to_string(), grapheme.style)),
        }
        row_width += w;
    }

    rows.push(Line::from(row));
    rows
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    app.messages_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Messages ");
    let inner = block.inner(area);

    if app.messages.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "No messages yet.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    if inner.width == 0 || inner.height == 0 {
        frame.render_widget(block, area);
        return;
    }

    // Only wrap as much of the tail as the viewport plus scroll-back needs.
    let pulse = app.animation_frame == 1;
    let height = inner.height as usize;
    let wanted = height.saturating_add(app.scroll_back as usize);
    let mut tail: Vec<Line<'static>> = Vec::new();
    for message in app.messages.iter().rev() {
        if tail.len() >= wanted {
            break;
        }
        let rows = wrap_rows(&message_line(message, message.sending && pulse), inner.width);
        tail.extend(rows.into_iter().rev());
    }
    tail.reverse();

    // Running out of messages means the top of the list was reached.
    let back = (app.scroll_back as usize).min(tail.len().saturating_sub(height));
    app.scroll_back = back as u16;
    let end = tail.len() - back;
    let start = end.saturating_sub(height);
    tail.truncate(end);
    let visible = tail.split_off(start);

    let paragraph = Paragraph::new(Text::from(visible)).block(block);
    frame.render_widget(paragraph, area);
}

/// Text to show for an input field plus the cursor column, scrolled so the cursor stays visible.
fn visible_input(input: &TextInput, width: u16) -> (String, u16) {
    let width = width.max(1) as usize;
    let skip = input.cursor.saturating_sub(width - 1);
    let shown: String = input.value.chars().skip(skip).take(width).collect();
    (shown, (input.cursor - skip) as u16)
}

fn render_composer(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.mode == Mode::Chat;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");
    let inner = block.inner(area);

    let (shown, cursor_x) = visible_input(&app.input, inner.width);
    let input = Paragraph::new(shown).block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.mode {
        Mode::NamePrompt => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" save name ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" skip ", label_style),
        ],
        Mode::Chat => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Ctrl+X ", key_style),
            Span::styled(" clear all ", label_style),
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_name_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 6;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height.min(area.height));

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Please, set your name ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(format!("Esc keeps {}", app.name_fallback))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    if inner.height < 3 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (shown, cursor_x) = visible_input(&app.name_input, input_area.width);
    frame.render_widget(Paragraph::new(shown).style(Style::default().fg(Color::Cyan)), input_area);
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
