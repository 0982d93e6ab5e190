//! Terminal UI rendering with ratatui

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use flitify_core::view::{format_uptime, memory_summary, percent};

use crate::app::{App, ComputersView, InteractView, LoginField, LoginForm, StatusLevel, Tab, View};

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(1),    // Current view
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Prompt line
        ])
        .split(f.area());

    draw_title_bar(f, app, chunks[0]);

    match &app.view {
        View::Login(form) => draw_login(f, form, chunks[1]),
        View::Computers(view) => draw_computers(f, view, chunks[1]),
        View::Interact(view) => draw_interact(f, view, chunks[1]),
    }

    draw_status_bar(f, app, chunks[2]);
    draw_prompt_line(f, app, chunks[3]);
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let user = match app.view {
        View::Login(_) => " [Signed out]".to_string(),
        _ => format!(" [{}]", app.username()),
    };

    let title_bar = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" Flitify {} ", app.route),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(user, Style::default().fg(Color::Green)),
        Span::styled(
            format!("  {}", app.api.base_url()),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .style(Style::default().bg(Color::DarkGray));

    f.render_widget(title_bar, area);
}

fn draw_login(f: &mut Frame, form: &LoginForm, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(centered(area, 50));

    let field = |title: &'static str, value: String, focused: bool| {
        let border = if focused { Color::Blue } else { Color::DarkGray };
        Paragraph::new(value).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
    };

    f.render_widget(
        field("Username", form.username.clone(), form.focus == LoginField::Username),
        rows[1],
    );
    f.render_widget(
        field("Password", "*".repeat(form.password.chars().count()), form.focus == LoginField::Password),
        rows[2],
    );

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            rows[3],
        );
    }

    let (row, len) = match form.focus {
        LoginField::Username => (rows[1], form.username.chars().count()),
        LoginField::Password => (rows[2], form.password.chars().count()),
    };
    f.set_cursor_position((row.x + 1 + len as u16, row.y + 1));
}

fn draw_computers(f: &mut Frame, view: &ComputersView, area: Rect) {
    let block = Block::default().title(" Computers ").borders(Borders::ALL);

    if let Some(error) = &view.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .clients
        .iter()
        .enumerate()
        .map(|(i, client)| {
            let style = if i == view.cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!(" {}", client.client_id), style)))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_interact(f: &mut Frame, view: &InteractView, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(1)])
        .split(area);

    let items: Vec<ListItem> = view
        .clients
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let style = if i == view.selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(format!(" {}", id), style))
        })
        .collect();

    f.render_widget(
        List::new(items).block(Block::default().title(" Online ").borders(Borders::ALL)),
        columns[0],
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(columns[1]);

    let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
    f.render_widget(
        Tabs::new(titles)
            .select(view.tab.index())
            .block(Block::default().borders(Borders::BOTTOM))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        right[0],
    );

    if let Some(error) = &view.error {
        f.render_widget(Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)), right[1]);
        return;
    }
    if view.client_id().is_none() {
        f.render_widget(
            Paragraph::new("No clients online").style(Style::default().fg(Color::DarkGray)),
            right[1],
        );
        return;
    }

    match view.tab {
        Tab::Status => draw_status(f, view, right[1]),
        Tab::Files => draw_files(f, view, right[1]),
        Tab::Shell => draw_shell(f, view, right[1]),
    }
}

fn draw_status(f: &mut Frame, view: &InteractView, area: Rect) {
    if let Some(error) = &view.status_error {
        f.render_widget(Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)), area);
        return;
    }
    let Some(status) = &view.status else {
        f.render_widget(Paragraph::new("Loading..."), area);
        return;
    };

    let disks = status.disks.len() as u16;
    let mut constraints = vec![Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)];
    constraints.extend((0..disks).map(|_| Constraint::Length(1)));
    constraints.push(Constraint::Min(0));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    f.render_widget(
        Paragraph::new(format!(
            "Uptime: {}   User: {}",
            format_uptime(status.uptime_seconds),
            status.current_user
        )),
        rows[0],
    );
    f.render_widget(
        gauge(status.cpu_usage.round() as u32, format!("CPU {:.0}%", status.cpu_usage)),
        rows[1],
    );
    f.render_widget(
        gauge(
            percent(status.memory_used, status.memory_total).unwrap_or(0),
            format!("Memory {}", memory_summary(status)),
        ),
        rows[2],
    );

    for (i, (name, disk)) in status.disks.iter().enumerate() {
        let used = percent(disk.used, disk.total).unwrap_or(0);
        f.render_widget(
            gauge(used, format!("{} {}% ({:.1} / {:.1} GB)", name, used, disk.used, disk.total)),
            rows[3 + i],
        );
    }

    let apps: Vec<ListItem> = status
        .running_applications
        .values()
        .map(|a| ListItem::new(format!(" {} ({} windows)", a.name, a.open_windows)))
        .collect();
    f.render_widget(
        List::new(apps).block(Block::default().title(" Applications ").borders(Borders::TOP)),
        rows[3 + disks as usize],
    );
}

fn gauge(percent: u32, label: String) -> Gauge<'static> {
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .percent(percent.min(100) as u16)
        .label(label)
}

fn draw_files(f: &mut Frame, view: &InteractView, area: Rect) {
    let files = &view.files;
    let block = Block::default().title(format!(" {} ", files.path)).borders(Borders::ALL);

    if let Some(error) = &files.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }

    let mut rows: Vec<String> = Vec::with_capacity(files.row_count());
    if files.has_parent_row() {
        rows.push("📁 ..".to_string());
    }
    rows.extend(files.entries.iter().map(|entry| {
        let icon = if entry.is_dir() { "📁 " } else { "📄 " };
        format!("{}{}", icon, entry.name)
    }));

    // Keep the cursor row visible
    let visible = area.height.saturating_sub(2) as usize;
    let start = (files.cursor + 1).saturating_sub(visible);

    let items: Vec<ListItem> = rows
        .into_iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, row)| {
            let style = if i == files.cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(row, style)))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_shell(f: &mut Frame, view: &InteractView, area: Rect) {
    let text = view.shell.as_ref().map(|s| s.text()).unwrap_or_default();

    // Stick to the bottom of the transcript
    let lines = text.lines().count() as u16;
    let scroll = lines.saturating_sub(area.height.saturating_sub(2));

    f.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some((ref msg, ref level)) = app.status_message {
        let color = match level {
            StatusLevel::Info => Color::Blue,
            StatusLevel::Success => Color::Green,
            StatusLevel::Warning => Color::Yellow,
            StatusLevel::Error => Color::Red,
        };
        (msg.clone(), Style::default().fg(color))
    } else {
        let hints = match &app.view {
            View::Login(_) => "Tab:switch field │ Enter:sign in │ Esc:quit",
            View::Computers(_) => "j↓ k↑ │ a:add s:secret x:remove r:refresh │ i:interact L:logout ?:help q:quit",
            View::Interact(v) => match v.tab {
                Tab::Status => "J/K:client Tab:panel r:refresh │ c:computers L:logout ?:help q:quit",
                Tab::Files => "j↓ k↑ l→ h← │ Enter:open/download u:upload │ J/K:client Tab:panel",
                Tab::Shell => "Enter:command │ J/K:client Tab:panel │ q:quit",
            },
        };
        (hints.to_string(), Style::default().fg(Color::DarkGray))
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_prompt_line(f: &mut Frame, app: &App, area: Rect) {
    let Some(prompt) = &app.prompt else {
        return;
    };

    let label = prompt.label();
    let content = if prompt.is_secret() {
        "*".repeat(prompt.input.chars().count())
    } else {
        prompt.input.clone()
    };

    let x = area.x + label.chars().count() as u16 + content.chars().count() as u16;
    f.render_widget(
        Paragraph::new(format!("{}{}", label, content)).style(Style::default().fg(Color::White)),
        area,
    );
    f.set_cursor_position((x, area.y));
}

/// Horizontally centered column of `width` cells
fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
