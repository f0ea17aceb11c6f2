use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use super::app::{App, InputMode, LoginField, Screen, TaskTab};

pub fn ui(f: &mut Frame, app: &mut App) {
    if app.screen == Screen::Login {
        login(f, app);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(1), // Status
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|r| {
            let t = &r.task;
            let style = if t.is_done() {
                Style::default().fg(Color::Green)
            } else if t.is_available() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(r.project_name.clone()),
                Cell::from(t.name.clone()),
                Cell::from(if t.assigned_to_names.is_empty() { "-".to_string() } else { t.assigned_to_names.join(", ") }),
                Cell::from(t.end_date.map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(format!("{:.1}", t.estimated_time)),
                Cell::from(format!("{:>3}%", t.progress)),
                Cell::from(t.comments.len().to_string()),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(18),
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(4),
    ];

    let who = app
        .session
        .as_ref()
        .map(|s| format!("{} ({})", s.username, s.role))
        .unwrap_or_default();
    let title = match (app.screen, app.tab) {
        (Screen::Dashboard, _) => format!("Taskboard - All Projects - {who}"),
        (_, TaskTab::Mine) => format!("Taskboard - My Tasks - {who}"),
        (_, TaskTab::Available) => format!("Taskboard - Available Tasks - {who}"),
    };

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Project", "Task", "Assignees", "Due", "Hours", "Done", "Notes"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[0], &mut app.state);

    let status = match (&app.error, &app.status) {
        (Some(e), _) => Span::styled(e.clone(), Style::default().fg(Color::Red)),
        (None, Some(s)) => Span::styled(s.clone(), Style::default().fg(Color::Green)),
        (None, None) => Span::raw(""),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.screen {
            Screen::Employee => "q: Quit | v/Tab: Mine/Available | c: Claim | +/-: Progress | m: Comment | r: Reload | o: Sign out",
            _ => "q: Quit | +/-: Progress | m: Comment | r: Reload | o: Sign out",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if app.input_mode == InputMode::Editing {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let title = app
            .selected_task()
            .map(|r| format!("Comment on '{}'", r.task.name))
            .unwrap_or_else(|| "Comment".to_string());
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);
    }
}

fn login(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 9, f.area());
    f.render_widget(Clear, area);

    let field_style = |field: LoginField| {
        if app.login.field == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };
    let masked = "*".repeat(app.login.password.chars().count());
    let mut lines = vec![
        Line::from(vec![Span::raw("Username: "), Span::styled(app.login.username.as_str(), field_style(LoginField::Username))]),
        Line::from(vec![Span::raw("Password: "), Span::styled(masked, field_style(LoginField::Password))]),
        Line::from(vec![Span::raw("Role:     "), Span::styled(format!("< {} >", app.login.role), field_style(LoginField::Role))]),
        Line::from(""),
        Line::from(Span::styled("Tab: Next field | ←/→: Role | Enter: Sign in | Esc: Quit", Style::default().fg(Color::Gray))),
    ];
    if let Some(e) = &app.error {
        lines.push(Line::from(Span::styled(e.as_str(), Style::default().fg(Color::Red))));
    }

    let form = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Taskboard - Sign in"));
    f.render_widget(form, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height - height) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height - height) / 2),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
