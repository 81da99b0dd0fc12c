use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::sync::status::SetupStatus;

pub mod state;

use state::{ButtonState, ScreenModel};

const DESCRIPTION: &str = "Metabase provides a graphical interface to create business intelligence \
and analytics graphs in minutes. The server integrates with Metabase to support ad hoc and \
self-serviced reports.";

// Main function to draw the screen
pub fn draw(frame: &mut Frame, app: &App) {
    let model = app.model();
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    draw_header(frame, header);
    if model.loading {
        frame.render_widget(
            Paragraph::new("Loading...").block(Block::bordered().title("Metabase")),
            body,
        );
    } else {
        draw_card(frame, body, app, &model);
    }
    draw_footer(frame, footer, app);
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            "Self Service Reports",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  metabase.com", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(title).block(Block::bordered()), area);
}

fn draw_card(frame: &mut Frame, area: Rect, app: &App, model: &ScreenModel) {
    let block = Block::bordered().title("Metabase");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let error_height = if model.error.is_some() { 4 } else { 0 };
    let [description, state_area, buttons, error_area, activity] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(error_height),
        Constraint::Min(0),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new(DESCRIPTION)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        description,
    );
    frame.render_widget(Paragraph::new(state_lines(app.status(), model, app.spinner())), state_area);
    frame.render_widget(Paragraph::new(button_line(model)), buttons);

    if let Some(panel) = &model.error {
        let lines = vec![
            Line::styled(
                "Last attempt failed with error",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Line::styled(panel.short_message.clone(), Style::default().fg(Color::Red)),
            Line::from(key_span('c', "Copy error to clipboard", ButtonState::Enabled)),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), error_area);
    }

    let lines: Vec<Line> = app
        .activity
        .iter()
        .map(|entry| Line::styled(entry.clone(), Style::default().fg(Color::DarkGray)))
        .collect();
    frame.render_widget(Paragraph::new(lines), activity);
}

fn state_lines(status: &SetupStatus, model: &ScreenModel, spinner: &str) -> Vec<Line<'static>> {
    let mut phase = vec![
        Span::raw("Status: "),
        Span::styled(status.phase().to_string(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if model.spinner {
        phase.push(Span::styled(format!("  {}", spinner), Style::default().fg(Color::Yellow)));
    }
    let jobs = if status.jobs_in_progress().is_empty() {
        "Jobs: none".to_string()
    } else {
        let names: Vec<String> = status.jobs_in_progress().iter().map(|j| j.to_string()).collect();
        format!("Jobs: {}", names.join(", "))
    };
    vec![Line::from(phase), Line::styled(jobs, Style::default().fg(Color::Gray))]
}

fn button_line(model: &ScreenModel) -> Line<'static> {
    let buttons = [
        ('s', "Setup Reports", model.setup),
        ('r', "Refresh Reports", model.refresh),
        ('e', "Explore Your Data", model.explore),
        ('d', "Delete", model.delete),
    ];
    let mut spans = Vec::new();
    for (key, label, state) in buttons {
        if !state.is_visible() {
            continue;
        }
        if !spans.is_empty() {
            spans.push(Span::raw("   "));
        }
        spans.extend(key_span(key, label, state));
    }
    Line::from(spans)
}

fn key_span(key: char, label: &str, state: ButtonState) -> Vec<Span<'static>> {
    let style = match state {
        ButtonState::Enabled => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::DarkGray),
    };
    vec![
        Span::styled(format!("[{}] ", key), style.fg(Color::Blue)),
        Span::styled(label.to_string(), style),
    ]
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match &app.status_line {
        Some(line) if line.is_error => Line::styled(line.text.clone(), Style::default().fg(Color::Red)),
        Some(line) => Line::styled(line.text.clone(), Style::default().fg(Color::Green)),
        None => Line::styled(
            "u: reload status   q: quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(line).block(Block::bordered()), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::messages::TrackerEvent;
    use crate::sync::status::{JobKind, SetupPhase};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_loading_placeholder_before_first_read() {
        let app = App::new("https://reports.example.org");
        let screen = render(&app);
        assert!(screen.contains("Loading..."));
        assert!(!screen.contains("Setup Reports"));
    }

    #[test]
    fn test_not_setup_shows_setup_button() {
        let mut app = App::new("https://reports.example.org");
        app.handle_event(TrackerEvent::StatusUpdated(SetupStatus::new(
            SetupPhase::NotSetup,
            [],
            None,
        )));
        let screen = render(&app);
        assert!(screen.contains("Setup Reports"));
        assert!(!screen.contains("Delete"));
        assert!(!screen.contains("Explore Your Data"));
    }

    #[test]
    fn test_error_panel_only_when_idle() {
        let mut app = App::new("https://reports.example.org");
        app.handle_event(TrackerEvent::StatusUpdated(SetupStatus::new(
            SetupPhase::SetupComplete,
            [],
            Some("org.avni.TeardownException: schema busy".into()),
        )));
        let screen = render(&app);
        assert!(screen.contains("Last attempt failed with error"));
        assert!(screen.contains("schema busy"));

        app.handle_event(TrackerEvent::StatusUpdated(SetupStatus::new(
            SetupPhase::RefreshInProgress,
            [JobKind::RefreshQuestions],
            Some("org.avni.TeardownException: schema busy".into()),
        )));
        let screen = render(&app);
        assert!(!screen.contains("Last attempt failed"));
        assert!(screen.contains("refresh-questions"));
    }
}
