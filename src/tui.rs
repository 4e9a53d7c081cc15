use anyhow::{bail, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{Application, ApplicationStatus};
use crate::pages::applications::Lookup;
use crate::pages::ApplicationsPage;

struct AppState {
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new() -> Self {
        Self {
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    /// Keeps the cursor on a visible row after the filtered list shrinks.
    fn clamp(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

fn current<'p>(page: &'p ApplicationsPage<'_>, state: &AppState) -> Option<&'p Application> {
    page.view().filtered().nth(state.selected)
}

pub fn run_browse(page: &mut ApplicationsPage<'_>, company_id: i64) -> Result<()> {
    if !page.load_for_company(company_id) {
        let message = page
            .error()
            .map(|notice| notice.message.clone())
            .unwrap_or_else(|| "Failed to fetch applications by company".to_string());
        bail!("{}", message);
    }
    if page.view().items().is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, page);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    page: &mut ApplicationsPage<'_>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        let len = page.view().filtered_len();
        list_state.select(if len == 0 { None } else { Some(state.selected) });
        terminal.draw(|frame| draw(frame, page, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(len),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('p') => set_status(page, state, ApplicationStatus::Pending),
                KeyCode::Char('v') => set_status(page, state, ApplicationStatus::Reviewed),
                KeyCode::Char('a') => set_status(page, state, ApplicationStatus::Accepted),
                KeyCode::Char('x') => set_status(page, state, ApplicationStatus::Rejected),
                KeyCode::Char('f') => {
                    page.cycle_filter();
                    state.selected = 0;
                    state.scroll_offset = 0;
                }
                KeyCode::Char('r') => {
                    page.load();
                }
                KeyCode::Char('R') => {
                    page.reset();
                    state.selected = 0;
                    state.scroll_offset = 0;
                }
                KeyCode::Char('c') => page.dismiss_error(),
                _ => {}
            }
            state.clamp(page.view().filtered_len());
        }
    }
    Ok(())
}

fn set_status(page: &mut ApplicationsPage<'_>, state: &AppState, status: ApplicationStatus) {
    let Some(id) = current(page, state).map(|application| application.id) else {
        return;
    };
    page.update_status(id, status);
}

fn status_icon(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Pending => " ",
        ApplicationStatus::Reviewed => "*",
        ApplicationStatus::Accepted => "+",
        ApplicationStatus::Rejected => "x",
    }
}

fn status_style(status: ApplicationStatus) -> Style {
    match status {
        ApplicationStatus::Pending => Style::default().fg(Color::Yellow),
        ApplicationStatus::Reviewed => Style::default().fg(Color::Cyan),
        ApplicationStatus::Accepted => Style::default().fg(Color::Green),
        ApplicationStatus::Rejected => Style::default().fg(Color::Red),
    }
}

fn draw(frame: &mut Frame, page: &ApplicationsPage<'_>, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: applications under the active filter
    let items: Vec<ListItem> = page
        .view()
        .filtered()
        .map(|application| {
            let job = application.job_title.as_deref().unwrap_or("?");
            ListItem::new(format!(
                "{} #{:<4} {} | {}",
                status_icon(application.status),
                application.id,
                truncate(&application.applicant_name, 24),
                truncate(job, 24)
            ))
        })
        .collect();

    let filter = match page.view().active_filter().0 {
        Some(status) => status.as_str(),
        None => "ALL",
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications {}({}/{}) [{}] ",
            lookup_label(page.lookup()),
            page.view().filtered_len(),
            page.view().items().len(),
            filter
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: application detail
    let detail = build_detail(current(page, state));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    if let Some(notice) = page.error() {
        let line = Paragraph::new(format!(" {} (c:dismiss)", notice.message))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(line, rows[1]);
    }

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  p:pending v:reviewed a:accept x:reject  f:filter R:all r:reload  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(application: Option<&Application>) -> Text<'_> {
    let Some(application) = application else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &application.applicant_name,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(application.applicant_email.as_str()));
    if let Some(phone) = &application.applicant_phone {
        lines.push(Line::from(format!("Phone: {}", phone)));
    }

    lines.push(Line::from(Span::styled(
        format!("Status: {}", application.status),
        status_style(application.status),
    )));

    match (&application.job_title, application.job_id) {
        (Some(title), Some(job_id)) => lines.push(Line::from(format!("Job: {} (#{})", title, job_id))),
        (Some(title), None) => lines.push(Line::from(format!("Job: {}", title))),
        (None, Some(job_id)) => lines.push(Line::from(format!("Job: #{}", job_id))),
        (None, None) => {}
    }
    if let Some(applied) = application.applied_date {
        lines.push(Line::from(format!("Applied: {}", applied.format("%Y-%m-%d %H:%M"))));
    }
    if let Some(resume) = &application.resume_url {
        lines.push(Line::from(format!("Resume: {}", resume)));
    }

    lines.push(Line::from(""));

    match application.cover_letter.as_deref().filter(|text| !text.trim().is_empty()) {
        Some(letter) => {
            lines.push(Line::from(Span::styled(
                "Cover Letter",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(letter, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No cover letter)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn lookup_label(lookup: Option<&Lookup>) -> String {
    match lookup {
        Some(Lookup::Job(id)) => format!("for job #{} ", id),
        Some(Lookup::Company(id)) => format!("for company #{} ", id),
        Some(Lookup::Applicant(email)) => format!("from {} ", email),
        None => String::new(),
    }
}
