//! Interactive star picker
//!
//! Takes over the terminal, drives a [`StarWidget`] with keyboard and mouse
//! input, and submits the chosen rating through the [`RatingClient`].

use std::io;
use std::panic;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use course_ratings::cli::CliError;
use course_ratings::ratings::MAX_STARS;
use course_ratings::stars::widget::WidgetState;
use course_ratings::stars::{
    format_rating_text, initialize_star_events, render_stars_text, StarEvent, StarFill, StarKey,
    StarWidget,
};
use course_ratings::{Rating, RatingClient, RatingSummary, SubmissionResult};

/// Width of one star cell: glyph plus separator
const STAR_WIDTH: u16 = 2;

/// Where the picker is in its lifecycle
#[derive(Debug, Clone, PartialEq)]
enum Status {
    Choosing,
    Submitting(u8),
    Done(SubmissionResult),
}

/// Message from the submission task back to the event loop
#[derive(Debug)]
struct SubmissionUpdate {
    result: SubmissionResult,
    summary: Option<RatingSummary>,
}

/// Everything the picker draws
struct PickerView<'a> {
    course_id: &'a str,
    widget: &'a StarWidget,
    summary: RatingSummary,
    status: &'a Status,
}

/// Sets up a panic hook that restores the terminal before printing the panic message.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Runs the picker until the user quits
///
/// # Returns
/// * `Ok(Some(result))` - The outcome of the last submission
/// * `Ok(None)` - The user quit without submitting
/// * `Err(CliError)` - The terminal could not be set up or restored
pub async fn run(
    client: &RatingClient,
    course_id: &str,
) -> Result<Option<SubmissionResult>, CliError> {
    let mut summary = client.fetch_ratings(course_id).await;

    let (update_tx, mut update_rx) = mpsc::channel::<SubmissionUpdate>(1);
    let mut widget = initialize_star_events({
        let client = client.clone();
        let course_id = course_id.to_string();
        move |rating: Rating| {
            let client = client.clone();
            let course_id = course_id.clone();
            let update_tx = update_tx.clone();
            async move {
                let result = client.submit_rating(&course_id, rating.value()).await;
                let summary = if result.is_success() {
                    Some(client.fetch_ratings(&course_id).await)
                } else {
                    None
                };
                let _ = update_tx.send(SubmissionUpdate { result, summary }).await;
            }
        }
    });

    setup_panic_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut status = Status::Choosing;
    let mut last_result = None;
    let mut area = Rect::default();

    loop {
        terminal.draw(|frame| {
            area = frame.area();
            render(
                frame,
                &PickerView {
                    course_id,
                    widget: &widget,
                    summary,
                    status: &status,
                },
            );
        })?;

        while let Ok(update) = update_rx.try_recv() {
            if let Some(fresh) = update.summary {
                summary = fresh;
            }
            last_result = Some(update.result.clone());
            status = Status::Done(update.result);
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        let star_event = match event::read()? {
            Event::Key(key) if is_quit(&key) => break,
            Event::Key(key) => key_to_event(&key),
            Event::Mouse(mouse) => mouse_to_event(&mouse, area, widget.state()),
            _ => None,
        };

        if let Some(pending) = star_event.and_then(|e| widget.dispatch(e)) {
            status = Status::Submitting(widget.display_value());
            tokio::spawn(pending);
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;

    Ok(last_result)
}

fn is_quit(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
}

/// Maps a key press to a widget event
fn key_to_event(key: &KeyEvent) -> Option<StarEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let star_key = match key.code {
        KeyCode::Right => StarKey::Right,
        KeyCode::Up => StarKey::Up,
        KeyCode::Left => StarKey::Left,
        KeyCode::Down => StarKey::Down,
        KeyCode::Enter => StarKey::Enter,
        KeyCode::Char(' ') => StarKey::Space,
        // Digit shortcuts click the star directly
        KeyCode::Char(c @ '1'..='5') => {
            return c.to_digit(10).map(|d| StarEvent::Activate(d as u8));
        }
        _ => return None,
    };
    Some(StarEvent::Key(star_key))
}

/// Maps a mouse event to a widget event
fn mouse_to_event(mouse: &MouseEvent, area: Rect, state: WidgetState) -> Option<StarEvent> {
    let star = star_at(area, mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Moved => match star {
            Some(value) => Some(StarEvent::PointerEnter(value)),
            None if state == WidgetState::Hovering => Some(StarEvent::PointerLeave),
            None => None,
        },
        MouseEventKind::Down(MouseButton::Left) => star.map(StarEvent::Activate),
        _ => None,
    }
}

/// Splits the screen into title, stars, current rating, and status rows
fn layout(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(2),
        ])
        .split(area);

    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

/// Cell row occupied by the star glyphs
fn stars_row(area: Rect) -> Rect {
    let block = layout(area)[1];
    Rect {
        x: block.x + 1,
        y: block.y + 1,
        width: STAR_WIDTH * u16::from(MAX_STARS),
        height: 1,
    }
}

/// Star value (1-5) under a terminal cell, if any
fn star_at(area: Rect, column: u16, row: u16) -> Option<u8> {
    let stars = stars_row(area);
    if row != stars.y || column < stars.x || column >= stars.x + stars.width {
        return None;
    }
    Some(((column - stars.x) / STAR_WIDTH + 1) as u8)
}

fn render(frame: &mut Frame, view: &PickerView) {
    let [title_area, stars_area, current_area, status_area] = layout(frame.area());

    let title = Paragraph::new(Line::from(Span::styled(
        format!("Rate course {}", view.course_id),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(title, title_area);

    let focused = view.widget.focused().map(Rating::value);
    let star_spans: Vec<Span> = view
        .widget
        .fills()
        .iter()
        .zip(1..=MAX_STARS)
        .map(|(fill, value)| {
            let mut style = match fill {
                StarFill::Empty => Style::default().fg(Color::DarkGray),
                _ => Style::default().fg(Color::Yellow),
            };
            if focused == Some(value) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            Span::styled(format!("{} ", fill.glyph()), style)
        })
        .collect();

    let border_color = if view.widget.pointer_enabled() {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let stars = Paragraph::new(Line::from(star_spans)).block(
        Block::default()
            .title(" Your rating ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color)),
    );
    frame.render_widget(stars, stars_area);

    let current = Paragraph::new(Line::from(vec![
        Span::styled("Current: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            render_stars_text(view.summary.average),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!(
            "  {:.1} ({})",
            view.summary.average,
            format_rating_text(&view.summary)
        )),
    ]));
    frame.render_widget(current, current_area);

    let status_line = match view.status {
        Status::Choosing => Line::from(Span::styled(
            "←/→ choose · Enter select · 1-5 quick pick · click a star · q quit",
            Style::default().fg(Color::DarkGray),
        )),
        Status::Submitting(value) => Line::from(Span::styled(
            format!("Submitting {} stars...", value),
            Style::default().fg(Color::Cyan),
        )),
        Status::Done(result) if result.is_success() => Line::from(Span::styled(
            "Thank you for your rating! Press q to quit.",
            Style::default().fg(Color::Green),
        )),
        Status::Done(result) => Line::from(Span::styled(
            format!(
                "{} Press q to quit or pick again.",
                result.message.as_deref().unwrap_or("Rating failed.")
            ),
            Style::default().fg(Color::Red),
        )),
    };
    frame.render_widget(
        Paragraph::new(status_line).alignment(Alignment::Left),
        status_area,
    );
}
