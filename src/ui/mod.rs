//! Main UI layout and rendering.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::action::Focus;
use crate::app::App;

pub mod components;

pub use components::*;

/// Width of the vertical volume column, borders included.
const VOLUME_COLUMN_WIDTH: u16 = 5;

/// Render the entire UI and record hit-test areas for the mouse.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Main layout: [search] [results (+ volume)] [now playing]
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Min(6),    // Results
            Constraint::Length(5), // Now playing
        ])
        .split(area);

    app.layout.search_input = main_chunks[0];
    render_search_input(
        frame,
        main_chunks[0],
        &app.search,
        app.focus == Focus::Search,
    );

    let vertical_volume = app.config.ui.vertical_volume;
    let content_chunks = if vertical_volume {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(VOLUME_COLUMN_WIDTH)])
            .split(main_chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(100)])
            .split(main_chunks[1])
    };

    app.layout.results = content_chunks[0];
    let current_id = app
        .now_playing
        .current_track
        .as_ref()
        .map(|t| t.id.as_str());
    render_results(
        frame,
        content_chunks[0],
        &mut app.search,
        app.focus == Focus::Results,
        current_id,
    );

    let bar = render_now_playing(
        frame,
        main_chunks[2],
        &mut app.now_playing,
        &app.volume,
        !vertical_volume,
    );
    app.layout.progress_bar = bar.progress_bar;
    app.layout.play_button = bar.play_button;
    app.layout.like_button = bar.like_button;
    app.layout.shuffle_button = bar.shuffle_button;
    app.layout.repeat_button = bar.repeat_button;

    app.layout.volume_bar = if vertical_volume && content_chunks.len() > 1 {
        render_volume_column(frame, content_chunks[1], &app.volume)
    } else {
        bar.volume_bar.unwrap_or_default()
    };

    if app.show_help {
        render_help(frame, area);
    }

    render_notifications(frame, area, &app.notifications);
}

/// Bordered vertical volume bar. Returns the bar area inside the border.
fn render_volume_column(frame: &mut Frame, area: Rect, volume: &VolumeState) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(volume.icon().symbol())
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    render_volume_bar(frame, inner, volume);
    inner
}

/// Render the help overlay.
fn render_help(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, popup_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        heading("Search"),
        Line::from("  Ctrl+F or /   Focus the search field"),
        Line::from("  Ctrl+U        Clear the search field"),
        Line::from("  Enter / Tab   Go to results"),
        Line::from("  Esc           Leave the search field"),
        Line::from(""),
        heading("Results"),
        Line::from("  j/k           Move selection"),
        Line::from("  Enter         Play selected preview"),
        Line::from(""),
        heading("Playback"),
        Line::from("  Space         Play/Pause"),
        Line::from("  ,/.           Seek backward/forward (5s)"),
        Line::from("  ↑/↓           Volume up/down"),
        Line::from("  m             Mute/unmute"),
        Line::from("  l             Like current track"),
        Line::from("  s             Toggle shuffle"),
        Line::from("  r             Toggle repeat"),
        Line::from(""),
        heading("Mouse"),
        Line::from("  Click row/▶   Play preview"),
        Line::from("  Click prog    Seek in track"),
        Line::from("  Drag vol      Set volume"),
        Line::from("  Scroll vol    Adjust volume"),
        Line::from(""),
        heading("Other"),
        Line::from("  ?             Show this help"),
        Line::from("  q / Ctrl+C    Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    use crate::config::Config;

    fn draw(config: Config) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(config, tx, None);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();
        app
    }

    #[test]
    fn test_layout_is_recorded() {
        let app = draw(Config::default());

        assert_eq!(app.layout.search_input, Rect::new(0, 0, 100, 3));
        assert_eq!(app.layout.results, Rect::new(0, 3, 100, 22));
        assert_eq!(app.layout.progress_bar.y, 28);
        assert_eq!(app.layout.play_button.y, 27);

        // Inline bar in the controls row.
        let volume = app.layout.volume_bar;
        assert_eq!(volume.y, 27);
        assert!(volume.width > volume.height);
    }

    #[test]
    fn test_vertical_volume_column() {
        let mut config = Config::default();
        config.ui.vertical_volume = true;
        let app = draw(config);

        let volume = app.layout.volume_bar;
        assert!(volume.height > volume.width);
        assert_eq!(volume.x, 100 - VOLUME_COLUMN_WIDTH + 1);
        assert_eq!(app.layout.results.width, 100 - VOLUME_COLUMN_WIDTH);
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_failed_first_search_stops_searching_hint() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Config::default(), tx, None);
        let t0 = std::time::Instant::now();
        for c in "imagine".chars() {
            app.search.input(c, t0);
        }
        let request = app
            .search
            .poll_due(t0 + std::time::Duration::from_secs(1))
            .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Searching..."));

        app.handle_action_at(
            crate::action::Action::SearchCompleted {
                seq: request.seq,
                query: request.query,
                result: Err("timed out".into()),
            },
            t0,
        )
        .unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(!text.contains("Searching..."));
        assert!(!text.contains("searching..."));
        assert!(text.contains("No results yet"));
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 80, area);
        assert_eq!(popup, Rect::new(20, 5, 60, 40));
    }
}
