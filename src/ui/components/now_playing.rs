//! Now playing bar component.

use std::collections::HashSet;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, StatefulImage};

use super::volume::{render_volume_bar, VolumeState};
use crate::action::PlaybackStatus;
use crate::client::models::Track;

/// Width of each clickable control button, e.g. " ▶ ".
const BUTTON_WIDTH: u16 = 4;

/// Width of the horizontal volume bar.
const VOLUME_BAR_WIDTH: u16 = 10;

/// Format seconds as `m:ss`. Non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::from("0:00");
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Now playing state.
pub struct NowPlayingState {
    /// Currently selected track
    pub current_track: Option<Track>,

    /// Playback status
    pub status: PlaybackStatus,

    /// Current position in seconds
    pub position: f64,

    /// Total duration in seconds, if known
    pub duration: Option<f64>,

    /// Identifies the active audio source; bumped on every selection
    pub generation: u64,

    /// Shuffle toggle
    pub shuffle: bool,

    /// Repeat toggle
    pub repeat: bool,

    /// Track ids liked during this session
    liked: HashSet<String>,

    /// Cover image protocol (for Sixel/Kitty/etc.)
    pub cover: Option<StatefulProtocol>,

    /// Cover URL of the current track
    pub cover_url: Option<String>,

    /// Image picker for terminal graphics
    pub picker: Option<Picker>,
}

impl NowPlayingState {
    pub fn new(picker: Option<Picker>) -> Self {
        Self {
            current_track: None,
            status: PlaybackStatus::default(),
            position: 0.0,
            duration: None,
            generation: 0,
            shuffle: false,
            repeat: false,
            liked: HashSet::new(),
            cover: None,
            cover_url: None,
            picker,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    /// Make `track` current and return the generation of its source.
    ///
    /// Title, artist and cover switch immediately; playback itself starts
    /// once the media element accepts the source.
    pub fn set_track(&mut self, track: Track) -> u64 {
        self.generation += 1;
        self.position = 0.0;
        // Catalog durations describe the full song, not the preview clip.
        self.duration = None;
        self.status = PlaybackStatus::Loading;

        let new_cover = track.cover_url().map(String::from);
        if self.cover_url != new_cover {
            self.cover = None;
            self.cover_url = new_cover;
        }

        self.current_track = Some(track);
        self.generation
    }

    /// Store a position report from the media element.
    pub fn update_progress(&mut self, position: f64, duration: Option<f64>) {
        self.position = if position.is_finite() {
            position.max(0.0)
        } else {
            0.0
        };
        if duration.is_some() {
            self.duration = duration;
        }
    }

    /// Duration if it is finite and positive.
    pub fn finite_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Progress as a percentage (0 to 100).
    pub fn progress_percent(&self) -> f64 {
        match self.finite_duration() {
            Some(duration) => (self.position / duration * 100.0).clamp(0.0, 100.0),
            None => 0.0,
        }
    }

    pub fn position_string(&self) -> String {
        format_time(self.position)
    }

    pub fn duration_string(&self) -> String {
        format_time(self.finite_duration().unwrap_or(f64::NAN))
    }

    /// Target position in seconds for a seek at `ratio` of the track.
    /// `None` when there is nothing to seek in.
    pub fn seek_target(&self, ratio: f64) -> Option<f64> {
        self.current_track.as_ref()?;
        let duration = self.finite_duration()?;
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some((ratio * duration).clamp(0.0, duration))
    }

    /// Reset after the track played to its end. Track info stays visible.
    pub fn mark_ended(&mut self) {
        self.status = PlaybackStatus::Ended;
        self.position = 0.0;
    }

    /// Toggle like on the current track. Returns the new state.
    pub fn toggle_like(&mut self) -> Option<bool> {
        let id = self.current_track.as_ref()?.id.clone();
        if self.liked.remove(&id) {
            Some(false)
        } else {
            self.liked.insert(id);
            Some(true)
        }
    }

    pub fn is_liked(&self) -> bool {
        self.current_track
            .as_ref()
            .is_some_and(|t| self.liked.contains(&t.id))
    }

    /// Set the cover image data.
    pub fn set_cover(&mut self, image_data: &[u8]) {
        if let Some(picker) = &mut self.picker {
            match image::load_from_memory(image_data) {
                Ok(dyn_image) => self.cover = Some(picker.new_resize_protocol(dyn_image)),
                Err(e) => tracing::warn!("Failed to decode cover art: {}", e),
            }
        }
    }

    /// Get play/pause symbol.
    pub fn state_symbol(&self) -> &'static str {
        match self.status {
            PlaybackStatus::Playing => "▶ ",
            PlaybackStatus::Paused | PlaybackStatus::Ended => "❚❚",
            PlaybackStatus::Loading => "… ",
            PlaybackStatus::Error => "✕ ",
            PlaybackStatus::Idle => "■ ",
        }
    }
}

/// Clickable regions of the now playing bar.
#[derive(Debug, Default, Clone, Copy)]
pub struct NowPlayingLayout {
    pub progress_bar: Rect,
    pub play_button: Rect,
    pub like_button: Rect,
    pub shuffle_button: Rect,
    pub repeat_button: Rect,
    /// Only set when the volume bar is drawn inside this bar.
    pub volume_bar: Option<Rect>,
}

/// Render the now playing bar.
pub fn render_now_playing(
    frame: &mut Frame,
    area: Rect,
    state: &mut NowPlayingState,
    volume: &VolumeState,
    inline_volume: bool,
) -> NowPlayingLayout {
    let mut layout = NowPlayingLayout::default();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 3 {
        return layout;
    }

    // Layout: [cover] [info + controls + progress]
    let has_cover = state.cover.is_some() && state.picker.is_some();
    let cover_width = if has_cover {
        (inner.height * 2).min(8)
    } else {
        0
    };

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(cover_width), Constraint::Min(20)])
        .split(inner);

    if let Some(protocol) = state.cover.as_mut() {
        frame.render_stateful_widget(StatefulImage::default(), main_chunks[0], protocol);
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Track info
            Constraint::Length(1), // Controls
            Constraint::Length(1), // Progress
        ])
        .split(main_chunks[1]);

    render_track_info(frame, rows[0], state);
    render_controls(frame, rows[1], state, volume, inline_volume, &mut layout);

    // Progress: [position] [gauge] [duration]
    let progress_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(10),
            Constraint::Length(6),
        ])
        .split(rows[2]);

    frame.render_widget(
        Paragraph::new(state.position_string()).style(Style::default().fg(Color::DarkGray)),
        progress_chunks[0],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .percent(state.progress_percent() as u16)
        .label("");
    frame.render_widget(gauge, progress_chunks[1]);
    layout.progress_bar = progress_chunks[1];

    frame.render_widget(
        Paragraph::new(format!(" {}", state.duration_string()))
            .style(Style::default().fg(Color::DarkGray)),
        progress_chunks[2],
    );

    layout
}

fn render_track_info(frame: &mut Frame, area: Rect, state: &NowPlayingState) {
    let symbol = Span::styled(
        format!("{} ", state.state_symbol()),
        Style::default().fg(Color::Green),
    );

    let line = if let Some(track) = &state.current_track {
        Line::from(vec![
            symbol,
            Span::styled(
                track.title.as_str(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" - ", Style::default().fg(Color::DarkGray)),
            Span::styled(track.display_artist(), Style::default().fg(Color::Cyan)),
            Span::styled(" • ", Style::default().fg(Color::DarkGray)),
            Span::styled(track.display_album(), Style::default().fg(Color::Yellow)),
        ])
    } else {
        Line::from(vec![
            symbol,
            Span::styled("Nothing playing", Style::default().fg(Color::DarkGray)),
        ])
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_controls(
    frame: &mut Frame,
    area: Rect,
    state: &NowPlayingState,
    volume: &VolumeState,
    inline_volume: bool,
    layout: &mut NowPlayingLayout,
) {
    let active = Style::default().fg(Color::Green);
    let inactive = Style::default().fg(Color::DarkGray);

    let play = if state.is_playing() { "❚❚" } else { "▶ " };
    let like = if state.is_liked() { "♥ " } else { "♡ " };
    let buttons = [
        (play, Style::default().fg(Color::White)),
        (like, if state.is_liked() { active } else { inactive }),
        ("⤮ ", if state.shuffle { active } else { inactive }),
        ("↻ ", if state.repeat { active } else { inactive }),
    ];

    let mut spans = Vec::new();
    for (glyph, style) in buttons {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(glyph, style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let button = |i: u16| Rect {
        x: area.x + i * BUTTON_WIDTH,
        y: area.y,
        width: BUTTON_WIDTH.min(area.width.saturating_sub(i * BUTTON_WIDTH)),
        height: 1,
    };
    layout.play_button = button(0);
    layout.like_button = button(1);
    layout.shuffle_button = button(2);
    layout.repeat_button = button(3);

    // Right side: "icon ━━━━━━━━━━ 70%"
    let percent = format!(" {:>3}%", volume.fill_percent());
    let right_width = 2 + VOLUME_BAR_WIDTH * u16::from(inline_volume) + percent.len() as u16;
    if area.width < 4 * BUTTON_WIDTH + right_width {
        return;
    }
    let right = Rect {
        x: area.x + area.width - right_width,
        y: area.y,
        width: right_width,
        height: 1,
    };

    frame.render_widget(
        Paragraph::new(format!("{} ", volume.icon().symbol()))
            .style(Style::default().fg(Color::White)),
        Rect { width: 2, ..right },
    );

    if inline_volume {
        let bar = Rect {
            x: right.x + 2,
            width: VOLUME_BAR_WIDTH,
            ..right
        };
        render_volume_bar(frame, bar, volume);
        layout.volume_bar = Some(bar);
    }

    frame.render_widget(
        Paragraph::new(percent).style(Style::default().fg(Color::DarkGray)),
        Rect {
            x: right.x + right_width - 5,
            width: 5,
            ..right
        },
    );
}
