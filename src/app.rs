//! Main application state and logic.

use std::time::{Duration, Instant};

use color_eyre::Result;
use ratatui::layout::{Position, Rect};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;

use crate::action::{Action, Focus, PlaybackStatus};
use crate::client::models::Track;
use crate::client::CatalogClient;
use crate::config::Config;
use crate::player::{MediaElement, MediaEvent, Player};
use crate::ui::components::notifications::Notifications;
use crate::ui::components::search::{QueryChange, SearchRequest};
use crate::ui::components::volume::{ratio_from_pointer, SCROLL_STEP, VOLUME_STEP};
use crate::ui::{NowPlayingState, SearchState, VolumeState};

/// Step for `,` / `.` seeking, in seconds.
const SEEK_STEP_SECS: f64 = 5.0;

/// UI layout areas for mouse hit-testing, recorded by the last render.
#[derive(Debug, Default, Clone)]
pub struct UiLayout {
    pub search_input: Rect,
    pub results: Rect,
    pub progress_bar: Rect,
    pub volume_bar: Rect,
    pub play_button: Rect,
    pub like_button: Rect,
    pub shuffle_button: Rect,
    pub repeat_button: Rect,
}

/// Main application state.
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,

    /// Configuration
    pub config: Config,

    /// Gateway client
    pub client: Option<CatalogClient>,

    /// The single audio output
    pub player: Option<Box<dyn MediaElement>>,

    /// Search field and results
    pub search: SearchState,

    /// Now playing state
    pub now_playing: NowPlayingState,

    /// Volume and mute
    pub volume: VolumeState,

    /// Toast notifications
    pub notifications: Notifications,

    /// Where typed keys go
    pub focus: Focus,

    /// Help overlay visible
    pub show_help: bool,

    /// Action sender for async operations
    pub action_tx: mpsc::UnboundedSender<Action>,

    /// UI layout areas for mouse detection
    pub layout: UiLayout,
}

impl App {
    /// Create a new application instance.
    pub fn new(
        config: Config,
        action_tx: mpsc::UnboundedSender<Action>,
        picker: Option<Picker>,
    ) -> Self {
        let search = SearchState::new(config.debounce());
        let volume = VolumeState::new(config.player.volume);
        Self {
            should_quit: false,
            config,
            client: None,
            player: None,
            search,
            now_playing: NowPlayingState::new(picker),
            volume,
            notifications: Notifications::new(),
            focus: Focus::Search,
            show_help: false,
            action_tx,
            layout: UiLayout::default(),
        }
    }

    /// Connect the gateway client and open the audio output.
    ///
    /// Either may fail without stopping the app; the failure is shown as a
    /// notification and the affected feature stays disabled.
    pub fn init(&mut self) -> Result<()> {
        let now = Instant::now();

        match self.config.gateway.url.as_deref() {
            Some(url) => match CatalogClient::new(url, self.config.timeout()) {
                Ok(client) => {
                    tracing::info!("Using gateway {}", client.base_url());
                    self.client = Some(client);
                }
                Err(e) => {
                    tracing::error!("Failed to create gateway client: {}", e);
                    self.notifications.error(format!("Gateway error: {}", e), now);
                }
            },
            None => {
                tracing::error!("No gateway URL configured");
                self.notifications.error("No gateway configured", now);
            }
        }

        match Player::new(self.volume.level()) {
            Ok(player) => self.player = Some(Box::new(player)),
            Err(e) => {
                tracing::error!("Failed to initialize audio player: {}", e);
                self.notifications
                    .error(format!("Audio player error: {}", e), now);
            }
        }

        Ok(())
    }

    /// Handle an action and update state.
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        self.handle_action_at(action, Instant::now())
    }

    /// Handle an action as if it arrived at `now`.
    pub fn handle_action_at(&mut self, action: Action, now: Instant) -> Result<()> {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }

            Action::Tick => {
                self.poll_media(now);
                self.notifications.prune(now);
                if let Some(request) = self.search.poll_due(now) {
                    self.dispatch_search(request, now);
                }
            }

            Action::Resize(width, height) => {
                tracing::debug!("Terminal resized to {}x{}", width, height);
            }

            // Focus
            Action::FocusSearch => {
                self.show_help = false;
                self.focus = Focus::Search;
            }

            Action::BlurSearch | Action::FocusResults => {
                self.focus = Focus::Results;
            }

            // Search field
            Action::SearchInput(c) => {
                let change = self.search.input(c, now);
                self.log_query_change(change);
            }

            Action::SearchBackspace => {
                let change = self.search.backspace(now);
                self.log_query_change(change);
            }

            Action::SearchClear => {
                let change = self.search.clear(now);
                self.log_query_change(change);
            }

            Action::SearchCompleted { seq, query, result } => match result {
                Ok(tracks) => {
                    let count = tracks.len();
                    if self.search.apply_results(seq, tracks) {
                        tracing::info!("Search {:?} returned {} tracks", query, count);
                    } else {
                        tracing::debug!("Discarding stale results for {:?} (#{})", query, seq);
                    }
                }
                Err(e) => {
                    if self.search.apply_failure(seq) {
                        tracing::warn!("Search {:?} failed: {}", query, e);
                        self.notifications.error("Search failed. Try again.", now);
                    } else {
                        tracing::debug!("Discarding stale failure for {:?}: {}", query, e);
                    }
                }
            },

            Action::CoverLoaded(url, bytes) => {
                if self.now_playing.cover_url.as_deref() == Some(url.as_str()) {
                    self.now_playing.set_cover(&bytes);
                } else {
                    tracing::debug!("Dropping cover for a track no longer playing");
                }
            }

            // Result list
            Action::NavigateUp => self.search.select_previous(),
            Action::NavigateDown => self.search.select_next(),

            Action::PlaySelected => {
                if let Some(index) = self.search.selected() {
                    self.play_result(index, now);
                }
            }

            Action::PlayResult(index) => self.play_result(index, now),

            // Mouse
            Action::MouseDown(x, y) => self.handle_mouse_down(x, y, now),

            Action::MouseDrag(x, y) => {
                if self.volume.dragging {
                    self.drag_volume(x, y);
                }
            }

            Action::MouseUp(_, _) => {
                self.volume.dragging = false;
            }

            Action::MouseScroll(delta, x, y) => {
                let position = Position::new(x, y);
                if self.layout.volume_bar.contains(position) {
                    // Scroll up raises the volume.
                    let step = if delta < 0 { SCROLL_STEP } else { -SCROLL_STEP };
                    let level = self.volume.nudge(step);
                    self.apply_volume(level);
                } else if self.layout.results.contains(position) {
                    if delta > 0 {
                        self.search.select_next();
                    } else {
                        self.search.select_previous();
                    }
                }
            }

            // Playback
            Action::PlayPause => self.toggle_play_pause(now),
            Action::SeekForward => self.seek_relative(SEEK_STEP_SECS, now),
            Action::SeekBackward => self.seek_relative(-SEEK_STEP_SECS, now),

            // Volume
            Action::VolumeUp => {
                let level = self.volume.nudge(VOLUME_STEP);
                self.apply_volume(level);
            }

            Action::VolumeDown => {
                let level = self.volume.nudge(-VOLUME_STEP);
                self.apply_volume(level);
            }

            Action::ToggleMute => {
                let level = self.volume.toggle_mute();
                self.apply_volume(level);
            }

            // Toggles
            Action::ToggleLike => self.toggle_like(now),
            Action::ToggleShuffle => self.toggle_shuffle(now),
            Action::ToggleRepeat => self.toggle_repeat(now),

            // Overlays
            Action::ShowHelp => self.show_help = true,
            Action::HideHelp => self.show_help = false,

            Action::None => {}
        }

        Ok(())
    }

    fn log_query_change(&self, change: QueryChange) {
        match change {
            QueryChange::Cleared => tracing::debug!("Query cleared"),
            QueryChange::TooShort => {}
            QueryChange::Scheduled => {
                tracing::trace!("Search scheduled for {:?}", self.search.query.trim())
            }
        }
    }

    /// Send a due lookup to the gateway on a background task.
    fn dispatch_search(&mut self, request: SearchRequest, now: Instant) {
        let Some(client) = self.client.clone() else {
            self.search.apply_failure(request.seq);
            self.notifications.error("Search failed. Try again.", now);
            return;
        };

        tracing::info!("Searching for {:?} (#{})", request.query, request.seq);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = client
                .search(&request.query)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::SearchCompleted {
                seq: request.seq,
                query: request.query,
                result,
            });
        });
    }

    /// Drain lifecycle events reported by the audio output.
    fn poll_media(&mut self, now: Instant) {
        let events: Vec<_> = if let Some(player) = &mut self.player {
            std::iter::from_fn(|| player.try_recv_event()).collect()
        } else {
            Vec::new()
        };

        for event in events {
            self.handle_media_event(event, now);
        }
    }

    fn handle_media_event(&mut self, event: MediaEvent, now: Instant) {
        if self.now_playing.current_track.is_none()
            || event.generation() != self.now_playing.generation
        {
            tracing::debug!("Ignoring stale media event {:?}", event);
            return;
        }

        match event {
            MediaEvent::Started { .. } => {
                if self.now_playing.status == PlaybackStatus::Loading {
                    self.now_playing.status = PlaybackStatus::Playing;
                } else {
                    tracing::debug!(
                        "Ignoring start while {:?}",
                        self.now_playing.status
                    );
                }
            }
            MediaEvent::Rejected { reason, .. } => {
                tracing::warn!("Playback rejected: {}", reason);
                self.now_playing.status = PlaybackStatus::Error;
                self.notifications.error("Could not play this track", now);
            }
            MediaEvent::TimeUpdate {
                position, duration, ..
            } => {
                self.now_playing.update_progress(
                    position.as_secs_f64(),
                    duration.map(|d| d.as_secs_f64()),
                );
            }
            MediaEvent::Ended { .. } => {
                tracing::debug!("Preview finished");
                self.now_playing.mark_ended();
            }
            MediaEvent::Error { message, .. } => {
                tracing::error!("Audio error: {}", message);
                self.now_playing.status = PlaybackStatus::Error;
                self.notifications.error("Error loading audio", now);
            }
        }
    }

    fn play_result(&mut self, index: usize, now: Instant) {
        let Some(track) = self.search.track(index).cloned() else {
            return;
        };
        self.search.list_state.select(Some(index));
        self.select_track(track, now);
    }

    /// Make `track` current and start its preview.
    fn select_track(&mut self, track: Track, now: Instant) {
        let Some(url) = track.preview_url().map(String::from) else {
            tracing::info!("Track {} has no preview", track.id);
            self.notifications
                .error("This track has no preview available", now);
            return;
        };

        tracing::info!("Playing {} - {}", track.display_artist(), track.title);
        let generation = self.now_playing.set_track(track);
        self.request_cover();

        let result = match self.player.as_deref_mut() {
            Some(player) => player
                .load(&url, generation)
                .and_then(|()| player.play(generation)),
            None => Err(color_eyre::eyre::eyre!("Audio output unavailable")),
        };
        if let Err(e) = result {
            tracing::error!("Failed to start playback: {}", e);
            self.now_playing.status = PlaybackStatus::Error;
            self.notifications.error("Could not play this track", now);
        }
    }

    fn toggle_play_pause(&mut self, now: Instant) {
        if self.now_playing.current_track.is_none() {
            return;
        }

        match self.now_playing.status {
            PlaybackStatus::Idle | PlaybackStatus::Error => {}
            // A pause while loading wins over the pending start.
            PlaybackStatus::Playing | PlaybackStatus::Loading => {
                if self.command_player(now, |player| player.pause()) {
                    self.now_playing.status = PlaybackStatus::Paused;
                }
            }
            PlaybackStatus::Paused | PlaybackStatus::Ended => {
                let generation = self.now_playing.generation;
                self.now_playing.status = PlaybackStatus::Loading;
                if !self.command_player(now, |player| player.play(generation)) {
                    self.now_playing.status = PlaybackStatus::Error;
                }
            }
        }
    }

    fn seek_to_ratio(&mut self, ratio: f64, now: Instant) {
        if let Some(target) = self.now_playing.seek_target(ratio) {
            self.seek_to(target, now);
        }
    }

    fn seek_relative(&mut self, delta_secs: f64, now: Instant) {
        if self.now_playing.current_track.is_none() {
            return;
        }
        let Some(duration) = self.now_playing.finite_duration() else {
            return;
        };
        let target = (self.now_playing.position + delta_secs).clamp(0.0, duration);
        self.seek_to(target, now);
    }

    fn seek_to(&mut self, seconds: f64, now: Instant) {
        self.now_playing.position = seconds;
        self.command_player(now, |player| player.seek(Duration::from_secs_f64(seconds)));
    }

    fn apply_volume(&mut self, level: f32) {
        if let Some(player) = self.player.as_deref_mut() {
            if let Err(e) = player.set_volume(level) {
                tracing::warn!("Failed to set volume: {}", e);
            }
        }
    }

    fn drag_volume(&mut self, x: u16, y: u16) {
        let ratio = ratio_from_pointer(self.layout.volume_bar, x, y);
        let level = self.volume.set(ratio);
        self.apply_volume(level);
    }

    fn toggle_like(&mut self, now: Instant) {
        match self.now_playing.toggle_like() {
            Some(true) => self.notifications.info("Added to liked songs", now),
            Some(false) => self.notifications.info("Removed from liked songs", now),
            None => {}
        }
    }

    fn toggle_shuffle(&mut self, now: Instant) {
        self.now_playing.shuffle = !self.now_playing.shuffle;
        let message = if self.now_playing.shuffle {
            "Shuffle on"
        } else {
            "Shuffle off"
        };
        self.notifications.info(message, now);
    }

    fn toggle_repeat(&mut self, now: Instant) {
        self.now_playing.repeat = !self.now_playing.repeat;
        let message = if self.now_playing.repeat {
            "Repeat on"
        } else {
            "Repeat off"
        };
        self.notifications.info(message, now);
    }

    /// Run a command against the audio output. Returns false on failure.
    fn command_player(
        &mut self,
        now: Instant,
        command: impl FnOnce(&mut dyn MediaElement) -> Result<()>,
    ) -> bool {
        let result = match self.player.as_deref_mut() {
            Some(player) => command(player),
            None => Err(color_eyre::eyre::eyre!("Audio output unavailable")),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Player command failed: {}", e);
                self.notifications.error("Audio output unavailable", now);
                false
            }
        }
    }

    fn handle_mouse_down(&mut self, x: u16, y: u16, now: Instant) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        let position = Position::new(x, y);
        let layout = self.layout.clone();

        if layout.volume_bar.contains(position) {
            self.volume.dragging = true;
            self.drag_volume(x, y);
        } else if layout.progress_bar.contains(position) {
            // The last column is the end of the track.
            let bar = layout.progress_bar;
            let span = bar.width.saturating_sub(1).max(1);
            let ratio = f64::from(x - bar.x) / f64::from(span);
            self.seek_to_ratio(ratio, now);
        } else if layout.play_button.contains(position) {
            self.toggle_play_pause(now);
        } else if layout.like_button.contains(position) {
            self.toggle_like(now);
        } else if layout.shuffle_button.contains(position) {
            self.toggle_shuffle(now);
        } else if layout.repeat_button.contains(position) {
            self.toggle_repeat(now);
        } else if layout.search_input.contains(position) {
            self.focus = Focus::Search;
        } else if layout.results.contains(position) {
            self.focus = Focus::Results;
            if let Some(hit) = self.search.hit_test(layout.results, x, y) {
                tracing::debug!("Result click: {:?}", hit);
                self.play_result(hit.index(), now);
            }
        }
    }

    /// Fetch cover art for the current track in the background.
    fn request_cover(&self) {
        if !self.config.ui.show_cover
            || self.now_playing.picker.is_none()
            || self.now_playing.cover.is_some()
        {
            return;
        }
        let (Some(client), Some(url)) = (&self.client, self.now_playing.cover_url.clone()) else {
            return;
        };

        let client = client.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match client.fetch_bytes(&url).await {
                Ok(bytes) => {
                    let _ = tx.send(Action::CoverLoaded(url, bytes));
                }
                Err(e) => {
                    tracing::warn!("Failed to load cover art: {}", e);
                }
            }
        });
    }
}
