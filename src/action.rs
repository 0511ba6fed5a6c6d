//! Application actions/events that drive state changes.

use crate::client::models::Track;

/// Actions that can be dispatched to update application state.
///
/// User input, the periodic tick and network completions all arrive as
/// actions on one channel and are applied in order by `App::handle_action`.
/// Media lifecycle events are drained from the player on each tick.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Action {
    // Application lifecycle
    Quit,
    Tick,
    Resize(u16, u16),

    // Focus
    FocusSearch,
    BlurSearch,
    /// Leave the search field and move to the results list.
    FocusResults,

    // Search field editing
    SearchInput(char),
    SearchBackspace,
    SearchClear,

    // Network completions
    SearchCompleted {
        seq: u64,
        query: String,
        result: Result<Vec<Track>, String>,
    },
    CoverLoaded(String, Vec<u8>),

    // Result list
    NavigateUp,
    NavigateDown,
    PlaySelected,
    /// Select and play the result at this index.
    PlayResult(usize),

    // Mouse
    MouseDown(u16, u16),
    MouseDrag(u16, u16),
    MouseUp(u16, u16),
    MouseScroll(i16, u16, u16), // positive = down, negative = up

    // Playback controls
    PlayPause,
    SeekForward,
    SeekBackward,

    // Volume
    VolumeUp,
    VolumeDown,
    ToggleMute,

    // Toggles
    ToggleLike,
    ToggleShuffle,
    ToggleRepeat,

    // Overlays
    ShowHelp,
    HideHelp,

    // No-op
    None,
}

/// Playback status of the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No track has been selected yet.
    #[default]
    Idle,
    /// Source assigned and playback requested; waiting for the media element.
    Loading,
    Playing,
    Paused,
    /// Played to the end; behaves like `Paused` at position zero.
    Ended,
    /// Media failure; a new selection is required to leave this state.
    Error,
}

impl PlaybackStatus {
    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

/// Which part of the screen receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Text entry in the search field. Shortcuts are disabled.
    #[default]
    Search,
    Results,
}
