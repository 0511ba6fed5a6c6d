//! UI components module.

pub mod notifications;
pub mod now_playing;
pub mod search;
pub mod volume;

pub use notifications::{render_notifications, Notifications};
pub use now_playing::{render_now_playing, NowPlayingState};
pub use search::{render_results, render_search_input, SearchState};
pub use volume::{render_volume_bar, VolumeState};
