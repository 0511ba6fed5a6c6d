//! Audio playback.
//!
//! The app drives exactly one media element. Every event it reports is tagged
//! with the generation of the source it belongs to, so the state machine can
//! drop events from a source that has since been replaced.

use std::time::Duration;

use color_eyre::Result;

pub mod backend;

pub use backend::Player;

/// Lifecycle notifications from the media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// A play request was accepted and audio is running.
    Started { generation: u64 },
    /// A play request could not be honored.
    Rejected { generation: u64, reason: String },
    /// Periodic position report. `duration` is `None` when unknown.
    TimeUpdate {
        generation: u64,
        position: Duration,
        duration: Option<Duration>,
    },
    /// The source played to its end.
    Ended { generation: u64 },
    /// Runtime failure while the source was active.
    Error { generation: u64, message: String },
}

impl MediaEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Started { generation }
            | Self::Rejected { generation, .. }
            | Self::TimeUpdate { generation, .. }
            | Self::Ended { generation }
            | Self::Error { generation, .. } => *generation,
        }
    }
}

/// The single audio output the app controls.
///
/// `load` replaces the current source, `play` asks for playback to start
/// (answered later by `Started` or `Rejected`), and `pause` takes effect
/// immediately.
pub trait MediaElement: Send {
    fn load(&mut self, url: &str, generation: u64) -> Result<()>;
    fn play(&mut self, generation: u64) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn set_volume(&mut self, volume: f32) -> Result<()>;
    fn seek(&mut self, position: Duration) -> Result<()>;
    /// Non-blocking poll for the next lifecycle event.
    fn try_recv_event(&mut self) -> Option<MediaEvent>;
}
