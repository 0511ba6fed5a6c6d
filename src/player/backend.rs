//! Audio playback backend using rodio.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;

use super::{MediaElement, MediaEvent};

/// How often the player thread wakes up to drain commands and report progress.
const TICK: Duration = Duration::from_millis(100);

/// Messages sent to the player thread.
#[derive(Debug)]
pub enum PlayerCommand {
    Load { url: String, generation: u64 },
    Play { generation: u64 },
    Pause,
    SetVolume(f32),
    Seek(Duration),
}

/// Audio player that runs in a separate thread.
pub struct Player {
    command_tx: mpsc::UnboundedSender<PlayerCommand>,
    event_rx: mpsc::UnboundedReceiver<MediaEvent>,
}

impl Player {
    /// Create a new audio player with the given initial volume.
    pub fn new(volume: f32) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                if let Err(e) = run_player_thread(command_rx, event_tx, volume) {
                    tracing::error!("Player thread error: {}", e);
                }
            })?;

        Ok(Self {
            command_tx,
            event_rx,
        })
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.command_tx.send(command)?;
        Ok(())
    }
}

impl MediaElement for Player {
    fn load(&mut self, url: &str, generation: u64) -> Result<()> {
        self.send(PlayerCommand::Load {
            url: url.to_string(),
            generation,
        })
    }

    fn play(&mut self, generation: u64) -> Result<()> {
        self.send(PlayerCommand::Play { generation })
    }

    fn pause(&mut self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.send(PlayerCommand::Seek(position))
    }

    fn try_recv_event(&mut self) -> Option<MediaEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// The source currently assigned to the output.
enum LoadedSource {
    Empty,
    Ready {
        generation: u64,
        data: Arc<[u8]>,
        duration: Option<Duration>,
    },
    Failed {
        generation: u64,
        reason: String,
    },
}

/// Playback clock: accumulated position plus time since the last resume.
#[derive(Default)]
struct Clock {
    base: Duration,
    resumed_at: Option<Instant>,
}

impl Clock {
    fn position(&self) -> Duration {
        self.base + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.resumed_at = None;
    }

    fn reset(&mut self, position: Duration) {
        self.base = position;
        self.resumed_at = None;
    }
}

struct PlayerThread {
    handle: OutputStreamHandle,
    sink: Sink,
    source: LoadedSource,
    clock: Clock,
    playing: bool,
    volume: f32,
    event_tx: mpsc::UnboundedSender<MediaEvent>,
}

/// Run the player thread.
fn run_player_thread(
    mut command_rx: mpsc::UnboundedReceiver<PlayerCommand>,
    event_tx: mpsc::UnboundedSender<MediaEvent>,
    volume: f32,
) -> Result<()> {
    // The stream must outlive every sink created from its handle.
    let (_stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.set_volume(volume);

    let mut thread = PlayerThread {
        handle,
        sink,
        source: LoadedSource::Empty,
        clock: Clock::default(),
        playing: false,
        volume,
        event_tx,
    };

    loop {
        loop {
            match command_rx.try_recv() {
                Ok(command) => thread.handle_command(command)?,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return Ok(()),
            }
        }

        thread.report_progress();
        std::thread::sleep(TICK);
    }
}

impl PlayerThread {
    fn emit(&self, event: MediaEvent) {
        let _ = self.event_tx.send(event);
    }

    fn generation(&self) -> Option<u64> {
        match self.source {
            LoadedSource::Ready { generation, .. } | LoadedSource::Failed { generation, .. } => {
                Some(generation)
            }
            LoadedSource::Empty => None,
        }
    }

    /// Drop whatever is queued and start over with a fresh, paused sink.
    fn reset_sink(&mut self) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::try_new(&self.handle)?;
        self.sink.pause();
        self.sink.set_volume(self.volume);
        Ok(())
    }

    fn handle_command(&mut self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::Load { url, generation } => {
                self.reset_sink()?;
                self.playing = false;
                self.clock.reset(Duration::ZERO);

                self.source = match fetch_audio_data(&url) {
                    Ok(data) => {
                        let data: Arc<[u8]> = data.into();
                        let duration = probe_duration(&data);
                        tracing::debug!("Loaded {} bytes, duration {:?}", data.len(), duration);
                        self.emit(MediaEvent::TimeUpdate {
                            generation,
                            position: Duration::ZERO,
                            duration,
                        });
                        LoadedSource::Ready {
                            generation,
                            data,
                            duration,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch {}: {}", url, e);
                        LoadedSource::Failed {
                            generation,
                            reason: e.to_string(),
                        }
                    }
                };
            }
            PlayerCommand::Play { generation } => self.start(generation)?,
            PlayerCommand::Pause => {
                self.sink.pause();
                self.clock.pause();
                self.playing = false;
            }
            PlayerCommand::SetVolume(volume) => {
                self.volume = volume;
                self.sink.set_volume(volume);
            }
            PlayerCommand::Seek(position) => self.seek(position)?,
        }
        Ok(())
    }

    fn start(&mut self, generation: u64) -> Result<()> {
        let reason = match &self.source {
            LoadedSource::Ready {
                generation: loaded, ..
            } if *loaded == generation => None,
            LoadedSource::Failed {
                generation: loaded,
                reason,
            } if *loaded == generation => Some(reason.clone()),
            _ => Some(String::from("No source loaded")),
        };
        if let Some(reason) = reason {
            self.emit(MediaEvent::Rejected { generation, reason });
            return Ok(());
        }

        // A finished or never-started source is re-queued from the clock position.
        if self.sink.empty() {
            let from = self.clock.position();
            if let Err(e) = self.enqueue(from) {
                self.emit(MediaEvent::Rejected {
                    generation,
                    reason: e.to_string(),
                });
                return Ok(());
            }
        }

        self.sink.play();
        self.clock.resume();
        self.playing = true;
        self.emit(MediaEvent::Started { generation });
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let Some(generation) = self.generation() else {
            return Ok(());
        };
        if !matches!(self.source, LoadedSource::Ready { .. }) {
            return Ok(());
        }

        self.reset_sink()?;
        self.clock.reset(position);

        match self.enqueue(position) {
            Ok(()) => {
                if self.playing {
                    self.sink.play();
                    self.clock.resume();
                }
            }
            Err(e) => {
                self.playing = false;
                self.emit(MediaEvent::Error {
                    generation,
                    message: format!("Seek failed: {}", e),
                });
            }
        }
        Ok(())
    }

    /// Decode the loaded data and append it to the sink, skipping `skip`.
    fn enqueue(&mut self, skip: Duration) -> Result<()> {
        let LoadedSource::Ready { data, .. } = &self.source else {
            return Ok(());
        };

        let decoder = Decoder::new(Cursor::new(Arc::clone(data)))?;
        if skip > Duration::ZERO {
            self.sink.append(decoder.skip_duration(skip));
        } else {
            self.sink.append(decoder);
        }
        Ok(())
    }

    fn report_progress(&mut self) {
        if !self.playing {
            return;
        }
        let LoadedSource::Ready {
            generation,
            duration,
            ..
        } = self.source
        else {
            return;
        };

        if self.sink.empty() {
            self.playing = false;
            self.clock.reset(Duration::ZERO);
            self.emit(MediaEvent::Ended { generation });
            return;
        }

        let mut position = self.clock.position();
        if let Some(total) = duration {
            position = position.min(total);
        }
        self.emit(MediaEvent::TimeUpdate {
            generation,
            position,
            duration,
        });
    }
}

/// Fetch audio data from URL.
fn fetch_audio_data(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let bytes = response.bytes()?;
    Ok(bytes.to_vec())
}

/// Work out the clip length from container metadata.
fn probe_duration(data: &Arc<[u8]>) -> Option<Duration> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(Arc::clone(data))), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    let frames = params.n_frames?;

    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }

    let rate = params.sample_rate?;
    Some(Duration::from_secs_f64(frames as f64 / rate as f64))
}
