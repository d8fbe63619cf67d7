//! The process-wide audio output.
//!
//! Sound is best-effort: the first play creates the output, later plays
//! reuse it, a suspended output is resumed before scheduling, and a missing
//! output makes every play a silent no-op. Sounds are always rendered at the
//! engine's sample rate, so a play call hands back what was (or would have
//! been) heard.
//!
//! Output backends sit behind [`AudioOutput`]: [`NullOutput`] for builds
//! and machines without sound, and a `cpal` device when the crate is built
//! with the `playback` feature.

use super::graph::SignalGraph;
use super::render::{RenderedAudio, render};
use super::sounds::{motor_graph, shutter_graph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Mutex, OnceLock};
use thiserror::Error;
use tracing::debug;

/// Rate sounds are rendered at until configured otherwise.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error("audio output thread has shut down")]
    Closed,
}

/// Lifecycle of an output, like a browser audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Running,
    Suspended,
    Unavailable,
}

/// Where rendered sounds go.
pub trait AudioOutput: Send {
    fn state(&self) -> OutputState;
    /// Start or restart the clock after a suspend.
    fn resume(&mut self) -> Result<(), AudioError>;
    /// Current position of the output clock, in seconds.
    fn current_time(&self) -> f64;
    fn sample_rate(&self) -> u32;
    /// Ask the output to run at `rate`. Outputs with a fixed clock keep theirs.
    fn set_sample_rate(&mut self, _rate: u32) {}
    /// Queue `audio` to begin at clock time `at`.
    fn play(&mut self, audio: RenderedAudio, at: f64) -> Result<(), AudioError>;
}

/// An output that never exists.
#[derive(Debug, Default)]
pub struct NullOutput {
    sample_rate: u32,
}

impl NullOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioOutput for NullOutput {
    fn state(&self) -> OutputState {
        OutputState::Unavailable
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Err(AudioError::NoDevice)
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
    }

    fn play(&mut self, _audio: RenderedAudio, _at: f64) -> Result<(), AudioError> {
        Err(AudioError::NoDevice)
    }
}

/// A rendered sound and whether it reached the output.
#[derive(Debug, Clone)]
pub struct Playback {
    pub audio: RenderedAudio,
    pub queued: bool,
}

/// Owns one output and the RNG feeding the sounds' noise buffers.
pub struct AudioEngine {
    output: Box<dyn AudioOutput>,
    enabled: bool,
    sample_rate: u32,
    rng: StdRng,
}

static GLOBAL: OnceLock<Mutex<AudioEngine>> = OnceLock::new();

impl AudioEngine {
    /// Renders at the output's own rate until [`set_sample_rate`](Self::set_sample_rate).
    pub fn with_output(output: Box<dyn AudioOutput>) -> Self {
        let sample_rate = output.sample_rate();
        Self {
            output,
            enabled: true,
            sample_rate,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn unavailable() -> Self {
        Self::with_output(Box::new(NullOutput::new(DEFAULT_SAMPLE_RATE)))
    }

    /// The default device when built with `playback`, else [`NullOutput`].
    pub fn open_default() -> Self {
        #[cfg(feature = "playback")]
        {
            match super::device::CpalOutput::open() {
                Ok(out) => return Self::with_output(Box::new(out)),
                Err(e) => debug!(error = %e, "no audio device, sounds disabled"),
            }
        }
        Self::unavailable()
    }

    /// The shared engine, created on first use.
    pub fn global() -> &'static Mutex<AudioEngine> {
        GLOBAL.get_or_init(|| Mutex::new(Self::open_default()))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render future sounds at `rate`; the output converts if it runs at
    /// another rate.
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate.max(1);
        self.output.set_sample_rate(self.sample_rate);
    }

    /// Replace the noise RNG, for reproducible sounds.
    pub fn set_rng(&mut self, rng: StdRng) {
        self.rng = rng;
    }

    pub fn is_available(&self) -> bool {
        self.enabled && self.output.state() != OutputState::Unavailable
    }

    /// Capability check plus resume-if-suspended.
    fn ready(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.output.state() {
            OutputState::Running => true,
            OutputState::Unavailable => {
                debug!("audio output unavailable, skipping sound");
                false
            }
            OutputState::Suspended => match self.output.resume() {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "could not resume audio output");
                    false
                }
            },
        }
    }

    fn play_graph(&mut self, build: fn(f64, u32, &mut StdRng) -> SignalGraph) -> Playback {
        let ready = self.ready();
        let graph = build(self.output.current_time(), self.sample_rate, &mut self.rng);
        let audio = render(&graph);
        if !ready {
            return Playback {
                audio,
                queued: false,
            };
        }
        let queued = match self.output.play(audio.clone(), graph.origin()) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "failed to queue sound");
                false
            }
        };
        Playback { audio, queued }
    }

    /// Play the shutter click now.
    pub fn play_shutter(&mut self) -> Playback {
        self.play_graph(shutter_graph)
    }

    /// Play the motor whirr now. Callers wait [`super::MOTOR_DELAY`] after
    /// the shutter before calling this.
    pub fn play_motor(&mut self) -> Playback {
        self.play_graph(motor_graph)
    }
}

/// Play the shutter on the shared engine.
pub fn play_shutter() -> Playback {
    with_global(AudioEngine::play_shutter)
}

/// Play the motor on the shared engine.
pub fn play_motor() -> Playback {
    with_global(AudioEngine::play_motor)
}

fn with_global<T>(f: impl FnOnce(&mut AudioEngine) -> T) -> T {
    match AudioEngine::global().lock() {
        Ok(mut engine) => f(&mut engine),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}
