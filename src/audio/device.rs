//! Sound card output via `cpal`.
//!
//! A `cpal::Stream` cannot leave the thread that built it, so a dedicated
//! audio thread owns it and takes commands over a channel. Scheduled sounds
//! live in a shared [`Mixer`] the stream callback drains; the callback only
//! ever `try_lock`s it and writes silence on contention.

use super::engine::{AudioError, AudioOutput, OutputState};
use super::render::RenderedAudio;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, warn};

enum Command {
    Resume(Sender<Result<(), AudioError>>),
    Shutdown,
}

struct Scheduled {
    start_frame: u64,
    samples: Vec<f32>,
}

/// Sums every scheduled sound into the output, frame by frame.
#[derive(Default)]
struct Mixer {
    pending: Vec<Scheduled>,
}

impl Mixer {
    /// Fill `data` (interleaved, `channels` wide) starting at `frame`.
    fn fill(&mut self, data: &mut [f32], channels: usize, frame: u64) {
        let frames = data.len() / channels.max(1);
        for (i, out) in data.chunks_mut(channels.max(1)).enumerate() {
            let now = frame + i as u64;
            let mut sample = 0.0f32;
            for s in &self.pending {
                if now >= s.start_frame {
                    if let Some(v) = s.samples.get((now - s.start_frame) as usize) {
                        sample += v;
                    }
                }
            }
            out.fill(sample.clamp(-1.0, 1.0));
        }
        let end = frame + frames as u64;
        self.pending
            .retain(|s| s.start_frame + s.samples.len() as u64 > end);
    }
}

pub struct CpalOutput {
    commands: Sender<Command>,
    mixer: Arc<Mutex<Mixer>>,
    frames: Arc<AtomicU64>,
    sample_rate: u32,
    state: OutputState,
}

impl CpalOutput {
    /// Open the default output device. The stream starts suspended.
    pub fn open() -> Result<Self, AudioError> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let frames = Arc::new(AtomicU64::new(0));
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_mixer = Arc::clone(&mixer);
        let thread_frames = Arc::clone(&frames);
        thread::Builder::new()
            .name("instant-film-audio".into())
            .spawn(move || run_audio_thread(cmd_rx, ready_tx, thread_mixer, thread_frames))
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let sample_rate = ready_rx.recv().map_err(|_| AudioError::Closed)??;
        debug!(sample_rate, "audio output opened");
        Ok(Self {
            commands: cmd_tx,
            mixer,
            frames,
            sample_rate,
            state: OutputState::Suspended,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(Command::Resume(tx))
            .map_err(|_| AudioError::Closed)?;
        rx.recv().map_err(|_| AudioError::Closed)??;
        self.state = OutputState::Running;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, audio: RenderedAudio, at: f64) -> Result<(), AudioError> {
        let audio = if audio.sample_rate() == self.sample_rate {
            audio
        } else {
            debug!(
                from = audio.sample_rate(),
                to = self.sample_rate,
                "resampling sound for device"
            );
            audio.resampled(self.sample_rate)
        };
        let start_frame = (at.max(0.0) * self.sample_rate as f64).round() as u64;
        let mut mixer = self
            .mixer
            .lock()
            .map_err(|_| AudioError::Stream("mixer lock poisoned".into()))?;
        mixer.pending.push(Scheduled {
            start_frame,
            samples: audio.into_samples(),
        });
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

fn run_audio_thread(
    commands: Receiver<Command>,
    ready: Sender<Result<u32, AudioError>>,
    mixer: Arc<Mutex<Mixer>>,
    frames: Arc<AtomicU64>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready.send(Err(AudioError::NoDevice));
        return;
    };
    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let frame = frames.load(Ordering::Relaxed);
            match mixer.try_lock() {
                Ok(mut m) => m.fill(data, channels, frame),
                Err(_) => data.fill(0.0),
            }
            frames.fetch_add((data.len() / channels.max(1)) as u64, Ordering::Relaxed);
        },
        |err| warn!(error = %err, "audio stream error"),
        None,
    );
    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };
    // Some hosts start streams on creation; hold it until the first resume
    let _ = stream.pause();
    let _ = ready.send(Ok(sample_rate));

    for cmd in commands {
        match cmd {
            Command::Resume(reply) => {
                let result = stream.play().map_err(|e| AudioError::Stream(e.to_string()));
                let _ = reply.send(result);
            }
            Command::Shutdown => break,
        }
    }
}
