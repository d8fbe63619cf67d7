//! Offline rendering of a [`SignalGraph`] to mono samples.
//!
//! Voices are rendered independently and summed. Automation is evaluated per
//! sample; oscillators accumulate phase so frequency sweeps stay continuous;
//! filters are RBJ cookbook biquads in direct form I, recomputed only when
//! their frequency or Q moves.

use super::graph::{Filter, FilterKind, SignalGraph, Source, Voice};
use std::f64::consts::TAU;

/// Mono f32 samples at a fixed rate, starting at the graph origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl RenderedAudio {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Largest absolute sample value between two offsets in seconds.
    pub fn peak_between(&self, from: f64, to: f64) -> f32 {
        let a = self.index_of(from);
        let b = self.index_of(to).max(a);
        peak(&self.samples[a..b])
    }

    /// The same sound at another rate, by linear interpolation.
    pub fn resampled(&self, sample_rate: u32) -> RenderedAudio {
        let sample_rate = sample_rate.max(1);
        if sample_rate == self.sample_rate || self.samples.is_empty() {
            return RenderedAudio {
                sample_rate,
                samples: self.samples.clone(),
            };
        }
        let step = self.sample_rate as f64 / sample_rate as f64;
        let len = (self.samples.len() as f64 / step).round() as usize;
        let last = self.samples.len() - 1;
        let samples = (0..len)
            .map(|n| {
                let pos = n as f64 * step;
                let i = (pos.floor() as usize).min(last);
                let frac = (pos - i as f64) as f32;
                let next = self.samples[(i + 1).min(last)];
                self.samples[i] + (next - self.samples[i]) * frac
            })
            .collect();
        RenderedAudio {
            sample_rate,
            samples,
        }
    }

    fn index_of(&self, t: f64) -> usize {
        ((t.max(0.0) * self.sample_rate as f64).round() as usize).min(self.samples.len())
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Render every voice of `graph` into one mono buffer.
pub fn render(graph: &SignalGraph) -> RenderedAudio {
    let sample_rate = graph.sample_rate();
    // Tolerate float dust like 0.05 + 0.1 so exact lengths don't gain a sample
    let len = (graph.duration() * sample_rate as f64 - 1e-6).ceil().max(0.0) as usize;
    let mut out = vec![0.0f32; len];
    for voice in graph.voices() {
        render_voice(voice, sample_rate, &mut out);
    }
    RenderedAudio {
        sample_rate,
        samples: out,
    }
}

fn render_voice(voice: &Voice, sample_rate: u32, out: &mut [f32]) {
    let sr = sample_rate as f64;
    let first = (voice.start() * sr).round() as usize;
    let last = ((voice.stop() * sr).round() as usize).min(out.len());

    let mut phase = 0.0f64;
    let mut biquad = voice.filter.as_ref().map(|f| Biquad::new(f.kind));

    for (n, slot) in out.iter_mut().enumerate().take(last).skip(first) {
        let t = n as f64 / sr;
        let raw = match &voice.source {
            Source::Oscillator {
                waveform,
                frequency,
            } => {
                let s = waveform.sample(phase);
                phase = (phase + frequency.value_at(t) / sr).rem_euclid(1.0);
                s
            }
            Source::Buffer { samples } => samples.get(n - first).copied().unwrap_or(0.0) as f64,
        };
        let filtered = match (&mut biquad, &voice.filter) {
            (Some(bq), Some(filter)) => bq.process(raw, filter, t, sr),
            _ => raw,
        };
        *slot += (filtered * voice.gain.value_at(t)) as f32;
    }
}

/// Direct form I biquad with cached coefficients.
struct Biquad {
    kind: FilterKind,
    key: (f64, f64),
    b: [f64; 3],
    a: [f64; 2],
    x: [f64; 2],
    y: [f64; 2],
}

impl Biquad {
    fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            key: (f64::NAN, f64::NAN),
            b: [1.0, 0.0, 0.0],
            a: [0.0, 0.0],
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    fn process(&mut self, input: f64, filter: &Filter, t: f64, sample_rate: f64) -> f64 {
        let key = (filter.frequency.value_at(t), filter.q.value_at(t));
        if key != self.key {
            self.configure(key.0, key.1, sample_rate);
            self.key = key;
        }
        let y = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[0] * self.y[0]
            - self.a[1] * self.y[1];
        self.x = [input, self.x[0]];
        self.y = [y, self.y[0]];
        y
    }

    /// RBJ cookbook coefficients, normalized by a0.
    fn configure(&mut self, frequency: f64, q: f64, sample_rate: f64) {
        let nyquist = sample_rate / 2.0;
        let f = frequency.clamp(1.0, nyquist * 0.999);
        let w0 = TAU * f / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = match self.kind {
            FilterKind::Lowpass | FilterKind::Highpass => sin / (2.0 * 10f64.powf(q / 20.0)),
            FilterKind::Bandpass => sin / (2.0 * q.max(1e-4)),
        };
        let (b0, b1, b2) = match self.kind {
            FilterKind::Lowpass => ((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0),
            FilterKind::Highpass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        self.b = [b0 / a0, b1 / a0, b2 / a0];
        self.a = [-2.0 * cos / a0, (1.0 - alpha) / a0];
    }
}
