//! Signal graph model: sources, filters, gains and their automation.
//!
//! A [`SignalGraph`] is a flat list of [`Voice`]s, each a single chain
//! `source → optional biquad → gain → output`. That is all the camera
//! sounds need, and it keeps rendering a plain loop over voices.
//!
//! Every time inside a graph (voice start/stop, automation event) is an
//! offset in seconds from the graph's `origin`. The origin is the absolute
//! audio-clock time the graph was scheduled for, so relative timing such as
//! "the click starts 50ms after the thunk" is exact whatever the origin.

/// Periodic oscillator shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// One sample at `phase` in `[0, 1)`, range `[-1, 1]`.
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (std::f64::consts::TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => 2.0 * ((phase + 0.5) % 1.0) - 1.0,
        }
    }
}

/// One scheduled change to a [`Param`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation {
    /// Jump to `value` at `time`.
    SetValue { time: f64, value: f64 },
    /// Ramp linearly from the previous event to `value`, arriving at `time`.
    LinearRamp { time: f64, value: f64 },
    /// Ramp exponentially from the previous event to `value`, arriving at `time`.
    ExponentialRamp { time: f64, value: f64 },
}

impl Automation {
    pub fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. }
            | Automation::LinearRamp { time, .. }
            | Automation::ExponentialRamp { time, .. } => time,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Automation::SetValue { value, .. }
            | Automation::LinearRamp { value, .. }
            | Automation::ExponentialRamp { value, .. } => value,
        }
    }
}

/// An automatable value (frequency, gain, Q).
///
/// Before the first event the param holds its initial value. After the last
/// event it holds that event's value. Between events it follows the later
/// event's ramp shape; exponential ramps need both ends non-zero and of the
/// same sign, and otherwise hold the earlier value until the ramp ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    initial: f64,
    events: Vec<Automation>,
}

impl Param {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(Automation::SetValue { time, value })
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(Automation::LinearRamp { time, value })
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(Automation::ExponentialRamp { time, value })
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    /// Keep events sorted; equal times keep insertion order.
    fn push(&mut self, event: Automation) -> &mut Self {
        let at = self
            .events
            .partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
        self
    }

    /// Value at `t` seconds from the graph origin.
    pub fn value_at(&self, t: f64) -> f64 {
        let next = self.events.partition_point(|e| e.time() <= t);
        let (t0, v0) = match next.checked_sub(1) {
            Some(i) => (self.events[i].time(), self.events[i].value()),
            None => (0.0, self.initial),
        };
        let Some(upcoming) = self.events.get(next) else {
            return v0;
        };
        let (t1, v1) = (upcoming.time(), upcoming.value());
        let span = t1 - t0;
        match upcoming {
            Automation::SetValue { .. } => v0,
            _ if span <= 0.0 => v0,
            Automation::LinearRamp { .. } => v0 + (v1 - v0) * (t - t0) / span,
            Automation::ExponentialRamp { .. } => {
                if v0 == 0.0 || v1 == 0.0 || v0.signum() != v1.signum() {
                    v0
                } else {
                    v0 * (v1 / v0).powf((t - t0) / span)
                }
            }
        }
    }
}

/// RBJ biquad response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

/// A biquad filter stage.
///
/// `q` follows the usual web-audio reading: resonance in dB for lowpass and
/// highpass, plain quality factor for bandpass. It defaults to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub frequency: Param,
    pub q: Param,
}

impl Filter {
    pub fn new(kind: FilterKind, frequency: f64) -> Self {
        Self {
            kind,
            frequency: Param::new(frequency),
            q: Param::new(1.0),
        }
    }

    pub fn with_q(mut self, q: f64) -> Self {
        self.q = Param::new(q);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Oscillator { waveform: Waveform, frequency: Param },
    /// Plays the buffer once from the voice start.
    Buffer { samples: Vec<f32> },
}

/// One `source → filter → gain` chain with its own start and stop times.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub source: Source,
    pub filter: Option<Filter>,
    pub gain: Param,
    start: f64,
    stop: f64,
}

impl Voice {
    /// An oscillator sounding from `start` until `stop`.
    pub fn oscillator(waveform: Waveform, frequency: Param, start: f64, stop: f64) -> Self {
        Self {
            source: Source::Oscillator {
                waveform,
                frequency,
            },
            filter: None,
            gain: Param::new(1.0),
            start,
            stop: stop.max(start),
        }
    }

    /// A buffer played once from `start`; it stops when the buffer runs out.
    pub fn buffer(samples: Vec<f32>, sample_rate: u32, start: f64) -> Self {
        let stop = start + samples.len() as f64 / sample_rate as f64;
        Self {
            source: Source::Buffer { samples },
            filter: None,
            gain: Param::new(1.0),
            start,
            stop,
        }
    }

    pub fn through(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_gain(mut self, gain: Param) -> Self {
        self.gain = gain;
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }
}

/// A complete sound scheduled at `origin` on the audio clock.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalGraph {
    origin: f64,
    sample_rate: u32,
    voices: Vec<Voice>,
}

impl SignalGraph {
    pub fn new(origin: f64, sample_rate: u32) -> Self {
        Self {
            origin,
            sample_rate,
            voices: Vec::new(),
        }
    }

    pub fn add(&mut self, voice: Voice) -> &mut Self {
        self.voices.push(voice);
        self
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Seconds from the origin until the last voice stops.
    pub fn duration(&self) -> f64 {
        self.voices.iter().map(Voice::stop).fold(0.0, f64::max)
    }

    /// Absolute audio-clock time of an in-graph offset.
    pub fn absolute(&self, offset: f64) -> f64 {
        self.origin + offset
    }
}
