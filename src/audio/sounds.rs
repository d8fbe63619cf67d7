//! The two camera sounds.
//!
//! - **Shutter**: a muffled square-wave "thunk" (mirror slap), then 50ms
//!   later a high-passed noise "snap" plus a short triangle "ting".
//! - **Motor**: two seconds of band-passed noise with 100ms fades, the film
//!   being pushed out of the camera. Callers start it [`MOTOR_DELAY`] after
//!   the shutter.
//!
//! Graphs are built fresh on every call. The noise buffers come from the
//! caller's RNG so renders are reproducible under a seeded generator.

use super::graph::{Filter, FilterKind, Param, SignalGraph, Voice, Waveform};
use rand::Rng;
use std::time::Duration;

/// Offset of the shutter's second part from its first.
pub const SHUTTER_CLICK_DELAY: f64 = 0.05;
/// Length of the motor whirr.
pub const MOTOR_DURATION: f64 = 2.0;
/// How long after the shutter the motor starts.
pub const MOTOR_DELAY: Duration = Duration::from_millis(400);

const MOTOR_FADE: f64 = 0.1;

/// `len` samples of white noise, uniform in `[-1, 1)`.
pub fn white_noise<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

fn noise_seconds<R: Rng + ?Sized>(seconds: f64, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    white_noise((sample_rate as f64 * seconds).round() as usize, rng)
}

/// The shutter click scheduled at `start` on the audio clock.
pub fn shutter_graph<R: Rng + ?Sized>(start: f64, sample_rate: u32, rng: &mut R) -> SignalGraph {
    let mut graph = SignalGraph::new(start, sample_rate);

    // Part 1: mechanical thunk
    let mut freq = Param::new(120.0);
    freq.set_value_at_time(120.0, 0.0)
        .exponential_ramp_to_value_at_time(40.0, 0.08);
    let mut gain = Param::new(0.5);
    gain.set_value_at_time(0.5, 0.0)
        .exponential_ramp_to_value_at_time(0.01, 0.08);
    graph.add(
        Voice::oscillator(Waveform::Square, freq, 0.0, 0.1)
            .through(Filter::new(FilterKind::Lowpass, 300.0))
            .with_gain(gain),
    );

    let t2 = SHUTTER_CLICK_DELAY;

    // Part 2a: snap
    let mut gain = Param::new(0.7);
    gain.set_value_at_time(0.7, t2)
        .exponential_ramp_to_value_at_time(0.01, t2 + 0.06);
    graph.add(
        Voice::buffer(noise_seconds(0.1, sample_rate, rng), sample_rate, t2)
            .through(Filter::new(FilterKind::Highpass, 2_000.0))
            .with_gain(gain),
    );

    // Part 2b: metallic ting
    let mut freq = Param::new(2_500.0);
    freq.set_value_at_time(2_500.0, t2)
        .exponential_ramp_to_value_at_time(1_000.0, t2 + 0.04);
    let mut gain = Param::new(0.2);
    gain.set_value_at_time(0.2, t2)
        .exponential_ramp_to_value_at_time(0.01, t2 + 0.04);
    graph.add(Voice::oscillator(Waveform::Triangle, freq, t2, t2 + 0.1).with_gain(gain));

    graph
}

/// The film-eject motor scheduled at `start` on the audio clock.
pub fn motor_graph<R: Rng + ?Sized>(start: f64, sample_rate: u32, rng: &mut R) -> SignalGraph {
    let mut graph = SignalGraph::new(start, sample_rate);

    let mut gain = Param::new(0.0);
    gain.set_value_at_time(0.0, 0.0)
        .linear_ramp_to_value_at_time(0.1, MOTOR_FADE)
        .linear_ramp_to_value_at_time(0.1, MOTOR_DURATION - MOTOR_FADE)
        .linear_ramp_to_value_at_time(0.0, MOTOR_DURATION);

    let mut filter = Filter::new(FilterKind::Bandpass, 500.0).with_q(2.0);
    filter.frequency.set_value_at_time(500.0, 0.0);

    graph.add(
        Voice::buffer(
            noise_seconds(MOTOR_DURATION, sample_rate, rng),
            sample_rate,
            0.0,
        )
        .through(filter)
        .with_gain(gain),
    );
    graph
}
