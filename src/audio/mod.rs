//! Synthesized camera sounds.
//!
//! | Piece | Module |
//! |---|---|
//! | **Graph model** | [`graph`]: oscillators, noise buffers, biquads, automated params |
//! | **Rendering** | [`render()`]: graph → mono f32 samples |
//! | **Sounds** | [`shutter_graph`], [`motor_graph`] |
//! | **Output** | [`AudioEngine`]: shared, lazily created, silent when unavailable |
//!
//! The sounds never touch image data and share no state with compositing.
//! Device playback needs the `playback` cargo feature; without it every
//! play call renders the sound but queues nothing.

#[cfg(feature = "playback")]
mod device;
mod engine;
pub mod graph;
pub mod render;
mod sounds;

pub use engine::{
    AudioEngine, AudioError, AudioOutput, DEFAULT_SAMPLE_RATE, NullOutput, OutputState,
    Playback, play_motor, play_shutter,
};
pub use graph::SignalGraph;
pub use render::{RenderedAudio, render};
pub use sounds::{
    MOTOR_DELAY, MOTOR_DURATION, SHUTTER_CLICK_DELAY, motor_graph, shutter_graph, white_noise,
};
