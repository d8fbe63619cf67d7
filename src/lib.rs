//! # Instant Film
//!
//! Turns a photo into an instant-film card: centered crop into the image
//! window, then vignette, grain, gloss and an inset shadow on a rounded
//! paper card. Also synthesizes the camera's shutter click and film-eject
//! motor.
//!
//! # Architecture: One Request, Two Artifacts
//!
//! ```text
//! SourceImage ─► resolve_crop ─► compose_card ─┬─► card    648×1032 PNG
//!                                              └─ NoiseBuffer
//!                                                   └─► compose_preview ─► preview 552×744 PNG
//! ```
//!
//! Every request allocates its own surfaces and drops them once both PNGs
//! are encoded. The grain is sampled exactly once, by the card compositor,
//! and handed to the preview compositor as a value. That makes the preview
//! the card's image window pixel for pixel (minus the shadow ring) without
//! any shared state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Crop geometry, drawing surface, paints, source decoding, effect layers |
//! | [`compose`] | Card and preview compositors and the [`compose::develop`] pipeline |
//! | [`artifact`] | Encoded PNG payloads, data-URI export |
//! | [`naming`] | `polaroid-<timestamp>.png` download names |
//! | [`audio`] | Signal graphs, offline renderer, shutter and motor sounds, output engine |
//! | [`config`] | TOML config loading, validation and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fixed Film Format
//!
//! The card is 648×1032 with a 30px corner radius and a 552×744 window:
//! Instax Mini film (54×86mm, 46×62mm window) at 12px per millimetre. These
//! are constants, not config. Everything else about the look is in
//! [`config::Config`].
//!
//! ## Relative Effect Coordinates
//!
//! Each effect layer sees only its target rectangle and builds its gradients
//! from that rectangle's origin. Running the stack at (48, 48) on the card and
//! at (0, 0) on the preview therefore produces identical values.
//!
//! ## Taint Instead of Silent Failure
//!
//! A source can be marked foreign-origin. Drawing it taints the surface and
//! any later pixel read or encode fails with an explicit error, the way a
//! browser canvas refuses `getImageData` after a cross-origin draw.
//!
//! ## Best-Effort Sound
//!
//! Sound is decoration. Without an output device (or without the `playback`
//! feature) every play call still renders its sound at the configured rate
//! but queues nothing.

pub mod artifact;
pub mod audio;
pub mod compose;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
