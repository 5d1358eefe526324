//! EBU R128 / ITU-R BS.1770 loudness measurement
//!
//! Computes momentary (400 ms), short-term (3 s), and gated integrated
//! loudness, loudness range (EBU Tech 3342), and optional sample-peak /
//! true-peak metering for interleaved PCM audio.
//!
//! ## Usage
//!
//! ```rust
//! use bs1770_loudness::{Mode, State};
//!
//! let mut state = State::new(2, 48_000, Mode::M | Mode::I).unwrap();
//! let frames = vec![0.0f32; 48_000 * 2]; // 1 s of silence, stereo
//! state.add_frames_f32(&frames, 48_000).unwrap();
//! let integrated = state.loudness_global().unwrap();
//! assert_eq!(integrated, bs1770_loudness::NEGATIVE_INFINITY);
//! ```
//!
//! ## Non-goals
//!
//! This crate measures loudness; it does not decode compressed audio, render
//! a meter UI, or guarantee real-time scheduling. Callers own the audio
//! source and the consumption of these numbers.

#![warn(missing_docs)]

mod block;
mod channel;
mod error;
mod filter;
mod gating;
mod history;
mod lra;
mod mode;
mod state;
mod truepeak;

pub use channel::ChannelRole;
pub use error::{Error, Result};
pub use mode::Mode;
pub use state::{loudness_global_multiple, loudness_range_multiple, State, NEGATIVE_INFINITY};
