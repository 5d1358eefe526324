//! Error types for the loudness measurement engine

use thiserror::Error;

use crate::mode::Mode;

/// Loudness engine error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required allocation failed while growing internal buffers.
    ///
    /// Ingestion failures of this kind leave the existing block history intact;
    /// a failure from [`crate::State::change_parameters`] leaves the state
    /// unusable and it should be dropped.
    #[error("out of memory while allocating {context}")]
    OutOfMemory {
        /// What the engine was trying to allocate when it failed.
        context: &'static str,
    },

    /// A query was issued for a measurement that was not enabled in the mode
    /// flags passed to [`crate::State::new`].
    #[error("mode {required:?} is not enabled (state was built with {actual:?})")]
    InvalidMode {
        /// The mode flag(s) the query required.
        required: Mode,
        /// The mode flags the state actually has.
        actual: Mode,
    },

    /// A channel index was out of range for the state's channel count.
    #[error("channel index {index} is out of range for {channels} channel(s)")]
    InvalidChannelIndex {
        /// The offending index.
        index: u32,
        /// The channel count of the state.
        channels: u32,
    },

    /// `change_parameters` was called with the same channel count and sample
    /// rate already in effect; the state was left untouched.
    #[error("channels and sample rate unchanged")]
    NoChange,

    /// An `add_frames_*` call supplied fewer interleaved samples than
    /// `frames * channels` requires.
    #[error("buffer too short: expected at least {expected} samples, got {got}")]
    BufferSizeMismatch {
        /// `frames * channels`, the minimum number of samples required.
        expected: usize,
        /// The number of samples actually supplied.
        got: usize,
    },

    /// Pooling multiple states for a multi-instance query failed because the
    /// states do not agree on block-storage strategy (list vs. histogram).
    #[error("cannot pool states using different block-storage modes")]
    IncompatibleStorageMode,
}

/// Result type for loudness engine operations.
pub type Result<T> = core::result::Result<T, Error>;
