//! Convolution engine errors

use crate::spectrum::twiddle::FftError;
use thiserror::Error;

/// Errors raised by the convolution engines
///
/// Construction errors leave no engine behind. Per-call errors are returned
/// before any engine state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvolutionError {
    #[error("Impulse response buffer holds {actual} samples, expected {expected} (IRs x length x channels)")]
    ImpulseResponseSize { expected: usize, actual: usize },

    #[error("Impulse response set is empty")]
    EmptyImpulseResponse,

    #[error("Block length {0} is not a power of two >= 2")]
    InvalidBlockLength(usize),

    #[error("Channel count must be at least 1")]
    InvalidChannelCount,

    #[error("Process channel {channel} out of range for {num_channels} channels")]
    InvalidProcessChannel { channel: usize, num_channels: usize },

    #[error("Impulse response index {index} out of range ({available} available)")]
    IrIndexOutOfRange { index: usize, available: usize },

    #[error("Block holds {actual} samples, expected {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("Impulse response has {actual} samples, expected {expected}")]
    ImpulseResponseLength { expected: usize, actual: usize },

    #[error("Expected a single impulse response, got {0}")]
    UnexpectedIrCount(usize),

    #[error("Switch queue capacity must be at least 1")]
    InvalidQueueCapacity,

    #[error("Switch queue full, dropped request for impulse response {0}")]
    SwitchQueueFull(usize),

    #[error("Transform error: {0}")]
    Fft(#[from] FftError),
}
