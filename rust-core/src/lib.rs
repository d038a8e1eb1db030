//! Time-variant partitioned convolution
//!
//! Uniformly partitioned frequency-domain convolution engines that switch
//! between impulse responses at block boundaries, built on a real FFT kernel
//! available in floating point, Q1.31 fixed point and 16-bit block floating
//! point.

pub mod control;
pub mod convolution;
pub mod processor;
pub mod spectrum;

pub use control::{IrSwitchQueue, IrSwitchReceiver, IrSwitchSender};
pub use convolution::{
    BlockFloat16, ConvolutionError, Fixed32, Float32, Float64, ImpulseResponseSet, IrLayout, OverlapMode, PartConv,
    PartConvConfig, SpectralDomain, Tvolap, TvolapConfig, Wolap,
};
pub use processor::{BlockConvolver, RealtimeConvolver};
pub use spectrum::{FftError, FixedScaling, RealFft, RealFft32, TwiddleTable, TwiddleTable32};
