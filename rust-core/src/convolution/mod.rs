//! Partitioned frequency-domain convolution engines

pub mod domain;
pub mod error;
pub mod filter_bank;
pub mod impulse;
pub mod part_conv;
pub mod ring;
pub mod tvolap;
pub mod windows;

pub use domain::{BlockFloat16, Fixed32, Float32, Float64, SpectralDomain, TransformTable};
pub use error::ConvolutionError;
pub use impulse::{ImpulseResponseSet, IrLayout};
pub use part_conv::{OverlapMode, PartConv, PartConvConfig};
pub use tvolap::{Tvolap, TvolapConfig, Wolap};
