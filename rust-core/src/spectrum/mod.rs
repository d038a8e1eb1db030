//! Spectral transform kernel
//!
//! Real and complex radix-2 FFTs in floating point (`f32`, `f64`) and
//! Q1.31 fixed point, the shared twiddle tables, and the
//! block-floating-point spectrum encoding used by the fixed-point engines.

pub mod analysis;
pub mod bfp;
pub mod complex;
pub mod fft;
pub mod fft32;
pub mod twiddle;

pub use complex::{Complex, FixedComplex};
pub use fft::{ComplexFft, FftFloat, RealFft};
pub use fft32::{ComplexFft32, FixedScaling, RealFft32};
pub use twiddle::{FftError, TwiddleTable, TwiddleTable32};
