//! Twiddle-factor and half-angle cosine tables
//!
//! A table is built once for a maximum real transform length and is
//! immutable afterwards. Transform plans hold it behind an `Arc`, so any
//! number of plans on any number of threads can share one table.
//!
//! For a maximum real length `N` the table base length is `half = N/2`
//! (the complex transform that carries the real one). It stores `half/2`
//! twiddles `exp(-j2πk/half)` and `half/2` half-angle cosines `cos(πk/half)`.
//! Shorter transforms step through it with a power-of-two stride.

use super::complex::{to_q31, Complex};
use std::f64::consts::PI;
use thiserror::Error;

/// Transform kernel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FftError {
    #[error("Transform length {0} is not a power of two >= 4")]
    InvalidLength(usize),

    #[error("Transform length {len} exceeds table capacity {max_len}")]
    UnsupportedLength { len: usize, max_len: usize },

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Malformed twiddle table: {0}")]
    InvalidTable(&'static str),
}

/// Check that `len` is a usable real transform length
pub(crate) fn validate_real_len(len: usize) -> Result<(), FftError> {
    if len < 4 || !len.is_power_of_two() {
        return Err(FftError::InvalidLength(len));
    }
    Ok(())
}

/// Stride that maps a complex length `m` onto a table of base length `half`
fn stride_for(half: usize, m: usize) -> Result<u32, FftError> {
    if m < 2 || !m.is_power_of_two() {
        return Err(FftError::InvalidLength(m));
    }
    if m > half {
        return Err(FftError::UnsupportedLength { len: m, max_len: half });
    }
    Ok((half / m).trailing_zeros())
}

/// Float twiddle table shared by the `f32` and `f64` kernels
#[derive(Debug, Clone)]
pub struct TwiddleTable {
    half: usize,
    twiddles: Vec<Complex<f64>>,
    cos_half: Vec<f64>,
}

impl TwiddleTable {
    /// Build a table for real transforms up to `max_len` samples
    ///
    /// # Arguments
    /// * `max_len` - Largest real transform length (power of two, >= 4)
    pub fn new(max_len: usize) -> Result<Self, FftError> {
        validate_real_len(max_len)?;
        let half = max_len / 2;
        let twiddles = (0..half / 2)
            .map(|k| {
                let phase = 2.0 * PI * k as f64 / half as f64;
                Complex::new(phase.cos(), -phase.sin())
            })
            .collect();
        let cos_half = (0..half / 2)
            .map(|k| (PI * k as f64 / half as f64).cos())
            .collect();

        log::debug!("built float twiddle table for transforms up to {max_len}");
        Ok(Self { half, twiddles, cos_half })
    }

    /// Largest supported real transform length
    pub fn max_len(&self) -> usize {
        self.half * 2
    }

    pub(crate) fn stride(&self, complex_len: usize) -> Result<u32, FftError> {
        stride_for(self.half, complex_len)
    }

    #[inline]
    pub(crate) fn twiddle(&self, index: usize) -> Complex<f64> {
        self.twiddles[index]
    }

    #[inline]
    pub(crate) fn cos_half(&self, index: usize) -> f64 {
        self.cos_half[index]
    }
}

/// Q1.31 twiddle table for the fixed-point kernel
#[derive(Debug, Clone)]
pub struct TwiddleTable32 {
    half: usize,
    twiddles: Vec<Complex<i32>>,
    cos_half: Vec<i32>,
}

impl TwiddleTable32 {
    /// Build a table for real transforms up to `max_len` samples
    pub fn new(max_len: usize) -> Result<Self, FftError> {
        let float = TwiddleTable::new(max_len)?;
        Ok(Self {
            half: float.half,
            twiddles: float
                .twiddles
                .iter()
                .map(|w| Complex::new(to_q31(w.re), to_q31(w.im)))
                .collect(),
            cos_half: float.cos_half.iter().map(|&c| to_q31(c)).collect(),
        })
    }

    /// Load a precomputed flat table
    ///
    /// Layout: `[half, re0, im0, re1, im1, ..., cos0, cos1, ...]` with
    /// `half/2` twiddle pairs and `half/2` cosines, `3*max_len/4 + 1` words.
    pub fn from_raw(raw: &[i32]) -> Result<Self, FftError> {
        let (&header, body) = raw
            .split_first()
            .ok_or(FftError::InvalidTable("empty table"))?;
        let half = usize::try_from(header)
            .map_err(|_| FftError::InvalidTable("negative base length"))?;
        validate_real_len(half * 2).map_err(|_| FftError::InvalidTable("base length is not a power of two"))?;
        if body.len() != half + half / 2 {
            return Err(FftError::InvalidTable("length does not match base length"));
        }

        let (pairs, cos_half) = body.split_at(half);
        let twiddles = pairs
            .chunks_exact(2)
            .map(|pair| Complex::new(pair[0], pair[1]))
            .collect();

        log::debug!("loaded fixed-point twiddle table for transforms up to {}", half * 2);
        Ok(Self {
            half,
            twiddles,
            cos_half: cos_half.to_vec(),
        })
    }

    /// Flatten into the layout accepted by [`TwiddleTable32::from_raw`]
    pub fn to_raw(&self) -> Vec<i32> {
        let mut raw = Vec::with_capacity(1 + self.half + self.half / 2);
        raw.push(self.half as i32);
        for w in &self.twiddles {
            raw.push(w.re);
            raw.push(w.im);
        }
        raw.extend_from_slice(&self.cos_half);
        raw
    }

    /// Largest supported real transform length
    pub fn max_len(&self) -> usize {
        self.half * 2
    }

    pub(crate) fn stride(&self, complex_len: usize) -> Result<u32, FftError> {
        stride_for(self.half, complex_len)
    }

    #[inline]
    pub(crate) fn twiddle(&self, index: usize) -> Complex<i32> {
        self.twiddles[index]
    }

    #[inline]
    pub(crate) fn cos_half(&self, index: usize) -> i32 {
        self.cos_half[index]
    }
}
