//! Block-floating-point spectrum encoding
//!
//! A Q1.31 spectrum is shifted left until its largest component reaches
//! `[0.25, 0.5)` of full scale, rounded to 16-bit mantissas, and the shift is
//! stored negated in the imaginary part of bin 0. A real-input spectrum has
//! no imaginary DC component, so the slot is free.

use super::complex::Complex;

const NORMALIZED_FLOOR: u32 = 0x2000_0000;

/// Shift applied to a block-floating-point product before accumulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShift {
    Left(u32),
    Right(u32),
}

impl BlockShift {
    /// Combine the stored exponents of two spectra, clamped to 0..=31 bits
    pub fn from_exponents(a: i16, b: i16) -> Self {
        let exponent = a as i32 + b as i32;
        if exponent <= 0 {
            BlockShift::Right(exponent.unsigned_abs().min(31))
        } else {
            BlockShift::Left((exponent as u32).min(31))
        }
    }

    #[inline]
    pub fn apply(self, value: i32) -> i32 {
        match self {
            BlockShift::Left(bits) => value << bits,
            BlockShift::Right(bits) => value >> bits,
        }
    }
}

/// Normalize `spectrum` into 16-bit mantissas
///
/// # Arguments
/// * `spectrum` - Q1.31 spectrum from a real forward transform
/// * `out` - Receives the mantissas; `out[0].im` holds the negated shift
///
/// # Returns
/// The left shift that was applied (32 for an all-zero spectrum)
pub fn normalize(spectrum: &[Complex<i32>], out: &mut [Complex<i16>]) -> u32 {
    let mut peak = spectrum
        .iter()
        .map(|z| z.re.unsigned_abs().max(z.im.unsigned_abs()))
        .max()
        .unwrap_or(0);

    let mut shift = 0;
    while shift < 32 && peak < NORMALIZED_FLOOR {
        peak <<= 1;
        shift += 1;
    }

    let narrow = |v: i32| -> i16 {
        let scaled = v.checked_shl(shift).unwrap_or(0);
        (scaled.wrapping_add(0x8000) >> 16) as i16
    };
    for (dst, src) in out.iter_mut().zip(spectrum.iter()) {
        *dst = Complex::new(narrow(src.re), narrow(src.im));
    }
    if let Some(dc) = out.first_mut() {
        dc.im = -(shift as i16);
    }
    shift
}

/// Stored exponent of a normalized spectrum
#[inline]
pub fn exponent(spectrum: &[Complex<i16>]) -> i16 {
    spectrum.first().map_or(0, |dc| dc.im)
}
