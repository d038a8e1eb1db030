//! Numeric domains for the convolution engines
//!
//! The engines are written once against [`SpectralDomain`], which supplies
//! the sample, spectrum and accumulator types together with the few
//! operations whose arithmetic differs between domains: windowing, forward
//! and inverse transforms, and the partition multiply-accumulate.

use crate::spectrum::bfp::{self, BlockShift};
use crate::spectrum::complex::{from_q31, q31_mul, to_q31, Complex, Q31_ONE};
use crate::spectrum::fft::{FftFloat, RealFft};
use crate::spectrum::fft32::{FixedScaling, RealFft32};
use crate::spectrum::twiddle::{FftError, TwiddleTable, TwiddleTable32};
use std::fmt::Debug;
use std::sync::Arc;

/// Twiddle tables that can be built for a given maximum length
pub trait TransformTable: Debug + Send + Sync + Sized + 'static {
    fn with_max_len(max_len: usize) -> Result<Self, FftError>;
    fn max_len(&self) -> usize;
}

impl TransformTable for TwiddleTable {
    fn with_max_len(max_len: usize) -> Result<Self, FftError> {
        TwiddleTable::new(max_len)
    }

    fn max_len(&self) -> usize {
        TwiddleTable::max_len(self)
    }
}

impl TransformTable for TwiddleTable32 {
    fn with_max_len(max_len: usize) -> Result<Self, FftError> {
        TwiddleTable32::new(max_len)
    }

    fn max_len(&self) -> usize {
        TwiddleTable32::max_len(self)
    }
}

/// Arithmetic domain of a convolution engine
pub trait SpectralDomain: Send + 'static {
    /// Time-domain sample
    type Sample: Copy + Debug + Default + PartialEq + Send + Sync + 'static;
    /// Stored spectrum bin (history and filter partitions)
    type Bin: Copy + Debug + Send + Sync + 'static;
    /// Accumulated spectrum bin
    type Accum: Copy + Debug + Send + Sync + 'static;
    /// Window and crossfade weight
    type Coeff: Copy + Debug + Send + Sync + 'static;
    type Table: TransformTable;
    type Transform: Debug + Send;

    const ZERO_BIN: Self::Bin;
    const ZERO_ACCUM: Self::Accum;

    /// Plan a real transform of `len` samples
    fn plan(table: Arc<Self::Table>, len: usize) -> Result<Self::Transform, FftError>;

    /// Transform length of a plan
    fn transform_len(transform: &Self::Transform) -> usize;

    fn sample_from_f64(value: f64) -> Self::Sample;
    fn sample_to_f64(sample: Self::Sample) -> f64;

    /// Convert a weight in [0, 1] to the domain's coefficient format
    fn coefficient(weight: f64) -> Self::Coeff;

    fn weight(sample: Self::Sample, coeff: Self::Coeff) -> Self::Sample;

    fn add(a: Self::Sample, b: Self::Sample) -> Self::Sample;

    /// `new * fade_in + old * fade_out`
    fn crossfade(
        new: Self::Sample,
        fade_in: Self::Coeff,
        old: Self::Sample,
        fade_out: Self::Coeff,
    ) -> Self::Sample;

    /// Forward transform of an input frame into a stored spectrum
    fn forward(
        transform: &Self::Transform,
        input: &[Self::Sample],
        scratch: &mut [Self::Accum],
        out: &mut [Self::Bin],
    ) -> Result<(), FftError>;

    /// Forward transform of a filter partition
    fn forward_filter(
        transform: &Self::Transform,
        input: &[Self::Sample],
        scratch: &mut [Self::Accum],
        out: &mut [Self::Bin],
    ) -> Result<(), FftError> {
        Self::forward(transform, input, scratch, out)
    }

    /// `acc += x * h` for one partition
    fn multiply_accumulate(
        acc: &mut [Self::Accum],
        x: &[Self::Bin],
        h: &[Self::Bin],
        log2_len: u32,
    );

    /// Inverse transform of an accumulated spectrum
    fn inverse(
        transform: &mut Self::Transform,
        acc: &[Self::Accum],
        out: &mut [Self::Sample],
    ) -> Result<(), FftError>;
}

/// 64-bit floating point
#[derive(Debug, Clone, Copy, Default)]
pub struct Float64;

/// 32-bit floating point
#[derive(Debug, Clone, Copy, Default)]
pub struct Float32;

/// Q1.31 fixed point with 32-bit spectra
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed32;

/// Q1.31 fixed point with 16-bit block-floating-point spectra
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFloat16;

macro_rules! float_domain {
    ($domain:ty, $t:ty) => {
        impl SpectralDomain for $domain {
            type Sample = $t;
            type Bin = Complex<$t>;
            type Accum = Complex<$t>;
            type Coeff = $t;
            type Table = TwiddleTable;
            type Transform = RealFft<$t>;

            const ZERO_BIN: Complex<$t> = Complex { re: 0.0, im: 0.0 };
            const ZERO_ACCUM: Complex<$t> = Complex { re: 0.0, im: 0.0 };

            fn plan(table: Arc<TwiddleTable>, len: usize) -> Result<RealFft<$t>, FftError> {
                RealFft::new(table, len)
            }

            fn transform_len(transform: &RealFft<$t>) -> usize {
                transform.len()
            }

            fn sample_from_f64(value: f64) -> $t {
                <$t as FftFloat>::from_f64(value)
            }

            fn sample_to_f64(sample: $t) -> f64 {
                sample.to_f64()
            }

            fn coefficient(weight: f64) -> $t {
                <$t as FftFloat>::from_f64(weight)
            }

            #[inline]
            fn weight(sample: $t, coeff: $t) -> $t {
                sample * coeff
            }

            #[inline]
            fn add(a: $t, b: $t) -> $t {
                a + b
            }

            #[inline]
            fn crossfade(new: $t, fade_in: $t, old: $t, fade_out: $t) -> $t {
                new * fade_in + old * fade_out
            }

            fn forward(
                transform: &RealFft<$t>,
                input: &[$t],
                _scratch: &mut [Complex<$t>],
                out: &mut [Complex<$t>],
            ) -> Result<(), FftError> {
                transform.forward(input, out)
            }

            fn multiply_accumulate(
                acc: &mut [Complex<$t>],
                x: &[Complex<$t>],
                h: &[Complex<$t>],
                _log2_len: u32,
            ) {
                for ((a, x), h) in acc.iter_mut().zip(x.iter()).zip(h.iter()) {
                    *a += x * h;
                }
            }

            fn inverse(
                transform: &mut RealFft<$t>,
                acc: &[Complex<$t>],
                out: &mut [$t],
            ) -> Result<(), FftError> {
                transform.inverse(acc, out)
            }
        }
    };
}

float_domain!(Float64, f64);
float_domain!(Float32, f32);

#[inline]
fn q31_weight(sample: i32, coeff: i32) -> i32 {
    q31_mul(sample, coeff)
}

#[inline]
fn q31_crossfade(new: i32, fade_in: i32, old: i32, fade_out: i32) -> i32 {
    ((new as i64 * fade_in as i64 + old as i64 * fade_out as i64) >> 31) as i32
}

fn q31_coefficient(weight: f64) -> i32 {
    (weight * Q31_ONE as f64) as i32
}

impl SpectralDomain for Fixed32 {
    type Sample = i32;
    type Bin = Complex<i32>;
    type Accum = Complex<i32>;
    type Coeff = i32;
    type Table = TwiddleTable32;
    type Transform = RealFft32;

    const ZERO_BIN: Complex<i32> = Complex { re: 0, im: 0 };
    const ZERO_ACCUM: Complex<i32> = Complex { re: 0, im: 0 };

    fn plan(table: Arc<TwiddleTable32>, len: usize) -> Result<RealFft32, FftError> {
        RealFft32::new(table, len)
    }

    fn transform_len(transform: &RealFft32) -> usize {
        transform.len()
    }

    fn sample_from_f64(value: f64) -> i32 {
        to_q31(value)
    }

    fn sample_to_f64(sample: i32) -> f64 {
        from_q31(sample)
    }

    fn coefficient(weight: f64) -> i32 {
        q31_coefficient(weight)
    }

    fn weight(sample: i32, coeff: i32) -> i32 {
        q31_weight(sample, coeff)
    }

    fn add(a: i32, b: i32) -> i32 {
        a.wrapping_add(b)
    }

    fn crossfade(new: i32, fade_in: i32, old: i32, fade_out: i32) -> i32 {
        q31_crossfade(new, fade_in, old, fade_out)
    }

    fn forward(
        transform: &RealFft32,
        input: &[i32],
        _scratch: &mut [Complex<i32>],
        out: &mut [Complex<i32>],
    ) -> Result<(), FftError> {
        transform.forward(input, out, FixedScaling::Half)
    }

    fn multiply_accumulate(
        acc: &mut [Complex<i32>],
        x: &[Complex<i32>],
        h: &[Complex<i32>],
        log2_len: u32,
    ) {
        let shift = 31 - log2_len.min(31);
        for ((a, x), h) in acc.iter_mut().zip(x.iter()).zip(h.iter()) {
            let (xr, xi) = (x.re as i64, x.im as i64);
            let (hr, hi) = (h.re as i64, h.im as i64);
            let re = (xr * hr).wrapping_sub(xi * hi) >> shift;
            let im = (xr * hi).wrapping_add(xi * hr) >> shift;
            a.re = a.re.wrapping_add(re as i32);
            a.im = a.im.wrapping_add(im as i32);
        }
    }

    fn inverse(
        transform: &mut RealFft32,
        acc: &[Complex<i32>],
        out: &mut [i32],
    ) -> Result<(), FftError> {
        transform.inverse(acc, out, FixedScaling::Full)
    }
}

impl SpectralDomain for BlockFloat16 {
    type Sample = i32;
    type Bin = Complex<i16>;
    type Accum = Complex<i32>;
    type Coeff = i32;
    type Table = TwiddleTable32;
    type Transform = RealFft32;

    const ZERO_BIN: Complex<i16> = Complex { re: 0, im: 0 };
    const ZERO_ACCUM: Complex<i32> = Complex { re: 0, im: 0 };

    fn plan(table: Arc<TwiddleTable32>, len: usize) -> Result<RealFft32, FftError> {
        RealFft32::new(table, len)
    }

    fn transform_len(transform: &RealFft32) -> usize {
        transform.len()
    }

    fn sample_from_f64(value: f64) -> i32 {
        to_q31(value)
    }

    fn sample_to_f64(sample: i32) -> f64 {
        from_q31(sample)
    }

    fn coefficient(weight: f64) -> i32 {
        q31_coefficient(weight)
    }

    fn weight(sample: i32, coeff: i32) -> i32 {
        q31_weight(sample, coeff)
    }

    fn add(a: i32, b: i32) -> i32 {
        a.wrapping_add(b)
    }

    fn crossfade(new: i32, fade_in: i32, old: i32, fade_out: i32) -> i32 {
        q31_crossfade(new, fade_in, old, fade_out)
    }

    fn forward(
        transform: &RealFft32,
        input: &[i32],
        scratch: &mut [Complex<i32>],
        out: &mut [Complex<i16>],
    ) -> Result<(), FftError> {
        transform.forward(input, scratch, FixedScaling::Half)?;
        bfp::normalize(scratch, out);
        Ok(())
    }

    fn forward_filter(
        transform: &RealFft32,
        input: &[i32],
        scratch: &mut [Complex<i32>],
        out: &mut [Complex<i16>],
    ) -> Result<(), FftError> {
        Self::forward(transform, input, scratch, out)?;
        // filter products are rescaled by the transform length on accumulation
        if let Some(dc) = out.first_mut() {
            dc.im = dc.im.wrapping_add(transform.log2_len() as i16 + 1);
        }
        Ok(())
    }

    fn multiply_accumulate(
        acc: &mut [Complex<i32>],
        x: &[Complex<i16>],
        h: &[Complex<i16>],
        _log2_len: u32,
    ) {
        let shift = BlockShift::from_exponents(bfp::exponent(x), bfp::exponent(h));
        let (Some(acc0), Some(x0), Some(h0)) = (acc.first_mut(), x.first(), h.first()) else {
            return;
        };
        // bin 0 carries the exponent in its imaginary slot
        acc0.re = acc0.re.wrapping_add(shift.apply(x0.re as i32 * h0.re as i32));

        for ((a, x), h) in acc.iter_mut().zip(x.iter()).zip(h.iter()).skip(1) {
            let (xr, xi) = (x.re as i32, x.im as i32);
            let (hr, hi) = (h.re as i32, h.im as i32);
            let re = (xr * hr).wrapping_sub(xi * hi);
            let im = (xr * hi).wrapping_add(xi * hr);
            a.re = a.re.wrapping_add(shift.apply(re));
            a.im = a.im.wrapping_add(shift.apply(im));
        }
    }

    fn inverse(
        transform: &mut RealFft32,
        acc: &[Complex<i32>],
        out: &mut [i32],
    ) -> Result<(), FftError> {
        transform.inverse(acc, out, FixedScaling::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_coefficients() {
        assert_eq!(Fixed32::coefficient(1.0), Q31_ONE);
        assert_eq!(Fixed32::coefficient(0.0), 0);
        assert_eq!(Fixed32::weight(1 << 30, Fixed32::coefficient(0.5)), (1 << 29) - 1);
        let x = Fixed32::crossfade(1 << 30, i32::MAX, -(1 << 30), 0);
        assert_eq!(x, (1 << 30) - 1);
    }

    #[test]
    fn test_fixed_mac_scaling() {
        // 0.5 * 0.25 scaled up by the transform length 4
        let mut acc = vec![Complex::new(0, 0)];
        let x = [Complex::new(1 << 30, 0)];
        let h = [Complex::new(1 << 29, 0)];
        Fixed32::multiply_accumulate(&mut acc, &x, &h, 2);
        assert_eq!(acc[0].re, 1 << 30);
        assert_eq!(acc[0].im, 0);
    }

    #[test]
    fn test_block_float_mac_matches_fixed() {
        let n = 64;
        let table = Arc::new(TwiddleTable32::new(n).unwrap());
        let transform = RealFft32::new(table, n).unwrap();
        let x: Vec<i32> = (0..n).map(|i| to_q31(0.4 * ((i as f64) * 0.3).sin())).collect();
        let h: Vec<i32> = (0..n)
            .map(|i| if i < 8 { to_q31(0.5 / (i + 1) as f64) } else { 0 })
            .collect();
        let bins = n / 2 + 1;
        let log2 = transform.log2_len();

        let mut scratch = vec![Complex::new(0, 0); bins];
        let mut xf = vec![Complex::new(0, 0); bins];
        let mut hf = vec![Complex::new(0, 0); bins];
        Fixed32::forward(&transform, &x, &mut scratch, &mut xf).unwrap();
        Fixed32::forward_filter(&transform, &h, &mut scratch, &mut hf).unwrap();
        let mut fixed = vec![Complex::new(0, 0); bins];
        Fixed32::multiply_accumulate(&mut fixed, &xf, &hf, log2);

        let mut xb = vec![Complex::new(0i16, 0); bins];
        let mut hb = vec![Complex::new(0i16, 0); bins];
        BlockFloat16::forward(&transform, &x, &mut scratch, &mut xb).unwrap();
        BlockFloat16::forward_filter(&transform, &h, &mut scratch, &mut hb).unwrap();
        let mut block = vec![Complex::new(0, 0); bins];
        BlockFloat16::multiply_accumulate(&mut block, &xb, &hb, log2);

        let peak = fixed.iter().map(|z| z.re.unsigned_abs().max(z.im.unsigned_abs())).max().unwrap() as f64;
        assert!(peak > 0.0);
        for (k, (a, b)) in fixed.iter().zip(block.iter()).enumerate().skip(1) {
            assert!(((a.re - b.re) as f64).abs() < peak * 1e-3, "bin {} re", k);
            assert!(((a.im - b.im) as f64).abs() < peak * 1e-3, "bin {} im", k);
        }
        assert!(((fixed[0].re - block[0].re) as f64).abs() < peak * 1e-3);
    }
}
