//! 32-bit fixed-point FFT kernel (Q1.31)
//!
//! Same structure as the float kernel. Arithmetic reproduces 32-bit
//! two's-complement behaviour exactly: wrapping adds, arithmetic right
//! shifts and 64-bit products truncated back to 32 bits.
//!
//! With [`FixedScaling::Half`] every butterfly stage halves its output, so
//! a forward real transform returns `X/n` and can never overflow. With
//! [`FixedScaling::Full`] magnitudes are preserved and the caller owns the
//! headroom. Half-scale forward followed by full-scale inverse is an
//! identity up to rounding.

use super::complex::{Complex, FixedComplex};
use super::fft::bit_reverse;
use super::twiddle::{validate_real_len, FftError, TwiddleTable32};
use std::sync::Arc;

/// Butterfly scaling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedScaling {
    /// Each stage divides by two (no overflow, one bit lost per stage)
    Half,
    /// Each stage preserves magnitude
    Full,
}

#[inline]
fn mul_hi(a: i32, b: i32) -> i64 {
    (a as i64 * b as i64) >> 32
}

#[inline]
fn half(v: Complex<i32>) -> Complex<i32> {
    Complex::new(v.re >> 1, v.im >> 1)
}

fn radix2_half(x: &mut [Complex<i32>], table: &TwiddleTable32, stride: u32) {
    bit_reverse(x);

    for pair in x.chunks_exact_mut(2) {
        let t = half(pair[1]);
        let a = half(pair[0]);
        pair[1] = a.sub_q31(t);
        pair[0] = a.add_q31(t);
    }

    let mut butterflies = 2;
    let mut groups = x.len() >> 2;
    while groups > 0 {
        let step = groups << stride;
        for group in x.chunks_exact_mut(2 * butterflies) {
            let (lo, hi) = group.split_at_mut(butterflies);
            for (k, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let w = table.twiddle(k * step);
                let t = Complex::new(
                    (mul_hi(b.re, w.re) - mul_hi(b.im, w.im)) as i32,
                    (mul_hi(b.im, w.re) + mul_hi(b.re, w.im)) as i32,
                );
                let a_half = half(*a);
                *b = a_half.sub_q31(t);
                *a = a_half.add_q31(t);
            }
        }
        butterflies <<= 1;
        groups >>= 1;
    }
}

fn radix2_full(x: &mut [Complex<i32>], table: &TwiddleTable32, stride: u32) {
    bit_reverse(x);

    for pair in x.chunks_exact_mut(2) {
        let t = pair[1];
        pair[1] = pair[0].sub_q31(t);
        pair[0] = pair[0].add_q31(t);
    }

    let mut butterflies = 2;
    let mut groups = x.len() >> 2;
    while groups > 0 {
        let step = groups << stride;
        for group in x.chunks_exact_mut(2 * butterflies) {
            let (lo, hi) = group.split_at_mut(butterflies);
            for (k, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let w = table.twiddle(k * step);
                let t = Complex::new(
                    ((mul_hi(b.re, w.re) - mul_hi(b.im, w.im)) << 1) as i32,
                    ((mul_hi(b.im, w.re) + mul_hi(b.re, w.im)) << 1) as i32,
                );
                *b = a.sub_q31(t);
                *a = a.add_q31(t);
            }
        }
        butterflies <<= 1;
        groups >>= 1;
    }
}

fn run_core(x: &mut [Complex<i32>], table: &TwiddleTable32, stride: u32, scaling: FixedScaling) {
    match scaling {
        FixedScaling::Half => radix2_half(x, table, stride),
        FixedScaling::Full => radix2_full(x, table, stride),
    }
}

#[inline]
fn mul_q31_wide(a: i32, b: i32) -> i64 {
    (a as i64 * b as i64) >> 31
}

fn check_len(expected: usize, actual: usize) -> Result<(), FftError> {
    if expected != actual {
        return Err(FftError::BufferSize { expected, actual });
    }
    Ok(())
}

/// In-place fixed-point complex FFT plan
#[derive(Debug, Clone)]
pub struct ComplexFft32 {
    len: usize,
    stride: u32,
    table: Arc<TwiddleTable32>,
}

impl ComplexFft32 {
    /// Create a plan for `len`-point complex transforms
    pub fn new(table: Arc<TwiddleTable32>, len: usize) -> Result<Self, FftError> {
        let stride = table.stride(len)?;
        Ok(Self { len, stride, table })
    }

    /// Forward transform, in place
    pub fn forward(&self, x: &mut [Complex<i32>], scaling: FixedScaling) -> Result<(), FftError> {
        check_len(self.len, x.len())?;
        run_core(x, &self.table, self.stride, scaling);
        Ok(())
    }

    /// Inverse transform (conjugate, forward core, conjugate), in place
    ///
    /// No `1/len` factor is applied beyond what `scaling` implies.
    pub fn inverse(&self, x: &mut [Complex<i32>], scaling: FixedScaling) -> Result<(), FftError> {
        check_len(self.len, x.len())?;
        x.iter_mut().for_each(|v| *v = v.conj_q31());
        run_core(x, &self.table, self.stride, scaling);
        x.iter_mut().for_each(|v| *v = v.conj_q31());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Fixed-point real-input FFT plan with a reusable work buffer
#[derive(Debug, Clone)]
pub struct RealFft32 {
    len: usize,
    core: ComplexFft32,
    scratch: Vec<Complex<i32>>,
}

impl RealFft32 {
    /// Create a plan for `len`-sample real transforms
    ///
    /// # Arguments
    /// * `table` - Shared Q1.31 twiddle table with `max_len() >= len`
    /// * `len` - Real transform length (power of two, >= 4)
    pub fn new(table: Arc<TwiddleTable32>, len: usize) -> Result<Self, FftError> {
        validate_real_len(len)?;
        if len > table.max_len() {
            return Err(FftError::UnsupportedLength {
                len,
                max_len: table.max_len(),
            });
        }
        let core = ComplexFft32::new(table, len / 2)?;
        Ok(Self {
            len,
            core,
            scratch: vec![Complex::new(0, 0); len / 2],
        })
    }

    /// Forward transform
    ///
    /// # Arguments
    /// * `input` - `len` Q1.31 samples
    /// * `spectrum` - Receives `len/2 + 1` bins; `X/len` for half scaling, `X` for full
    /// * `scaling` - Butterfly scaling mode
    pub fn forward(
        &self,
        input: &[i32],
        spectrum: &mut [Complex<i32>],
        scaling: FixedScaling,
    ) -> Result<(), FftError> {
        check_len(self.len, input.len())?;
        check_len(self.num_bins(), spectrum.len())?;

        let half_len = self.len / 2;
        let quarter = half_len / 2;
        for (bin, pair) in spectrum[..half_len].iter_mut().zip(input.chunks_exact(2)) {
            *bin = Complex::new(pair[0], pair[1]);
        }
        run_core(&mut spectrum[..half_len], &self.core.table, self.core.stride, scaling);

        let table = &self.core.table;
        let stride = self.core.stride;

        let first = spectrum[0];
        spectrum[0] = Complex::new((first.re >> 1).wrapping_add(first.im >> 1), 0);
        spectrum[half_len] = Complex::new((first.re >> 1).wrapping_sub(first.im >> 1), 0);
        let mid = spectrum[quarter];
        spectrum[quarter] = Complex::new(mid.re >> 1, mid.im.wrapping_neg() >> 1);

        for i in 1..quarter {
            let j = half_len - i;
            let (xi, xj) = (spectrum[i], spectrum[j]);
            let rs = (xi.re >> 1).wrapping_add(xj.re >> 1);
            let rd = (xj.re >> 1).wrapping_sub(xi.re >> 1);
            let is = (xi.im >> 1).wrapping_add(xj.im >> 1);
            let id = (xi.im >> 1).wrapping_sub(xj.im >> 1);

            let ci = table.cos_half(i << stride);
            let cj = table.cos_half((quarter - i) << stride);
            let rp = (mul_q31_wide(is, ci) + mul_q31_wide(rd, cj)) as i32;
            let ip = (mul_q31_wide(rd, ci) - mul_q31_wide(is, cj)) as i32;

            spectrum[i] = Complex::new((rp >> 1).wrapping_add(rs >> 1), (ip >> 1).wrapping_add(id >> 1));
            spectrum[j] = Complex::new((rs >> 1).wrapping_sub(rp >> 1), (ip >> 1).wrapping_sub(id >> 1));
        }

        if scaling == FixedScaling::Full {
            for bin in spectrum.iter_mut() {
                *bin = Complex::new(bin.re << 1, bin.im << 1);
            }
        }
        Ok(())
    }

    /// Inverse transform
    ///
    /// # Arguments
    /// * `spectrum` - `len/2 + 1` bins, left untouched
    /// * `output` - Receives `len` samples; for an unnormalized spectrum `X` this
    ///   is `x` with half scaling and `len * x` with full scaling
    /// * `scaling` - Butterfly scaling mode
    pub fn inverse(
        &mut self,
        spectrum: &[Complex<i32>],
        output: &mut [i32],
        scaling: FixedScaling,
    ) -> Result<(), FftError> {
        check_len(self.num_bins(), spectrum.len())?;
        check_len(self.len, output.len())?;

        let half_len = self.len / 2;
        let quarter = half_len / 2;
        let table = &self.core.table;
        let stride = self.core.stride;
        let x = &mut self.scratch;

        let t0 = spectrum[0].re >> 1;
        let tn = spectrum[half_len].re >> 1;
        x[0] = Complex::new(t0.wrapping_add(tn), t0.wrapping_sub(tn));
        x[quarter] = spectrum[quarter].conj_q31();

        for i in 1..quarter {
            let j = half_len - i;
            let (si, sj) = (spectrum[i], spectrum[j]);
            let rs = si.re.wrapping_add(sj.re) >> 1;
            let rd = si.re.wrapping_sub(sj.re) >> 1;
            let is = si.im.wrapping_add(sj.im) >> 1;
            let id = si.im.wrapping_sub(sj.im) >> 1;

            let ci = table.cos_half(i << stride);
            let cj = table.cos_half((quarter - i) << stride);
            let rp = (mul_q31_wide(is, ci) + mul_q31_wide(rd, cj)) as i32;
            let ip = (mul_q31_wide(rd, ci) - mul_q31_wide(is, cj)) as i32;

            x[i] = Complex::new(rp.wrapping_add(rs), ip.wrapping_sub(id));
            x[j] = Complex::new(rs.wrapping_sub(rp), ip.wrapping_add(id));
        }

        run_core(x, table, stride, scaling);

        let shift = u32::from(scaling == FixedScaling::Full);
        for (pair, v) in output.chunks_exact_mut(2).zip(x.iter()) {
            pair[0] = v.re << shift;
            pair[1] = v.im << shift;
        }
        Ok(())
    }

    /// Real transform length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of spectrum bins (`len/2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.len / 2 + 1
    }

    /// log2 of the real transform length
    pub fn log2_len(&self) -> u32 {
        self.len.trailing_zeros()
    }
}
