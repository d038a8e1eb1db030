//! Floating-point FFT kernel
//!
//! Real transforms of length `n` run on an `n/2`-point complex transform
//! followed (forward) or preceded (inverse) by a split step that separates
//! the even/odd halves with the half-angle cosine table. The complex core is
//! an in-place radix-2 decimation-in-time network: bit reversal, a first
//! stage without twiddles, then `log2(m) - 1` twiddled stages.
//!
//! Forward transforms are unnormalized; inverse transforms apply `1/n`.

use super::complex::Complex;
use super::twiddle::{validate_real_len, FftError, TwiddleTable};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

/// Sample types the float kernel runs on
pub trait FftFloat:
    Copy
    + Debug
    + Default
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
    const HALF: Self;
    const TWO: Self;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    /// `x * w` with the twiddle kept at table precision
    fn twiddle_mul(x: Complex<Self>, w: Complex<f64>) -> Complex<Self>;
}

impl FftFloat for f64 {
    const ZERO: Self = 0.0;
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn twiddle_mul(x: Complex<f64>, w: Complex<f64>) -> Complex<f64> {
        Complex::new(x.re * w.re - x.im * w.im, x.re * w.im + x.im * w.re)
    }
}

impl FftFloat for f32 {
    const ZERO: Self = 0.0;
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn twiddle_mul(x: Complex<f32>, w: Complex<f64>) -> Complex<f32> {
        let (re, im) = (x.re as f64, x.im as f64);
        Complex::new((re * w.re - im * w.im) as f32, (re * w.im + im * w.re) as f32)
    }
}

/// In-place bit-reversal permutation
pub(crate) fn bit_reverse<T>(x: &mut [T]) {
    let n = x.len();
    let mut j = 0;
    for i in 0..n.saturating_sub(1) {
        if i < j {
            x.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }
}

#[inline]
fn add<T: FftFloat>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    Complex::new(a.re + b.re, a.im + b.im)
}

#[inline]
fn sub<T: FftFloat>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    Complex::new(a.re - b.re, a.im - b.im)
}

fn radix2<T: FftFloat>(x: &mut [Complex<T>], table: &TwiddleTable, stride: u32) {
    bit_reverse(x);

    for pair in x.chunks_exact_mut(2) {
        let t = pair[1];
        pair[1] = sub(pair[0], t);
        pair[0] = add(pair[0], t);
    }

    let mut butterflies = 2;
    let mut groups = x.len() >> 2;
    while groups > 0 {
        let step = groups << stride;
        for group in x.chunks_exact_mut(2 * butterflies) {
            let (lo, hi) = group.split_at_mut(butterflies);
            for (k, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let t = T::twiddle_mul(*b, table.twiddle(k * step));
                *b = sub(*a, t);
                *a = add(*a, t);
            }
        }
        butterflies <<= 1;
        groups >>= 1;
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), FftError> {
    if expected != actual {
        return Err(FftError::BufferSize { expected, actual });
    }
    Ok(())
}

/// In-place complex FFT plan
#[derive(Debug, Clone)]
pub struct ComplexFft<T> {
    len: usize,
    stride: u32,
    table: Arc<TwiddleTable>,
    _sample: PhantomData<T>,
}

impl<T: FftFloat> ComplexFft<T> {
    /// Create a plan for `len`-point complex transforms
    ///
    /// # Arguments
    /// * `table` - Shared twiddle table
    /// * `len` - Number of complex points (power of two, at most `table.max_len() / 2`)
    pub fn new(table: Arc<TwiddleTable>, len: usize) -> Result<Self, FftError> {
        let stride = table.stride(len)?;
        Ok(Self {
            len,
            stride,
            table,
            _sample: PhantomData,
        })
    }

    /// Unnormalized forward transform, in place
    pub fn forward(&self, x: &mut [Complex<T>]) -> Result<(), FftError> {
        check_len(self.len, x.len())?;
        radix2(x, &self.table, self.stride);
        Ok(())
    }

    /// Inverse transform with `1/len` normalization, in place
    pub fn inverse(&self, x: &mut [Complex<T>]) -> Result<(), FftError> {
        check_len(self.len, x.len())?;
        x.iter_mut().for_each(|v| v.im = -v.im);
        radix2(x, &self.table, self.stride);
        let norm = T::from_f64(1.0 / self.len as f64);
        x.iter_mut().for_each(|v| *v = Complex::new(v.re * norm, -v.im * norm));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn run(&self, x: &mut [Complex<T>]) {
        radix2(x, &self.table, self.stride);
    }
}

/// Real-input FFT plan with a reusable work buffer
#[derive(Debug, Clone)]
pub struct RealFft<T> {
    len: usize,
    core: ComplexFft<T>,
    scratch: Vec<Complex<T>>,
}

impl<T: FftFloat> RealFft<T> {
    /// Create a plan for `len`-sample real transforms
    ///
    /// # Arguments
    /// * `table` - Shared twiddle table with `max_len() >= len`
    /// * `len` - Real transform length (power of two, >= 4)
    pub fn new(table: Arc<TwiddleTable>, len: usize) -> Result<Self, FftError> {
        validate_real_len(len)?;
        if len > table.max_len() {
            return Err(FftError::UnsupportedLength {
                len,
                max_len: table.max_len(),
            });
        }
        let core = ComplexFft::new(table, len / 2)?;
        Ok(Self {
            len,
            core,
            scratch: vec![Complex::new(T::ZERO, T::ZERO); len / 2],
        })
    }

    /// Forward transform
    ///
    /// # Arguments
    /// * `input` - `len` real samples
    /// * `spectrum` - Receives `len/2 + 1` bins (DC and Nyquist are purely real)
    pub fn forward(&self, input: &[T], spectrum: &mut [Complex<T>]) -> Result<(), FftError> {
        check_len(self.len, input.len())?;
        check_len(self.num_bins(), spectrum.len())?;

        let half = self.len / 2;
        for (bin, pair) in spectrum[..half].iter_mut().zip(input.chunks_exact(2)) {
            *bin = Complex::new(pair[0], pair[1]);
        }
        self.core.run(&mut spectrum[..half]);

        let table = &self.core.table;
        let stride = self.core.stride;
        let quarter = half / 2;

        let first = spectrum[0];
        spectrum[0] = Complex::new(first.re + first.im, T::ZERO);
        spectrum[half] = Complex::new(first.re - first.im, T::ZERO);
        spectrum[quarter].im = -spectrum[quarter].im;

        for i in 1..quarter {
            let j = half - i;
            let (xi, xj) = (spectrum[i], spectrum[j]);
            let rs = (xi.re + xj.re) * T::HALF;
            let rd = (xj.re - xi.re) * T::HALF;
            let is = (xi.im + xj.im) * T::HALF;
            let id = (xi.im - xj.im) * T::HALF;

            let ci = T::from_f64(table.cos_half(i << stride));
            let cj = T::from_f64(table.cos_half((quarter - i) << stride));
            let rp = is * ci + rd * cj;
            let ip = rd * ci - is * cj;

            spectrum[i] = Complex::new(rp + rs, ip + id);
            spectrum[j] = Complex::new(rs - rp, ip - id);
        }
        Ok(())
    }

    /// Inverse transform with `1/len` normalization
    ///
    /// # Arguments
    /// * `spectrum` - `len/2 + 1` bins, left untouched
    /// * `output` - Receives `len` real samples
    pub fn inverse(&mut self, spectrum: &[Complex<T>], output: &mut [T]) -> Result<(), FftError> {
        check_len(self.num_bins(), spectrum.len())?;
        check_len(self.len, output.len())?;

        let half = self.len / 2;
        let quarter = half / 2;
        let table = &self.core.table;
        let stride = self.core.stride;
        let x = &mut self.scratch;

        let (t0, tn) = (spectrum[0].re, spectrum[half].re);
        x[0] = Complex::new(t0 + tn, t0 - tn);
        x[quarter] = Complex::new(spectrum[quarter].re * T::TWO, -spectrum[quarter].im * T::TWO);

        for i in 1..quarter {
            let j = half - i;
            let (si, sj) = (spectrum[i], spectrum[j]);
            let rs = si.re + sj.re;
            let rd = si.re - sj.re;
            let is = si.im + sj.im;
            let id = si.im - sj.im;

            let ci = T::from_f64(table.cos_half(i << stride));
            let cj = T::from_f64(table.cos_half((quarter - i) << stride));
            let rp = is * ci + rd * cj;
            let ip = rd * ci - is * cj;

            x[i] = Complex::new(rp + rs, ip - id);
            x[j] = Complex::new(rs - rp, ip + id);
        }

        radix2(x, table, stride);

        let norm = T::from_f64(1.0 / self.len as f64);
        for (pair, v) in output.chunks_exact_mut(2).zip(x.iter()) {
            pair[0] = v.re * norm;
            pair[1] = v.im * norm;
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
}
