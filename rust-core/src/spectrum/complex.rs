//! Complex sample arithmetic for the three numeric domains
//!
//! Floating-point spectra use `num_complex::Complex<f32>` / `Complex<f64>`
//! directly (add, sub, mul, div, conj, norm, sqrt all come from num-complex).
//! Fixed-point spectra are `Complex<i32>` in Q1.31; their arithmetic wraps on
//! overflow like 32-bit two's-complement integers and uses 64-bit products.

pub use num_complex::{Complex, Complex32, Complex64};

/// Largest Q1.31 value, just below +1.0
pub const Q31_ONE: i32 = i32::MAX;

const Q31_SCALE: f64 = 2_147_483_648.0;

/// Convert a float in [-1, 1) to Q1.31, rounding to nearest and saturating
pub fn to_q31(value: f64) -> i32 {
    let scaled = (value * Q31_SCALE).round();
    if scaled >= i32::MAX as f64 {
        i32::MAX
    } else if scaled <= i32::MIN as f64 {
        i32::MIN
    } else {
        scaled as i32
    }
}

/// Convert a Q1.31 value back to float
pub fn from_q31(value: i32) -> f64 {
    value as f64 / Q31_SCALE
}

/// Q1.31 product, truncated toward negative infinity
#[inline]
pub fn q31_mul(a: i32, b: i32) -> i32 {
    ((a as i64 * b as i64) >> 31) as i32
}

/// Q1.31 arithmetic on `Complex<i32>`
pub trait FixedComplex: Sized {
    fn add_q31(self, other: Self) -> Self;
    fn sub_q31(self, other: Self) -> Self;
    fn neg_q31(self) -> Self;
    fn conj_q31(self) -> Self;
    fn mul_q31(self, other: Self) -> Self;
    /// Multiply both parts by a real Q1.31 factor
    fn scale_q31(self, factor: i32) -> Self;
    /// |z|² in Q1.31 (saturating)
    fn norm_sqr_q31(self) -> i32;
    /// |z| in Q1.31 (saturating)
    fn abs_q31(self) -> i32;
    /// Complex division, `None` for a zero divisor. Saturates on overflow.
    fn div_q31(self, other: Self) -> Option<Self>;
    /// Principal square root
    fn sqrt_q31(self) -> Self;
}

impl FixedComplex for Complex<i32> {
    #[inline]
    fn add_q31(self, other: Self) -> Self {
        Complex::new(self.re.wrapping_add(other.re), self.im.wrapping_add(other.im))
    }

    #[inline]
    fn sub_q31(self, other: Self) -> Self {
        Complex::new(self.re.wrapping_sub(other.re), self.im.wrapping_sub(other.im))
    }

    #[inline]
    fn neg_q31(self) -> Self {
        Complex::new(self.re.wrapping_neg(), self.im.wrapping_neg())
    }

    #[inline]
    fn conj_q31(self) -> Self {
        Complex::new(self.re, self.im.wrapping_neg())
    }

    #[inline]
    fn mul_q31(self, other: Self) -> Self {
        let (ar, ai) = (self.re as i64, self.im as i64);
        let (br, bi) = (other.re as i64, other.im as i64);
        Complex::new(
            ((ar * br).wrapping_sub(ai * bi) >> 31) as i32,
            ((ar * bi).wrapping_add(ai * br) >> 31) as i32,
        )
    }

    #[inline]
    fn scale_q31(self, factor: i32) -> Self {
        Complex::new(q31_mul(self.re, factor), q31_mul(self.im, factor))
    }

    fn norm_sqr_q31(self) -> i32 {
        let sum = squared_magnitude(self) >> 31;
        sum.min(i32::MAX as u64) as i32
    }

    fn abs_q31(self) -> i32 {
        isqrt(squared_magnitude(self)).min(i32::MAX as u64) as i32
    }

    fn div_q31(self, other: Self) -> Option<Self> {
        let den = other.re as i128 * other.re as i128 + other.im as i128 * other.im as i128;
        if den == 0 {
            return None;
        }
        let re = self.re as i128 * other.re as i128 + self.im as i128 * other.im as i128;
        let im = self.im as i128 * other.re as i128 - self.re as i128 * other.im as i128;
        Some(Complex::new(saturate((re << 31) / den), saturate((im << 31) / den)))
    }

    fn sqrt_q31(self) -> Self {
        let root = Complex64::new(from_q31(self.re), from_q31(self.im)).sqrt();
        Complex::new(to_q31(root.re), to_q31(root.im))
    }
}

fn squared_magnitude(z: Complex<i32>) -> u64 {
    let re = z.re.unsigned_abs() as u64;
    let im = z.im.unsigned_abs() as u64;
    re * re + im * im
}

fn saturate(v: i128) -> i32 {
    v.clamp(i32::MIN as i128, i32::MAX as i128) as i32
}

/// Integer square root (floor)
fn isqrt(v: u64) -> u64 {
    if v < 2 {
        return v;
    }
    let mut x = (v as f64).sqrt() as u64;
    // float estimate can be off by one either way for large inputs
    while x.checked_mul(x).map_or(true, |sq| sq > v) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= v) {
        x += 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q31_conversion() {
        assert_eq!(to_q31(0.5), 1 << 30);
        assert_eq!(to_q31(-1.0), i32::MIN);
        assert_eq!(to_q31(1.0), i32::MAX);
        assert_eq!(to_q31(-2.0), i32::MIN);
        assert!((from_q31(to_q31(0.123456)) - 0.123456).abs() < 1e-9);
    }

    #[test]
    fn test_q31_mul() {
        let half = to_q31(0.5);
        assert_eq!(q31_mul(half, half), to_q31(0.25));
        assert_eq!(q31_mul(-half, half), to_q31(-0.25));
    }

    #[test]
    fn test_complex_mul_matches_float() {
        let a = Complex::new(to_q31(0.3), to_q31(-0.4));
        let b = Complex::new(to_q31(0.5), to_q31(0.25));
        let p = a.mul_q31(b);
        let expected = Complex64::new(0.3, -0.4) * Complex64::new(0.5, 0.25);
        assert!((from_q31(p.re) - expected.re).abs() < 1e-8);
        assert!((from_q31(p.im) - expected.im).abs() < 1e-8);
    }

    #[test]
    fn test_add_wraps() {
        let a = Complex::new(i32::MAX, 0);
        let b = Complex::new(1, 0);
        assert_eq!(a.add_q31(b).re, i32::MIN);
        assert_eq!(Complex::new(i32::MIN, 5).neg_q31(), Complex::new(i32::MIN, -5));
        assert_eq!(Complex::new(3, 5).conj_q31(), Complex::new(3, -5));
        assert_eq!(Complex::new(3, 5).sub_q31(Complex::new(1, 1)), Complex::new(2, 4));
    }

    #[test]
    fn test_abs_and_norm() {
        let z = Complex::new(to_q31(0.3), to_q31(0.4));
        assert!((from_q31(z.abs_q31()) - 0.5).abs() < 1e-9);
        assert!((from_q31(z.norm_sqr_q31()) - 0.25).abs() < 1e-9);
        assert_eq!(Complex::new(i32::MIN, i32::MIN).abs_q31(), i32::MAX);
    }

    #[test]
    fn test_div() {
        let a = Complex::new(to_q31(0.1), to_q31(0.2));
        let b = Complex::new(to_q31(0.5), to_q31(-0.5));
        let q = a.div_q31(b).expect("nonzero divisor");
        let expected = Complex64::new(0.1, 0.2) / Complex64::new(0.5, -0.5);
        assert!((from_q31(q.re) - expected.re).abs() < 1e-8);
        assert!((from_q31(q.im) - expected.im).abs() < 1e-8);
        assert!(a.div_q31(Complex::new(0, 0)).is_none());
    }

    #[test]
    fn test_sqrt() {
        let z = Complex::new(to_q31(-0.25), 0);
        let r = z.sqrt_q31();
        assert_eq!(r.re, 0);
        assert!((from_q31(r.im) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX), u32::MAX as u64);
    }
}
