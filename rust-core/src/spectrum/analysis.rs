//! Spectrum inspection helpers
//!
//! Power, power in dB and phase of half spectra produced by the kernels.

use super::complex::Complex;
use super::fft::FftFloat;

/// Power floor used by [`power_spectrum_db`] (-400 dB)
pub const POWER_FLOOR: f64 = 1e-40;

/// Power spectrum |X[k]|²
///
/// # Arguments
/// * `spectrum` - Half spectrum (`n/2 + 1` bins)
/// * `out` - Receives one value per bin; extra slots are left untouched
pub fn power_spectrum<T: FftFloat>(spectrum: &[Complex<T>], out: &mut [f64]) {
    for (dst, z) in out.iter_mut().zip(spectrum.iter()) {
        let (re, im) = (z.re.to_f64(), z.im.to_f64());
        *dst = re * re + im * im;
    }
}

/// Power spectrum in dB: 10*log10(|X[k]|²), floored at [`POWER_FLOOR`]
pub fn power_spectrum_db<T: FftFloat>(spectrum: &[Complex<T>], out: &mut [f64]) {
    power_spectrum(spectrum, out);
    for p in out.iter_mut().take(spectrum.len()) {
        *p = 10.0 * p.max(POWER_FLOOR).log10();
    }
}

/// Phase spectrum in radians, in (-π, π]
pub fn phase_spectrum<T: FftFloat>(spectrum: &[Complex<T>], out: &mut [f64]) {
    for (dst, z) in out.iter_mut().zip(spectrum.iter()) {
        *dst = z.im.to_f64().atan2(z.re.to_f64());
    }
}

/// Convert bin index to normalized frequency (units of π rad/sample)
pub fn bin_to_frequency(bin: usize, fft_len: usize) -> f64 {
    2.0 * bin as f64 / fft_len as f64
}
