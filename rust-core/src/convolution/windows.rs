//! Analysis and crossfade windows

use std::f64::consts::PI;

/// Window shapes used by the engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    /// Periodic Hann: w[n] = 0.5 - 0.5*cos(2πn/M)
    /// Sums to exactly 1 at 50% overlap.
    Hann,

    /// Rising half cosine: w[n] = 0.5 - 0.5*cos(πn/M)
    FadeIn,

    /// Falling half cosine: w[n] = 0.5 + 0.5*cos(πn/M)
    FadeOut,
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[0..M-1]
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    let m = length as f64;
    (0..length)
        .map(|n| {
            let n = n as f64;
            match window_type {
                WindowType::Hann => 0.5 - 0.5 * (2.0 * PI * n / m).cos(),
                WindowType::FadeIn => 0.5 - 0.5 * (PI * n / m).cos(),
                WindowType::FadeOut => 0.5 + 0.5 * (PI * n / m).cos(),
            }
        })
        .collect()
}
