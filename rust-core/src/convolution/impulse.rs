//! Impulse-response sets
//!
//! Holds `numIR x numChans` sample sequences of equal length as an
//! `ndarray::Array3` indexed `[ir, channel, t]`, whatever the layout of the
//! flat buffer it was loaded from.

use super::error::ConvolutionError;
use ndarray::{s, Array3, ArrayView1};

/// Ordering of a flat impulse-response buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrLayout {
    /// `(ir * len + t) * num_chans + ch`: channels interleaved per time step
    #[default]
    Interleaved,
    /// `(ir * num_chans + ch) * len + t`: one contiguous run per channel
    Planar,
}

/// A set of multichannel impulse responses
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponseSet<S> {
    data: Array3<S>,
}

impl<S: Copy> ImpulseResponseSet<S> {
    /// Load from a flat buffer
    ///
    /// # Arguments
    /// * `samples` - Flat sample buffer of exactly `num_ir * len * num_chans` samples
    /// * `num_ir` - Number of impulse responses
    /// * `len` - Samples per channel
    /// * `num_chans` - Channels per impulse response
    /// * `layout` - Ordering of `samples`
    pub fn from_flat(
        samples: Vec<S>,
        num_ir: usize,
        len: usize,
        num_chans: usize,
        layout: IrLayout,
    ) -> Result<Self, ConvolutionError> {
        let expected = num_ir
            .checked_mul(len)
            .and_then(|n| n.checked_mul(num_chans))
            .ok_or(ConvolutionError::ImpulseResponseSize {
                expected: usize::MAX,
                actual: samples.len(),
            })?;
        if samples.len() != expected {
            return Err(ConvolutionError::ImpulseResponseSize {
                expected,
                actual: samples.len(),
            });
        }
        if expected == 0 {
            return Err(ConvolutionError::EmptyImpulseResponse);
        }

        let size_error = |_| ConvolutionError::ImpulseResponseSize {
            expected,
            actual: expected,
        };
        let data = match layout {
            IrLayout::Planar => Array3::from_shape_vec((num_ir, num_chans, len), samples).map_err(size_error)?,
            IrLayout::Interleaved => Array3::from_shape_vec((num_ir, len, num_chans), samples)
                .map_err(size_error)?
                .permuted_axes([0, 2, 1]),
        };
        Ok(Self { data })
    }

    /// Build from an array indexed `[ir, channel, t]`
    pub fn from_array(data: Array3<S>) -> Result<Self, ConvolutionError> {
        if data.is_empty() {
            return Err(ConvolutionError::EmptyImpulseResponse);
        }
        Ok(Self { data })
    }

    /// Samples of one channel of one impulse response
    pub fn channel(&self, ir: usize, ch: usize) -> ArrayView1<'_, S> {
        self.data.slice(s![ir, ch, ..])
    }

    pub fn num_ir(&self) -> usize {
        self.data.dim().0
    }

    pub fn num_channels(&self) -> usize {
        self.data.dim().1
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.data.dim().2
    }

    pub fn as_array(&self) -> &Array3<S> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_interleaved_layout() {
        // 2 IRs, 3 samples, 2 channels; value = 100*ir + 10*t + ch
        let mut flat = Vec::new();
        for ir in 0..2 {
            for t in 0..3 {
                for ch in 0..2 {
                    flat.push(100 * ir + 10 * t + ch);
                }
            }
        }
        let set = ImpulseResponseSet::from_flat(flat, 2, 3, 2, IrLayout::Interleaved).unwrap();
        assert_eq!(set.num_ir(), 2);
        assert_eq!(set.num_channels(), 2);
        assert_eq!(set.len(), 3);
        assert_eq!(set.channel(1, 1).to_vec(), vec![101, 111, 121]);
        assert_eq!(set.channel(0, 0).to_vec(), vec![0, 10, 20]);
    }

    #[test]
    fn test_planar_layout() {
        let flat: Vec<i32> = (0..12).collect();
        let set = ImpulseResponseSet::from_flat(flat, 2, 3, 2, IrLayout::Planar).unwrap();
        assert_eq!(set.channel(0, 1).to_vec(), vec![3, 4, 5]);
        assert_eq!(set.channel(1, 0).to_vec(), vec![6, 7, 8]);
    }

    #[test]
    fn test_size_validation() {
        for _ in 0..3 {
            let err = ImpulseResponseSet::from_flat(vec![0.0; 11], 2, 3, 2, IrLayout::Interleaved).unwrap_err();
            assert_eq!(err, ConvolutionError::ImpulseResponseSize { expected: 12, actual: 11 });
        }
        assert_eq!(
            ImpulseResponseSet::<f64>::from_flat(vec![], 1, 0, 2, IrLayout::Planar).unwrap_err(),
            ConvolutionError::EmptyImpulseResponse
        );
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let err = ImpulseResponseSet::from_flat(vec![0.0; 4], usize::MAX / 2, 3, 2, IrLayout::Interleaved).unwrap_err();
        assert_eq!(err, ConvolutionError::ImpulseResponseSize { expected: usize::MAX, actual: 4 });
        assert!(ImpulseResponseSet::from_flat(vec![0.0; 4], 2, usize::MAX, 2, IrLayout::Planar).is_err());
    }

    #[test]
    fn test_from_array() {
        let data = Array::from_shape_fn((1, 2, 4), |(_, ch, t)| (ch * 4 + t) as f64);
        let set = ImpulseResponseSet::from_array(data).unwrap();
        assert_eq!(set.channel(0, 1)[3], 7.0);
        assert!(ImpulseResponseSet::from_array(Array3::<f64>::zeros((0, 2, 4))).is_err());
    }
}
