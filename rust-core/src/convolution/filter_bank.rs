//! Partitioned filter spectra
//!
//! One spectrum per (impulse response, channel, partition). Partition `p`
//! holds samples `p*part_len..(p+1)*part_len` of the response, zero-padded
//! to the transform length.

use super::domain::SpectralDomain;
use super::impulse::ImpulseResponseSet;
use crate::spectrum::twiddle::FftError;
use ndarray::ArrayView1;

#[derive(Debug, Clone)]
pub struct FilterBank<D: SpectralDomain> {
    data: Vec<D::Bin>,
    bins: usize,
    channels: usize,
    parts: usize,
    part_len: usize,
}

impl<D: SpectralDomain> FilterBank<D> {
    /// All-zero bank
    pub fn new(num_ir: usize, channels: usize, parts: usize, part_len: usize, bins: usize) -> Self {
        Self {
            data: vec![D::ZERO_BIN; num_ir * channels * parts * bins],
            bins,
            channels,
            parts,
            part_len,
        }
    }

    /// Transform every channel of every response in `irs`
    pub fn from_set(
        irs: &ImpulseResponseSet<D::Sample>,
        parts: usize,
        part_len: usize,
        transform: &D::Transform,
    ) -> Result<Self, FftError> {
        let fft_len = D::transform_len(transform);
        let bins = fft_len / 2 + 1;
        let mut bank = Self::new(irs.num_ir(), irs.num_channels(), parts, part_len, bins);
        let mut frame = vec![D::Sample::default(); fft_len];
        let mut scratch = vec![D::ZERO_ACCUM; bins];

        for ir in 0..irs.num_ir() {
            for ch in 0..irs.num_channels() {
                bank.load(ir, ch, irs.channel(ir, ch), transform, &mut frame, &mut scratch)?;
            }
        }
        Ok(bank)
    }

    /// (Re)compute all partitions of one channel of one response
    ///
    /// Samples beyond `parts * part_len` are ignored.
    pub fn load(
        &mut self,
        ir: usize,
        ch: usize,
        samples: ArrayView1<'_, D::Sample>,
        transform: &D::Transform,
        frame: &mut [D::Sample],
        scratch: &mut [D::Accum],
    ) -> Result<(), FftError> {
        for part in 0..self.parts {
            frame.fill(D::Sample::default());
            let start = part * self.part_len;
            for (dst, &src) in frame[..self.part_len]
                .iter_mut()
                .zip(samples.iter().skip(start))
            {
                *dst = src;
            }
            let offset = self.offset(ir, ch, part);
            D::forward_filter(transform, frame, scratch, &mut self.data[offset..offset + self.bins])?;
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, ir: usize, ch: usize, part: usize) -> usize {
        ((ir * self.channels + ch) * self.parts + part) * self.bins
    }

    /// Spectrum of one partition
    #[inline]
    pub fn partition(&self, ir: usize, ch: usize, part: usize) -> &[D::Bin] {
        let offset = self.offset(ir, ch, part);
        &self.data[offset..offset + self.bins]
    }

    pub fn parts(&self) -> usize {
        self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolution::domain::Float64;
    use crate::convolution::impulse::IrLayout;
    use crate::spectrum::fft::RealFft;
    use crate::spectrum::twiddle::TwiddleTable;
    use std::sync::Arc;

    #[test]
    fn test_partitions_are_zero_padded_segments() {
        // 1 IR, 1 channel, 10 samples in partitions of 4
        let samples: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let irs = ImpulseResponseSet::from_flat(samples, 1, 10, 1, IrLayout::Interleaved).unwrap();
        let table = Arc::new(TwiddleTable::new(8).unwrap());
        let mut transform = RealFft::<f64>::new(table, 8).unwrap();
        let bank = FilterBank::<Float64>::from_set(&irs, 3, 4, &transform).unwrap();
        assert_eq!(bank.parts(), 3);

        let mut time = vec![0.0; 8];
        transform.inverse(bank.partition(0, 0, 2), &mut time).unwrap();
        let expected = [9.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for (a, b) in time.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }

        transform.inverse(bank.partition(0, 0, 1), &mut time).unwrap();
        assert!((time[0] - 5.0).abs() < 1e-12);
        assert!((time[3] - 8.0).abs() < 1e-12);
        assert!(time[4].abs() < 1e-12);
    }
}
