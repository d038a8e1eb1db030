//! Single-channel uniformly partitioned convolution with crossfade
//!
//! Processes one channel of an interleaved buffer with partitions of
//! `block_len` samples and transforms of `2*block_len`. Past input spectra
//! live in [`PartitionSlots`], aged by rotating the slot table once per
//! block.
//!
//! When the requested response changes and crossfading is enabled, the block
//! is convolved with both the old and the new response and the two outputs
//! are blended with `0.5 -/+ 0.5*cos(πi/block_len)` ramps. In overlap-add
//! mode the new-response tail carried into the block is first recomputed
//! from the previous input, and the old-response branch re-adds the old
//! tail, so each branch is a complete output of its own response.

use super::domain::{SpectralDomain, TransformTable};
use super::error::ConvolutionError;
use super::filter_bank::FilterBank;
use super::ring::PartitionSlots;
use super::tvolap::validate_block_len;
use super::windows::{generate_window, WindowType};
use ndarray::ArrayView1;
use std::sync::Arc;

/// Block framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapMode {
    /// Two-block input frame, keep the second half of each result
    #[default]
    Save,
    /// Zero-padded one-block frame, add the previous tail
    Add,
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartConvConfig {
    /// Samples per call and partition length (power of two, >= 2)
    pub block_len: usize,

    /// Samples per impulse response
    pub imp_res_len: usize,

    /// Number of impulse-response slots
    pub max_num_imp_res: usize,

    /// Interleaved channels in the I/O buffer
    pub num_channels: usize,

    /// Channel convolved by this instance
    pub process_channel: usize,

    pub mode: OverlapMode,

    /// Blend old and new response outputs over one block on a switch
    pub crossfade: bool,
}

impl Default for PartConvConfig {
    fn default() -> Self {
        Self {
            block_len: 512,
            imp_res_len: 4096,
            max_num_imp_res: 1,
            num_channels: 1,
            process_channel: 0,
            mode: OverlapMode::Save,
            crossfade: true,
        }
    }
}

/// Partitioned convolver for one channel with runtime response switching
#[derive(Debug)]
pub struct PartConv<D: SpectralDomain> {
    config: PartConvConfig,
    num_parts: usize,
    log2_fft_len: u32,
    previous_ir: usize,
    requested_ir: usize,

    transform: D::Transform,
    filters: FilterBank<D>,
    slots: PartitionSlots<D::Bin>,
    fade_in: Vec<D::Coeff>,
    fade_out: Vec<D::Coeff>,

    input: Vec<D::Sample>,
    output: Vec<D::Sample>,
    output_old: Vec<D::Sample>,
    tail: Vec<D::Sample>,
    tail_old: Vec<D::Sample>,
    spectrum_sum: Vec<D::Accum>,
    scratch: Vec<D::Accum>,
}

impl<D: SpectralDomain> PartConv<D> {
    /// Create an engine with its own twiddle table; all responses start silent
    pub fn new(config: PartConvConfig) -> Result<Self, ConvolutionError> {
        validate_block_len(config.block_len)?;
        let table = Arc::new(D::Table::with_max_len(2 * config.block_len)?);
        Self::with_table(table, config)
    }

    /// Create an engine on a shared twiddle table
    pub fn with_table(table: Arc<D::Table>, config: PartConvConfig) -> Result<Self, ConvolutionError> {
        validate_block_len(config.block_len)?;
        if config.num_channels == 0 {
            return Err(ConvolutionError::InvalidChannelCount);
        }
        if config.process_channel >= config.num_channels {
            return Err(ConvolutionError::InvalidProcessChannel {
                channel: config.process_channel,
                num_channels: config.num_channels,
            });
        }
        if config.imp_res_len == 0 || config.max_num_imp_res == 0 {
            return Err(ConvolutionError::EmptyImpulseResponse);
        }

        let block_len = config.block_len;
        let fft_len = 2 * block_len;
        let bins = fft_len / 2 + 1;
        let num_parts = (config.imp_res_len + block_len - 1) / block_len;
        let transform = D::plan(table, fft_len)?;

        let ramp = |shape: WindowType| -> Vec<D::Coeff> {
            generate_window(shape, block_len).into_iter().map(D::coefficient).collect()
        };

        log::debug!(
            "part_conv: block {} parts {} slots {} mode {:?} crossfade {}",
            block_len,
            num_parts,
            config.max_num_imp_res,
            config.mode,
            config.crossfade
        );

        let zero = D::Sample::default();
        Ok(Self {
            config,
            num_parts,
            log2_fft_len: fft_len.trailing_zeros(),
            previous_ir: 0,
            requested_ir: 0,
            transform,
            filters: FilterBank::new(config.max_num_imp_res, 1, num_parts, block_len, bins),
            slots: PartitionSlots::new(num_parts, bins, D::ZERO_BIN),
            fade_in: ramp(WindowType::FadeIn),
            fade_out: ramp(WindowType::FadeOut),
            input: vec![zero; fft_len],
            output: vec![zero; fft_len],
            output_old: vec![zero; fft_len],
            tail: vec![zero; block_len],
            tail_old: vec![zero; block_len],
            spectrum_sum: vec![D::ZERO_ACCUM; bins],
            scratch: vec![D::ZERO_ACCUM; bins],
        })
    }

    /// Load impulse response `index`
    ///
    /// # Arguments
    /// * `samples` - Exactly `imp_res_len` samples
    /// * `index` - Slot in `0..max_num_imp_res`
    pub fn set_imp_res(&mut self, samples: &[D::Sample], index: usize) -> Result<(), ConvolutionError> {
        self.check_index(index)?;
        if samples.len() != self.config.imp_res_len {
            return Err(ConvolutionError::ImpulseResponseLength {
                expected: self.config.imp_res_len,
                actual: samples.len(),
            });
        }
        let mut frame = vec![D::Sample::default(); 2 * self.config.block_len];
        self.filters.load(
            index,
            0,
            ArrayView1::from(samples),
            &self.transform,
            &mut frame,
            &mut self.scratch,
        )?;
        Ok(())
    }

    /// Convolve the process channel of one interleaved block in place
    ///
    /// # Arguments
    /// * `io` - `block_len * num_channels` samples
    /// * `index` - Impulse response for this block
    pub fn process_block(&mut self, io: &mut [D::Sample], index: usize) -> Result<(), ConvolutionError> {
        self.check_index(index)?;
        let expected = self.config.block_len * self.config.num_channels;
        if io.len() != expected {
            return Err(ConvolutionError::BlockSizeMismatch {
                expected,
                actual: io.len(),
            });
        }

        let block_len = self.config.block_len;
        let stride = self.config.num_channels;
        let channel = self.config.process_channel;
        let switching = index != self.previous_ir && self.config.crossfade;
        let zero = D::Sample::default();

        if switching && self.config.mode == OverlapMode::Add {
            self.tail_old.copy_from_slice(&self.tail);
            self.convolve(index);
            D::inverse(&mut self.transform, &self.spectrum_sum, &mut self.output)?;
            self.tail.copy_from_slice(&self.output[block_len..]);
        }

        self.slots.rotate();
        let fresh = match self.config.mode {
            OverlapMode::Save => {
                self.input.copy_within(block_len.., 0);
                &mut self.input[block_len..]
            }
            OverlapMode::Add => {
                self.input[block_len..].fill(zero);
                &mut self.input[..block_len]
            }
        };
        for (dst, &src) in fresh.iter_mut().zip(io.iter().skip(channel).step_by(stride)) {
            *dst = src;
        }

        D::forward(&self.transform, &self.input, &mut self.scratch, self.slots.newest_mut())?;
        self.convolve(index);
        D::inverse(&mut self.transform, &self.spectrum_sum, &mut self.output)?;

        if self.config.mode == OverlapMode::Add {
            for (out, &t) in self.output[..block_len].iter_mut().zip(self.tail.iter()) {
                *out = D::add(*out, t);
            }
            self.tail.copy_from_slice(&self.output[block_len..]);
        }

        if switching {
            self.convolve(self.previous_ir);
            D::inverse(&mut self.transform, &self.spectrum_sum, &mut self.output_old)?;

            let valid = match self.config.mode {
                OverlapMode::Save => block_len..2 * block_len,
                OverlapMode::Add => {
                    for (old, &t) in self.output_old[..block_len].iter_mut().zip(self.tail_old.iter()) {
                        *old = D::add(*old, t);
                    }
                    0..block_len
                }
            };
            let blend = self.output[valid.clone()]
                .iter_mut()
                .zip(self.output_old[valid].iter())
                .zip(self.fade_in.iter().zip(self.fade_out.iter()));
            for ((new, &old), (&fade_in, &fade_out)) in blend {
                *new = D::crossfade(*new, fade_in, old, fade_out);
            }
        }

        self.previous_ir = index;

        let result = match self.config.mode {
            OverlapMode::Save => &self.output[block_len..],
            OverlapMode::Add => &self.output[..block_len],
        };
        for (dst, &src) in io.iter_mut().skip(channel).step_by(stride).zip(result.iter()) {
            *dst = src;
        }
        Ok(())
    }

    fn convolve(&mut self, index: usize) {
        self.spectrum_sum.fill(D::ZERO_ACCUM);
        for part in 0..self.num_parts {
            D::multiply_accumulate(
                &mut self.spectrum_sum,
                self.slots.aged(part),
                self.filters.partition(index, 0, part),
                self.log2_fft_len,
            );
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ConvolutionError> {
        if index >= self.config.max_num_imp_res {
            return Err(ConvolutionError::IrIndexOutOfRange {
                index,
                available: self.config.max_num_imp_res,
            });
        }
        Ok(())
    }

    /// Response used by [`PartConv::process_selected`]
    pub fn select(&mut self, index: usize) -> Result<(), ConvolutionError> {
        self.check_index(index)?;
        self.requested_ir = index;
        Ok(())
    }

    /// Process with the response chosen by [`PartConv::select`]
    pub fn process_selected(&mut self, io: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        self.process_block(io, self.requested_ir)
    }

    pub fn set_crossfade(&mut self, enabled: bool) {
        self.config.crossfade = enabled;
    }

    /// Switch framing; takes full effect once the old frame has drained
    pub fn set_mode(&mut self, mode: OverlapMode) {
        self.config.mode = mode;
    }

    /// Restore the post-construction state, keeping loaded responses
    pub fn reset(&mut self) {
        let zero = D::Sample::default();
        self.slots.clear(D::ZERO_BIN);
        for buf in [
            &mut self.input,
            &mut self.output,
            &mut self.output_old,
            &mut self.tail,
            &mut self.tail_old,
        ] {
            buf.fill(zero);
        }
        self.previous_ir = 0;
        self.requested_ir = 0;
    }

    pub fn config(&self) -> &PartConvConfig {
        &self.config
    }

    pub fn num_parts(&self) -> usize {
        self.num_parts
    }

    /// Output delay relative to direct convolution, in samples
    pub fn latency(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolution::domain::{BlockFloat16, Fixed32, Float64};

    fn test_input(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64;
                0.3 * (0.07 * t).sin() + 0.2 * (0.9 * t + 0.5).cos()
            })
            .collect()
    }

    fn test_ir(len: usize, seed: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (-(i as f64) / 12.0).exp() * (seed * i as f64 + 0.3).cos() * 0.3)
            .collect()
    }

    fn direct_convolution(x: &[f64], h: &[f64]) -> Vec<f64> {
        (0..x.len())
            .map(|n| (0..=n.min(h.len() - 1)).map(|k| h[k] * x[n - k]).sum())
            .collect()
    }

    fn engine<D: SpectralDomain>(mode: OverlapMode, irs: &[Vec<f64>], block_len: usize) -> PartConv<D> {
        let mut conv = PartConv::<D>::new(PartConvConfig {
            block_len,
            imp_res_len: irs[0].len(),
            max_num_imp_res: irs.len(),
            num_channels: 1,
            process_channel: 0,
            mode,
            crossfade: true,
        })
        .unwrap();
        for (index, ir) in irs.iter().enumerate() {
            let samples: Vec<D::Sample> = ir.iter().map(|&v| D::sample_from_f64(v)).collect();
            conv.set_imp_res(&samples, index).unwrap();
        }
        conv
    }

    #[test]
    fn test_matches_direct_convolution_both_modes() {
        let block_len = 16;
        let h = test_ir(45, 0.5);
        let x = test_input(block_len * 12);
        let reference = direct_convolution(&x, &h);

        for mode in [OverlapMode::Save, OverlapMode::Add] {
            let mut conv = engine::<Float64>(mode, &[h.clone()], block_len);
            assert_eq!(conv.num_parts(), 3);
            for (b, block) in x.chunks_exact(block_len).enumerate() {
                let mut io = block.to_vec();
                conv.process_block(&mut io, 0).unwrap();
                for (i, &v) in io.iter().enumerate() {
                    let n = b * block_len + i;
                    assert!((v - reference[n]).abs() < 1e-12, "{:?} sample {}", mode, n);
                }
            }
        }
    }

    #[test]
    fn test_crossfade_blends_complete_outputs() {
        let block_len = 16;
        let irs = [test_ir(40, 0.4), test_ir(40, 1.3)];
        let x = test_input(block_len * 10);
        let fade_in = generate_window(WindowType::FadeIn, block_len);
        let fade_out = generate_window(WindowType::FadeOut, block_len);
        let k = 5;

        for mode in [OverlapMode::Save, OverlapMode::Add] {
            let mut switching = engine::<Float64>(mode, &irs, block_len);
            let mut old = engine::<Float64>(mode, &irs, block_len);
            let mut new = engine::<Float64>(mode, &irs, block_len);

            for (b, block) in x.chunks_exact(block_len).enumerate() {
                let index = usize::from(b >= k);
                let mut s = block.to_vec();
                let mut o = block.to_vec();
                let mut n = block.to_vec();
                switching.process_block(&mut s, index).unwrap();
                old.process_block(&mut o, 0).unwrap();
                new.process_block(&mut n, 1).unwrap();

                for i in 0..block_len {
                    let expected = if b < k {
                        o[i]
                    } else if b == k {
                        n[i] * fade_in[i] + o[i] * fade_out[i]
                    } else {
                        n[i]
                    };
                    assert!(
                        (s[i] - expected).abs() < 1e-12,
                        "{:?} block {} sample {}: {} vs {}",
                        mode,
                        b,
                        i,
                        s[i],
                        expected
                    );
                }
            }
        }
    }

    #[test]
    fn test_hard_switch_without_crossfade() {
        let block_len = 8;
        let irs = [test_ir(16, 0.4), test_ir(16, 1.3)];
        let x = test_input(block_len * 6);
        let mut switching = engine::<Float64>(OverlapMode::Save, &irs, block_len);
        switching.set_crossfade(false);
        let mut new = engine::<Float64>(OverlapMode::Save, &irs, block_len);

        for (b, block) in x.chunks_exact(block_len).enumerate() {
            let mut s = block.to_vec();
            let mut n = block.to_vec();
            switching.process_block(&mut s, usize::from(b >= 3)).unwrap();
            new.process_block(&mut n, 1).unwrap();
            if b >= 3 {
                assert_eq!(s, n);
            }
        }
    }

    #[test]
    fn test_impulse_recovery_interleaved() {
        let block_len = 8;
        let fir = vec![0.4, 0.3, -0.2, 0.1, 0.05, 0.0, 0.0, -0.05, 0.02, 0.01, 0.3];
        let mut conv = PartConv::<Float64>::new(PartConvConfig {
            block_len,
            imp_res_len: fir.len(),
            max_num_imp_res: 1,
            num_channels: 2,
            process_channel: 1,
            mode: OverlapMode::Save,
            crossfade: true,
        })
        .unwrap();
        conv.set_imp_res(&fir, 0).unwrap();
        assert_eq!(conv.latency(), 0);

        let mut stream = Vec::new();
        for b in 0..3 {
            let mut io = vec![0.0; 2 * block_len];
            for i in 0..block_len {
                io[2 * i] = 9.0;
            }
            if b == 0 {
                io[1] = 1.0;
            }
            conv.process_block(&mut io, 0).unwrap();
            for frame in io.chunks_exact(2) {
                assert_eq!(frame[0], 9.0);
                stream.push(frame[1]);
            }
        }
        for (n, &v) in stream.iter().enumerate() {
            let expected = fir.get(n).copied().unwrap_or(0.0);
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejections_leave_state_unchanged() {
        let block_len = 8;
        let irs = [test_ir(16, 0.4), test_ir(16, 0.9)];
        let x = test_input(block_len * 6);
        let mut conv = engine::<Float64>(OverlapMode::Add, &irs, block_len);
        let mut reference = engine::<Float64>(OverlapMode::Add, &irs, block_len);

        assert_eq!(
            conv.set_imp_res(&[0.0; 16], 2),
            Err(ConvolutionError::IrIndexOutOfRange { index: 2, available: 2 })
        );
        assert_eq!(
            conv.set_imp_res(&[0.0; 15], 0),
            Err(ConvolutionError::ImpulseResponseLength { expected: 16, actual: 15 })
        );

        for block in x.chunks_exact(block_len) {
            let mut io = block.to_vec();
            assert!(conv.process_block(&mut io, 5).is_err());
            assert_eq!(io, block.to_vec());
            conv.process_block(&mut io, 1).unwrap();
            let mut expected = block.to_vec();
            reference.process_block(&mut expected, 1).unwrap();
            assert_eq!(io, expected);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        let base = PartConvConfig {
            block_len: 16,
            imp_res_len: 32,
            ..PartConvConfig::default()
        };
        assert_eq!(
            PartConv::<Float64>::new(PartConvConfig { block_len: 12, ..base }).unwrap_err(),
            ConvolutionError::InvalidBlockLength(12)
        );
        assert_eq!(
            PartConv::<Float64>::new(PartConvConfig { process_channel: 1, ..base }).unwrap_err(),
            ConvolutionError::InvalidProcessChannel { channel: 1, num_channels: 1 }
        );
        assert_eq!(
            PartConv::<Float64>::new(PartConvConfig { imp_res_len: 0, ..base }).unwrap_err(),
            ConvolutionError::EmptyImpulseResponse
        );
    }

    #[test]
    fn test_fixed_point_crossfade_is_exact() {
        let block_len = 16;
        let irs = [test_ir(32, 0.4), test_ir(32, 1.3)];
        let x = test_input(block_len * 6);
        let fade_in: Vec<i32> = generate_window(WindowType::FadeIn, block_len)
            .into_iter()
            .map(Fixed32::coefficient)
            .collect();
        let fade_out: Vec<i32> = generate_window(WindowType::FadeOut, block_len)
            .into_iter()
            .map(Fixed32::coefficient)
            .collect();

        let mut switching = engine::<Fixed32>(OverlapMode::Save, &irs, block_len);
        let mut old = engine::<Fixed32>(OverlapMode::Save, &irs, block_len);
        let mut new = engine::<Fixed32>(OverlapMode::Save, &irs, block_len);
        for (b, block) in x.chunks_exact(block_len).enumerate() {
            let samples: Vec<i32> = block.iter().map(|&v| Fixed32::sample_from_f64(v)).collect();
            let (mut s, mut o, mut n) = (samples.clone(), samples.clone(), samples);
            switching.process_block(&mut s, usize::from(b >= 3)).unwrap();
            old.process_block(&mut o, 0).unwrap();
            new.process_block(&mut n, 1).unwrap();
            if b == 3 {
                for i in 0..block_len {
                    assert_eq!(s[i], Fixed32::crossfade(n[i], fade_in[i], o[i], fade_out[i]));
                }
            } else if b > 3 {
                assert_eq!(s, n);
            }
        }
    }

    #[test]
    fn test_block_float_reset_determinism() {
        let block_len = 16;
        let irs = [test_ir(40, 0.4), test_ir(40, 0.8)];
        let x = test_input(block_len * 8);
        let mut conv = engine::<BlockFloat16>(OverlapMode::Add, &irs, block_len);
        let reference = direct_convolution(&x, &irs[1]);

        let mut run = |conv: &mut PartConv<BlockFloat16>| {
            conv.select(1).unwrap();
            let mut out = Vec::new();
            for block in x.chunks_exact(block_len) {
                let mut io: Vec<i32> = block.iter().map(|&v| BlockFloat16::sample_from_f64(v)).collect();
                conv.process_selected(&mut io).unwrap();
                out.extend(io.iter().map(|&v| BlockFloat16::sample_to_f64(v)));
            }
            out
        };
        let first = run(&mut conv);
        conv.reset();
        let second = run(&mut conv);
        assert_eq!(first, second);
        // the first block crossfades in from response 0
        for n in block_len..first.len() {
            assert!((first[n] - reference[n]).abs() < 2e-3, "sample {}", n);
        }
    }
}
