//! Windowed overlap-add partitioned convolution
//!
//! Each call takes one block of `block_len` samples per channel. The engine
//! keeps a two-block analysis frame (`process_len = 2*block_len`), applies a
//! periodic Hann window and transforms it zero-padded to
//! `fft_len = 2*process_len`. Frames hop by one block, so consecutive frames
//! overlap by half and the history ring advances twice per partition span:
//! partition `k` is paired with the spectrum `2k` frames back.
//!
//! Output is rebuilt in two nested overlap-add stages: the frame-sized tail
//! alternates between two memories (one per overlapping frame sequence) and
//! the block-sized tail folds the reconstructed frame into the output.
//! The result equals the direct convolution delayed by `block_len` samples.
//!
//! [`Tvolap`] selects among several responses at block boundaries with
//! [`Tvolap::set_ir`]. [`Wolap`] is the single-response form.

use super::domain::{SpectralDomain, TransformTable};
use super::error::ConvolutionError;
use super::filter_bank::FilterBank;
use super::impulse::{ImpulseResponseSet, IrLayout};
use super::ring::SpectrumHistory;
use super::windows::{generate_window, WindowType};
use std::sync::Arc;

/// Frames overlapping any output sample
const OVERLAP: usize = 2;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TvolapConfig {
    /// Samples per channel per call (power of two, >= 2)
    pub block_len: usize,

    /// Interleaved channels per call
    pub num_chans_audio: usize,
}

impl Default for TvolapConfig {
    fn default() -> Self {
        Self {
            block_len: 512,
            num_chans_audio: 2,
        }
    }
}

pub(crate) fn validate_block_len(block_len: usize) -> Result<(), ConvolutionError> {
    if block_len < 2 || !block_len.is_power_of_two() {
        return Err(ConvolutionError::InvalidBlockLength(block_len));
    }
    Ok(())
}

/// Time-variant partitioned convolution engine
#[derive(Debug)]
pub struct Tvolap<D: SpectralDomain> {
    block_len: usize,
    process_len: usize,
    num_chans_audio: usize,
    /// Channels convolved: min(audio channels, IR channels)
    active_chans: usize,
    num_ir: usize,
    num_parts: usize,
    log2_fft_len: u32,
    active_ir: usize,

    transform: D::Transform,
    filters: FilterBank<D>,
    window: Vec<D::Coeff>,
    history: SpectrumHistory<D::Bin>,

    in_frames: Vec<Vec<D::Sample>>,
    windowed: Vec<D::Sample>,
    spectrum_sum: Vec<D::Accum>,
    scratch: Vec<D::Accum>,
    frame_out: Vec<D::Sample>,
    out_frames: Vec<Vec<D::Sample>>,
    frame_tails: Vec<[Vec<D::Sample>; OVERLAP]>,
    block_tails: Vec<Vec<D::Sample>>,
    tail_slot: usize,
}

impl<D: SpectralDomain> Tvolap<D> {
    /// Create an engine with its own twiddle table
    ///
    /// # Arguments
    /// * `irs` - Impulse responses, all of equal length and channel count
    /// * `config` - Block length and audio channel count
    pub fn new(irs: &ImpulseResponseSet<D::Sample>, config: TvolapConfig) -> Result<Self, ConvolutionError> {
        validate_block_len(config.block_len)?;
        let table = Arc::new(D::Table::with_max_len(4 * config.block_len)?);
        Self::with_table(table, irs, config)
    }

    /// Create an engine on a shared twiddle table
    pub fn with_table(
        table: Arc<D::Table>,
        irs: &ImpulseResponseSet<D::Sample>,
        config: TvolapConfig,
    ) -> Result<Self, ConvolutionError> {
        validate_block_len(config.block_len)?;
        if config.num_chans_audio == 0 {
            return Err(ConvolutionError::InvalidChannelCount);
        }

        let block_len = config.block_len;
        let process_len = 2 * block_len;
        let fft_len = 2 * process_len;
        let bins = fft_len / 2 + 1;
        let num_parts = (irs.len() + process_len - 1) / process_len;
        let active_chans = config.num_chans_audio.min(irs.num_channels());

        let transform = D::plan(table, fft_len)?;
        let filters = FilterBank::from_set(irs, num_parts, process_len, &transform)?;
        let window = generate_window(WindowType::Hann, process_len)
            .into_iter()
            .map(D::coefficient)
            .collect();

        log::debug!(
            "tvolap: block {} fft {} parts {} irs {} channels {}/{}",
            block_len,
            fft_len,
            num_parts,
            irs.num_ir(),
            active_chans,
            config.num_chans_audio
        );

        let zero = D::Sample::default();
        Ok(Self {
            block_len,
            process_len,
            num_chans_audio: config.num_chans_audio,
            active_chans,
            num_ir: irs.num_ir(),
            num_parts,
            log2_fft_len: fft_len.trailing_zeros(),
            active_ir: 0,
            transform,
            filters,
            window,
            history: SpectrumHistory::new(active_chans, num_parts * OVERLAP, bins, D::ZERO_BIN),
            in_frames: vec![vec![zero; process_len]; active_chans],
            windowed: vec![zero; fft_len],
            spectrum_sum: vec![D::ZERO_ACCUM; bins],
            scratch: vec![D::ZERO_ACCUM; bins],
            frame_out: vec![zero; fft_len],
            out_frames: vec![vec![zero; process_len]; active_chans],
            frame_tails: (0..active_chans)
                .map(|_| [vec![zero; process_len], vec![zero; process_len]])
                .collect(),
            block_tails: vec![vec![zero; block_len]; active_chans],
            tail_slot: 0,
        })
    }

    /// Create an engine from a flat interleaved buffer
    ///
    /// # Arguments
    /// * `samples` - `num_ir * len_ir * num_chans_ir` samples, `(ir*len_ir + t)*num_chans_ir + ch`
    pub fn from_interleaved(
        samples: Vec<D::Sample>,
        num_ir: usize,
        len_ir: usize,
        num_chans_ir: usize,
        config: TvolapConfig,
    ) -> Result<Self, ConvolutionError> {
        let irs = ImpulseResponseSet::from_flat(samples, num_ir, len_ir, num_chans_ir, IrLayout::Interleaved)?;
        Self::new(&irs, config)
    }

    /// Convolve one interleaved block in place
    ///
    /// Audio channels beyond the impulse responses' channel count pass
    /// through unchanged.
    ///
    /// # Arguments
    /// * `buffer` - `block_len * num_chans_audio` samples, `buffer[i*num_chans + ch]`
    pub fn process(&mut self, buffer: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        let expected = self.block_len * self.num_chans_audio;
        if buffer.len() != expected {
            return Err(ConvolutionError::BlockSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }

        let ir = self.active_ir;
        let (block_len, process_len) = (self.block_len, self.process_len);
        let stride = self.num_chans_audio;

        for ch in 0..self.active_chans {
            let frame = &mut self.in_frames[ch];
            frame.copy_within(block_len.., 0);
            for (dst, &src) in frame[block_len..].iter_mut().zip(buffer.iter().skip(ch).step_by(stride)) {
                *dst = src;
            }
            for ((dst, &x), &w) in self.windowed[..process_len].iter_mut().zip(frame.iter()).zip(self.window.iter()) {
                *dst = D::weight(x, w);
            }

            D::forward(&self.transform, &self.windowed, &mut self.scratch, self.history.current_mut(ch))?;

            self.spectrum_sum.fill(D::ZERO_ACCUM);
            for part in 0..self.num_parts {
                D::multiply_accumulate(
                    &mut self.spectrum_sum,
                    self.history.lagged(ch, part * OVERLAP),
                    self.filters.partition(ir, ch, part),
                    self.log2_fft_len,
                );
            }
            D::inverse(&mut self.transform, &self.spectrum_sum, &mut self.frame_out)?;

            let tail = &mut self.frame_tails[ch][self.tail_slot];
            let out_frame = &mut self.out_frames[ch];
            for i in 0..process_len {
                out_frame[i] = D::add(self.frame_out[i], tail[i]);
                tail[i] = self.frame_out[i + process_len];
            }

            let block_tail = &mut self.block_tails[ch];
            for (i, dst) in buffer.iter_mut().skip(ch).step_by(stride).enumerate() {
                *dst = D::add(out_frame[i], block_tail[i]);
                block_tail[i] = out_frame[i + block_len];
            }
        }

        self.history.advance();
        self.tail_slot = (self.tail_slot + 1) % OVERLAP;
        Ok(())
    }

    /// Select the impulse response used from the next block on
    pub fn set_ir(&mut self, index: usize) -> Result<(), ConvolutionError> {
        if index >= self.num_ir {
            return Err(ConvolutionError::IrIndexOutOfRange {
                index,
                available: self.num_ir,
            });
        }
        self.active_ir = index;
        Ok(())
    }

    /// Restore the post-construction state, keeping the filter spectra
    pub fn reset(&mut self) {
        let zero = D::Sample::default();
        self.history.clear(D::ZERO_BIN);
        for buf in self
            .in_frames
            .iter_mut()
            .chain(self.out_frames.iter_mut())
            .chain(self.block_tails.iter_mut())
            .chain(self.frame_tails.iter_mut().flat_map(|slots| slots.iter_mut()))
        {
            buf.fill(zero);
        }
        self.windowed.fill(zero);
        self.frame_out.fill(zero);
        self.tail_slot = 0;
        self.active_ir = 0;
    }

    pub fn active_ir(&self) -> usize {
        self.active_ir
    }

    pub fn num_ir(&self) -> usize {
        self.num_ir
    }

    pub fn num_parts(&self) -> usize {
        self.num_parts
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn process_len(&self) -> usize {
        self.process_len
    }

    pub fn fft_len(&self) -> usize {
        2 * self.process_len
    }

    pub fn num_chans_audio(&self) -> usize {
        self.num_chans_audio
    }

    /// Output delay relative to direct convolution, in samples
    pub fn latency(&self) -> usize {
        self.block_len
    }
}

/// Time-invariant windowed overlap-add convolution
#[derive(Debug)]
pub struct Wolap<D: SpectralDomain> {
    inner: Tvolap<D>,
}

impl<D: SpectralDomain> Wolap<D> {
    /// Create an engine for a single impulse response
    pub fn new(ir: &ImpulseResponseSet<D::Sample>, config: TvolapConfig) -> Result<Self, ConvolutionError> {
        if ir.num_ir() != 1 {
            return Err(ConvolutionError::UnexpectedIrCount(ir.num_ir()));
        }
        Ok(Self {
            inner: Tvolap::new(ir, config)?,
        })
    }

    /// Create an engine from a flat interleaved buffer of `len_ir * num_chans_ir` samples
    pub fn from_interleaved(
        samples: Vec<D::Sample>,
        len_ir: usize,
        num_chans_ir: usize,
        config: TvolapConfig,
    ) -> Result<Self, ConvolutionError> {
        Ok(Self {
            inner: Tvolap::from_interleaved(samples, 1, len_ir, num_chans_ir, config)?,
        })
    }

    /// Convolve one interleaved block in place
    pub fn process(&mut self, buffer: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        self.inner.process(buffer)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn block_len(&self) -> usize {
        self.inner.block_len()
    }

    pub fn num_parts(&self) -> usize {
        self.inner.num_parts()
    }

    pub fn latency(&self) -> usize {
        self.inner.latency()
    }
}
