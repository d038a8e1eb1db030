//! Block-processing front end shared by the convolution engines
//!
//! [`RealtimeConvolver`] owns an engine plus the audio-side end of an
//! [`IrSwitchQueue`], so impulse-response changes posted from a control
//! thread are applied at the next block boundary.

use crate::control::{IrSwitchQueue, IrSwitchReceiver, IrSwitchSender};
use crate::convolution::{ConvolutionError, PartConv, SpectralDomain, Tvolap, Wolap};

/// In-place block convolver with selectable impulse response
pub trait BlockConvolver {
    type Sample;

    /// Process one interleaved block in place (zero allocations)
    fn process_block_inplace(&mut self, buffer: &mut [Self::Sample]) -> Result<(), ConvolutionError>;

    /// Select the impulse response used from the next block on
    fn select_ir(&mut self, index: usize) -> Result<(), ConvolutionError>;

    fn reset(&mut self);

    /// Output delay relative to direct convolution, in samples
    fn latency(&self) -> usize;
}

impl<D: SpectralDomain> BlockConvolver for Tvolap<D> {
    type Sample = D::Sample;

    fn process_block_inplace(&mut self, buffer: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        self.process(buffer)
    }

    fn select_ir(&mut self, index: usize) -> Result<(), ConvolutionError> {
        self.set_ir(index)
    }

    fn reset(&mut self) {
        Tvolap::reset(self)
    }

    fn latency(&self) -> usize {
        Tvolap::latency(self)
    }
}

impl<D: SpectralDomain> BlockConvolver for Wolap<D> {
    type Sample = D::Sample;

    fn process_block_inplace(&mut self, buffer: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        self.process(buffer)
    }

    fn select_ir(&mut self, index: usize) -> Result<(), ConvolutionError> {
        if index != 0 {
            return Err(ConvolutionError::IrIndexOutOfRange { index, available: 1 });
        }
        Ok(())
    }

    fn reset(&mut self) {
        Wolap::reset(self)
    }

    fn latency(&self) -> usize {
        Wolap::latency(self)
    }
}

impl<D: SpectralDomain> BlockConvolver for PartConv<D> {
    type Sample = D::Sample;

    fn process_block_inplace(&mut self, buffer: &mut [D::Sample]) -> Result<(), ConvolutionError> {
        self.process_selected(buffer)
    }

    fn select_ir(&mut self, index: usize) -> Result<(), ConvolutionError> {
        self.select(index)
    }

    fn reset(&mut self) {
        PartConv::reset(self)
    }

    fn latency(&self) -> usize {
        PartConv::latency(self)
    }
}

/// Engine driven from the audio thread, switched from a control thread
pub struct RealtimeConvolver<E: BlockConvolver> {
    engine: E,
    switches: IrSwitchReceiver,
    rejected_switches: u64,
}

impl<E: BlockConvolver> RealtimeConvolver<E> {
    /// Wrap an engine
    ///
    /// # Arguments
    /// * `engine` - Convolution engine
    /// * `capacity` - Pending switch requests held between blocks
    ///
    /// # Returns
    /// The convolver and the sender to hand to the control thread
    pub fn new(engine: E, capacity: usize) -> Result<(Self, IrSwitchSender), ConvolutionError> {
        let (sender, switches) = IrSwitchQueue::new(capacity)?.split();
        Ok((
            Self {
                engine,
                switches,
                rejected_switches: 0,
            },
            sender,
        ))
    }

    /// Apply the latest pending switch, then process one block in place
    ///
    /// A pending index the engine refuses is counted and dropped; the block
    /// is still processed with the current response. Nothing is logged here.
    pub fn process(&mut self, buffer: &mut [E::Sample]) -> Result<(), ConvolutionError> {
        if let Some(index) = self.switches.latest() {
            if self.engine.select_ir(index).is_err() {
                self.rejected_switches += 1;
            }
        }
        self.engine.process_block_inplace(buffer)
    }

    /// Switch requests refused by the engine so far
    pub fn rejected_switches(&self) -> u64 {
        self.rejected_switches
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }
}
