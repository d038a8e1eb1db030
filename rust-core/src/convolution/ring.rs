//! Fixed-capacity spectrum histories
//!
//! Both histories are arenas of equally sized slots allocated once. Past
//! spectra are located by index arithmetic, never moved.

/// Slot `lag` steps behind `cursor` in a ring of `len` slots
#[inline]
pub fn ring_back(cursor: usize, lag: usize, len: usize) -> usize {
    (cursor + len - lag % len) % len
}

/// Per-channel rings of input spectra sharing one write cursor
#[derive(Debug, Clone)]
pub struct SpectrumHistory<B> {
    data: Vec<B>,
    bins: usize,
    slots: usize,
    cursor: usize,
}

impl<B: Copy> SpectrumHistory<B> {
    /// # Arguments
    /// * `channels` - Number of independent rings
    /// * `slots` - Spectra kept per ring
    /// * `bins` - Bins per spectrum
    /// * `zero` - Initial bin value
    pub fn new(channels: usize, slots: usize, bins: usize, zero: B) -> Self {
        Self {
            data: vec![zero; channels * slots * bins],
            bins,
            slots,
            cursor: 0,
        }
    }

    #[inline]
    fn range(&self, ch: usize, slot: usize) -> std::ops::Range<usize> {
        let start = (ch * self.slots + slot) * self.bins;
        start..start + self.bins
    }

    /// Slot under the write cursor
    pub fn current_mut(&mut self, ch: usize) -> &mut [B] {
        let range = self.range(ch, self.cursor);
        &mut self.data[range]
    }

    /// Spectrum written `lag` cursor steps ago
    pub fn lagged(&self, ch: usize, lag: usize) -> &[B] {
        &self.data[self.range(ch, ring_back(self.cursor, lag, self.slots))]
    }

    /// Move the write cursor to the next slot
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.slots;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Zero every slot and rewind the cursor
    pub fn clear(&mut self, zero: B) {
        self.data.fill(zero);
        self.cursor = 0;
    }
}

/// Partition slots addressed through a rotating index table
///
/// `order[0]` is the newest spectrum, `order[k]` the one from `k` blocks ago.
#[derive(Debug, Clone)]
pub struct PartitionSlots<B> {
    data: Vec<B>,
    bins: usize,
    order: Vec<usize>,
}

impl<B: Copy> PartitionSlots<B> {
    pub fn new(slots: usize, bins: usize, zero: B) -> Self {
        Self {
            data: vec![zero; slots * bins],
            bins,
            order: (0..slots).collect(),
        }
    }

    /// Age every slot by one block; the oldest slot becomes the newest
    pub fn rotate(&mut self) {
        self.order.rotate_right(1);
    }

    pub fn newest_mut(&mut self) -> &mut [B] {
        let start = self.order[0] * self.bins;
        &mut self.data[start..start + self.bins]
    }

    /// Spectrum from `age` blocks ago
    pub fn aged(&self, age: usize) -> &[B] {
        let start = self.order[age] * self.bins;
        &self.data[start..start + self.bins]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Zero every slot and restore the initial order
    pub fn clear(&mut self, zero: B) {
        self.data.fill(zero);
        for (i, slot) in self.order.iter_mut().enumerate() {
            *slot = i;
        }
    }
}
