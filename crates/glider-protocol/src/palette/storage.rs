use glider_common::{ProtocolError, Result};

/// How cells are laid out across 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Packing {
    /// Cells never cross a word boundary; leftover high bits of each word
    /// are padding.
    Aligned,
    /// Cells are packed back to back and may straddle two words.
    Compact,
}

/// Fixed number of fixed-width unsigned cells packed into `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    data: Vec<u64>,
    bits: u8,
    size: usize,
    packing: Packing,
    mask: u64,
}

impl BitStorage {
    pub const MAX_BITS: u8 = 32;

    /// Zero-filled storage. `bits` must be within `1..=32`.
    pub fn new(bits: u8, size: usize, packing: Packing) -> Self {
        let bits = bits.clamp(1, Self::MAX_BITS);
        Self {
            data: vec![0; Self::words_for(bits, size, packing)],
            bits,
            size,
            packing,
            mask: (1u64 << bits) - 1,
        }
    }

    /// Wraps words read off the wire, checking their count.
    pub fn from_data(bits: u8, size: usize, packing: Packing, data: Vec<u64>) -> Result<Self> {
        if bits == 0 || bits > Self::MAX_BITS {
            return Err(ProtocolError::invalid_data(format!(
                "unsupported bits per entry {}",
                bits
            )));
        }
        let expected = Self::words_for(bits, size, packing);
        if data.len() != expected {
            return Err(ProtocolError::invalid_data(format!(
                "expected {} words for {} cells at {} bits, got {}",
                expected,
                size,
                bits,
                data.len()
            )));
        }
        Ok(Self {
            data,
            bits,
            size,
            packing,
            mask: (1u64 << bits) - 1,
        })
    }

    /// Number of words needed for `size` cells of `bits` each.
    pub fn words_for(bits: u8, size: usize, packing: Packing) -> usize {
        let bits = bits.max(1) as usize;
        match packing {
            Packing::Aligned => {
                let per_word = 64 / bits;
                (size + per_word - 1) / per_word
            }
            Packing::Compact => (size * bits + 63) / 64,
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// Reads cell `index`. Panics if `index >= size`.
    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.size, "cell {} out of range", index);
        let bits = self.bits as usize;
        match self.packing {
            Packing::Aligned => {
                let per_word = 64 / bits;
                let word = self.data[index / per_word];
                ((word >> ((index % per_word) * bits)) & self.mask) as u32
            }
            Packing::Compact => {
                let bit = index * bits;
                let (word, offset) = (bit / 64, bit % 64);
                let mut value = self.data[word] >> offset;
                if offset + bits > 64 {
                    value |= self.data[word + 1] << (64 - offset);
                }
                (value & self.mask) as u32
            }
        }
    }

    /// Writes cell `index`; bits of `value` above the cell width are dropped.
    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.size, "cell {} out of range", index);
        let bits = self.bits as usize;
        let value = value as u64 & self.mask;
        match self.packing {
            Packing::Aligned => {
                let per_word = 64 / bits;
                let shift = (index % per_word) * bits;
                let word = &mut self.data[index / per_word];
                *word = (*word & !(self.mask << shift)) | (value << shift);
            }
            Packing::Compact => {
                let bit = index * bits;
                let (word, offset) = (bit / 64, bit % 64);
                self.data[word] = (self.data[word] & !(self.mask << offset)) | (value << offset);
                if offset + bits > 64 {
                    let spill = 64 - offset;
                    self.data[word + 1] =
                        (self.data[word + 1] & !(self.mask >> spill)) | (value >> spill);
                }
            }
        }
    }

    /// Copies every cell into a new storage with another width or layout.
    pub fn repack(&self, bits: u8, packing: Packing) -> BitStorage {
        let mut repacked = BitStorage::new(bits, self.size, packing);
        for index in 0..self.size {
            repacked.set(index, self.get(index));
        }
        repacked
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.size).map(move |index| self.get(index))
    }
}
