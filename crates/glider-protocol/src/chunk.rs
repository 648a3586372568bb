use crate::buffer::FrameBuffer;
use crate::palette::{DataPalette, PaletteFormat, PaletteType};
use crate::varint::varint_len;
use glider_common::Result;

/// Global state id of air.
pub const AIR: u32 = 0;

/// A 16x16x16 chunk section: block states plus its 4x4x4 biome grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSection {
    /// Number of non-air blocks in the section
    block_count: i16,
    blocks: DataPalette,
    biomes: DataPalette,
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkSection {
    /// An empty section, all air and biome 0.
    pub fn new() -> Self {
        Self {
            block_count: 0,
            blocks: DataPalette::new(PaletteType::Chunk),
            biomes: DataPalette::new(PaletteType::Biome),
        }
    }

    pub fn from_parts(block_count: i16, blocks: DataPalette, biomes: DataPalette) -> Self {
        Self {
            block_count,
            blocks,
            biomes,
        }
    }

    pub fn block_count(&self) -> i16 {
        self.block_count
    }

    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    pub fn blocks(&self) -> &DataPalette {
        &self.blocks
    }

    pub fn biomes(&self) -> &DataPalette {
        &self.biomes
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> u32 {
        self.blocks.get(x, y, z)
    }

    /// Sets a block state, keeping the non-air count in step. Returns the
    /// previous state.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: u32) -> u32 {
        let previous = self.blocks.set(x, y, z, state);
        if state != AIR && previous == AIR {
            self.block_count += 1;
        } else if state == AIR && previous != AIR {
            self.block_count -= 1;
        }
        previous
    }

    /// Biome coordinates are in 4x4x4 cells.
    pub fn get_biome(&self, x: usize, y: usize, z: usize) -> u32 {
        self.biomes.get(x, y, z)
    }

    pub fn set_biome(&mut self, x: usize, y: usize, z: usize, biome: u32) -> u32 {
        self.biomes.set(x, y, z, biome)
    }

    /// Recounts non-air blocks from the container.
    pub fn recalculate_block_count(&mut self) {
        self.block_count = self.blocks.states().iter().filter(|s| **s != AIR).count() as i16;
    }

    pub fn read(buffer: &mut FrameBuffer, format: PaletteFormat) -> Result<Self> {
        let block_count = buffer.read_i16()?;
        let blocks = DataPalette::read(buffer, PaletteType::Chunk, format)?;
        let biomes = DataPalette::read(buffer, PaletteType::Biome, format)?;
        Ok(Self {
            block_count,
            blocks,
            biomes,
        })
    }

    pub fn write(&self, buffer: &mut FrameBuffer, format: PaletteFormat) {
        buffer.write_i16(self.block_count);
        self.blocks.write(buffer, format);
        self.biomes.write(buffer, format);
    }

    /// Size of the word-count prefixes 1.21.5 stopped sending. Vanilla
    /// still pads the section data by this many zero bytes.
    pub fn dropped_prefix_len(&self) -> usize {
        varint_len(self.blocks.word_count() as i32) + varint_len(self.biomes.word_count() as i32)
    }
}
