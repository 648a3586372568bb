//! Paletted containers for block and biome states.
//!
//! A container stores a fixed number of cells. Each cell holds a small index
//! into a palette of distinct state ids, bit-packed into 64-bit words, or the
//! global state id itself once the palette would grow too large.

mod storage;

pub use storage::{BitStorage, Packing};

use crate::buffer::FrameBuffer;
use glider_common::{ProtocolError, ProtocolVersion, Result};
use std::collections::HashMap;
use tracing::trace;

/// Container shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteType {
    /// 16x16x16 block states.
    Chunk,
    /// 4x4x4 biomes.
    Biome,
}

impl PaletteType {
    /// Widest indirect palette searched linearly.
    pub fn max_bits_for_list(self) -> u8 {
        match self {
            PaletteType::Chunk => 4,
            PaletteType::Biome => 3,
        }
    }

    /// Widest indirect palette with a hashed reverse lookup. Biomes go
    /// straight from a list to direct storage.
    pub fn max_bits_for_map(self) -> u8 {
        match self {
            PaletteType::Chunk => 8,
            PaletteType::Biome => 0,
        }
    }

    pub fn bit_shift(self) -> u32 {
        match self {
            PaletteType::Chunk => 4,
            PaletteType::Biome => 2,
        }
    }

    pub fn storage_size(self) -> usize {
        match self {
            PaletteType::Chunk => 16 * 16 * 16,
            PaletteType::Biome => 4 * 4 * 4,
        }
    }

    /// Block palettes always use the full list width, whatever their size.
    fn forces_max_list_size(self) -> bool {
        matches!(self, PaletteType::Chunk)
    }

    /// Width of a direct container when no state needs more.
    pub fn default_global_bits(self) -> u8 {
        match self {
            PaletteType::Chunk => 15,
            PaletteType::Biome => 6,
        }
    }

    /// Cells along one edge of the container.
    pub fn axis_size(self) -> usize {
        1 << self.bit_shift()
    }

    /// Storage index of a cell, y-major then z then x.
    ///
    /// Panics if any coordinate is outside `0..axis_size()`.
    pub fn index(self, x: usize, y: usize, z: usize) -> usize {
        let size = self.axis_size();
        assert!(
            x < size && y < size && z < size,
            "cell ({}, {}, {}) outside a {}-wide {:?} container",
            x,
            y,
            z,
            size,
            self
        );
        let shift = self.bit_shift();
        ((y << shift | z) << shift) | x
    }

    fn list_bits(self, bits: u8) -> u8 {
        if self.forces_max_list_size() {
            self.max_bits_for_list()
        } else {
            bits.max(1)
        }
    }
}

/// Container encoding used by one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteFormat {
    pub packing: Packing,
    /// Whether the word array is preceded by its varint length.
    pub length_prefix: bool,
    /// Whether a zero-bit single-value container may be sent.
    pub allow_singleton: bool,
}

impl PaletteFormat {
    pub fn for_version(version: ProtocolVersion) -> Self {
        Self {
            packing: if version.is_older_than(ProtocolVersion::V_1_16) {
                Packing::Compact
            } else {
                Packing::Aligned
            },
            length_prefix: version.is_older_than(ProtocolVersion::V_1_21_5),
            allow_singleton: version.is_newer_than_or_equals(ProtocolVersion::V_1_18),
        }
    }
}

/// Which palette strategy a container currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Singleton,
    List,
    Map,
    Global,
}

#[derive(Debug, Clone, PartialEq)]
enum Palette {
    Singleton(u32),
    List {
        bits: u8,
        states: Vec<u32>,
    },
    Map {
        bits: u8,
        states: Vec<u32>,
        ids: HashMap<u32, u32>,
    },
    Global {
        bits: u8,
    },
}

impl Palette {
    fn list(bits: u8) -> Self {
        Palette::List {
            bits,
            states: Vec::with_capacity(1 << bits),
        }
    }

    fn map(bits: u8) -> Self {
        Palette::Map {
            bits,
            states: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn bits(&self) -> u8 {
        match self {
            Palette::Singleton(_) => 0,
            Palette::List { bits, .. } | Palette::Map { bits, .. } | Palette::Global { bits } => {
                *bits
            }
        }
    }

    fn entries(&self) -> &[u32] {
        match self {
            Palette::Singleton(state) => std::slice::from_ref(state),
            Palette::List { states, .. } | Palette::Map { states, .. } => states,
            Palette::Global { .. } => &[],
        }
    }

    /// Finds or allocates the id for `state`; `None` when the palette is full.
    fn state_to_id(&mut self, state: u32) -> Option<u32> {
        match self {
            Palette::Singleton(existing) => (*existing == state).then_some(0),
            Palette::List { bits, states } => {
                if let Some(id) = states.iter().position(|s| *s == state) {
                    return Some(id as u32);
                }
                if states.len() < 1 << *bits {
                    states.push(state);
                    return Some(states.len() as u32 - 1);
                }
                None
            }
            Palette::Map { bits, states, ids } => {
                if let Some(id) = ids.get(&state) {
                    return Some(*id);
                }
                if states.len() < 1 << *bits {
                    let id = states.len() as u32;
                    states.push(state);
                    ids.insert(state, id);
                    return Some(id);
                }
                None
            }
            Palette::Global { bits } => (bits_needed(state) <= *bits).then_some(state),
        }
    }

    fn id_to_state(&self, id: u32) -> u32 {
        match self {
            Palette::Singleton(state) => *state,
            Palette::List { states, .. } | Palette::Map { states, .. } => {
                states.get(id as usize).copied().unwrap_or(0)
            }
            Palette::Global { .. } => id,
        }
    }

    fn strategy(&self) -> Strategy {
        match self {
            Palette::Singleton(_) => Strategy::Singleton,
            Palette::List { .. } => Strategy::List,
            Palette::Map { .. } => Strategy::Map,
            Palette::Global { .. } => Strategy::Global,
        }
    }
}

fn bits_needed(value: u32) -> u8 {
    (32 - value.leading_zeros()) as u8
}

/// Bits needed to index `count` distinct values.
fn bits_for_count(count: usize) -> u8 {
    if count <= 1 {
        0
    } else {
        bits_needed(count as u32 - 1)
    }
}

/// A paletted container of state ids.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPalette {
    kind: PaletteType,
    palette: Palette,
    // None while the palette is a singleton
    storage: Option<BitStorage>,
    packing: Packing,
    global_bits: u8,
}

impl DataPalette {
    /// An all-zero container with aligned packing.
    pub fn new(kind: PaletteType) -> Self {
        Self::with_packing(kind, Packing::Aligned)
    }

    pub fn with_packing(kind: PaletteType, packing: Packing) -> Self {
        let bits = kind.max_bits_for_list();
        let mut palette = Palette::list(bits);
        palette.state_to_id(0);
        Self {
            kind,
            palette,
            storage: Some(BitStorage::new(bits, kind.storage_size(), packing)),
            packing,
            global_bits: kind.default_global_bits(),
        }
    }

    /// Overrides the width used once the container becomes direct, normally
    /// the bit length of the largest global state id.
    pub fn with_global_bits(mut self, bits: u8) -> Self {
        self.global_bits = bits.clamp(1, BitStorage::MAX_BITS);
        self
    }

    /// Builds the smallest container for a complete array of cells.
    pub fn from_states(kind: PaletteType, states: &[u32], packing: Packing) -> Result<Self> {
        let size = kind.storage_size();
        if states.len() != size {
            return Err(ProtocolError::invalid_data(format!(
                "expected {} cells, got {}",
                size,
                states.len()
            )));
        }

        let mut distinct = Vec::new();
        let mut seen = HashMap::new();
        for &state in states {
            if seen.insert(state, ()).is_none() {
                distinct.push(state);
            }
        }

        let mut container = Self {
            kind,
            palette: Palette::Singleton(states[0]),
            storage: None,
            packing,
            global_bits: kind.default_global_bits(),
        };
        if distinct.len() == 1 {
            return Ok(container);
        }

        let max_state = distinct.iter().copied().max().unwrap_or(0);
        let mut palette = container.create_palette(bits_for_count(distinct.len()), max_state);
        let mut storage = BitStorage::new(palette.bits(), size, packing);
        for (index, &state) in states.iter().enumerate() {
            let id = palette.state_to_id(state).ok_or_else(|| {
                ProtocolError::invalid_data(format!("state {} does not fit the palette", state))
            })?;
            storage.set(index, id);
        }
        container.palette = palette;
        container.storage = Some(storage);
        Ok(container)
    }

    pub fn kind(&self) -> PaletteType {
        self.kind
    }

    pub fn strategy(&self) -> Strategy {
        self.palette.strategy()
    }

    /// Width of one cell as sent on the wire.
    pub fn bits_per_entry(&self) -> u8 {
        self.storage.as_ref().map_or(0, BitStorage::bits)
    }

    /// Distinct states of an indirect or singleton palette, in id order.
    pub fn palette_entries(&self) -> &[u32] {
        self.palette.entries()
    }

    pub fn storage(&self) -> Option<&BitStorage> {
        self.storage.as_ref()
    }

    fn get_index(&self, index: usize) -> u32 {
        match &self.storage {
            Some(storage) => self.palette.id_to_state(storage.get(index)),
            None => self.palette.id_to_state(0),
        }
    }

    /// State at the given cell. Panics if a coordinate is out of range.
    pub fn get(&self, x: usize, y: usize, z: usize) -> u32 {
        self.get_index(self.kind.index(x, y, z))
    }

    /// Stores `state` at the given cell, growing the palette if needed, and
    /// returns the state previously there.
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: u32) -> u32 {
        let index = self.kind.index(x, y, z);
        let id = loop {
            if let Some(id) = self.palette.state_to_id(state) {
                break id;
            }
            self.resize_one_up(state);
        };

        match &mut self.storage {
            Some(storage) => {
                let previous = self.palette.id_to_state(storage.get(index));
                storage.set(index, id);
                previous
            }
            // singleton and the state already matched
            None => state,
        }
    }

    /// Every cell in index order.
    pub fn states(&self) -> Vec<u32> {
        (0..self.kind.storage_size())
            .map(|index| self.get_index(index))
            .collect()
    }

    fn max_state(&self) -> u32 {
        match &self.palette {
            Palette::Global { .. } => self
                .storage
                .as_ref()
                .and_then(|storage| storage.iter().max())
                .unwrap_or(0),
            palette => palette.entries().iter().copied().max().unwrap_or(0),
        }
    }

    fn create_palette(&self, bits: u8, max_state: u32) -> Palette {
        if bits <= self.kind.max_bits_for_list() {
            Palette::list(self.kind.list_bits(bits))
        } else if bits <= self.kind.max_bits_for_map() {
            Palette::map(bits)
        } else {
            Palette::Global {
                bits: bits.max(self.global_bits).max(bits_needed(max_state)),
            }
        }
    }

    /// Re-encodes every cell one bit wider, switching strategy when the new
    /// width passes a strategy's limit.
    fn resize_one_up(&mut self, incoming: u32) {
        let size = self.kind.storage_size();
        let max_state = self.max_state().max(incoming);
        let mut bits = self.palette.bits() + 1;
        loop {
            let mut palette = self.create_palette(bits, max_state);
            let mut storage = BitStorage::new(palette.bits(), size, self.packing);
            let fits = (0..size).all(|index| match palette.state_to_id(self.get_index(index)) {
                Some(id) => {
                    storage.set(index, id);
                    true
                }
                None => false,
            });
            if fits && palette.state_to_id(incoming).is_some() {
                trace!(
                    kind = ?self.kind,
                    from = ?self.palette.strategy(),
                    to = ?palette.strategy(),
                    bits = storage.bits(),
                    "palette resized"
                );
                self.palette = palette;
                self.storage = Some(storage);
                return;
            }
            bits += 1;
        }
    }

    /// Reads a container in the layout `format` describes.
    pub fn read(buffer: &mut FrameBuffer, kind: PaletteType, format: PaletteFormat) -> Result<Self> {
        let mut bits = buffer.read_u8()?;
        let size = kind.storage_size();

        if bits == 0 && format.allow_singleton {
            let state = read_state(buffer)?;
            if format.length_prefix {
                let words = read_word_count(buffer, 0)?;
                buffer.skip(words * 8)?;
            }
            return Ok(Self {
                kind,
                palette: Palette::Singleton(state),
                storage: None,
                packing: format.packing,
                global_bits: kind.default_global_bits(),
            });
        }

        if format.packing == Packing::Compact && kind == PaletteType::Chunk {
            bits = bits.max(kind.max_bits_for_list());
        }
        if bits == 0 || bits > BitStorage::MAX_BITS {
            return Err(ProtocolError::invalid_data(format!(
                "unsupported bits per entry {}",
                bits
            )));
        }

        let palette = read_palette(buffer, kind, bits)?;
        let expected = BitStorage::words_for(bits, size, format.packing);
        if format.length_prefix {
            let words = read_word_count(buffer, expected)?;
            if words != expected {
                return Err(ProtocolError::invalid_data(format!(
                    "expected {} words for {} bits, got {}",
                    expected, bits, words
                )));
            }
        }
        let mut data = Vec::with_capacity(expected);
        for _ in 0..expected {
            data.push(buffer.read_u64()?);
        }
        let mut storage = BitStorage::from_data(bits, size, format.packing, data)?;
        if storage.bits() < palette.bits() {
            storage = storage.repack(palette.bits(), format.packing);
        }

        let global_bits = match palette {
            Palette::Global { bits } => bits,
            _ => kind.default_global_bits(),
        };
        Ok(Self {
            kind,
            palette,
            storage: Some(storage),
            packing: format.packing,
            global_bits,
        })
    }

    /// Writes the container in the layout `format` describes, converting the
    /// packing or expanding a singleton first when the format requires it.
    pub fn write(&self, buffer: &mut FrameBuffer, format: PaletteFormat) {
        if let Palette::Singleton(state) = self.palette {
            if format.allow_singleton {
                buffer.write_u8(0);
                buffer.write_varint(state as i32);
                if format.length_prefix {
                    buffer.write_varint(0);
                }
                return;
            }
            let bits = self.kind.list_bits(1);
            buffer.write_u8(bits);
            buffer.write_varint(1);
            buffer.write_varint(state as i32);
            let words = BitStorage::words_for(bits, self.kind.storage_size(), format.packing);
            if format.length_prefix {
                buffer.write_varint(words as i32);
            }
            for _ in 0..words {
                buffer.write_u64(0);
            }
            return;
        }

        let Some(storage) = &self.storage else {
            return;
        };
        buffer.write_u8(storage.bits());
        if !matches!(self.palette, Palette::Global { .. }) {
            let entries = self.palette.entries();
            buffer.write_varint(entries.len() as i32);
            for state in entries {
                buffer.write_varint(*state as i32);
            }
        }

        let repacked;
        let storage = if storage.packing() == format.packing {
            storage
        } else {
            repacked = storage.repack(storage.bits(), format.packing);
            &repacked
        };
        if format.length_prefix {
            buffer.write_varint(storage.data().len() as i32);
        }
        for word in storage.data() {
            buffer.write_u64(*word);
        }
    }

    /// Number of 64-bit words in the backing storage, 0 for a singleton.
    pub fn word_count(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.data().len())
    }
}

fn read_state(buffer: &mut FrameBuffer) -> Result<u32> {
    let state = buffer.read_varint()?;
    if state < 0 {
        return Err(ProtocolError::invalid_data(format!("negative state id {}", state)));
    }
    Ok(state as u32)
}

fn read_word_count(buffer: &mut FrameBuffer, max: usize) -> Result<usize> {
    let words = buffer.read_varint()?;
    if words < 0 {
        return Err(ProtocolError::invalid_data(format!("negative word count {}", words)));
    }
    let words = words as usize;
    // anything past the expected count cannot be valid; reject before reading
    if words > max.max(BitStorage::words_for(BitStorage::MAX_BITS, 4096, Packing::Compact)) {
        return Err(ProtocolError::ArrayTooLong {
            length: words,
            max,
        });
    }
    Ok(words)
}

fn read_palette(buffer: &mut FrameBuffer, kind: PaletteType, bits: u8) -> Result<Palette> {
    let mut palette = if bits <= kind.max_bits_for_list() {
        Palette::list(kind.list_bits(bits))
    } else if bits <= kind.max_bits_for_map() {
        Palette::map(bits)
    } else {
        return Ok(Palette::Global { bits });
    };

    let length = buffer.read_varint()?;
    let capacity = 1usize << palette.bits();
    if length < 0 || length as usize > capacity {
        return Err(ProtocolError::invalid_data(format!(
            "palette length {} does not fit {} bits",
            length,
            palette.bits()
        )));
    }
    for _ in 0..length {
        let state = read_state(buffer)?;
        if palette.state_to_id(state).is_none() {
            return Err(ProtocolError::invalid_data("palette overflow"));
        }
    }
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample_states(distinct: u32) -> Vec<u32> {
        (0..4096u32).map(|i| (i * 7 + i / 16) % distinct).collect()
    }

    fn formats() -> Vec<PaletteFormat> {
        [
            ProtocolVersion::V_1_12_2,
            ProtocolVersion::V_1_16,
            ProtocolVersion::V_1_18,
            ProtocolVersion::V_1_21_5,
        ]
        .into_iter()
        .map(PaletteFormat::for_version)
        .collect()
    }

    #[test]
    fn test_format_by_version() {
        let legacy = PaletteFormat::for_version(ProtocolVersion::V_1_12_2);
        assert_eq!(legacy.packing, Packing::Compact);
        assert!(legacy.length_prefix);
        assert!(!legacy.allow_singleton);

        let modern = PaletteFormat::for_version(ProtocolVersion::V_1_18);
        assert_eq!(modern.packing, Packing::Aligned);
        assert!(modern.length_prefix);
        assert!(modern.allow_singleton);

        assert!(!PaletteFormat::for_version(ProtocolVersion::V_1_21_5).length_prefix);
    }

    #[test]
    fn test_index_layout() {
        assert_eq!(PaletteType::Chunk.index(1, 0, 0), 1);
        assert_eq!(PaletteType::Chunk.index(0, 0, 1), 16);
        assert_eq!(PaletteType::Chunk.index(0, 1, 0), 256);
        assert_eq!(PaletteType::Chunk.index(15, 15, 15), 4095);
        assert_eq!(PaletteType::Biome.index(3, 3, 3), 63);
        assert_eq!(PaletteType::Biome.index(0, 1, 0), 16);
    }

    #[test]
    #[should_panic(expected = "outside a 16-wide")]
    fn test_index_rejects_out_of_range_axis() {
        // would otherwise alias the cell at (0, 0, 1)
        PaletteType::Chunk.index(16, 0, 0);
    }

    #[test]
    #[should_panic(expected = "outside a 4-wide")]
    fn test_biome_index_rejects_out_of_range_axis() {
        DataPalette::new(PaletteType::Biome).get(0, 4, 0);
    }

    #[test]
    fn test_new_container_is_air() {
        let container = DataPalette::new(PaletteType::Chunk);
        assert_eq!(container.get(3, 4, 5), 0);
        assert_eq!(container.bits_per_entry(), 4);
        assert!(container.states().iter().all(|s| *s == 0));
    }

    #[test]
    fn test_set_returns_previous_state() {
        let mut container = DataPalette::new(PaletteType::Chunk);
        assert_eq!(container.set(1, 2, 3, 9), 0);
        assert_eq!(container.set(1, 2, 3, 10), 9);
        assert_eq!(container.get(1, 2, 3), 10);
        assert_eq!(container.get(0, 0, 0), 0);
    }

    #[test]
    fn test_strategy_growth() {
        let mut container = DataPalette::new(PaletteType::Chunk);
        for state in 1..16 {
            container.set(state as usize, 0, 0, state);
        }
        assert_eq!(container.strategy(), Strategy::List);
        assert_eq!(container.bits_per_entry(), 4);

        container.set(0, 1, 0, 100);
        assert_eq!(container.strategy(), Strategy::Map);
        assert_eq!(container.bits_per_entry(), 5);

        for state in 0..300u32 {
            container.set((state % 16) as usize, 2 + (state / 256) as usize, ((state / 16) % 16) as usize, 1000 + state);
        }
        assert_eq!(container.strategy(), Strategy::Global);
        assert_eq!(container.bits_per_entry(), 15);
        assert_eq!(container.get(0, 1, 0), 100);
        assert_eq!(container.get(5, 0, 0), 5);
        assert_eq!(container.get(3, 2, 2), 1035);
    }

    #[test]
    fn test_global_widens_for_large_states() {
        let mut container = DataPalette::new(PaletteType::Biome);
        for state in 0..9u32 {
            container.set(state as usize % 4, state as usize / 4, 0, state);
        }
        assert_eq!(container.strategy(), Strategy::Global);
        assert_eq!(container.bits_per_entry(), 6);

        container.set(3, 3, 3, 1 << 20);
        assert_eq!(container.bits_per_entry(), 21);
        assert_eq!(container.get(3, 3, 3), 1 << 20);
        assert_eq!(container.get(0, 2, 0), 8);
    }

    #[test]
    fn test_resize_matches_one_pass_encoding() {
        let target = sample_states(40);
        let mut incremental = DataPalette::new(PaletteType::Chunk);
        for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    let index = PaletteType::Chunk.index(x, y, z);
                    incremental.set(x, y, z, target[index]);
                }
            }
        }
        let one_pass = DataPalette::from_states(PaletteType::Chunk, &target, Packing::Aligned).unwrap();

        assert_eq!(incremental.states(), target);
        assert_eq!(one_pass.states(), target);
        assert_eq!(incremental.bits_per_entry(), one_pass.bits_per_entry());
    }

    #[test]
    fn test_from_states_strategies() {
        let single = DataPalette::from_states(PaletteType::Chunk, &vec![7; 4096], Packing::Aligned).unwrap();
        assert_eq!(single.strategy(), Strategy::Singleton);
        assert_eq!(single.get(15, 15, 15), 7);

        let two = DataPalette::from_states(PaletteType::Chunk, &sample_states(2), Packing::Aligned).unwrap();
        assert_eq!(two.strategy(), Strategy::List);
        assert_eq!(two.bits_per_entry(), 4);

        let two_biomes = DataPalette::from_states(PaletteType::Biome, &vec![1, 2].repeat(32), Packing::Aligned).unwrap();
        assert_eq!(two_biomes.bits_per_entry(), 1);

        let many = DataPalette::from_states(PaletteType::Chunk, &sample_states(4096), Packing::Aligned).unwrap();
        assert_eq!(many.strategy(), Strategy::Global);

        assert_matches!(
            DataPalette::from_states(PaletteType::Biome, &[0; 10], Packing::Aligned),
            Err(ProtocolError::InvalidData(_))
        );
    }

    #[test]
    fn test_wire_round_trip_every_strategy_and_format() {
        let arrays = vec![vec![3; 4096], sample_states(2), sample_states(200), sample_states(4096)];
        for states in arrays {
            for format in formats() {
                let container = DataPalette::from_states(PaletteType::Chunk, &states, format.packing).unwrap();
                let mut buffer = FrameBuffer::new();
                container.write(&mut buffer, format);
                buffer.write_u8(0xEE);

                let decoded = DataPalette::read(&mut buffer, PaletteType::Chunk, format).unwrap();
                assert_eq!(decoded.states(), states, "{:?}", format);
                assert_eq!(buffer.read_u8().unwrap(), 0xEE, "{:?} consumed wrong length", format);
            }
        }
    }

    #[test]
    fn test_singleton_wire_layout() {
        let container = DataPalette::from_states(PaletteType::Biome, &[300; 64], Packing::Aligned).unwrap();

        let mut prefixed = FrameBuffer::new();
        container.write(&mut prefixed, PaletteFormat::for_version(ProtocolVersion::V_1_18));
        assert_eq!(prefixed.as_slice(), &[0x00, 0xAC, 0x02, 0x00]);

        let mut bare = FrameBuffer::new();
        container.write(&mut bare, PaletteFormat::for_version(ProtocolVersion::V_1_21_5));
        assert_eq!(bare.as_slice(), &[0x00, 0xAC, 0x02]);
    }

    #[test]
    fn test_singleton_expanded_when_unsupported() {
        let container = DataPalette::from_states(PaletteType::Chunk, &[1; 4096], Packing::Aligned).unwrap();
        let format = PaletteFormat::for_version(ProtocolVersion::V_1_16);
        let mut buffer = FrameBuffer::new();
        container.write(&mut buffer, format);

        // bits, palette length, palette entry, word count, then 256 zero words
        assert_eq!(&buffer.as_slice()[..5], &[4, 1, 1, 0x80, 0x02]);
        assert_eq!(buffer.writer_index(), 5 + 256 * 8);

        let decoded = DataPalette::read(&mut buffer, PaletteType::Chunk, format).unwrap();
        assert_eq!(decoded.strategy(), Strategy::List);
        assert!(decoded.states().iter().all(|s| *s == 1));
    }

    #[test]
    fn test_compact_and_aligned_differ_on_the_wire() {
        let states = sample_states(20);
        let container = DataPalette::from_states(PaletteType::Chunk, &states, Packing::Aligned).unwrap();

        let mut legacy = FrameBuffer::new();
        container.write(&mut legacy, PaletteFormat::for_version(ProtocolVersion::V_1_12_2));
        let mut modern = FrameBuffer::new();
        container.write(&mut modern, PaletteFormat::for_version(ProtocolVersion::V_1_16));
        // 5 bits: 320 compact words against 342 aligned ones
        assert_eq!(modern.writer_index() - legacy.writer_index(), 22 * 8);

        let decoded = DataPalette::read(&mut legacy, PaletteType::Chunk, PaletteFormat::for_version(ProtocolVersion::V_1_12_2)).unwrap();
        assert_eq!(decoded.states(), states);
    }

    #[test]
    fn test_read_rejects_bad_input() {
        let format = PaletteFormat::for_version(ProtocolVersion::V_1_20);

        // palette longer than 4 bits can index
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(17);
        assert_matches!(
            DataPalette::read(&mut buffer, PaletteType::Chunk, format),
            Err(ProtocolError::InvalidData(_))
        );

        // wrong word count
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(1);
        buffer.write_varint(0);
        buffer.write_varint(12);
        assert_matches!(
            DataPalette::read(&mut buffer, PaletteType::Chunk, format),
            Err(ProtocolError::InvalidData(_))
        );

        // hostile word count
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(1);
        buffer.write_varint(0);
        buffer.write_varint(i32::MAX);
        assert_matches!(
            DataPalette::read(&mut buffer, PaletteType::Chunk, format),
            Err(ProtocolError::ArrayTooLong { .. })
        );

        // truncated data
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(1);
        buffer.write_varint(0);
        buffer.write_varint(256);
        buffer.write_u64(0);
        assert_matches!(
            DataPalette::read(&mut buffer, PaletteType::Chunk, format),
            Err(ProtocolError::BufferUnderrun { .. })
        );
    }

    #[test]
    fn test_short_list_widened_to_palette_bits() {
        // a 2-bit block palette is read into the forced 4-bit list width
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(2);
        buffer.write_varint(2);
        buffer.write_varint(0);
        buffer.write_varint(5);
        buffer.write_varint(128);
        buffer.write_u64(0b01);
        for _ in 1..128 {
            buffer.write_u64(0);
        }
        let mut container = DataPalette::read(&mut buffer, PaletteType::Chunk, PaletteFormat::for_version(ProtocolVersion::V_1_20)).unwrap();
        assert_eq!(container.bits_per_entry(), 4);
        assert_eq!(container.get(0, 0, 0), 5);
        assert_eq!(container.get(1, 0, 0), 0);

        for state in 10..20 {
            container.set(state as usize - 8, 0, 0, state);
        }
        assert_eq!(container.get(0, 0, 0), 5);
        assert_eq!(container.get(11, 0, 0), 19);
    }
}
