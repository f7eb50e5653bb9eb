//! Partially-Predictive Parsing Table cells and their storage.

/// A single PPPT cell: the runtime's per-character prediction for one
/// opcode or rule.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum PpptCell {
    NoMatch = 0,
    Match = 1,
    Empty = 2,
    Active = 3,
}

impl PpptCell {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => PpptCell::NoMatch,
            1 => PpptCell::Match,
            2 => PpptCell::Empty,
            3 => PpptCell::Active,
            other => panic!("invalid PPPT cell byte {other}"),
        }
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A dense table of PPPT maps, one contiguous slice of `map_size` cells per
/// map. `map_size = achar_max - achar_min + 2`; the last cell of every map
/// is the synthetic end-of-input prediction.
#[derive(Clone, Debug)]
pub struct PpptTable {
    cells: Vec<PpptCell>,
    map_size: usize,
    achar_min: u64,
}

impl PpptTable {
    pub fn new(map_count: usize, map_size: usize, achar_min: u64) -> Self {
        Self {
            cells: vec![PpptCell::NoMatch; map_count * map_size],
            map_size,
            achar_min,
        }
    }

    #[inline]
    pub fn map_size(&self) -> usize {
        self.map_size
    }

    #[inline]
    pub fn map_count(&self) -> usize {
        self.cells.len() / self.map_size.max(1)
    }

    /// Byte offset (in cells) of a character within any map: `achar - achar_min`.
    #[inline]
    pub fn char_cell(&self, achar: u64) -> usize {
        (achar - self.achar_min) as usize
    }

    /// Offset of the synthetic end-of-input cell within any map.
    #[inline]
    pub fn eos_cell(&self) -> usize {
        self.map_size - 1
    }

    pub fn map(&self, map_index: usize) -> &[PpptCell] {
        let start = map_index * self.map_size;
        &self.cells[start..start + self.map_size]
    }

    pub fn map_mut(&mut self, map_index: usize) -> &mut [PpptCell] {
        let start = map_index * self.map_size;
        &mut self.cells[start..start + self.map_size]
    }

    pub fn set(&mut self, map_index: usize, cell: usize, value: PpptCell) {
        self.map_mut(map_index)[cell] = value;
    }

    pub fn copy_map(&mut self, dst_index: usize, src: &[PpptCell]) {
        self.map_mut(dst_index).copy_from_slice(src);
    }

    /// Serialize the whole table as one byte per cell, map by map.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.as_byte()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_starts_all_nomatch() {
        let table = PpptTable::new(2, 4, 10);
        assert!(table.map(0).iter().all(|&c| c == PpptCell::NoMatch));
        assert!(table.map(1).iter().all(|&c| c == PpptCell::NoMatch));
    }

    #[test]
    fn char_cell_and_eos_cell_are_consistent_with_map_size() {
        let table = PpptTable::new(1, 5, 97); // achar_min='a', map_size=5 => chars 97..=100 + eos
        assert_eq!(table.char_cell(97), 0);
        assert_eq!(table.char_cell(100), 3);
        assert_eq!(table.eos_cell(), 4);
    }

    #[test]
    fn set_and_serialize_round_trip() {
        let mut table = PpptTable::new(1, 3, 0);
        table.set(0, 0, PpptCell::Match);
        table.set(0, 1, PpptCell::Empty);
        table.set(0, 2, PpptCell::Active);
        assert_eq!(table.to_bytes(), vec![1, 2, 3]);
    }
}
