//! Minimum-sufficient integer widths for the initialization image.
//!
//! Every integer field in a given image shares one of two widths: one for
//! alphabet characters (`sizeof_achar`), one for everything else
//! (`sizeof_uint`). Both are the smallest power-of-two byte width in
//! `{1, 2, 4, 8}` that holds the largest value that will actually appear.

/// A width in `{1, 2, 4, 8}` bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UintWidth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl UintWidth {
    /// Smallest width that can represent `max_value`.
    pub fn for_max(max_value: u64) -> Self {
        if max_value <= u8::MAX as u64 {
            UintWidth::One
        } else if max_value <= u16::MAX as u64 {
            UintWidth::Two
        } else if max_value <= u32::MAX as u64 {
            UintWidth::Four
        } else {
            UintWidth::Eight
        }
    }

    #[inline]
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            UintWidth::One => u8::MAX as u64,
            UintWidth::Two => u16::MAX as u64,
            UintWidth::Four => u32::MAX as u64,
            UintWidth::Eight => u64::MAX,
        }
    }

    /// Append `value` to `out` as `self.bytes()` little-endian bytes.
    ///
    /// # Panics
    /// Panics if `value` does not fit in this width; callers are expected
    /// to have already picked a width wide enough for every value they will
    /// write (that is the entire point of `for_max`).
    pub fn write(self, value: u64, out: &mut Vec<u8>) {
        assert!(
            value <= self.max_value(),
            "value {value} does not fit in {self:?}"
        );
        let bytes = value.to_le_bytes();
        out.extend_from_slice(&bytes[..self.bytes()]);
    }

    /// Read one value of this width, little-endian, from the front of `bytes`.
    pub fn read(self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf[..self.bytes()].copy_from_slice(&bytes[..self.bytes()]);
        u64::from_le_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_smallest_width_for_value() {
        assert_eq!(UintWidth::for_max(0), UintWidth::One);
        assert_eq!(UintWidth::for_max(255), UintWidth::One);
        assert_eq!(UintWidth::for_max(256), UintWidth::Two);
        assert_eq!(UintWidth::for_max(70_000), UintWidth::Four);
        assert_eq!(UintWidth::for_max(u32::MAX as u64 + 1), UintWidth::Eight);
    }

    #[test]
    fn round_trips_through_write_read() {
        for width in [UintWidth::One, UintWidth::Two, UintWidth::Four, UintWidth::Eight] {
            let value = width.max_value().min(12345);
            let mut buf = Vec::new();
            width.write(value, &mut buf);
            assert_eq!(buf.len(), width.bytes());
            assert_eq!(width.read(&buf), value);
        }
    }

    #[test]
    #[should_panic]
    fn write_panics_on_oversized_value() {
        let mut buf = Vec::new();
        UintWidth::One.write(1000, &mut buf);
    }
}
