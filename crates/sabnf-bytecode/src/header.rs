//! Initialization image header (§6.1, bit-exact).
//!
//! The header is a sequence of `sizeof_uint`-width little-endian integers,
//! plus one fixed 4-byte CRC-32 checksum field appended after them
//! regardless of `sizeof_uint`. All offsets it carries are in units of
//! `sizeof_uint`, measured from the start of the image.

use crate::width::UintWidth;

/// Number of `sizeof_uint`-width fields in the header, not counting the
/// trailing fixed-width checksum.
pub const HEADER_UINT_FIELD_COUNT: usize = 22;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Header {
    pub size_in_units: u64,
    pub achar_min: u64,
    pub achar_max: u64,
    pub sizeof_achar: u64,
    pub uint_max: u64,
    pub sizeof_uint: u64,
    pub rule_count: u64,
    pub udt_count: u64,
    pub opcode_count: u64,
    pub pppt_map_count: u64,
    pub pppt_map_size: u64,
    pub version_offset: u64,
    pub copyright_offset: u64,
    pub license_offset: u64,
    pub child_list_offset: u64,
    pub child_list_length: u64,
    pub rules_offset: u64,
    pub rules_length: u64,
    pub udts_offset: u64,
    pub udts_length: u64,
    pub opcodes_offset: u64,
    pub opcodes_length: u64,
    /// CRC-32 of every byte of the image following the header. Stored at a
    /// fixed 4-byte width; not scaled by `sizeof_uint`.
    pub checksum: u32,
}

impl Header {
    fn uint_fields(&self) -> [u64; HEADER_UINT_FIELD_COUNT] {
        [
            self.size_in_units,
            self.achar_min,
            self.achar_max,
            self.sizeof_achar,
            self.uint_max,
            self.sizeof_uint,
            self.rule_count,
            self.udt_count,
            self.opcode_count,
            self.pppt_map_count,
            self.pppt_map_size,
            self.version_offset,
            self.copyright_offset,
            self.license_offset,
            self.child_list_offset,
            self.child_list_length,
            self.rules_offset,
            self.rules_length,
            self.udts_offset,
            self.udts_length,
            self.opcodes_offset,
            self.opcodes_length,
        ]
    }

    fn from_uint_fields(fields: [u64; HEADER_UINT_FIELD_COUNT], checksum: u32) -> Self {
        Self {
            size_in_units: fields[0],
            achar_min: fields[1],
            achar_max: fields[2],
            sizeof_achar: fields[3],
            uint_max: fields[4],
            sizeof_uint: fields[5],
            rule_count: fields[6],
            udt_count: fields[7],
            opcode_count: fields[8],
            pppt_map_count: fields[9],
            pppt_map_size: fields[10],
            version_offset: fields[11],
            copyright_offset: fields[12],
            license_offset: fields[13],
            child_list_offset: fields[14],
            child_list_length: fields[15],
            rules_offset: fields[16],
            rules_length: fields[17],
            udts_offset: fields[18],
            udts_length: fields[19],
            opcodes_offset: fields[20],
            opcodes_length: fields[21],
            checksum,
        }
    }

    /// Serialized byte length of the header at the given `sizeof_uint`.
    pub fn byte_len(uint: UintWidth) -> usize {
        HEADER_UINT_FIELD_COUNT * uint.bytes() + 4
    }

    pub fn encode(&self, uint: UintWidth) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::byte_len(uint));
        for field in self.uint_fields() {
            uint.write(field, &mut out);
        }
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out
    }

    pub fn decode(uint: UintWidth, bytes: &[u8]) -> Self {
        let mut fields = [0u64; HEADER_UINT_FIELD_COUNT];
        let mut offset = 0;
        for field in &mut fields {
            *field = uint.read(&bytes[offset..]);
            offset += uint.bytes();
        }
        let checksum = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        Self::from_uint_fields(fields, checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let header = Header {
            size_in_units: 100,
            achar_min: 65,
            achar_max: 122,
            sizeof_achar: 1,
            uint_max: 1000,
            sizeof_uint: 2,
            rule_count: 3,
            udt_count: 0,
            opcode_count: 5,
            pppt_map_count: 8,
            pppt_map_size: 59,
            version_offset: 1,
            copyright_offset: 2,
            license_offset: 3,
            child_list_offset: 4,
            child_list_length: 6,
            rules_offset: 10,
            rules_length: 18,
            udts_offset: 28,
            udts_length: 0,
            opcodes_offset: 28,
            opcodes_length: 15,
            checksum: 0xDEAD_BEEF,
        };

        let bytes = header.encode(UintWidth::Two);
        assert_eq!(bytes.len(), Header::byte_len(UintWidth::Two));
        let decoded = Header::decode(UintWidth::Two, &bytes);
        assert_eq!(decoded, header);
    }

    #[test]
    fn checksum_is_always_four_bytes_regardless_of_uint_width() {
        let header = Header {
            checksum: 42,
            ..Header::default()
        };
        let narrow = header.encode(UintWidth::One);
        let wide = header.encode(UintWidth::Eight);
        assert_eq!(&narrow[narrow.len() - 4..], &42u32.to_le_bytes());
        assert_eq!(&wide[wide.len() - 4..], &42u32.to_le_bytes());
    }
}
