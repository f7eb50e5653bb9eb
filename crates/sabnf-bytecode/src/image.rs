//! Assembly of the final initialization image (§6 end to end).
//!
//! Every other module in this crate describes one section's on-wire shape;
//! this one lays the sections out in order, picks `sizeof_uint` /
//! `sizeof_achar`, fills in the header's offsets, and appends the trailing
//! CRC-32 checksum.

use crate::header::{Header, HEADER_UINT_FIELD_COUNT};
use crate::opcode::OpRecord;
use crate::pppt::PpptTable;
use crate::records::{RuleRecord, UdtRecord};
use crate::width::UintWidth;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("initialization image exceeds the addressable size for a sizeof_uint of 8 bytes")]
    Overflow,
}

/// Everything the emitter has decided about one grammar, in the shape the
/// image needs it: already-resolved offsets into the child-index table, the
/// string blob, and the alphabet-character table. This module does not
/// compute any of those offsets; it only lays out the bytes.
pub struct ImageSections {
    pub child_list: Vec<u64>,
    pub rules: Vec<RuleRecord>,
    pub udts: Vec<UdtRecord>,
    pub opcodes: Vec<OpRecord>,
    pub achars: Vec<u64>,
    pub strings_blob: Vec<u8>,
    pub version_offset: u64,
    pub copyright_offset: u64,
    pub license_offset: u64,
    pub pppt: Option<PpptTable>,
    pub achar_min: u64,
    pub achar_max: u64,
}

/// Build the final byte buffer: header, child-index table, rule records,
/// UDT records, opcode records, string table, alphabet-character table,
/// PPPT bytes, in that order, followed by a 4-byte little-endian CRC-32 of
/// everything after the header.
pub fn build_image(sections: &ImageSections) -> Result<Vec<u8>, BytecodeError> {
    let sizeof_achar = achar_width(sections);
    let sizeof_uint = uint_width(sections)?;

    // All header offsets are measured from the start of the image (§6.1),
    // not from the start of the body, so every offset below carries this
    // many units for the header that precedes the body.
    let header_len = Header::byte_len(sizeof_uint);
    let header_units = header_len as u64 / sizeof_uint.bytes() as u64;

    let mut body = Vec::new();
    for &value in &sections.child_list {
        sizeof_uint.write(value, &mut body);
    }
    let child_list_offset = header_units;
    let child_list_length = sections.child_list.len() as u64;

    let rules_offset = header_units + body.len() as u64 / sizeof_uint.bytes() as u64;
    for rule in &sections.rules {
        rule.encode(sizeof_uint, &mut body);
    }
    let rules_length = sections.rules.len() as u64;

    let udts_offset = header_units + body.len() as u64 / sizeof_uint.bytes() as u64;
    for udt in &sections.udts {
        udt.encode(sizeof_uint, &mut body);
    }
    let udts_length = sections.udts.len() as u64;

    let opcodes_offset = header_units + body.len() as u64 / sizeof_uint.bytes() as u64;
    for opcode in &sections.opcodes {
        opcode.encode(sizeof_uint, &mut body);
    }
    let opcode_count = sections.opcodes.len() as u64;

    body.extend_from_slice(&sections.strings_blob);

    for &achar in &sections.achars {
        sizeof_achar.write(achar, &mut body);
    }

    let (pppt_map_count, pppt_map_size) = match &sections.pppt {
        Some(table) => {
            body.extend_from_slice(&table.to_bytes());
            (table.map_count() as u64, table.map_size() as u64)
        }
        None => (0, 0),
    };

    let size_in_units = (header_len + body.len()) as u64 / sizeof_uint.bytes() as u64;
    if size_in_units > sizeof_uint.max_value() {
        return Err(BytecodeError::Overflow);
    }

    let checksum = crc32fast::hash(&body);

    let header = Header {
        size_in_units,
        achar_min: sections.achar_min,
        achar_max: sections.achar_max,
        sizeof_achar: sizeof_achar.bytes() as u64,
        uint_max: sizeof_uint.max_value(),
        sizeof_uint: sizeof_uint.bytes() as u64,
        rule_count: sections.rules.len() as u64,
        udt_count: sections.udts.len() as u64,
        opcode_count,
        pppt_map_count,
        pppt_map_size,
        version_offset: sections.version_offset,
        copyright_offset: sections.copyright_offset,
        license_offset: sections.license_offset,
        child_list_offset,
        child_list_length,
        rules_offset,
        rules_length,
        udts_offset,
        udts_length,
        opcodes_offset,
        opcodes_length: opcode_count,
        checksum,
    };

    let mut image = header.encode(sizeof_uint);
    debug_assert_eq!(image.len(), header_len);
    image.extend_from_slice(&body);
    Ok(image)
}

fn achar_width(sections: &ImageSections) -> UintWidth {
    UintWidth::for_max(sections.achar_max.max(sections.achar_min))
}

fn uint_width(sections: &ImageSections) -> Result<UintWidth, BytecodeError> {
    let mut max = HEADER_UINT_FIELD_COUNT as u64;
    max = max.max(sections.child_list.iter().copied().max().unwrap_or(0));
    max = max.max(sections.rules.len() as u64);
    max = max.max(sections.udts.len() as u64);
    max = max.max(sections.opcodes.len() as u64);
    max = max.max(sections.strings_blob.len() as u64);
    if let Some(table) = &sections.pppt {
        max = max.max(table.map_count() as u64).max(table.map_size() as u64);
    }
    Ok(UintWidth::for_max(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{OpRecord, REP_MAX_UNBOUNDED};
    use crate::pppt::{PpptCell, PpptTable};

    fn trivial_sections() -> ImageSections {
        ImageSections {
            child_list: vec![0, 1],
            rules: vec![RuleRecord {
                index: 0,
                pppt_index: 0,
                name_offset: 0,
                opcode_offset: 0,
                opcode_count: 1,
                may_empty: false,
            }],
            udts: vec![],
            opcodes: vec![OpRecord::Tls {
                pppt_index: 0,
                achar_table_offset: 0,
                achar_length: 1,
            }],
            achars: vec![b'a' as u64],
            strings_blob: b"rule\0".to_vec(),
            version_offset: 0,
            copyright_offset: 0,
            license_offset: 0,
            pppt: None,
            achar_min: b'a' as u64,
            achar_max: b'a' as u64,
        }
    }

    #[test]
    fn builds_a_well_formed_image() {
        let image = build_image(&trivial_sections()).unwrap();
        let width = UintWidth::for_max(HEADER_UINT_FIELD_COUNT as u64);
        let header = Header::decode(width, &image);
        assert_eq!(header.rule_count, 1);
        assert_eq!(header.udt_count, 0);
        assert_eq!(header.opcode_count, 1);
        assert_eq!(image.len() as u64, header.size_in_units * width.bytes() as u64);
    }

    #[test]
    fn checksum_covers_everything_after_the_header() {
        let sections = trivial_sections();
        let image = build_image(&sections).unwrap();
        let width = UintWidth::for_max(HEADER_UINT_FIELD_COUNT as u64);
        let header = Header::decode(width, &image);
        let body = &image[Header::byte_len(width)..];
        assert_eq!(header.checksum, crc32fast::hash(body));
    }

    #[test]
    fn section_offsets_are_measured_from_the_start_of_the_image() {
        let sections = trivial_sections();
        let image = build_image(&sections).unwrap();
        let width = UintWidth::for_max(HEADER_UINT_FIELD_COUNT as u64);
        let header = Header::decode(width, &image);

        // child_list_offset must land exactly at the first byte after the
        // header, not at byte 0 of the image.
        let header_len = Header::byte_len(width) as u64;
        assert_eq!(header.child_list_offset * width.bytes() as u64, header_len);

        // rules_offset must come after the child-index table, still counted
        // from the image start, not from the start of the body.
        let child_list_bytes = sections.child_list.len() as u64 * width.bytes() as u64;
        assert_eq!(
            header.rules_offset * width.bytes() as u64,
            header_len + child_list_bytes
        );
    }

    #[test]
    fn includes_pppt_bytes_when_present() {
        let mut sections = trivial_sections();
        let mut table = PpptTable::new(1, 2, sections.achar_min);
        table.set(0, 0, PpptCell::Match);
        table.set(0, 1, PpptCell::Empty);
        sections.pppt = Some(table);
        let image = build_image(&sections).unwrap();
        let width = UintWidth::for_max(HEADER_UINT_FIELD_COUNT as u64);
        let header = Header::decode(width, &image);
        assert_eq!(header.pppt_map_count, 1);
        assert_eq!(header.pppt_map_size, 2);
    }

    #[test]
    fn rep_sentinel_survives_a_full_image_round_trip() {
        let mut sections = trivial_sections();
        sections.opcodes.push(OpRecord::Rep {
            pppt_index: 0,
            min: 0,
            max: REP_MAX_UNBOUNDED,
        });
        assert!(build_image(&sections).is_ok());
    }
}
