//! Opcode record layouts (§6.2 of the initialization image format).
//!
//! Every record is a one-byte tag followed by a tag-dependent, fixed-field
//! payload, each field written at the image's chosen `sizeof_uint` width.
//! There is no inheritance or virtual dispatch here: the emitter writes raw
//! records and a runtime dispatches purely on the tag byte.

use crate::width::UintWidth;

/// The exhaustive set of opcode variants.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum OpTag {
    Alt = 0,
    Cat = 1,
    Rep = 2,
    Rnm = 3,
    Tls = 4,
    Tbs = 5,
    Trg = 6,
    Udt = 7,
    Bkr = 8,
    And = 9,
    Not = 10,
    Bka = 11,
    Bkn = 12,
    Abg = 13,
    Aen = 14,
}

impl OpTag {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => OpTag::Alt,
            1 => OpTag::Cat,
            2 => OpTag::Rep,
            3 => OpTag::Rnm,
            4 => OpTag::Tls,
            5 => OpTag::Tbs,
            6 => OpTag::Trg,
            7 => OpTag::Udt,
            8 => OpTag::Bkr,
            9 => OpTag::And,
            10 => OpTag::Not,
            11 => OpTag::Bka,
            12 => OpTag::Bkn,
            13 => OpTag::Abg,
            14 => OpTag::Aen,
            other => panic!("invalid opcode tag byte {other}"),
        }
    }
}

/// Case sensitivity of a back-reference match.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BkrCase {
    Sensitive = 0,
    Insensitive = 1,
}

/// Scope a back-reference searches for its most recent capture.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BkrMode {
    Universal = 0,
    ParentFrame = 1,
}

/// `max` value of `REP` meaning "unbounded".
pub const REP_MAX_UNBOUNDED: u64 = u64::MAX;

/// One opcode record, with every index already resolved to its final
/// numeric value. This is the emitter's view of an opcode, not the
/// compiler's in-progress tree — by the time a record reaches this type,
/// normalization (§4.2.6) has already happened.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpRecord {
    Alt {
        pppt_index: u64,
        child_list_offset: u64,
        child_count: u64,
    },
    Cat {
        pppt_index: u64,
        child_list_offset: u64,
        child_count: u64,
    },
    Rep {
        pppt_index: u64,
        min: u64,
        max: u64,
    },
    Rnm {
        rule_pppt_index: u64,
        rule_index: u64,
    },
    Tls {
        pppt_index: u64,
        achar_table_offset: u64,
        achar_length: u64,
    },
    Tbs {
        pppt_index: u64,
        achar_table_offset: u64,
        achar_length: u64,
    },
    Trg {
        pppt_index: u64,
        min: u64,
        max: u64,
    },
    Udt {
        udt_index: u64,
        may_empty: bool,
    },
    Bkr {
        target_index: u64,
        case: BkrCase,
        mode: BkrMode,
    },
    And {
        pppt_index: u64,
    },
    Not {
        pppt_index: u64,
    },
    Bka,
    Bkn,
    Abg,
    Aen,
}

impl OpRecord {
    pub fn tag(&self) -> OpTag {
        match self {
            OpRecord::Alt { .. } => OpTag::Alt,
            OpRecord::Cat { .. } => OpTag::Cat,
            OpRecord::Rep { .. } => OpTag::Rep,
            OpRecord::Rnm { .. } => OpTag::Rnm,
            OpRecord::Tls { .. } => OpTag::Tls,
            OpRecord::Tbs { .. } => OpTag::Tbs,
            OpRecord::Trg { .. } => OpTag::Trg,
            OpRecord::Udt { .. } => OpTag::Udt,
            OpRecord::Bkr { .. } => OpTag::Bkr,
            OpRecord::And { .. } => OpTag::And,
            OpRecord::Not { .. } => OpTag::Not,
            OpRecord::Bka => OpTag::Bka,
            OpRecord::Bkn => OpTag::Bkn,
            OpRecord::Abg => OpTag::Abg,
            OpRecord::Aen => OpTag::Aen,
        }
    }

    /// Every `u64` field this record carries, in on-wire field order, after
    /// the tag byte. Booleans and enums are folded into 0/1 fields.
    fn fields(&self) -> Vec<u64> {
        match *self {
            OpRecord::Alt {
                pppt_index,
                child_list_offset,
                child_count,
            }
            | OpRecord::Cat {
                pppt_index,
                child_list_offset,
                child_count,
            } => vec![pppt_index, child_list_offset, child_count],
            OpRecord::Rep {
                pppt_index,
                min,
                max,
            }
            | OpRecord::Trg {
                pppt_index,
                min,
                max,
            } => vec![pppt_index, min, max],
            OpRecord::Rnm {
                rule_pppt_index,
                rule_index,
            } => vec![rule_pppt_index, rule_index],
            OpRecord::Tls {
                pppt_index,
                achar_table_offset,
                achar_length,
            }
            | OpRecord::Tbs {
                pppt_index,
                achar_table_offset,
                achar_length,
            } => vec![pppt_index, achar_table_offset, achar_length],
            OpRecord::Udt {
                udt_index,
                may_empty,
            } => vec![udt_index, may_empty as u64],
            OpRecord::Bkr {
                target_index,
                case,
                mode,
            } => vec![target_index, case as u64, mode as u64],
            OpRecord::And { pppt_index } | OpRecord::Not { pppt_index } => vec![pppt_index],
            OpRecord::Bka | OpRecord::Bkn | OpRecord::Abg | OpRecord::Aen => vec![],
        }
    }

    /// Append this record's tag byte and payload fields to `out`.
    ///
    /// `REP`'s unbounded-max sentinel (`REP_MAX_UNBOUNDED`, logically
    /// `u64::MAX`) is rewritten to this image's own `uint.max_value()` so it
    /// fits the chosen width instead of forcing every image to 8-byte
    /// integers just to represent "unbounded".
    pub fn encode(&self, uint: UintWidth, out: &mut Vec<u8>) {
        out.push(self.tag() as u8);
        for field in self.fields() {
            let field = if field == REP_MAX_UNBOUNDED {
                uint.max_value()
            } else {
                field
            };
            uint.write(field, out);
        }
    }

    /// Number of payload fields a tag carries (excludes the tag byte itself).
    fn field_count(tag: OpTag) -> usize {
        match tag {
            OpTag::Alt | OpTag::Cat => 3,
            OpTag::Rep | OpTag::Trg => 3,
            OpTag::Rnm => 2,
            OpTag::Tls | OpTag::Tbs => 3,
            OpTag::Udt => 2,
            OpTag::Bkr => 3,
            OpTag::And | OpTag::Not => 1,
            OpTag::Bka | OpTag::Bkn | OpTag::Abg | OpTag::Aen => 0,
        }
    }

    /// Decode one record starting at `bytes[0]` (the tag byte). Returns the
    /// record and the number of bytes consumed.
    pub fn decode(uint: UintWidth, bytes: &[u8]) -> (OpRecord, usize) {
        let tag = OpTag::from_byte(bytes[0]);
        let count = Self::field_count(tag);
        let mut fields = Vec::with_capacity(count);
        let mut offset = 1;
        for _ in 0..count {
            fields.push(uint.read(&bytes[offset..]));
            offset += uint.bytes();
        }

        let record = match tag {
            OpTag::Alt => OpRecord::Alt {
                pppt_index: fields[0],
                child_list_offset: fields[1],
                child_count: fields[2],
            },
            OpTag::Cat => OpRecord::Cat {
                pppt_index: fields[0],
                child_list_offset: fields[1],
                child_count: fields[2],
            },
            OpTag::Rep => OpRecord::Rep {
                pppt_index: fields[0],
                min: fields[1],
                max: if fields[2] == uint.max_value() {
                    REP_MAX_UNBOUNDED
                } else {
                    fields[2]
                },
            },
            OpTag::Trg => OpRecord::Trg {
                pppt_index: fields[0],
                min: fields[1],
                max: fields[2],
            },
            OpTag::Rnm => OpRecord::Rnm {
                rule_pppt_index: fields[0],
                rule_index: fields[1],
            },
            OpTag::Tls => OpRecord::Tls {
                pppt_index: fields[0],
                achar_table_offset: fields[1],
                achar_length: fields[2],
            },
            OpTag::Tbs => OpRecord::Tbs {
                pppt_index: fields[0],
                achar_table_offset: fields[1],
                achar_length: fields[2],
            },
            OpTag::Udt => OpRecord::Udt {
                udt_index: fields[0],
                may_empty: fields[1] != 0,
            },
            OpTag::Bkr => OpRecord::Bkr {
                target_index: fields[0],
                case: if fields[1] == 0 {
                    BkrCase::Sensitive
                } else {
                    BkrCase::Insensitive
                },
                mode: if fields[2] == 0 {
                    BkrMode::Universal
                } else {
                    BkrMode::ParentFrame
                },
            },
            OpTag::And => OpRecord::And {
                pppt_index: fields[0],
            },
            OpTag::Not => OpRecord::Not {
                pppt_index: fields[0],
            },
            OpTag::Bka => OpRecord::Bka,
            OpTag::Bkn => OpRecord::Bkn,
            OpTag::Abg => OpRecord::Abg,
            OpTag::Aen => OpRecord::Aen,
        };
        (record, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_round_trips_through_encode_decode() {
        let rec = OpRecord::Alt {
            pppt_index: 3,
            child_list_offset: 10,
            child_count: 2,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::Two, &mut buf);
        assert_eq!(buf.len(), 1 + 3 * 2);
        let (decoded, consumed) = OpRecord::decode(UintWidth::Two, &buf);
        assert_eq!(decoded, rec);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn no_payload_tags_are_one_byte() {
        for rec in [OpRecord::Bka, OpRecord::Bkn, OpRecord::Abg, OpRecord::Aen] {
            let mut buf = Vec::new();
            rec.encode(UintWidth::Four, &mut buf);
            assert_eq!(buf.len(), 1);
        }
    }

    #[test]
    fn bkr_round_trips_case_and_mode() {
        let rec = OpRecord::Bkr {
            target_index: 1,
            case: BkrCase::Insensitive,
            mode: BkrMode::ParentFrame,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::One, &mut buf);
        let (decoded, _) = OpRecord::decode(UintWidth::One, &buf);
        assert_eq!(decoded, rec);
    }

    #[test]
    fn rep_unbounded_sentinel_fits_a_narrow_width() {
        let rec = OpRecord::Rep {
            pppt_index: 0,
            min: 1,
            max: REP_MAX_UNBOUNDED,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::One, &mut buf);
        assert_eq!(buf.len(), 1 + 3); // tag + 3 one-byte fields, no overflow panic
        let (decoded, _) = OpRecord::decode(UintWidth::One, &buf);
        assert_eq!(decoded, rec);
    }

    #[test]
    fn rep_unbounded_sentinel_survives_round_trip() {
        let rec = OpRecord::Rep {
            pppt_index: 0,
            min: 1,
            max: REP_MAX_UNBOUNDED,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::Eight, &mut buf);
        let (decoded, _) = OpRecord::decode(UintWidth::Eight, &buf);
        assert_eq!(decoded, rec);
    }
}
