//! Fixed-field rule and UDT records (§6 "Per-rule records" / "Per-UDT records").

use crate::width::UintWidth;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RuleRecord {
    pub index: u64,
    pub pppt_index: u64,
    pub name_offset: u64,
    pub opcode_offset: u64,
    pub opcode_count: u64,
    pub may_empty: bool,
}

impl RuleRecord {
    pub fn encode(&self, uint: UintWidth, out: &mut Vec<u8>) {
        uint.write(self.index, out);
        uint.write(self.pppt_index, out);
        uint.write(self.name_offset, out);
        uint.write(self.opcode_offset, out);
        uint.write(self.opcode_count, out);
        uint.write(self.may_empty as u64, out);
    }

    pub fn decode(uint: UintWidth, bytes: &[u8]) -> (Self, usize) {
        let w = uint.bytes();
        let field = |i: usize| uint.read(&bytes[i * w..]);
        let record = Self {
            index: field(0),
            pppt_index: field(1),
            name_offset: field(2),
            opcode_offset: field(3),
            opcode_count: field(4),
            may_empty: field(5) != 0,
        };
        (record, 6 * w)
    }

    pub const FIELD_COUNT: usize = 6;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UdtRecord {
    pub index: u64,
    pub name_offset: u64,
    pub may_empty: bool,
}

impl UdtRecord {
    pub fn encode(&self, uint: UintWidth, out: &mut Vec<u8>) {
        uint.write(self.index, out);
        uint.write(self.name_offset, out);
        uint.write(self.may_empty as u64, out);
    }

    pub fn decode(uint: UintWidth, bytes: &[u8]) -> (Self, usize) {
        let w = uint.bytes();
        let field = |i: usize| uint.read(&bytes[i * w..]);
        let record = Self {
            index: field(0),
            name_offset: field(1),
            may_empty: field(2) != 0,
        };
        (record, 3 * w)
    }

    pub const FIELD_COUNT: usize = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_record_round_trips() {
        let rec = RuleRecord {
            index: 1,
            pppt_index: 2,
            name_offset: 3,
            opcode_offset: 4,
            opcode_count: 5,
            may_empty: true,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::Four, &mut buf);
        assert_eq!(buf.len(), RuleRecord::FIELD_COUNT * 4);
        let (decoded, consumed) = RuleRecord::decode(UintWidth::Four, &buf);
        assert_eq!(decoded, rec);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn udt_record_round_trips() {
        let rec = UdtRecord {
            index: 0,
            name_offset: 9,
            may_empty: false,
        };
        let mut buf = Vec::new();
        rec.encode(UintWidth::One, &mut buf);
        let (decoded, _) = UdtRecord::decode(UintWidth::One, &buf);
        assert_eq!(decoded, rec);
    }
}
