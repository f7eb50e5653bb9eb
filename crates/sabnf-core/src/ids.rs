//! Stable index newtypes.
//!
//! Rules, UDTs, and opcodes never own pointers to each other. Every
//! cross-reference — `RNM`, `BKR`, a child-index entry, an attribute-array
//! slot — is a stable index into the owning session's flat tables. This is
//! what lets mutually- and self-recursive rules exist without ownership
//! cycles: a `Vec<Rule>` plus indices, never `Rc<RefCell<Rule>>`.

/// Index of a rule in the session's rule table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleId(u32);

impl RuleId {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Index of a user-defined terminal in the session's UDT table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct UdtId(u32);

impl UdtId {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Index of an opcode in the flattened, per-session opcode stream.
///
/// Opcodes are stored contiguously per rule; `OpId` is the position in that
/// shared stream, not a position within one rule's slice.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OpId(u32);

impl OpId {
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_raw() {
        let r = RuleId::from_raw(7);
        assert_eq!(r.as_u32(), 7);
        assert_eq!(r.as_usize(), 7usize);
    }

    #[test]
    fn ids_of_different_kinds_are_distinct_types() {
        let r = RuleId::from_raw(0);
        let u = UdtId::from_raw(0);
        // Distinct types; this would not compile: `r == u`.
        assert_eq!(r.as_u32(), u.as_u32());
    }
}
