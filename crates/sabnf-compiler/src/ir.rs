//! Logical, pre-serialization opcode tree (§3.1 data model).
//!
//! This is the compiler's own working model of a grammar: stable indices
//! everywhere, no owning pointers between rules, so mutually- and
//! self-recursive rules need nothing more exotic than a `Vec` plus indices.
//! The emitter (§4.5) is the only stage that knows how to turn this into
//! wire-format records; everything upstream of it (translate, analyze,
//! pppt) reads and annotates this tree.

use indexmap::IndexMap;
use sabnf_bytecode::{BkrCase, BkrMode};
use sabnf_core::{Interner, OpId, RuleId, Span, Symbol, UdtId};

/// Which table a `BKR` targets, still as a resolved stable index (the
/// shared rule/UDT index-space arithmetic of §3.1 is an emit-time concern).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BkrTarget {
    Rule(RuleId),
    Udt(UdtId),
}

/// One opcode. Exhaustive per §3.1.
#[derive(Clone, Debug)]
pub enum OpKind {
    Alt(Vec<OpId>),
    Cat(Vec<OpId>),
    Rep {
        min: u64,
        max: u64,
        child: OpId,
    },
    Rnm {
        rule: RuleId,
    },
    /// Case-insensitive literal. Text is already folded to lowercase; the
    /// runtime upper-lowers before comparing (§4.2.3).
    Tls(String),
    /// Case-sensitive literal, raw bytes.
    Tbs(Vec<u8>),
    Trg {
        min: u64,
        max: u64,
    },
    Udt(UdtId),
    Bkr {
        target: BkrTarget,
        case: BkrCase,
        mode: BkrMode,
    },
    And(OpId),
    Not(OpId),
    Bka(OpId),
    Bkn(OpId),
    Abg,
    Aen,
}

#[derive(Clone, Debug)]
pub struct OpNode {
    pub kind: OpKind,
    pub span: Span,
    /// PPPT map index, assigned by the PPPT builder (§4.4) to the opcodes
    /// that carry a map (`ALT`/`CAT`/`REP`/`TRG`/`TLS`/`TBS`/`AND`/`NOT`).
    pub pppt_index: Option<u32>,
}

/// The six attributes computed by the dependency/attribute analyzer (§4.3).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Attributes {
    pub left: bool,
    pub nested: bool,
    pub right: bool,
    pub cyclic: bool,
    pub empty: bool,
    pub finite: bool,
}

impl Attributes {
    /// "Empty-only" per §4.3: empty and none of the recursive attributes set.
    pub fn is_empty_only(self) -> bool {
        self.empty && !self.left && !self.nested && !self.right && !self.cyclic
    }

    /// A rule with any of these is fatally defective (§4.3 error set).
    pub fn is_fatal(self) -> bool {
        self.left || self.cyclic || !self.finite
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecursiveType {
    /// Non-recursive.
    N,
    /// Self- or simply-recursive, no mutual partner.
    R,
    /// Mutually recursive; carries the MR group number.
    Mr(u32),
}

#[derive(Clone, Debug)]
pub struct RuleIr {
    pub id: RuleId,
    pub name: String,
    pub name_symbol: Symbol,
    pub protected: bool,
    pub opcode_start: OpId,
    pub opcode_count: u32,
    /// Set by the semantic translator's `REP`/`TLS` empty-literal rules are
    /// not enough to know this; the authoritative value is written by the
    /// attribute analyzer (§4.3) after the SEST walk.
    pub may_empty: bool,
    pub attributes: Attributes,
    pub recursive_type: RecursiveType,
    pub refers_to: Vec<RuleId>,
    pub refers_to_udt: Vec<UdtId>,
    /// PPPT map index, assigned by the PPPT builder (§4.4).
    pub pppt_index: Option<u32>,
}

impl RuleIr {
    /// The rule's root opcode: by construction (§4.2.6, translate.rs) the
    /// last opcode of its contiguous range.
    pub fn root(&self) -> OpId {
        OpId::from_raw(self.opcode_start.as_u32() + self.opcode_count - 1)
    }
}

#[derive(Clone, Debug)]
pub struct UdtIr {
    pub id: UdtId,
    pub name: String,
    pub name_symbol: Symbol,
    pub may_empty: bool,
}

/// The translator's complete output: rules, UDTs, and the flattened,
/// per-session opcode stream (`OpId` is a position in `opcodes`, matching
/// the invariant documented on `sabnf_core::OpId`).
///
/// `interner` holds the grammar's string table: every rule/UDT name plus,
/// optionally, the version/copyright/license strings configured on the
/// translator (§4.5 emits this table as a null-terminated blob). It is a
/// separate table from the opcode stream's alphabet characters, which are
/// never interned (§4.2 step 3).
#[derive(Clone, Debug, Default)]
pub struct GrammarIr {
    pub rule_index: IndexMap<String, RuleId>,
    pub rules: Vec<RuleIr>,
    pub udt_index: IndexMap<String, UdtId>,
    pub udts: Vec<UdtIr>,
    pub opcodes: Vec<OpNode>,
    pub interner: Interner,
    pub version: Option<Symbol>,
    pub copyright: Option<Symbol>,
    pub license: Option<Symbol>,
}

impl GrammarIr {
    pub fn rule(&self, id: RuleId) -> &RuleIr {
        &self.rules[id.as_usize()]
    }

    pub fn rule_mut(&mut self, id: RuleId) -> &mut RuleIr {
        &mut self.rules[id.as_usize()]
    }

    pub fn udt(&self, id: UdtId) -> &UdtIr {
        &self.udts[id.as_usize()]
    }

    pub fn op(&self, id: OpId) -> &OpNode {
        &self.opcodes[id.as_usize()]
    }

    pub fn find_rule(&self, name: &str) -> Option<RuleId> {
        self.rule_index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn find_udt(&self, name: &str) -> Option<UdtId> {
        self.udt_index.get(&name.to_ascii_lowercase()).copied()
    }
}
