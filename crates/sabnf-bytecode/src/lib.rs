//! Binary encoding of the SABNF initialization image (§6).
//!
//! This crate owns the wire format only: integer width selection, the
//! header, per-rule and per-UDT records, opcode records, the PPPT cell
//! table, and final image assembly. It has no opinion on how a grammar was
//! compiled; `sabnf-compiler` builds an `ImageSections` and hands it here.

pub mod header;
pub mod image;
pub mod opcode;
pub mod pppt;
pub mod records;
pub mod width;

pub use header::{Header, HEADER_UINT_FIELD_COUNT};
pub use image::{build_image, BytecodeError, ImageSections};
pub use opcode::{BkrCase, BkrMode, OpRecord, OpTag, REP_MAX_UNBOUNDED};
pub use pppt::{PpptCell, PpptTable};
pub use records::{RuleRecord, UdtRecord};
pub use width::UintWidth;
