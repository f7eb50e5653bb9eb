//! Bridges the compiler's `GrammarIr` to the wire-format sections the
//! `sabnf-bytecode` crate knows how to lay out (§4.5).
//!
//! This module owns no on-wire knowledge of its own: it resolves every
//! logical reference (`OpId`, `RuleId`, `UdtId`, `Symbol`) to the plain
//! `u64`s and offsets `ImageSections`/`build_image` expect, and leaves width
//! selection and byte layout to `sabnf_bytecode::build_image`.

use sabnf_bytecode::{ImageSections, OpRecord, RuleRecord, UdtRecord};

use crate::ir::{BkrTarget, GrammarIr, OpKind};
use crate::pppt::PpptBuild;

/// `BKR`'s target index space is shared between rules and UDTs: `0..rule_count`
/// names a rule, `rule_count..` names a UDT via `index - rule_count` (§3.1;
/// Open Question resolution, DESIGN.md).
fn bkr_target_index(target: &BkrTarget, rule_count: u64) -> u64 {
    match target {
        BkrTarget::Rule(rule) => rule.as_u32() as u64,
        BkrTarget::Udt(udt) => rule_count + udt.as_u32() as u64,
    }
}

pub fn emit(ir: &GrammarIr, pppt: PpptBuild) -> ImageSections {
    let rule_count = ir.rules.len() as u64;

    let mut child_list: Vec<u64> = Vec::new();
    let mut achars: Vec<u64> = Vec::new();
    let mut opcodes: Vec<OpRecord> = Vec::with_capacity(ir.opcodes.len());

    for op in &ir.opcodes {
        let record = match &op.kind {
            OpKind::Alt(children) => {
                let child_list_offset = child_list.len() as u64;
                child_list.extend(children.iter().map(|c| c.as_u32() as u64));
                OpRecord::Alt {
                    pppt_index: op.pppt_index.expect("ALT carries a map") as u64,
                    child_list_offset,
                    child_count: children.len() as u64,
                }
            }
            OpKind::Cat(children) => {
                let child_list_offset = child_list.len() as u64;
                child_list.extend(children.iter().map(|c| c.as_u32() as u64));
                OpRecord::Cat {
                    pppt_index: op.pppt_index.expect("CAT carries a map") as u64,
                    child_list_offset,
                    child_count: children.len() as u64,
                }
            }
            OpKind::Rep { min, max, .. } => OpRecord::Rep {
                pppt_index: op.pppt_index.expect("REP carries a map") as u64,
                min: *min,
                max: *max,
            },
            OpKind::Rnm { rule } => OpRecord::Rnm {
                rule_pppt_index: ir.rule(*rule).pppt_index.expect("analyzed rule carries a map") as u64,
                rule_index: rule.as_u32() as u64,
            },
            OpKind::Tls(text) => {
                let achar_table_offset = achars.len() as u64;
                achars.extend(text.chars().map(|c| c as u64));
                OpRecord::Tls {
                    pppt_index: op.pppt_index.expect("TLS carries a map") as u64,
                    achar_table_offset,
                    achar_length: text.chars().count() as u64,
                }
            }
            OpKind::Tbs(bytes) => {
                let achar_table_offset = achars.len() as u64;
                achars.extend(bytes.iter().map(|&b| b as u64));
                OpRecord::Tbs {
                    pppt_index: op.pppt_index.expect("TBS carries a map") as u64,
                    achar_table_offset,
                    achar_length: bytes.len() as u64,
                }
            }
            OpKind::Trg { min, max } => OpRecord::Trg {
                pppt_index: op.pppt_index.expect("TRG carries a map") as u64,
                min: *min,
                max: *max,
            },
            OpKind::Udt(udt) => OpRecord::Udt {
                udt_index: udt.as_u32() as u64,
                may_empty: ir.udt(*udt).may_empty,
            },
            OpKind::Bkr { target, case, mode } => OpRecord::Bkr {
                target_index: bkr_target_index(target, rule_count),
                case: *case,
                mode: *mode,
            },
            OpKind::And(_) => OpRecord::And {
                pppt_index: op.pppt_index.expect("AND carries a map") as u64,
            },
            OpKind::Not(_) => OpRecord::Not {
                pppt_index: op.pppt_index.expect("NOT carries a map") as u64,
            },
            OpKind::Bka(_) => OpRecord::Bka,
            OpKind::Bkn(_) => OpRecord::Bkn,
            OpKind::Abg => OpRecord::Abg,
            OpKind::Aen => OpRecord::Aen,
        };
        opcodes.push(record);
    }

    let (mut strings_blob, string_offsets) = ir.interner.to_blob();
    let mut resolve_or_empty = |sym: Option<sabnf_core::Symbol>| -> u64 {
        match sym {
            Some(s) => string_offsets[s.as_u32() as usize] as u64,
            None => {
                let offset = strings_blob.len() as u64;
                strings_blob.push(0);
                offset
            }
        }
    };
    let version_offset = resolve_or_empty(ir.version);
    let copyright_offset = resolve_or_empty(ir.copyright);
    let license_offset = resolve_or_empty(ir.license);

    let rules = ir
        .rules
        .iter()
        .map(|rule| RuleRecord {
            index: rule.id.as_u32() as u64,
            pppt_index: rule.pppt_index.expect("analyzed rule carries a map") as u64,
            name_offset: string_offsets[rule.name_symbol.as_u32() as usize] as u64,
            opcode_offset: rule.opcode_start.as_u32() as u64,
            opcode_count: rule.opcode_count as u64,
            may_empty: rule.may_empty,
        })
        .collect();

    let udts = ir
        .udts
        .iter()
        .map(|udt| UdtRecord {
            index: udt.id.as_u32() as u64,
            name_offset: string_offsets[udt.name_symbol.as_u32() as usize] as u64,
            may_empty: udt.may_empty,
        })
        .collect();

    let achar_min = pppt.achar_min;
    let achar_max = achar_min + pppt.map_size as u64 - 2;

    ImageSections {
        child_list,
        rules,
        udts,
        opcodes,
        achars,
        strings_blob,
        version_offset,
        copyright_offset,
        license_offset,
        pppt: Some(pppt.table),
        achar_min,
        achar_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Translator;
    use sabnf_bytecode::build_image;
    use sabnf_core::Span;

    fn span() -> Span {
        Span::new(0, 0)
    }

    fn grammar() -> sabnf_core::Grammar {
        crate::validate::validate(b"x\r\n", true).unwrap()
    }

    #[test]
    fn emits_a_buildable_image_for_a_trivial_grammar() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.tls_string("a", span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = crate::pppt::build(&mut ir, &[]).unwrap();

        let sections = emit(&ir, build);
        assert_eq!(sections.rules.len(), 1);
        assert_eq!(sections.achars, vec![b'a' as u64]);
        let image = build_image(&sections).unwrap();
        assert!(!image.is_empty());
    }

    #[test]
    fn bkr_targeting_a_udt_uses_the_shared_index_space_past_rule_count() {
        let g = grammar();
        let mut t = Translator::new(&g);
        t.rule_open("S", span());
        t.cat_open(span());
        t.udt("U", false, span());
        t.bkr("U", sabnf_bytecode::BkrCase::Sensitive, sabnf_bytecode::BkrMode::Universal, span());
        t.cat_close(span());
        t.rule_close(span());
        let mut ir = t.finish().unwrap();
        crate::analyze::analyze(&mut ir);
        let build = crate::pppt::build(&mut ir, &[]).unwrap();
        let sections = emit(&ir, build);

        let bkr = sections
            .opcodes
            .iter()
            .find_map(|op| match op {
                OpRecord::Bkr { target_index, .. } => Some(*target_index),
                _ => None,
            })
            .unwrap();
        assert_eq!(bkr, sections.rules.len() as u64);
    }
}
