//! Input validator (§4.1): grammar byte charset and line-ending checks.

use sabnf_core::{Grammar, Line, LineEnding, LineIndex};

use crate::diagnostics::{DiagnosticEntry, Diagnostics, Stage};

/// Scan `bytes` once, building a `Grammar` (validated bytes + line index) or
/// the full set of charset/line-ending diagnostics found.
///
/// Every byte must be TAB, LF, CR, or printable ASCII (0x20..=0x7E). Under
/// `strict`, only `CRLF` line endings are accepted. A final line with no
/// terminator is always an error, strict or not (§9 resolved open question).
pub fn validate(bytes: &[u8], strict: bool) -> Result<Grammar, Diagnostics> {
    log::debug!("validate: {} byte(s), strict={strict}", bytes.len());

    let mut diagnostics = Diagnostics::new();
    let mut lines = Vec::new();
    let mut line_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if !is_allowed_byte(b) {
            let loc = locate_within(bytes, &lines, line_start, i);
            diagnostics.push(
                DiagnosticEntry::new(
                    Stage::Validate,
                    format!("invalid input byte 0x{b:02X}"),
                )
                .at(loc, render_current_line(bytes, line_start, bytes.len())),
            );
            i += 1;
            continue;
        }

        match b {
            b'\r' => {
                let ending = if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                    LineEnding::Crlf
                } else {
                    LineEnding::Cr
                };
                if strict && !matches!(ending, LineEnding::Crlf) {
                    let loc = locate_within(bytes, &lines, line_start, i);
                    diagnostics.push(
                        DiagnosticEntry::new(Stage::Validate, "strict mode requires CRLF line endings")
                            .at(loc, render_current_line(bytes, line_start, i + 1)),
                    );
                }
                lines.push(Line {
                    byte_offset: line_start as u32,
                    length: (i - line_start + 1 - if ending == LineEnding::Crlf { 2 } else { 1 })
                        as u32,
                    ending,
                });
                i += 1;
                line_start = i;
            }
            b'\n' => {
                if strict {
                    let loc = locate_within(bytes, &lines, line_start, i);
                    diagnostics.push(
                        DiagnosticEntry::new(Stage::Validate, "strict mode requires CRLF line endings")
                            .at(loc, render_current_line(bytes, line_start, i + 1)),
                    );
                }
                lines.push(Line {
                    byte_offset: line_start as u32,
                    length: (i - line_start) as u32,
                    ending: LineEnding::Lf,
                });
                i += 1;
                line_start = i;
            }
            _ => i += 1,
        }
    }

    if line_start < bytes.len() || bytes.is_empty() {
        let loc = locate_within(bytes, &lines, line_start, bytes.len());
        diagnostics.push(
            DiagnosticEntry::new(Stage::Validate, "final line is missing a line terminator")
                .at(loc, render_current_line(bytes, line_start, bytes.len())),
        );
        lines.push(Line {
            byte_offset: line_start as u32,
            length: (bytes.len() - line_start) as u32,
            ending: LineEnding::None,
        });
    }

    if diagnostics.is_empty() {
        Ok(Grammar::new(bytes.to_vec(), LineIndex::new(lines)))
    } else {
        log::debug!("validate: {} diagnostic(s)", diagnostics.len());
        Err(diagnostics)
    }
}

fn is_allowed_byte(b: u8) -> bool {
    matches!(b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E)
}

fn locate_within(
    _bytes: &[u8],
    lines: &[Line],
    line_start: usize,
    offset: usize,
) -> sabnf_core::SourceLocation {
    sabnf_core::SourceLocation {
        line: lines.len() as u32 + 1,
        column: (offset - line_start) as u32 + 1,
    }
}

fn render_current_line(bytes: &[u8], line_start: usize, end: usize) -> String {
    String::from_utf8_lossy(&bytes[line_start..end.min(bytes.len())]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_clean_crlf_grammar() {
        let grammar = validate(b"S = \"a\"\r\n", true).unwrap();
        assert_eq!(grammar.bytes(), b"S = \"a\"\r\n");
    }

    #[test]
    fn rejects_a_disallowed_byte() {
        let err = validate(b"S = \x01\r\n", false).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn strict_mode_rejects_bare_lf() {
        let err = validate(b"S = \"a\"\n", true).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn non_strict_mode_accepts_bare_lf() {
        assert!(validate(b"S = \"a\"\n", false).is_ok());
    }

    #[test]
    fn missing_final_terminator_is_always_an_error() {
        assert!(validate(b"S = \"a\"", false).is_err());
        assert!(validate(b"S = \"a\"", true).is_err());
    }
}
