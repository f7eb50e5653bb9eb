//! Source locations and the grammar's line index.
//!
//! The line index maps every valid byte offset to exactly one `(line,
//! column)` pair. It is built once during input validation and never
//! mutated afterward; later stages use it only to render diagnostics.

/// A half-open byte range into the grammar source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub fn end(self) -> u32 {
        self.offset + self.len
    }
}

/// Which line terminator a physical line used.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineEnding {
    Crlf,
    Lf,
    Cr,
    /// The final line of the input had no terminator at all.
    None,
}

/// One line's byte range and the terminator that ended it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Line {
    pub byte_offset: u32,
    /// Length of the line's content, not counting the terminator.
    pub length: u32,
    pub ending: LineEnding,
}

/// A `(1-based line, 1-based column)` source location.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Maps byte offsets in the grammar source to `(line, column)` pairs.
///
/// Invariant: every byte position in `0..=source_len` maps to exactly one
/// line (the position one-past-the-end maps to the last line's
/// one-past-the-end column).
#[derive(Clone, Debug, Default)]
pub struct LineIndex {
    lines: Vec<Line>,
}

impl LineIndex {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Locate the `(line, column)` for a byte offset.
    ///
    /// # Panics
    /// Panics if `offset` lies beyond the indexed source; callers only ever
    /// pass offsets recorded by a stage that already validated them against
    /// the same grammar.
    pub fn locate(&self, offset: u32) -> SourceLocation {
        let line_idx = match self
            .lines
            .binary_search_by(|line| line.byte_offset.cmp(&offset))
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let line = self.lines[line_idx];
        SourceLocation {
            line: line_idx as u32 + 1,
            column: offset - line.byte_offset + 1,
        }
    }

    /// The rendered (terminator-free) text of the line containing `offset`.
    pub fn rendered_line<'src>(&self, source: &'src [u8], offset: u32) -> &'src [u8] {
        let line_idx = match self
            .lines
            .binary_search_by(|line| line.byte_offset.cmp(&offset))
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let line = self.lines[line_idx];
        let start = line.byte_offset as usize;
        let end = start + line.length as usize;
        &source[start..end]
    }
}

/// The grammar source: validated bytes plus their line index.
///
/// Immutable after input validation (§4.1); the only thing that changes it
/// is a fresh call to `validate`, which replaces it wholesale.
#[derive(Clone, Debug)]
pub struct Grammar {
    bytes: Vec<u8>,
    line_index: LineIndex,
}

impl Grammar {
    pub fn new(bytes: Vec<u8>, line_index: LineIndex) -> Self {
        Self { bytes, line_index }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(source: &str) -> (Vec<u8>, LineIndex) {
        let bytes = source.as_bytes().to_vec();
        let mut lines = Vec::new();
        let mut offset = 0u32;
        for raw_line in source.split_inclusive('\n') {
            let len_with_ending = raw_line.len() as u32;
            let content_len = len_with_ending - 1;
            lines.push(Line {
                byte_offset: offset,
                length: content_len,
                ending: LineEnding::Lf,
            });
            offset += len_with_ending;
        }
        (bytes, LineIndex::new(lines))
    }

    #[test]
    fn locates_offset_within_second_line() {
        let (bytes, index) = index_of("abc\ndef\n");
        let loc = index.locate(5); // 'e' of "def"
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 2);
        let _ = bytes;
    }

    #[test]
    fn renders_containing_line_without_terminator() {
        let (bytes, index) = index_of("abc\ndef\n");
        assert_eq!(index.rendered_line(&bytes, 5), b"def");
    }
}
