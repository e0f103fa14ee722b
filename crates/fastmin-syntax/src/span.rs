//! Source location tracking.
//!
//! Offsets live in a single position space shared by every unit of a merged
//! program: each unit is parsed at a base offset past the previous one, so a
//! span alone identifies both the unit and the position inside it.

/// A span in the program-wide position space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    /// Byte offset of the start.
    pub start: u32,
    /// Byte offset of the end (exclusive).
    pub end: u32,
}

impl Span {
    /// Span of nodes created by transforms rather than parsed from a unit.
    pub const SYNTHETIC: Span = Span {
        start: u32::MAX,
        end: u32::MAX,
    };

    /// Create a new span.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create an empty span at a position.
    #[inline]
    pub const fn empty(pos: u32) -> Self {
        Self { start: pos, end: pos }
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether this span was produced by a transform.
    #[inline]
    pub const fn is_synthetic(&self) -> bool {
        self.start == u32::MAX
    }

    /// Merge two spans into one that covers both.
    #[inline]
    pub const fn merge(self, other: Span) -> Span {
        Span {
            start: if self.start < other.start { self.start } else { other.start },
            end: if self.end > other.end { self.end } else { other.end },
        }
    }

    /// Check if this span contains a byte offset.
    #[inline]
    pub const fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Convert line/column to byte offset and vice versa for one unit's text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from source code.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to line and byte column (both 0-indexed).
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));
        let col = offset - self.line_starts[line];
        (line as u32, col)
    }

    /// Convert a byte offset to line and UTF-16 column (both 0-indexed).
    ///
    /// Source maps count columns in UTF-16 code units.
    pub fn line_utf16_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let (line, col) = self.line_col(offset);
        let start = self.line_starts[line as usize] as usize;
        let end = (start + col as usize).min(source.len());
        let col = source
            .get(start..end)
            .map_or(col, |prefix| prefix.encode_utf16().count() as u32);
        (line, col)
    }

    /// Convert line and column (both 0-indexed) to byte offset.
    pub fn offset(&self, line: u32, col: u32) -> u32 {
        self.line_starts.get(line as usize).copied().unwrap_or(0) + col
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        assert_eq!(a.merge(b), Span::new(5, 15));
    }

    #[test]
    fn test_synthetic_span() {
        assert!(Span::SYNTHETIC.is_synthetic());
        assert!(!Span::new(0, 0).is_synthetic());
    }

    #[test]
    fn test_line_index() {
        let source = "line1\nline2\nline3";
        let index = LineIndex::new(source);

        assert_eq!(index.line_col(0), (0, 0));
        assert_eq!(index.line_col(5), (0, 5));
        assert_eq!(index.line_col(6), (1, 0));
        assert_eq!(index.line_col(12), (2, 0));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_utf16_columns() {
        // "é" is two bytes in UTF-8 but one UTF-16 unit
        let source = "var é = 1;\nx";
        let index = LineIndex::new(source);
        let eq = source.find('=').unwrap() as u32;
        assert_eq!(index.line_col(eq), (0, 7));
        assert_eq!(index.line_utf16_col(source, eq), (0, 6));
    }
}
