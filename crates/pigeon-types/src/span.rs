use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of source text.
///
/// Lines and columns are 1-based. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A zero-width span at one position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) =
            (self.start_line, self.start_col).min((other.start_line, other.start_col));
        let (end_line, end_col) = (self.end_line, self.end_col).max((other.end_line, other.end_col));
        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A named script together with its text, used for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// The text of a 1-based line, without its terminator.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_across_lines_keeps_outer_bounds() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(2, 3, 2, 8);
        assert_eq!(a.merge(b), Span::new(1, 5, 2, 8));
        assert_eq!(b.merge(a), Span::new(1, 5, 2, 8));
    }

    #[test]
    fn merge_on_one_line() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(1, 3, 1, 8);
        assert_eq!(a.merge(b), Span::new(1, 3, 1, 10));
    }

    #[test]
    fn display_shows_start_position() {
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
    }

    #[test]
    fn line_lookup() {
        let src = SourceFile::new("test.pg", "var a = 1;\nvar b = 2;\r\nvar c = 3;");
        assert_eq!(src.line(1), Some("var a = 1;"));
        assert_eq!(src.line(2), Some("var b = 2;"));
        assert_eq!(src.line(3), Some("var c = 3;"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn empty_source_has_one_empty_line() {
        let src = SourceFile::new("test.pg", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }
}
