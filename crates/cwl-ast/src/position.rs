//! Source positions and ranges.

use std::fmt;

/// A zero-based line/column position in a source document.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// The zero-based line number.
    pub line: u32,
    /// The zero-based column number.
    pub column: u32,
}

impl Position {
    /// Creates a new position from a zero-based line and column.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Returns this position shifted right by the given number of columns.
    pub const fn shifted(self, columns: u32) -> Self {
        Self {
            line: self.line,
            column: self.column + columns,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{line}:{column}", line = self.line, column = self.column)
    }
}

/// A half-open range of source positions.
///
/// The start position is inclusive and the end position is exclusive.
/// Containment is line and column aware: a position on the range's final
/// line is contained only while its column is below the end column.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Range {
    /// The inclusive start of the range.
    pub start: Position,
    /// The exclusive end of the range.
    pub end: Position,
}

impl Range {
    /// Creates a new range from a start and end position.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Creates an empty range anchored at the given position.
    pub const fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Determines if the range contains the given position.
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }

    /// Determines if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Computes the smallest range enclosing both `self` and `other`.
    pub fn union(&self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{start}..{end}", start = self.start, end = self.end)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn containment_is_half_open() {
        let range = Range::new(Position::new(1, 4), Position::new(1, 10));
        assert!(range.contains(Position::new(1, 4)));
        assert!(range.contains(Position::new(1, 9)));
        assert!(!range.contains(Position::new(1, 10)));
        assert!(!range.contains(Position::new(1, 3)));
        assert!(!range.contains(Position::new(0, 7)));
    }

    #[test]
    fn containment_spans_lines() {
        let range = Range::new(Position::new(2, 4), Position::new(5, 0));
        assert!(range.contains(Position::new(3, 0)));
        assert!(range.contains(Position::new(4, 80)));
        assert!(!range.contains(Position::new(5, 0)));
        assert!(!range.contains(Position::new(2, 3)));
    }

    #[test]
    fn union_encloses_both() {
        let a = Range::new(Position::new(1, 0), Position::new(2, 5));
        let b = Range::new(Position::new(0, 3), Position::new(1, 9));
        assert_eq!(
            a.union(b),
            Range::new(Position::new(0, 3), Position::new(2, 5))
        );
    }
}
