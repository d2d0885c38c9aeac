use serde::{Deserialize, Serialize};

/// A source location: file ID, byte offset range, and the 1-based
/// line/column of the first byte as reported by the parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub file_id: u16,
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
            line: 0,
            column: 0,
        }
    }

    /// A span that only knows its line and column.
    pub fn at(line: u32, column: u32) -> Self {
        Self {
            file_id: 0,
            start: 0,
            end: 0,
            line,
            column,
        }
    }

    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn location(&self) -> String {
        format!("line {}, column {}", self.line, self.column)
    }
}

/// A value annotated with its source span.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    #[serde(default)]
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_text() {
        assert_eq!(Span::at(3, 14).location(), "line 3, column 14");
    }

    #[test]
    fn test_spanned_deserializes_without_span() {
        let s: Spanned<String> = serde_json::from_str(r#"{"node": "x"}"#).unwrap();
        assert_eq!(s.node, "x");
        assert_eq!(s.span, Span::dummy());
    }
}
