use crate::lexer::Lexer;
use crate::token::{Kind, Token};

/// Outcome of a lockstep walk over two token streams.
#[derive(Debug)]
pub struct CompareResult {
    pub equivalent: bool,
    pub mismatch: Option<(Token, Token)>,
    pub lex_errors: Vec<Token>,
}

/// Compares two sources for lexical equivalence: whitespace is ignored and
/// carriage returns are stripped from value comparisons, so a formatted file
/// proves equivalent to its original.
pub fn compare_sources(original: &str, modified: &str) -> CompareResult {
    let mut left = Lexer::new("original", original);
    let mut right = Lexer::new("modified", modified);
    compare(&mut left, &mut right)
}

pub fn compare(original: &mut Lexer, modified: &mut Lexer) -> CompareResult {
    let mut lex_errors = Vec::new();
    loop {
        let left = next_significant(original);
        let right = next_significant(modified);
        if left.kind != right.kind {
            return CompareResult {
                equivalent: false,
                mismatch: Some((left, right)),
                lex_errors,
            };
        }
        if value_compared(left.kind) && strip_cr(&left.value) != strip_cr(&right.value) {
            return CompareResult {
                equivalent: false,
                mismatch: Some((left, right)),
                lex_errors,
            };
        }
        if left.kind == Kind::Error {
            lex_errors.push(left.clone());
        }
        if right.kind == Kind::Error {
            lex_errors.push(right);
        }
        if left.kind == Kind::Eof {
            return CompareResult {
                equivalent: true,
                mismatch: None,
                lex_errors,
            };
        }
    }
}

fn next_significant(lexer: &mut Lexer) -> Token {
    loop {
        let token = lexer.next_item();
        if token.kind != Kind::Space && token.kind != Kind::Newline {
            return token;
        }
    }
}

// Kinds whose values carry meaning; the rest compare structurally.
fn value_compared(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Identifier
            | Kind::Char
            | Kind::CharConstant
            | Kind::String
            | Kind::Bool
            | Kind::Comment
            | Kind::Modifiers
            | Kind::Number
            | Kind::Operator
    )
}

fn strip_cr(value: &str) -> String {
    value.replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::compare_sources;
    use crate::formatter::format_source;
    use crate::token::Kind;

    #[test]
    fn formatted_output_is_equivalent() {
        let original = "if(x){a;}";
        let formatted = format_source("test", original).expect("format");
        let result = compare_sources(original, &formatted);
        assert!(result.equivalent, "{:?}", result.mismatch);
    }

    #[test]
    fn renamed_identifier_is_not_equivalent() {
        let result = compare_sources("if(x){a;}", "if(x){b;}");
        assert!(!result.equivalent);
        let (left, right) = result.mismatch.expect("mismatch");
        assert_eq!(left.kind, Kind::Identifier);
        assert_eq!(left.value, "a");
        assert_eq!(right.kind, Kind::Identifier);
        assert_eq!(right.value, "b");
    }

    #[test]
    fn whitespace_differences_are_ignored() {
        let result = compare_sources("var x ,y : int;", "var\n\tx, y: int;");
        assert!(result.equivalent);
    }

    #[test]
    fn carriage_returns_are_stripped_from_values() {
        let result = compare_sources("// note\r\nx;", "// note\nx;");
        assert!(result.equivalent);
    }

    #[test]
    fn kind_mismatch_fails() {
        let result = compare_sources("var x;", "var 5;");
        assert!(!result.equivalent);
        let (left, right) = result.mismatch.expect("mismatch");
        assert_eq!(left.kind, Kind::Identifier);
        assert_eq!(right.kind, Kind::Number);
    }

    #[test]
    fn shorter_stream_fails_at_eof() {
        let result = compare_sources("a b", "a");
        assert!(!result.equivalent);
        let (left, right) = result.mismatch.expect("mismatch");
        assert_eq!(left.kind, Kind::Identifier);
        assert_eq!(right.kind, Kind::Eof);
    }

    #[test]
    fn lex_errors_are_reported_without_failing_the_walk() {
        let result = compare_sources("\"open", "\"open");
        assert!(result.equivalent);
        assert_eq!(result.lex_errors.len(), 2);
        assert_eq!(result.lex_errors[0].value, "unterminated quoted string");
    }
}
