use std::collections::VecDeque;

use crate::token::{keyword_kind, Kind, Token};

const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

/// Scanner for WS source. One call to `next_item` runs the state machine
/// until a token is available; after the terminal `Eof` or `Error` token the
/// scanner keeps returning `Eof` and callers are expected to stop.
pub struct Lexer<'a> {
    name: String,
    input: &'a str,
    pos: usize,
    start: usize,
    width: usize,
    last_pos: usize,
    paren_depth: i32,
    brace_depth: i32,
    // Vestigial action delimiters; at_terminator still consults right_delim.
    #[allow(dead_code)]
    left_delim: String,
    right_delim: String,
    items: VecDeque<Token>,
    done: bool,
    exhausted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(name: &str, input: &'a str) -> Self {
        Self {
            name: name.to_string(),
            input,
            pos: 0,
            start: 0,
            width: 0,
            last_pos: 0,
            paren_depth: 0,
            brace_depth: 0,
            left_delim: String::new(),
            right_delim: String::new(),
            items: VecDeque::new(),
            done: false,
            exhausted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the next item from the input.
    pub fn next_item(&mut self) -> Token {
        while self.items.is_empty() && !self.done {
            self.scan();
        }
        match self.items.pop_front() {
            Some(item) => {
                self.last_pos = item.pos;
                item
            }
            None => Token::new(Kind::Eof, self.pos, String::new()),
        }
    }

    /// Discards any remaining items so the scanner finishes cleanly.
    pub fn drain(&mut self) {
        self.items.clear();
        self.done = true;
    }

    /// Which line the most recent item started on, counting from 1.
    pub fn line_number(&self) -> usize {
        1 + self.input[..self.last_pos].matches('\n').count()
    }

    // Decodes the next scalar, advancing the cursor.
    fn next(&mut self) -> Option<char> {
        match self.input[self.pos..].chars().next() {
            Some(r) => {
                self.width = r.len_utf8();
                self.pos += self.width;
                Some(r)
            }
            None => {
                self.width = 0;
                None
            }
        }
    }

    // Decodes without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    // Steps back one scalar. Valid at most once per call to next.
    fn backup(&mut self) {
        self.pos -= self.width;
    }

    // Consumes the next scalar if it is in the valid set.
    fn accept(&mut self, valid: &str) -> bool {
        match self.peek() {
            Some(r) if valid.contains(r) => {
                self.next();
                true
            }
            _ => false,
        }
    }

    // Consumes a run of scalars from the valid set.
    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn emit(&mut self, kind: Kind) {
        let token = Token::new(kind, self.start, self.input[self.start..self.pos].to_string());
        self.items.push_back(token);
        self.start = self.pos;
    }

    fn error(&mut self, message: String) {
        self.items
            .push_back(Token::new(Kind::Error, self.start, message));
        self.done = true;
    }

    // One dispatch of the top-level state.
    fn scan(&mut self) {
        let r = match self.next() {
            None => {
                if self.paren_depth != 0 || self.brace_depth != 0 {
                    self.error("unclosed left paren".to_string());
                    return;
                }
                self.emit(Kind::Eof);
                self.done = true;
                return;
            }
            Some(r) => r,
        };
        match r {
            _ if is_end_of_line(r) => self.lex_eol(),
            _ if is_space(r) => self.lex_space(),
            _ if self.input[self.pos - self.width..].starts_with(LEFT_COMMENT) => {
                self.lex_comment()
            }
            _ if self.input[self.pos - self.width..].starts_with("//") => {
                self.lex_single_line_comment()
            }
            '"' => self.lex_quote(),
            '`' => self.lex_raw_quote(),
            '$' => self.lex_variable(),
            '\'' => self.lex_char(),
            '.' => match self.peek() {
                Some(d) if d.is_ascii_digit() => {
                    // '.' can start a number.
                    self.backup();
                    self.lex_number();
                }
                _ => self.emit(Kind::Dot),
            },
            '0'..='9' => {
                self.backup();
                self.lex_number();
            }
            _ if is_operator(r) => self.lex_operator(),
            _ if is_alpha_numeric(r) => {
                self.backup();
                self.lex_identifier();
            }
            '(' => {
                self.emit(Kind::LeftParen);
                self.paren_depth += 1;
            }
            ')' => {
                self.emit(Kind::RightParen);
                self.paren_depth -= 1;
                if self.paren_depth < 0 {
                    self.error(format!("unexpected right paren {}", unicode_repr(r)));
                }
            }
            '{' => {
                self.emit(Kind::LeftBrace);
                self.brace_depth += 1;
            }
            '}' => {
                self.emit(Kind::RightBrace);
                self.brace_depth -= 1;
                if self.brace_depth < 0 {
                    self.error(format!("unexpected right brace {}", unicode_repr(r)));
                }
            }
            _ if r.is_ascii() && r.is_ascii_graphic() => self.emit(Kind::Char),
            _ => self.error(format!(
                "unrecognized character in action: {}",
                unicode_repr(r)
            )),
        }
    }

    // A run of end-of-line characters; one has already been seen.
    fn lex_eol(&mut self) {
        while matches!(self.peek(), Some(r) if is_end_of_line(r)) {
            self.next();
        }
        self.emit(Kind::Newline);
    }

    // A run of spaces; one has already been seen.
    fn lex_space(&mut self) {
        while matches!(self.peek(), Some(r) if is_space(r)) {
            self.next();
        }
        self.emit(Kind::Space);
    }

    // A block comment. The opening '/' has been consumed.
    fn lex_comment(&mut self) {
        self.pos = (self.pos + LEFT_COMMENT.len()).min(self.input.len());
        match self.input[self.pos..].find(RIGHT_COMMENT) {
            Some(i) => {
                self.pos += i + RIGHT_COMMENT.len();
                self.emit(Kind::Comment);
            }
            None => self.error("unclosed comment".to_string()),
        }
    }

    // A comment running to end of line; the newline itself is not consumed.
    fn lex_single_line_comment(&mut self) {
        match self.input[self.pos..].find('\n') {
            Some(i) => self.pos += i,
            None => self.pos = self.input.len(),
        }
        self.emit(Kind::Comment);
    }

    fn lex_quote(&mut self) {
        loop {
            match self.next() {
                Some('\\') => match self.next() {
                    Some(r) if r != '\n' => {}
                    _ => {
                        self.error("unterminated quoted string".to_string());
                        return;
                    }
                },
                None | Some('\n') => {
                    self.error("unterminated quoted string".to_string());
                    return;
                }
                Some('"') => break,
                Some(_) => {}
            }
        }
        self.emit(Kind::String);
    }

    // A character constant. WS treats these as strings downstream, so the
    // emitted kind is String rather than CharConstant.
    fn lex_char(&mut self) {
        loop {
            match self.next() {
                Some('\\') => match self.next() {
                    Some(r) if r != '\n' => {}
                    _ => {
                        self.error("unterminated character constant".to_string());
                        return;
                    }
                },
                None | Some('\n') => {
                    self.error("unterminated character constant".to_string());
                    return;
                }
                Some('\'') => break,
                Some(_) => {}
            }
        }
        self.emit(Kind::String);
    }

    fn lex_raw_quote(&mut self) {
        loop {
            match self.next() {
                None => {
                    self.error("unterminated raw quoted string".to_string());
                    return;
                }
                Some('`') => break,
                Some(_) => {}
            }
        }
        self.emit(Kind::RawString);
    }

    // A variable: $Alphanumeric. The '$' has been consumed.
    fn lex_variable(&mut self) {
        if self.at_terminator() {
            // Nothing interesting follows -> "$".
            self.emit(Kind::Variable);
            return;
        }
        loop {
            match self.next() {
                Some(r) if is_alpha_numeric(r) => {}
                _ => {
                    self.backup();
                    break;
                }
            }
        }
        match self.peek() {
            Some(r) if !self.at_terminator() => {
                self.error(format!("bad character {}", unicode_repr(r)));
            }
            _ => self.emit(Kind::Variable),
        }
    }

    fn lex_operator(&mut self) {
        self.accept_run("%&*/!+=-|");
        self.emit(Kind::Operator);
    }

    fn lex_identifier(&mut self) {
        loop {
            match self.next() {
                Some(r) if is_alpha_numeric(r) => {}
                r => {
                    self.backup();
                    if !self.at_terminator() {
                        if let Some(bad) = r {
                            self.error(format!("bad character {}", unicode_repr(bad)));
                            return;
                        }
                    }
                    break;
                }
            }
        }
        let word = &self.input[self.start..self.pos];
        let kind = match keyword_kind(word) {
            Some(kind) if kind.is_keyword() => kind,
            _ if word.starts_with('.') => Kind::Field,
            _ if word == "true" || word == "false" => Kind::Bool,
            _ => Kind::Identifier,
        };
        self.emit(kind);
    }

    // Whether the input is at a valid character to follow an identifier.
    fn at_terminator(&self) -> bool {
        let r = match self.peek() {
            None => return true,
            Some(r) => r,
        };
        if is_space(r) || is_end_of_line(r) {
            return true;
        }
        match r {
            '.' | ',' | '|' | ':' | ')' | '(' | ';' | '[' | ']' | '?' | '{' => return true,
            _ => {}
        }
        if is_operator(r) {
            return true;
        }
        self.right_delim.chars().next() == Some(r)
    }

    fn lex_number(&mut self) {
        if !self.scan_number() {
            let value = &self.input[self.start..self.pos];
            self.error(format!("bad number syntax: {value:?}"));
            return;
        }
        self.emit(Kind::Number);
    }

    fn scan_number(&mut self) -> bool {
        // Optional leading sign.
        self.accept("+-");
        let mut digits = "0123456789";
        if self.accept("0") && self.accept("xX") {
            digits = "0123456789abcdefABCDEF";
        }
        self.accept_run(digits);
        if self.accept(".") {
            self.accept_run(digits);
        }
        if self.accept("eE") {
            self.accept("+-");
            self.accept_run("0123456789");
        }
        // WS allows an imaginary or float suffix.
        self.accept("if");
        // The next thing mustn't be alphanumeric.
        if matches!(self.peek(), Some(r) if is_alpha_numeric(r)) {
            self.next();
            return false;
        }
        true
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.exhausted {
            return None;
        }
        let item = self.next_item();
        if item.kind == Kind::Eof || item.kind == Kind::Error {
            self.exhausted = true;
        }
        Some(item)
    }
}

fn is_space(r: char) -> bool {
    r == ' ' || r == '\t'
}

fn is_end_of_line(r: char) -> bool {
    r == '\r' || r == '\n'
}

fn is_alpha_numeric(r: char) -> bool {
    r == '_' || r.is_alphabetic() || r.is_numeric()
}

fn is_operator(r: char) -> bool {
    "%&*/!+=-|<>".contains(r)
}

fn unicode_repr(r: char) -> String {
    format!("U+{:04X} '{}'", r as u32, r)
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::token::{Kind, Token};

    fn lex_all(input: &str) -> Vec<Token> {
        Lexer::new("test", input).collect()
    }

    fn kinds(input: &str) -> Vec<Kind> {
        lex_all(input).iter().map(|t| t.kind).collect()
    }

    fn significant(input: &str) -> Vec<(Kind, String)> {
        lex_all(input)
            .into_iter()
            .filter(|t| t.kind != Kind::Space && t.kind != Kind::Newline)
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn declaration_tokens() {
        assert_eq!(
            kinds("var x = 5;"),
            vec![
                Kind::Var,
                Kind::Space,
                Kind::Identifier,
                Kind::Space,
                Kind::Operator,
                Kind::Space,
                Kind::Number,
                Kind::Char,
                Kind::Eof,
            ]
        );
    }

    #[test]
    fn angle_brackets_lex_as_single_operators() {
        assert_eq!(
            significant("array<int>"),
            vec![
                (Kind::Array, "array".to_string()),
                (Kind::Operator, "<".to_string()),
                (Kind::Identifier, "int".to_string()),
                (Kind::Operator, ">".to_string()),
                (Kind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn operator_runs_stay_joined() {
        assert_eq!(
            significant("a+=b")[1],
            (Kind::Operator, "+=".to_string())
        );
        assert_eq!(significant("a==b")[1], (Kind::Operator, "==".to_string()));
    }

    #[test]
    fn modifiers_and_bools() {
        let toks = significant("saved editable true false");
        assert_eq!(toks[0], (Kind::Modifiers, "saved".to_string()));
        assert_eq!(toks[1], (Kind::Modifiers, "editable".to_string()));
        assert_eq!(toks[2], (Kind::Bool, "true".to_string()));
        assert_eq!(toks[3], (Kind::Bool, "false".to_string()));
    }

    #[test]
    fn comments_keep_their_delimiters() {
        let toks = significant("/* block */ // line");
        assert_eq!(toks[0], (Kind::Comment, "/* block */".to_string()));
        assert_eq!(toks[1], (Kind::Comment, "// line".to_string()));
    }

    #[test]
    fn single_line_comment_stops_before_newline() {
        let toks = lex_all("// hi\nx");
        assert_eq!(toks[0], Token::new(Kind::Comment, 0, "// hi".to_string()));
        assert_eq!(toks[1].kind, Kind::Newline);
        assert_eq!(toks[2].kind, Kind::Identifier);
    }

    #[test]
    fn character_constants_emit_string() {
        let toks = significant("'a' '\\n'");
        assert_eq!(toks[0], (Kind::String, "'a'".to_string()));
        assert_eq!(toks[1], (Kind::String, "'\\n'".to_string()));
    }

    #[test]
    fn strings_and_raw_strings() {
        let toks = significant(r#""a\"b" `raw`"#);
        assert_eq!(toks[0], (Kind::String, r#""a\"b""#.to_string()));
        assert_eq!(toks[1], (Kind::RawString, "`raw`".to_string()));
    }

    #[test]
    fn number_forms() {
        for (input, expect) in [
            ("42", "42"),
            ("0x1F", "0x1F"),
            ("1.5", "1.5"),
            ("1.5f", "1.5f"),
            ("2i", "2i"),
            ("1e-3", "1e-3"),
            (".25", ".25"),
        ] {
            let toks = significant(input);
            assert_eq!(toks[0], (Kind::Number, expect.to_string()), "{input}");
        }
    }

    #[test]
    fn dot_without_digit_is_dot() {
        assert_eq!(significant("a.b")[1], (Kind::Dot, ".".to_string()));
    }

    #[test]
    fn variables() {
        let toks = significant("$ $x1");
        assert_eq!(toks[0], (Kind::Variable, "$".to_string()));
        assert_eq!(toks[1], (Kind::Variable, "$x1".to_string()));
    }

    #[test]
    fn bad_number_is_an_error() {
        let toks = significant("0x1G");
        assert_eq!(toks[0].0, Kind::Error);
        assert!(toks[0].1.starts_with("bad number syntax"));
    }

    #[test]
    fn unclosed_paren_at_eof() {
        let toks = significant("(a");
        assert_eq!(toks.last().unwrap().0, Kind::Error);
        assert_eq!(toks.last().unwrap().1, "unclosed left paren");
    }

    #[test]
    fn unclosed_brace_reuses_the_paren_message() {
        let toks = significant("{a;");
        assert_eq!(toks.last().unwrap().1, "unclosed left paren");
    }

    #[test]
    fn unexpected_right_brace() {
        let toks = significant("}");
        assert_eq!(toks[0].0, Kind::RightBrace);
        assert_eq!(toks[1].0, Kind::Error);
        assert_eq!(toks[1].1, "unexpected right brace U+007D '}'");
    }

    #[test]
    fn unclosed_block_comment() {
        let toks = significant("/* nope");
        assert_eq!(toks[0], (Kind::Error, "unclosed comment".to_string()));
        // The degenerate two-byte opener must not panic either.
        let toks = significant("/*");
        assert_eq!(toks[0], (Kind::Error, "unclosed comment".to_string()));
    }

    #[test]
    fn bad_identifier_terminator() {
        let toks = significant("x\"y");
        assert_eq!(toks[0].0, Kind::Error);
        assert_eq!(toks[0].1, "bad character U+0022 '\"'");
    }

    #[test]
    fn exactly_one_eof_and_it_is_last() {
        let toks = lex_all("if (x) {\n\ta;\n}");
        let eofs: Vec<_> = toks.iter().filter(|t| t.kind == Kind::Eof).collect();
        assert_eq!(eofs.len(), 1);
        assert_eq!(toks.last().unwrap().kind, Kind::Eof);
    }

    #[test]
    fn concatenated_values_reproduce_the_input() {
        let input = "if (x) {\r\n\ta = b + 1; // note\r\n}\n";
        let joined: String = lex_all(input).iter().map(|t| t.value.as_str()).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn positions_are_byte_offsets() {
        let toks = lex_all("ab cd");
        assert_eq!(toks[0].pos, 0);
        assert_eq!(toks[1].pos, 2);
        assert_eq!(toks[2].pos, 3);
    }

    #[test]
    fn line_number_tracks_the_last_item() {
        let mut lexer = Lexer::new("test", "a\nb\nc");
        while lexer.next_item().kind != Kind::Eof {}
        assert_eq!(lexer.line_number(), 3);
    }
}
