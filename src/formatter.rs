use crate::error::FormatError;
use crate::lexer::Lexer;
use crate::token::{Kind, Token};

/// Syntactic contexts the formatter moves between. Each state consumes
/// tokens through the filtering reader and decides layout from one token of
/// lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Format,
    Conditional,
    Var,
    Struct,
    Function,
    Enum,
    EnumIdent,
    EnumChar,
    Case,
    NewLine,
    RightBrace,
}

/// Formats WS source into the canonical style: tabs for indentation, one
/// space after `:` and `,`, spaced binary operators, `{` on the opening
/// line, and up to three consecutive newlines preserved.
pub struct Formatter<'a> {
    lexer: Lexer<'a>,
    name: String,
    p_token: Token,
    token: Token,
    n_token: Option<Token>,
    output: String,
    max_newlines: i32,
    // -1 means "force at least one newline after re-peeking".
    newline_count: i32,
    // One entry per hard scope; the value counts soft scopes inside it.
    scope_level: Vec<i32>,
    paren_depth: i32,
}

/// Formats a whole source string.
pub fn format_source(name: &str, input: &str) -> Result<String, FormatError> {
    Formatter::new(name, input).run()
}

impl<'a> Formatter<'a> {
    pub fn new(name: &str, input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(name, input),
            name: name.to_string(),
            p_token: Token::new(Kind::Error, 0, String::new()),
            token: Token::new(Kind::Error, 0, String::new()),
            n_token: None,
            output: String::with_capacity(input.len()),
            max_newlines: 3,
            newline_count: 0,
            scope_level: Vec::new(),
            paren_depth: 0,
        }
    }

    pub fn run(mut self) -> Result<String, FormatError> {
        let mut state = State::Format;
        loop {
            let next = match state {
                State::Format => self.format()?,
                State::Conditional => self.conditional()?,
                State::Var => self.var_decl()?,
                State::Struct => self.struct_decl()?,
                State::Function => self.function_decl()?,
                State::Enum => self.enum_decl()?,
                State::EnumIdent => self.enum_ident()?,
                State::EnumChar => self.enum_sep()?,
                State::Case => self.case_label()?,
                State::NewLine => self.new_line()?,
                State::RightBrace => self.right_brace()?,
            };
            match next {
                Some(s) => state = s,
                None => return Ok(self.output),
            }
        }
    }

    // Filtering reader: advances past whitespace tokens. Only peek counts
    // the newlines it skips.
    fn next(&mut self) -> Token {
        self.p_token = self.token.clone();
        let mut temp = match self.n_token.take() {
            Some(token) => token,
            None => self.lexer.next_item(),
        };
        while temp.kind == Kind::Space || temp.kind == Kind::Newline {
            temp = self.lexer.next_item();
        }
        self.token = temp;
        self.token.clone()
    }

    fn peek(&mut self) -> Token {
        if let Some(token) = &self.n_token {
            return token.clone();
        }
        let mut count = 0i32;
        let mut temp = self.lexer.next_item();
        while temp.kind == Kind::Space || temp.kind == Kind::Newline {
            if temp.kind == Kind::Newline {
                count += temp.value.matches('\n').count() as i32;
            }
            temp = self.lexer.next_item();
        }
        self.newline_count = if count < self.max_newlines {
            count
        } else {
            self.max_newlines
        };
        self.n_token = Some(temp.clone());
        temp
    }

    // Top-level dispatch.
    fn format(&mut self) -> Result<Option<State>, FormatError> {
        let t = self.next().kind;
        match t {
            Kind::Eof => Ok(None),
            Kind::Error => Err(self.lex_failure()),
            Kind::Comment => {
                self.print_comment();
                Ok(Some(State::Format))
            }
            Kind::Function => Ok(Some(State::Function)),
            Kind::If | Kind::While | Kind::For | Kind::Switch => Ok(Some(State::Conditional)),
            Kind::Else => {
                if self.p_token.kind == Kind::RightBrace {
                    self.output.push_str(" else");
                } else {
                    self.output.push_str("else");
                }
                let peeked = self.peek().kind;
                if peeked != Kind::LeftBrace && peeked != Kind::If {
                    self.bump_soft_scope();
                    self.print_newline();
                    self.print_tab();
                }
                Ok(Some(State::Format))
            }
            Kind::Return => {
                let value = self.token.value.clone();
                self.output.push_str(&value);
                self.output.push(' ');
                Ok(Some(State::Format))
            }
            Kind::Modifiers | Kind::Identifier | Kind::Number | Kind::Bool | Kind::String => {
                self.print_identifier()?;
                Ok(Some(State::Format))
            }
            t if is_char(t) => self.print_char(),
            Kind::Struct => Ok(Some(State::Struct)),
            Kind::Var => Ok(Some(State::Var)),
            Kind::Operator => {
                self.print_operator();
                Ok(Some(State::Format))
            }
            Kind::Array => {
                self.print_array()?;
                Ok(Some(State::Format))
            }
            Kind::Case => Ok(Some(State::Case)),
            Kind::Enum => Ok(Some(State::Enum)),
            _ => Err(self.expected_identifier()),
        }
    }

    // A conditional or loop header: `<kw> (...)`. Stays in this state until
    // the header's parenthesis closes.
    fn conditional(&mut self) -> Result<Option<State>, FormatError> {
        if matches!(
            self.token.kind,
            Kind::If | Kind::While | Kind::For | Kind::Switch
        ) {
            let keyword = self.token.value.clone();
            if self.p_token.kind == Kind::Else {
                self.output.push(' ');
            }
            if self.next().kind != Kind::LeftParen {
                return Err(self.expected_parenthesis());
            }
            self.output.push_str(&keyword);
            self.output.push_str(" (");
            self.paren_depth = 1;
        }

        let t = self.next().kind;
        match t {
            Kind::Eof => return Err(self.unexpected_eof()),
            Kind::Error => return Err(self.lex_failure()),
            Kind::Comment => self.print_comment(),
            Kind::Operator => self.print_operator(),
            Kind::Identifier | Kind::Number | Kind::String | Kind::Bool => {
                self.print_identifier()?
            }
            t if is_char(t) => {
                if self.token.value == ";" {
                    // Separates the clauses of a for header.
                    self.output.push_str("; ");
                } else {
                    self.print_char()?;
                }
                match self.token.value.as_str() {
                    ")" => {
                        self.paren_depth -= 1;
                        if self.paren_depth == 0 {
                            if self.peek().kind != Kind::LeftBrace {
                                // Brace-less body: one soft scope deep.
                                self.bump_soft_scope();
                                self.print_newline();
                                self.print_tab();
                            }
                            return Ok(Some(State::Format));
                        }
                    }
                    "(" => self.paren_depth += 1,
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(Some(State::Conditional))
    }

    // `var a, b: type` where type is an identifier or an array.
    fn var_decl(&mut self) -> Result<Option<State>, FormatError> {
        self.print_identifier()?;
        loop {
            if self.next().kind != Kind::Identifier {
                return Err(self.expected_identifier());
            }
            self.print_identifier()?;
            if self.next().kind != Kind::Char {
                return Err(self.expected_identifier());
            }
            match self.token.value.as_str() {
                "," => {
                    self.print_char()?;
                }
                ":" => {
                    self.print_char()?;
                    break;
                }
                _ => return Err(self.expected_identifier()),
            }
        }
        match self.next().kind {
            Kind::Identifier => {
                self.print_identifier()?;
            }
            Kind::Array => {
                self.print_array()?;
            }
            _ => return Err(self.expected_identifier()),
        }
        Ok(Some(State::Format))
    }

    fn struct_decl(&mut self) -> Result<Option<State>, FormatError> {
        if self.token.kind == Kind::Struct {
            self.print_identifier()?;
        }
        match self.next().kind {
            Kind::Eof => Err(self.unexpected_eof()),
            Kind::Comment => {
                self.print_comment();
                Ok(Some(State::Struct))
            }
            Kind::Identifier => {
                self.print_identifier()?;
                Ok(Some(State::Format))
            }
            _ => Err(self.expected_identifier()),
        }
    }

    fn function_decl(&mut self) -> Result<Option<State>, FormatError> {
        if self.token.kind == Kind::Function {
            let value = self.token.value.clone();
            self.output.push_str(&value);
            self.output.push(' ');
        }
        match self.next().kind {
            Kind::Eof => Err(self.unexpected_eof()),
            Kind::Comment => {
                self.print_comment();
                Ok(Some(State::Function))
            }
            Kind::Identifier => {
                self.print_identifier()?;
                if self.next().kind == Kind::LeftParen {
                    self.print_char()?;
                    Ok(Some(State::Format))
                } else {
                    Err(self.expected_identifier())
                }
            }
            _ => Err(self.expected_identifier()),
        }
    }

    // `enum Name {` then one entry per line.
    fn enum_decl(&mut self) -> Result<Option<State>, FormatError> {
        self.print_identifier()?;
        if self.next().kind != Kind::Identifier {
            return Err(self.expected_identifier());
        }
        self.print_identifier()?;
        if self.next().kind != Kind::LeftBrace {
            let got = self.describe_token();
            return Err(self.fail(format!("expected left brace got {got}")));
        }
        self.scope_level.push(1);
        self.output.push_str(" {");
        self.newline_count = -1;
        self.print_newline();
        self.print_tab();
        Ok(Some(State::EnumIdent))
    }

    fn enum_ident(&mut self) -> Result<Option<State>, FormatError> {
        if self.next().kind != Kind::Identifier {
            return Err(self.expected_identifier());
        }
        self.print_identifier()?;
        match self.peek().value.as_str() {
            "=" => {
                self.next();
                self.print_operator();
                if self.peek().kind != Kind::Number {
                    let got = self.describe_token();
                    return Err(self.fail(format!("expected Number got {got}")));
                }
                self.next();
                self.print_identifier()?;
                if self.peek().kind == Kind::RightBrace {
                    return Ok(Some(State::Format));
                }
            }
            "}" => return Ok(Some(State::Format)),
            _ => {}
        }
        Ok(Some(State::EnumChar))
    }

    fn enum_sep(&mut self) -> Result<Option<State>, FormatError> {
        if self.next().value != "," {
            let got = self.describe_token();
            return Err(self.fail(format!("expected Comma got {got}")));
        }
        self.output.push(',');
        if self.peek().kind == Kind::RightBrace {
            return Ok(Some(State::Format));
        }
        self.print_newline();
        self.print_tab();
        Ok(Some(State::EnumIdent))
    }

    // A case label opens a hard scope that the next label pops.
    fn case_label(&mut self) -> Result<Option<State>, FormatError> {
        self.print_identifier()?;
        self.print_case()?;
        if self.next().value != ":" {
            let got = self.describe_token();
            let before = self.p_token.value.clone();
            return Err(self.fail(format!("expected \":\" got {got} {before}")));
        }
        self.output.push(':');
        self.scope_level.push(1);
        Ok(Some(State::NewLine))
    }

    fn print_case(&mut self) -> Result<(), FormatError> {
        match self.next().kind {
            Kind::LeftParen => {
                // `case (Enum) Name:` form.
                self.output.push_str(" (");
                if self.next().kind != Kind::Identifier {
                    return Err(self.expected_identifier());
                }
                self.print_identifier()?;
                if self.next().kind != Kind::RightParen {
                    return Err(self.expected_parenthesis());
                }
                self.output.push(')');
                if self.next().kind != Kind::Identifier {
                    return Err(self.expected_identifier());
                }
                self.print_identifier()?;
            }
            Kind::Identifier | Kind::Number | Kind::String => self.print_identifier()?,
            Kind::Operator => match self.token.value.as_str() {
                "+" | "-" => {
                    self.print_operator();
                    if self.next().kind != Kind::Number {
                        let got = self.describe_token();
                        return Err(self.fail(format!("expected Number got {got}")));
                    }
                    self.print_identifier()?;
                }
                _ => return Err(self.fail("invalid operator".to_string())),
            },
            _ => return Err(self.expected_identifier()),
        }
        Ok(())
    }

    fn right_brace(&mut self) -> Result<Option<State>, FormatError> {
        self.scope_level.pop();
        if self.p_token.kind != Kind::LeftBrace {
            self.newline_count = -1;
            self.print_newline();
            self.print_tab();
        }
        self.output.push('}');
        match self.peek().kind {
            Kind::Char | Kind::Else | Kind::RightBrace => Ok(Some(State::Format)),
            _ => Ok(Some(State::NewLine)),
        }
    }

    fn new_line(&mut self) -> Result<Option<State>, FormatError> {
        let peeked = self.peek();
        match peeked.kind {
            Kind::Eof => {
                self.output.push('\n');
                Ok(None)
            }
            Kind::Error => Err(self.fail(peeked.value)),
            Kind::Case => {
                self.print_newline();
                self.scope_level.pop();
                self.print_tab();
                Ok(Some(State::Format))
            }
            // The next token closes the statement or block; stay compact.
            _ if peeked.value == ";" || peeked.value == "}" => Ok(Some(State::Format)),
            _ => {
                self.print_newline();
                self.print_tab();
                Ok(Some(State::Format))
            }
        }
    }

    fn print_comment(&mut self) {
        let value = self.token.value.clone();
        self.output.push_str(&value);
        self.print_newline();
    }

    fn print_identifier(&mut self) -> Result<(), FormatError> {
        let peeked = self.peek();
        let value = self.token.value.clone();
        match peeked.value.as_str() {
            "{" | "}" | "(" | ")" | "[" | "]" | "|" | "," | ":" | ";" => {
                self.output.push_str(&value)
            }
            _ if peeked.kind == Kind::Dot => {
                self.output.push_str(&value);
                self.next();
                return self.print_dot();
            }
            _ if peeked.kind == Kind::Eof => self.output.push_str(&value),
            _ => {
                self.output.push_str(&value);
                self.output.push(' ');
            }
        }
        Ok(())
    }

    // Chains `a.b.c` through print_identifier.
    fn print_dot(&mut self) -> Result<(), FormatError> {
        self.output.push('.');
        if self.next().kind != Kind::Identifier {
            return Err(self.fail("invalid trailing dot".to_string()));
        }
        self.print_identifier()
    }

    fn print_operator(&mut self) {
        let value = self.token.value.clone();
        let mut trailing = true;
        match value.as_str() {
            "|" | "!" => trailing = false,
            "+" | "-" => {
                // Unary when following an opener, another operator, return,
                // or a case label.
                if matches!(
                    self.p_token.kind,
                    Kind::LeftParen | Kind::Operator | Kind::Return | Kind::Case
                ) {
                    trailing = false;
                }
            }
            _ => {}
        }
        if matches!(self.p_token.value.as_str(), ")" | "]") {
            self.output.push(' ');
        }
        self.output.push_str(&value);
        if trailing {
            self.output.push(' ');
        }
    }

    fn print_char(&mut self) -> Result<Option<State>, FormatError> {
        match self.token.value.as_str() {
            ":" | "," => {
                let value = self.token.value.clone();
                self.output.push_str(&value);
                self.output.push(' ');
                Ok(Some(State::Format))
            }
            ";" => {
                self.output.push(';');
                if let Some(top) = self.scope_level.last_mut() {
                    *top = 1;
                }
                Ok(Some(State::NewLine))
            }
            "{" => {
                self.output.push_str(" {");
                self.scope_level.push(1);
                self.newline_count = -1;
                Ok(Some(State::NewLine))
            }
            "}" => Ok(Some(State::RightBrace)),
            "." => {
                self.print_dot()?;
                Ok(Some(State::Format))
            }
            _ => {
                let value = self.token.value.clone();
                self.output.push_str(&value);
                Ok(Some(State::Format))
            }
        }
    }

    // `array<...>`: no spaces inside the angle brackets; a trailing space
    // after the outermost `>` only when an operator follows.
    fn print_array(&mut self) -> Result<(), FormatError> {
        if self.next().value != "<" {
            let got = self.describe_token();
            return Err(self.fail(format!("expected \"<\" got {got}")));
        }
        self.output.push_str("array<");
        match self.next().kind {
            Kind::Identifier => {
                let value = self.token.value.clone();
                self.output.push_str(&value);
                while self.peek().kind == Kind::Dot {
                    self.next();
                    self.output.push('.');
                    if self.next().kind != Kind::Identifier {
                        return Err(self.fail("invalid trailing dot".to_string()));
                    }
                    let value = self.token.value.clone();
                    self.output.push_str(&value);
                }
            }
            Kind::Array => self.print_array()?,
            _ => return Err(self.expected_identifier()),
        }
        if self.next().value != ">" {
            let got = self.describe_token();
            return Err(self.fail(format!("expected \">\" got {got}")));
        }
        let peeked = self.peek();
        if peeked.kind == Kind::Operator && peeked.value != ">" {
            self.output.push_str("> ");
        } else {
            self.output.push('>');
        }
        Ok(())
    }

    // Writes newline_count newlines (at least one), or a single one when
    // the next token is EOF. -1 re-peeks and forces a minimum of one.
    fn print_newline(&mut self) {
        if self.newline_count == -1 {
            self.peek();
            if self.newline_count < 1 {
                self.newline_count = 1;
            }
        }
        if self.peek().kind == Kind::Eof {
            self.output.push('\n');
            return;
        }
        let count = self.newline_count.max(1);
        for _ in 0..count {
            self.output.push('\n');
        }
    }

    // Indentation is the sum over the scope stack.
    fn print_tab(&mut self) {
        for level in &self.scope_level {
            for _ in 0..*level {
                self.output.push('\t');
            }
        }
    }

    fn bump_soft_scope(&mut self) {
        match self.scope_level.last_mut() {
            Some(top) => *top += 1,
            None => self.scope_level.push(1),
        }
    }

    fn describe_token(&self) -> String {
        format!("{}: {}", self.token.kind.name(), self.token.value)
    }

    fn fail(&mut self, message: String) -> FormatError {
        self.lexer.drain();
        FormatError::new(
            self.name.clone(),
            message,
            self.lexer.line_number(),
            self.token.pos,
        )
    }

    fn lex_failure(&mut self) -> FormatError {
        let message = self.token.value.clone();
        self.fail(message)
    }

    fn expected_identifier(&mut self) -> FormatError {
        let got = self.describe_token();
        self.fail(format!("expected Identifier got {got}"))
    }

    fn expected_parenthesis(&mut self) -> FormatError {
        let got = self.describe_token();
        self.fail(format!("expected parenthesis got {got}"))
    }

    fn unexpected_eof(&mut self) -> FormatError {
        self.fail("unexpected EOF wanted identifier".to_string())
    }
}

fn is_char(t: Kind) -> bool {
    matches!(
        t,
        Kind::Char
            | Kind::LeftParen
            | Kind::RightParen
            | Kind::LeftBrace
            | Kind::RightBrace
            | Kind::Dot
    )
}
