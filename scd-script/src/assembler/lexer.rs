use super::diagnostic::{Diagnostic, DiagnosticCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    NewLine,
    Comment,
    Directive,
    Number,
    Symbol,
    Label,
    Opcode,
    Comma,
    Plus,
    Minus,
    Pipe,
    Invalid,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is_end_of_line(&self) -> bool {
        matches!(self.kind, TokenKind::NewLine | TokenKind::Eof)
    }

    /// Label name without the trailing colon.
    pub fn label_name(&self) -> &str {
        self.text.strip_suffix(':').unwrap_or(&self.text)
    }
}

fn is_word_char(c: char) -> bool {
    c == '_' || c == ':' || c.is_ascii_alphanumeric()
}

/// Parses a decimal or `0x` literal, optionally negative.
pub fn parse_number(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Splits assembly text into tokens. The first word on each line is classified as an opcode,
/// later words as symbols.
pub struct Lexer<'a> {
    path: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    expecting_opcode: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(path: &'a str, source: &str) -> Self {
        Lexer {
            path,
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            column: 0,
            expecting_opcode: true,
        }
    }

    fn peek(&self, skip: usize) -> Option<char> {
        self.chars.get(self.pos + skip).copied()
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&f) {
            self.pos += 1;
        }
    }

    fn next_kind(&mut self) -> TokenKind {
        let Some(c) = self.peek(0) else {
            return TokenKind::Eof;
        };
        match c {
            '\r' => {
                self.pos += 1;
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
                TokenKind::NewLine
            }
            '\n' => {
                self.pos += 1;
                TokenKind::NewLine
            }
            c if c.is_whitespace() => {
                self.take_while(|c| c.is_whitespace() && c != '\r' && c != '\n');
                TokenKind::Whitespace
            }
            ';' => {
                self.take_while(|c| c != '\r' && c != '\n');
                TokenKind::Comment
            }
            '.' => {
                self.pos += 1;
                self.take_while(is_word_char);
                self.expecting_opcode = false;
                TokenKind::Directive
            }
            '-' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.pos += 1;
                self.take_while(is_word_char);
                TokenKind::Number
            }
            c if c.is_ascii_digit() => {
                self.take_while(is_word_char);
                TokenKind::Number
            }
            c if is_word_char(c) => {
                self.take_while(is_word_char);
                if self.chars[self.pos - 1] == ':' {
                    TokenKind::Label
                } else if self.expecting_opcode {
                    self.expecting_opcode = false;
                    TokenKind::Opcode
                } else {
                    TokenKind::Symbol
                }
            }
            ',' | '+' | '-' | '|' => {
                self.pos += 1;
                match c {
                    ',' => TokenKind::Comma,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    _ => TokenKind::Pipe,
                }
            }
            _ => {
                self.take_while(|c| !is_word_char(c) && !c.is_whitespace() && c != ';');
                TokenKind::Invalid
            }
        }
    }

    pub fn next_token(&mut self, diagnostics: &mut Vec<Diagnostic>) -> Token {
        let start = self.pos;
        let kind = self.next_kind();
        let text: String = self.chars[start..self.pos].iter().collect();
        let token = Token {
            kind,
            text,
            line: self.line,
            column: self.column,
        };
        match kind {
            TokenKind::NewLine => {
                self.line += 1;
                self.column = 0;
                self.expecting_opcode = true;
            }
            TokenKind::Invalid => {
                diagnostics.push(Diagnostic::error(
                    self.path,
                    &token,
                    DiagnosticCode::InvalidSymbol,
                    format!("Invalid symbol '{}'.", token.text),
                ));
                self.column += self.pos - start;
            }
            _ => self.column += self.pos - start,
        }
        token
    }

    /// Every token up to and including end of file, minus whitespace and comments.
    pub fn tokenize(mut self, diagnostics: &mut Vec<Diagnostic>) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(diagnostics);
            match token.kind {
                TokenKind::Whitespace | TokenKind::Comment => continue,
                TokenKind::Eof => {
                    tokens.push(token);
                    return tokens;
                }
                _ => tokens.push(token),
            }
        }
    }
}
