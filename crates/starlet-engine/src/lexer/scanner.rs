//! The scanner that produces tokens from source text.

use std::collections::VecDeque;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use unicode_xid::UnicodeXID;

use super::{IntLiteral, Position, Token, TokenKind};
use crate::error::StaticError;

/// A scanner that tokenizes source code, synthesizing the layout tokens
/// (`Newline`, `Indent`, `Outdent`) of an indentation-sensitive grammar.
pub struct Scanner {
    chars: Vec<char>,
    index: usize,
    line: u32,
    col: u32,
    /// Nesting depth of (), [] and {}; newlines inside are insignificant
    depth: usize,
    indents: Vec<u32>,
    pending: VecDeque<Token>,
    at_line_start: bool,
    line_has_tokens: bool,
}

impl Scanner {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            col: 1,
            depth: 0,
            indents: vec![0],
            pending: VecDeque::new(),
            at_line_start: true,
            line_has_tokens: false,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, StaticError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            if self.at_line_start && self.depth == 0 {
                self.at_line_start = false;
                self.scan_indentation()?;
                continue;
            }

            self.skip_blanks()?;
            let pos = self.position();

            let Some(ch) = self.peek() else {
                if self.line_has_tokens {
                    self.line_has_tokens = false;
                    return Ok(Token::new(TokenKind::Newline, pos));
                }
                if self.indents.len() > 1 {
                    self.indents.pop();
                    return Ok(Token::new(TokenKind::Outdent, pos));
                }
                return Ok(Token::new(TokenKind::Eof, pos));
            };

            if ch == '\n' {
                self.advance();
                if self.depth > 0 {
                    continue;
                }
                self.at_line_start = true;
                if self.line_has_tokens {
                    self.line_has_tokens = false;
                    return Ok(Token::new(TokenKind::Newline, pos));
                }
                continue;
            }

            let kind = self.scan_token(ch, pos)?;
            self.line_has_tokens = true;
            return Ok(Token::new(kind, pos));
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.index).copied()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, pos: Position, msg: impl Into<String>) -> StaticError {
        StaticError::new(pos, msg)
    }

    /// Measures the indentation of a new line and queues indent/outdent tokens.
    /// Blank and comment-only lines never affect indentation.
    fn scan_indentation(&mut self) -> Result<(), StaticError> {
        let mut width = 0u32;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / 8 + 1) * 8,
                Some('\r') => {}
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None | Some('\n') | Some('#') => return Ok(()),
            Some('\\') if self.peek_at(1) == Some('\n') => return Ok(()),
            _ => {}
        }

        let pos = self.position();
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.pending.push_back(Token::new(TokenKind::Indent, pos));
        } else if width < current {
            while self.indents.last().is_some_and(|&top| top > width) {
                self.indents.pop();
                self.pending.push_back(Token::new(TokenKind::Outdent, pos));
            }
            if self.indents.last().copied() != Some(width) {
                return Err(self.error(pos, "unindent does not match any outer indentation level"));
            }
        }
        Ok(())
    }

    fn skip_blanks(&mut self) -> Result<(), StaticError> {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('\\') => {
                    let pos = self.position();
                    let next = if self.peek_at(1) == Some('\r') { 2 } else { 1 };
                    if self.peek_at(next) != Some('\n') {
                        return Err(self.error(pos, "stray backslash in program"));
                    }
                    for _ in 0..=next {
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_token(&mut self, ch: char, pos: Position) -> Result<TokenKind, StaticError> {
        if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.scan_number(pos);
        }
        if ch == '"' || ch == '\'' {
            return self.scan_string(pos, false, false);
        }
        if let Some((raw, bytes, prefix_len)) = self.string_prefix() {
            for _ in 0..prefix_len {
                self.advance();
            }
            return self.scan_string(pos, raw, bytes);
        }
        if is_id_start(ch) {
            return self.scan_identifier(pos);
        }

        self.advance();
        let kind = match ch {
            '(' => {
                self.depth += 1;
                TokenKind::LeftParen
            }
            '[' => {
                self.depth += 1;
                TokenKind::LeftBracket
            }
            '{' => {
                self.depth += 1;
                TokenKind::LeftBrace
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightParen
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightBracket
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightBrace
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '~' => TokenKind::Tilde,
            '+' => self.with_assign(TokenKind::Plus, TokenKind::PlusEq),
            '-' => self.with_assign(TokenKind::Minus, TokenKind::MinusEq),
            '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentEq),
            '&' => self.with_assign(TokenKind::Amp, TokenKind::AmpEq),
            '|' => self.with_assign(TokenKind::Pipe, TokenKind::PipeEq),
            '^' => self.with_assign(TokenKind::Caret, TokenKind::CaretEq),
            '*' => {
                if self.eat('*') {
                    TokenKind::StarStar
                } else {
                    self.with_assign(TokenKind::Star, TokenKind::StarEq)
                }
            }
            '/' => {
                if self.eat('/') {
                    self.with_assign(TokenKind::SlashSlash, TokenKind::SlashSlashEq)
                } else {
                    self.with_assign(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            '<' => {
                if self.eat('<') {
                    self.with_assign(TokenKind::LtLt, TokenKind::LtLtEq)
                } else {
                    self.with_assign(TokenKind::Lt, TokenKind::Le)
                }
            }
            '>' => {
                if self.eat('>') {
                    self.with_assign(TokenKind::GtGt, TokenKind::GtGtEq)
                } else {
                    self.with_assign(TokenKind::Gt, TokenKind::Ge)
                }
            }
            '=' => self.with_assign(TokenKind::Eq, TokenKind::EqEq),
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(self.error(pos, "unexpected input character '!'"));
                }
            }
            other => {
                return Err(self.error(pos, format!("unexpected input character {:?}", other)));
            }
        };
        Ok(kind)
    }

    fn with_assign(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.eat('=') { assign } else { plain }
    }

    /// Recognizes `r`, `b`, `rb` and `br` string prefixes.
    fn string_prefix(&self) -> Option<(bool, bool, usize)> {
        let is_quote = |c: Option<char>| matches!(c, Some('"' | '\''));
        match (self.peek(), self.peek_at(1)) {
            (Some('r'), next) if is_quote(next) => Some((true, false, 1)),
            (Some('b'), next) if is_quote(next) => Some((false, true, 1)),
            (Some('r'), Some('b')) | (Some('b'), Some('r')) if is_quote(self.peek_at(2)) => {
                Some((true, true, 2))
            }
            _ => None,
        }
    }

    fn scan_identifier(&mut self, pos: Position) -> Result<TokenKind, StaticError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if !is_id_continue(ch) {
                break;
            }
            name.push(ch);
            self.advance();
        }
        if let Some(keyword) = TokenKind::keyword(&name) {
            return Ok(keyword);
        }
        if TokenKind::is_reserved(&name) {
            return Err(self.error(pos, format!("keyword {} is reserved", name)));
        }
        Ok(TokenKind::Identifier(name))
    }

    fn scan_number(&mut self, pos: Position) -> Result<TokenKind, StaticError> {
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.advance();
                let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                return parse_int(&digits.replace('_', ""), radix)
                    .map(TokenKind::Int)
                    .ok_or_else(|| self.error(pos, "invalid int literal"));
            }
        }

        let mut text = self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.advance();
            text.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.advance();
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if self.peek().is_some_and(is_id_continue) {
            return Err(self.error(pos, "invalid numeric literal"));
        }

        let text = text.replace('_', "");
        if is_float {
            return text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error(pos, "invalid float literal"));
        }
        if text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
            return Err(self.error(pos, "obsolete form of octal literal; use 0o..."));
        }
        parse_int(&text, 10)
            .map(TokenKind::Int)
            .ok_or_else(|| self.error(pos, "invalid int literal"))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            out.push(ch);
            self.advance();
        }
        out
    }

    fn scan_string(&mut self, pos: Position, raw: bool, bytes: bool) -> Result<TokenKind, StaticError> {
        let quote = self.advance().unwrap_or('"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut buf: Vec<u8> = Vec::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error(pos, "unexpected EOF in string"));
            };
            if ch == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
                push_char(&mut buf, ch);
                continue;
            }
            if ch == '\n' && !triple {
                return Err(self.error(pos, "unexpected newline in string"));
            }
            if ch != '\\' {
                push_char(&mut buf, ch);
                continue;
            }

            let escape_pos = Position::new(self.line, self.col - 1);
            let Some(next) = self.advance() else {
                return Err(self.error(pos, "unexpected EOF in string"));
            };
            if raw {
                if next == '\n' {
                    continue;
                }
                buf.push(b'\\');
                push_char(&mut buf, next);
                continue;
            }
            match next {
                '\n' => {}
                'n' => buf.push(b'\n'),
                't' => buf.push(b'\t'),
                'r' => buf.push(b'\r'),
                'a' => buf.push(0x07),
                'b' => buf.push(0x08),
                'f' => buf.push(0x0c),
                'v' => buf.push(0x0b),
                '\\' | '\'' | '"' => push_char(&mut buf, next),
                'x' => {
                    let digits: String = (0..2).filter_map(|_| self.advance()).collect();
                    let value = u8::from_str_radix(&digits, 16)
                        .map_err(|_| self.error(escape_pos, "invalid escape sequence \\x"))?;
                    if !bytes && value > 0x7f {
                        return Err(self.error(
                            escape_pos,
                            "non-ASCII hex escape in string literal (use \\u)",
                        ));
                    }
                    buf.push(value);
                }
                '0'..='7' => {
                    let mut digits = next.to_string();
                    while digits.len() < 3 && self.peek().is_some_and(|c| ('0'..='7').contains(&c)) {
                        digits.extend(self.advance());
                    }
                    let value = u32::from_str_radix(&digits, 8).unwrap_or(u32::MAX);
                    if value > 0xff || (!bytes && value > 0x7f) {
                        return Err(self.error(escape_pos, "invalid octal escape"));
                    }
                    buf.push(value as u8);
                }
                'u' | 'U' => {
                    let width = if next == 'u' { 4 } else { 8 };
                    let digits: String = (0..width).filter_map(|_| self.advance()).collect();
                    let ch = u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error(escape_pos, "invalid Unicode escape"))?;
                    push_char(&mut buf, ch);
                }
                other => {
                    return Err(self.error(escape_pos, format!("invalid escape sequence \\{}", other)));
                }
            }
        }

        if bytes {
            return Ok(TokenKind::Bytes(buf));
        }
        String::from_utf8(buf)
            .map(TokenKind::String)
            .map_err(|_| self.error(pos, "invalid UTF-8 in string literal"))
    }
}

fn push_char(buf: &mut Vec<u8>, ch: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
}

fn parse_int(digits: &str, radix: u32) -> Option<IntLiteral> {
    if digits.is_empty() {
        return None;
    }
    if let Ok(small) = i64::from_str_radix(digits, radix) {
        return Some(IntLiteral::Small(small));
    }
    let big = BigInt::parse_bytes(digits.as_bytes(), radix)?;
    Some(match big.to_i64() {
        Some(small) => IntLiteral::Small(small),
        None => IntLiteral::Big(big),
    })
}

fn is_id_start(ch: char) -> bool {
    ch == '_' || UnicodeXID::is_xid_start(ch)
}

fn is_id_continue(ch: char) -> bool {
    ch == '_' || UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let token = scanner.next_token().expect("scan should succeed");
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    fn scan_error(src: &str) -> String {
        let mut scanner = Scanner::new(src);
        loop {
            match scanner.next_token() {
                Ok(token) if token.kind == TokenKind::Eof => panic!("expected a scan error"),
                Ok(_) => continue,
                Err(err) => return err.msg,
            }
        }
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Eq,
                TokenKind::Int(IntLiteral::Small(1)),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_indentation() {
        let toks = kinds("def f():\n    return 1\nx = 2\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Outdent));
        let indent = toks.iter().position(|t| *t == TokenKind::Indent).unwrap();
        assert_eq!(toks[indent + 1], TokenKind::Return);
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let toks = kinds("\n# comment\n\nx = 1  # trailing\n\n");
        assert_eq!(toks.len(), 4);
    }

    #[test]
    fn test_newlines_inside_brackets() {
        let toks = kinds("x = [\n  1,\n  2,\n]\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_outdent_at_eof() {
        let toks = kinds("if x:\n    y");
        assert_eq!(toks.last(), Some(&TokenKind::Outdent));
    }

    #[test]
    fn test_bad_unindent() {
        assert!(scan_error("if x:\n    y\n  z\n").contains("unindent"));
    }

    #[test]
    fn test_positions() {
        let mut scanner = Scanner::new("\ny = mul(x, n)\n");
        let y = scanner.next_token().unwrap();
        assert_eq!(y.pos, Position::new(2, 1));
        scanner.next_token().unwrap();
        let mul = scanner.next_token().unwrap();
        assert_eq!(mul.pos, Position::new(2, 5));
        let lparen = scanner.next_token().unwrap();
        assert_eq!(lparen.pos, Position::new(2, 8));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0x1f")[0], TokenKind::Int(IntLiteral::Small(31)));
        assert_eq!(kinds("0o17")[0], TokenKind::Int(IntLiteral::Small(15)));
        assert_eq!(kinds("0b101")[0], TokenKind::Int(IntLiteral::Small(5)));
        assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert!(matches!(
            kinds("123456789012345678901234567890")[0],
            TokenKind::Int(IntLiteral::Big(_))
        ));
    }

    #[test]
    fn test_obsolete_octal() {
        assert!(scan_error("x = 012").contains("octal"));
    }

    #[test]
    fn test_strings() {
        assert_eq!(kinds(r#""a\nb""#)[0], TokenKind::String("a\nb".into()));
        assert_eq!(kinds(r#"'it\'s'"#)[0], TokenKind::String("it's".into()));
        assert_eq!(kinds(r#"r"a\nb""#)[0], TokenKind::String("a\\nb".into()));
        assert_eq!(kinds("\"\"\"one\ntwo\"\"\"")[0], TokenKind::String("one\ntwo".into()));
        assert_eq!(kinds(r#""\u00e9""#)[0], TokenKind::String("é".into()));
    }

    #[test]
    fn test_bytes_literal() {
        assert_eq!(kinds(r#"b"\xff\x00a""#)[0], TokenKind::Bytes(vec![0xff, 0x00, b'a']));
    }

    #[test]
    fn test_string_errors() {
        assert!(scan_error("'abc").contains("string"));
        assert!(scan_error("'a\nb'").contains("newline"));
        assert!(scan_error(r#""\q""#).contains("invalid escape"));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a //= b ** c != d <<= e"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::SlashSlashEq,
                TokenKind::Identifier("b".into()),
                TokenKind::StarStar,
                TokenKind::Identifier("c".into()),
                TokenKind::NotEq,
                TokenKind::Identifier("d".into()),
                TokenKind::LtLtEq,
                TokenKind::Identifier("e".into()),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_reserved_keyword() {
        assert!(scan_error("class = 1").contains("reserved"));
    }

    #[test]
    fn test_line_continuation() {
        let toks = kinds("x = 1 + \\\n    2\n");
        let newlines = toks.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
        assert!(!toks.contains(&TokenKind::Indent));
    }
}
