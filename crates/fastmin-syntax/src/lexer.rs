//! Lexer (tokenizer).
//!
//! The lexer is called on demand by the parser, which lets the previous token
//! decide whether `/` starts a regular expression or a division. Offsets are
//! shifted by the unit's base so every span lands in the program-wide space.

use crate::span::Span;
use crate::token::{keyword_from_str, Token, TokenKind};

/// The lexer state.
#[derive(Clone)]
pub struct Lexer<'a> {
    /// Unit text.
    src: &'a str,
    /// Unit text as bytes (for fast indexing).
    source: &'a [u8],
    /// Offset of this unit in the program-wide position space.
    base: u32,
    /// Current byte position.
    pos: usize,
    /// Start position of the current token.
    token_start: usize,
    /// Whether the previous token allows a regex to follow.
    allow_regex: bool,
    /// Whether a line terminator was skipped before the current token.
    newline_before: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for a standalone source text.
    pub fn new(source: &'a str) -> Self {
        Self::with_base(source, 0)
    }

    /// Create a lexer whose spans start at `base`.
    pub fn with_base(source: &'a str, base: u32) -> Self {
        Self {
            src: source,
            source: source.as_bytes(),
            base,
            pos: 0,
            token_start: 0,
            allow_regex: true,
            newline_before: false,
        }
    }

    /// Get the current byte position (relative to the unit).
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        self.newline_before = false;
        self.skip_whitespace_and_comments();
        self.token_start = self.pos;

        if self.is_eof() {
            return self.make_token(TokenKind::Eof);
        }

        let ch = self.current();
        let kind = match ch {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | b'\\' => self.scan_identifier(),
            0x80..=0xff => {
                if self.current_char().is_some_and(is_id_start_unicode) {
                    self.scan_identifier()
                } else {
                    self.advance_char();
                    TokenKind::Invalid("unexpected character")
                }
            }

            b'0'..=b'9' => self.scan_number(),

            b'"' | b'\'' => self.scan_string(ch),

            b'`' => self.scan_template_head(),

            b'(' => { self.advance(); TokenKind::LParen }
            b')' => { self.advance(); TokenKind::RParen }
            b'{' => { self.advance(); TokenKind::LBrace }
            b'}' => { self.advance(); TokenKind::RBrace }
            b'[' => { self.advance(); TokenKind::LBracket }
            b']' => { self.advance(); TokenKind::RBracket }
            b';' => { self.advance(); TokenKind::Semicolon }
            b',' => { self.advance(); TokenKind::Comma }
            b':' => { self.advance(); TokenKind::Colon }
            b'~' => { self.advance(); TokenKind::Tilde }

            b'.' => self.scan_dot(),
            b'?' => self.scan_question(),
            b'+' => self.scan_plus(),
            b'-' => self.scan_minus(),
            b'*' => self.scan_star(),
            b'/' => self.scan_slash(),
            b'%' => self.scan_percent(),
            b'=' => self.scan_equals(),
            b'!' => self.scan_bang(),
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),
            b'&' => self.scan_ampersand(),
            b'|' => self.scan_pipe(),
            b'^' => self.scan_caret(),

            _ => {
                self.advance();
                TokenKind::Invalid("unexpected character")
            }
        };

        self.allow_regex = kind.allows_regex_after();
        self.make_token(kind)
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&self) -> Token {
        self.clone().next_token()
    }

    // === Helper methods ===

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current(&self) -> u8 {
        self.source.get(self.pos).copied().unwrap_or(0)
    }

    fn current_char(&self) -> Option<char> {
        self.src.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    fn peek_char(&self) -> u8 {
        self.source.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn advance_char(&mut self) {
        self.pos += self.current_char().map_or(1, char::len_utf8);
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.base + self.token_start as u32,
                self.base + self.pos as u32,
            ),
            self.newline_before,
        )
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        self.src.get(start..end).unwrap_or("")
    }

    // === Whitespace and comments ===

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.advance(),
                b'\n' => {
                    self.newline_before = true;
                    self.advance();
                }
                b'/' if self.peek_char() == b'/' => self.skip_line_comment(),
                b'/' if self.peek_char() == b'*' => self.skip_block_comment(),
                0x80..=0xff => match self.current_char() {
                    Some('\u{2028}' | '\u{2029}') => {
                        self.newline_before = true;
                        self.advance_char();
                    }
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => self.advance_char(),
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.advance_n(2);
        while !self.is_eof() && self.current() != b'\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance_n(2);
        while !self.is_eof() {
            if self.current() == b'*' && self.peek_char() == b'/' {
                self.advance_n(2);
                return;
            }
            if self.current() == b'\n' {
                self.newline_before = true;
            }
            self.advance();
        }
    }

    // === Token scanning ===

    fn scan_identifier(&mut self) -> TokenKind {
        let mut name = String::new();
        let mut escaped = false;
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' => {
                    name.push(self.current() as char);
                    self.advance();
                }
                b'\\' if self.peek_char() == b'u' => {
                    self.advance_n(2);
                    escaped = true;
                    name.push(self.scan_unicode_escape());
                }
                0x80..=0xff => match self.current_char() {
                    Some(c) if is_id_continue_unicode(c) => {
                        name.push(c);
                        self.advance_char();
                    }
                    _ => break,
                },
                _ => break,
            }
        }

        if name.is_empty() {
            self.advance();
            return TokenKind::Invalid("unexpected character");
        }
        if escaped {
            return TokenKind::Identifier(name);
        }
        keyword_from_str(&name).unwrap_or(TokenKind::Identifier(name))
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        if self.current() == b'0' {
            match self.peek_char() {
                b'x' | b'X' => return self.scan_radix_number(16),
                b'b' | b'B' => return self.scan_radix_number(2),
                b'o' | b'O' => return self.scan_radix_number(8),
                _ => {}
            }
        }

        while self.current().is_ascii_digit() {
            self.advance();
        }

        if self.current() == b'.' {
            self.advance();
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        if self.current() == b'e' || self.current() == b'E' {
            self.advance();
            if self.current() == b'+' || self.current() == b'-' {
                self.advance();
            }
            if !self.current().is_ascii_digit() {
                return TokenKind::Invalid("missing exponent");
            }
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        if self.current().is_ascii_alphabetic() || self.current() == b'_' || self.current() == b'$' {
            return TokenKind::Invalid("identifier directly after number");
        }

        let num_str = self.slice(start, self.pos);
        match num_str.parse::<f64>() {
            Ok(value) => TokenKind::Number(value),
            Err(_) => TokenKind::Invalid("malformed number"),
        }
    }

    fn scan_radix_number(&mut self, radix: u32) -> TokenKind {
        let start = self.pos + 2;
        self.advance_n(2);

        while (self.current() as char).is_digit(radix) {
            self.advance();
        }

        let digits = self.slice(start, self.pos);
        if digits.is_empty() {
            return TokenKind::Invalid("missing digits after radix prefix");
        }
        let value = digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0_f64, |acc, d| acc * f64::from(radix) + f64::from(d));
        TokenKind::Number(value)
    }

    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.advance();

        let mut value = String::new();
        loop {
            if self.is_eof() {
                return TokenKind::Invalid("unterminated string literal");
            }
            match self.current() {
                c if c == quote => {
                    self.advance();
                    return TokenKind::String(value);
                }
                b'\n' | b'\r' => return TokenKind::Invalid("unterminated string literal"),
                b'\\' => {
                    self.advance();
                    if let Some(c) = self.scan_escape_sequence() {
                        value.push(c);
                    }
                }
                _ => {
                    if let Some(c) = self.current_char() {
                        value.push(c);
                    }
                    self.advance_char();
                }
            }
        }
    }

    /// Scan the character after a backslash. `None` means a line continuation.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let ch = self.current();
        match ch {
            b'\r' => {
                self.advance();
                if self.current() == b'\n' {
                    self.advance();
                }
                return None;
            }
            b'\n' => {
                self.advance();
                return None;
            }
            _ => {}
        }

        if ch >= 0x80 {
            let c = self.current_char();
            self.advance_char();
            return match c {
                Some('\u{2028}' | '\u{2029}') => None,
                other => other,
            };
        }

        self.advance();
        Some(match ch {
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'v' => '\u{b}',
            b'0' if !self.current().is_ascii_digit() => '\0',
            b'x' => self.scan_hex_escape(2),
            b'u' => self.scan_unicode_escape(),
            _ => ch as char,
        })
    }

    fn scan_hex_escape(&mut self, len: usize) -> char {
        let mut value = 0u32;
        for _ in 0..len {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    /// Scan the part of a `\u` escape after the `u`.
    fn scan_unicode_escape(&mut self) -> char {
        if self.current() != b'{' {
            let high = self.scan_hex_code_unit();
            // Surrogate pair written as two escapes.
            if (0xD800..0xDC00).contains(&high)
                && self.current() == b'\\'
                && self.peek_char() == b'u'
            {
                let saved = self.pos;
                self.advance_n(2);
                let low = self.scan_hex_code_unit();
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).unwrap_or('\u{FFFD}');
                }
                self.pos = saved;
            }
            return char::from_u32(high).unwrap_or('\u{FFFD}');
        }

        self.advance();
        let mut value = 0u32;
        while self.current() != b'}' && !self.is_eof() {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value.saturating_mul(16).saturating_add(digit);
                self.advance();
            } else {
                break;
            }
        }
        if self.current() == b'}' {
            self.advance();
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    fn scan_hex_code_unit(&mut self) -> u32 {
        let mut value = 0u32;
        for _ in 0..4 {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        value
    }

    fn scan_template_head(&mut self) -> TokenKind {
        self.advance();
        match self.scan_template_chars() {
            Some((value, true)) => TokenKind::TemplateHead(value),
            Some((value, false)) => TokenKind::TemplateNoSub(value),
            None => TokenKind::Invalid("unterminated template literal"),
        }
    }

    /// Scan a template middle or tail. Called by the parser right after the
    /// `}` that closes a substitution has been lexed.
    pub fn scan_template_continuation(&mut self) -> Token {
        self.token_start = self.pos.saturating_sub(1);
        self.newline_before = false;
        let kind = match self.scan_template_chars() {
            Some((value, true)) => TokenKind::TemplateMiddle(value),
            Some((value, false)) => TokenKind::TemplateTail(value),
            None => TokenKind::Invalid("unterminated template literal"),
        };
        self.allow_regex = kind.allows_regex_after();
        self.make_token(kind)
    }

    /// Cooked characters up to the next `` ` `` (false) or `${` (true).
    fn scan_template_chars(&mut self) -> Option<(String, bool)> {
        let mut value = String::new();
        while !self.is_eof() {
            match self.current() {
                b'`' => {
                    self.advance();
                    return Some((value, false));
                }
                b'$' if self.peek_char() == b'{' => {
                    self.advance_n(2);
                    return Some((value, true));
                }
                b'\\' => {
                    self.advance();
                    if let Some(c) = self.scan_escape_sequence() {
                        value.push(c);
                    }
                }
                _ => {
                    if let Some(c) = self.current_char() {
                        value.push(c);
                    }
                    self.advance_char();
                }
            }
        }
        None
    }

    fn scan_regex(&mut self) -> TokenKind {
        self.advance();
        let pattern_start = self.pos;

        let mut in_class = false;
        loop {
            if self.is_eof() {
                return TokenKind::Invalid("unterminated regular expression");
            }
            match self.current() {
                b'/' if !in_class => break,
                b'[' => {
                    in_class = true;
                    self.advance();
                }
                b']' => {
                    in_class = false;
                    self.advance();
                }
                b'\\' => {
                    self.advance();
                    if !self.is_eof() {
                        self.advance_char();
                    }
                }
                b'\n' | b'\r' => return TokenKind::Invalid("unterminated regular expression"),
                _ => self.advance_char(),
            }
        }

        let pattern = self.slice(pattern_start, self.pos).to_string();
        self.advance();

        let flags_start = self.pos;
        while self.current().is_ascii_alphabetic() {
            self.advance();
        }
        let flags = self.slice(flags_start, self.pos).to_string();

        TokenKind::Regex { pattern, flags }
    }

    // === Multi-character operators ===

    fn scan_dot(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'.' && self.peek_char() == b'.' {
            self.advance_n(2);
            TokenKind::Spread
        } else if self.current().is_ascii_digit() {
            self.pos -= 1;
            self.scan_number()
        } else {
            TokenKind::Dot
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'?' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::QuestionQuestionEq
                } else {
                    TokenKind::QuestionQuestion
                }
            }
            b'.' if !self.peek_char().is_ascii_digit() => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'+' => { self.advance(); TokenKind::PlusPlus }
            b'=' => { self.advance(); TokenKind::PlusEq }
            _ => TokenKind::Plus,
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'-' => { self.advance(); TokenKind::MinusMinus }
            b'=' => { self.advance(); TokenKind::MinusEq }
            _ => TokenKind::Minus,
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'*' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::StarStarEq
                } else {
                    TokenKind::StarStar
                }
            }
            b'=' => { self.advance(); TokenKind::StarEq }
            _ => TokenKind::Star,
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        if self.allow_regex {
            return self.scan_regex();
        }
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::SlashEq
        } else {
            TokenKind::Slash
        }
    }

    fn scan_percent(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::PercentEq
        } else {
            TokenKind::Percent
        }
    }

    fn scan_equals(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            b'>' => { self.advance(); TokenKind::Arrow }
            _ => TokenKind::Eq,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            if self.current() == b'=' {
                self.advance();
                TokenKind::BangEqEq
            } else {
                TokenKind::BangEq
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'<' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::LtLtEq
                } else {
                    TokenKind::LtLt
                }
            }
            b'=' => { self.advance(); TokenKind::LtEq }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'>' => {
                self.advance();
                match self.current() {
                    b'>' => {
                        self.advance();
                        if self.current() == b'=' {
                            self.advance();
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    }
                    b'=' => { self.advance(); TokenKind::GtGtEq }
                    _ => TokenKind::GtGt,
                }
            }
            b'=' => { self.advance(); TokenKind::GtEq }
            _ => TokenKind::Gt,
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'&' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::AmpAmpEq
                } else {
                    TokenKind::AmpAmp
                }
            }
            b'=' => { self.advance(); TokenKind::AmpEq }
            _ => TokenKind::Amp,
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'|' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::PipePipeEq
                } else {
                    TokenKind::PipePipe
                }
            }
            b'=' => { self.advance(); TokenKind::PipeEq }
            _ => TokenKind::Pipe,
        }
    }

    fn scan_caret(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::CaretEq
        } else {
            TokenKind::Caret
        }
    }
}

fn is_id_start_unicode(c: char) -> bool {
    c.is_alphabetic()
}

fn is_id_continue_unicode(c: char) -> bool {
    c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Whether `name` can be written as a bare identifier (ignoring keywords).
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '$' || c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && is_id_start_unicode(c)) => {}
        _ => return false,
    }
    chars.all(|c| c == '$' || c == '_' || c.is_ascii_alphanumeric() || (!c.is_ascii() && is_id_continue_unicode(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if matches!(token.kind, TokenKind::Eof) {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            tokenize("foo bar _baz $qux"),
            vec![
                TokenKind::Identifier("foo".into()),
                TokenKind::Identifier("bar".into()),
                TokenKind::Identifier("_baz".into()),
                TokenKind::Identifier("$qux".into()),
            ]
        );
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(
            tokenize("café"),
            vec![TokenKind::Identifier("café".into())]
        );
    }

    #[test]
    fn test_keywords_and_contextual_words() {
        assert_eq!(
            tokenize("const let var function get"),
            vec![
                TokenKind::Const,
                TokenKind::Let,
                TokenKind::Var,
                TokenKind::Function,
                TokenKind::Identifier("get".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("42 3.14 0xff 0b101 0o77 .5 1e3"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.14),
                TokenKind::Number(255.0),
                TokenKind::Number(5.0),
                TokenKind::Number(63.0),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            tokenize(r#""he\"llo" 'wörld' "A\x42""#),
            vec![
                TokenKind::String("he\"llo".into()),
                TokenKind::String("wörld".into()),
                TokenKind::String("AB".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(tokenize("'abc")[0], TokenKind::Invalid(_)));
    }

    #[test]
    fn test_regex_vs_division() {
        assert_eq!(
            tokenize("a / b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Slash,
                TokenKind::Identifier("b".into()),
            ]
        );
        assert_eq!(
            tokenize("x = /ab+c/gi"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Eq,
                TokenKind::Regex {
                    pattern: "ab+c".into(),
                    flags: "gi".into()
                },
            ]
        );
    }

    #[test]
    fn test_newline_tracking() {
        let mut lexer = Lexer::new("a\nb /* x\n */ c d");
        assert!(!lexer.next_token().had_newline_before);
        assert!(lexer.next_token().had_newline_before);
        assert!(lexer.next_token().had_newline_before);
        assert!(!lexer.next_token().had_newline_before);
    }

    #[test]
    fn test_spans_are_shifted_by_base() {
        let mut lexer = Lexer::with_base("  foo", 100);
        let token = lexer.next_token();
        assert_eq!(token.span, Span::new(102, 105));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("a // line comment\nb /* block */ c"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_template_literal_no_sub() {
        assert_eq!(
            tokenize("`hello world`"),
            vec![TokenKind::TemplateNoSub("hello world".into())]
        );
    }

    #[test]
    fn test_is_identifier_name() {
        assert!(is_identifier_name("foo$1"));
        assert!(is_identifier_name("_"));
        assert!(!is_identifier_name("1a"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }
}
