//! Token types for the JavaScript subset the minifier reads.

use crate::span::Span;

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub had_newline_before: bool,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub const fn new(kind: TokenKind, span: Span, had_newline_before: bool) -> Self {
        Self {
            kind,
            span,
            had_newline_before,
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals ===
    /// Identifier: `foo`, `_bar`, `$baz`
    Identifier(String),
    /// String literal: `"hello"`, `'world'`
    String(String),
    /// Number literal: `42`, `3.14`, `0xff`
    Number(f64),
    /// Regular expression: `/pattern/flags`
    Regex { pattern: String, flags: String },
    /// Template literal without substitutions
    TemplateNoSub(String),
    /// Template head: `` `hello ${``
    TemplateHead(String),
    /// Template middle: `` } middle ${``
    TemplateMiddle(String),
    /// Template tail: `` } end` ``
    TemplateTail(String),

    // === Keywords ===
    Var,
    Let,
    Const,
    Function,
    Class,
    If,
    Else,
    Switch,
    Case,
    Default,
    For,
    While,
    Do,
    Break,
    Continue,
    Return,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    Delete,
    Typeof,
    Void,
    In,
    Instanceof,
    This,
    Super,
    Null,
    True,
    False,
    Import,
    Export,
    Extends,
    Yield,
    With,
    Debugger,
    Enum,

    // === Punctuation ===
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Dot,
    Question,
    Arrow,
    Spread,
    QuestionDot,

    // === Operators ===
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    StarStarEq,
    AmpEq,
    PipeEq,
    CaretEq,
    LtLtEq,
    GtGtEq,
    GtGtGtEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,

    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    PlusPlus,
    MinusMinus,

    Amp,
    Pipe,
    Caret,
    Tilde,
    LtLt,
    GtGt,
    GtGtGt,

    AmpAmp,
    PipePipe,
    Bang,
    QuestionQuestion,

    // === Special ===
    /// End of file
    Eof,
    /// Invalid token (lexer error), with a description.
    Invalid(&'static str),
}

impl TokenKind {
    /// Check if this token can start an expression.
    pub fn can_start_expr(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::Regex { .. }
                | TokenKind::TemplateNoSub(_)
                | TokenKind::TemplateHead(_)
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Function
                | TokenKind::New
                | TokenKind::This
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Typeof
                | TokenKind::Void
                | TokenKind::Delete
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::Spread
        )
    }

    /// Whether a `/` after this token starts a regular expression.
    ///
    /// Operands (names, literals, closing brackets) are followed by division;
    /// operators, openers and keywords that expect an expression by a regex.
    pub fn allows_regex_after(&self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::Regex { .. }
                | TokenKind::TemplateNoSub(_)
                | TokenKind::TemplateTail(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Check if this is a keyword.
    pub fn is_keyword(&self) -> bool {
        !keyword_to_str(self).is_empty()
    }

    /// Get the precedence of a binary operator (higher = binds tighter).
    /// Returns None if not a binary operator.
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            TokenKind::QuestionQuestion => Some(1),
            TokenKind::PipePipe => Some(2),
            TokenKind::AmpAmp => Some(3),
            TokenKind::Pipe => Some(4),
            TokenKind::Caret => Some(5),
            TokenKind::Amp => Some(6),
            TokenKind::EqEq | TokenKind::EqEqEq | TokenKind::BangEq | TokenKind::BangEqEq => Some(7),
            TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq
            | TokenKind::In
            | TokenKind::Instanceof => Some(8),
            TokenKind::LtLt | TokenKind::GtGt | TokenKind::GtGtGt => Some(9),
            TokenKind::Plus | TokenKind::Minus => Some(10),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(11),
            TokenKind::StarStar => Some(12),
            _ => None,
        }
    }

    /// Check if this binary operator is right associative.
    pub fn is_right_associative(&self) -> bool {
        matches!(self, TokenKind::StarStar)
    }
}

/// Look up a keyword from an identifier string.
///
/// Contextual words (`get`, `set`, `of`, `async`, `static`) stay identifiers.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "var" => Some(TokenKind::Var),
        "let" => Some(TokenKind::Let),
        "const" => Some(TokenKind::Const),
        "function" => Some(TokenKind::Function),
        "class" => Some(TokenKind::Class),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "switch" => Some(TokenKind::Switch),
        "case" => Some(TokenKind::Case),
        "default" => Some(TokenKind::Default),
        "for" => Some(TokenKind::For),
        "while" => Some(TokenKind::While),
        "do" => Some(TokenKind::Do),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "return" => Some(TokenKind::Return),
        "try" => Some(TokenKind::Try),
        "catch" => Some(TokenKind::Catch),
        "finally" => Some(TokenKind::Finally),
        "throw" => Some(TokenKind::Throw),
        "new" => Some(TokenKind::New),
        "delete" => Some(TokenKind::Delete),
        "typeof" => Some(TokenKind::Typeof),
        "void" => Some(TokenKind::Void),
        "in" => Some(TokenKind::In),
        "instanceof" => Some(TokenKind::Instanceof),
        "this" => Some(TokenKind::This),
        "super" => Some(TokenKind::Super),
        "null" => Some(TokenKind::Null),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "import" => Some(TokenKind::Import),
        "export" => Some(TokenKind::Export),
        "extends" => Some(TokenKind::Extends),
        "yield" => Some(TokenKind::Yield),
        "with" => Some(TokenKind::With),
        "debugger" => Some(TokenKind::Debugger),
        "enum" => Some(TokenKind::Enum),
        _ => None,
    }
}

/// Source text of a keyword token, or `""` for anything else.
pub fn keyword_to_str(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Var => "var",
        TokenKind::Let => "let",
        TokenKind::Const => "const",
        TokenKind::Function => "function",
        TokenKind::Class => "class",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::Switch => "switch",
        TokenKind::Case => "case",
        TokenKind::Default => "default",
        TokenKind::For => "for",
        TokenKind::While => "while",
        TokenKind::Do => "do",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Return => "return",
        TokenKind::Try => "try",
        TokenKind::Catch => "catch",
        TokenKind::Finally => "finally",
        TokenKind::Throw => "throw",
        TokenKind::New => "new",
        TokenKind::Delete => "delete",
        TokenKind::Typeof => "typeof",
        TokenKind::Void => "void",
        TokenKind::In => "in",
        TokenKind::Instanceof => "instanceof",
        TokenKind::This => "this",
        TokenKind::Super => "super",
        TokenKind::Null => "null",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Import => "import",
        TokenKind::Export => "export",
        TokenKind::Extends => "extends",
        TokenKind::Yield => "yield",
        TokenKind::With => "with",
        TokenKind::Debugger => "debugger",
        TokenKind::Enum => "enum",
        _ => "",
    }
}

/// Words that can never be used as binding names or emitted as mangled names.
///
/// Keywords, future reserved words (strict mode included) and the global
/// value names a renamed binding must never shadow.
pub fn is_reserved_word(name: &str) -> bool {
    keyword_from_str(name).is_some()
        || matches!(
            name,
            "implements"
                | "interface"
                | "package"
                | "private"
                | "protected"
                | "public"
                | "static"
                | "await"
                | "abstract"
                | "boolean"
                | "byte"
                | "char"
                | "double"
                | "final"
                | "float"
                | "goto"
                | "int"
                | "long"
                | "native"
                | "short"
                | "synchronized"
                | "throws"
                | "transient"
                | "volatile"
                | "undefined"
                | "NaN"
                | "Infinity"
                | "arguments"
                | "eval"
        )
}
