use serde::Serialize;

/// A range of source text, tracking line and column of its start for error reporting.
///
/// `start` and `end` are byte offsets, `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Token classification shared by the CSS, SCSS and LESS dialects.
///
/// Kinds carry no data: the text of a token is always `&source[span.start..span.end]`.
/// Dialect-only kinds are never produced outside their dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Names
    Ident,
    Variable, // --custom
    Hash,     // #name
    Uri,      // url(...) as a single token
    Progid,   // progid:DXImageTransform.Microsoft.gradient
    UnicodeRange,
    String,

    // Numbers
    Number,
    Percentage,
    Length,
    Ems,
    Exs,
    Rem,
    Angle,
    Time,
    Freq,
    Resolution,
    Dimension,

    // At-keywords
    AtIdent,
    Charset,
    Import,
    Namespace,
    Media,
    Page,
    FontFace,
    CounterStyle,
    Supports,
    Layer,
    Container,
    Keyframes,
    VendorKeyframes,
    MozDocument,
    MarginSym,

    // SCSS at-keywords
    Mixin,
    Include,
    Function,
    Return,
    If,
    Else,
    ElseIf,
    For,
    Each,
    While,
    Extend,
    Use,
    Forward,
    Debug,
    Warn,
    ErrorAt,
    AtRoot,
    Content,

    // Dialect variables and interpolation
    SassVar,         // $name
    SassFlag,        // !default, !global, !optional
    ScssPlaceholder, // %name
    ScssInterpStart, // #{
    LessVar,         // @name, @@name
    LessInterp,      // @{name}
    LessJs,          // `...`

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Colon,
    DColon,
    Comma,
    Dot,
    Ellipsis,
    Ampersand,
    HashSymbol,       // lone #
    PercentageSymbol, // lone %
    Dollar,           // lone $
    At,               // lone @
    TemplateMark,     // @@@ left by server-side templating
    Exclamation,
    ImportantSym,

    // Operators
    Greater,
    Plus,
    Tilde,
    Star,
    Slash,
    Minus,
    Pipe,
    Equals,
    Includes,   // ~=
    DashMatch,  // |=
    BeginsWith, // ^=
    EndsWith,   // $=
    Contains,   // *=
    EqEq,
    NotEq,
    Less,
    LessOrEq,
    GreaterOrEq,

    // Trivia
    Ws,
    Comment,
    LineComment,
    Cdo, // <!--
    Cdc, // -->

    Invalid,
    Eof,
}

impl TokenKind {
    /// Whitespace and block comments. Line comments are decided by the grammar per dialect.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Ws | TokenKind::Comment)
    }

    /// Numeric kinds, with or without a unit.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::Percentage
                | TokenKind::Length
                | TokenKind::Ems
                | TokenKind::Exs
                | TokenKind::Rem
                | TokenKind::Angle
                | TokenKind::Time
                | TokenKind::Freq
                | TokenKind::Resolution
                | TokenKind::Dimension
        )
    }

    /// Kinds produced for `@keyword` forms, known or not.
    pub fn is_at_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::AtIdent
                | TokenKind::Charset
                | TokenKind::Import
                | TokenKind::Namespace
                | TokenKind::Media
                | TokenKind::Page
                | TokenKind::FontFace
                | TokenKind::CounterStyle
                | TokenKind::Supports
                | TokenKind::Layer
                | TokenKind::Container
                | TokenKind::Keyframes
                | TokenKind::VendorKeyframes
                | TokenKind::MozDocument
                | TokenKind::MarginSym
        ) || self.is_scss_keyword()
    }

    pub fn is_scss_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Mixin
                | TokenKind::Include
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::For
                | TokenKind::Each
                | TokenKind::While
                | TokenKind::Extend
                | TokenKind::Use
                | TokenKind::Forward
                | TokenKind::Debug
                | TokenKind::Warn
                | TokenKind::ErrorAt
                | TokenKind::AtRoot
                | TokenKind::Content
        )
    }

    /// Tokens that close or terminate a construct. The parser never swallows these
    /// into an error node when reporting them.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Semi
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Eof
        )
    }
}

/// A token produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The token's text in `source`.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.span.start..self.span.end).unwrap_or("")
    }
}

/// Page-margin box names recognized after `@` (`@top-left`, ...).
pub const MARGIN_SYMS: &[&str] = &[
    "top-left-corner",
    "top-left",
    "top-center",
    "top-right",
    "top-right-corner",
    "bottom-left-corner",
    "bottom-left",
    "bottom-center",
    "bottom-right",
    "bottom-right-corner",
    "left-top",
    "left-middle",
    "left-bottom",
    "right-top",
    "right-middle",
    "right-bottom",
];
