use crate::dialect::Dialect;
use crate::token::{Span, Token, TokenKind, MARGIN_SYMS};

/// Saved scanner position for the few constructs that need to back out of a
/// speculative scan (`url(` bodies, `@{` interpolation, `progid:` names).
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    offset: usize,
    line: usize,
    column: usize,
}

/// CSS/SCSS/LESS source scanner.
///
/// Converts source text into a flat token vector terminated by `Eof`.
/// Scanning never fails: unknown characters become one-character `Invalid`
/// tokens and unterminated strings become `Invalid` tokens, so every byte of
/// the source is covered by exactly one token.
///
/// - `Vec<char>` source for index-based navigation
/// - byte offsets tracked alongside char positions, so spans slice the source
/// - dialect-aware scanning of `$var`, `@var`, `#{` and `@{name}`
/// - position tracking on every token
pub struct Scanner<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    offset: usize,
    line: usize,
    column: usize,
    dialect: Dialect,
    tokens: Vec<Token>,
    start: Checkpoint,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source and dialect.
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        let start = Checkpoint {
            pos: 0,
            offset: 0,
            line: 1,
            column: 1,
        };
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
            offset: 0,
            line: 1,
            column: 1,
            dialect,
            tokens: Vec::new(),
            start,
        }
    }

    /// Tokenize the entire source into a vector of tokens ending with `Eof`.
    pub fn tokenize(source: &str, dialect: Dialect) -> Vec<Token> {
        let mut scanner = Scanner::new(source, dialect);
        scanner.scan_tokens();
        scanner.tokens
    }

    /// Scan all tokens from the source.
    fn scan_tokens(&mut self) {
        while !self.is_at_end() {
            self.begin();
            self.scan_token();
        }
        self.begin();
        self.emit(TokenKind::Eof);
        tracing::trace!(
            tokens = self.tokens.len(),
            bytes = self.source.len(),
            "tokenized"
        );
    }

    /// Scan the next token. Always consumes at least one character.
    fn scan_token(&mut self) {
        let c = self.peek();

        match c {
            ' ' | '\t' | '\n' | '\r' | '\x0c' => {
                while is_whitespace(self.peek()) && !self.is_at_end() {
                    self.advance();
                }
                self.emit(TokenKind::Ws);
            }

            // Comments
            '/' if self.peek_next() == '*' => self.scan_block_comment(),
            '/' if self.peek_next() == '/' => self.scan_line_comment(),

            '"' | '\'' => self.scan_string(),

            '0'..='9' => self.scan_number(),
            '.' if self.peek_next().is_ascii_digit() => self.scan_number(),
            '+' if self.starts_number_at(1) => self.scan_number(),
            '-' => self.scan_minus(),

            'u' | 'U' if self.starts_unicode_range() => self.scan_unicode_range(),
            '\\' if self.is_escape_at(0) => self.scan_identifier(),
            c if is_name_start(c) => self.scan_identifier(),

            '#' => self.scan_hash(),
            '@' => self.scan_at(),
            '$' => self.scan_dollar(),
            '%' => self.scan_percent(),
            '!' => self.scan_bang(),
            '`' if self.dialect == Dialect::Less => self.scan_less_js(),

            '.' => {
                if self.peek_next() == '.' && self.peek_at(2) == '.' {
                    self.advance_by(3);
                    self.emit(TokenKind::Ellipsis);
                } else {
                    self.single(TokenKind::Dot);
                }
            }
            ':' => {
                if self.peek_next() == ':' {
                    self.advance_by(2);
                    self.emit(TokenKind::DColon);
                } else {
                    self.single(TokenKind::Colon);
                }
            }
            '<' => {
                if self.peek_next() == '!' && self.peek_at(2) == '-' && self.peek_at(3) == '-' {
                    self.advance_by(4);
                    self.emit(TokenKind::Cdo);
                } else {
                    self.pair_or('=', TokenKind::LessOrEq, TokenKind::Less);
                }
            }
            '>' => self.pair_or('=', TokenKind::GreaterOrEq, TokenKind::Greater),
            '=' => match self.peek_next() {
                '=' => self.pair(TokenKind::EqEq),
                '<' => self.pair(TokenKind::LessOrEq),
                '>' => self.pair(TokenKind::GreaterOrEq),
                _ => self.single(TokenKind::Equals),
            },
            '~' => self.pair_or('=', TokenKind::Includes, TokenKind::Tilde),
            '|' => self.pair_or('=', TokenKind::DashMatch, TokenKind::Pipe),
            '^' => self.pair_or('=', TokenKind::BeginsWith, TokenKind::Invalid),
            '*' => self.pair_or('=', TokenKind::Contains, TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '+' => self.single(TokenKind::Plus),
            '&' => self.single(TokenKind::Ampersand),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ';' => self.single(TokenKind::Semi),
            ',' => self.single(TokenKind::Comma),

            _ => self.single(TokenKind::Invalid),
        }
    }

    // --- Scanners ---

    /// Scan a `/* ... */` comment. An unterminated comment runs to the end of input.
    fn scan_block_comment(&mut self) {
        self.advance_by(2);
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance_by(2);
                break;
            }
            self.advance();
        }
        self.emit(TokenKind::Comment);
    }

    /// Scan a `// ...` comment up to, not including, the line break.
    fn scan_line_comment(&mut self) {
        self.advance_by(2);
        while !self.is_at_end() && !matches!(self.peek(), '\n' | '\r' | '\x0c') {
            self.advance();
        }
        self.emit(TokenKind::LineComment);
    }

    /// Scan a quoted string. A string cut off by a line break or the end of
    /// input becomes an `Invalid` token that stops before the break.
    fn scan_string(&mut self) {
        let quote = self.peek();
        self.advance();

        loop {
            if self.is_at_end() {
                self.emit(TokenKind::Invalid);
                return;
            }
            match self.peek() {
                c if c == quote => {
                    self.advance();
                    self.emit(TokenKind::String);
                    return;
                }
                '\n' | '\r' | '\x0c' => {
                    self.emit(TokenKind::Invalid);
                    return;
                }
                '\\' => {
                    self.advance();
                    if self.peek() == '\r' && self.peek_next() == '\n' {
                        self.advance();
                    }
                    if !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
        }
    }

    /// Scan a number with an optional sign, fraction, exponent and unit.
    fn scan_number(&mut self) {
        if matches!(self.peek(), '+' | '-') {
            self.advance();
        }
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            let signed = matches!(self.peek_next(), '+' | '-') && self.peek_at(2).is_ascii_digit();
            if self.peek_next().is_ascii_digit() || signed {
                self.advance_by(if signed { 2 } else { 1 });
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        if self.peek() == '%' {
            self.advance();
            self.emit(TokenKind::Percentage);
            return;
        }

        if self.starts_identifier_at(0) {
            let unit_start = self.offset;
            self.scan_name_chars();
            let unit = self.source[unit_start..self.offset].to_ascii_lowercase();
            self.emit(unit_kind(&unit));
            return;
        }

        self.emit(TokenKind::Number);
    }

    /// `-` starts a custom property, an identifier, a negative number, `-->` or
    /// is a plain minus.
    fn scan_minus(&mut self) {
        if self.peek_next() == '-' {
            if self.peek_at(2) == '>' {
                self.advance_by(3);
                self.emit(TokenKind::Cdc);
            } else {
                self.advance_by(2);
                self.scan_name_chars();
                self.emit(TokenKind::Variable);
            }
        } else if self.starts_number_at(1) {
            self.scan_number();
        } else if self.starts_identifier_at(0) {
            self.scan_identifier();
        } else {
            self.single(TokenKind::Minus);
        }
    }

    /// Scan an identifier. Handles the `url(` and `progid:` special forms.
    fn scan_identifier(&mut self) {
        self.scan_name_chars();
        let name = self.source[self.start.offset..self.offset].to_ascii_lowercase();

        if self.peek() == '(' && (name == "url" || name == "url-prefix") && self.scan_uri_body() {
            self.emit(TokenKind::Uri);
            return;
        }

        if name == "progid" && self.peek() == ':' && self.scan_progid_tail() {
            self.emit(TokenKind::Progid);
            return;
        }

        self.emit(TokenKind::Ident);
    }

    /// Try to scan `( body )` after `url`. Restores the position and returns
    /// false when the body is not a plain URL, so the grammar sees a function.
    fn scan_uri_body(&mut self) -> bool {
        let saved = self.checkpoint();
        self.advance(); // consume `(`
        self.skip_whitespace();

        if matches!(self.peek(), '"' | '\'') {
            if self.scan_quoted_body() {
                self.skip_whitespace();
                if self.peek() == ')' {
                    self.advance();
                    return true;
                }
            }
            self.restore(saved);
            return false;
        }

        if self.dialect.is_preprocessor() && matches!(self.peek(), '$' | '@') {
            self.restore(saved);
            return false;
        }

        loop {
            if self.is_at_end() {
                break;
            }
            match self.peek() {
                ')' => {
                    self.advance();
                    return true;
                }
                c if is_whitespace(c) => {
                    self.skip_whitespace();
                    if self.peek() == ')' {
                        self.advance();
                        return true;
                    }
                    break;
                }
                '"' | '\'' | '(' => break,
                '#' if self.dialect == Dialect::Scss && self.peek_next() == '{' => break,
                '@' if self.dialect == Dialect::Less && self.peek_next() == '{' => break,
                '\\' if self.is_escape_at(0) => self.advance_by(2),
                _ => self.advance(),
            }
        }

        self.restore(saved);
        false
    }

    /// Consume a terminated quoted string body, returning false if it is not terminated.
    fn scan_quoted_body(&mut self) -> bool {
        let quote = self.peek();
        self.advance();
        while !self.is_at_end() {
            match self.peek() {
                c if c == quote => {
                    self.advance();
                    return true;
                }
                '\n' | '\r' => return false,
                '\\' => self.advance_by(2),
                _ => self.advance(),
            }
        }
        false
    }

    /// Scan `:DXImageTransform.Microsoft.gradient` after `progid`.
    fn scan_progid_tail(&mut self) -> bool {
        let saved = self.checkpoint();
        self.advance(); // consume `:`
        let name_start = self.pos;
        while is_name_char(self.peek()) || self.peek() == '.' {
            self.advance();
        }
        if self.pos == name_start {
            self.restore(saved);
            return false;
        }
        true
    }

    /// `#name`, SCSS `#{`, or a lone `#`.
    fn scan_hash(&mut self) {
        if self.dialect == Dialect::Scss && self.peek_next() == '{' {
            self.advance_by(2);
            self.emit(TokenKind::ScssInterpStart);
        } else if is_name_char(self.peek_next()) || self.is_escape_at(1) {
            self.advance();
            self.scan_name_chars();
            self.emit(TokenKind::Hash);
        } else {
            self.single(TokenKind::HashSymbol);
        }
    }

    /// At-keywords, LESS variables and LESS `@{name}` interpolation.
    fn scan_at(&mut self) {
        if self.peek_next() == '@' && self.peek_at(2) == '@' {
            self.advance_by(3);
            self.emit(TokenKind::TemplateMark);
            return;
        }
        if self.dialect == Dialect::Less {
            if self.peek_next() == '{' && self.scan_less_interpolation() {
                self.emit(TokenKind::LessInterp);
                return;
            }
            if self.peek_next() == '@' && is_name_start(self.peek_at(2)) {
                self.advance_by(2);
                self.scan_name_chars();
                self.emit(TokenKind::LessVar);
                return;
            }
        }

        let starts_name = self.starts_identifier_at(1)
            || (self.peek_next() == '-' && self.peek_at(2) == '-');
        if !starts_name {
            self.single(TokenKind::At);
            return;
        }

        self.advance(); // consume `@`
        let name_start = self.offset;
        self.scan_name_chars();
        let name = self.source[name_start..self.offset].to_ascii_lowercase();
        let kind = self.at_keyword(&name);
        self.emit(kind);
    }

    /// Scan `@{name}`. Restores and returns false if it is not closed.
    fn scan_less_interpolation(&mut self) -> bool {
        let saved = self.checkpoint();
        self.advance_by(2); // consume `@{`
        let name_start = self.pos;
        self.scan_name_chars();
        if self.pos > name_start && self.peek() == '}' {
            self.advance();
            return true;
        }
        self.restore(saved);
        false
    }

    /// `$name` in SCSS, `$=`, or a lone `$`.
    fn scan_dollar(&mut self) {
        if self.peek_next() == '=' {
            self.pair(TokenKind::EndsWith);
        } else if self.dialect == Dialect::Scss
            && (is_name_start(self.peek_next()) || self.peek_next() == '-')
        {
            self.advance();
            self.scan_name_chars();
            self.emit(TokenKind::SassVar);
        } else {
            self.single(TokenKind::Dollar);
        }
    }

    /// `%name` placeholder in SCSS, otherwise a lone percentage symbol.
    fn scan_percent(&mut self) {
        if self.dialect == Dialect::Scss && is_name_start(self.peek_next()) {
            self.advance();
            self.scan_name_chars();
            self.emit(TokenKind::ScssPlaceholder);
        } else {
            self.single(TokenKind::PercentageSymbol);
        }
    }

    /// `!important` (whitespace allowed after `!`), `!=`, SCSS flags, or `!`.
    fn scan_bang(&mut self) {
        if self.peek_next() == '=' {
            self.pair(TokenKind::NotEq);
            return;
        }

        let mut k = 1;
        while is_whitespace(self.peek_at(k)) && self.pos + k < self.chars.len() {
            k += 1;
        }
        if self.matches_word_at(k, "important") {
            self.advance_by(k + "important".len());
            self.emit(TokenKind::ImportantSym);
            return;
        }

        if self.dialect == Dialect::Scss {
            for flag in ["default", "global", "optional"] {
                if self.matches_word_at(1, flag) {
                    self.advance_by(1 + flag.len());
                    self.emit(TokenKind::SassFlag);
                    return;
                }
            }
        }

        self.single(TokenKind::Exclamation);
    }

    /// LESS backtick JavaScript evaluation.
    fn scan_less_js(&mut self) {
        self.advance();
        while !self.is_at_end() && self.peek() != '`' {
            self.advance();
        }
        if self.is_at_end() {
            self.emit(TokenKind::Invalid);
        } else {
            self.advance();
            self.emit(TokenKind::LessJs);
        }
    }

    /// `U+0025-00FF`, `u+4??`.
    fn scan_unicode_range(&mut self) {
        self.advance_by(2);
        let mut count = 0;
        while count < 6 && (self.peek().is_ascii_hexdigit() || self.peek() == '?') {
            self.advance();
            count += 1;
        }
        if self.peek() == '-' && self.peek_next().is_ascii_hexdigit() {
            self.advance();
            let mut count = 0;
            while count < 6 && self.peek().is_ascii_hexdigit() {
                self.advance();
                count += 1;
            }
        }
        self.emit(TokenKind::UnicodeRange);
    }

    // --- Keyword detection ---

    /// Classify an at-keyword name (lowercased, without `@`).
    fn at_keyword(&self, name: &str) -> TokenKind {
        let known = match name {
            "charset" => Some(TokenKind::Charset),
            "import" => Some(TokenKind::Import),
            "namespace" => Some(TokenKind::Namespace),
            "media" => Some(TokenKind::Media),
            "page" => Some(TokenKind::Page),
            "font-face" => Some(TokenKind::FontFace),
            "counter-style" => Some(TokenKind::CounterStyle),
            "supports" => Some(TokenKind::Supports),
            "layer" => Some(TokenKind::Layer),
            "container" => Some(TokenKind::Container),
            "keyframes" => Some(TokenKind::Keyframes),
            "-webkit-keyframes" | "-moz-keyframes" | "-o-keyframes" | "-ms-keyframes" => {
                Some(TokenKind::VendorKeyframes)
            }
            "-moz-document" => Some(TokenKind::MozDocument),
            n if MARGIN_SYMS.contains(&n) => Some(TokenKind::MarginSym),
            _ => None,
        };
        if let Some(kind) = known {
            return kind;
        }

        match self.dialect {
            Dialect::Scss => match name {
                "mixin" => TokenKind::Mixin,
                "include" => TokenKind::Include,
                "function" => TokenKind::Function,
                "return" => TokenKind::Return,
                "if" => TokenKind::If,
                "else" => TokenKind::Else,
                "elseif" => TokenKind::ElseIf,
                "for" => TokenKind::For,
                "each" => TokenKind::Each,
                "while" => TokenKind::While,
                "extend" => TokenKind::Extend,
                "use" => TokenKind::Use,
                "forward" => TokenKind::Forward,
                "debug" => TokenKind::Debug,
                "warn" => TokenKind::Warn,
                "error" => TokenKind::ErrorAt,
                "at-root" => TokenKind::AtRoot,
                "content" => TokenKind::Content,
                _ => TokenKind::AtIdent,
            },
            Dialect::Less if !name.starts_with('-') => TokenKind::LessVar,
            _ => TokenKind::AtIdent,
        }
    }

    // --- Helpers ---

    fn begin(&mut self) {
        self.start = self.checkpoint();
    }

    /// Push a token spanning from the start of the current scan to here.
    fn emit(&mut self, kind: TokenKind) {
        let span = Span::new(
            self.start.offset,
            self.offset,
            self.start.line,
            self.start.column,
        );
        self.tokens.push(Token::new(kind, span));
    }

    fn single(&mut self, kind: TokenKind) {
        self.advance();
        self.emit(kind);
    }

    fn pair(&mut self, kind: TokenKind) {
        self.advance_by(2);
        self.emit(kind);
    }

    fn pair_or(&mut self, second: char, paired: TokenKind, alone: TokenKind) {
        if self.peek_next() == second {
            self.pair(paired);
        } else {
            self.single(alone);
        }
    }

    fn scan_name_chars(&mut self) {
        loop {
            if is_name_char(self.peek()) && !self.is_at_end() {
                self.advance();
            } else if self.is_escape_at(0) {
                self.advance_by(2);
            } else {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && is_whitespace(self.peek()) {
            self.advance();
        }
    }

    /// Whether an identifier starts `k` chars ahead (`a`, `-a`, `\61`, `-\61`).
    fn starts_identifier_at(&self, k: usize) -> bool {
        let c = self.peek_at(k);
        if is_name_start(c) || self.is_escape_at(k) {
            return true;
        }
        c == '-' && (is_name_start(self.peek_at(k + 1)) || self.is_escape_at(k + 1))
    }

    /// Whether a number body starts `k` chars ahead (`5`, `.5`).
    fn starts_number_at(&self, k: usize) -> bool {
        self.peek_at(k).is_ascii_digit()
            || (self.peek_at(k) == '.' && self.peek_at(k + 1).is_ascii_digit())
    }

    fn starts_unicode_range(&self) -> bool {
        self.peek_next() == '+' && (self.peek_at(2).is_ascii_hexdigit() || self.peek_at(2) == '?')
    }

    fn is_escape_at(&self, k: usize) -> bool {
        self.peek_at(k) == '\\'
            && self.pos + k + 1 < self.chars.len()
            && !matches!(self.peek_at(k + 1), '\n' | '\r' | '\x0c')
    }

    /// Case-insensitive match of `word` at `k` chars ahead, not followed by a name char.
    fn matches_word_at(&self, k: usize, word: &str) -> bool {
        let mut i = k;
        for expected in word.chars() {
            if !self.peek_at(i).eq_ignore_ascii_case(&expected) {
                return false;
            }
            i += 1;
        }
        !is_name_char(self.peek_at(i))
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn restore(&mut self, saved: Checkpoint) {
        self.pos = saved.pos;
        self.offset = saved.offset;
        self.line = saved.line;
        self.column = saved.column;
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, k: usize) -> char {
        self.chars.get(self.pos + k).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            self.offset += c.len_utf8();
            let line_break = c == '\n' || (c == '\r' && self.peek() != '\n') || c == '\x0c';
            if line_break {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (!c.is_ascii() && c != '\0')
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// Map a lowercased unit to its dimension kind.
fn unit_kind(unit: &str) -> TokenKind {
    match unit {
        "px" | "cm" | "mm" | "in" | "pt" | "pc" | "q" | "vw" | "vh" | "vmin" | "vmax" | "ch"
        | "lh" | "rlh" | "vb" | "vi" | "svw" | "svh" | "lvw" | "lvh" | "dvw" | "dvh" | "cqw"
        | "cqh" | "cqi" | "cqb" | "cqmin" | "cqmax" => TokenKind::Length,
        "em" => TokenKind::Ems,
        "ex" => TokenKind::Exs,
        "rem" => TokenKind::Rem,
        "deg" | "rad" | "grad" | "turn" => TokenKind::Angle,
        "ms" | "s" => TokenKind::Time,
        "hz" | "khz" => TokenKind::Freq,
        "dpi" | "dpcm" | "dppx" | "x" => TokenKind::Resolution,
        _ => TokenKind::Dimension,
    }
}
