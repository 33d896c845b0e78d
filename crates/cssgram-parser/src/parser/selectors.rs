//! Rules and selectors.

use cssgram_lexer::TokenKind;

use super::{BlockContext, Parser};
use crate::builder::NodeBuilder;
use crate::node_type::NodeType;
use crate::tree::Node;

/// Functional pseudo-classes whose argument is a selector list.
const SELECTOR_LIST_PSEUDOS: &[&str] = &[
    "not",
    "is",
    "where",
    "has",
    "matches",
    "any",
    "-moz-any",
    "-webkit-any",
    "host",
    "host-context",
    "slotted",
    "cue",
    "current",
    "past",
    "future",
    "global",
    "local",
    "deep",
    "extend",
];

/// Functional pseudo-classes taking the `an+b [of S]` micro-syntax.
const NTH_PSEUDOS: &[&str] = &[
    "nth-child",
    "nth-last-child",
    "nth-of-type",
    "nth-last-of-type",
    "nth-col",
    "nth-last-col",
];

fn is_combinator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Greater | TokenKind::Plus | TokenKind::Tilde)
}

fn is_interpolation(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::ScssInterpStart | TokenKind::LessInterp)
}

impl Parser<'_> {
    // =========================================================================
    // Predicates
    // =========================================================================

    pub(super) fn at_selector_start(&self) -> bool {
        self.at_sequence_start() || is_combinator(self.kind())
    }

    /// Whether a simple selector sequence starts at the cursor.
    fn at_sequence_start(&self) -> bool {
        match self.kind() {
            TokenKind::Ident => !(self.is_less() && self.at_word("when")),
            TokenKind::Star | TokenKind::Pipe | TokenKind::Ampersand => true,
            kind if is_interpolation(kind) => true,
            _ => self.at_subsequent_start(),
        }
    }

    fn at_subsequent_start(&self) -> bool {
        match self.kind() {
            TokenKind::Hash
            | TokenKind::LBracket
            | TokenKind::ScssPlaceholder
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp => true,
            TokenKind::Dot => matches!(
                self.nth_kind(1),
                TokenKind::Ident | TokenKind::ScssInterpStart | TokenKind::LessInterp
            ),
            TokenKind::Colon | TokenKind::DColon => matches!(
                self.nth_kind(1),
                TokenKind::Ident | TokenKind::ScssInterpStart | TokenKind::LessInterp
            ),
            kind if kind.is_numeric() => self.text().starts_with('.'),
            _ => false,
        }
    }

    /// Speculative check used inside blocks: a selector list followed by `{`
    /// (or a LESS guard) is a nested rule, anything else is a declaration.
    pub(super) fn looks_like_rule(&mut self) -> bool {
        self.lookahead(|p| {
            if p.selectors_group().is_none() {
                return false;
            }
            match p.significant_kind(0) {
                TokenKind::LBrace => true,
                TokenKind::Ident => p.is_less() && p.significant_word(0, "when"),
                _ => false,
            }
        })
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// rule := selectorsGroup [less_when] '{' declarations '}'
    pub(super) fn rule(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Rule);
        let selectors = self.selectors_group();
        b.push_opt(selectors);
        self.ws(&mut b);
        if self.is_less() && self.at_word("when") {
            let guard = self.less_when();
            b.push_opt(guard);
            self.ws(&mut b);
        }
        self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        self.finish(b)
    }

    /// selectorsGroup := selector (',' selector)* [',']
    pub(super) fn selectors_group(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SelectorsGroup);
        let first = self.selector();
        b.push_opt(first);
        while self.significant_kind(0) == TokenKind::Comma {
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
            if self.at(TokenKind::LBrace) {
                break;
            }
            if !self.at_selector_start() {
                self.error_here(&mut b, "selector");
                break;
            }
            let next = self.selector();
            b.push_opt(next);
        }
        self.finish(b)
    }

    /// selector := [combinator] simpleSelectorSequence (combinator? simpleSelectorSequence)*
    fn selector(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Selector);
        if is_combinator(self.kind()) {
            let combinator = self.single(NodeType::Combinator);
            b.push_opt(combinator);
            self.ws(&mut b);
            // SCSS nests rules under a bare combinator: `> { a { } }`.
            if self.is_scss() && self.at(TokenKind::LBrace) {
                return self.finish(b);
            }
        }
        if self.at_sequence_start() {
            let first = self.simple_selector_sequence();
            b.push_opt(first);
        } else {
            self.error_here(&mut b, "selector");
            return self.finish(b);
        }

        loop {
            if self.after_trivia(|p| is_combinator(p.kind())) {
                self.ws(&mut b);
                let combinator = self.single(NodeType::Combinator);
                b.push_opt(combinator);
                self.ws(&mut b);
                if self.is_scss() && self.at(TokenKind::LBrace) {
                    break;
                }
                if !self.at_sequence_start() {
                    self.error_here(&mut b, "selector");
                    break;
                }
            } else if self.is_trivia(self.kind()) && self.after_trivia(|p| p.at_sequence_start()) {
                // Descendant combinator: whitespace only, no node.
                self.ws(&mut b);
            } else {
                break;
            }
            let sequence = self.simple_selector_sequence();
            b.push_opt(sequence);
        }
        self.finish(b)
    }

    /// simpleSelectorSequence := (typeSelector | parentSelector | interpolation)? elementSubsequent*
    fn simple_selector_sequence(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SimpleSelectorSequence);
        match self.kind() {
            TokenKind::Ident | TokenKind::Star | TokenKind::Pipe => {
                let type_selector = self.type_selector();
                b.push_opt(type_selector);
            }
            TokenKind::Ampersand => {
                let parent = self.parent_selector();
                b.push_opt(parent);
            }
            kind if is_interpolation(kind) => {
                let interpolation = self.interpolation();
                b.push_opt(interpolation);
                self.adjacent_name_parts(&mut b);
            }
            _ => {}
        }
        while self.at_subsequent_start() {
            let before = self.cursor.position();
            let subsequent = self.element_subsequent();
            b.push_opt(subsequent);
            if self.cursor.position() == before {
                break;
            }
        }
        self.finish(b)
    }

    /// typeSelector := [namespacePrefix] elementName
    fn type_selector(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::TypeSelector);
        let prefixed = self.at(TokenKind::Pipe)
            || (matches!(self.kind(), TokenKind::Ident | TokenKind::Star)
                && self.nth_kind(1) == TokenKind::Pipe
                && matches!(self.nth_kind(2), TokenKind::Ident | TokenKind::Star));
        if prefixed {
            let mut prefix = NodeBuilder::new(NodeType::NamespacePrefix);
            if !self.at(TokenKind::Pipe) {
                self.bump(&mut prefix);
            }
            self.bump(&mut prefix);
            b.push_opt(prefix.build());
        }

        let mut name = NodeBuilder::new(NodeType::ElementName);
        if matches!(self.kind(), TokenKind::Ident | TokenKind::Star) {
            self.bump(&mut name);
            self.adjacent_name_parts(&mut name);
        } else {
            self.error_here(&mut name, "element name");
        }
        b.push_opt(name.build());
        b.build()
    }

    /// `&` with an optional glued suffix (`&-item`, `&__elem`).
    fn parent_selector(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::ParentSelector);
        self.bump(&mut b);
        self.adjacent_name_parts(&mut b);
        b.build()
    }

    /// Name fragments glued to the previous token: identifiers, numbers,
    /// interpolations and the dashes between them (`foo#{$x}-bar`,
    /// `&--#{$mod}`, `.a-#{$b}-#{$c}`).
    fn adjacent_name_parts(&mut self, b: &mut NodeBuilder) {
        loop {
            match self.kind() {
                TokenKind::Ident | TokenKind::Variable => self.bump(b),
                TokenKind::Minus if self.continues_name(1) => self.bump(b),
                kind if kind.is_numeric() && !self.text().starts_with('.') => self.bump(b),
                kind if is_interpolation(kind) => {
                    let interpolation = self.interpolation();
                    b.push_opt(interpolation);
                }
                _ => break,
            }
        }
    }

    /// Whether the token `k` ahead, trivia included, carries on a name.
    fn continues_name(&self, k: usize) -> bool {
        let kind = self.nth_kind(k);
        matches!(kind, TokenKind::Ident | TokenKind::Variable)
            || is_interpolation(kind)
            || (kind.is_numeric() && !self.token_text(self.cursor.peek_nth(k)).starts_with('.'))
    }

    fn element_subsequent(&mut self) -> Option<Node> {
        let node = match self.kind() {
            TokenKind::Hash => {
                let mut id = NodeBuilder::new(NodeType::CssId);
                self.bump(&mut id);
                self.adjacent_name_parts(&mut id);
                id.build()
            }
            TokenKind::Dot => {
                let mut class = NodeBuilder::new(NodeType::CssClass);
                self.bump(&mut class);
                self.adjacent_name_parts(&mut class);
                class.build()
            }
            TokenKind::LBracket => self.attribute(),
            TokenKind::Colon | TokenKind::DColon => self.pseudo(),
            TokenKind::ScssPlaceholder => {
                let mut placeholder = NodeBuilder::new(NodeType::SassExtendOnlySelector);
                self.bump(&mut placeholder);
                self.adjacent_name_parts(&mut placeholder);
                placeholder.build()
            }
            kind if is_interpolation(kind) => {
                let mut b = NodeBuilder::new(NodeType::Interpolation);
                let interpolation = self.interpolation();
                if let Some(Node::Rule(rule)) = interpolation {
                    for child in rule.children {
                        b.push(child);
                    }
                }
                self.adjacent_name_parts(&mut b);
                b.build()
            }
            // `.5hallo` lexes as a number.
            _ => self.single(NodeType::CssClass),
        };
        crate::builder::wrap(NodeType::ElementSubsequent, node)
    }

    /// slAttribute := '[' [namespacePrefix] slAttributeName [op slAttributeValue [flag]] ']'
    fn attribute(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SlAttribute);
        self.bump(&mut b);
        self.ws(&mut b);

        let has_name = matches!(self.kind(), TokenKind::Ident | TokenKind::Star | TokenKind::Pipe)
            || is_interpolation(self.kind());
        if !has_name {
            // The name error covers the whole attribute.
            self.error_here(&mut b, "attribute name");
            self.skip_to_close(&mut b, TokenKind::RBracket);
            self.ws(&mut b);
            self.eat(&mut b, TokenKind::RBracket);
            return self.finish(b);
        }

        let mut name = NodeBuilder::new(NodeType::SlAttributeName);
        if self.nth_kind(1) == TokenKind::Pipe || self.at(TokenKind::Pipe) {
            let mut prefix = NodeBuilder::new(NodeType::NamespacePrefix);
            if !self.at(TokenKind::Pipe) {
                self.bump(&mut prefix);
            }
            self.bump(&mut prefix);
            name.push_opt(prefix.build());
        }
        match self.kind() {
            TokenKind::Ident => {
                self.bump(&mut name);
                self.adjacent_name_parts(&mut name);
            }
            kind if is_interpolation(kind) => self.adjacent_name_parts(&mut name),
            _ => self.error_here(&mut name, "attribute name"),
        }
        b.push_opt(name.build());
        self.ws(&mut b);

        if matches!(
            self.kind(),
            TokenKind::Equals
                | TokenKind::Includes
                | TokenKind::DashMatch
                | TokenKind::BeginsWith
                | TokenKind::EndsWith
                | TokenKind::Contains
        ) {
            self.bump(&mut b);
            self.ws(&mut b);
            let mut value = NodeBuilder::new(NodeType::SlAttributeValue);
            match self.kind() {
                TokenKind::Ident | TokenKind::String => {
                    self.bump(&mut value);
                    self.adjacent_name_parts(&mut value);
                }
                kind if kind.is_numeric() => self.bump(&mut value),
                TokenKind::SassVar | TokenKind::LessVar => {
                    let variable = self.cp_variable();
                    value.push_opt(variable);
                }
                kind if is_interpolation(kind) => self.adjacent_name_parts(&mut value),
                _ => self.error_here(&mut value, "attribute value"),
            }
            b.push_opt(value.build());
            self.ws(&mut b);
            // Case-sensitivity flag: `i` or `s`.
            if self.at(TokenKind::Ident) {
                self.bump(&mut b);
                self.ws(&mut b);
            }
        }

        self.expect_close(&mut b, TokenKind::RBracket, "']'");
        self.finish(b)
    }

    /// pseudo := (':' | '::') name ['(' arguments ')']
    fn pseudo(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Pseudo);
        self.bump(&mut b);
        let name = self.text().to_ascii_lowercase();
        self.adjacent_name_parts(&mut b);
        if !self.at(TokenKind::LParen) {
            return b.build();
        }
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }

        self.bump(&mut b);
        self.ws(&mut b);
        if SELECTOR_LIST_PSEUDOS.contains(&name.as_str()) {
            if !self.at(TokenKind::RParen) {
                let selectors = self.selectors_group();
                b.push_opt(selectors);
                self.ws(&mut b);
                // LESS `:extend(.a all)`
                if self.at_word("all") {
                    self.bump(&mut b);
                }
            }
        } else if NTH_PSEUDOS.contains(&name.as_str()) {
            self.nth_arguments(&mut b);
        } else {
            self.raw_balanced(&mut b);
        }
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `an+b` tokens, optionally followed by `of <selectors>`.
    fn nth_arguments(&mut self, b: &mut NodeBuilder) {
        loop {
            match self.kind() {
                TokenKind::RParen
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Semi
                | TokenKind::Eof => break,
                TokenKind::Ident if self.at_word("of") => {
                    self.bump(b);
                    self.ws(b);
                    let selectors = self.selectors_group();
                    b.push_opt(selectors);
                    break;
                }
                _ => self.bump(b),
            }
        }
    }
}
