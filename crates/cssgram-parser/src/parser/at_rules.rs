//! CSS at-rules: `@charset`, `@import`, `@namespace`, `@media`, `@page`,
//! `@font-face`, `@counter-style`, `@supports`, `@layer`, `@container`,
//! keyframes, `@-moz-document` and unknown at-rules.

use cssgram_lexer::TokenKind;

use super::{BlockContext, Parser};
use crate::builder::{wrap, NodeBuilder};
use crate::diagnostics::Diagnostic;
use crate::node_type::NodeType;
use crate::tree::Node;

/// Options accepted in LESS `@import (...)`.
const LESS_IMPORT_OPTIONS: &[&str] = &[
    "less",
    "css",
    "reference",
    "inline",
    "once",
    "multiple",
    "optional",
];

fn is_comparison(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Less
            | TokenKind::LessOrEq
            | TokenKind::Greater
            | TokenKind::GreaterOrEq
            | TokenKind::Equals
    )
}

impl Parser<'_> {
    pub(super) fn at_at_rule(&self) -> bool {
        let kind = self.kind();
        kind.is_at_keyword() || kind == TokenKind::LessVar
    }

    /// Dispatch on the at-keyword at the cursor.
    pub(super) fn at_rule(&mut self) -> Option<Node> {
        match self.kind() {
            TokenKind::Charset => self.charset(true),
            TokenKind::Import => self.import_item(),
            TokenKind::Namespace => self.namespace(),
            TokenKind::Media => {
                let media = self.media();
                wrap(NodeType::AtRule, media)
            }
            TokenKind::Page => {
                let page = self.page();
                wrap(NodeType::AtRule, page)
            }
            TokenKind::FontFace => {
                let font_face = self.simple_block_rule(NodeType::FontFace);
                wrap(NodeType::AtRule, font_face)
            }
            TokenKind::CounterStyle => {
                let counter_style = self.simple_block_rule(NodeType::CounterStyle);
                wrap(NodeType::AtRule, counter_style)
            }
            TokenKind::Supports => {
                let supports = self.supports();
                wrap(NodeType::AtRule, supports)
            }
            TokenKind::Layer => {
                let layer = self.layer();
                wrap(NodeType::AtRule, layer)
            }
            TokenKind::Container => {
                let container = self.container();
                wrap(NodeType::AtRule, container)
            }
            TokenKind::Keyframes | TokenKind::VendorKeyframes => {
                let keyframes = self.keyframes();
                wrap(NodeType::AtRule, keyframes)
            }
            TokenKind::MozDocument => {
                let document = self.moz_document();
                wrap(NodeType::AtRule, document)
            }
            TokenKind::MarginSym => {
                let margin = self.margin();
                wrap(NodeType::AtRule, margin)
            }
            kind if kind.is_scss_keyword() => self.scss_at_rule(),
            TokenKind::LessVar if self.nth_kind(1) == TokenKind::LParen => {
                self.detached_ruleset_call()
            }
            _ => {
                let generic = self.generic_at_rule();
                wrap(NodeType::AtRule, generic)
            }
        }
    }

    /// A `;` ending a block-less at-rule. A following `}` or the end of
    /// input also ends it.
    pub(super) fn statement_end(&mut self, b: &mut NodeBuilder) {
        match self.significant_kind(0) {
            TokenKind::Semi => {
                self.ws(b);
                self.bump(b);
            }
            TokenKind::RBrace | TokenKind::Eof => {}
            _ => {
                self.ws(b);
                self.error_here(b, "';'");
                self.skip_to_declaration_end(b);
                self.eat(b, TokenKind::Semi);
            }
        }
    }

    // =========================================================================
    // Prelude statements
    // =========================================================================

    /// charSet := '@charset' charSetValue ';'
    pub(super) fn charset(&mut self, misplaced: bool) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CharSet);
        let keyword = *self.cursor.peek();
        self.bump(&mut b);
        if misplaced {
            self.report(Diagnostic::warning(
                keyword.span.start,
                keyword.span.end,
                "@charset must be the first rule",
            ));
        }
        self.ws(&mut b);
        if self.at(TokenKind::String) {
            let value = self.single(NodeType::CharSetValue);
            b.push_opt(value);
        } else {
            self.error_here(&mut b, "string");
        }
        self.statement_end(&mut b);
        self.finish(b)
    }

    /// importItem := '@import' [less_import_types] resourceIdentifier
    ///               (',' resourceIdentifier)* [layer] [supports] [mediaQueryList] ';'
    pub(super) fn import_item(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::ImportItem);
        self.bump(&mut b);
        self.ws(&mut b);

        if self.is_less() && self.at(TokenKind::LParen) {
            let options = self.less_import_types();
            b.push_opt(options);
            self.ws(&mut b);
        }

        self.resource_identifier(&mut b);
        if self.is_scss() {
            while self.significant_kind(0) == TokenKind::Comma {
                self.ws(&mut b);
                self.bump(&mut b);
                self.ws(&mut b);
                self.resource_identifier(&mut b);
            }
        }

        if self.after_trivia(|p| p.at_word("layer")) {
            self.ws(&mut b);
            if self.nth_kind(1) == TokenKind::LParen {
                let layer = self.import_layer();
                b.push_opt(layer);
            } else {
                self.bump(&mut b);
            }
        }
        if self.after_trivia(|p| p.at_word("supports") && p.nth_kind(1) == TokenKind::LParen) {
            self.ws(&mut b);
            let supports = self.import_supports();
            b.push_opt(supports);
        }
        if self.after_trivia(|p| p.at_media_query_start()) {
            self.ws(&mut b);
            let media = self.media_query_list();
            b.push_opt(media);
        }

        self.statement_end(&mut b);
        self.finish(b)
    }

    fn resource_identifier(&mut self, b: &mut NodeBuilder) {
        match self.kind() {
            TokenKind::String | TokenKind::Uri => {
                let resource = self.single(NodeType::ResourceIdentifier);
                b.push_opt(resource);
            }
            // `url($var)`, `$file`
            TokenKind::Ident
            | TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::LessInterp
            | TokenKind::ScssInterpStart
                if self.is_preprocessor() || self.nth_kind(1) == TokenKind::LParen =>
            {
                let term = self.term();
                b.push_opt(wrap(NodeType::ResourceIdentifier, term));
            }
            _ => self.error_here(b, "string or url"),
        }
    }

    /// less_import_types := '(' option (',' option)* ')'
    fn less_import_types(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LessImportTypes);
        self.bump(&mut b);
        loop {
            self.ws(&mut b);
            if !self.at(TokenKind::Ident) {
                self.error_here(&mut b, "import option");
                break;
            }
            let option = self.text();
            if LESS_IMPORT_OPTIONS
                .iter()
                .any(|known| option.eq_ignore_ascii_case(known))
            {
                self.bump(&mut b);
            } else {
                self.error_with(&mut b, format!("Unknown import option '{option}'"));
            }
            self.ws(&mut b);
            if !self.eat(&mut b, TokenKind::Comma) {
                break;
            }
        }
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `layer(name.sub)` after an import.
    fn import_layer(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Function);
        let name = self.single(NodeType::FunctionName);
        b.push_opt(name);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            let layer = self.layer_name();
            b.push_opt(layer);
        } else {
            self.error_here(&mut b, "layer name");
        }
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `supports(display: grid)` after an import.
    fn import_supports(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Function);
        let name = self.single(NodeType::FunctionName);
        b.push_opt(name);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at_property_start() {
            let declaration = self.property_declaration();
            b.push_opt(declaration);
        } else {
            let condition = self.supports_condition();
            b.push_opt(condition);
        }
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// namespace := '@namespace' [namespacePrefixName] resourceIdentifier ';'
    pub(super) fn namespace(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Namespace);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            let prefix = self.single(NodeType::NamespacePrefixName);
            b.push_opt(prefix);
            self.ws(&mut b);
        }
        match self.kind() {
            TokenKind::String | TokenKind::Uri => {
                let resource = self.single(NodeType::ResourceIdentifier);
                b.push_opt(resource);
            }
            _ => self.error_here(&mut b, "string or url"),
        }
        self.statement_end(&mut b);
        self.finish(b)
    }

    // =========================================================================
    // @media
    // =========================================================================

    /// media := '@media' [mediaQueryList] '{' mediaBody '}'
    fn media(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Media);
        self.bump(&mut b);
        self.ws(&mut b);
        if !self.at(TokenKind::LBrace) {
            let queries = self.media_query_list();
            b.push_opt(queries);
            self.ws(&mut b);
        }
        self.block(&mut b, Some(NodeType::MediaBody), BlockContext::Media);
        self.finish(b)
    }

    fn at_media_query_start(&self) -> bool {
        match self.kind() {
            TokenKind::Ident | TokenKind::LParen => true,
            TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp => self.is_preprocessor(),
            _ => false,
        }
    }

    /// mediaQueryList := mediaQuery (',' mediaQuery)*
    fn media_query_list(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::MediaQueryList);
        loop {
            if !self.at_media_query_start() {
                self.error_here(&mut b, "media query");
                break;
            }
            let query = self.media_query();
            b.push_opt(query);
            if self.significant_kind(0) != TokenKind::Comma {
                break;
            }
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
        }
        self.finish(b)
    }

    /// mediaQuery := [only | not] mediaType (and mediaExpression)*
    ///             | mediaCondition
    fn media_query(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::MediaQuery);

        let prefixed = (self.at_word("only") || self.at_word("not"))
            && self.significant_kind(1) == TokenKind::Ident;
        if prefixed {
            let operator = self.single(NodeType::MediaQueryOperator);
            b.push_opt(operator);
            self.ws(&mut b);
        }

        match self.kind() {
            TokenKind::Ident if prefixed || !self.at_word("not") => {
                let media_type = self.single(NodeType::MediaType);
                b.push_opt(media_type);
            }
            TokenKind::Ident => {
                let operator = self.single(NodeType::MediaQueryOperator);
                b.push_opt(operator);
                self.ws(&mut b);
                self.media_in_parens(&mut b);
            }
            TokenKind::LParen => self.media_in_parens(&mut b),
            _ => {
                let term = self.term();
                b.push_opt(term);
            }
        }

        while self.after_trivia(|p| p.at_word("and") || p.at_word("or")) {
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
            if self.at_word("not") {
                self.bump(&mut b);
                self.ws(&mut b);
            }
            self.media_in_parens(&mut b);
        }
        self.finish(b)
    }

    /// A parenthesized media expression, or a variable standing in for one.
    fn media_in_parens(&mut self, b: &mut NodeBuilder) {
        match self.kind() {
            TokenKind::LParen => {
                let expression = self.media_expression();
                b.push_opt(expression);
            }
            TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp
                if self.is_preprocessor() =>
            {
                let term = self.term();
                b.push_opt(term);
            }
            _ => self.error_here(b, "'('"),
        }
    }

    /// mediaExpression := '(' (mediaFeature [':' expression] | range | mediaCondition) ')'
    fn media_expression(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::MediaExpression);
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::LParen) || self.at_word("not") {
            self.media_condition(&mut b);
        } else {
            self.feature_body(&mut b, Some(NodeType::MediaFeature));
        }
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `[not] (...) ((and | or) [not] (...))*` inside parentheses.
    fn media_condition(&mut self, b: &mut NodeBuilder) {
        loop {
            if self.at_word("not") {
                self.bump(b);
                self.ws(b);
            }
            if self.at(TokenKind::LParen) {
                let expression = self.media_expression();
                b.push_opt(expression);
            } else {
                self.error_here(b, "'('");
                return;
            }
            if !self.after_trivia(|p| p.at_word("and") || p.at_word("or")) {
                return;
            }
            self.ws(b);
            self.bump(b);
            self.ws(b);
        }
    }

    /// The inside of a media or size feature: `name`, `name: value`,
    /// `name op value` or `value op name [op value]`. The feature name is
    /// wrapped in `name_type` when given.
    fn feature_body(&mut self, b: &mut NodeBuilder, name_type: Option<NodeType>) {
        let mut named = self.at_feature_name();
        if named {
            self.feature_name(b, name_type);
        } else if self.at_term_start() {
            let value = self.expression(false);
            b.push_opt(value);
        } else {
            self.error_here(b, "media feature");
            return;
        }
        self.ws(b);

        if named && self.at(TokenKind::Colon) {
            self.bump(b);
            self.ws(b);
            if self.at_term_start() {
                let value = self.expression(false);
                b.push_opt(value);
            } else {
                self.error_here(b, "feature value");
            }
            return;
        }

        while is_comparison(self.kind()) {
            self.bump(b);
            self.ws(b);
            if !named && self.at_feature_name() {
                self.feature_name(b, name_type);
                named = true;
            } else if self.at_term_start() {
                let value = self.expression(false);
                b.push_opt(value);
            } else {
                self.error_here(b, "feature value");
                return;
            }
            self.ws(b);
        }
    }

    fn at_feature_name(&self) -> bool {
        match self.kind() {
            TokenKind::Ident => self.nth_kind(1) != TokenKind::LParen,
            // Custom property queries: `@container (--cards: small)`.
            TokenKind::Variable => true,
            // `($name : $value)`
            TokenKind::SassVar | TokenKind::LessVar => {
                self.is_preprocessor() && self.significant_kind(1) == TokenKind::Colon
            }
            TokenKind::ScssInterpStart | TokenKind::LessInterp => {
                self.significant_kind(1) == TokenKind::Colon
                    || self.kind() == TokenKind::ScssInterpStart
                        && self.significant_kind(3) == TokenKind::Colon
            }
            _ => false,
        }
    }

    fn feature_name(&mut self, b: &mut NodeBuilder, name_type: Option<NodeType>) {
        let name = if matches!(self.kind(), TokenKind::Ident | TokenKind::Variable) {
            match name_type {
                Some(node_type) => self.single(node_type),
                None => Some(self.take()),
            }
        } else if matches!(self.kind(), TokenKind::SassVar | TokenKind::LessVar) {
            let variable = self.cp_variable();
            match name_type {
                Some(node_type) => wrap(node_type, variable),
                None => variable,
            }
        } else {
            let interpolation = self.interpolation();
            match name_type {
                Some(node_type) => wrap(node_type, interpolation),
                None => interpolation,
            }
        };
        b.push_opt(name);
    }

    // =========================================================================
    // @page, @font-face, @counter-style
    // =========================================================================

    /// page := '@page' [ident] [pseudoPage] '{' (declaration | margin)* '}'
    fn page(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Page);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            self.bump(&mut b);
        }
        if self.at(TokenKind::Colon) && self.nth_kind(1) == TokenKind::Ident {
            let mut pseudo = NodeBuilder::new(NodeType::PseudoPage);
            self.bump(&mut pseudo);
            self.bump(&mut pseudo);
            b.push_opt(pseudo.build());
        }
        self.ws(&mut b);
        self.block(&mut b, None, BlockContext::Page);
        self.finish(b)
    }

    /// margin := margin_sym '{' declarations '}'
    pub(super) fn margin(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Margin);
        let symbol = self.single(NodeType::MarginSym);
        b.push_opt(symbol);
        self.ws(&mut b);
        self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        self.finish(b)
    }

    /// `@font-face { ... }` and `@counter-style name { ... }`.
    fn simple_block_rule(&mut self, node_type: NodeType) -> Option<Node> {
        let mut b = NodeBuilder::new(node_type);
        self.bump(&mut b);
        self.ws(&mut b);
        if node_type == NodeType::CounterStyle {
            if self.at(TokenKind::Ident) {
                self.bump(&mut b);
                self.ws(&mut b);
            } else {
                self.error_here(&mut b, "counter style name");
            }
        }
        self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        self.finish(b)
    }

    // =========================================================================
    // @supports
    // =========================================================================

    /// supportsAtRule := '@supports' supportsCondition '{' mediaBody '}'
    fn supports(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SupportsAtRule);
        self.bump(&mut b);
        self.ws(&mut b);
        let condition = self.supports_condition();
        b.push_opt(condition);
        self.ws(&mut b);
        self.block(&mut b, Some(NodeType::MediaBody), BlockContext::Media);
        self.finish(b)
    }

    /// supportsCondition := not supportsInParens
    ///                    | supportsInParens ((and | or) supportsInParens)*
    ///
    /// One level may not mix `and` with `or`, and the keywords need
    /// whitespace on both sides.
    fn supports_condition(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SupportsCondition);

        if self.at_word("not") {
            self.supports_keyword(&mut b);
            let operand = self.supports_in_parens();
            b.push_opt(operand);
            return self.finish(b);
        }

        let first = self.supports_in_parens();
        b.push_opt(first);

        let mut joiner: Option<String> = None;
        while self.after_trivia(|p| p.at_word("and") || p.at_word("or")) {
            let spaced_before = self.is_trivia(self.kind());
            self.ws(&mut b);
            let keyword = *self.cursor.peek();
            let word = self.text().to_ascii_lowercase();
            if !spaced_before {
                self.report(Diagnostic::error(
                    keyword.span.start,
                    keyword.span.end,
                    format!("Whitespace required around '{word}'"),
                ));
            }
            match &joiner {
                Some(previous) if *previous != word => {
                    self.report(Diagnostic::error(
                        keyword.span.start,
                        keyword.span.end,
                        "Cannot mix 'and' and 'or' without parentheses",
                    ));
                }
                Some(_) => {}
                None => joiner = Some(word),
            }
            self.supports_keyword(&mut b);
            let operand = self.supports_in_parens();
            b.push_opt(operand);
        }
        self.finish(b)
    }

    /// Consume `and`, `or` or `not` and the whitespace after it.
    fn supports_keyword(&mut self, b: &mut NodeBuilder) {
        let keyword = *self.cursor.peek();
        let word = self.text().to_ascii_lowercase();
        self.bump(b);
        if !self.is_trivia(self.kind()) {
            self.report(Diagnostic::error(
                keyword.span.start,
                keyword.span.end,
                format!("Whitespace required around '{word}'"),
            ));
        }
        self.ws(b);
    }

    /// supportsInParens := supportsDecl | '(' supportsCondition ')'
    ///                   | supportsSelector | function
    fn supports_in_parens(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SupportsInParens);
        match self.kind() {
            TokenKind::LParen => {
                if !self.enter_nesting() {
                    self.skip_group(&mut b, TokenKind::RParen, "')'");
                } else if let Some(declaration) = self.attempt(|p| p.supports_decl()) {
                    self.leave_nesting();
                    b.push_opt(wrap(NodeType::SupportsFeature, Some(declaration)));
                } else {
                    self.bump(&mut b);
                    self.ws(&mut b);
                    let condition = self.supports_condition();
                    b.push_opt(condition);
                    self.leave_nesting();
                    self.expect_close(&mut b, TokenKind::RParen, "')'");
                }
            }
            TokenKind::Ident if self.nth_kind(1) == TokenKind::LParen => {
                if self.at_word("selector") {
                    let selector = self.supports_selector();
                    b.push_opt(wrap(NodeType::SupportsFeature, selector));
                } else {
                    let function = self.function();
                    b.push_opt(function);
                }
            }
            TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp
                if self.is_preprocessor() =>
            {
                let term = self.term();
                b.push_opt(term);
            }
            _ => self.error_here(&mut b, "'('"),
        }
        self.finish(b)
    }

    /// supportsDecl := '(' declaration ')'
    fn supports_decl(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SupportsDecl);
        self.bump(&mut b);
        self.ws(&mut b);
        if !self.at_property_start() {
            return None;
        }
        let declaration = self.property_declaration();
        b.push_opt(wrap(NodeType::Declaration, declaration));
        self.ws(&mut b);
        if !self.eat(&mut b, TokenKind::RParen) {
            return None;
        }
        self.finish(b)
    }

    /// supportsSelector := 'selector(' selectorsGroup ')'
    fn supports_selector(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SupportsSelector);
        self.bump(&mut b);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at_selector_start() {
            let selectors = self.selectors_group();
            b.push_opt(selectors);
        } else {
            self.error_here(&mut b, "selector");
        }
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    // =========================================================================
    // @layer, @container
    // =========================================================================

    /// layerAtRule := '@layer' [layerName (',' layerName)*] ('{' mediaBody '}' | ';')
    fn layer(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LayerAtRule);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            loop {
                let name = self.layer_name();
                b.push_opt(name);
                if self.significant_kind(0) != TokenKind::Comma {
                    break;
                }
                self.ws(&mut b);
                self.bump(&mut b);
                self.ws(&mut b);
                if !self.at(TokenKind::Ident) {
                    self.error_here(&mut b, "layer name");
                    break;
                }
            }
        }

        if self.significant_kind(0) == TokenKind::LBrace {
            self.ws(&mut b);
            self.block(&mut b, Some(NodeType::MediaBody), BlockContext::Media);
        } else {
            self.statement_end(&mut b);
        }
        self.finish(b)
    }

    /// layerName := ident ('.' ident)*
    fn layer_name(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LayerName);
        self.bump(&mut b);
        while self.at(TokenKind::Dot) && self.nth_kind(1) == TokenKind::Ident {
            self.bump(&mut b);
            self.bump(&mut b);
        }
        b.build()
    }

    /// containerAtRule := '@container' [containerName] containerCondition '{' mediaBody '}'
    fn container(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::ContainerAtRule);
        self.bump(&mut b);
        self.ws(&mut b);
        let named = self.at(TokenKind::Ident)
            && !["not", "and", "or"].iter().any(|word| self.at_word(word))
            && self.nth_kind(1) != TokenKind::LParen;
        if named {
            let name = self.single(NodeType::ContainerName);
            b.push_opt(name);
            self.ws(&mut b);
        }
        if !self.at(TokenKind::LBrace) {
            let condition = self.container_condition();
            b.push_opt(condition);
            self.ws(&mut b);
        }
        self.block(&mut b, Some(NodeType::MediaBody), BlockContext::Media);
        self.finish(b)
    }

    /// containerCondition := [not] query ((and | or) [not] query)*
    fn container_condition(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::ContainerCondition);
        loop {
            if self.at_word("not") {
                self.bump(&mut b);
                self.ws(&mut b);
            }
            match self.container_query_in_parens() {
                Some(query) => b.push(query),
                None => {
                    self.error_here(&mut b, "container query");
                    break;
                }
            }
            if !self.after_trivia(|p| p.at_word("and") || p.at_word("or")) {
                break;
            }
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
        }
        self.finish(b)
    }

    /// containerQueryInParens := '(' (containerCondition | sizeFeature) ')'
    ///                         | styleQuery
    fn container_query_in_parens(&mut self) -> Option<Node> {
        if self.at_word("style") && self.nth_kind(1) == TokenKind::LParen {
            return self.style_query();
        }
        if !self.at(TokenKind::LParen) {
            return None;
        }

        let mut b = NodeBuilder::new(NodeType::ContainerQueryInParens);
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::LParen) || self.at_word("not") || self.at_word("style") {
            let condition = self.container_condition();
            b.push_opt(condition);
        } else {
            let mut feature = NodeBuilder::new(NodeType::SizeFeature);
            self.feature_body(&mut feature, None);
            let feature = self.finish(feature);
            b.push_opt(feature);
        }
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// styleQuery := 'style(' (declaration | raw) ')'
    fn style_query(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::StyleQuery);
        self.bump(&mut b);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at_property_start() {
            let declaration = self.property_declaration();
            b.push_opt(declaration);
        } else {
            self.raw_balanced(&mut b);
        }
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    // =========================================================================
    // Keyframes
    // =========================================================================

    /// webkitKeyframes := ('@keyframes' | vendor) atRuleId '{' webkitKeyframesBlock* '}'
    fn keyframes(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::WebkitKeyframes);
        self.bump(&mut b);
        self.ws(&mut b);
        match self.kind() {
            TokenKind::Ident | TokenKind::String => {
                let name = self.single(NodeType::AtRuleId);
                b.push_opt(name);
            }
            TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp
                if self.is_preprocessor() =>
            {
                let name = self.term();
                b.push_opt(wrap(NodeType::AtRuleId, name));
            }
            _ => self.error_here(&mut b, "keyframes name"),
        }
        self.ws(&mut b);

        if !self.open_block(&mut b) {
            return self.finish(b);
        }
        loop {
            self.ws(&mut b);
            match self.kind() {
                TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::Semi => {
                    self.bump(&mut b);
                    continue;
                }
                _ => {}
            }
            let before = self.cursor.position();
            let item = if self.at_keyframe_selector() {
                self.keyframes_block()
            } else if self.at_at_rule() {
                self.at_rule()
            } else {
                None
            };
            b.push_opt(item);
            if self.cursor.position() == before {
                self.error_skip(&mut b, "keyframe selector");
            }
        }
        self.close_block(&mut b);
        self.finish(b)
    }

    fn at_keyframe_selector(&self) -> bool {
        match self.kind() {
            TokenKind::Percentage | TokenKind::Number => true,
            TokenKind::Ident => self.at_word("from") || self.at_word("to"),
            TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::ScssInterpStart
            | TokenKind::LessInterp => self.is_preprocessor(),
            _ => false,
        }
    }

    /// webkitKeyframesBlock := webkitKeyframeSelectors '{' declarations '}'
    fn keyframes_block(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::WebkitKeyframesBlock);
        let mut selectors = NodeBuilder::new(NodeType::WebkitKeyframeSelectors);
        loop {
            if self.at(TokenKind::Ident) || self.at(TokenKind::Percentage) || self.at(TokenKind::Number) {
                self.bump(&mut selectors);
            } else if self.at_keyframe_selector() {
                let term = self.term();
                selectors.push_opt(term);
            } else {
                self.error_here(&mut selectors, "keyframe selector");
                break;
            }
            if self.significant_kind(0) != TokenKind::Comma {
                break;
            }
            self.ws(&mut selectors);
            self.bump(&mut selectors);
            self.ws(&mut selectors);
        }
        let selectors = self.finish(selectors);
        b.push_opt(selectors);
        self.ws(&mut b);
        self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        self.finish(b)
    }

    // =========================================================================
    // @-moz-document, unknown at-rules
    // =========================================================================

    /// moz_document := '@-moz-document' moz_document_function (',' moz_document_function)* '{' mediaBody '}'
    fn moz_document(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::MozDocument);
        self.bump(&mut b);
        self.ws(&mut b);
        loop {
            match self.kind() {
                TokenKind::Uri => {
                    let function = self.single(NodeType::MozDocumentFunction);
                    b.push_opt(function);
                }
                TokenKind::Ident if self.nth_kind(1) == TokenKind::LParen => {
                    let function = self.function();
                    b.push_opt(wrap(NodeType::MozDocumentFunction, function));
                }
                _ => {
                    self.error_here(&mut b, "url, url-prefix, domain or regexp");
                    break;
                }
            }
            if self.significant_kind(0) != TokenKind::Comma {
                break;
            }
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
        }
        self.ws(&mut b);
        self.block(&mut b, Some(NodeType::MediaBody), BlockContext::Media);
        self.finish(b)
    }

    /// Unknown at-rules keep their prelude raw and take an optional block.
    /// `@-vendor-...` names become `vendorAtRule`, others `generic_at_rule`.
    pub(super) fn generic_at_rule(&mut self) -> Option<Node> {
        let node_type = if self.text().starts_with("@-") {
            NodeType::VendorAtRule
        } else {
            NodeType::GenericAtRule
        };
        let mut b = NodeBuilder::new(node_type);
        self.bump(&mut b);
        self.raw_prelude(&mut b);
        if self.at(TokenKind::LBrace) {
            self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        } else {
            self.statement_end(&mut b);
        }
        self.finish(b)
    }

    /// Tokens up to a `{`, `;` or `}` outside of any group.
    fn raw_prelude(&mut self, b: &mut NodeBuilder) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::LBrace | TokenKind::Semi | TokenKind::RBrace if depth == 0 => break,
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::ScssInterpStart => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump(b);
        }
    }
}
