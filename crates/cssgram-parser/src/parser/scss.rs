//! Preprocessor variables and the SCSS at-rules: mixins, functions, control
//! flow, `@extend`, `@use`/`@forward`, `@at-root` and friends.

use cssgram_lexer::TokenKind;

use super::{BlockContext, Parser};
use crate::builder::{wrap, NodeBuilder};
use crate::node_type::NodeType;
use crate::tree::Node;

impl Parser<'_> {
    // =========================================================================
    // Variables
    // =========================================================================

    /// `$name:` or `module.$name:` in SCSS, `@name:` in LESS. Wins over a
    /// property declaration at the same position.
    pub(super) fn at_variable_declaration(&self) -> bool {
        let name_tokens = match self.kind() {
            TokenKind::SassVar if self.is_scss() => 1,
            TokenKind::LessVar if self.is_less() => 1,
            TokenKind::Ident
                if self.is_scss()
                    && self.nth_kind(1) == TokenKind::Dot
                    && self.nth_kind(2) == TokenKind::SassVar =>
            {
                3
            }
            _ => return false,
        };
        self.significant_kind(name_tokens) == TokenKind::Colon
    }

    /// cp_variable_declaration := cp_variable ':' (expression flag* | detachedRuleset)
    pub(super) fn variable_declaration(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpVariableDeclaration);
        let variable = self.cp_variable();
        b.push_opt(variable);
        self.ws(&mut b);
        self.bump(&mut b);
        self.ws(&mut b);

        // LESS detached ruleset: `@detached: { ... }`
        if self.is_less() && self.at(TokenKind::LBrace) {
            self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
            return self.finish(b);
        }

        if self.at_term_start() {
            let value = self.expression(true);
            b.push_opt(value);
        } else {
            self.error_here(&mut b, "variable value");
            if !matches!(self.kind(), TokenKind::Semi | TokenKind::RBrace) {
                self.skip_to_declaration_end(&mut b);
            }
            return self.finish(b);
        }

        while self.after_trivia(|p| matches!(p.kind(), TokenKind::SassFlag | TokenKind::ImportantSym)) {
            self.ws(&mut b);
            self.bump(&mut b);
        }
        self.finish(b)
    }

    // =========================================================================
    // SCSS at-rules
    // =========================================================================

    pub(super) fn scss_at_rule(&mut self) -> Option<Node> {
        match self.kind() {
            TokenKind::Mixin => self.mixin_declaration(),
            TokenKind::Include => self.include(),
            TokenKind::Function => self.function_declaration(),
            TokenKind::Return => self.function_return(),
            TokenKind::If | TokenKind::For | TokenKind::Each | TokenKind::While => self.control(),
            TokenKind::Else | TokenKind::ElseIf => self.stray_else(),
            TokenKind::Extend => self.extend(),
            TokenKind::Debug | TokenKind::Warn | TokenKind::ErrorAt => self.debug(),
            TokenKind::Use => self.module_rule(NodeType::SassUse),
            TokenKind::Forward => self.module_rule(NodeType::SassForward),
            TokenKind::AtRoot => self.at_root(),
            TokenKind::Content => self.content(),
            _ => {
                let generic = self.generic_at_rule();
                wrap(NodeType::AtRule, generic)
            }
        }
    }

    /// cp_mixin_declaration := '@mixin' cp_mixin_name [cp_args_list] cp_mixin_block
    fn mixin_declaration(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpMixinDeclaration);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            let name = self.single(NodeType::CpMixinName);
            b.push_opt(name);
        } else {
            self.error_here(&mut b, "mixin name");
        }
        if self.after_trivia(|p| p.at(TokenKind::LParen)) {
            self.ws(&mut b);
            let args = self.cp_args_list();
            b.push_opt(args);
        }
        self.ws(&mut b);
        self.mixin_block(&mut b);
        self.finish(b)
    }

    /// cp_mixin_block := '{' declaration* '}'
    pub(super) fn mixin_block(&mut self, b: &mut NodeBuilder) {
        let mut block = NodeBuilder::new(NodeType::CpMixinBlock);
        self.block(&mut block, None, BlockContext::Rule);
        let block = self.finish(block);
        b.push_opt(block);
    }

    /// cp_mixin_call := '@include' name [cp_args_list] [using cp_args_list] [cp_mixin_block]
    fn include(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpMixinCall);
        self.bump(&mut b);
        self.ws(&mut b);

        if self.at(TokenKind::Ident) {
            let mut name = NodeBuilder::new(NodeType::CpMixinName);
            self.bump(&mut name);
            // Module member: `@include breakpoints.up(md)`
            if self.at(TokenKind::Dot) && self.nth_kind(1) == TokenKind::Ident {
                self.bump(&mut name);
                self.bump(&mut name);
            }
            b.push_opt(name.build());
        } else {
            self.error_here(&mut b, "mixin name");
        }

        if self.after_trivia(|p| p.at(TokenKind::LParen)) {
            self.ws(&mut b);
            let args = self.cp_args_list();
            b.push_opt(args);
        }
        if self.after_trivia(|p| p.at_word("using")) {
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
            if self.at(TokenKind::LParen) {
                let args = self.cp_args_list();
                b.push_opt(args);
            } else {
                self.error_here(&mut b, "'('");
            }
        }
        if self.after_trivia(|p| p.at(TokenKind::LBrace)) {
            self.ws(&mut b);
            self.mixin_block(&mut b);
        }
        self.finish(b)
    }

    /// cp_args_list := '(' [cp_arg ((',' | ';') cp_arg)*] ')'
    ///
    /// LESS also separates arguments with `;`.
    pub(super) fn cp_args_list(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpArgsList);
        self.bump(&mut b);
        self.paren_depth += 1;
        loop {
            self.ws(&mut b);
            if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                break;
            }
            let before = self.cursor.position();
            if self.at(TokenKind::Ellipsis) {
                self.bump(&mut b);
            } else {
                let arg = self.cp_arg();
                b.push_opt(arg);
            }
            self.ws(&mut b);
            let separated = self.eat(&mut b, TokenKind::Comma)
                || (self.is_less() && self.eat(&mut b, TokenKind::Semi));
            if !separated || self.cursor.position() == before {
                break;
            }
        }
        self.paren_depth -= 1;
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// cp_arg := [cp_variable ':'] expression
    fn cp_arg(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpArg);
        let keyword = matches!(self.kind(), TokenKind::SassVar | TokenKind::LessVar)
            && self.significant_kind(1) == TokenKind::Colon;
        if keyword {
            let name = self.cp_variable();
            b.push_opt(name);
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
        }
        if self.at_term_start() {
            let value = self.expression(false);
            b.push_opt(value);
        } else if !keyword {
            self.error_here(&mut b, "argument");
        }
        self.finish(b)
    }

    /// sass_function_declaration := '@function' sass_function_name cp_args_list '{' ... '}'
    fn function_declaration(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassFunctionDeclaration);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::Ident) {
            let name = self.single(NodeType::SassFunctionName);
            b.push_opt(name);
        } else {
            self.error_here(&mut b, "function name");
        }
        if self.after_trivia(|p| p.at(TokenKind::LParen)) {
            self.ws(&mut b);
            let args = self.cp_args_list();
            b.push_opt(args);
        }
        self.ws(&mut b);
        self.block(&mut b, None, BlockContext::Rule);
        self.finish(b)
    }

    /// sass_function_return := '@return' expression
    fn function_return(&mut self) -> Option<Node> {
        self.keyword_expression(NodeType::SassFunctionReturn)
    }

    /// `@debug`, `@warn` and `@error` with their message expression.
    fn debug(&mut self) -> Option<Node> {
        self.keyword_expression(NodeType::SassDebug)
    }

    fn keyword_expression(&mut self, node_type: NodeType) -> Option<Node> {
        let mut b = NodeBuilder::new(node_type);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at_term_start() {
            let value = self.expression(true);
            b.push_opt(value);
        } else {
            self.error_here(&mut b, "expression");
        }
        self.finish(b)
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// sass_control := sass_if sass_else* | sass_for | sass_each | sass_while
    fn control(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassControl);
        match self.kind() {
            TokenKind::If => {
                let branch = self.sass_if();
                b.push_opt(branch);
                while self.after_trivia(|p| matches!(p.kind(), TokenKind::Else | TokenKind::ElseIf)) {
                    self.ws(&mut b);
                    let branch = self.sass_else();
                    b.push_opt(branch);
                }
            }
            TokenKind::For => {
                let for_loop = self.sass_for();
                b.push_opt(for_loop);
            }
            TokenKind::Each => {
                let each = self.sass_each();
                b.push_opt(each);
            }
            _ => {
                let while_loop = self.sass_while();
                b.push_opt(while_loop);
            }
        }
        self.finish(b)
    }

    /// sass_if := '@if' sass_control_expression sass_control_block
    fn sass_if(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassIf);
        self.bump(&mut b);
        self.ws(&mut b);
        self.control_expression(&mut b, &[]);
        self.ws(&mut b);
        self.control_block(&mut b);
        self.finish(b)
    }

    /// sass_else := ('@else' ['if' expression] | '@elseif' expression) sass_control_block
    fn sass_else(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassElse);
        let chained = self.at(TokenKind::ElseIf);
        self.bump(&mut b);
        self.ws(&mut b);
        if chained || self.at_word("if") {
            if !chained {
                self.bump(&mut b);
                self.ws(&mut b);
            }
            self.control_expression(&mut b, &[]);
            self.ws(&mut b);
        }
        self.control_block(&mut b);
        self.finish(b)
    }

    /// An `@else` with no `@if` before it: reported, then parsed anyway.
    fn stray_else(&mut self) -> Option<Node> {
        self.unexpected("'@if'");
        let mut b = NodeBuilder::new(NodeType::SassControl);
        let branch = self.sass_else();
        b.push_opt(branch);
        self.finish(b)
    }

    /// sass_for := '@for' $var 'from' expression ('through' | 'to') expression block
    fn sass_for(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassFor);
        self.bump(&mut b);
        self.ws(&mut b);
        self.loop_variable(&mut b);
        self.ws(&mut b);
        if self.at_word("from") {
            self.bump(&mut b);
            self.ws(&mut b);
        } else {
            self.error_here(&mut b, "'from'");
        }
        self.control_expression(&mut b, &["through", "to"]);
        self.ws(&mut b);
        if self.at_word("through") || self.at_word("to") {
            self.bump(&mut b);
            self.ws(&mut b);
        } else {
            self.error_here(&mut b, "'through' or 'to'");
        }
        self.control_expression(&mut b, &[]);
        self.ws(&mut b);
        self.control_block(&mut b);
        self.finish(b)
    }

    /// sass_each := '@each' $var (',' $var)* 'in' expression block
    fn sass_each(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassEach);
        self.bump(&mut b);
        self.ws(&mut b);
        loop {
            self.loop_variable(&mut b);
            if self.significant_kind(0) != TokenKind::Comma {
                break;
            }
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
        }
        self.ws(&mut b);
        if self.at_word("in") {
            self.bump(&mut b);
            self.ws(&mut b);
        } else {
            self.error_here(&mut b, "'in'");
        }
        self.control_expression(&mut b, &[]);
        self.ws(&mut b);
        self.control_block(&mut b);
        self.finish(b)
    }

    /// sass_while := '@while' expression block
    fn sass_while(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassWhile);
        self.bump(&mut b);
        self.ws(&mut b);
        self.control_expression(&mut b, &[]);
        self.ws(&mut b);
        self.control_block(&mut b);
        self.finish(b)
    }

    fn loop_variable(&mut self, b: &mut NodeBuilder) {
        if self.at(TokenKind::SassVar) {
            let variable = self.cp_variable();
            b.push_opt(variable);
        } else {
            self.error_here(b, "variable");
        }
    }

    /// sass_control_expression, ending before `{` or a word in `stop`.
    fn control_expression(&mut self, b: &mut NodeBuilder, stop: &[&str]) {
        if !self.at_term_start() {
            self.error_here(b, "expression");
            return;
        }
        let expression = self.expression_until(true, stop);
        b.push_opt(wrap(NodeType::SassControlExpression, expression));
    }

    /// sass_control_block := '{' declaration* '}'
    fn control_block(&mut self, b: &mut NodeBuilder) {
        let mut block = NodeBuilder::new(NodeType::SassControlBlock);
        self.block(&mut block, None, BlockContext::Rule);
        let block = self.finish(block);
        b.push_opt(block);
    }

    // =========================================================================
    // Other SCSS at-rules
    // =========================================================================

    /// sass_extend := '@extend' selectorsGroup ['!optional']
    fn extend(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassExtend);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at_selector_start() {
            let selectors = self.selectors_group();
            b.push_opt(selectors);
        } else {
            self.error_here(&mut b, "selector");
        }
        if self.after_trivia(|p| p.at(TokenKind::SassFlag)) {
            self.ws(&mut b);
            self.bump(&mut b);
        }
        self.finish(b)
    }

    /// `@use` / `@forward`: a resource followed by loosely parsed
    /// `as`, `with (...)`, `show` and `hide` clauses.
    fn module_rule(&mut self, node_type: NodeType) -> Option<Node> {
        let mut b = NodeBuilder::new(node_type);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::String) {
            let resource = self.single(NodeType::ResourceIdentifier);
            b.push_opt(resource);
        } else {
            self.error_here(&mut b, "string");
        }

        while self.after_trivia(|p| {
            !matches!(
                p.kind(),
                TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Eof
            )
        }) {
            self.ws(&mut b);
            if matches!(self.kind(), TokenKind::Comma | TokenKind::Star) {
                self.bump(&mut b);
            } else if self.at_term_start() {
                let term = self.term();
                b.push_opt(term);
            } else {
                self.error_here(&mut b, "';'");
                break;
            }
        }
        self.finish(b)
    }

    /// at_root := '@at-root' [(query) | selectorsGroup] '{' ... '}'
    fn at_root(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::AtRoot);
        self.bump(&mut b);
        self.ws(&mut b);
        if self.at(TokenKind::LParen) {
            // `(without: media)`
            self.bump(&mut b);
            self.raw_balanced(&mut b);
            self.expect_close(&mut b, TokenKind::RParen, "')'");
            self.ws(&mut b);
        } else if self.at_selector_start() {
            let selectors = self.selectors_group();
            b.push_opt(selectors);
            self.ws(&mut b);
        }
        self.block(&mut b, Some(NodeType::Declarations), BlockContext::Rule);
        self.finish(b)
    }

    /// sass_content := '@content' [cp_args_list]
    fn content(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassContent);
        self.bump(&mut b);
        if self.after_trivia(|p| p.at(TokenKind::LParen)) {
            self.ws(&mut b);
            let args = self.cp_args_list();
            b.push_opt(args);
        }
        self.finish(b)
    }
}
