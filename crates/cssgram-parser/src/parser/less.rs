//! LESS statements: mixin declarations and calls, guards, `:extend` and
//! detached ruleset calls.

use cssgram_lexer::TokenKind;

use super::Parser;
use crate::builder::{wrap, NodeBuilder};
use crate::node_type::NodeType;
use crate::tree::Node;

impl Parser<'_> {
    /// A LESS-only statement at the cursor, or `None` with nothing consumed
    /// so the caller can parse a rule instead.
    pub(super) fn less_statement(&mut self) -> Option<Node> {
        if !matches!(
            self.kind(),
            TokenKind::Dot | TokenKind::Hash | TokenKind::Ampersand
        ) {
            return None;
        }
        if self.lookahead(Self::less_mixin_header) {
            return self.less_mixin_declaration();
        }
        self.choice(&[Self::less_mixin_call, Self::less_extend])
    }

    /// `.name`, `.@{name}` or `#name`.
    fn less_mixin_name(&mut self, b: &mut NodeBuilder) -> bool {
        match self.kind() {
            TokenKind::Hash => {
                self.bump(b);
                true
            }
            TokenKind::Dot
                if matches!(self.nth_kind(1), TokenKind::Ident | TokenKind::LessInterp) =>
            {
                self.bump(b);
                self.bump(b);
                true
            }
            _ => false,
        }
    }

    /// `.name (args) [when guard] {`
    fn less_mixin_header(&mut self) -> bool {
        let mut scratch = NodeBuilder::new(NodeType::CpMixinName);
        if !self.less_mixin_name(&mut scratch) {
            return false;
        }
        self.ws(&mut scratch);
        if !self.at(TokenKind::LParen) {
            return false;
        }
        if self.cp_args_list().is_none() {
            return false;
        }
        self.ws(&mut scratch);
        if self.at_word("when") {
            self.less_when();
            self.ws(&mut scratch);
        }
        self.at(TokenKind::LBrace)
    }

    /// cp_mixin_declaration := cp_mixin_name cp_args_list [less_when] cp_mixin_block
    fn less_mixin_declaration(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpMixinDeclaration);
        let mut name = NodeBuilder::new(NodeType::CpMixinName);
        self.less_mixin_name(&mut name);
        b.push_opt(name.build());
        self.ws(&mut b);
        let args = self.cp_args_list();
        b.push_opt(args);
        if self.after_trivia(|p| p.at_word("when")) {
            self.ws(&mut b);
            let guard = self.less_when();
            b.push_opt(guard);
        }
        self.ws(&mut b);
        self.mixin_block(&mut b);
        self.finish(b)
    }

    /// cp_mixin_call := cp_mixin_name ([>] cp_mixin_name)* [cp_args_list] ['!important']
    ///
    /// Only a call when the statement ends right after it.
    fn less_mixin_call(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpMixinCall);
        let mut name = NodeBuilder::new(NodeType::CpMixinName);
        if !self.less_mixin_name(&mut name) {
            return None;
        }
        loop {
            // Namespaces: `#ns > .mixin`, `#ns.mixin`.
            if self.significant_kind(0) == TokenKind::Greater
                && matches!(self.significant_kind(1), TokenKind::Dot | TokenKind::Hash)
            {
                self.ws(&mut name);
                self.bump(&mut name);
                self.ws(&mut name);
            } else if !matches!(self.kind(), TokenKind::Dot | TokenKind::Hash) {
                break;
            }
            if !self.less_mixin_name(&mut name) {
                return None;
            }
        }
        b.push_opt(name.build());

        if self.after_trivia(|p| p.at(TokenKind::LParen)) {
            self.ws(&mut b);
            let args = self.cp_args_list();
            b.push_opt(args);
        }
        if self.after_trivia(|p| p.at(TokenKind::ImportantSym)) {
            self.ws(&mut b);
            let prio = self.single(NodeType::Prio);
            b.push_opt(prio);
        }
        if !matches!(
            self.significant_kind(0),
            TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
        ) {
            return None;
        }
        self.finish(b)
    }

    /// less_extend := selectorsGroup ';', where a selector uses `:extend(...)`.
    fn less_extend(&mut self) -> Option<Node> {
        let selectors = self.selectors_group()?;
        let source = self.source;
        if !source[selectors.from()..selectors.to()].contains(":extend(") {
            return None;
        }
        if !matches!(
            self.significant_kind(0),
            TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
        ) {
            return None;
        }
        wrap(NodeType::LessExtend, Some(selectors))
    }

    /// less_when := 'when' less_condition (('and' | 'or' | ',') less_condition)*
    pub(super) fn less_when(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LessWhen);
        self.bump(&mut b);
        self.ws(&mut b);
        let condition = self.less_condition();
        b.push_opt(condition);
        while self.after_trivia(|p| {
            p.at(TokenKind::Comma) || p.at_word("and") || p.at_word("or")
        }) {
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
            let condition = self.less_condition();
            b.push_opt(condition);
        }
        self.finish(b)
    }

    /// less_condition := ['not'] '(' expression ')'
    fn less_condition(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LessCondition);
        if self.at_word("not") {
            self.bump(&mut b);
            self.ws(&mut b);
        }
        if !self.at(TokenKind::LParen) {
            self.error_here(&mut b, "'('");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.paren_depth += 1;
        self.ws(&mut b);
        if self.at_term_start() {
            let expression = self.expression(true);
            b.push_opt(expression);
        } else {
            self.error_here(&mut b, "condition");
        }
        self.paren_depth -= 1;
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `@detached();`
    pub(super) fn detached_ruleset_call(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpMixinCall);
        let variable = self.cp_variable();
        b.push_opt(variable);
        self.bump(&mut b);
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }
}

#[cfg(test)]
mod tests {
    use crate::{NodeType, ParseResult, Parser};
    use cssgram_lexer::Dialect;
    use pretty_assertions::assert_eq;

    fn parse_less(source: &str) -> ParseResult {
        Parser::parse(source, Dialect::Less)
    }

    fn assert_clean(result: &ParseResult) {
        assert!(
            result.diagnostics().is_empty(),
            "unexpected diagnostics in {:?}: {:?}",
            result.source(),
            result.diagnostics()
        );
    }

    fn images(result: &ParseResult, node_type: NodeType) -> Vec<String> {
        result
            .root()
            .find_all(node_type)
            .iter()
            .map(|node| node.image().to_string())
            .collect()
    }

    // =========================================================================
    // Mixins
    // =========================================================================

    #[test]
    fn test_mixin_declaration_and_call() {
        let source = ".bordered(@width: 2px; @style: solid) { border: @width @style black; }\n#header { .bordered(4px; dashed); }";
        let result = parse_less(source);
        assert_clean(&result);
        assert_eq!(
            result.query("cp_mixin_declaration/cp_mixin_name").unwrap().image(),
            ".bordered"
        );
        assert_eq!(
            result
                .query("cp_mixin_declaration/cp_args_list/cp_arg|1/cp_variable")
                .unwrap()
                .image(),
            "@style"
        );
        assert_eq!(
            result.query("cp_mixin_call/cp_args_list/cp_arg|1").unwrap().image(),
            "dashed"
        );
        assert!(result.query("bodyItem|1/rule/declarations/declaration/cp_mixin_call").is_some());
    }

    #[test]
    fn test_mixin_call_forms() {
        let result = parse_less(".a { .m; .m(); #ns > .m(); #ns.m(); .m() !important; }");
        assert_clean(&result);
        assert_eq!(
            images(&result, NodeType::CpMixinName),
            vec![".m", ".m", "#ns > .m", "#ns.m", ".m"]
        );
        assert_eq!(
            result.query("declaration|4/cp_mixin_call/prio").unwrap().image(),
            "!important"
        );
    }

    #[test]
    fn test_rule_is_not_a_mixin_call() {
        let result = parse_less(".m { c: d } #main .m { }");
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::Rule).len(), 2);
        assert!(result.query("cp_mixin_call").is_none());
    }

    #[test]
    fn test_variadic_mixin_arguments() {
        let result = parse_less(".m(@a; ...) { } .n(@rest...) { x: @rest }");
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::CpMixinDeclaration).len(), 2);
        assert_eq!(
            result.query("bodyItem|1/cp_mixin_declaration/cp_args_list/cp_arg").unwrap().image(),
            "@rest..."
        );
    }

    // =========================================================================
    // Guards
    // =========================================================================

    #[test]
    fn test_mixin_guards() {
        let source = ".m(@a) when (@a > 10), (@a < -10) { }\n.m(@a) when not (iscolor(@a)) and (default()) { }";
        let result = parse_less(source);
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::LessWhen).len(), 2);
        assert_eq!(
            images(&result, NodeType::LessCondition),
            vec!["(@a > 10)", "(@a < -10)", "not (iscolor(@a))", "(default())"]
        );
    }

    #[test]
    fn test_guarded_css_rule() {
        let result = parse_less("button when (@mode = huge) { width: 100% }");
        assert_clean(&result);
        assert_eq!(
            result.query("rule/less_when/less_condition").unwrap().image(),
            "(@mode = huge)"
        );
    }

    #[test]
    fn test_guard_without_parentheses() {
        let result = parse_less(".m() when @a { }");
        assert!(result.has_errors());
    }

    // =========================================================================
    // Extend and detached rulesets
    // =========================================================================

    #[test]
    fn test_extend_statements() {
        let result = parse_less(".e:extend(.f all);\n.c { &:extend(.d all); color: red }\n.a:extend(.b) { }");
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::LessExtend).len(), 2);
        assert!(result.query("bodyItem|2/rule/selectorsGroup").is_some());
        assert!(result.query("declaration|1/propertyDeclaration/property/color").is_some());
    }

    #[test]
    fn test_detached_ruleset_call() {
        let result = parse_less("@r: { a: b }; .x { @r(); }");
        assert_clean(&result);
        assert_eq!(result.query("cp_mixin_call/cp_variable").unwrap().image(), "@r");

        let result = parse_less(".x { @r(; }");
        assert!(result.has_errors());
        assert!(result.query("cp_mixin_call").is_some());
    }
}
