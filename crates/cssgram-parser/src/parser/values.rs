//! Property values: expressions, terms and functions.

use cssgram_lexer::TokenKind;

use super::Parser;
use crate::builder::NodeBuilder;
use crate::node_type::NodeType;
use crate::tree::Node;

/// Functions whose argument is taken verbatim.
const RAW_FUNCTIONS: &[&str] = &["url", "url-prefix", "domain", "regexp", "expression"];

impl Parser<'_> {
    // =========================================================================
    // Predicates
    // =========================================================================

    pub(super) fn at_operator(&self, commas: bool) -> bool {
        match self.kind() {
            TokenKind::Comma => commas,
            TokenKind::Slash => true,
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star => {
                self.is_preprocessor() || self.paren_depth > 0
            }
            TokenKind::PercentageSymbol
            | TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessOrEq
            | TokenKind::Greater
            | TokenKind::GreaterOrEq => self.is_preprocessor(),
            TokenKind::Equals => self.is_less(),
            // Keyword arguments and LESS queries in parentheses:
            // `rgba($c, $alpha: .5)`, `@q: (min-width: 768px)`.
            TokenKind::Colon => self.is_preprocessor() && self.paren_depth > 0,
            _ => false,
        }
    }

    pub(super) fn at_term_start(&self) -> bool {
        match self.kind() {
            kind if kind.is_numeric() => true,
            TokenKind::String
            | TokenKind::Uri
            | TokenKind::UnicodeRange
            | TokenKind::Hash
            | TokenKind::Ident
            | TokenKind::Progid
            | TokenKind::Variable
            | TokenKind::PercentageSymbol
            | TokenKind::LBracket
            | TokenKind::SassVar
            | TokenKind::LessVar
            | TokenKind::LessInterp
            | TokenKind::LessJs
            | TokenKind::ScssInterpStart => true,
            TokenKind::Plus | TokenKind::Minus => {
                let next = self.nth_kind(1);
                next.is_numeric()
                    || matches!(
                        next,
                        TokenKind::Ident
                            | TokenKind::SassVar
                            | TokenKind::LessVar
                            | TokenKind::LParen
                            | TokenKind::ScssInterpStart
                    )
            }
            TokenKind::LParen => self.is_preprocessor() || self.paren_depth > 0,
            TokenKind::Tilde => self.is_less() && self.nth_kind(1) == TokenKind::String,
            TokenKind::Ampersand => self.is_scss(),
            // Reported by `term`.
            TokenKind::HashSymbol
            | TokenKind::Dollar
            | TokenKind::At
            | TokenKind::Exclamation
            | TokenKind::Invalid => true,
            _ => false,
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// propertyValue := expression
    pub(super) fn property_value(&mut self) -> Option<Node> {
        let expression = self.expression(true);
        crate::builder::wrap(NodeType::PropertyValue, expression)
    }

    /// expression := term ((operator | ' ') term)*
    pub(super) fn expression(&mut self, commas: bool) -> Option<Node> {
        self.expression_until(commas, &[])
    }

    /// An expression that also ends before any identifier in `stop`
    /// (`@for $i from 1 through 3`).
    pub(super) fn expression_until(&mut self, commas: bool, stop: &[&str]) -> Option<Node> {
        if !self.at_term_start() {
            return None;
        }
        let mut b = NodeBuilder::new(NodeType::Expression);
        let first = self.term();
        b.push_opt(first);

        loop {
            if self.after_trivia(|p| p.at_operator(commas)) {
                self.ws(&mut b);
                let operator = self.single(NodeType::Operator);
                b.push_opt(operator);
                self.ws(&mut b);
                // A dangling operator (`a,` before `}`) is tolerated.
                if !self.at_term_start() {
                    continue;
                }
            } else if self.after_trivia(|p| {
                p.at_term_start() && !stop.iter().any(|word| p.at_word(word))
            }) {
                self.ws(&mut b);
            } else {
                break;
            }

            let before = self.cursor.position();
            let term = self.term();
            b.push_opt(term);
            if self.cursor.position() == before {
                break;
            }
        }
        self.finish(b)
    }

    /// term := [unaryOperator] (number | string | ident | hexColor | function | variable | ...)
    pub(super) fn term(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Term);

        if matches!(self.kind(), TokenKind::Plus | TokenKind::Minus) {
            let unary = self.single(NodeType::UnaryOperator);
            b.push_opt(unary);
        }

        match self.kind() {
            TokenKind::Hash => {
                let color = self.single(NodeType::HexColor);
                b.push_opt(color);
            }
            TokenKind::Ident | TokenKind::Progid if self.nth_kind(1) == TokenKind::LParen => {
                let function = self.function();
                b.push_opt(function);
            }
            // Module members: `math.div(...)`, `map.$key`.
            TokenKind::Ident
                if self.is_scss()
                    && self.nth_kind(1) == TokenKind::Dot
                    && self.nth_kind(2) == TokenKind::Ident
                    && self.nth_kind(3) == TokenKind::LParen =>
            {
                let function = self.function();
                b.push_opt(function);
            }
            TokenKind::Ident
                if self.is_scss()
                    && self.nth_kind(1) == TokenKind::Dot
                    && self.nth_kind(2) == TokenKind::SassVar =>
            {
                let variable = self.cp_variable();
                b.push_opt(variable);
            }
            // LESS string formatting: `%("%d", 1)`.
            TokenKind::PercentageSymbol
                if self.is_less() && self.nth_kind(1) == TokenKind::LParen =>
            {
                let function = self.function();
                b.push_opt(function);
            }
            TokenKind::SassVar | TokenKind::LessVar => {
                let variable = self.cp_variable();
                b.push_opt(variable);
                if self.is_preprocessor() {
                    self.eat(&mut b, TokenKind::Ellipsis);
                }
            }
            TokenKind::ScssInterpStart | TokenKind::LessInterp => {
                let interpolation = self.interpolation();
                b.push_opt(interpolation);
            }
            TokenKind::Tilde => {
                let escape = self.less_escape();
                b.push_opt(escape);
            }
            TokenKind::LParen => {
                let group = if self.at_sass_map() {
                    self.sass_map()
                } else {
                    self.cp_parens()
                };
                b.push_opt(group);
            }
            TokenKind::LBracket => {
                self.bump(&mut b);
                self.raw_balanced(&mut b);
                self.expect_close(&mut b, TokenKind::RBracket, "']'");
            }
            TokenKind::HashSymbol
            | TokenKind::Dollar
            | TokenKind::At
            | TokenKind::Exclamation
            | TokenKind::Invalid => self.error_here(&mut b, "term"),
            _ if self.at_term_start() => self.bump(&mut b),
            _ => self.error_here(&mut b, "term"),
        }

        // Glued interpolation: `foo#{$x}`, `@{a}px`.
        while self.is_preprocessor()
            && matches!(
                self.kind(),
                TokenKind::ScssInterpStart | TokenKind::LessInterp
            )
        {
            let interpolation = self.interpolation();
            b.push_opt(interpolation);
        }
        self.finish(b)
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// function := functionName '(' (fnAttributes | expression | raw) ')'
    pub(super) fn function(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Function);
        let mut name = NodeBuilder::new(NodeType::FunctionName);
        let name_text = self.text().to_ascii_lowercase();
        self.bump(&mut name);
        if self.at(TokenKind::Dot) {
            self.bump(&mut name);
            self.bump(&mut name);
        }
        b.push_opt(name.build());

        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.paren_depth += 1;
        self.ws(&mut b);

        let raw = RAW_FUNCTIONS.contains(&name_text.as_str())
            && !(self.is_preprocessor()
                && matches!(
                    self.kind(),
                    TokenKind::String | TokenKind::SassVar | TokenKind::LessVar
                ));
        if raw {
            self.raw_balanced(&mut b);
        } else if self.at(TokenKind::Ident)
            && self.significant_kind(1) == TokenKind::Equals
            && !self.is_less()
        {
            let attributes = self.fn_attributes();
            b.push_opt(attributes);
        } else if !self.at(TokenKind::RParen) {
            let arguments = self.expression(true);
            b.push_opt(arguments);
        }

        self.paren_depth -= 1;
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// fnAttributes := fnAttribute (',' fnAttribute)*
    fn fn_attributes(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::FnAttributes);
        loop {
            let attribute = self.fn_attribute();
            b.push_opt(attribute);
            if self.significant_kind(0) != TokenKind::Comma {
                break;
            }
            self.ws(&mut b);
            self.bump(&mut b);
            self.ws(&mut b);
            if !self.at(TokenKind::Ident) {
                self.error_here(&mut b, "attribute name");
                break;
            }
        }
        self.finish(b)
    }

    /// fnAttribute := fnAttributeName '=' fnAttributeValue
    fn fn_attribute(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::FnAttribute);
        let name = self.single(NodeType::FnAttributeName);
        b.push_opt(name);
        self.ws(&mut b);
        if !self.eat(&mut b, TokenKind::Equals) {
            self.error_here(&mut b, "'='");
            return self.finish(b);
        }
        self.ws(&mut b);
        if self.at_term_start() {
            let value = self.term();
            b.push_opt(crate::builder::wrap(NodeType::FnAttributeValue, value));
        } else {
            self.error_here(&mut b, "attribute value");
        }
        self.finish(b)
    }

    /// Balanced tokens up to the `)` or `]` closing the current group, which
    /// is left in place. Also stops at `;`, `{` and `}` outside nested groups.
    pub(super) fn raw_balanced(&mut self, b: &mut NodeBuilder) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace if depth == 0 => break,
                _ => {}
            }
            self.bump(b);
        }
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// cp_parens := '(' expression ')'
    pub(super) fn cp_parens(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpParens);
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.paren_depth += 1;
        self.ws(&mut b);
        if !self.at(TokenKind::RParen) {
            let inner = self.expression(true);
            b.push_opt(inner);
        }
        self.paren_depth -= 1;
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    /// `(key: value, ...)` in SCSS.
    fn at_sass_map(&self) -> bool {
        self.is_scss()
            && self.at(TokenKind::LParen)
            && self.significant_kind(2) == TokenKind::Colon
            && matches!(
                self.significant_kind(1),
                TokenKind::Ident
                    | TokenKind::String
                    | TokenKind::Number
                    | TokenKind::SassVar
                    | TokenKind::ScssInterpStart
            )
    }

    /// sass_map := '(' key ':' value (',' key ':' value)* [','] ')'
    fn sass_map(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassMap);
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RParen, "')'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.paren_depth += 1;
        loop {
            self.ws(&mut b);
            if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                break;
            }
            let before = self.cursor.position();
            let key = self.term();
            b.push_opt(key);
            self.ws(&mut b);
            if self.eat(&mut b, TokenKind::Colon) {
                self.ws(&mut b);
                let value = self.expression(false);
                b.push_opt(value);
            } else {
                self.error_here(&mut b, "':'");
            }
            self.ws(&mut b);
            if !self.eat(&mut b, TokenKind::Comma) || self.cursor.position() == before {
                break;
            }
        }
        self.paren_depth -= 1;
        self.leave_nesting();
        self.expect_close(&mut b, TokenKind::RParen, "')'");
        self.finish(b)
    }

    // =========================================================================
    // Dialect terms
    // =========================================================================

    /// cp_variable := $name | @name | module.$name
    pub(super) fn cp_variable(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::CpVariable);
        if self.at(TokenKind::Ident) {
            self.bump(&mut b);
            self.bump(&mut b);
        }
        self.bump(&mut b);
        b.build()
    }

    /// interpolation := '#{' expression '}' | '@{name}'
    pub(super) fn interpolation(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Interpolation);
        if self.at(TokenKind::LessInterp) {
            self.bump(&mut b);
            return b.build();
        }
        if !self.enter_nesting() {
            self.skip_group(&mut b, TokenKind::RBrace, "'}'");
            return self.finish(b);
        }
        self.bump(&mut b);
        self.ws(&mut b);
        if !self.at(TokenKind::RBrace) {
            let inner = self.expression(true);
            b.push_opt(inner);
            self.ws(&mut b);
        }
        self.leave_nesting();
        if !self.eat(&mut b, TokenKind::RBrace) {
            self.error_here(&mut b, "'}'");
        }
        self.finish(b)
    }

    /// less_escape := '~' string
    fn less_escape(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::LessEscape);
        self.bump(&mut b);
        self.bump(&mut b);
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use crate::{NodeType, ParseResult, Parser};
    use cssgram_lexer::Dialect;
    use pretty_assertions::assert_eq;

    fn value_of(source: &str, dialect: Dialect) -> ParseResult {
        Parser::parse(&format!("a {{ b: {source} }}"), dialect)
    }

    fn assert_clean(result: &ParseResult) {
        assert!(
            result.diagnostics().is_empty(),
            "unexpected diagnostics in {:?}: {:?}",
            result.source(),
            result.diagnostics()
        );
    }

    // =========================================================================
    // CSS values
    // =========================================================================

    #[test]
    fn test_common_values() {
        for value in [
            "0 auto",
            "1px solid #ccc",
            "12px/1.5 \"Helvetica Neue\", Arial, sans-serif",
            "rgba(0, 0, 0, .5)",
            "calc(100% - (2 * 10px))",
            "var(--gap, 4px)",
            "url(images/bottom@2x.png) no-repeat",
            "url( \"a b.png\" )",
            "linear-gradient(to right, red 0%, blue 100%)",
            "U+0025-00FF",
            "[full-start] minmax(1em, 1fr) [main-start]",
            "attr(data-label) \": \"",
            "%/20",
            "-webkit-transform",
            "counter(item) \". \"",
        ] {
            assert_clean(&value_of(value, Dialect::Css));
        }
    }

    #[test]
    fn test_hex_color_and_operators() {
        let result = value_of("#fff/2", Dialect::Css);
        assert_clean(&result);
        assert_eq!(result.query("term/hexColor").unwrap().image(), "#fff");
        assert_eq!(result.query("expression/operator").unwrap().image(), "/");
    }

    #[test]
    fn test_unary_operator() {
        let result = value_of("-$x", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(result.query("term/unaryOperator").unwrap().image(), "-");
    }

    #[test]
    fn test_function_tree() {
        let result = value_of("rgb(10, 20, 30)", Dialect::Css);
        assert_clean(&result);
        assert_eq!(result.query("function/functionName").unwrap().image(), "rgb");
        assert_eq!(
            result.query("function/expression").unwrap().image(),
            "10, 20, 30"
        );
    }

    #[test]
    fn test_progid_filter() {
        let source = ".x { filter: progid:DXImageTransform.Microsoft.gradient(startColorstr='#80000000', endColorstr='#80000000'); }";
        let result = Parser::parse(source, Dialect::Css);
        assert_clean(&result);
        assert_eq!(
            result.query("function/functionName").unwrap().image(),
            "progid:DXImageTransform.Microsoft.gradient"
        );
        assert_eq!(
            result.query("function/fnAttributes/fnAttribute|1/fnAttributeName").unwrap().image(),
            "endColorstr"
        );
        assert_eq!(
            result.query("fnAttribute/fnAttributeValue").unwrap().image(),
            "'#80000000'"
        );
    }

    #[test]
    fn test_alpha_opacity() {
        let result = value_of("alpha(opacity=50)", Dialect::Css);
        assert_clean(&result);
        assert!(result.query("fnAttributes/fnAttribute/fnAttributeName/opacity").is_some());
    }

    #[test]
    fn test_raw_functions() {
        let result = value_of("expression(document.body.clientWidth > 800 ? \"800px\" : \"auto\")", Dialect::Css);
        assert_clean(&result);
        assert_eq!(result.query("function/functionName").unwrap().image(), "expression");
    }

    #[test]
    fn test_unclosed_function_reports_brace() {
        let result = Parser::parse("p { color: hsl(10, }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        let marker = result.query("term/function/error").unwrap();
        assert_eq!((marker.from(), marker.to()), (19, 19));
    }

    #[test]
    fn test_missing_value() {
        let result = Parser::parse("h1 { color:  }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("propertyDeclaration/property/color").is_some());
    }

    #[test]
    fn test_parentheses_are_errors_in_css_values() {
        let result = value_of("(1 + 2)", Dialect::Css);
        assert!(result.has_errors());
    }

    #[test]
    fn test_stray_dollar_in_css() {
        let result = value_of("$x", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("term/error").is_some());
    }

    // =========================================================================
    // Preprocessor values
    // =========================================================================

    #[test]
    fn test_scss_arithmetic() {
        let result = value_of("$a * 2 + (100% - $b) / 3", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::Operator).len(), 4);
        assert!(result.query("term/cp_parens/expression").is_some());
    }

    #[test]
    fn test_scss_module_function() {
        let result = value_of("math.div($a, 2) map.$x", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(result.query("function/functionName").unwrap().image(), "math.div");
        assert_eq!(result.query("term|1/cp_variable").unwrap().image(), "map.$x");
    }

    #[test]
    fn test_scss_keyword_argument() {
        let result = value_of("rgba($color, $alpha: .5)", Dialect::Scss);
        assert_clean(&result);
    }

    #[test]
    fn test_sass_map() {
        let result = Parser::parse(
            "$breakpoints: (small: 576px, 'medium': (min: 768px, max: 991px), large: 992px,);",
            Dialect::Scss,
        );
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::SassMap).len(), 2);
    }

    #[test]
    fn test_interpolation_in_value() {
        let result = value_of("calc(100% - #{$gap}) foo#{$x}", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(result.root().find_all(NodeType::Interpolation).len(), 2);
    }

    #[test]
    fn test_less_escape_and_js() {
        let result = value_of("~\"calc(100% - @{w})\" `1 + 1`", Dialect::Less);
        assert_clean(&result);
        assert_eq!(result.query("term/less_escape").unwrap().image(), "~\"calc(100% - @{w})\"");
    }

    #[test]
    fn test_less_operations() {
        let result = value_of("%(\"%d\", 1) @a + @b * 2", Dialect::Less);
        assert_clean(&result);
        assert!(result.query("function/functionName").is_some());
    }

    #[test]
    fn test_percentage_symbol_term() {
        let result = Parser::parse("a { font: %/20 }", Dialect::Css);
        assert_clean(&result);
        assert!(result.query("expression/operator").is_some());
    }
}
