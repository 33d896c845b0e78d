//! Property declarations.

use cssgram_lexer::TokenKind;

use super::{BlockContext, Parser};
use crate::builder::NodeBuilder;
use crate::node_type::NodeType;
use crate::tree::Node;

impl Parser<'_> {
    /// Whether a property name followed by `:` starts at the cursor.
    pub(super) fn at_property_start(&self) -> bool {
        match self.property_end(self.cursor.position()) {
            Some(end) => self.significant_from(end, 0).kind == TokenKind::Colon,
            None => false,
        }
    }

    /// Index just past the property name starting at token `start`:
    /// `*zoom`, `--custom`, `border-#{$side}`, `@{p}-color`,
    /// `border-#{$v}-#{$h}-radius`, LESS `prop+_`.
    fn property_end(&self, start: usize) -> Option<usize> {
        let kind_at = |i: usize| self.tokens.get(i).map_or(TokenKind::Eof, |t| t.kind);

        let mut i = start;
        if kind_at(i) == TokenKind::Star {
            i += 1;
        }
        let name_start = i;
        loop {
            match kind_at(i) {
                TokenKind::Ident | TokenKind::Variable => i += 1,
                TokenKind::LessInterp if self.is_less() => i += 1,
                TokenKind::ScssInterpStart if self.is_scss() => i = self.interpolation_end(i)?,
                // A dash between glued parts: `#{$a}-#{$b}`.
                TokenKind::Minus
                    if self.is_preprocessor()
                        && i > name_start
                        && matches!(
                            kind_at(i + 1),
                            TokenKind::Ident | TokenKind::ScssInterpStart | TokenKind::LessInterp
                        ) =>
                {
                    i += 1
                }
                _ => break,
            }
        }
        if i == name_start {
            return None;
        }

        if self.is_less() && kind_at(i) == TokenKind::Plus {
            i += 1;
            if kind_at(i) == TokenKind::Ident && self.tokens[i].text(self.source) == "_" {
                i += 1;
            }
        }
        Some(i)
    }

    /// Index past the `}` closing the `#{` at `start`.
    fn interpolation_end(&self, start: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(start) {
            match token.kind {
                TokenKind::ScssInterpStart | TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                TokenKind::Semi | TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    /// propertyDeclaration := property ':' (propertyValue [prio] | nestedProperties)
    pub(super) fn property_declaration(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::PropertyDeclaration);
        let custom = self.at(TokenKind::Variable);
        let property = self.property();
        b.push_opt(property);

        self.ws(&mut b);
        if !self.eat(&mut b, TokenKind::Colon) {
            self.error_here(&mut b, "':'");
            self.skip_to_declaration_end(&mut b);
            return self.finish(b);
        }
        self.ws(&mut b);

        if custom {
            let value = self.custom_property_value();
            b.push_opt(value);
            return self.finish(b);
        }

        if self.is_scss() && self.at(TokenKind::LBrace) {
            let nested = self.nested_properties();
            b.push_opt(nested);
            return self.finish(b);
        }

        if !self.at_term_start() {
            self.error_here(&mut b, "property value");
            if !matches!(self.kind(), TokenKind::Semi | TokenKind::RBrace) {
                self.skip_to_declaration_end(&mut b);
            }
            return self.finish(b);
        }
        let value = self.property_value();
        b.push_opt(value);

        // `font: 12px { family: x }`
        if self.is_scss() && self.after_trivia(|p| p.at(TokenKind::LBrace)) {
            self.ws(&mut b);
            let nested = self.nested_properties();
            b.push_opt(nested);
        }

        if self.after_trivia(|p| p.at(TokenKind::ImportantSym)) {
            self.ws(&mut b);
            let prio = self.single(NodeType::Prio);
            b.push_opt(prio);
        }
        self.finish(b)
    }

    fn property(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Property);
        let start = self.cursor.position();
        let end = self.property_end(start).unwrap_or(start);
        while self.cursor.position() < end {
            self.bump(&mut b);
        }
        b.build()
    }

    /// Custom property values are kept verbatim up to the end of the
    /// declaration or an unbalanced closer, and may be empty.
    fn custom_property_value(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::PropertyValue);
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::Semi | TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket
                    if depth == 0 =>
                {
                    break
                }
                TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::ScssInterpStart => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump(&mut b);
        }
        self.finish(b)
    }

    /// sass_nested_properties := '{' declaration* '}'
    fn nested_properties(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::SassNestedProperties);
        self.block(&mut b, None, BlockContext::Rule);
        self.finish(b)
    }
}

#[cfg(test)]
mod tests {
    use crate::{NodeType, ParseResult, Parser};
    use cssgram_lexer::Dialect;
    use pretty_assertions::assert_eq;

    fn assert_clean(result: &ParseResult) {
        assert!(
            result.diagnostics().is_empty(),
            "unexpected diagnostics in {:?}: {:?}",
            result.source(),
            result.diagnostics()
        );
    }

    #[test]
    fn test_custom_properties_are_raw() {
        let result = Parser::parse("a { --gap: 1px 2px; --empty:; --map: { b: c } }", Dialect::Css);
        assert_clean(&result);
        assert_eq!(
            result
                .query("declaration/propertyDeclaration/propertyValue")
                .unwrap()
                .image(),
            "1px 2px"
        );
        assert!(result.query("declaration|1/propertyDeclaration/propertyValue").is_none());
        assert_eq!(
            result
                .query("declaration|2/propertyDeclaration/propertyValue")
                .unwrap()
                .image(),
            "{ b: c }"
        );
    }

    #[test]
    fn test_star_hack_property() {
        let result = Parser::parse("a { *zoom: 1 }", Dialect::Css);
        assert_clean(&result);
        assert_eq!(result.query("propertyDeclaration/property").unwrap().image(), "*zoom");
    }

    #[test]
    fn test_interpolated_property_names() {
        let result = Parser::parse("a { border-#{$side}-width: 1px }", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(
            result.query("propertyDeclaration/property").unwrap().image(),
            "border-#{$side}-width"
        );

        let result = Parser::parse("a { @{p}-color: red }", Dialect::Less);
        assert_clean(&result);
        assert_eq!(result.query("propertyDeclaration/property").unwrap().image(), "@{p}-color");
    }

    #[test]
    fn test_less_merge_properties() {
        let result = Parser::parse("a { background+: url(1.png); background+_: url(2.png) }", Dialect::Less);
        assert_clean(&result);
        assert_eq!(
            result
                .query("declaration|1/propertyDeclaration/property")
                .unwrap()
                .image(),
            "background+_"
        );
    }

    #[test]
    fn test_nested_properties() {
        let result = Parser::parse("a { font: { family: x; size: 2px } }", Dialect::Scss);
        assert_clean(&result);
        assert_eq!(
            result
                .query("propertyDeclaration/sass_nested_properties/declaration|1/propertyDeclaration/property")
                .unwrap()
                .image(),
            "size"
        );

        let result = Parser::parse("a { font: 12px { family: x } }", Dialect::Scss);
        assert_clean(&result);
        assert!(result.query("propertyDeclaration/propertyValue").is_some());
        assert!(result.query("propertyDeclaration/sass_nested_properties").is_some());
    }

    #[test]
    fn test_important() {
        let result = Parser::parse("a { margin: 0 auto ! important }", Dialect::Css);
        assert_clean(&result);
        assert_eq!(result.query("propertyDeclaration/prio").unwrap().image(), "! important");
        assert_eq!(result.query("propertyDeclaration/propertyValue").unwrap().image(), "0 auto");
    }

    #[test]
    fn test_empty_value_before_semicolon() {
        let source = "a { color: ; top: 0 }";
        let result = Parser::parse(source, Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.diagnostics()[0].from, source.find(';').unwrap());
        assert!(result.query("declaration|1/propertyDeclaration/property/top").is_some());
    }

    #[test]
    fn test_bad_value_skips_declaration() {
        let result = Parser::parse("a { color: ) red; top: 0 }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("declaration|1/propertyDeclaration/property/top").is_some());
    }

    #[test]
    fn test_nested_rule_versus_declaration() {
        let result = Parser::parse("a { b:hover { c: d } e: f }", Dialect::Scss);
        assert_clean(&result);
        assert!(result.query("declarations/declaration/rule").is_some());
        assert!(result.query("declaration|1/propertyDeclaration/property/e").is_some());
        assert_eq!(result.root().find_all(NodeType::PropertyDeclaration).len(), 2);
    }

    #[test]
    fn test_dashes_between_interpolated_property_parts() {
        let source = ".rounded { border-#{$vert}-#{$horz}-radius: $radius; #{$a}-#{$b}: 1px }";
        let result = Parser::parse(source, Dialect::Scss);
        assert_clean(&result);
        assert_eq!(
            result.query("declaration/propertyDeclaration/property").unwrap().image(),
            "border-#{$vert}-#{$horz}-radius"
        );
        assert_eq!(
            result.query("declaration|1/propertyDeclaration/property").unwrap().image(),
            "#{$a}-#{$b}"
        );

        let result = Parser::parse(".a { @{b}-@{c}: 1px }", Dialect::Less);
        assert_clean(&result);
        assert_eq!(
            result.query("propertyDeclaration/property").unwrap().image(),
            "@{b}-@{c}"
        );
    }
}
