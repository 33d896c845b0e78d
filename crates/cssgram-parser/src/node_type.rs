//! Node type tags.
//!
//! One variant per grammar production plus the specials `root`, `error`,
//! `recovery` and `token`. The string name of each variant is what query
//! paths and dumps use.

use serde::{Serialize, Serializer};
use std::fmt;

macro_rules! node_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Type tag carried by every parse tree node.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $($variant),+
        }

        impl NodeType {
            /// Every node type, in declaration order.
            pub const ALL: &'static [NodeType] = &[$(NodeType::$variant),+];

            /// The production name used in query paths.
            pub fn name(self) -> &'static str {
                match self {
                    $(NodeType::$variant => $name),+
                }
            }

            /// Look a node type up by its production name.
            pub fn from_name(name: &str) -> Option<NodeType> {
                match name {
                    $($name => Some(NodeType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

node_types! {
    // Specials
    Root => "root",
    Error => "error",
    Recovery => "recovery",
    Token => "token",

    // Stylesheet structure
    StyleSheet => "styleSheet",
    CharSet => "charSet",
    CharSetValue => "charSetValue",
    Imports => "imports",
    ImportItem => "importItem",
    ResourceIdentifier => "resourceIdentifier",
    Namespaces => "namespaces",
    Namespace => "namespace",
    NamespacePrefixName => "namespacePrefixName",
    Body => "body",
    BodyItem => "bodyItem",

    // Rules and selectors
    Rule => "rule",
    SelectorsGroup => "selectorsGroup",
    Selector => "selector",
    Combinator => "combinator",
    SimpleSelectorSequence => "simpleSelectorSequence",
    TypeSelector => "typeSelector",
    NamespacePrefix => "namespacePrefix",
    ElementName => "elementName",
    ElementSubsequent => "elementSubsequent",
    CssId => "cssId",
    CssClass => "cssClass",
    SlAttribute => "slAttribute",
    SlAttributeName => "slAttributeName",
    SlAttributeValue => "slAttributeValue",
    Pseudo => "pseudo",
    ParentSelector => "parentSelector",

    // Declarations and values
    Declarations => "declarations",
    Declaration => "declaration",
    PropertyDeclaration => "propertyDeclaration",
    Property => "property",
    PropertyValue => "propertyValue",
    Expression => "expression",
    Term => "term",
    Operator => "operator",
    UnaryOperator => "unaryOperator",
    HexColor => "hexColor",
    Function => "function",
    FunctionName => "functionName",
    FnAttributes => "fnAttributes",
    FnAttribute => "fnAttribute",
    FnAttributeName => "fnAttributeName",
    FnAttributeValue => "fnAttributeValue",
    Prio => "prio",

    // At-rules
    AtRule => "at_rule",
    Media => "media",
    MediaQueryList => "mediaQueryList",
    MediaQuery => "mediaQuery",
    MediaQueryOperator => "mediaQueryOperator",
    MediaType => "mediaType",
    MediaExpression => "mediaExpression",
    MediaFeature => "mediaFeature",
    MediaBody => "mediaBody",
    MediaBodyItem => "mediaBodyItem",
    Page => "page",
    PseudoPage => "pseudoPage",
    Margin => "margin",
    MarginSym => "margin_sym",
    FontFace => "fontFace",
    CounterStyle => "counterStyle",
    SupportsAtRule => "supportsAtRule",
    SupportsCondition => "supportsCondition",
    SupportsInParens => "supportsInParens",
    SupportsFeature => "supportsFeature",
    SupportsDecl => "supportsDecl",
    SupportsSelector => "supportsSelector",
    LayerAtRule => "layerAtRule",
    LayerName => "layerName",
    ContainerAtRule => "containerAtRule",
    ContainerName => "containerName",
    ContainerCondition => "containerCondition",
    ContainerQueryInParens => "containerQueryInParens",
    SizeFeature => "sizeFeature",
    StyleQuery => "styleQuery",
    VendorAtRule => "vendorAtRule",
    MozDocument => "moz_document",
    MozDocumentFunction => "moz_document_function",
    GenericAtRule => "generic_at_rule",
    WebkitKeyframes => "webkitKeyframes",
    AtRuleId => "atRuleId",
    WebkitKeyframesBlock => "webkitKeyframesBlock",
    WebkitKeyframeSelectors => "webkitKeyframeSelectors",

    // Preprocessor constructs
    Interpolation => "interpolation",
    CpVariableDeclaration => "cp_variable_declaration",
    CpVariable => "cp_variable",
    CpMixinDeclaration => "cp_mixin_declaration",
    CpMixinName => "cp_mixin_name",
    CpMixinCall => "cp_mixin_call",
    CpMixinBlock => "cp_mixin_block",
    CpArgsList => "cp_args_list",
    CpArg => "cp_arg",
    CpParens => "cp_parens",
    SassMap => "sass_map",
    SassNestedProperties => "sass_nested_properties",
    SassControl => "sass_control",
    SassIf => "sass_if",
    SassElse => "sass_else",
    SassFor => "sass_for",
    SassEach => "sass_each",
    SassWhile => "sass_while",
    SassControlExpression => "sass_control_expression",
    SassControlBlock => "sass_control_block",
    SassFunctionDeclaration => "sass_function_declaration",
    SassFunctionName => "sass_function_name",
    SassFunctionReturn => "sass_function_return",
    SassExtend => "sass_extend",
    SassExtendOnlySelector => "sass_extend_only_selector",
    SassDebug => "sass_debug",
    SassContent => "sass_content",
    SassUse => "sass_use",
    SassForward => "sass_forward",
    AtRoot => "at_root",
    LessImportTypes => "less_import_types",
    LessWhen => "less_when",
    LessCondition => "less_condition",
    LessExtend => "less_extend",
    LessEscape => "less_escape",
}

impl NodeType {
    /// Whether nodes of this type mark a syntax problem region.
    pub fn is_error(self) -> bool {
        matches!(self, NodeType::Error | NodeType::Recovery)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_names_round_trip() {
        for &ty in NodeType::ALL {
            assert_eq!(NodeType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = NodeType::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), NodeType::ALL.len());
    }

    #[test]
    fn test_grammar_names() {
        assert_eq!(NodeType::AtRule.name(), "at_rule");
        assert_eq!(NodeType::StyleSheet.name(), "styleSheet");
        assert_eq!(NodeType::CpVariableDeclaration.to_string(), "cp_variable_declaration");
        assert_eq!(NodeType::from_name("nope"), None);
    }
}
