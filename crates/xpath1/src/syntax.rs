//! The parsed-expression contract: the syntax tree a host parser hands to the engine.
//!
//! Every node carries its kind, its ordered children and the raw source text it was
//! parsed from. The engine never parses text itself; hosts without a parser can build
//! trees with the constructors in [`build`].

/// Every syntax form the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Expressions
    OrExpr,
    AndExpr,
    EqExpr,
    NeExpr,
    LtExpr,
    LteExpr,
    GtExpr,
    GteExpr,
    AddExpr,
    SubtractExpr,
    MultiplyExpr,
    DivideExpr,
    ModuloExpr,
    UnaryMinusExpr,
    UnionExpr,
    ParenthesizedExpr,
    FunctionCall,
    VariableReference,
    NumberLiteral,
    StringLiteral,
    AbsoluteLocationPath,
    RelativeLocationPath,
    FilterPathExpr,
    // Structural parts
    FunctionName,
    Step,
    AxisName,
    AbbreviatedStep,
    DescendantSeparator,
    Predicate,
    NodeTypeTest,
    ProcessingInstructionNameTest,
    UnprefixedNameTest,
    PrefixedNameTest,
    UnprefixedWildcardTest,
    PrefixedWildcardTest,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub text: String,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, text: impl Into<String>, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind,
            text: text.into(),
            children,
        }
    }

    pub fn leaf(kind: SyntaxKind, text: impl Into<String>) -> Self {
        Self::new(kind, text, Vec::new())
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&SyntaxNode> {
        self.children.get(index)
    }
}

/// Constructors that assemble syntax trees together with plausible source text.
pub mod build {
    use super::{SyntaxKind, SyntaxNode};

    fn binary(kind: SyntaxKind, op: &str, lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        let text = format!("{} {} {}", lhs.text, op, rhs.text);
        SyntaxNode::new(kind, text, vec![lhs, rhs])
    }

    pub fn or(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::OrExpr, "or", lhs, rhs)
    }

    pub fn and(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::AndExpr, "and", lhs, rhs)
    }

    pub fn eq(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::EqExpr, "=", lhs, rhs)
    }

    pub fn ne(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::NeExpr, "!=", lhs, rhs)
    }

    pub fn lt(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::LtExpr, "<", lhs, rhs)
    }

    pub fn lte(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::LteExpr, "<=", lhs, rhs)
    }

    pub fn gt(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::GtExpr, ">", lhs, rhs)
    }

    pub fn gte(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::GteExpr, ">=", lhs, rhs)
    }

    pub fn add(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::AddExpr, "+", lhs, rhs)
    }

    pub fn sub(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::SubtractExpr, "-", lhs, rhs)
    }

    pub fn mul(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::MultiplyExpr, "*", lhs, rhs)
    }

    pub fn div(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::DivideExpr, "div", lhs, rhs)
    }

    pub fn modulo(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::ModuloExpr, "mod", lhs, rhs)
    }

    pub fn union(lhs: SyntaxNode, rhs: SyntaxNode) -> SyntaxNode {
        binary(SyntaxKind::UnionExpr, "|", lhs, rhs)
    }

    pub fn negate(operand: SyntaxNode) -> SyntaxNode {
        let text = format!("-{}", operand.text);
        SyntaxNode::new(SyntaxKind::UnaryMinusExpr, text, vec![operand])
    }

    pub fn paren(inner: SyntaxNode) -> SyntaxNode {
        let text = format!("({})", inner.text);
        SyntaxNode::new(SyntaxKind::ParenthesizedExpr, text, vec![inner])
    }

    pub fn number(value: f64) -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::NumberLiteral, value.to_string())
    }

    /// A string literal, delimited with `"` unless the value itself contains one.
    pub fn string(value: &str) -> SyntaxNode {
        let text = if value.contains('"') {
            format!("'{}'", value)
        } else {
            format!("\"{}\"", value)
        };
        SyntaxNode::leaf(SyntaxKind::StringLiteral, text)
    }

    pub fn variable(name: &str) -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::VariableReference, format!("${}", name))
    }

    /// A function call; `name` may be `local` or `prefix:local`.
    pub fn call(name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
        let rendered: Vec<&str> = args.iter().map(|a| a.text.as_str()).collect();
        let text = format!("{}({})", name, rendered.join(", "));
        let mut children = vec![SyntaxNode::leaf(SyntaxKind::FunctionName, name)];
        children.extend(args);
        SyntaxNode::new(SyntaxKind::FunctionCall, text, children)
    }

    fn path_text(leading_slash: bool, parts: &[SyntaxNode]) -> String {
        let mut text = String::new();
        let mut need_slash = leading_slash;
        for part in parts {
            if part.kind == SyntaxKind::DescendantSeparator {
                text.push_str("//");
                need_slash = false;
                continue;
            }
            if need_slash {
                text.push('/');
            }
            text.push_str(&part.text);
            need_slash = true;
        }
        text
    }

    /// An absolute path; `absolute(vec![])` is the bare `/`.
    pub fn absolute(parts: Vec<SyntaxNode>) -> SyntaxNode {
        let mut text = path_text(true, &parts);
        if text.is_empty() {
            text.push('/');
        }
        SyntaxNode::new(SyntaxKind::AbsoluteLocationPath, text, parts)
    }

    pub fn relative(parts: Vec<SyntaxNode>) -> SyntaxNode {
        let text = path_text(false, &parts);
        SyntaxNode::new(SyntaxKind::RelativeLocationPath, text, parts)
    }

    /// `primary[predicates]/steps`, where `primary` is any expression.
    pub fn filter(
        primary: SyntaxNode,
        predicates: Vec<SyntaxNode>,
        steps: Vec<SyntaxNode>,
    ) -> SyntaxNode {
        let mut text = primary.text.clone();
        for predicate in &predicates {
            text.push_str(&predicate.text);
        }
        text.push_str(&path_text(true, &steps));
        let mut children = vec![primary];
        children.extend(predicates);
        children.extend(steps);
        SyntaxNode::new(SyntaxKind::FilterPathExpr, text, children)
    }

    /// A step; `axis` is an axis name, `@`, or `None` for the default child axis.
    pub fn step(axis: Option<&str>, test: SyntaxNode, predicates: Vec<SyntaxNode>) -> SyntaxNode {
        let mut text = match axis {
            Some("@") => "@".to_string(),
            Some(name) => format!("{}::", name),
            None => String::new(),
        };
        text.push_str(&test.text);
        for predicate in &predicates {
            text.push_str(&predicate.text);
        }
        let mut children = Vec::with_capacity(predicates.len() + 2);
        if let Some(name) = axis {
            children.push(SyntaxNode::leaf(SyntaxKind::AxisName, name));
        }
        children.push(test);
        children.extend(predicates);
        SyntaxNode::new(SyntaxKind::Step, text, children)
    }

    /// `child::name`.
    pub fn child(name: &str) -> SyntaxNode {
        step(None, name_test(name), vec![])
    }

    /// `@name`.
    pub fn attr(name: &str) -> SyntaxNode {
        step(Some("@"), name_test(name), vec![])
    }

    /// A name test, prefixed when `name` contains a colon.
    pub fn name_test(name: &str) -> SyntaxNode {
        let kind = if name.contains(':') {
            SyntaxKind::PrefixedNameTest
        } else {
            SyntaxKind::UnprefixedNameTest
        };
        SyntaxNode::leaf(kind, name)
    }

    pub fn wildcard() -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::UnprefixedWildcardTest, "*")
    }

    pub fn prefixed_wildcard(prefix: &str) -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::PrefixedWildcardTest, format!("{}:*", prefix))
    }

    /// `node()`, `text()`, `comment()` or `processing-instruction()`.
    pub fn node_type(name: &str) -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::NodeTypeTest, format!("{}()", name))
    }

    pub fn pi_test(target: &str) -> SyntaxNode {
        let literal = string(target);
        let text = format!("processing-instruction({})", literal.text);
        SyntaxNode::new(SyntaxKind::ProcessingInstructionNameTest, text, vec![literal])
    }

    pub fn predicate(expr: SyntaxNode) -> SyntaxNode {
        let text = format!("[{}]", expr.text);
        SyntaxNode::new(SyntaxKind::Predicate, text, vec![expr])
    }

    /// The `//` separator, standing for `descendant-or-self::node()`.
    pub fn descendant() -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::DescendantSeparator, "//")
    }

    pub fn self_step() -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::AbbreviatedStep, ".")
    }

    pub fn parent_step() -> SyntaxNode {
        SyntaxNode::leaf(SyntaxKind::AbbreviatedStep, "..")
    }
}
