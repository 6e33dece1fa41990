//! The expression evaluator tree and its compiler from [`SyntaxNode`]s.
//!
//! A tree is compiled once per distinct expression and holds no evaluation state, so one
//! compiled tree can be evaluated any number of times, against any context.

use crate::context::EvaluationContext;
use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::functions::QualifiedName;
use crate::location_path::{LocationPath, PathStart};
use crate::step::{Axis, NodeTest, NodeTypeTest, Step};
use crate::syntax::{SyntaxKind, SyntaxNode};
use crate::value::{ArithmeticOp, CompareOp, NodeSet, Value, parse_number};

#[derive(Debug)]
pub enum ExprEvaluator {
    Or(Box<ExprEvaluator>, Box<ExprEvaluator>),
    And(Box<ExprEvaluator>, Box<ExprEvaluator>),
    Compare(CompareOp, Box<ExprEvaluator>, Box<ExprEvaluator>),
    Arithmetic(ArithmeticOp, Box<ExprEvaluator>, Box<ExprEvaluator>),
    Negate(Box<ExprEvaluator>),
    Union(Box<ExprEvaluator>, Box<ExprEvaluator>),
    FunctionCall {
        name: QualifiedName,
        args: Vec<ExprEvaluator>,
    },
    Number(f64),
    String(String),
    /// A variable reference, by `name` or `prefix:name`.
    Variable(String),
    Path(LocationPath),
}

impl ExprEvaluator {
    /// Compiles a syntax tree.
    pub fn compile(node: &SyntaxNode) -> Result<Self, XPathError> {
        use ExprEvaluator as E;
        let expr = match node.kind() {
            SyntaxKind::OrExpr => {
                let (l, r) = operands(node)?;
                E::Or(l, r)
            }
            SyntaxKind::AndExpr => {
                let (l, r) = operands(node)?;
                E::And(l, r)
            }
            SyntaxKind::EqExpr => compare(node, CompareOp::Eq)?,
            SyntaxKind::NeExpr => compare(node, CompareOp::Ne)?,
            SyntaxKind::LtExpr => compare(node, CompareOp::Lt)?,
            SyntaxKind::LteExpr => compare(node, CompareOp::Lte)?,
            SyntaxKind::GtExpr => compare(node, CompareOp::Gt)?,
            SyntaxKind::GteExpr => compare(node, CompareOp::Gte)?,
            SyntaxKind::AddExpr => arithmetic(node, ArithmeticOp::Add)?,
            SyntaxKind::SubtractExpr => arithmetic(node, ArithmeticOp::Subtract)?,
            SyntaxKind::MultiplyExpr => arithmetic(node, ArithmeticOp::Multiply)?,
            SyntaxKind::DivideExpr => arithmetic(node, ArithmeticOp::Divide)?,
            SyntaxKind::ModuloExpr => arithmetic(node, ArithmeticOp::Modulo)?,
            SyntaxKind::UnaryMinusExpr => E::Negate(Box::new(Self::compile(only_child(node)?)?)),
            SyntaxKind::UnionExpr => {
                let (l, r) = operands(node)?;
                E::Union(l, r)
            }
            SyntaxKind::ParenthesizedExpr => Self::compile(only_child(node)?)?,
            SyntaxKind::FunctionCall => {
                let (name, args) = node
                    .children()
                    .split_first()
                    .ok_or_else(|| malformed(node, "missing function name"))?;
                if name.kind() != SyntaxKind::FunctionName {
                    return Err(malformed(name, "expected a function name"));
                }
                E::FunctionCall {
                    name: QualifiedName::parse(name.text().trim()),
                    args: args.iter().map(Self::compile).collect::<Result<_, _>>()?,
                }
            }
            SyntaxKind::VariableReference => {
                let text = node.text().trim();
                let name = text.strip_prefix('$').unwrap_or(text).trim();
                if name.is_empty() {
                    return Err(malformed(node, "empty variable name"));
                }
                E::Variable(name.to_string())
            }
            SyntaxKind::NumberLiteral => {
                let n = parse_number(node.text());
                if n.is_nan() {
                    return Err(malformed(node, "not a number literal"));
                }
                E::Number(n)
            }
            SyntaxKind::StringLiteral => E::String(string_literal(node)?),
            SyntaxKind::AbsoluteLocationPath => {
                E::Path(LocationPath::new(PathStart::Root, steps(node.children())?))
            }
            SyntaxKind::RelativeLocationPath => {
                if node.children().is_empty() {
                    return Err(malformed(node, "relative path without steps"));
                }
                E::Path(LocationPath::new(PathStart::Context, steps(node.children())?))
            }
            SyntaxKind::FilterPathExpr => filter_path(node)?,
            SyntaxKind::FunctionName
            | SyntaxKind::Step
            | SyntaxKind::AxisName
            | SyntaxKind::AbbreviatedStep
            | SyntaxKind::DescendantSeparator
            | SyntaxKind::Predicate
            | SyntaxKind::NodeTypeTest
            | SyntaxKind::ProcessingInstructionNameTest
            | SyntaxKind::UnprefixedNameTest
            | SyntaxKind::PrefixedNameTest
            | SyntaxKind::UnprefixedWildcardTest
            | SyntaxKind::PrefixedWildcardTest => {
                return Err(malformed(node, "not an expression"));
            }
        };
        Ok(expr)
    }

    pub fn evaluate<'c, N: XPathNode>(
        &'c self,
        ctx: &EvaluationContext<'c, N>,
    ) -> Result<Value<N>, XPathError> {
        match self {
            ExprEvaluator::Or(l, r) => Ok(Value::Boolean(
                l.evaluate_bool(ctx)? || r.evaluate_bool(ctx)?,
            )),
            ExprEvaluator::And(l, r) => Ok(Value::Boolean(
                l.evaluate_bool(ctx)? && r.evaluate_bool(ctx)?,
            )),
            ExprEvaluator::Compare(op, l, r) => {
                let left = l.evaluate(ctx)?;
                let right = r.evaluate(ctx)?;
                let mut number = |v: &Value<N>| ctx.number_of(v);
                Ok(Value::Boolean(left.compare_with(*op, &right, &mut number)?))
            }
            ExprEvaluator::Arithmetic(op, l, r) => {
                let left = ctx.number_of(&l.evaluate(ctx)?)?;
                if left.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                let right = ctx.number_of(&r.evaluate(ctx)?)?;
                Ok(Value::Number(op.apply(left, right)))
            }
            ExprEvaluator::Negate(operand) => {
                Ok(Value::Number(-ctx.number_of(&operand.evaluate(ctx)?)?))
            }
            ExprEvaluator::Union(l, r) => {
                let left = union_operand(l.evaluate(ctx)?)?;
                let right = union_operand(r.evaluate(ctx)?)?;
                Ok(Value::NodeSet(left.union(right)))
            }
            ExprEvaluator::FunctionCall { name, args } => {
                let function = match ctx.env.functions.get_implementation(name, ctx) {
                    Some(function) => function,
                    None => return Err(unresolved_function(name, ctx)),
                };
                function(ctx, args)
            }
            ExprEvaluator::Number(n) => Ok(Value::Number(*n)),
            ExprEvaluator::String(s) => Ok(Value::String(s.clone())),
            ExprEvaluator::Variable(name) => match ctx.variable(name) {
                Some(value) => Ok(value.clone()),
                None if ctx.env.options.strict_variables => {
                    Err(XPathError::UnknownVariable(name.clone()))
                }
                None => Ok(Value::String(String::new())),
            },
            ExprEvaluator::Path(path) => Ok(Value::NodeSet(path.evaluate(ctx)?)),
        }
    }

    /// Evaluates in a boolean context. Location paths only look for their first node.
    pub fn evaluate_bool<'c, N: XPathNode>(
        &'c self,
        ctx: &EvaluationContext<'c, N>,
    ) -> Result<bool, XPathError> {
        match self {
            ExprEvaluator::Path(path) => path.exists(ctx),
            _ => Ok(self.evaluate(ctx)?.to_bool()),
        }
    }
}

fn union_operand<N: XPathNode>(value: Value<N>) -> Result<NodeSet<N>, XPathError> {
    match value {
        Value::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::InvalidOperand {
            operator: "|",
            found: other.kind(),
        }),
    }
}

fn unresolved_function<N: XPathNode>(
    name: &QualifiedName,
    ctx: &EvaluationContext<'_, N>,
) -> XPathError {
    match &name.prefix {
        Some(prefix) if ctx.env.resolver.lookup_namespace_uri(Some(prefix)).is_none() => {
            XPathError::UnresolvedPrefix(prefix.clone())
        }
        _ => XPathError::UnknownFunction(name.to_string()),
    }
}

// --- Compilation helpers ---

fn malformed(node: &SyntaxNode, message: &str) -> XPathError {
    XPathError::MalformedSyntax {
        kind: node.kind(),
        text: node.text().to_string(),
        message: message.to_string(),
    }
}

fn only_child(node: &SyntaxNode) -> Result<&SyntaxNode, XPathError> {
    match node.children() {
        [child] => Ok(child),
        children => Err(malformed(
            node,
            &format!("expected 1 operand, found {}", children.len()),
        )),
    }
}

type Operands = (Box<ExprEvaluator>, Box<ExprEvaluator>);

fn operands(node: &SyntaxNode) -> Result<Operands, XPathError> {
    match node.children() {
        [lhs, rhs] => Ok((
            Box::new(ExprEvaluator::compile(lhs)?),
            Box::new(ExprEvaluator::compile(rhs)?),
        )),
        children => Err(malformed(
            node,
            &format!("expected 2 operands, found {}", children.len()),
        )),
    }
}

fn compare(node: &SyntaxNode, op: CompareOp) -> Result<ExprEvaluator, XPathError> {
    let (l, r) = operands(node)?;
    Ok(ExprEvaluator::Compare(op, l, r))
}

fn arithmetic(node: &SyntaxNode, op: ArithmeticOp) -> Result<ExprEvaluator, XPathError> {
    let (l, r) = operands(node)?;
    Ok(ExprEvaluator::Arithmetic(op, l, r))
}

/// The body of a quoted literal, verbatim.
fn string_literal(node: &SyntaxNode) -> Result<String, XPathError> {
    let text = node.text().trim();
    let quote = text
        .chars()
        .next()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| malformed(node, "unquoted string literal"))?;
    text[1..]
        .strip_suffix(quote)
        .map(str::to_string)
        .ok_or_else(|| malformed(node, "unterminated string literal"))
}

fn filter_path(node: &SyntaxNode) -> Result<ExprEvaluator, XPathError> {
    let (primary, rest) = node
        .children()
        .split_first()
        .ok_or_else(|| malformed(node, "missing filter expression"))?;
    let split = rest
        .iter()
        .position(|part| part.kind() != SyntaxKind::Predicate)
        .unwrap_or(rest.len());
    let (predicates, path) = rest.split_at(split);
    if predicates.is_empty() && path.is_empty() {
        return ExprEvaluator::compile(primary);
    }
    let start = PathStart::Filter {
        expr: Box::new(ExprEvaluator::compile(primary)?),
        predicates: predicates.iter().map(predicate).collect::<Result<_, _>>()?,
    };
    Ok(ExprEvaluator::Path(LocationPath::new(start, steps(path)?)))
}

fn steps(parts: &[SyntaxNode]) -> Result<Vec<Step>, XPathError> {
    parts
        .iter()
        .map(|part| match part.kind() {
            SyntaxKind::Step => step(part),
            SyntaxKind::AbbreviatedStep => match part.text().trim() {
                "." => Ok(Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node))),
                ".." => Ok(Step::new(Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node))),
                _ => Err(malformed(part, "expected '.' or '..'")),
            },
            SyntaxKind::DescendantSeparator => Ok(Step::new(
                Axis::DescendantOrSelf,
                NodeTest::NodeType(NodeTypeTest::Node),
            )),
            _ => Err(malformed(part, "expected a location step")),
        })
        .collect()
}

fn step(node: &SyntaxNode) -> Result<Step, XPathError> {
    let (axis, rest) = match node.children().split_first() {
        Some((first, rest)) if first.kind() == SyntaxKind::AxisName => {
            (first.text().trim().parse::<Axis>()?, rest)
        }
        _ => (Axis::Child, node.children()),
    };
    let (test, predicates) = rest
        .split_first()
        .ok_or_else(|| malformed(node, "step without a node test"))?;
    let predicates = predicates
        .iter()
        .map(predicate)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Step::new(axis, node_test(test)?).with_predicates(predicates))
}

fn predicate(node: &SyntaxNode) -> Result<ExprEvaluator, XPathError> {
    if node.kind() != SyntaxKind::Predicate {
        return Err(malformed(node, "expected a predicate"));
    }
    ExprEvaluator::compile(only_child(node)?)
}

fn node_test(node: &SyntaxNode) -> Result<NodeTest, XPathError> {
    let text = node.text().trim();
    match node.kind() {
        SyntaxKind::NodeTypeTest => {
            let name = text.split('(').next().unwrap_or_default().trim();
            let test = match name {
                "node" => NodeTypeTest::Node,
                "text" => NodeTypeTest::Text,
                "comment" => NodeTypeTest::Comment,
                "processing-instruction" => NodeTypeTest::ProcessingInstruction,
                _ => return Err(malformed(node, "unknown node type")),
            };
            Ok(NodeTest::NodeType(test))
        }
        SyntaxKind::ProcessingInstructionNameTest => {
            let literal = only_child(node)?;
            Ok(NodeTest::ProcessingInstruction(string_literal(literal)?))
        }
        SyntaxKind::UnprefixedNameTest => Ok(NodeTest::Name(text.to_string())),
        SyntaxKind::PrefixedNameTest => match text.split_once(':') {
            Some((prefix, local)) => Ok(NodeTest::QualifiedName {
                prefix: prefix.to_string(),
                local: local.to_string(),
            }),
            None => Err(malformed(node, "missing prefix")),
        },
        SyntaxKind::UnprefixedWildcardTest => Ok(NodeTest::Wildcard),
        SyntaxKind::PrefixedWildcardTest => match text.strip_suffix(":*") {
            Some(prefix) => Ok(NodeTest::NamespaceWildcard(prefix.to_string())),
            None => Err(malformed(node, "expected 'prefix:*'")),
        },
        _ => Err(malformed(node, "expected a node test")),
    }
}
