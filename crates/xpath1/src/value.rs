//! The four XPath value kinds, their coercions and the comparison matrix.

use crate::datasource::{XPathNode, sort_document_order};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    NodeSet,
    String,
    Number,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::NodeSet => "node-set",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
        })
    }
}

/// A comparison operator from the equality and relational grammar productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn compare_numbers(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Lte => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Gte => left >= right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "div",
            ArithmeticOp::Modulo => "mod",
        }
    }

    /// IEEE 754 arithmetic; `mod` truncates like the XPath `mod` operator.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            ArithmeticOp::Add => left + right,
            ArithmeticOp::Subtract => left - right,
            ArithmeticOp::Multiply => left * right,
            ArithmeticOp::Divide => left / right,
            ArithmeticOp::Modulo => left % right,
        }
    }
}

/// A de-duplicated collection of nodes.
///
/// The order is the order the producing expression yielded; `sorted` puts it in document
/// order. The string and number projections are computed at most once per instance.
#[derive(Debug, Clone)]
pub struct NodeSet<N> {
    nodes: Vec<N>,
    first: OnceCell<Option<N>>,
    string_value: OnceCell<String>,
    number_value: OnceCell<f64>,
}

impl<N> Default for NodeSet<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            first: OnceCell::new(),
            string_value: OnceCell::new(),
            number_value: OnceCell::new(),
        }
    }
}

impl<N: PartialEq> PartialEq for NodeSet<N> {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl<N: XPathNode> NodeSet<N> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a node-set, dropping repeated nodes while keeping first occurrences in place.
    pub fn new(nodes: Vec<N>) -> Self {
        let mut seen = HashSet::with_capacity(nodes.len());
        let unique = nodes.into_iter().filter(|n| seen.insert(*n)).collect();
        Self::from_unique(unique)
    }

    /// Wraps nodes already known to be distinct.
    pub(crate) fn from_unique(nodes: Vec<N>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, N> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[N] {
        &self.nodes
    }

    pub fn into_vec(self) -> Vec<N> {
        self.nodes
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains(node)
    }

    /// Returns the same nodes in document order.
    pub fn sorted(self) -> Self {
        let mut nodes = self.nodes;
        sort_document_order(&mut nodes);
        Self::from_unique(nodes)
    }

    /// Set union, in document order.
    pub fn union(self, other: NodeSet<N>) -> Self {
        let mut nodes = self.nodes;
        nodes.extend(other.nodes);
        Self::new(nodes).sorted()
    }

    pub fn first_in_document_order(&self) -> Option<N> {
        *self.first.get_or_init(|| {
            self.nodes
                .iter()
                .copied()
                .min_by(|a, b| a.compare_document_order(b))
        })
    }

    /// String-value of the first node in document order, or the empty string.
    pub fn string_value(&self) -> &str {
        self.string_value.get_or_init(|| {
            self.first_in_document_order()
                .map(|n| n.string_value())
                .unwrap_or_default()
        })
    }

    pub fn number_value(&self) -> f64 {
        *self
            .number_value
            .get_or_init(|| parse_number(self.string_value()))
    }
}

impl<N: XPathNode> FromIterator<N> for NodeSet<N> {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'s, N> IntoIterator for &'s NodeSet<N> {
    type Item = &'s N;
    type IntoIter = std::slice::Iter<'s, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    NodeSet(NodeSet<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<N: XPathNode> Value<N> {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::NodeSet(_) => ValueKind::NodeSet,
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn nodes(nodes: Vec<N>) -> Self {
        Value::NodeSet(NodeSet::new(nodes))
    }

    /// Coerces the value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    /// Coerces the value to a number as per XPath 1.0 rules. The empty string is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::NodeSet(nodes) => nodes.number_value(),
            Value::String(s) => parse_number(s),
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_node_set(&self) -> Option<&NodeSet<N>> {
        match self {
            Value::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_node_set(self) -> Option<NodeSet<N>> {
        match self {
            Value::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Compares two values with the XPath 1.0 rules.
    ///
    /// A node-set operand turns the comparison into an existential one: it holds when some
    /// member (taken as its string-value) satisfies it against the other operand. Against a
    /// boolean, a node-set compares by non-emptiness instead.
    pub fn compare(&self, op: CompareOp, other: &Value<N>) -> bool {
        let mut number = |v: &Value<N>| Ok::<_, Infallible>(v.to_number());
        match self.compare_with(op, other, &mut number) {
            Ok(holds) => holds,
            Err(never) => match never {},
        }
    }

    /// Like [`compare`](Self::compare), with `number` converting operands that are compared
    /// as numbers.
    pub fn compare_with<E, F>(
        &self,
        op: CompareOp,
        other: &Value<N>,
        number: &mut F,
    ) -> Result<bool, E>
    where
        F: FnMut(&Value<N>) -> Result<f64, E>,
    {
        match (self, other) {
            (Value::NodeSet(left), Value::Boolean(_)) => {
                compare_scalars(op, &Value::Boolean(!left.is_empty()), other, number)
            }
            (Value::Boolean(_), Value::NodeSet(right)) => {
                compare_scalars(op, self, &Value::Boolean(!right.is_empty()), number)
            }
            (Value::NodeSet(left), _) => {
                for n in left.iter() {
                    if Value::<N>::String(n.string_value()).compare_with(op, other, number)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (_, Value::NodeSet(right)) => {
                for n in right.iter() {
                    if self.compare_with(op, &Value::String(n.string_value()), number)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => compare_scalars(op, self, other, number),
        }
    }
}

fn compare_scalars<N, E, F>(
    op: CompareOp,
    left: &Value<N>,
    right: &Value<N>,
    number: &mut F,
) -> Result<bool, E>
where
    N: XPathNode,
    F: FnMut(&Value<N>) -> Result<f64, E>,
{
    if !op.is_equality() {
        return Ok(op.compare_numbers(number(left)?, number(right)?));
    }
    let equal = match (left, right) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_bool() == right.to_bool(),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            // NaN is unequal to everything, itself included.
            return Ok(op.compare_numbers(number(left)?, number(right)?));
        }
        _ => left.to_string() == right.to_string(),
    };
    Ok(match op {
        CompareOp::Ne => !equal,
        _ => equal,
    })
}

impl<N: XPathNode> fmt::Display for Value<N> {
    /// Coerces the value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NodeSet(nodes) => f.write_str(nodes.string_value()),
            Value::String(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parses text with the XPath `Number` grammar: optional surrounding whitespace, an optional
/// minus sign, and digits with at most one decimal point. Anything else is NaN.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_xml_whitespace);
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut digits = 0;
    let mut dots = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return f64::NAN,
        }
    }
    if digits == 0 || dots > 1 {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Formats a number the way XPath's `string()` does: integers without a fraction, no
/// exponent notation, and the special values spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::mock::{MockNode, create_test_tree};

    type V<'a> = Value<MockNode<'a>>;

    #[test]
    fn test_boolean_coercion() {
        let tree = create_test_tree();
        assert!(!V::nodes(vec![]).to_bool());
        assert!(V::nodes(vec![tree.node(6)]).to_bool());
        assert!(!V::String(String::new()).to_bool());
        assert!(V::String("false".to_string()).to_bool());
        assert!(!V::Number(0.0).to_bool());
        assert!(!V::Number(f64::NAN).to_bool());
        assert!(V::Number(-0.5).to_bool());
    }

    #[test]
    fn test_number_coercion() {
        let tree = create_test_tree();
        assert!(V::String(String::new()).to_number().is_nan());
        assert!(V::String("abc".to_string()).to_number().is_nan());
        assert_eq!(V::String("  42 ".to_string()).to_number(), 42.0);
        assert_eq!(V::Boolean(true).to_number(), 1.0);
        // Empty node-set has an empty string-value.
        assert!(V::nodes(vec![]).to_number().is_nan());
        assert!(V::nodes(vec![tree.node(2)]).to_number().is_nan());
    }

    #[test]
    fn test_parse_number_grammar() {
        assert_eq!(parse_number("-.5"), -0.5);
        assert_eq!(parse_number("5."), 5.0);
        assert_eq!(parse_number("\n12.25\t"), 12.25);
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("Infinity").is_nan());
        assert!(parse_number("1.2.3").is_nan());
        assert!(parse_number("-").is_nan());
        assert!(parse_number(".").is_nan());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-12.75), "-12.75");
        assert_eq!(format_number(1e21), "1000000000000000000000");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_coercion_uses_first_node_in_document_order() {
        let tree = create_test_tree();
        // Yielded out of document order: the second para comes first.
        let nodes = V::nodes(vec![tree.node(8), tree.node(1)]);
        assert_eq!(nodes.to_string(), "Hello");
        assert_eq!(V::nodes(vec![]).to_string(), "");
        assert_eq!(V::Boolean(false).to_string(), "false");
        assert_eq!(V::Number(2.0).to_string(), "2");
    }

    #[test]
    fn test_node_set_deduplicates() {
        let tree = create_test_tree();
        let set = NodeSet::new(vec![tree.node(4), tree.node(1), tree.node(4)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice(), &[tree.node(4), tree.node(1)]);
        let sorted = set.sorted();
        assert_eq!(sorted.as_slice(), &[tree.node(1), tree.node(4)]);
    }

    #[test]
    fn test_union_is_sorted_and_idempotent() {
        let tree = create_test_tree();
        let a = NodeSet::new(vec![tree.node(8), tree.node(1)]);
        let b = NodeSet::new(vec![tree.node(6), tree.node(1)]);
        let ab = a.clone().union(b.clone());
        let ba = b.union(a.clone());
        assert_eq!(ab.as_slice(), &[tree.node(1), tree.node(6), tree.node(8)]);
        assert_eq!(ab, ba);
        assert_eq!(a.clone().union(a).len(), 2);
    }

    #[test]
    fn test_nodeset_scalar_comparison_is_existential() {
        let tree = create_test_tree();
        let paras = V::nodes(vec![tree.node(1), tree.node(8)]);
        assert!(paras.compare(CompareOp::Eq, &V::String("World".to_string())));
        assert!(paras.compare(CompareOp::Ne, &V::String("World".to_string())));
        assert!(!paras.compare(CompareOp::Eq, &V::String("Nope".to_string())));

        let empty = V::nodes(vec![]);
        assert!(!empty.compare(CompareOp::Eq, &V::String("x".to_string())));
        assert!(!empty.compare(CompareOp::Ne, &V::String("x".to_string())));
        assert!(!empty.compare(CompareOp::Lt, &V::Number(1.0)));
    }

    #[test]
    fn test_nodeset_boolean_comparison_uses_existence() {
        let tree = create_test_tree();
        let empty = V::nodes(vec![]);
        let div = V::nodes(vec![tree.node(6)]);
        assert!(empty.compare(CompareOp::Eq, &V::Boolean(false)));
        assert!(div.compare(CompareOp::Eq, &V::Boolean(true)));
        // div has an empty string-value but still exists
        assert!(!div.compare(CompareOp::Eq, &V::Boolean(false)));
        assert!(V::Boolean(true).compare(CompareOp::Ne, &empty));
    }

    #[test]
    fn test_nodeset_nodeset_comparison() {
        let mut b = crate::datasource::mock::MockTreeBuilder::new();
        let root = b.root();
        let x = b.element(root, "x");
        b.text(x, "10");
        let y = b.element(root, "y");
        b.text(y, "9");
        let z = b.element(root, "z");
        b.text(z, "10");
        let tree = b.build();

        let xs = V::nodes(vec![tree.node(x)]);
        let ys = V::nodes(vec![tree.node(y)]);
        let zs = V::nodes(vec![tree.node(z)]);
        assert!(xs.compare(CompareOp::Eq, &zs));
        assert!(!xs.compare(CompareOp::Eq, &ys));
        // Relational comparisons go through numbers, not strings ("10" < "9" as text).
        assert!(ys.compare(CompareOp::Lt, &xs));
        assert!(!xs.compare(CompareOp::Lt, &ys));
    }

    #[test]
    fn test_scalar_comparisons() {
        let nan = V::Number(f64::NAN);
        assert!(!nan.compare(CompareOp::Eq, &nan));
        assert!(nan.compare(CompareOp::Ne, &nan));
        assert!(V::Boolean(true).compare(CompareOp::Eq, &V::String("x".to_string())));
        assert!(V::Number(1.0).compare(CompareOp::Eq, &V::String(" 1 ".to_string())));
        assert!(V::String("abc".to_string()).compare(CompareOp::Eq, &V::String("abc".to_string())));
        assert!(V::String("2".to_string()).compare(CompareOp::Gt, &V::String("10".to_string())) == false);
        assert!(V::Boolean(true).compare(CompareOp::Gt, &V::Boolean(false)));
    }

    #[test]
    fn test_arithmetic_ops() {
        assert_eq!(ArithmeticOp::Modulo.apply(5.0, 2.0), 1.0);
        assert_eq!(ArithmeticOp::Modulo.apply(-5.0, 2.0), -1.0);
        assert!(ArithmeticOp::Modulo.apply(5.0, 0.0).is_nan());
        assert_eq!(ArithmeticOp::Divide.apply(1.0, 0.0), f64::INFINITY);
        assert_eq!(ArithmeticOp::Subtract.apply(1.0, 3.0), -2.0);
    }
}
