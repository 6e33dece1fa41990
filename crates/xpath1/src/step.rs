//! The step model: axis, node test and predicates, built once per expression tree.

use crate::datasource::{NodeType, XPathNode};
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::namespace::NamespaceResolver;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub const ALL: [Axis; 13] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
        }
    }

    /// Reverse axes number their nodes from the context node backwards.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// The node kind a name test or `*` selects on this axis.
    pub fn principal_node_type(self) -> NodeType {
        match self {
            Axis::Attribute => NodeType::Attribute,
            Axis::Namespace => NodeType::Namespace,
            _ => NodeType::Element,
        }
    }

    /// Axes whose step results are put back into document order.
    ///
    /// Ancestor axes keep proximity order; only the sibling and full preceding axes are
    /// normalised.
    pub(crate) fn sorts_results(self) -> bool {
        matches!(self, Axis::Preceding | Axis::PrecedingSibling)
    }
}

impl FromStr for Axis {
    type Err = XPathError;

    /// Parses an axis name; `@` is the abbreviation of `attribute`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "@" {
            return Ok(Axis::Attribute);
        }
        Axis::ALL
            .into_iter()
            .find(|axis| axis.name() == s)
            .ok_or_else(|| XPathError::UnknownAxis(s.to_string()))
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTypeTest {
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTest {
    /// `node()`, `text()`, `comment()`, `processing-instruction()`.
    NodeType(NodeTypeTest),
    /// `processing-instruction('target')`.
    ProcessingInstruction(String),
    /// `name`
    Name(String),
    /// `prefix:name`
    QualifiedName { prefix: String, local: String },
    /// `*`
    Wildcard,
    /// `prefix:*`
    NamespaceWildcard(String),
}

impl NodeTest {
    /// Resolves the prefixes of the test against `resolver` for one evaluation of a step.
    pub(crate) fn matcher(
        &self,
        axis: Axis,
        resolver: &dyn NamespaceResolver,
    ) -> Result<NodeMatcher<'_>, XPathError> {
        let principal = axis.principal_node_type();
        let resolve = |prefix: &str| {
            resolver
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| XPathError::UnresolvedPrefix(prefix.to_string()))
        };
        let namespace = match self {
            NodeTest::Name(_) if principal == NodeType::Element => resolver.lookup_namespace_uri(None),
            NodeTest::QualifiedName { prefix, .. } | NodeTest::NamespaceWildcard(prefix) => {
                Some(resolve(prefix)?)
            }
            NodeTest::Name(_)
            | NodeTest::NodeType(_)
            | NodeTest::ProcessingInstruction(_)
            | NodeTest::Wildcard => None,
        };
        Ok(NodeMatcher {
            test: self,
            principal,
            namespace,
        })
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::NodeType(NodeTypeTest::Node) => f.write_str("node()"),
            NodeTest::NodeType(NodeTypeTest::Text) => f.write_str("text()"),
            NodeTest::NodeType(NodeTypeTest::Comment) => f.write_str("comment()"),
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction) => {
                f.write_str("processing-instruction()")
            }
            NodeTest::ProcessingInstruction(target) => {
                write!(f, "processing-instruction('{}')", target)
            }
            NodeTest::Name(name) => f.write_str(name),
            NodeTest::QualifiedName { prefix, local } => write!(f, "{}:{}", prefix, local),
            NodeTest::Wildcard => f.write_str("*"),
            NodeTest::NamespaceWildcard(prefix) => write!(f, "{}:*", prefix),
        }
    }
}

/// A node test with its namespace already resolved.
#[derive(Debug)]
pub(crate) struct NodeMatcher<'s> {
    test: &'s NodeTest,
    principal: NodeType,
    namespace: Option<String>,
}

impl NodeMatcher<'_> {
    pub(crate) fn matches<N: XPathNode>(&self, node: &N) -> bool {
        match self.test {
            NodeTest::NodeType(NodeTypeTest::Node) => true,
            NodeTest::NodeType(NodeTypeTest::Text) => node.is_text(),
            NodeTest::NodeType(NodeTypeTest::Comment) => node.is_comment(),
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction) => {
                node.is_processing_instruction()
            }
            NodeTest::ProcessingInstruction(target) => {
                node.is_processing_instruction()
                    && node.name().is_some_and(|q| q.local_part == target.as_str())
            }
            NodeTest::Wildcard => node.node_type() == self.principal,
            NodeTest::NamespaceWildcard(_) => {
                node.node_type() == self.principal
                    && node
                        .name()
                        .is_some_and(|q| q.namespace_uri == self.namespace.as_deref())
            }
            NodeTest::Name(local) | NodeTest::QualifiedName { local, .. } => {
                node.node_type() == self.principal
                    && node.name().is_some_and(|q| {
                        q.local_part == local.as_str() && q.namespace_uri == self.namespace.as_deref()
                    })
            }
        }
    }
}

/// One location step: `axis::test[predicate]...`.
#[derive(Debug)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<ExprEvaluator>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicates(mut self, predicates: Vec<ExprEvaluator>) -> Self {
        self.predicates = predicates;
        self
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis, self.test)?;
        if !self.predicates.is_empty() {
            write!(f, "[{} predicate(s)]", self.predicates.len())?;
        }
        Ok(())
    }
}
