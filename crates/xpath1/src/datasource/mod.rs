//! Defines the node adapter contract: the read-only tree primitives the engine is written against.
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

pub mod mock;

/// The namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified name as exposed by an adapter node.
///
/// For namespace nodes the `local_part` is the declared prefix (empty for the default
/// namespace); for processing instructions it is the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'n> {
    pub prefix: Option<&'n str>,
    pub local_part: &'n str,
    pub namespace_uri: Option<&'n str>,
}

impl<'n> QName<'n> {
    pub fn local(local_part: &'n str) -> Self {
        Self {
            prefix: None,
            local_part,
            namespace_uri: None,
        }
    }
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) if !prefix.is_empty() => write!(f, "{}:{}", prefix, self.local_part),
            _ => f.write_str(self.local_part),
        }
    }
}

/// The kind of a node, aligned with the XPath 1.0 data model.
/// `CData` sections are treated as text by every node test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Namespace,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// The universal contract for a node in a read-only tree.
///
/// The engine never mutates nodes and never holds on to them past an evaluation. Nodes are
/// compared by identity (`Eq`/`Hash`), so a handle must identify exactly one node of the
/// tree. Navigation is expressed with sibling/parent pointers so that every axis can be
/// walked lazily without materialising child lists.
pub trait XPathNode: fmt::Debug + Clone + Copy + PartialEq + Eq + Hash {
    fn node_type(&self) -> NodeType;

    /// The name of an element, attribute, namespace node or processing instruction.
    /// `None` for the document, text and comment nodes.
    fn name(&self) -> Option<QName<'_>>;

    /// The XPath string-value of the node.
    fn string_value(&self) -> String;

    /// The structural parent; for attribute and namespace nodes, the owner element.
    fn parent(&self) -> Option<Self>;

    fn first_child(&self) -> Option<Self>;

    fn next_sibling(&self) -> Option<Self>;

    fn previous_sibling(&self) -> Option<Self>;

    fn last_child(&self) -> Option<Self> {
        let mut last = self.first_child()?;
        while let Some(next) = last.next_sibling() {
            last = next;
        }
        Some(last)
    }

    /// Attribute nodes of an element, in adapter order. Empty for other node kinds.
    fn attributes(&self) -> Vec<Self>;

    /// Namespace nodes in scope on an element. Adapters without namespace support keep the
    /// default.
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    /// The owning document (the topmost ancestor).
    fn document(&self) -> Self {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Compares two nodes in document order.
    ///
    /// The default walks both ancestries; adapters that can offer a cheaper total order
    /// (for example a pre-order index) should override it.
    fn compare_document_order(&self, other: &Self) -> Ordering {
        compare_by_ancestry(self, other)
    }

    fn children(&self) -> Children<Self> {
        Children {
            next: self.first_child(),
        }
    }

    fn is_document(&self) -> bool {
        self.node_type() == NodeType::Root
    }

    fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    fn is_attribute(&self) -> bool {
        self.node_type() == NodeType::Attribute
    }

    fn is_namespace(&self) -> bool {
        self.node_type() == NodeType::Namespace
    }

    fn is_text(&self) -> bool {
        matches!(self.node_type(), NodeType::Text | NodeType::CData)
    }

    fn is_cdata(&self) -> bool {
        self.node_type() == NodeType::CData
    }

    fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    fn is_processing_instruction(&self) -> bool {
        self.node_type() == NodeType::ProcessingInstruction
    }
}

/// Iterator over the children of a node, driven by `first_child`/`next_sibling`.
#[derive(Debug, Clone)]
pub struct Children<N> {
    next: Option<N>,
}

impl<N: XPathNode> Iterator for Children<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next?;
        self.next = current.next_sibling();
        Some(current)
    }
}

/// Sorts nodes into document order using the adapter's comparator.
pub fn sort_document_order<N: XPathNode>(nodes: &mut [N]) {
    nodes.sort_by(|a, b| a.compare_document_order(b));
}

/// Document order derived from ancestry and sibling position.
///
/// - An ancestor precedes its descendants.
/// - Below a common parent, namespace nodes come first, then attributes, then children.
/// - Nodes from different trees cannot be ordered and compare as `Equal`.
pub fn compare_by_ancestry<N: XPathNode>(a: &N, b: &N) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let path_a = path_from_root(*a);
    let path_b = path_from_root(*b);
    let common = path_a
        .iter()
        .zip(path_b.iter())
        .take_while(|(x, y)| x == y)
        .count();

    if common == 0 {
        return Ordering::Equal;
    }
    if common == path_a.len() {
        return Ordering::Less;
    }
    if common == path_b.len() {
        return Ordering::Greater;
    }

    let left = path_a[common];
    let right = path_b[common];
    let rank = |n: &N| match n.node_type() {
        NodeType::Namespace => 0,
        NodeType::Attribute => 1,
        _ => 2,
    };
    match rank(&left).cmp(&rank(&right)) {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    let parent = path_a[common - 1];
    match rank(&left) {
        0 => position_in(&parent.namespaces(), &left, &right),
        1 => position_in(&parent.attributes(), &left, &right),
        _ => {
            let mut cursor = left.next_sibling();
            while let Some(sibling) = cursor {
                if sibling == right {
                    return Ordering::Less;
                }
                cursor = sibling.next_sibling();
            }
            Ordering::Greater
        }
    }
}

fn path_from_root<N: XPathNode>(node: N) -> Vec<N> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(parent) = current.parent() {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

fn position_in<N: XPathNode>(siblings: &[N], left: &N, right: &N) -> Ordering {
    let left_pos = siblings.iter().position(|n| n == left);
    let right_pos = siblings.iter().position(|n| n == right);
    left_pos.cmp(&right_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::mock::create_test_tree;

    #[test]
    fn test_children_iterator_follows_sibling_links() {
        let tree = create_test_tree();
        let ids: Vec<usize> = tree.node(0).children().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 5, 6, 7, 8]);
        assert_eq!(tree.node(0).last_child().map(|n| n.id), Some(8));
    }

    #[test]
    fn test_document_of_attribute_is_root() {
        let tree = create_test_tree();
        assert_eq!(tree.node(3).document(), tree.node(0));
    }

    #[test]
    fn test_compare_by_ancestry_orders_like_preorder() {
        let tree = create_test_tree();
        let all: Vec<_> = (0..tree.len()).map(|id| tree.node(id)).collect();
        for a in &all {
            for b in &all {
                assert_eq!(
                    compare_by_ancestry(a, b),
                    a.id.cmp(&b.id),
                    "ordering {} vs {}",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn test_sort_document_order() {
        let tree = create_test_tree();
        let mut nodes = vec![tree.node(9), tree.node(2), tree.node(0), tree.node(6)];
        sort_document_order(&mut nodes);
        let ids: Vec<usize> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 2, 6, 9]);
    }

    #[test]
    fn test_qname_display() {
        let name = QName {
            prefix: Some("xml"),
            local_part: "lang",
            namespace_uri: Some(XML_NAMESPACE),
        };
        assert_eq!(name.to_string(), "xml:lang");
        assert_eq!(QName::local("para").to_string(), "para");
    }
}
