// Node adapter over roxmltree, shared by the integration tests.
#![allow(dead_code)]

use roxmltree::Node;
use sprig_xpath1::{NodeType, QName, XPathNode};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A node of a parsed document. roxmltree keeps attributes and namespaces as data on their
/// element, so those are addressed by owner and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    Node(Node<'a, 'input>),
    Attribute { owner: Node<'a, 'input>, index: usize },
    Namespace { owner: Node<'a, 'input>, index: usize },
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn root(doc: &'a roxmltree::Document<'input>) -> Self {
        XmlNode::Node(doc.root())
    }

    /// The first element with the given local name, in document order.
    pub fn find(doc: &'a roxmltree::Document<'input>, name: &str) -> Self {
        let node = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .unwrap_or_else(|| panic!("no <{}> in document", name));
        XmlNode::Node(node)
    }

    fn owner(&self) -> Node<'a, 'input> {
        match *self {
            XmlNode::Node(node) => node,
            XmlNode::Attribute { owner, .. } | XmlNode::Namespace { owner, .. } => owner,
        }
    }

    fn order_key(&self) -> (u8, usize) {
        match *self {
            XmlNode::Node(_) => (0, 0),
            XmlNode::Namespace { index, .. } => (1, index),
            XmlNode::Attribute { index, .. } => (2, index),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.owner().id() == other.owner().id() && self.order_key() == other.order_key()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner().id().hash(state);
        self.order_key().hash(state);
    }
}

impl XPathNode for XmlNode<'_, '_> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Node(node) if node.is_root() => NodeType::Root,
            XmlNode::Node(node) if node.is_element() => NodeType::Element,
            XmlNode::Node(node) if node.is_comment() => NodeType::Comment,
            XmlNode::Node(node) if node.is_pi() => NodeType::ProcessingInstruction,
            XmlNode::Node(_) => NodeType::Text,
            XmlNode::Attribute { .. } => NodeType::Attribute,
            XmlNode::Namespace { .. } => NodeType::Namespace,
        }
    }

    fn name(&self) -> Option<QName<'_>> {
        match *self {
            XmlNode::Node(node) if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    prefix: tag
                        .namespace()
                        .and_then(|uri| node.lookup_prefix(uri))
                        .filter(|p| !p.is_empty()),
                    local_part: tag.name(),
                    namespace_uri: tag.namespace(),
                })
            }
            XmlNode::Node(node) => node.pi().map(|pi| QName::local(pi.target)),
            XmlNode::Attribute { owner, index } => {
                owner.attributes().nth(index).map(|attr| QName {
                    prefix: attr.namespace().and_then(|uri| owner.lookup_prefix(uri)),
                    local_part: attr.name(),
                    namespace_uri: attr.namespace(),
                })
            }
            XmlNode::Namespace { owner, index } => owner
                .namespaces()
                .nth(index)
                .map(|ns| QName::local(ns.name().unwrap_or(""))),
        }
    }

    fn string_value(&self) -> String {
        match *self {
            XmlNode::Node(node) if node.is_element() || node.is_root() => node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            XmlNode::Node(node) if node.is_pi() => node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or_default()
                .to_string(),
            XmlNode::Node(node) => node.text().unwrap_or_default().to_string(),
            XmlNode::Attribute { owner, index } => owner
                .attributes()
                .nth(index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
            XmlNode::Namespace { owner, index } => owner
                .namespaces()
                .nth(index)
                .map(|ns| ns.uri().to_string())
                .unwrap_or_default(),
        }
    }

    fn parent(&self) -> Option<Self> {
        match *self {
            XmlNode::Node(node) => node.parent().map(XmlNode::Node),
            XmlNode::Attribute { owner, .. } | XmlNode::Namespace { owner, .. } => {
                Some(XmlNode::Node(owner))
            }
        }
    }

    fn first_child(&self) -> Option<Self> {
        match *self {
            XmlNode::Node(node) => node.first_child().map(XmlNode::Node),
            _ => None,
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        match *self {
            XmlNode::Node(node) => node.next_sibling().map(XmlNode::Node),
            _ => None,
        }
    }

    fn previous_sibling(&self) -> Option<Self> {
        match *self {
            XmlNode::Node(node) => node.prev_sibling().map(XmlNode::Node),
            _ => None,
        }
    }

    fn attributes(&self) -> Vec<Self> {
        match *self {
            XmlNode::Node(owner) if owner.is_element() => (0..owner.attributes().count())
                .map(|index| XmlNode::Attribute { owner, index })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn namespaces(&self) -> Vec<Self> {
        match *self {
            XmlNode::Node(owner) if owner.is_element() => (0..owner.namespaces().count())
                .map(|index| XmlNode::Namespace { owner, index })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn compare_document_order(&self, other: &Self) -> Ordering {
        let a = (self.owner().id().get(), self.order_key());
        let b = (other.owner().id().get(), other.order_key());
        a.cmp(&b)
    }
}

/// Renders nodes for assertions: elements by name, attributes as `@name`, others by value.
pub fn labels(nodes: &[XmlNode<'_, '_>]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node.node_type() {
            NodeType::Element => node.name().map(|q| q.to_string()).unwrap_or_default(),
            NodeType::Attribute => format!(
                "@{}",
                node.name().map(|q| q.to_string()).unwrap_or_default()
            ),
            NodeType::Root => "/".to_string(),
            _ => node.string_value(),
        })
        .collect()
}

/// The `n` attribute of each node, used by documents that label their elements.
pub fn ids(nodes: &[XmlNode<'_, '_>]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| {
            node.attributes()
                .into_iter()
                .find(|a| a.name().is_some_and(|q| q.local_part == "n"))
                .map(|a| a.string_value())
                .unwrap_or_default()
        })
        .collect()
}
