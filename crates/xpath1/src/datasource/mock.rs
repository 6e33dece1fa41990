//! In-memory tree used by the engine's own tests and available to downstream crates'
//! tests. Nodes are built through [`MockTreeBuilder`] and addressed by their id.
use super::{NodeType, QName, XML_NAMESPACE, XPathNode};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
struct MockName {
    prefix: Option<String>,
    local_part: String,
    namespace_uri: Option<String>,
}

#[derive(Debug, Clone)]
struct MockNodeData {
    node_type: NodeType,
    name: Option<MockName>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<usize>,
    namespaces: Vec<usize>,
}

#[derive(Debug)]
pub struct MockTree {
    nodes: Vec<MockNodeData>,
    /// Position of each node id in document order.
    order: Vec<usize>,
}

impl MockTree {
    pub fn builder() -> MockTreeBuilder {
        MockTreeBuilder::new()
    }

    pub fn root(&self) -> MockNode<'_> {
        self.node(0)
    }

    pub fn node(&self, id: usize) -> MockNode<'_> {
        MockNode { id, tree: self }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: usize) -> &MockNodeData {
        &self.nodes[id]
    }
}

/// A node handle holding a reference to its tree, so it can navigate itself.
#[derive(Debug, Clone, Copy)]
pub struct MockNode<'a> {
    pub id: usize,
    pub tree: &'a MockTree,
}

impl PartialEq for MockNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.tree, other.tree)
    }
}
impl Eq for MockNode<'_> {}

impl Hash for MockNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'a> MockNode<'a> {
    fn sibling_at(&self, offset: isize) -> Option<Self> {
        let data = self.tree.data(self.id);
        if matches!(data.node_type, NodeType::Attribute | NodeType::Namespace) {
            return None;
        }
        let parent = self.tree.data(data.parent?);
        let index = parent.children.iter().position(|&c| c == self.id)?;
        let target = index.checked_add_signed(offset)?;
        parent
            .children
            .get(target)
            .map(|&id| MockNode { id, tree: self.tree })
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.tree.data(self.id);
        match data.node_type {
            NodeType::Text | NodeType::CData => out.push_str(&data.value),
            NodeType::Root | NodeType::Element => {
                for &child in &data.children {
                    self.tree.node(child).collect_text(out);
                }
            }
            _ => {}
        }
    }
}

impl XPathNode for MockNode<'_> {
    fn node_type(&self) -> NodeType {
        self.tree.data(self.id).node_type
    }

    fn name(&self) -> Option<QName<'_>> {
        self.tree.data(self.id).name.as_ref().map(|n| QName {
            prefix: n.prefix.as_deref(),
            local_part: &n.local_part,
            namespace_uri: n.namespace_uri.as_deref(),
        })
    }

    fn string_value(&self) -> String {
        let data = self.tree.data(self.id);
        match data.node_type {
            NodeType::Root | NodeType::Element => {
                let mut out = String::new();
                self.collect_text(&mut out);
                out
            }
            _ => data.value.clone(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.tree.data(self.id).parent.map(|id| MockNode {
            id,
            tree: self.tree,
        })
    }

    fn first_child(&self) -> Option<Self> {
        self.tree
            .data(self.id)
            .children
            .first()
            .map(|&id| MockNode { id, tree: self.tree })
    }

    fn last_child(&self) -> Option<Self> {
        self.tree
            .data(self.id)
            .children
            .last()
            .map(|&id| MockNode { id, tree: self.tree })
    }

    fn next_sibling(&self) -> Option<Self> {
        self.sibling_at(1)
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.sibling_at(-1)
    }

    fn attributes(&self) -> Vec<Self> {
        let tree = self.tree;
        tree.data(self.id)
            .attributes
            .iter()
            .map(|&id| MockNode { id, tree })
            .collect()
    }

    fn namespaces(&self) -> Vec<Self> {
        let tree = self.tree;
        tree.data(self.id)
            .namespaces
            .iter()
            .map(|&id| MockNode { id, tree })
            .collect()
    }

    fn compare_document_order(&self, other: &Self) -> Ordering {
        self.tree.order[self.id].cmp(&self.tree.order[other.id])
    }
}

/// Incrementally builds a [`MockTree`]. Node `0` is always the document node.
#[derive(Debug)]
pub struct MockTreeBuilder {
    nodes: Vec<MockNodeData>,
}

impl Default for MockTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![MockNodeData {
                node_type: NodeType::Root,
                name: None,
                value: String::new(),
                parent: None,
                children: vec![],
                attributes: vec![],
                namespaces: vec![],
            }],
        }
    }

    pub fn root(&self) -> usize {
        0
    }

    fn push(&mut self, node_type: NodeType, name: Option<MockName>, value: &str, parent: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(MockNodeData {
            node_type,
            name,
            value: value.to_string(),
            parent: Some(parent),
            children: vec![],
            attributes: vec![],
            namespaces: vec![],
        });
        id
    }

    fn split_name(name: &str, namespace_uri: Option<&str>) -> MockName {
        let (prefix, local_part) = match name.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
            None => (None, name.to_string()),
        };
        let namespace_uri = match (namespace_uri, prefix.as_deref()) {
            (Some(uri), _) => Some(uri.to_string()),
            (None, Some("xml")) => Some(XML_NAMESPACE.to_string()),
            (None, _) => None,
        };
        MockName {
            prefix,
            local_part,
            namespace_uri,
        }
    }

    /// Appends an element in no namespace (or the `xml` namespace for `xml:` names).
    pub fn element(&mut self, parent: usize, name: &str) -> usize {
        self.element_ns(parent, name, None)
    }

    pub fn element_ns(&mut self, parent: usize, name: &str, namespace_uri: Option<&str>) -> usize {
        let name = Self::split_name(name, namespace_uri);
        let id = self.push(NodeType::Element, Some(name), "", parent);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn attribute(&mut self, owner: usize, name: &str, value: &str) -> usize {
        self.attribute_ns(owner, name, None, value)
    }

    pub fn attribute_ns(
        &mut self,
        owner: usize,
        name: &str,
        namespace_uri: Option<&str>,
        value: &str,
    ) -> usize {
        let name = Self::split_name(name, namespace_uri);
        let id = self.push(NodeType::Attribute, Some(name), value, owner);
        self.nodes[owner].attributes.push(id);
        id
    }

    /// Declares a namespace node on `owner`; an empty prefix declares the default namespace.
    pub fn namespace(&mut self, owner: usize, prefix: &str, uri: &str) -> usize {
        let name = MockName {
            prefix: None,
            local_part: prefix.to_string(),
            namespace_uri: None,
        };
        let id = self.push(NodeType::Namespace, Some(name), uri, owner);
        self.nodes[owner].namespaces.push(id);
        id
    }

    pub fn text(&mut self, parent: usize, value: &str) -> usize {
        self.leaf(NodeType::Text, None, value, parent)
    }

    pub fn cdata(&mut self, parent: usize, value: &str) -> usize {
        self.leaf(NodeType::CData, None, value, parent)
    }

    pub fn comment(&mut self, parent: usize, value: &str) -> usize {
        self.leaf(NodeType::Comment, None, value, parent)
    }

    pub fn processing_instruction(&mut self, parent: usize, target: &str, value: &str) -> usize {
        let name = Self::split_name(target, None);
        self.leaf(NodeType::ProcessingInstruction, Some(name), value, parent)
    }

    fn leaf(&mut self, node_type: NodeType, name: Option<MockName>, value: &str, parent: usize) -> usize {
        let id = self.push(node_type, name, value, parent);
        self.nodes[parent].children.push(id);
        id
    }

    /// Freezes the tree and computes document order: a node, then its namespace nodes,
    /// then its attributes, then its children.
    pub fn build(self) -> MockTree {
        let mut order = vec![0; self.nodes.len()];
        let mut next = 0;
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            order[id] = next;
            next += 1;
            let data = &self.nodes[id];
            for &ns in &data.namespaces {
                order[ns] = next;
                next += 1;
            }
            for &attr in &data.attributes {
                order[attr] = next;
                next += 1;
            }
            stack.extend(data.children.iter().rev());
        }
        MockTree {
            nodes: self.nodes,
            order,
        }
    }
}

/// Creates the shared fixture tree. Ids follow document order:
///
/// ```text
/// <root>                                   0
///   <para id="p1" xml:lang="en">Hello</para>  1, @id 2, @xml:lang 3, text 4
///   <!-- comment node -->                  5
///   <div></div>                            6
///   <?pi-target pi-value?>                 7
///   <para>World</para>                     8, text 9
/// </root>
/// ```
pub fn create_test_tree() -> MockTree {
    let mut b = MockTreeBuilder::new();
    let root = b.root();
    let para = b.element(root, "para");
    b.attribute(para, "id", "p1");
    b.attribute(para, "xml:lang", "en");
    b.text(para, "Hello");
    b.comment(root, " comment node ");
    b.element(root, "div");
    b.processing_instruction(root, "pi-target", "pi-value");
    let para2 = b.element(root, "para");
    b.text(para2, "World");
    b.build()
}
