//! Namespace prefix resolution, supplied per evaluation.
use crate::datasource::{XML_NAMESPACE, XPathNode};
use std::collections::HashMap;

/// Resolves a namespace prefix to a URI.
///
/// `None` asks for the namespace applied to unprefixed element name tests. Returning `None`
/// for it keeps XPath 1.0 behaviour (unprefixed names match the null namespace).
pub trait NamespaceResolver {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String>;
}

/// Resolves only the reserved `xml` prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamespaces;

impl NamespaceResolver for NoNamespaces {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some("xml") => Some(XML_NAMESPACE.to_string()),
            _ => None,
        }
    }
}

/// A fixed set of prefix bindings, typically taken from the host document's root or from
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticNamespaces {
    default_namespace: Option<String>,
    bindings: HashMap<String, String>,
}

impl StaticNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: &str, uri: &str) -> Self {
        self.bindings.insert(prefix.to_string(), uri.to_string());
        self
    }

    /// Sets the namespace unprefixed element name tests are matched against.
    pub fn with_default(mut self, uri: &str) -> Self {
        self.default_namespace = Some(uri.to_string());
        self
    }
}

impl NamespaceResolver for StaticNamespaces {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        match prefix {
            None => self.default_namespace.clone(),
            Some(p) => self
                .bindings
                .get(p)
                .cloned()
                .or_else(|| NoNamespaces.lookup_namespace_uri(Some(p))),
        }
    }
}

/// Resolves prefixes through the namespace nodes in scope on a node.
#[derive(Debug, Clone, Copy)]
pub struct NodeNamespaceResolver<N> {
    node: N,
}

impl<N: XPathNode> NodeNamespaceResolver<N> {
    /// Attribute, namespace and text nodes resolve through their nearest element.
    pub fn new(node: N) -> Self {
        let mut scope = node;
        while !scope.is_element() {
            match scope.parent() {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        Self { node: scope }
    }
}

impl<N: XPathNode> NamespaceResolver for NodeNamespaceResolver<N> {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        let prefix = prefix?;
        if prefix == "xml" {
            return Some(XML_NAMESPACE.to_string());
        }
        self.node
            .namespaces()
            .into_iter()
            .find(|ns| ns.name().is_some_and(|q| q.local_part == prefix))
            .map(|ns| ns.string_value())
    }
}
