//! Lazy node streams for each of the thirteen XPath axes.
//!
//! Every walk is built from the adapter's parent/child/sibling pointers only. Reverse axes
//! yield in proximity order (nearest node first), which is what predicate positions count.

use crate::datasource::{Children, XPathNode};
use crate::step::Axis;
use std::collections::HashSet;

/// Walks `axis` from `node`. `root` bounds the `following` and `preceding` axes: they never
/// step outside the subtree rooted there.
pub fn walk<N: XPathNode>(axis: Axis, node: N, root: N) -> AxisIter<N> {
    match axis {
        Axis::SelfAxis => AxisIter::Single(Some(node)),
        Axis::Child => AxisIter::Children(node.children()),
        Axis::Parent => AxisIter::Single(node.parent()),
        Axis::Attribute => AxisIter::List(node.attributes().into_iter()),
        Axis::Namespace => AxisIter::List(node.namespaces().into_iter()),
        Axis::Descendant => AxisIter::Descendants(Descendants::new(node, false)),
        Axis::DescendantOrSelf => AxisIter::Descendants(Descendants::new(node, true)),
        Axis::Ancestor => AxisIter::Ancestors(Ancestors {
            next: node.parent(),
        }),
        Axis::AncestorOrSelf => AxisIter::Ancestors(Ancestors { next: Some(node) }),
        Axis::FollowingSibling => AxisIter::Siblings(Siblings::new(node, true)),
        Axis::PrecedingSibling => AxisIter::Siblings(Siblings::new(node, false)),
        Axis::Following => AxisIter::Following(Following::new(node, root)),
        Axis::Preceding => AxisIter::Preceding(Preceding::new(node, root)),
    }
}

/// The node stream of one axis.
#[derive(Debug)]
pub enum AxisIter<N> {
    Single(Option<N>),
    Children(Children<N>),
    List(std::vec::IntoIter<N>),
    Descendants(Descendants<N>),
    Ancestors(Ancestors<N>),
    Siblings(Siblings<N>),
    Following(Following<N>),
    Preceding(Preceding<N>),
}

impl<N: XPathNode> Iterator for AxisIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        match self {
            AxisIter::Single(node) => node.take(),
            AxisIter::Children(iter) => iter.next(),
            AxisIter::List(iter) => iter.next(),
            AxisIter::Descendants(iter) => iter.next(),
            AxisIter::Ancestors(iter) => iter.next(),
            AxisIter::Siblings(iter) => iter.next(),
            AxisIter::Following(iter) => iter.next(),
            AxisIter::Preceding(iter) => iter.next(),
        }
    }
}

/// Pre-order walk of a subtree, optionally including its top node.
#[derive(Debug, Clone)]
pub struct Descendants<N> {
    top: N,
    next: Option<N>,
}

impl<N: XPathNode> Descendants<N> {
    pub fn new(top: N, include_self: bool) -> Self {
        let next = if include_self {
            Some(top)
        } else {
            top.first_child()
        };
        Self { top, next }
    }

    fn successor(&self, current: N) -> Option<N> {
        if let Some(child) = current.first_child() {
            return Some(child);
        }
        let mut node = current;
        loop {
            if node == self.top {
                return None;
            }
            if let Some(sibling) = node.next_sibling() {
                return Some(sibling);
            }
            match node.parent() {
                Some(parent) if parent != self.top => node = parent,
                _ => return None,
            }
        }
    }
}

impl<N: XPathNode> Iterator for Descendants<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next?;
        self.next = self.successor(current);
        Some(current)
    }
}

/// Nearest ancestor first.
#[derive(Debug, Clone)]
pub struct Ancestors<N> {
    next: Option<N>,
}

impl<N: XPathNode> Iterator for Ancestors<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Siblings moving away from the start node. Attribute and namespace nodes have none.
#[derive(Debug, Clone)]
pub struct Siblings<N> {
    next: Option<N>,
    forward: bool,
}

impl<N: XPathNode> Siblings<N> {
    fn new(node: N, forward: bool) -> Self {
        let next = if node.is_attribute() || node.is_namespace() {
            None
        } else if forward {
            node.next_sibling()
        } else {
            node.previous_sibling()
        };
        Self { next, forward }
    }
}

impl<N: XPathNode> Iterator for Siblings<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next?;
        self.next = if self.forward {
            current.next_sibling()
        } else {
            current.previous_sibling()
        };
        Some(current)
    }
}

/// Everything after the start node in document order, minus its descendants.
///
/// For attribute and namespace nodes the owner element's descendants come first, since they
/// follow the attribute in document order.
#[derive(Debug)]
pub struct Following<N> {
    root: N,
    anchor: Option<N>,
    subtree: Option<Descendants<N>>,
    visited: HashSet<N>,
}

impl<N: XPathNode> Following<N> {
    fn new(node: N, root: N) -> Self {
        let (anchor, subtree) = if node.is_attribute() || node.is_namespace() {
            let owner = node.parent();
            (owner, owner.map(|o| Descendants::new(o, false)))
        } else {
            (Some(node), None)
        };
        Self {
            root,
            anchor,
            subtree,
            visited: HashSet::new(),
        }
    }

    /// Moves to the next following sibling of the anchor or of one of its ancestors.
    fn advance(&mut self) -> Option<Descendants<N>> {
        let mut anchor = self.anchor?;
        loop {
            if anchor == self.root || anchor.is_document() {
                self.anchor = None;
                return None;
            }
            if let Some(sibling) = anchor.next_sibling() {
                self.anchor = Some(sibling);
                return Some(Descendants::new(sibling, true));
            }
            match anchor.parent() {
                Some(parent) => anchor = parent,
                None => {
                    self.anchor = None;
                    return None;
                }
            }
        }
    }
}

impl<N: XPathNode> Iterator for Following<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        loop {
            if let Some(subtree) = &mut self.subtree {
                match subtree.next() {
                    Some(node) => {
                        if self.visited.insert(node) {
                            return Some(node);
                        }
                        continue;
                    }
                    None => self.subtree = None,
                }
            }
            self.subtree = Some(self.advance()?);
        }
    }
}

/// Everything before the start node in document order, minus its ancestors, nearest first.
#[derive(Debug)]
pub struct Preceding<N> {
    root: N,
    anchor: Option<N>,
    /// Top of the sibling subtree being walked backwards, and the next node to yield in it.
    top: Option<N>,
    pending: Option<N>,
    visited: HashSet<N>,
}

impl<N: XPathNode> Preceding<N> {
    fn new(node: N, root: N) -> Self {
        let anchor = if node.is_attribute() || node.is_namespace() {
            node.parent()
        } else {
            Some(node)
        };
        Self {
            root,
            anchor,
            top: None,
            pending: None,
            visited: HashSet::new(),
        }
    }

    fn deepest_last(mut node: N) -> N {
        while let Some(child) = node.last_child() {
            node = child;
        }
        node
    }

    fn advance(&mut self) -> Option<N> {
        let mut anchor = self.anchor?;
        loop {
            if anchor == self.root || anchor.is_document() {
                self.anchor = None;
                return None;
            }
            if let Some(sibling) = anchor.previous_sibling() {
                self.anchor = Some(sibling);
                self.top = Some(sibling);
                return Some(Self::deepest_last(sibling));
            }
            // The parent is an ancestor of the start node and is skipped.
            match anchor.parent() {
                Some(parent) => anchor = parent,
                None => {
                    self.anchor = None;
                    return None;
                }
            }
        }
    }
}

impl<N: XPathNode> Iterator for Preceding<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        loop {
            let current = match self.pending.take() {
                Some(node) => node,
                None => self.advance()?,
            };
            self.pending = if Some(current) == self.top {
                None
            } else if let Some(sibling) = current.previous_sibling() {
                Some(Self::deepest_last(sibling))
            } else {
                current.parent()
            };
            if self.visited.insert(current) {
                return Some(current);
            }
        }
    }
}
