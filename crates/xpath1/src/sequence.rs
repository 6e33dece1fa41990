//! A lazily produced node sequence that can be read through any number of cursors.
//!
//! The producer runs at most once: nodes it yields are buffered and shared by every cursor
//! and by the positional accessors, so asking for the context size while a cursor is
//! halfway through never re-runs an axis walk or a predicate.

use crate::datasource::XPathNode;
use crate::error::XPathError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type NodeSource<'c, N> = Box<dyn Iterator<Item = Result<N, XPathError>> + 'c>;

struct TeeState<'c, N> {
    source: Option<NodeSource<'c, N>>,
    buffer: Vec<N>,
    exhausted: bool,
}

#[derive(Clone)]
pub struct NodeSequence<'c, N> {
    state: Rc<RefCell<TeeState<'c, N>>>,
}

impl<N: fmt::Debug> fmt::Debug for NodeSequence<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("NodeSequence")
            .field("buffered", &state.buffer)
            .field("exhausted", &state.exhausted)
            .finish()
    }
}

impl<'c, N: XPathNode + 'c> NodeSequence<'c, N> {
    pub fn new(source: impl Iterator<Item = Result<N, XPathError>> + 'c) -> Self {
        Self {
            state: Rc::new(RefCell::new(TeeState {
                source: Some(Box::new(source)),
                buffer: Vec::new(),
                exhausted: false,
            })),
        }
    }

    /// A sequence over nodes that are already known.
    pub fn from_nodes(nodes: Vec<N>) -> Self {
        Self {
            state: Rc::new(RefCell::new(TeeState {
                source: None,
                buffer: nodes,
                exhausted: true,
            })),
        }
    }

    /// Pulls from the producer until `index` is buffered, or until it runs dry when
    /// `index` is `None`.
    fn fill(&self, index: Option<usize>) -> Result<(), XPathError> {
        loop {
            let mut source = {
                let mut state = self.state.borrow_mut();
                if state.exhausted || index.is_some_and(|i| i < state.buffer.len()) {
                    return Ok(());
                }
                state.source.take().ok_or_else(|| {
                    XPathError::Internal("node sequence read while it is being produced".into())
                })?
            };
            // No borrow is held here: the producer may read other sequences, such as the
            // one its predicate takes its context size from.
            let item = source.next();
            let mut state = self.state.borrow_mut();
            match item {
                Some(Ok(node)) => {
                    state.buffer.push(node);
                    state.source = Some(source);
                }
                Some(Err(err)) => {
                    state.source = Some(source);
                    return Err(err);
                }
                None => state.exhausted = true,
            }
        }
    }

    /// The node at a 0-based index, producing no further than that index.
    pub fn get(&self, index: usize) -> Result<Option<N>, XPathError> {
        self.fill(Some(index))?;
        Ok(self.state.borrow().buffer.get(index).copied())
    }

    pub fn is_empty(&self) -> Result<bool, XPathError> {
        Ok(self.get(0)?.is_none())
    }

    /// Total number of nodes. Drains the producer.
    pub fn len(&self) -> Result<usize, XPathError> {
        self.fill(None)?;
        Ok(self.state.borrow().buffer.len())
    }

    pub fn collect(&self) -> Result<Vec<N>, XPathError> {
        self.fill(None)?;
        Ok(self.state.borrow().buffer.clone())
    }

    /// An independent cursor starting at the first node.
    pub fn cursor(&self) -> Cursor<'c, N> {
        Cursor {
            sequence: self.clone(),
            index: 0,
        }
    }
}

/// One reader of a [`NodeSequence`].
pub struct Cursor<'c, N> {
    sequence: NodeSequence<'c, N>,
    index: usize,
}

impl<'c, N: XPathNode + 'c> Iterator for Cursor<'c, N> {
    type Item = Result<N, XPathError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.sequence.get(self.index) {
            Ok(Some(node)) => {
                self.index += 1;
                Some(Ok(node))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
