//! Evaluation state: the per-call environment and the per-node context.

use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::evaluator::EvaluatorOptions;
use crate::expr::ExprEvaluator;
use crate::functions::{FunctionLibrary, QualifiedName};
use crate::namespace::NamespaceResolver;
use crate::sequence::NodeSequence;
use crate::value::Value;
use std::collections::HashMap;

/// Variable bindings, keyed by `name` or `prefix:name`.
pub type Variables<N> = HashMap<String, Value<N>>;

/// Everything that stays fixed for one call to the evaluator.
///
/// `'c` is the lifetime of the call: the compiled expression, the resolver, the function
/// library and the bindings all outlive it.
pub struct Environment<'c, N> {
    /// The document containing the context node.
    pub document: N,
    /// Where absolute paths start, and the boundary of `following`/`preceding`.
    pub root: N,
    pub resolver: &'c dyn NamespaceResolver,
    pub functions: &'c dyn FunctionLibrary<N>,
    pub variables: &'c Variables<N>,
    pub options: &'c EvaluatorOptions,
}

impl<N: Copy> Clone for Environment<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: Copy> Copy for Environment<'_, N> {}

/// The context size: known up front, or the length of a sequence not yet fully produced.
#[derive(Clone)]
pub(crate) enum ContextSize<'c, N> {
    Known(usize),
    Lazy(NodeSequence<'c, N>),
}

/// The context an expression is evaluated in: a node, its 1-based position and the size
/// of the node list it was taken from.
pub struct EvaluationContext<'c, N> {
    pub node: N,
    pub position: usize,
    size: ContextSize<'c, N>,
    pub env: Environment<'c, N>,
}

impl<N: Copy> Clone for EvaluationContext<'_, N> {
    fn clone(&self) -> Self {
        Self {
            node: self.node,
            position: self.position,
            size: self.size.clone(),
            env: self.env,
        }
    }
}

impl<'c, N: XPathNode> EvaluationContext<'c, N> {
    /// A context of its own: position and size are both 1.
    pub fn new(node: N, env: Environment<'c, N>) -> Self {
        Self {
            node,
            position: 1,
            size: ContextSize::Known(1),
            env,
        }
    }

    pub(crate) fn with_size(
        node: N,
        position: usize,
        size: ContextSize<'c, N>,
        env: Environment<'c, N>,
    ) -> Self {
        Self {
            node,
            position,
            size,
            env,
        }
    }

    /// A context for `node` sharing this one's environment.
    pub fn for_node(&self, node: N) -> Self {
        Self::new(node, self.env)
    }

    /// The context size. Drains the underlying node list the first time it is asked for.
    pub fn size(&self) -> Result<usize, XPathError> {
        match &self.size {
            ContextSize::Known(size) => Ok(*size),
            ContextSize::Lazy(sequence) => sequence.len(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&'c Value<N>> {
        self.env.variables.get(name)
    }

    /// Converts `value` to a number.
    ///
    /// Strings and node-sets go through the library's `number()` when it has one, and through
    /// the built-in parse otherwise. A replacement `number()` must not call back into this
    /// method.
    pub fn number_of(&self, value: &Value<N>) -> Result<f64, XPathError> {
        let text = match value {
            Value::String(s) => s.as_str(),
            Value::NodeSet(nodes) => nodes.string_value(),
            Value::Number(_) | Value::Boolean(_) => return Ok(value.to_number()),
        };
        let name = QualifiedName::new(None, "number");
        let Some(number) = self.env.functions.get_implementation(&name, self) else {
            return Ok(value.to_number());
        };
        let args = [ExprEvaluator::String(text.to_string())];
        let ctx = EvaluationContext::new(self.node, self.env);
        Ok(number(&ctx, &args)?.to_number())
    }
}
