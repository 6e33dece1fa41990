//! The evaluator facade: compiles syntax trees (with a bounded cache), builds the evaluation
//! environment and presents results in the shape the caller asks for.

use crate::context::{Environment, EvaluationContext, Variables};
use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::functions::{FunctionLibrary, FunctionRegistry};
use crate::namespace::NamespaceResolver;
use crate::syntax::SyntaxNode;
use crate::value::{NodeSet, Value};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Tuning knobs for an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// How many compiled expressions to keep (default: 256). Zero disables the cache.
    pub cache_capacity: usize,
    /// Whether an unbound variable is an error (default: true). When false it evaluates to
    /// the empty string.
    pub strict_variables: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            strict_variables: true,
        }
    }
}

impl EvaluatorOptions {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }
}

/// The shape a caller wants the result in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    /// Whatever the expression naturally produces.
    Any,
    String,
    Number,
    Boolean,
    /// A node-set, in the order the expression produced it.
    NodeSet,
    /// A node-set sorted into document order.
    OrderedNodeSet,
    /// The first node in document order, as a node-set of at most one node.
    FirstNode,
}

type ExpressionCache = LruCache<SyntaxNode, Arc<ExprEvaluator>>;

/// Evaluates parsed XPath expressions against nodes of type `N`.
///
/// Holds the function library, variable bindings and options. The namespace resolver and the
/// context node are supplied per call. Compiled trees carry no evaluation state, so one
/// evaluator can serve any number of calls. It is `Send + Sync` whenever `N` is, and calls
/// from several threads share the compiled-expression cache.
pub struct Evaluator<N, L = FunctionRegistry<N>> {
    functions: L,
    variables: Variables<N>,
    options: EvaluatorOptions,
    cache: Mutex<Option<ExpressionCache>>,
}

fn new_cache(capacity: usize) -> Mutex<Option<ExpressionCache>> {
    Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new))
}

impl<N: XPathNode> Evaluator<N> {
    /// An evaluator with the XPath 1.0 core function library and default options.
    pub fn new() -> Self {
        let options = EvaluatorOptions::default();
        Self {
            functions: FunctionRegistry::with_core_functions(),
            variables: Variables::new(),
            cache: new_cache(options.cache_capacity),
            options,
        }
    }
}

impl<N: XPathNode> Default for Evaluator<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, L: fmt::Debug> fmt::Debug for Evaluator<N, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.cache.lock().as_ref().map_or(0, |cache| cache.len());
        f.debug_struct("Evaluator")
            .field("functions", &self.functions)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("cached", &cached)
            .finish()
    }
}

impl<N: XPathNode, L: FunctionLibrary<N>> Evaluator<N, L> {
    /// Replaces the function library.
    pub fn with_functions<M: FunctionLibrary<N>>(self, functions: M) -> Evaluator<N, M> {
        Evaluator {
            functions,
            variables: self.variables,
            options: self.options,
            cache: self.cache,
        }
    }

    /// Replaces the options. The compiled-expression cache starts over.
    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.cache = new_cache(options.cache_capacity);
        self.options = options;
        self
    }

    /// Binds `$name` (or `$prefix:name`) to `value`.
    pub fn with_variable(mut self, name: &str, value: Value<N>) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn functions(&self) -> &L {
        &self.functions
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Compiles `expr`, reusing an earlier compilation of an identical tree.
    pub fn compile(&self, expr: &SyntaxNode) -> Result<Arc<ExprEvaluator>, XPathError> {
        let mut guard = self.cache.lock();
        let Some(cache) = guard.as_mut() else {
            return Ok(Arc::new(ExprEvaluator::compile(expr)?));
        };
        if let Some(compiled) = cache.get(expr) {
            return Ok(Arc::clone(compiled));
        }
        log::debug!("Compiling XPath expression '{}'", expr.text());
        let compiled = Arc::new(ExprEvaluator::compile(expr)?);
        cache.put(expr.clone(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Evaluates `expr` with `node` as the context node. Absolute paths start at the node's
    /// document.
    pub fn evaluate(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
        result_type: ResultType,
    ) -> Result<Value<N>, XPathError> {
        self.evaluate_within(expr, node, node.document(), resolver, result_type)
    }

    /// Like [`evaluate`](Self::evaluate), but absolute paths start at `root` and the
    /// `following` and `preceding` axes stay inside it.
    pub fn evaluate_within(
        &self,
        expr: &SyntaxNode,
        node: N,
        root: N,
        resolver: &dyn NamespaceResolver,
        result_type: ResultType,
    ) -> Result<Value<N>, XPathError> {
        let compiled = self.compile(expr)?;
        log::debug!(
            "Evaluating '{}' against {:?} as {:?}",
            expr.text(),
            node,
            result_type
        );
        let env = Environment {
            document: node.document(),
            root,
            resolver,
            functions: &self.functions,
            variables: &self.variables,
            options: &self.options,
        };
        let ctx = EvaluationContext::new(node, env);
        let value = match result_type {
            ResultType::Any => compiled.evaluate(&ctx)?,
            ResultType::String => Value::String(compiled.evaluate(&ctx)?.to_string()),
            ResultType::Number => Value::Number(ctx.number_of(&compiled.evaluate(&ctx)?)?),
            ResultType::Boolean => Value::Boolean(compiled.evaluate_bool(&ctx)?),
            ResultType::NodeSet => Value::NodeSet(node_set(compiled.evaluate(&ctx)?)?),
            ResultType::OrderedNodeSet => {
                Value::NodeSet(node_set(compiled.evaluate(&ctx)?)?.sorted())
            }
            ResultType::FirstNode => {
                let nodes = node_set(compiled.evaluate(&ctx)?)?;
                Value::NodeSet(nodes.first_in_document_order().into_iter().collect())
            }
        };
        log::debug!("'{}' produced a {}", expr.text(), value.kind());
        Ok(value)
    }

    pub fn evaluate_string(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<String, XPathError> {
        Ok(self
            .evaluate(expr, node, resolver, ResultType::String)?
            .to_string())
    }

    pub fn evaluate_number(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<f64, XPathError> {
        Ok(self
            .evaluate(expr, node, resolver, ResultType::Number)?
            .to_number())
    }

    pub fn evaluate_boolean(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<bool, XPathError> {
        Ok(self
            .evaluate(expr, node, resolver, ResultType::Boolean)?
            .to_bool())
    }

    /// A snapshot of the selected nodes, in document order.
    pub fn evaluate_nodes(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<Vec<N>, XPathError> {
        let value = self.evaluate(expr, node, resolver, ResultType::OrderedNodeSet)?;
        Ok(node_set(value)?.into_vec())
    }

    pub fn evaluate_first_node(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<Option<N>, XPathError> {
        let value = self.evaluate(expr, node, resolver, ResultType::FirstNode)?;
        Ok(node_set(value)?.iter().next().copied())
    }

    /// Like [`evaluate_first_node`](Self::evaluate_first_node), but selecting nothing is an
    /// error.
    pub fn evaluate_required_node(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<N, XPathError> {
        self.evaluate_first_node(expr, node, resolver)?
            .ok_or_else(|| XPathError::NodeNotFound(expr.text().to_string()))
    }

    /// Like [`evaluate_nodes`](Self::evaluate_nodes), but selecting nothing is an error.
    pub fn evaluate_required_nodes(
        &self,
        expr: &SyntaxNode,
        node: N,
        resolver: &dyn NamespaceResolver,
    ) -> Result<Vec<N>, XPathError> {
        let nodes = self.evaluate_nodes(expr, node, resolver)?;
        if nodes.is_empty() {
            return Err(XPathError::NodeNotFound(expr.text().to_string()));
        }
        Ok(nodes)
    }
}

fn node_set<N: XPathNode>(value: Value<N>) -> Result<NodeSet<N>, XPathError> {
    match value {
        Value::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::TypeError(format!(
            "Expected a node-set, got a {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::mock::{MockNode, create_test_tree};
    use crate::namespace::NoNamespaces;
    use crate::syntax::build::*;
    use crate::value::ValueKind;

    fn ids(nodes: &[MockNode<'_>]) -> Vec<usize> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_result_types() {
        let tree = create_test_tree();
        let evaluator = Evaluator::new();
        let root = tree.root();
        let paras = relative(vec![child("para")]);

        let any = evaluator
            .evaluate(&paras, root, &NoNamespaces, ResultType::Any)
            .unwrap();
        assert_eq!(any.kind(), ValueKind::NodeSet);
        let s = evaluator
            .evaluate(&paras, root, &NoNamespaces, ResultType::String)
            .unwrap();
        assert_eq!(s, Value::String("Hello".to_string()));
        let first = evaluator
            .evaluate(&paras, root, &NoNamespaces, ResultType::FirstNode)
            .unwrap();
        assert_eq!(first.into_node_set().unwrap().len(), 1);

        assert_eq!(
            evaluator.evaluate_number(&call("count", vec![paras.clone()]), root, &NoNamespaces),
            Ok(2.0)
        );
        assert_eq!(evaluator.evaluate_boolean(&paras, root, &NoNamespaces), Ok(true));
        assert_eq!(
            evaluator.evaluate_string(&number(3.0), root, &NoNamespaces),
            Ok("3".to_string())
        );
    }

    #[test]
    fn test_node_results() {
        let tree = create_test_tree();
        let evaluator = Evaluator::new();
        let root = tree.root();
        let all = absolute(vec![descendant(), step(None, wildcard(), vec![])]);
        let nodes = evaluator.evaluate_nodes(&all, root, &NoNamespaces).unwrap();
        assert_eq!(ids(&nodes), vec![1, 6, 8]);
        let first = evaluator.evaluate_first_node(&all, root, &NoNamespaces).unwrap();
        assert_eq!(first.map(|n| n.id), Some(1));

        let missing = relative(vec![child("missing")]);
        assert_eq!(evaluator.evaluate_first_node(&missing, root, &NoNamespaces), Ok(None));
        assert_eq!(
            evaluator.evaluate_required_node(&missing, root, &NoNamespaces),
            Err(XPathError::NodeNotFound("missing".to_string()))
        );
        assert!(matches!(
            evaluator.evaluate_required_nodes(&missing, root, &NoNamespaces),
            Err(XPathError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_nodes_from_a_scalar_is_a_type_error() {
        let tree = create_test_tree();
        let evaluator = Evaluator::new();
        let err = evaluator
            .evaluate_nodes(&string("x"), tree.root(), &NoNamespaces)
            .unwrap_err();
        assert!(matches!(err, XPathError::TypeError(_)));
    }

    #[test]
    fn test_compiled_trees_are_cached_by_tree() {
        let evaluator: Evaluator<MockNode<'_>> = Evaluator::new();
        let expr = add(number(1.0), number(2.0));
        let a = evaluator.compile(&expr).unwrap();
        let b = evaluator.compile(&expr.clone()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let uncached: Evaluator<MockNode<'_>> =
            Evaluator::new().with_options(EvaluatorOptions::default().with_cache_capacity(0));
        let a = uncached.compile(&expr).unwrap();
        let b = uncached.compile(&expr).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_evaluator_is_shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Evaluator<MockNode<'static>>>();
        assert_send_sync::<Value<MockNode<'static>>>();

        let tree = create_test_tree();
        let paras = Value::nodes(vec![tree.node(8), tree.node(1)]);
        let evaluator = Evaluator::new().with_variable("paras", paras);
        let count = call("count", vec![variable("paras")]);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let root = tree.root();
                    assert_eq!(evaluator.evaluate_number(&count, root, &NoNamespaces), Ok(2.0));
                    assert_eq!(
                        evaluator.evaluate_string(&variable("paras"), root, &NoNamespaces),
                        Ok("Hello".to_string())
                    );
                });
            }
        });
    }

    #[test]
    fn test_same_text_different_tree_compiles_separately() {
        use crate::syntax::SyntaxKind;
        let tree = create_test_tree();
        let evaluator = Evaluator::new();
        let root = tree.root();
        // Two hosts, one source text, different trees.
        let sum = SyntaxNode::new(SyntaxKind::AddExpr, "1 + 2", vec![number(1.0), number(2.0)]);
        let difference =
            SyntaxNode::new(SyntaxKind::SubtractExpr, "1 + 2", vec![number(1.0), number(2.0)]);

        assert_eq!(evaluator.evaluate_number(&sum, root, &NoNamespaces), Ok(3.0));
        assert_eq!(evaluator.evaluate_number(&difference, root, &NoNamespaces), Ok(-1.0));
        let a = evaluator.compile(&sum).unwrap();
        let b = evaluator.compile(&difference).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_compile_errors_are_not_cached() {
        let evaluator: Evaluator<MockNode<'_>> = Evaluator::new();
        let bad = SyntaxNode::new(crate::syntax::SyntaxKind::AddExpr, "1 +", vec![number(1.0)]);
        assert!(evaluator.compile(&bad).is_err());
        assert!(evaluator.compile(&bad).is_err());
    }

    #[test]
    fn test_variables_and_options() {
        let tree = create_test_tree();
        let root = tree.root();
        let evaluator = Evaluator::new().with_variable("n", Value::Number(2.0));
        let expr = mul(variable("n"), number(21.0));
        assert_eq!(evaluator.evaluate_number(&expr, root, &NoNamespaces), Ok(42.0));
        assert_eq!(
            evaluator.evaluate_string(&variable("other"), root, &NoNamespaces),
            Err(XPathError::UnknownVariable("other".to_string()))
        );

        let lenient = evaluator
            .with_options(EvaluatorOptions::default().with_strict_variables(false));
        assert_eq!(
            lenient.evaluate_string(&variable("other"), root, &NoNamespaces),
            Ok(String::new())
        );
    }

    #[test]
    fn test_evaluate_within_root() {
        let tree = create_test_tree();
        let evaluator = Evaluator::new();
        let para = tree.node(1);
        let text = tree.node(4);
        let top = absolute(vec![]);
        let found = evaluator
            .evaluate_within(&top, text, para, &NoNamespaces, ResultType::NodeSet)
            .unwrap();
        assert_eq!(ids(found.into_node_set().unwrap().as_slice()), vec![1]);

        let following = relative(vec![step(Some("following"), node_type("node"), vec![])]);
        let unbounded = evaluator.evaluate_nodes(&following, text, &NoNamespaces).unwrap();
        assert_eq!(ids(&unbounded), vec![5, 6, 7, 8, 9]);
        let bounded = evaluator
            .evaluate_within(&following, text, para, &NoNamespaces, ResultType::NodeSet)
            .unwrap();
        assert!(bounded.into_node_set().unwrap().is_empty());
    }

    struct OnlyAnswer;

    fn answer<'c, N: XPathNode>(
        _ctx: &EvaluationContext<'c, N>,
        _args: &'c [ExprEvaluator],
    ) -> Result<Value<N>, XPathError> {
        Ok(Value::Number(42.0))
    }

    impl<N: XPathNode> FunctionLibrary<N> for OnlyAnswer {
        fn get_implementation(
            &self,
            name: &crate::functions::QualifiedName,
            ctx: &EvaluationContext<'_, N>,
        ) -> Option<crate::functions::XPathFunction<N>> {
            // Attributes get no answer.
            if name.prefix.is_some() || name.local != "answer" || ctx.node.is_attribute() {
                return None;
            }
            let function: crate::functions::XPathFunction<N> =
                Arc::new(|ctx, args| answer(ctx, args));
            Some(function)
        }
    }

    #[test]
    fn test_custom_function_library() {
        let tree = create_test_tree();
        let evaluator = Evaluator::new().with_functions(OnlyAnswer);
        let root = tree.root();
        assert_eq!(
            evaluator.evaluate_number(&call("answer", vec![]), root, &NoNamespaces),
            Ok(42.0)
        );
        assert_eq!(
            evaluator.evaluate_number(&call("count", vec![absolute(vec![])]), root, &NoNamespaces),
            Err(XPathError::UnknownFunction("count".to_string()))
        );
        // The library sees the context of each call.
        assert_eq!(
            evaluator.evaluate_number(&call("answer", vec![]), tree.node(2), &NoNamespaces),
            Err(XPathError::UnknownFunction("answer".to_string()))
        );
    }
}
