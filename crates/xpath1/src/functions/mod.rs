//! Function lookup and dispatch, plus the XPath 1.0 core function library.
//!
//! Functions receive their arguments unevaluated and decide themselves when (and whether)
//! to evaluate them.

use crate::context::EvaluationContext;
use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::value::{NodeSet, Value};
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

mod boolean;
mod nodeset;
mod number;
mod string;

/// A function name as written in an expression: `local` or `prefix:local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    /// Splits `prefix:local` at the first colon.
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((prefix, local)) => Self::new(Some(prefix), local),
            None => Self::new(None, text),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A callable XPath function.
///
/// Closures may capture state of their own; anything they capture must be shareable between
/// threads. A function can evaluate its arguments through `ExprEvaluator::evaluate`, in any
/// order and as often as it likes.
pub type XPathFunction<N> = Arc<
    dyn for<'c> Fn(&EvaluationContext<'c, N>, &'c [ExprEvaluator]) -> Result<Value<N>, XPathError>
        + Send
        + Sync,
>;

/// Looks functions up by their (optional prefix, local name).
///
/// The context of the call is passed along, so a library can pick an implementation by the
/// evaluation it serves.
pub trait FunctionLibrary<N> {
    fn get_implementation(
        &self,
        name: &QualifiedName,
        ctx: &EvaluationContext<'_, N>,
    ) -> Option<XPathFunction<N>>;
}

/// A table of functions. `Default` gives the XPath 1.0 core library.
pub struct FunctionRegistry<N> {
    functions: HashMap<QualifiedName, XPathFunction<N>>,
}

impl<N> fmt::Debug for FunctionRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.functions.keys().map(|n| n.to_string()).collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl<N> Clone for FunctionRegistry<N> {
    fn clone(&self) -> Self {
        Self {
            functions: self.functions.clone(),
        }
    }
}

impl<N: XPathNode> FunctionRegistry<N> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn with_core_functions() -> Self {
        let mut registry = Self::new();
        // Node-set
        registry.register(None, "last", |ctx, args| nodeset::last(ctx, args));
        registry.register(None, "position", |ctx, args| nodeset::position(ctx, args));
        registry.register(None, "count", |ctx, args| nodeset::count(ctx, args));
        registry.register(None, "id", |ctx, args| nodeset::id(ctx, args));
        registry.register(None, "local-name", |ctx, args| nodeset::local_name(ctx, args));
        registry.register(None, "namespace-uri", |ctx, args| {
            nodeset::namespace_uri(ctx, args)
        });
        registry.register(None, "name", |ctx, args| nodeset::name(ctx, args));
        // String
        registry.register(None, "string", |ctx, args| string::string(ctx, args));
        registry.register(None, "concat", |ctx, args| string::concat(ctx, args));
        registry.register(None, "starts-with", |ctx, args| string::starts_with(ctx, args));
        registry.register(None, "contains", |ctx, args| string::contains(ctx, args));
        registry.register(None, "substring-before", |ctx, args| {
            string::substring_before(ctx, args)
        });
        registry.register(None, "substring-after", |ctx, args| {
            string::substring_after(ctx, args)
        });
        registry.register(None, "substring", |ctx, args| string::substring(ctx, args));
        registry.register(None, "string-length", |ctx, args| string::string_length(ctx, args));
        registry.register(None, "normalize-space", |ctx, args| {
            string::normalize_space(ctx, args)
        });
        registry.register(None, "translate", |ctx, args| string::translate(ctx, args));
        // Boolean
        registry.register(None, "boolean", |ctx, args| boolean::boolean(ctx, args));
        registry.register(None, "not", |ctx, args| boolean::not(ctx, args));
        registry.register(None, "true", |ctx, args| boolean::true_fn(ctx, args));
        registry.register(None, "false", |ctx, args| boolean::false_fn(ctx, args));
        registry.register(None, "lang", |ctx, args| boolean::lang(ctx, args));
        // Number
        registry.register(None, "number", |ctx, args| number::number(ctx, args));
        registry.register(None, "sum", |ctx, args| number::sum(ctx, args));
        registry.register(None, "floor", |ctx, args| number::floor(ctx, args));
        registry.register(None, "ceiling", |ctx, args| number::ceiling(ctx, args));
        registry.register(None, "round", |ctx, args| number::round(ctx, args));
        registry
    }

    /// Adds or replaces a function.
    ///
    /// Registering `number` also changes how strings convert to numbers everywhere else:
    /// arithmetic, relational comparisons and numeric arguments all go through it.
    pub fn register<F>(&mut self, prefix: Option<&str>, local: &str, function: F)
    where
        F: for<'c> Fn(&EvaluationContext<'c, N>, &'c [ExprEvaluator]) -> Result<Value<N>, XPathError>
            + Send
            + Sync
            + 'static,
    {
        self.functions
            .insert(QualifiedName::new(prefix, local), Arc::new(function));
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<N: XPathNode> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self::with_core_functions()
    }
}

impl<N: XPathNode> FunctionLibrary<N> for FunctionRegistry<N> {
    fn get_implementation(
        &self,
        name: &QualifiedName,
        _ctx: &EvaluationContext<'_, N>,
    ) -> Option<XPathFunction<N>> {
        self.functions.get(name).cloned()
    }
}

// --- Argument helpers shared by the core functions ---

pub(crate) fn check_arity(
    function: &str,
    args: &[ExprEvaluator],
    expected: RangeInclusive<usize>,
) -> Result<(), XPathError> {
    if expected.contains(&args.len()) {
        return Ok(());
    }
    let wanted = if expected.start() == expected.end() {
        format!("{}", expected.start())
    } else if *expected.end() == usize::MAX {
        format!("at least {}", expected.start())
    } else {
        format!("{} to {}", expected.start(), expected.end())
    };
    Err(XPathError::function(
        function,
        format!("Expected {} argument(s), got {}", wanted, args.len()),
    ))
}

pub(crate) fn string_arg<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    arg: &'c ExprEvaluator,
) -> Result<String, XPathError> {
    Ok(arg.evaluate(ctx)?.to_string())
}

pub(crate) fn number_arg<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    arg: &'c ExprEvaluator,
) -> Result<f64, XPathError> {
    ctx.number_of(&arg.evaluate(ctx)?)
}

/// The string of the single optional argument, or of the context node when it is absent.
pub(crate) fn string_or_context<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<String, XPathError> {
    match args.first() {
        Some(arg) => string_arg(ctx, arg),
        None => Ok(ctx.node.string_value()),
    }
}

pub(crate) fn node_set_arg<'c, N: XPathNode>(
    function: &str,
    ctx: &EvaluationContext<'c, N>,
    arg: &'c ExprEvaluator,
) -> Result<NodeSet<N>, XPathError> {
    match arg.evaluate(ctx)? {
        Value::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::function(
            function,
            format!("Argument must be a node-set, got {}", other.kind()),
        )),
    }
}

/// The first node, in document order, of the optional node-set argument; the context node
/// when the argument is absent.
pub(crate) fn node_or_context<'c, N: XPathNode>(
    function: &str,
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Option<N>, XPathError> {
    match args.first() {
        Some(arg) => Ok(node_set_arg(function, ctx, arg)?.first_in_document_order()),
        None => Ok(Some(ctx.node)),
    }
}
