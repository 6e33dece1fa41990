//! An XPath 1.0 evaluation engine over any tree that implements [`XPathNode`].
//!
//! The engine consumes already-parsed expressions ([`SyntaxNode`]), compiles them into
//! reusable evaluator trees and evaluates them lazily against a context node.

pub mod axes;
pub mod context;
pub mod datasource;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod functions;
pub mod location_path;
pub mod namespace;
pub mod sequence;
pub mod step;
pub mod syntax;
pub mod value;

pub use context::{Environment, EvaluationContext, Variables};
pub use datasource::{NodeType, QName, XPathNode};
pub use error::XPathError;
pub use evaluator::{Evaluator, EvaluatorOptions, ResultType};
pub use expr::ExprEvaluator;
pub use functions::{FunctionLibrary, FunctionRegistry, QualifiedName, XPathFunction};
pub use namespace::{NamespaceResolver, NoNamespaces, NodeNamespaceResolver, StaticNamespaces};
pub use step::{Axis, NodeTest, NodeTypeTest, Step};
pub use syntax::{SyntaxKind, SyntaxNode};
pub use value::{NodeSet, Value, ValueKind};
