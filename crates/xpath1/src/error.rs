use crate::syntax::SyntaxKind;
use crate::value::ValueKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("Unknown XPath function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Operator '{operator}' requires node-set operands, got {found}")]
    InvalidOperand {
        operator: &'static str,
        found: ValueKind,
    },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("Namespace prefix '{0}' is not bound")]
    UnresolvedPrefix(String),

    #[error("Unsupported axis '{0}'")]
    UnknownAxis(String),

    #[error("Malformed {kind:?} node '{text}': {message}")]
    MalformedSyntax {
        kind: SyntaxKind,
        text: String,
        message: String,
    },

    #[error("Expression '{0}' selected no nodes")]
    NodeNotFound(String),

    #[error("Internal evaluation error: {0}")]
    Internal(String),
}

impl XPathError {
    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        XPathError::FunctionError {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
