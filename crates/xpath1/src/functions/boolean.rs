use super::{check_arity, string_arg};
use crate::context::EvaluationContext;
use crate::datasource::{XML_NAMESPACE, XPathNode};
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::value::Value;

pub(super) fn boolean<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("boolean", args, 1..=1)?;
    Ok(Value::Boolean(args[0].evaluate_bool(ctx)?))
}

pub(super) fn not<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("not", args, 1..=1)?;
    Ok(Value::Boolean(!args[0].evaluate_bool(ctx)?))
}

pub(super) fn true_fn<'c, N: XPathNode>(
    _ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("true", args, 0..=0)?;
    Ok(Value::Boolean(true))
}

pub(super) fn false_fn<'c, N: XPathNode>(
    _ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("false", args, 0..=0)?;
    Ok(Value::Boolean(false))
}

/// True when the nearest `xml:lang` in scope equals the argument or is a sub-language of it,
/// ignoring case.
pub(super) fn lang<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("lang", args, 1..=1)?;
    let wanted = string_arg(ctx, &args[0])?.to_lowercase();

    let mut current = Some(ctx.node);
    while let Some(node) = current {
        let declared = node.attributes().into_iter().find(|attr| {
            attr.name().is_some_and(|q| {
                q.local_part == "lang"
                    && (q.namespace_uri == Some(XML_NAMESPACE) || q.prefix == Some("xml"))
            })
        });
        if let Some(attr) = declared {
            let lang = attr.string_value().to_lowercase();
            let matches = lang == wanted
                || lang
                    .strip_prefix(wanted.as_str())
                    .is_some_and(|rest| rest.starts_with('-'));
            return Ok(Value::Boolean(matches));
        }
        current = node.parent();
    }
    Ok(Value::Boolean(false))
}
