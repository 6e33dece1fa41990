use super::{check_arity, node_or_context, node_set_arg};
use crate::axes::Descendants;
use crate::context::EvaluationContext;
use crate::datasource::{XML_NAMESPACE, XPathNode};
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::value::{NodeSet, Value};
use std::collections::HashSet;

pub(super) fn last<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("last", args, 0..=0)?;
    Ok(Value::Number(ctx.size()? as f64))
}

pub(super) fn position<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("position", args, 0..=0)?;
    Ok(Value::Number(ctx.position as f64))
}

pub(super) fn count<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("count", args, 1..=1)?;
    let nodes = node_set_arg("count", ctx, &args[0])?;
    Ok(Value::Number(nodes.len() as f64))
}

/// Selects elements by their `id` or `xml:id` attribute. A node-set argument contributes the
/// tokens of every member's string-value.
pub(super) fn id<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("id", args, 1..=1)?;
    let text = match args[0].evaluate(ctx)? {
        Value::NodeSet(nodes) => nodes
            .iter()
            .map(|n| n.string_value())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    let wanted: HashSet<&str> = text.split_ascii_whitespace().collect();
    if wanted.is_empty() {
        return Ok(Value::NodeSet(NodeSet::empty()));
    }

    let found = Descendants::new(ctx.env.document, false)
        .filter(|node| node.is_element())
        .filter(|node| {
            node.attributes().iter().any(|attr| {
                attr.name().is_some_and(|q| {
                    let is_id = q.local_part == "id"
                        && (q.namespace_uri.is_none() || q.namespace_uri == Some(XML_NAMESPACE));
                    is_id && wanted.contains(attr.string_value().as_str())
                })
            })
        })
        .collect();
    Ok(Value::NodeSet(NodeSet::from_unique(found)))
}

pub(super) fn local_name<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("local-name", args, 0..=1)?;
    let node = node_or_context("local-name", ctx, args)?;
    let name = node
        .and_then(|n| n.name().map(|q| q.local_part.to_string()))
        .unwrap_or_default();
    Ok(Value::String(name))
}

pub(super) fn namespace_uri<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("namespace-uri", args, 0..=1)?;
    let node = node_or_context("namespace-uri", ctx, args)?;
    let uri = node
        .filter(|n| n.is_element() || n.is_attribute())
        .and_then(|n| n.name().and_then(|q| q.namespace_uri.map(str::to_string)))
        .unwrap_or_default();
    Ok(Value::String(uri))
}

pub(super) fn name<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("name", args, 0..=1)?;
    let node = node_or_context("name", ctx, args)?;
    let name = node
        .and_then(|n| n.name().map(|q| q.to_string()))
        .unwrap_or_default();
    Ok(Value::String(name))
}
