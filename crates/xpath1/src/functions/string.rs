use super::{check_arity, number_arg, string_arg, string_or_context};
use crate::context::EvaluationContext;
use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::value::Value;

pub(super) fn string<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("string", args, 0..=1)?;
    Ok(Value::String(string_or_context(ctx, args)?))
}

pub(super) fn concat<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("concat", args, 2..=usize::MAX)?;
    let mut result = String::new();
    for arg in args {
        result.push_str(&string_arg(ctx, arg)?);
    }
    Ok(Value::String(result))
}

/// Evaluates both arguments of a two-string function, first to second.
fn string_pair<'c, N: XPathNode>(
    function: &str,
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<(String, String), XPathError> {
    check_arity(function, args, 2..=2)?;
    Ok((string_arg(ctx, &args[0])?, string_arg(ctx, &args[1])?))
}

pub(super) fn starts_with<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    let (s1, s2) = string_pair("starts-with", ctx, args)?;
    Ok(Value::Boolean(s1.starts_with(&s2)))
}

pub(super) fn contains<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    let (s1, s2) = string_pair("contains", ctx, args)?;
    Ok(Value::Boolean(s1.contains(&s2)))
}

pub(super) fn substring_before<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    let (s1, s2) = string_pair("substring-before", ctx, args)?;
    let before = s1.find(&s2).map(|i| &s1[..i]).unwrap_or_default();
    Ok(Value::String(before.to_string()))
}

pub(super) fn substring_after<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    let (s1, s2) = string_pair("substring-after", ctx, args)?;
    let after = s1.find(&s2).map(|i| &s1[i + s2.len()..]).unwrap_or_default();
    Ok(Value::String(after.to_string()))
}

/// `substring(s, start, length?)` with 1-based character positions. Both numbers are
/// rounded; a character at position `p` is kept when `start <= p < start + length`, so
/// NaN bounds select nothing.
pub(super) fn substring<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("substring", args, 2..=3)?;
    let s = string_arg(ctx, &args[0])?;
    let first = super::number::xpath_round(number_arg(ctx, &args[1])?);
    let end = match args.get(2) {
        Some(length) => first + super::number::xpath_round(number_arg(ctx, length)?),
        None => f64::INFINITY,
    };
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(result))
}

pub(super) fn string_length<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("string-length", args, 0..=1)?;
    let s = string_or_context(ctx, args)?;
    Ok(Value::Number(s.chars().count() as f64))
}

pub(super) fn normalize_space<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("normalize-space", args, 0..=1)?;
    let s = string_or_context(ctx, args)?;
    let normalized = s
        .split([' ', '\t', '\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(Value::String(normalized))
}

pub(super) fn translate<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("translate", args, 3..=3)?;
    let source = string_arg(ctx, &args[0])?;
    let from: Vec<char> = string_arg(ctx, &args[1])?.chars().collect();
    let to: Vec<char> = string_arg(ctx, &args[2])?.chars().collect();
    let result = source
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(result))
}
