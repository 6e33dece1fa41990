use super::{check_arity, node_set_arg, number_arg};
use crate::context::EvaluationContext;
use crate::datasource::XPathNode;
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::value::{Value, parse_number};

/// Rounds half towards positive infinity, keeping NaN, the infinities and negative zero.
pub(super) fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}

pub(super) fn number<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("number", args, 0..=1)?;
    // The direct conversion: other numeric coercions may delegate to this very function.
    let n = match args.first() {
        Some(arg) => arg.evaluate(ctx)?.to_number(),
        None => parse_number(&ctx.node.string_value()),
    };
    Ok(Value::Number(n))
}

pub(super) fn sum<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("sum", args, 1..=1)?;
    let nodes = node_set_arg("sum", ctx, &args[0])?;
    let mut total = 0.0;
    for node in nodes.iter() {
        total += ctx.number_of(&Value::String(node.string_value()))?;
    }
    Ok(Value::Number(total))
}

pub(super) fn floor<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("floor", args, 1..=1)?;
    Ok(Value::Number(number_arg(ctx, &args[0])?.floor()))
}

pub(super) fn ceiling<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("ceiling", args, 1..=1)?;
    Ok(Value::Number(number_arg(ctx, &args[0])?.ceil()))
}

pub(super) fn round<'c, N: XPathNode>(
    ctx: &EvaluationContext<'c, N>,
    args: &'c [ExprEvaluator],
) -> Result<Value<N>, XPathError> {
    check_arity("round", args, 1..=1)?;
    Ok(Value::Number(xpath_round(number_arg(ctx, &args[0])?)))
}
