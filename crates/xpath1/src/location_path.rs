//! Location path evaluation: seeding, step chaining and predicate filtering.
//!
//! Each step is a lazy pipeline over [`NodeSequence`]s. For every node of the incoming
//! sequence the axis is walked, the node test applied and the predicates chained, each
//! predicate reading the output of the previous one. Nothing is produced until someone
//! asks for a node, so `path[1]` or an existence check stops after the first match.

use crate::axes;
use crate::context::{ContextSize, Environment, EvaluationContext};
use crate::datasource::{XPathNode, sort_document_order};
use crate::error::XPathError;
use crate::expr::ExprEvaluator;
use crate::sequence::{Cursor, NodeSequence};
use crate::step::{NodeMatcher, Step};
use crate::value::{NodeSet, Value};
use std::collections::HashSet;
use std::rc::Rc;

/// Where a location path begins.
#[derive(Debug)]
pub enum PathStart {
    /// `/...`: the root of the evaluation.
    Root,
    /// A relative path: the context node.
    Context,
    /// `expr[predicate].../...`: the node-set an expression evaluates to.
    Filter {
        expr: Box<ExprEvaluator>,
        predicates: Vec<ExprEvaluator>,
    },
}

#[derive(Debug)]
pub struct LocationPath {
    pub start: PathStart,
    pub steps: Vec<Step>,
}

impl LocationPath {
    pub fn new(start: PathStart, steps: Vec<Step>) -> Self {
        Self { start, steps }
    }

    pub fn evaluate<'c, N: XPathNode>(
        &'c self,
        ctx: &EvaluationContext<'c, N>,
    ) -> Result<NodeSet<N>, XPathError> {
        let nodes = self.select(ctx)?.collect()?;
        Ok(NodeSet::from_unique(nodes))
    }

    /// Whether the path selects anything; produces at most one node.
    pub fn exists<'c, N: XPathNode>(
        &'c self,
        ctx: &EvaluationContext<'c, N>,
    ) -> Result<bool, XPathError> {
        Ok(!self.select(ctx)?.is_empty()?)
    }

    fn select<'c, N: XPathNode>(
        &'c self,
        ctx: &EvaluationContext<'c, N>,
    ) -> Result<NodeSequence<'c, N>, XPathError> {
        let env = ctx.env;
        let mut current = match &self.start {
            PathStart::Root => NodeSequence::from_nodes(vec![env.root]),
            PathStart::Context => NodeSequence::from_nodes(vec![ctx.node]),
            PathStart::Filter { expr, predicates } => {
                let nodes = match expr.evaluate(ctx)? {
                    Value::NodeSet(nodes) => nodes.sorted(),
                    other => {
                        return Err(XPathError::InvalidOperand {
                            operator: "[]",
                            found: other.kind(),
                        });
                    }
                };
                let mut seq = NodeSequence::from_nodes(nodes.into_vec());
                for predicate in predicates {
                    seq = filter(seq, predicate, env);
                }
                seq
            }
        };
        for step in &self.steps {
            current = evaluate_step(step, current, env)?;
        }
        Ok(current)
    }
}

fn evaluate_step<'c, N: XPathNode + 'c>(
    step: &'c Step,
    input: NodeSequence<'c, N>,
    env: Environment<'c, N>,
) -> Result<NodeSequence<'c, N>, XPathError> {
    log::trace!("evaluating step {}", step);
    let matcher = Rc::new(step.test.matcher(step.axis, env.resolver)?);
    let output = NodeSequence::new(StepNodes {
        step,
        env,
        matcher,
        contexts: input.cursor(),
        current: None,
        seen: HashSet::new(),
    });
    if !step.axis.sorts_results() {
        return Ok(output);
    }
    let mut nodes = output.collect()?;
    sort_document_order(&mut nodes);
    Ok(NodeSequence::from_nodes(nodes))
}

/// The flattened, de-duplicated output of one step over every context node.
struct StepNodes<'c, N> {
    step: &'c Step,
    env: Environment<'c, N>,
    matcher: Rc<NodeMatcher<'c>>,
    contexts: Cursor<'c, N>,
    current: Option<Cursor<'c, N>>,
    seen: HashSet<N>,
}

impl<'c, N: XPathNode + 'c> StepNodes<'c, N> {
    /// Axis, node test and predicates for a single context node.
    fn candidates(&self, node: N) -> Cursor<'c, N> {
        let matcher = Rc::clone(&self.matcher);
        let tested = axes::walk(self.step.axis, node, self.env.root)
            .filter(move |candidate| matcher.matches(candidate))
            .map(Ok);
        let step = self.step;
        let mut seq = NodeSequence::new(tested);
        for predicate in &step.predicates {
            seq = filter(seq, predicate, self.env);
        }
        seq.cursor()
    }
}

impl<'c, N: XPathNode + 'c> Iterator for StepNodes<'c, N> {
    type Item = Result<N, XPathError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = &mut self.current {
                match current.next() {
                    Some(Ok(node)) => {
                        if self.seen.insert(node) {
                            return Some(Ok(node));
                        }
                        continue;
                    }
                    Some(Err(err)) => return Some(Err(err)),
                    None => self.current = None,
                }
            }
            match self.contexts.next()? {
                Ok(node) => self.current = Some(self.candidates(node)),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Applies one predicate to a sequence, lazily.
///
/// A number literal picks the node at that position without looking at the others. Any
/// other predicate is evaluated once per node, with the node's position and the (lazily
/// counted) size of `input` as its context. Once a number result has picked its node, the
/// remaining nodes are not visited.
fn filter<'c, N: XPathNode + 'c>(
    input: NodeSequence<'c, N>,
    predicate: &'c ExprEvaluator,
    env: Environment<'c, N>,
) -> NodeSequence<'c, N> {
    if let ExprEvaluator::Number(position) = predicate {
        let position = *position;
        log::trace!("positional predicate [{}]", position);
        if position.fract() != 0.0 || position < 1.0 {
            // Also covers NaN.
            return NodeSequence::from_nodes(Vec::new());
        }
        let index = position as usize - 1;
        let picked = std::iter::once_with(move || input.get(index)).filter_map(Result::transpose);
        return NodeSequence::new(picked);
    }

    let size = ContextSize::Lazy(input.clone());
    let kept = input
        .cursor()
        .enumerate()
        .scan(false, move |picked, (index, item)| {
            if *picked {
                return None;
            }
            let node = match item {
                Ok(node) => node,
                Err(err) => return Some(Some(Err(err))),
            };
            let ctx = EvaluationContext::with_size(node, index + 1, size.clone(), env);
            match judge(predicate, &ctx) {
                Ok(Verdict::Picked) => {
                    log::trace!("computed position {} picked", index + 1);
                    *picked = true;
                    Some(Some(Ok(node)))
                }
                Ok(Verdict::Kept) => Some(Some(Ok(node))),
                Ok(Verdict::Dropped) => Some(None),
                Err(err) => Some(Some(Err(err))),
            }
        })
        .flatten();
    NodeSequence::new(kept)
}

enum Verdict {
    /// A number result equal to the context position.
    Picked,
    Kept,
    Dropped,
}

/// A number result selects by position; anything else by its boolean value.
fn judge<'c, N: XPathNode>(
    predicate: &'c ExprEvaluator,
    ctx: &EvaluationContext<'c, N>,
) -> Result<Verdict, XPathError> {
    let kept = match predicate {
        ExprEvaluator::Path(path) => path.exists(ctx)?,
        _ => match predicate.evaluate(ctx)? {
            Value::Number(n) if n == ctx.position as f64 => return Ok(Verdict::Picked),
            Value::Number(_) => false,
            other => other.to_bool(),
        },
    };
    Ok(if kept { Verdict::Kept } else { Verdict::Dropped })
}
