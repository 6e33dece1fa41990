mod common;

use common::{XmlNode, ids, init_logger, labels};
use sprig_xpath1::syntax::build::*;
use sprig_xpath1::{Axis, Evaluator, NoNamespaces, ResultType, SyntaxNode, XPathNode};
use std::collections::HashSet;

const BOOK: &str = r#"<book n="b">
<chapter n="c1"><title n="t1">One</title><para n="p1">a</para><para n="p2">b</para></chapter>
<chapter n="c2"><title n="t2">Two</title><para n="p3">c</para><!-- note --><para n="p4">d</para></chapter>
<appendix n="x"><para n="p5">e</para></appendix>
</book>"#;

fn all_nodes<'a, 'input>(doc: &'a roxmltree::Document<'input>) -> Vec<XmlNode<'a, 'input>> {
    let mut nodes = Vec::new();
    for node in doc.descendants() {
        let node = XmlNode::Node(node);
        nodes.extend(node.namespaces());
        nodes.extend(node.attributes());
        nodes.push(node);
    }
    nodes
}

fn on_axis(axis: Axis) -> SyntaxNode {
    relative(vec![step(Some(axis.name()), node_type("node"), vec![])])
}

#[test]
fn test_axes_never_repeat_a_node() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let evaluator = Evaluator::new();
    for node in all_nodes(&doc) {
        for axis in Axis::ALL {
            let value = evaluator
                .evaluate(&on_axis(axis), node, &NoNamespaces, ResultType::NodeSet)
                .unwrap();
            let nodes = value.into_node_set().unwrap().into_vec();
            let unique: HashSet<_> = nodes.iter().collect();
            assert_eq!(unique.len(), nodes.len(), "{:?} from {:?}", axis, node);
        }
    }
}

#[test]
fn test_multi_step_paths_never_repeat_a_node() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();
    // Every para reaches the same ancestors and the same following nodes.
    let exprs = [
        absolute(vec![descendant(), child("para"), step(Some("ancestor"), wildcard(), vec![])]),
        absolute(vec![descendant(), child("para"), step(Some("following"), wildcard(), vec![])]),
        absolute(vec![descendant(), child("para"), parent_step()]),
    ];
    for expr in exprs {
        let value = evaluator
            .evaluate(&expr, root, &NoNamespaces, ResultType::NodeSet)
            .unwrap();
        let nodes = value.into_node_set().unwrap().into_vec();
        let unique: HashSet<_> = nodes.iter().collect();
        assert_eq!(unique.len(), nodes.len(), "{}", expr.text());
    }
}

#[test]
fn test_reverse_sibling_axes_yield_document_order() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let evaluator = Evaluator::new();
    for node in all_nodes(&doc) {
        for axis in [Axis::Preceding, Axis::PrecedingSibling] {
            let value = evaluator
                .evaluate(&on_axis(axis), node, &NoNamespaces, ResultType::NodeSet)
                .unwrap();
            let nodes = value.into_node_set().unwrap().into_vec();
            let mut sorted = nodes.clone();
            sorted.sort_by(|a, b| a.compare_document_order(b));
            assert_eq!(nodes, sorted, "{:?} from {:?}", axis, node);
        }
    }

    let p4 = XmlNode::Node(
        doc.descendants()
            .find(|n| n.attribute("n") == Some("p4"))
            .unwrap(),
    );
    let siblings = relative(vec![step(Some("preceding-sibling"), wildcard(), vec![])]);
    let value = evaluator
        .evaluate(&siblings, p4, &NoNamespaces, ResultType::NodeSet)
        .unwrap();
    assert_eq!(ids(value.into_node_set().unwrap().as_slice()), vec!["t2", "p3"]);
}

#[test]
fn test_positional_predicate_matches_position_comparison() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();
    let axes = [
        (None, name_test("para")),
        (Some("descendant"), wildcard()),
        (Some("preceding"), node_type("node")),
        (Some("ancestor-or-self"), node_type("node")),
    ];
    let starts = [
        root,
        XmlNode::find(&doc, "appendix"),
        XmlNode::Node(
            doc.descendants()
                .find(|n| n.attribute("n") == Some("p3"))
                .unwrap(),
        ),
    ];

    for (axis, test) in axes {
        for start in starts {
            for n in 0..8 {
                let literal = relative(vec![step(
                    axis,
                    test.clone(),
                    vec![predicate(number(n as f64))],
                )]);
                let position = relative(vec![step(
                    axis,
                    test.clone(),
                    vec![predicate(eq(call("position", vec![]), number(n as f64)))],
                )]);
                let by_literal = evaluator.evaluate_nodes(&literal, start, &NoNamespaces).unwrap();
                let by_position = evaluator
                    .evaluate_nodes(&position, start, &NoNamespaces)
                    .unwrap();
                assert_eq!(by_literal, by_position, "{}", literal.text());
            }
        }
    }
}

#[test]
fn test_union_is_idempotent_and_commutative() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();
    let paras = || absolute(vec![descendant(), child("para")]);
    let seconds = || {
        absolute(vec![
            descendant(),
            step(None, wildcard(), vec![predicate(number(2.0))]),
        ])
    };

    let alone = evaluator.evaluate_nodes(&paras(), root, &NoNamespaces).unwrap();
    let doubled = evaluator
        .evaluate_nodes(&union(paras(), paras()), root, &NoNamespaces)
        .unwrap();
    assert_eq!(alone, doubled);

    let ab = evaluator
        .evaluate(&union(paras(), seconds()), root, &NoNamespaces, ResultType::Any)
        .unwrap();
    let ba = evaluator
        .evaluate(&union(seconds(), paras()), root, &NoNamespaces, ResultType::Any)
        .unwrap();
    assert_eq!(ab, ba);
    let nodes = ab.into_node_set().unwrap();
    assert_eq!(
        ids(nodes.as_slice()),
        vec!["p1", "p2", "c2", "p3", "p4", "p5"]
    );
}

#[test]
fn test_arithmetic_with_non_numbers_is_nan() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();
    let empty = || relative(vec![child("nothing")]);
    let words = || absolute(vec![descendant(), child("title")]);

    for expr in [
        add(empty(), number(1.0)),
        sub(number(1.0), empty()),
        mul(string("seven"), number(2.0)),
        div(words(), number(2.0)),
        modulo(number(5.0), string("")),
        negate(empty()),
    ] {
        let n = evaluator.evaluate_number(&expr, root, &NoNamespaces).unwrap();
        assert!(n.is_nan(), "{}", expr.text());
        let nan_eq = eq(expr.clone(), expr.clone());
        let nan_ne = ne(expr.clone(), expr.clone());
        assert_eq!(evaluator.evaluate_boolean(&nan_eq, root, &NoNamespaces), Ok(false));
        assert_eq!(evaluator.evaluate_boolean(&nan_ne, root, &NoNamespaces), Ok(true));
    }
}

#[test]
fn test_node_set_comparisons_are_existential() {
    init_logger();
    let doc = roxmltree::Document::parse(BOOK).unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();
    let paras = || absolute(vec![descendant(), child("para")]);
    let empty = || absolute(vec![descendant(), child("nothing")]);
    let check = |expr: SyntaxNode| evaluator.evaluate_boolean(&expr, root, &NoNamespaces).unwrap();

    assert!(check(eq(paras(), string("c"))));
    assert!(!check(eq(paras(), string("z"))));
    assert!(check(ne(paras(), string("c"))));
    assert!(!check(eq(empty(), string(""))));
    assert!(!check(ne(empty(), string(""))));
    assert!(!check(eq(empty(), number(0.0))));
    assert!(!check(ne(empty(), number(0.0))));
    // Against a boolean, a node-set counts as its non-emptiness.
    assert!(check(eq(empty(), call("false", vec![]))));
    // Two node-sets compare equal when any pair of string-values does.
    let titles = absolute(vec![descendant(), child("title")]);
    let t2 = absolute(vec![
        descendant(),
        step(None, name_test("title"), vec![predicate(eq(relative(vec![attr("n")]), string("t2")))]),
    ]);
    assert!(check(eq(titles, t2)));
}

#[test]
fn test_filter_expression_over_function_result() {
    init_logger();
    let doc =
        roxmltree::Document::parse(r#"<r><i id="a" n="1"/><i id="b" n="2"/><i id="c" n="3"/></r>"#)
            .unwrap();
    let root = XmlNode::root(&doc);
    let evaluator = Evaluator::new();

    let picked = filter(call("id", vec![string("c a")]), vec![predicate(number(1.0))], vec![]);
    let nodes = evaluator.evaluate_nodes(&picked, root, &NoNamespaces).unwrap();
    assert_eq!(ids(&nodes), vec!["1"]);
    let parents = filter(call("id", vec![string("b")]), vec![], vec![parent_step()]);
    let nodes = evaluator.evaluate_nodes(&parents, root, &NoNamespaces).unwrap();
    assert_eq!(labels(&nodes), vec!["r"]);
}
