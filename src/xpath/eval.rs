//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against a document. Location steps
//! run once per input node so predicates see proximity positions relative
//! to that node; step results are merged back into document order.

use super::axes::{matches_node_test, navigate, ResolvedTest};
use super::compiler::{CompiledExpr, Op, Predicate};
use super::context::Bindings;
use super::functions;
use super::parser::{Axis, BinaryOp, NodeTest};
use super::value::{string_to_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId, NodeKind};
use crate::error::{Error, Result};

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess> {
    pub doc: &'a D,
    pub bindings: &'a Bindings,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess> EvalContext<'a, D> {
    pub fn new(doc: &'a D, bindings: &'a Bindings, context_node: NodeId) -> Self {
        EvalContext {
            doc,
            bindings,
            context_node,
            context_position: 1,
            context_size: 1,
        }
    }

    fn at(&self, context_node: NodeId, context_position: usize, context_size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            bindings: self.bindings,
            context_node,
            context_position,
            context_size,
        }
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess>(expr: &CompiledExpr, ctx: &EvalContext<'_, D>) -> Result<XPathValue> {
    let mut stack: Vec<XPathValue> = Vec::with_capacity(8);

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(ctx.doc.document_node_id())),
            Op::Context => stack.push(XPathValue::single_node(ctx.context_node)),
            Op::Number(n) => stack.push(XPathValue::Number(*n)),
            Op::String(s) => stack.push(XPathValue::String(s.clone())),
            Op::Variable(name) => {
                let value = ctx
                    .bindings
                    .variable(name)
                    .cloned()
                    .ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
                stack.push(value);
            }
            Op::Step { axis, test, predicates } => {
                let input = pop_nodeset(&mut stack, "location step")?;
                stack.push(XPathValue::NodeSet(eval_step(ctx, &input, *axis, test, predicates)?));
            }
            Op::Filter(predicate) => {
                let nodes = pop_nodeset(&mut stack, "predicate filter")?;
                stack.push(XPathValue::NodeSet(apply_predicate(ctx, nodes, predicate)?));
            }
            Op::Union => {
                let right = pop_nodeset(&mut stack, "union")?;
                let mut left = pop_nodeset(&mut stack, "union")?;
                left.extend(right);
                left.sort_unstable();
                left.dedup();
                stack.push(XPathValue::NodeSet(left));
            }
            Op::Call(name, argc) => {
                let split = stack.len().checked_sub(*argc).ok_or_else(stack_underflow)?;
                let args = stack.split_off(split);
                stack.push(functions::call(name, args, ctx)?);
            }
            Op::Logical(op, right) => {
                let left = pop(&mut stack)?.to_boolean();
                let result = match (op, left) {
                    (BinaryOp::And, false) => false,
                    (BinaryOp::Or, true) => true,
                    _ => evaluate_compiled(right, ctx)?.to_boolean(),
                };
                stack.push(XPathValue::Boolean(result));
            }
            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(binary_op(ctx.doc, *op, &left, &right));
            }
            Op::Negate => {
                let value = pop(&mut stack)?;
                stack.push(XPathValue::Number(-value.to_number(ctx.doc)));
            }
        }
    }

    pop(&mut stack)
}

fn stack_underflow() -> Error {
    Error::XPathType("malformed compiled expression".to_string())
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue> {
    stack.pop().ok_or_else(stack_underflow)
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, what: &str) -> Result<Vec<NodeId>> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(Error::XPathType(format!(
            "{} requires a node-set, got {}",
            what,
            other.type_name()
        ))),
    }
}

/// Resolve prefixes of a node test against the context bindings.
///
/// Unprefixed element names take the default element namespace, if one is
/// set; unprefixed attribute names never have a namespace.
fn resolve_test<'t>(test: &'t NodeTest, principal: NodeKind, bindings: &'t Bindings) -> Result<ResolvedTest<'t>> {
    let lookup = |prefix: &str| {
        bindings
            .lookup_ns(prefix)
            .ok_or_else(|| Error::UndefinedPrefix(prefix.to_string()))
    };
    Ok(match test {
        NodeTest::Any => ResolvedTest::Principal,
        NodeTest::Name(local) => ResolvedTest::Name {
            namespace: if principal == NodeKind::Element {
                bindings.default_element_namespace()
            } else {
                None
            },
            local,
        },
        NodeTest::QName(prefix, local) => ResolvedTest::Name {
            namespace: Some(lookup(prefix)?),
            local,
        },
        NodeTest::NamespaceWildcard(prefix) => ResolvedTest::Namespace(lookup(prefix)?),
        NodeTest::Node => ResolvedTest::Node,
        NodeTest::Text => ResolvedTest::Text,
        NodeTest::Comment => ResolvedTest::Comment,
        NodeTest::ProcessingInstruction(target) => ResolvedTest::ProcessingInstruction(target.as_deref()),
    })
}

fn eval_step<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    input: &[NodeId],
    axis: Axis,
    test: &NodeTest,
    predicates: &[Predicate],
) -> Result<Vec<NodeId>> {
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };
    let resolved = resolve_test(test, principal, ctx.bindings)?;

    let mut result = Vec::new();
    for &node in input {
        let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, axis)
            .into_iter()
            .filter(|&id| matches_node_test(ctx.doc, id, &resolved, principal))
            .collect();
        for predicate in predicates {
            candidates = apply_predicate(ctx, candidates, predicate)?;
        }
        result.extend(candidates);
    }

    if input.len() > 1 || axis.is_reverse() {
        result.sort_unstable();
        result.dedup();
    }
    Ok(result)
}

/// Keep the nodes for which the predicate holds; a number result is
/// compared with the proximity position
fn apply_predicate<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<NodeId>,
    predicate: &Predicate,
) -> Result<Vec<NodeId>> {
    match predicate {
        Predicate::Position(position) => Ok(nodes.get(position - 1).copied().into_iter().collect()),
        Predicate::Expr(expr) => {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (index, &node) in nodes.iter().enumerate() {
                let position = index + 1;
                let keep = match evaluate_compiled(expr, &ctx.at(node, position, size))? {
                    XPathValue::Number(n) => n == position as f64,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(node);
                }
            }
            Ok(kept)
        }
    }
}

fn binary_op<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> XPathValue {
    match op {
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            XPathValue::Boolean(compare(doc, op, left, right))
        }
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::Add => XPathValue::Number(left.to_number(doc) + right.to_number(doc)),
        BinaryOp::Sub => XPathValue::Number(left.to_number(doc) - right.to_number(doc)),
        BinaryOp::Mul => XPathValue::Number(left.to_number(doc) * right.to_number(doc)),
        BinaryOp::Div => XPathValue::Number(left.to_number(doc) / right.to_number(doc)),
        BinaryOp::Mod => XPathValue::Number(left.to_number(doc) % right.to_number(doc)),
    }
}

/// XPath 1.0 comparison. Node-sets compare existentially through their
/// nodes' string-values; a node-set against a boolean compares boolean(set).
fn compare<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_strings: Vec<String> = r.iter().map(|&n| doc.string_value_of(n)).collect();
            l.iter().any(|&a| {
                let a = XPathValue::String(doc.string_value_of(a));
                right_strings
                    .iter()
                    .any(|b| compare_atomic(op, &a, &XPathValue::String(b.clone())))
            })
        }
        (XPathValue::NodeSet(nodes), other) => match other {
            XPathValue::Boolean(_) => compare_atomic(op, &XPathValue::Boolean(!nodes.is_empty()), other),
            _ => nodes
                .iter()
                .any(|&n| compare_atomic(op, &node_as(doc, n, other), other)),
        },
        (other, XPathValue::NodeSet(nodes)) => match other {
            XPathValue::Boolean(_) => compare_atomic(op, other, &XPathValue::Boolean(!nodes.is_empty())),
            _ => nodes
                .iter()
                .any(|&n| compare_atomic(op, other, &node_as(doc, n, other))),
        },
        _ => compare_atomic(op, left, right),
    }
}

/// A node's string-value converted to the type of the other operand
fn node_as<D: DocumentAccess>(doc: &D, node: NodeId, other: &XPathValue) -> XPathValue {
    let value = doc.string_value_of(node);
    match other {
        XPathValue::Number(_) => XPathValue::Number(string_to_number(&value)),
        _ => XPathValue::String(value),
    }
}

/// Compare two non-node-set values
fn compare_atomic(op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let number = |v: &XPathValue| match v {
        XPathValue::Boolean(b) => f64::from(u8::from(*b)),
        XPathValue::Number(n) => *n,
        XPathValue::String(s) => string_to_number(s),
        XPathValue::NodeSet(_) => f64::NAN,
    };
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left, right) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => number(left) == number(right),
                (XPathValue::String(a), XPathValue::String(b)) => a == b,
                _ => false,
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        BinaryOp::Lt => number(left) < number(right),
        BinaryOp::LtEq => number(left) <= number(right),
        BinaryOp::Gt => number(left) > number(right),
        BinaryOp::GtEq => number(left) >= number(right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, DOCUMENT_NODE};
    use crate::xpath::compiler::compile;

    fn eval_with(doc: &Document, bindings: &Bindings, xpath: &str) -> Result<XPathValue> {
        let compiled = compile(xpath)?;
        evaluate_compiled(&compiled, &EvalContext::new(doc, bindings, DOCUMENT_NODE))
    }

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        eval_with(doc, &Bindings::default(), xpath).unwrap()
    }

    fn texts(doc: &Document, xpath: &str) -> Vec<String> {
        eval(doc, xpath)
            .into_nodeset()
            .unwrap()
            .into_iter()
            .map(|n| doc.string_value_of(n))
            .collect()
    }

    fn string(doc: &Document, xpath: &str) -> String {
        eval(doc, xpath).to_string_value(doc)
    }

    fn sample() -> Document {
        Document::parse_str(
            "<lib><shelf><book id=\"1\">A</book><book id=\"2\">B</book></shelf>\
             <shelf><book id=\"3\">C</book></shelf></lib>",
        )
        .unwrap()
    }

    #[test]
    fn test_positional_predicate_per_step() {
        let doc = sample();
        // first book of each shelf, not the first book overall
        assert_eq!(texts(&doc, "//shelf/book[1]"), vec!["A", "C"]);
        assert_eq!(texts(&doc, "(//book)[1]"), vec!["A"]);
        assert_eq!(texts(&doc, "//book[last()]"), vec!["B", "C"]);
        assert_eq!(texts(&doc, "//book[position() > 1]"), vec!["B"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = sample();
        assert_eq!(string(&doc, "name(//book[@id='2']/ancestor::*[1])"), "shelf");
        assert_eq!(texts(&doc, "//book[@id='2']/preceding-sibling::book[1]"), vec!["A"]);
        assert_eq!(texts(&doc, "//book[@id='3']/preceding::book[1]"), vec!["B"]);
    }

    #[test]
    fn test_attribute_nodes() {
        let doc = sample();
        assert_eq!(texts(&doc, "//book/@id"), vec!["1", "2", "3"]);
        assert_eq!(string(&doc, "name(//book[2]/@*)"), "id");
        assert_eq!(string(&doc, "sum(//@id)"), "6");
        assert_eq!(texts(&doc, "//@id/.."), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_comparisons() {
        let doc = sample();
        assert_eq!(eval(&doc, "//book = 'B'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//book != 'B'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//@id > 2"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//@id > 3"), XPathValue::Boolean(false));
        assert_eq!(eval(&doc, "//missing = false()"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "'1.0' = 1"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "true() = 'x'"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "number('x') != number('x')"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//shelf = //book"), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "/lib = //book"), XPathValue::Boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        let doc = sample();
        assert_eq!(string(&doc, "7 mod 3"), "1");
        assert_eq!(string(&doc, "1 div 0"), "Infinity");
        assert_eq!(string(&doc, "-(2 + 3) * 2"), "-10");
        assert_eq!(string(&doc, "count(//book) div 2"), "1.5");
    }

    #[test]
    fn test_union_in_document_order() {
        let doc = sample();
        assert_eq!(texts(&doc, "//book[@id='3'] | //book[@id='1']"), vec!["A", "C"]);
        assert!(matches!(
            eval_with(&doc, &Bindings::default(), "//book | 1"),
            Err(Error::XPathType(_))
        ));
    }

    #[test]
    fn test_logical_short_circuit() {
        let doc = sample();
        // the undefined variable is never evaluated
        assert_eq!(eval(&doc, "false() and $nope"), XPathValue::Boolean(false));
        assert_eq!(eval(&doc, "true() or $nope"), XPathValue::Boolean(true));
        assert!(matches!(
            eval_with(&doc, &Bindings::default(), "true() and $nope"),
            Err(Error::UndefinedVariable(ref v)) if v == "nope"
        ));
    }

    #[test]
    fn test_variables() {
        let doc = sample();
        let mut bindings = Bindings::default();
        bindings.set_variable("want", XPathValue::from("2"));
        let result = eval_with(&doc, &bindings, "//book[@id = $want]").unwrap();
        assert_eq!(result.as_nodeset().map(<[NodeId]>::len), Some(1));
    }

    #[test]
    fn test_namespaces() {
        let doc = Document::parse_str(r#"<r xmlns:a="urn:a"><a:x>1</a:x><x>2</x></r>"#).unwrap();
        let mut bindings = Bindings::default();
        assert!(matches!(
            eval_with(&doc, &bindings, "//q:x"),
            Err(Error::UndefinedPrefix(ref p)) if p == "q"
        ));
        bindings.set_namespace("q", "urn:a");
        let hits = eval_with(&doc, &bindings, "//q:x").unwrap();
        assert_eq!(hits.to_string_value(&doc), "1");
        let unprefixed = eval_with(&doc, &bindings, "//x").unwrap();
        assert_eq!(unprefixed.to_string_value(&doc), "2");
        assert_eq!(eval_with(&doc, &bindings, "count(//q:*)").unwrap(), XPathValue::Number(1.0));
    }

    #[test]
    fn test_node_type_tests() {
        let doc = Document::parse_str("<r><!--c--><?pi d?>t<![CDATA[u]]></r>").unwrap();
        assert_eq!(string(&doc, "count(/r/node())"), "4");
        assert_eq!(string(&doc, "count(/r/text())"), "2");
        assert_eq!(string(&doc, "/r/comment()"), "c");
        assert_eq!(string(&doc, "count(/r/processing-instruction('pi'))"), "1");
        assert_eq!(string(&doc, "count(/r/processing-instruction('other'))"), "0");
        assert_eq!(string(&doc, "string(/r)"), "tu");
    }

    #[test]
    fn test_relative_and_root() {
        let doc = sample();
        assert_eq!(eval(&doc, "count(/)"), XPathValue::Number(1.0));
        assert_eq!(texts(&doc, "lib/shelf[2]/book"), vec!["C"]);
        assert_eq!(string(&doc, "name(/*)"), "lib");
    }
}
