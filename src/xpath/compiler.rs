//! XPath Expression Compiler
//!
//! Lowers the parsed AST into a flat op list for the stack evaluator.
//! Compiled expressions hold no document or binding state, so one compiled
//! expression can be cached and shared across documents and threads.

use super::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::Result;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the step result
    Step {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<Predicate>,
    },
    /// Filter the node-set on top of the stack, in document order
    Filter(Predicate),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Variable reference
    Variable(String),
    /// Call function with the given argument count
    Call(String, usize),
    /// `and` / `or`: the right operand only runs when the left does not
    /// decide the result
    Logical(BinaryOp, Box<CompiledExpr>),
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
}

/// Compiled predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Literal `[n]`: keep the node at proximity position n
    Position(usize),
    Expr(CompiledExpr),
}

impl CompiledExpr {
    /// Compile a parsed expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Context => ops.push(Op::Context),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op @ (BinaryOp::And | BinaryOp::Or), right) => {
                Self::compile_expr(left, ops);
                ops.push(Op::Logical(*op, Box::new(CompiledExpr::compile(right))));
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                ops.push(Self::compile_step(step));
            }
            Expr::Filter(base, predicate) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Filter(compile_predicate(predicate)));
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step) -> Op {
        Op::Step {
            axis: step.axis,
            test: step.node_test.clone(),
            predicates: step.predicates.iter().map(compile_predicate).collect(),
        }
    }
}

/// `[n]` with a positive integer literal skips predicate evaluation
fn compile_predicate(expr: &Expr) -> Predicate {
    match expr {
        Expr::Number(n) if *n >= 1.0 && n.fract() == 0.0 && *n <= usize::MAX as f64 => {
            Predicate::Position(*n as usize)
        }
        other => Predicate::Expr(CompiledExpr::compile(other)),
    }
}

/// Parse and compile an XPath expression
pub fn compile(xpath: &str) -> Result<CompiledExpr> {
    let expr = parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}
