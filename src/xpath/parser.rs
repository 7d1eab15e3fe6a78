//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.
//! Errors carry the byte offset of the offending token.

use super::functions;
use super::lexer::{Lexer, Token};
use crate::error::{Error, Result};

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Current context node, start of a relative path
    Context,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Location step applied to every node of the left expression
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    /// Variable reference
    Variable(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number proximity positions nearest-first
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Matches any node of the axis' principal type (*)
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:localname
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text and CDATA nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs, optionally by target
    ProcessingInstruction(Option<String>),
}

/// XPath parser over a pre-lexed token list
pub struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
}

impl Parser {
    /// Create a new parser
    pub fn new(input: &str) -> Result<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser { tokens, index: 0 })
    }

    /// Parse the complete input as one expression
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if *self.current() != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.index).map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.index + 1).map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        match self.tokens.get(self.index) {
            Some((_, pos)) => *pos,
            None => self.tokens.last().map(|(_, pos)| *pos).unwrap_or(0),
        }
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if *self.current() == token {
            self.advance();
            Ok(())
        } else {
            Err(Error::syntax(format!("expected {}", what), self.position()))
        }
    }

    fn unexpected(&self) -> Error {
        let message = match self.current() {
            Token::Eof => "unexpected end of expression".to_string(),
            token => format!("unexpected token {:?}", token),
        };
        Error::syntax(message, self.position())
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;
        while *self.current() == Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality_expr()?;
        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            // A star after a complete operand is always multiplication
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        if *self.current() == Token::Minus {
            self.advance();
            let inner = self.parse_unary_expr()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union_expr()
    }

    fn parse_union_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_path_expr()?;
        while *self.current() == Token::Pipe {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Whether the current token can begin a location step
    fn at_step_start(&self) -> bool {
        match self.current() {
            Token::Dot | Token::DoubleDot | Token::At | Token::Axis(_) | Token::NodeType(_) | Token::Star => true,
            Token::Name(_) | Token::NameTest(_) => *self.peek() != Token::LeftParen,
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr> {
        match self.current() {
            Token::Slash => {
                self.advance();
                if self.at_step_start() {
                    let step = self.parse_step()?;
                    self.parse_relative_path(Expr::Path(Box::new(Expr::Root), Box::new(step)))
                } else {
                    Ok(Expr::Root)
                }
            }
            Token::DoubleSlash => {
                self.advance();
                let base = descendant_or_self(Expr::Root);
                let step = self.parse_step()?;
                self.parse_relative_path(Expr::Path(Box::new(base), Box::new(step)))
            }
            _ if self.at_step_start() => {
                let step = self.parse_step()?;
                self.parse_relative_path(Expr::Path(Box::new(Expr::Context), Box::new(step)))
            }
            _ => {
                let filter = self.parse_filter_expr()?;
                self.parse_relative_path(filter)
            }
        }
    }

    /// Continue a path with `/step` and `//step` segments
    fn parse_relative_path(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(descendant_or_self(expr)), Box::new(step));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_filter_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary_expr()?;
        while *self.current() == Token::LeftBracket {
            let predicate = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(predicate));
        }
        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        self.expect(Token::LeftBracket, "'['")?;
        let predicate = self.parse_expr()?;
        self.expect(Token::RightBracket, "']'")?;
        Ok(predicate)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(expr)
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance();
                let name = match self.current() {
                    Token::Name(name) | Token::NameTest(name) if !name.ends_with(":*") => name.clone(),
                    _ => return Err(Error::syntax("expected variable name after '$'", self.position())),
                };
                self.advance();
                Ok(Expr::Variable(name))
            }
            Token::Name(name) | Token::NameTest(name) if *self.peek() == Token::LeftParen => {
                let position = self.position();
                let (min, max) = functions::arity(&name).ok_or_else(|| Error::UnknownFunction(name.clone()))?;
                self.advance();
                let args = self.parse_function_args()?;
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(Error::syntax(
                        format!("wrong number of arguments for {}(): {}", name, args.len()),
                        position,
                    ));
                }
                Ok(Expr::Function(name, args))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(Token::LeftParen, "'('")?;
        let mut args = Vec::new();
        if *self.current() == Token::RightParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.current() {
                Token::Comma => self.advance(),
                Token::RightParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(Error::syntax("expected ',' or ')' in argument list", self.position())),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step> {
        match self.current() {
            Token::Dot => {
                self.advance();
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let axis = match self.current().clone() {
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(&name)
                    .ok_or_else(|| Error::syntax(format!("unknown axis '{}'", name), self.position()))?;
                self.advance();
                self.expect(Token::DoubleColon, "'::'")?;
                axis
            }
            _ => Axis::Child,
        };

        let mut step = Step::new(axis, self.parse_node_test()?);
        while *self.current() == Token::LeftBracket {
            step.predicates.push(self.parse_predicate()?);
        }
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest> {
        let test = match self.current().clone() {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name),
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname),
            },
            Token::NodeType(kind) => {
                self.advance();
                self.expect(Token::LeftParen, "'('")?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match self.current() {
                            Token::String(target) => Some(target.clone()),
                            _ => None,
                        };
                        if target.is_some() {
                            self.advance();
                        }
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(Token::RightParen, "')'")?;
                return Ok(test);
            }
            _ => return Err(Error::syntax("expected a node test", self.position())),
        };
        self.advance();
        Ok(test)
    }
}

/// `expr//` is shorthand for `expr/descendant-or-self::node()/`
fn descendant_or_self(expr: Expr) -> Expr {
    Expr::Path(Box::new(expr), Box::new(Step::new(Axis::DescendantOrSelf, NodeTest::Node)))
}

/// Parse an XPath expression
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}
