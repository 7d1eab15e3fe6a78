//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens.
//!
//! `*` and the names `and`, `or`, `mod`, `div` are operators only where an
//! operator can appear, i.e. after a token that ends an operand. Elsewhere
//! they are a name test.

use crate::error::{Error, Result};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * (multiply or name test, see Lexer)
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:* or prefix:local
    NodeType(String), // node(), text(), comment(), processing-instruction()

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Byte offset where the last returned token starts
    start: usize,
    /// True when the next token starts an operand rather than an operator
    expect_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            start: 0,
            expect_operand: true,
        }
    }

    /// Offset of the token most recently returned by `next_token`
    pub fn position(&self) -> usize {
        self.start
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip XPath whitespace (space, tab, CR, LF)
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.pos;
        let token = self.scan()?;
        self.expect_operand = match token {
            Token::Star => !self.expect_operand,
            Token::RightParen
            | Token::RightBracket
            | Token::Number(_)
            | Token::String(_)
            | Token::Name(_)
            | Token::NameTest(_)
            | Token::Dot
            | Token::DoubleDot => false,
            _ => true,
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.advance(1);
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(Token::Slash)
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Ok(Token::DoubleDot)
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    Ok(self.read_number())
                } else {
                    self.single(Token::Dot)
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(Error::syntax("expected '=' after '!'", self.pos))
                }
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Ok(Token::LtEq)
                } else {
                    Ok(Token::Lt)
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Ok(Token::GtEq)
                } else {
                    Ok(Token::Gt)
                }
            }
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(Error::syntax("unexpected ':'", self.pos))
                }
            }
            '"' | '\'' => self.read_string(c),
            '0'..='9' => Ok(self.read_number()),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => Err(Error::syntax(format!("unexpected character '{}'", c), self.pos)),
        }
    }

    /// Read a number literal: `digits[.digits]` or `.digits`
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.skip_digits();
        if self.peek() == Some('.') {
            self.advance(1);
            self.skip_digits();
        }
        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
    }

    /// Read a string literal delimited by `quote`
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let open = self.pos;
        self.advance(1);
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.remaining()[..len].to_string();
                self.advance(len + 1);
                Ok(Token::String(value))
            }
            None => Err(Error::syntax("unterminated string literal", open)),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name, operator keyword, axis name, node type or QName test
    fn read_name_or_keyword(&mut self) -> Result<Token> {
        let name = self.read_ncname();

        if !self.expect_operand {
            match name {
                "and" => return Ok(Token::And),
                "or" => return Ok(Token::Or),
                "mod" => return Ok(Token::Mod),
                "div" => return Ok(Token::Div),
                _ => {}
            }
        }

        // Lookahead past whitespace without consuming it
        let after = self.remaining().trim_start_matches([' ', '\t', '\r', '\n']);
        if after.starts_with("::") {
            return Ok(Token::Axis(name.to_string()));
        }
        if after.starts_with('(') {
            return Ok(match name {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name.to_string()),
                _ => Token::Name(name.to_string()),
            });
        }

        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            let colon = self.pos;
            self.advance(1);
            if self.peek() == Some('*') {
                self.advance(1);
                return Ok(Token::NameTest(format!("{}:*", name)));
            }
            if !self.peek().is_some_and(is_name_start_char) {
                return Err(Error::syntax("expected local name after prefix", colon + 1));
            }
            let local = self.read_ncname();
            return Ok(Token::NameTest(format!("{}:{}", name, local)));
        }

        Ok(Token::Name(name.to_string()))
    }

    /// Tokenize the entire input, pairing each token with its offset.
    /// The last entry is always `Token::Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, self.start));
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
