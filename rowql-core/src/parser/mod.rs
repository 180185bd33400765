//! Parser for row expressions.
//!
//! Converts the token stream of one clause expression (or a comma-separated
//! list of them) into an [`Expression`] tree.

mod expressions;

use crate::ast::Expression;
use crate::error::{RowqlError, RowqlResult};
use crate::lexer::{Lexer, Token};

/// Parser for row expressions
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    /// Create a new parser from an input string
    pub fn new(input: &str) -> RowqlResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Get the current token
    pub(crate) fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    /// Peek at a token at a given offset from the current position
    pub(crate) fn peek_token(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.position + offset)
            .unwrap_or(&Token::Eof)
    }

    /// Advance to the next token
    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Expect a specific token and advance, or return an error
    pub(crate) fn expect(&mut self, expected: Token) -> RowqlResult<()> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(RowqlError::SyntaxError(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn expect_end(&self) -> RowqlResult<()> {
        match self.current_token() {
            Token::Eof => Ok(()),
            other => Err(RowqlError::SyntaxError(format!(
                "Unexpected token after expression: {:?}",
                other
            ))),
        }
    }

    /// Parse a single, complete expression
    pub fn parse(&mut self) -> RowqlResult<Expression> {
        if matches!(self.current_token(), Token::Eof) {
            return Err(RowqlError::SyntaxError("empty expression".to_string()));
        }
        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse a comma-separated list of expressions
    pub fn parse_list(&mut self) -> RowqlResult<Vec<Expression>> {
        let mut exprs = Vec::new();
        loop {
            if matches!(self.current_token(), Token::Eof | Token::Comma) {
                return Err(RowqlError::SyntaxError("empty expression".to_string()));
            }
            exprs.push(self.parse_expression()?);
            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_end()?;
        Ok(exprs)
    }
}

/// Parse one expression.
pub fn parse(input: &str) -> RowqlResult<Expression> {
    Parser::new(input)?.parse()
}

/// Parse a comma-separated expression list.
pub fn parse_list(input: &str) -> RowqlResult<Vec<Expression>> {
    Parser::new(input)?.parse_list()
}
