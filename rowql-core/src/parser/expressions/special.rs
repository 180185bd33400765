//! Special expression constructs: CASE, object and array construction.

use crate::ast::Expression;
use crate::error::{RowqlError, RowqlResult};
use crate::lexer::Token;
use crate::parser::Parser;
use serde_json::Value;

impl Parser {
    /// Parse CASE expression (simple or searched form)
    pub(super) fn parse_case_expression(&mut self) -> RowqlResult<Expression> {
        self.advance(); // consume CASE

        let operand = if matches!(self.current_token(), Token::When) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut when_clauses = Vec::new();
        while matches!(self.current_token(), Token::When) {
            self.advance(); // consume WHEN
            let condition = self.parse_expression()?;
            self.expect(Token::Then)?;
            let result = self.parse_expression()?;
            when_clauses.push((condition, result));
        }

        if when_clauses.is_empty() {
            return Err(RowqlError::SyntaxError(
                "CASE expression requires at least one WHEN clause".to_string(),
            ));
        }

        let else_clause = if matches!(self.current_token(), Token::Else) {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect(Token::End)?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parse object literal: { key: value, ... }. A bare identifier key is
    /// taken as the key name; any other key is an expression.
    pub(super) fn parse_object_expression(&mut self) -> RowqlResult<Expression> {
        self.advance(); // consume '{'

        let mut entries = Vec::new();

        while !matches!(self.current_token(), Token::RightBrace | Token::Eof) {
            let key = match (self.current_token().clone(), self.peek_token(1)) {
                (Token::Identifier(name), Token::Colon) => {
                    self.advance();
                    Expression::Literal(Value::String(name))
                }
                _ => self.parse_expression()?,
            };

            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightBrace)?;
        Ok(Expression::Object(entries))
    }

    /// Parse array literal: [a, b, ...]
    pub(super) fn parse_array_expression(&mut self) -> RowqlResult<Expression> {
        self.advance(); // consume '['

        let mut items = Vec::new();
        while !matches!(self.current_token(), Token::RightBracket | Token::Eof) {
            items.push(self.parse_expression()?);
            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightBracket)?;
        Ok(Expression::Array(items))
    }
}
