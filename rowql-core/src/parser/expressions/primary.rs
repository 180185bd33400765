//! Primary expression parsing.
//!
//! Handles:
//! - Literals: integers, floats, strings, booleans, null
//! - Variables and identifiers
//! - Function calls
//! - Parenthesized expressions and tuples
//! - Postfix operations: field access (.), method calls, item access and slices ([])

use crate::ast::Expression;
use crate::error::{RowqlError, RowqlResult};
use crate::lexer::Token;
use crate::parser::Parser;
use serde_json::Value;

impl Parser {
    /// Parse postfix expression: field access, method calls, item access
    pub(super) fn parse_postfix_expression(&mut self) -> RowqlResult<Expression> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            match self.current_token() {
                Token::Dot => {
                    expr = self.parse_field_access(expr)?;
                }
                Token::LeftBracket => {
                    expr = self.parse_bracket_access(expr)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse field access `expr.field` or method call `expr.name(args)`
    fn parse_field_access(&mut self, base: Expression) -> RowqlResult<Expression> {
        self.advance(); // consume '.'

        let Some(field_name) = self.get_field_name() else {
            return Err(RowqlError::SyntaxError(
                "Expected field name after '.'".to_string(),
            ));
        };
        self.advance();

        if matches!(self.current_token(), Token::LeftParen) {
            self.advance(); // consume '('
            let args = self.parse_function_call_args()?;
            return Ok(Expression::MethodCall {
                receiver: Box::new(base),
                name: field_name,
                args,
            });
        }

        Ok(Expression::FieldAccess(Box::new(base), field_name))
    }

    /// Parse bracket access: expr[index] or expr[start:end]
    fn parse_bracket_access(&mut self, base: Expression) -> RowqlResult<Expression> {
        self.advance(); // consume '['

        let start = if matches!(self.current_token(), Token::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if matches!(self.current_token(), Token::Colon) {
            self.advance(); // consume ':'
            let end = if matches!(self.current_token(), Token::RightBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(Token::RightBracket)?;
            return Ok(Expression::Slice {
                base: Box::new(base),
                start: start.map(Box::new),
                end,
            });
        }

        self.expect(Token::RightBracket)?;
        let index_expr = start.ok_or_else(|| {
            RowqlError::SyntaxError("Expected index expression inside []".to_string())
        })?;

        // `_values[i]` is a direct column reference
        if let (Expression::Variable(name), Expression::Literal(Value::Number(n))) =
            (&base, &index_expr)
        {
            if name == "_values" {
                if let Some(i) = n.as_u64() {
                    return Ok(Expression::Column(i as usize));
                }
            }
        }

        Ok(match index_expr {
            Expression::Literal(Value::String(s)) => Expression::FieldAccess(Box::new(base), s),
            other => Expression::Index(Box::new(base), Box::new(other)),
        })
    }

    /// Parse primary expression (highest precedence)
    pub(super) fn parse_primary_expression(&mut self) -> RowqlResult<Expression> {
        match self.current_token() {
            Token::Identifier(name) => self.parse_identifier_expression(name.clone()),
            Token::Integer(n) => self.parse_integer(*n),
            Token::Float(f) => self.parse_float(*f),
            Token::String(s) => self.parse_string(s.clone()),
            Token::True => self.parse_boolean(true),
            Token::False => self.parse_boolean(false),
            Token::Null => self.parse_null(),
            Token::LeftBrace => self.parse_object_expression(),
            Token::LeftBracket => self.parse_array_expression(),
            Token::LeftParen => self.parse_parenthesized_expression(),
            Token::Case => self.parse_case_expression(),
            Token::Eof => Err(RowqlError::SyntaxError(
                "Unexpected end of expression".to_string(),
            )),
            _ => Err(RowqlError::SyntaxError(format!(
                "Unexpected token in expression: {:?}",
                self.current_token()
            ))),
        }
    }

    /// Parse identifier: variable or function call
    fn parse_identifier_expression(&mut self, name: String) -> RowqlResult<Expression> {
        self.advance();

        if matches!(self.current_token(), Token::LeftParen) {
            self.advance(); // consume '('
            let args = self.parse_function_call_args()?;
            Ok(Expression::FunctionCall { name, args })
        } else {
            Ok(Expression::Variable(name))
        }
    }

    /// Parse integer literal
    fn parse_integer(&mut self, n: i64) -> RowqlResult<Expression> {
        self.advance();
        Ok(Expression::Literal(Value::Number(serde_json::Number::from(n))))
    }

    /// Parse float literal
    fn parse_float(&mut self, f: f64) -> RowqlResult<Expression> {
        self.advance();
        serde_json::Number::from_f64(f)
            .map(|n| Expression::Literal(Value::Number(n)))
            .ok_or_else(|| RowqlError::SyntaxError(format!("Invalid float literal: {}", f)))
    }

    /// Parse string literal
    fn parse_string(&mut self, s: String) -> RowqlResult<Expression> {
        self.advance();
        Ok(Expression::Literal(Value::String(s)))
    }

    /// Parse boolean literal
    fn parse_boolean(&mut self, value: bool) -> RowqlResult<Expression> {
        self.advance();
        Ok(Expression::Literal(Value::Bool(value)))
    }

    /// Parse null literal
    fn parse_null(&mut self) -> RowqlResult<Expression> {
        self.advance();
        Ok(Expression::Literal(Value::Null))
    }

    /// Parse `(expr)`, a tuple `(a, b)` / `(a,)`, or the empty tuple `()`
    fn parse_parenthesized_expression(&mut self) -> RowqlResult<Expression> {
        self.advance(); // consume '('

        if matches!(self.current_token(), Token::RightParen) {
            self.advance();
            return Ok(Expression::Array(Vec::new()));
        }

        let first = self.parse_expression()?;
        if !matches!(self.current_token(), Token::Comma) {
            self.expect(Token::RightParen)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while matches!(self.current_token(), Token::Comma) {
            self.advance();
            if matches!(self.current_token(), Token::RightParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(Token::RightParen)?;
        Ok(Expression::Array(items))
    }
}
