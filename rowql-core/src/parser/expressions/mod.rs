//! Expression parsing methods.
//!
//! - `precedence`: Operator precedence chain (ternary → logical → comparison → bitwise → arithmetic)
//! - `operators`: Comparison operator parsing
//! - `primary`: Primary expressions, postfix operations, item access
//! - `special`: CASE, object and array construction

mod operators;
mod precedence;
mod primary;
mod special;

use crate::ast::Expression;
use crate::error::RowqlResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Entry point for expression parsing
    pub(crate) fn parse_expression(&mut self) -> RowqlResult<Expression> {
        self.parse_ternary_expression()
    }

    /// Parse function call arguments: (arg1, arg2, ...)
    /// Assumes the opening '(' has already been consumed.
    pub(super) fn parse_function_call_args(&mut self) -> RowqlResult<Vec<Expression>> {
        let mut args = Vec::new();

        while !matches!(self.current_token(), Token::RightParen | Token::Eof) {
            args.push(self.parse_expression()?);

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightParen)?;
        Ok(args)
    }

    /// Field name after a '.', keywords included (`x.end`, `row.in`).
    pub(super) fn get_field_name(&self) -> Option<String> {
        match self.current_token() {
            Token::Identifier(name) => Some(name.clone()),
            Token::And => Some("and".to_string()),
            Token::Or => Some("or".to_string()),
            Token::Not => Some("not".to_string()),
            Token::In => Some("in".to_string()),
            Token::Is => Some("is".to_string()),
            Token::Like => Some("like".to_string()),
            Token::If => Some("if".to_string()),
            Token::Case => Some("case".to_string()),
            Token::When => Some("when".to_string()),
            Token::Then => Some("then".to_string()),
            Token::Else => Some("else".to_string()),
            Token::End => Some("end".to_string()),
            _ => None,
        }
    }
}
