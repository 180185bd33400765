//! Comparison operator parsing.
//!
//! Handles operators:
//! - Equality: `==`, `!=`, `<>`
//! - Relational: `<`, `<=`, `>`, `>=`
//! - Membership: `IN`, `NOT IN`
//! - Pattern matching: `LIKE`, `NOT LIKE`
//! - Null tests: `IS NULL`, `IS NOT NULL`

use crate::ast::{BinaryOperator, Expression};
use crate::error::{RowqlError, RowqlResult};
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Parse a comparison operator if present.
    /// Returns Some(operator) if found, None otherwise.
    pub(super) fn parse_comparison_operator(&mut self) -> RowqlResult<Option<BinaryOperator>> {
        let op = match self.current_token() {
            Token::Equal | Token::Assign => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::LessThan => BinaryOperator::LessThan,
            Token::LessThanEq => BinaryOperator::LessThanOrEqual,
            Token::GreaterThan => BinaryOperator::GreaterThan,
            Token::GreaterThanEq => BinaryOperator::GreaterThanOrEqual,
            Token::In => BinaryOperator::In,
            Token::Like => BinaryOperator::Like,
            Token::Not => return Ok(self.parse_negated_operator()),
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(op))
    }

    /// Parse negated operators: NOT LIKE, NOT IN
    fn parse_negated_operator(&mut self) -> Option<BinaryOperator> {
        let op = match self.peek_token(1) {
            Token::Like => BinaryOperator::NotLike,
            Token::In => BinaryOperator::NotIn,
            _ => return None,
        };
        self.advance(); // consume NOT
        self.advance(); // consume LIKE / IN
        Some(op)
    }

    /// Parse `IS [NOT] NULL` after `operand`
    pub(super) fn parse_is_null(&mut self, operand: Expression) -> RowqlResult<Expression> {
        self.advance(); // consume IS
        let negated = if matches!(self.current_token(), Token::Not) {
            self.advance();
            true
        } else {
            false
        };
        if !matches!(self.current_token(), Token::Null) {
            return Err(RowqlError::SyntaxError(format!(
                "Expected NULL after IS, got {:?}",
                self.current_token()
            )));
        }
        self.advance();
        Ok(Expression::IsNull {
            operand: Box::new(operand),
            negated,
        })
    }
}
