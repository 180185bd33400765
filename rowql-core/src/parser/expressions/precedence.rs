//! Operator precedence chain for expression parsing.
//!
//! Precedence (lowest to highest):
//! 1. Ternary: `?:` and `a if cond else b`
//! 2. Null coalesce: `??`
//! 3. Boolean OR: `OR`, `||`
//! 4. Boolean AND: `AND`, `&&`
//! 5. Boolean NOT: `NOT`, `!`
//! 6. Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`, `IN`, `LIKE`, `IS NULL`, etc.
//! 7. Bitwise OR: `|`
//! 8. Bitwise XOR: `^`
//! 9. Bitwise AND: `&`
//! 10. Shift: `<<`, `>>`
//! 11. Additive: `+`, `-`
//! 12. Multiplicative: `*`, `/`, `//`, `%`
//! 13. Unary: `-`, `+`, `~`
//! 14. Power: `**`
//! 15. Postfix: `.`, `[]`, method calls
//! 16. Primary: literals, variables, function calls, etc.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::error::RowqlResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Parse ternary expression: `condition ? a : b` or `a if condition else b`.
    /// Lowest precedence, right-associative
    pub(super) fn parse_ternary_expression(&mut self) -> RowqlResult<Expression> {
        let first = self.parse_null_coalesce_expression()?;

        match self.current_token() {
            Token::Question => {
                self.advance(); // consume '?'
                let true_expr = self.parse_ternary_expression()?;
                self.expect(Token::Colon)?;
                let false_expr = self.parse_ternary_expression()?;
                Ok(Expression::Ternary {
                    condition: Box::new(first),
                    true_expr: Box::new(true_expr),
                    false_expr: Box::new(false_expr),
                })
            }
            Token::If => {
                self.advance(); // consume 'if'
                let condition = self.parse_null_coalesce_expression()?;
                self.expect(Token::Else)?;
                let false_expr = self.parse_ternary_expression()?;
                Ok(Expression::Ternary {
                    condition: Box::new(condition),
                    true_expr: Box::new(first),
                    false_expr: Box::new(false_expr),
                })
            }
            _ => Ok(first),
        }
    }

    /// Parse null coalescing expression: left ?? right
    fn parse_null_coalesce_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_or_expression()?;

        while matches!(self.current_token(), Token::NullCoalesce) {
            self.advance(); // consume ??
            let right = self.parse_or_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::NullCoalesce,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean OR expression
    pub(super) fn parse_or_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_and_expression()?;

        while matches!(self.current_token(), Token::Or) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean AND expression
    fn parse_and_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_not_expression()?;

        while matches!(self.current_token(), Token::And) {
            self.advance();
            let right = self.parse_not_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean NOT, which binds looser than comparisons
    fn parse_not_expression(&mut self) -> RowqlResult<Expression> {
        if matches!(self.current_token(), Token::Not) {
            self.advance();
            let operand = self.parse_not_expression()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison_expression()
    }

    /// Parse comparison expression
    pub(super) fn parse_comparison_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_bitwise_or_expression()?;

        loop {
            if matches!(self.current_token(), Token::Is) {
                left = self.parse_is_null(left)?;
                continue;
            }
            match self.parse_comparison_operator()? {
                Some(op) => {
                    let right = self.parse_bitwise_or_expression()?;
                    left = Expression::BinaryOp {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    };
                }
                None => break,
            }
        }

        Ok(left)
    }

    /// Parse bitwise OR expression
    fn parse_bitwise_or_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_bitwise_xor_expression()?;

        while matches!(self.current_token(), Token::Pipe) {
            self.advance();
            let right = self.parse_bitwise_xor_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::BitwiseOr,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse bitwise XOR expression
    fn parse_bitwise_xor_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_bitwise_and_expression()?;

        while matches!(self.current_token(), Token::Caret) {
            self.advance();
            let right = self.parse_bitwise_and_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::BitwiseXor,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse bitwise AND expression
    fn parse_bitwise_and_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_shift_expression()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.advance();
            let right = self.parse_shift_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::BitwiseAnd,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse shift expression
    fn parse_shift_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_additive_expression()?;

        while matches!(self.current_token(), Token::LeftShift | Token::RightShift) {
            let op = match self.current_token() {
                Token::LeftShift => BinaryOperator::LeftShift,
                _ => BinaryOperator::RightShift,
            };
            self.advance();
            let right = self.parse_additive_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse additive expression (+, -)
    fn parse_additive_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        while matches!(self.current_token(), Token::Plus | Token::Minus) {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                _ => BinaryOperator::Subtract,
            };
            self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse multiplicative expression (*, /, //, %)
    fn parse_multiplicative_expression(&mut self) -> RowqlResult<Expression> {
        let mut left = self.parse_unary_expression()?;

        while matches!(
            self.current_token(),
            Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent
        ) {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::DoubleSlash => BinaryOperator::FloorDivide,
                _ => BinaryOperator::Modulus,
            };
            self.advance();
            let right = self.parse_unary_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression (-, +, ~)
    pub(super) fn parse_unary_expression(&mut self) -> RowqlResult<Expression> {
        let op = match self.current_token() {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            Token::Tilde => UnaryOperator::BitwiseNot,
            _ => return self.parse_power_expression(),
        };
        self.advance();
        let operand = self.parse_unary_expression()?;

        // fold negative literals so `-1` stays a literal
        if op == UnaryOperator::Negate {
            if let Expression::Literal(serde_json::Value::Number(n)) = &operand {
                if let Some(i) = n.as_i64() {
                    if let Some(neg) = i.checked_neg() {
                        return Ok(Expression::Literal(serde_json::Value::from(neg)));
                    }
                } else if let Some(f) = n.as_f64() {
                    return Ok(Expression::Literal(serde_json::Value::from(-f)));
                }
            }
        }

        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parse power expression (right-associative, binds tighter than unary
    /// minus on its left: `-2 ** 2 == -4`)
    fn parse_power_expression(&mut self) -> RowqlResult<Expression> {
        let base = self.parse_postfix_expression()?;

        if matches!(self.current_token(), Token::DoubleStar) {
            self.advance();
            let exponent = self.parse_unary_expression()?;
            return Ok(Expression::BinaryOp {
                left: Box::new(base),
                op: BinaryOperator::Exponent,
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }
}
