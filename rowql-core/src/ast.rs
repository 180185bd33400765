//! Abstract syntax tree for row expressions.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Value),

    /// Variable reference (e.g., row_number, _names, an imported module alias)
    Variable(String),

    /// Positional column of the current row (`_values[2]`)
    Column(usize),

    /// Field access (e.g., row.name)
    FieldAccess(Box<Expression>, String),

    /// Item access (e.g., x[0], x['key'], x[-1])
    Index(Box<Expression>, Box<Expression>),

    /// Slice (e.g., x[1:3], x[:2])
    Slice {
        base: Box<Expression>,
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
    },

    /// Binary operation
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// `x IS NULL` / `x IS NOT NULL`
    IsNull {
        operand: Box<Expression>,
        negated: bool,
    },

    /// Object construction
    Object(Vec<(Expression, Expression)>),

    /// Array construction (also tuples)
    Array(Vec<Expression>),

    /// Function call (e.g., upper(x), sum_agg(col1))
    FunctionCall { name: String, args: Vec<Expression> },

    /// Method-style call (e.g., x.upper(), re.sub(p, r, s))
    MethodCall {
        receiver: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },

    /// Ternary conditional (condition ? true_expr : false_expr, or
    /// true_expr if condition else false_expr)
    Ternary {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },

    /// CASE expression
    /// Simple form: CASE expr WHEN val1 THEN res1 ... ELSE default END
    /// Searched form: CASE WHEN cond1 THEN res1 ... ELSE default END
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,

    // Logical
    And,
    Or,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulus,
    Exponent,

    // String matching
    Like,
    NotLike,

    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,

    // Null coalescing
    NullCoalesce,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::FloorDivide => "//",
            BinaryOperator::Modulus => "%",
            BinaryOperator::Exponent => "**",
            BinaryOperator::Like => "like",
            BinaryOperator::NotLike => "not like",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::NullCoalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    BitwiseNot,
}

impl Expression {
    /// Visit this expression and all sub-expressions, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Literal(_) | Expression::Variable(_) | Expression::Column(_) => {}
            Expression::FieldAccess(base, _) => base.walk(visit),
            Expression::Index(base, index) => {
                base.walk(visit);
                index.walk(visit);
            }
            Expression::Slice { base, start, end } => {
                base.walk(visit);
                if let Some(s) = start {
                    s.walk(visit);
                }
                if let Some(e) = end {
                    e.walk(visit);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::UnaryOp { operand, .. } | Expression::IsNull { operand, .. } => {
                operand.walk(visit)
            }
            Expression::Object(entries) => {
                for (k, v) in entries {
                    k.walk(visit);
                    v.walk(visit);
                }
            }
            Expression::Array(items) => items.iter().for_each(|e| e.walk(visit)),
            Expression::FunctionCall { args, .. } => args.iter().for_each(|e| e.walk(visit)),
            Expression::MethodCall { receiver, args, .. } => {
                receiver.walk(visit);
                args.iter().for_each(|e| e.walk(visit));
            }
            Expression::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                condition.walk(visit);
                true_expr.walk(visit);
                false_expr.walk(visit);
            }
            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(op) = operand {
                    op.walk(visit);
                }
                for (w, t) in when_clauses {
                    w.walk(visit);
                    t.walk(visit);
                }
                if let Some(e) = else_clause {
                    e.walk(visit);
                }
            }
        }
    }

    /// Sub-expressions that are only evaluated for some rows: ternary and
    /// CASE branches and the right side of short-circuit operators.
    pub fn conditional_branches(&self) -> Vec<&Expression> {
        let mut branches = Vec::new();
        self.walk(&mut |expr| match expr {
            Expression::Ternary {
                true_expr,
                false_expr,
                ..
            } => {
                branches.push(true_expr.as_ref());
                branches.push(false_expr.as_ref());
            }
            Expression::Case {
                when_clauses,
                else_clause,
                ..
            } => {
                // the first WHEN condition always runs
                for (i, (cond, result)) in when_clauses.iter().enumerate() {
                    if i > 0 {
                        branches.push(cond);
                    }
                    branches.push(result);
                }
                if let Some(e) = else_clause {
                    branches.push(e.as_ref());
                }
            }
            Expression::BinaryOp {
                op: BinaryOperator::And | BinaryOperator::Or | BinaryOperator::NullCoalesce,
                right,
                ..
            } => branches.push(right.as_ref()),
            _ => {}
        });
        branches
    }

    /// Names of every function called in this expression.
    pub fn called_functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.walk(&mut |expr| match expr {
            Expression::FunctionCall { name, .. } | Expression::MethodCall { name, .. } => {
                names.push(name.as_str())
            }
            _ => {}
        });
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_called_functions() {
        let expr = Expression::BinaryOp {
            left: Box::new(call("sum_agg", vec![Expression::Column(0)])),
            op: BinaryOperator::Add,
            right: Box::new(call("upper", vec![Expression::Literal(json!("a"))])),
        };
        assert_eq!(expr.called_functions(), vec!["sum_agg", "upper"]);
    }

    #[test]
    fn test_conditional_branches() {
        let expr = Expression::Ternary {
            condition: Box::new(Expression::Column(0)),
            true_expr: Box::new(call("sum_agg", vec![Expression::Column(1)])),
            false_expr: Box::new(Expression::Literal(json!(0))),
        };
        let branches = expr.conditional_branches();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].called_functions(), vec!["sum_agg"]);
    }
}
