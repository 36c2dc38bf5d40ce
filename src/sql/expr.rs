//! Typed SQL expression nodes.
//!
//! Identifiers and aliases are `&'static str` so only names written in this
//! crate ever reach the rendered SQL. Caller-supplied values go through named
//! parameters, never literals.

use std::{
    fmt,
    ops::{Add, Div, Mul, Rem, Sub},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Eq,
}

impl BinOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Gt => ">",
            Self::Eq => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    /// Interval literal such as `0 s`, rendered as `interval '0 s'`.
    Interval(&'static str),
    Null,
}

/// Window a window function is evaluated over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    Spec {
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
    },
    /// Reference to a window declared in the `WINDOW` clause.
    Named(&'static str),
}

impl Window {
    #[must_use]
    pub fn partition_by(partition_by: Vec<Expr>) -> Self {
        Self::Spec {
            partition_by,
            order_by: Vec::new(),
        }
    }

    #[must_use]
    pub fn order_by(self, order: Vec<Expr>) -> Self {
        match self {
            Self::Spec { partition_by, .. } => Self::Spec {
                partition_by,
                order_by: order,
            },
            named @ Self::Named(_) => named,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Spec {
                partition_by,
                order_by,
            } => {
                f.write_str("(")?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY {}", List(partition_by))?;
                }
                if !order_by.is_empty() {
                    if !partition_by.is_empty() {
                        f.write_str(" ")?;
                    }
                    write!(f, "ORDER BY {}", List(order_by))?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Column(&'static str),
    Qualified(&'static str, &'static str),
    /// `*`, only meaningful as a select item or inside `count(*)`.
    Wildcard,
    Param(&'static str),
    Literal(Literal),
    Func(&'static str, Vec<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Over(Box<Expr>, Window),
    Case {
        when: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    IsNotNull(Box<Expr>),
    Labeled(Box<Expr>, &'static str),
}

#[must_use]
pub const fn col(name: &'static str) -> Expr {
    Expr::Column(name)
}

#[must_use]
pub const fn qcol(table: &'static str, name: &'static str) -> Expr {
    Expr::Qualified(table, name)
}

#[must_use]
pub const fn param(name: &'static str) -> Expr {
    Expr::Param(name)
}

#[must_use]
pub const fn int(value: i64) -> Expr {
    Expr::Literal(Literal::Int(value))
}

#[must_use]
pub const fn interval(value: &'static str) -> Expr {
    Expr::Literal(Literal::Interval(value))
}

#[must_use]
pub const fn null() -> Expr {
    Expr::Literal(Literal::Null)
}

#[must_use]
pub fn func(name: &'static str, args: Vec<Expr>) -> Expr {
    Expr::Func(name, args)
}

#[must_use]
pub fn max(expr: Expr) -> Expr {
    func("max", vec![expr])
}

#[must_use]
pub fn min(expr: Expr) -> Expr {
    func("min", vec![expr])
}

#[must_use]
pub fn sum(expr: Expr) -> Expr {
    func("sum", vec![expr])
}

#[must_use]
pub fn lead(expr: Expr) -> Expr {
    func("lead", vec![expr])
}

#[must_use]
pub fn greatest(lhs: Expr, rhs: Expr) -> Expr {
    func("greatest", vec![lhs, rhs])
}

#[must_use]
pub fn int8larger(lhs: Expr, rhs: Expr) -> Expr {
    func("int8larger", vec![lhs, rhs])
}

#[must_use]
pub fn row_number() -> Expr {
    func("row_number", Vec::new())
}

#[must_use]
pub fn count_star() -> Expr {
    func("count", vec![Expr::Wildcard])
}

#[must_use]
pub fn to_json(expr: Expr) -> Expr {
    func("to_json", vec![expr])
}

/// `CASE WHEN when THEN then ELSE otherwise END`
#[must_use]
pub fn case_when(when: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::Case {
        when: Box::new(when),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }
}

impl Expr {
    fn binary(self, op: BinOp, rhs: Self) -> Self {
        Self::Binary(Box::new(self), op, Box::new(rhs))
    }

    #[must_use]
    pub fn greater_than(self, rhs: Self) -> Self {
        self.binary(BinOp::Gt, rhs)
    }

    #[must_use]
    pub fn equals(self, rhs: Self) -> Self {
        self.binary(BinOp::Eq, rhs)
    }

    #[must_use]
    pub fn over(self, window: Window) -> Self {
        Self::Over(Box::new(self), window)
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNotNull(Box::new(self))
    }

    #[must_use]
    pub fn label(self, alias: &'static str) -> Self {
        match self {
            Self::Labeled(inner, _) => Self::Labeled(inner, alias),
            other => Self::Labeled(Box::new(other), alias),
        }
    }

    /// Name of the result column this expression produces in a select list,
    /// following PostgreSQL's naming of unlabeled columns and calls.
    #[must_use]
    pub fn output_name(&self) -> &'static str {
        match self {
            Self::Labeled(_, alias) => *alias,
            Self::Column(name) | Self::Qualified(_, name) | Self::Func(name, _) => *name,
            Self::Over(inner, _) => inner.output_name(),
            Self::Case { .. } => "case",
            _ => "?column?",
        }
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                self.binary($op, rhs)
            }
        }
    };
}

binary_op!(Add, add, BinOp::Add);
binary_op!(Sub, sub, BinOp::Sub);
binary_op!(Mul, mul, BinOp::Mul);
binary_op!(Div, div, BinOp::Div);
binary_op!(Rem, rem, BinOp::Mod);

/// Comma separated rendering of a slice of expressions.
pub(crate) struct List<'a>(pub &'a [Expr]);

impl fmt::Display for List<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, expr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{expr}")?;
        }
        Ok(())
    }
}

/// Operand of a binary expression, parenthesized when it is itself binary.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            binary @ Expr::Binary(..) => write!(f, "({binary})"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Interval(value) => write!(f, "interval '{}'", value.replace('\'', "''")),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => f.write_str(name),
            Self::Qualified(table, name) => write!(f, "{table}.{name}"),
            Self::Wildcard => f.write_str("*"),
            Self::Param(name) => write!(f, ":{name}"),
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Func(name, args) => write!(f, "{name}({})", List(args)),
            Self::Binary(lhs, op, rhs) => {
                write!(f, "{} {} {}", Operand(lhs), op.symbol(), Operand(rhs))
            }
            Self::Over(inner, window) => write!(f, "{inner} OVER {window}"),
            Self::Case {
                when,
                then,
                otherwise,
            } => write!(f, "CASE WHEN {when} THEN {then} ELSE {otherwise} END"),
            Self::IsNotNull(inner) => write!(f, "{} IS NOT NULL", Operand(inner)),
            Self::Labeled(inner, alias) => write!(f, "{inner} AS {alias}"),
        }
    }
}
