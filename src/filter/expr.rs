//! Typed predicate expressions over patient records
//!
//! Eligibility criteria and derived flags are built as expression trees
//! instead of interpreted strings, so malformed conditions are rejected by
//! [`Expr::validate`] before any record is evaluated.
//!
//! ```
//! use study_measures::filter::expr::{attr, flag, lit};
//!
//! let adult = attr("age").between(18, 110);
//! let alive = flag("died").not();
//! let lowest_quintile = attr("index_of_multiple_deprivation").lt(lit(32844) * lit(1) / lit(5));
//! let criteria = adult.and(alive).and(lowest_quintile);
//! assert!(criteria.validate().is_ok());
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::models::{PatientRecord, Value};

/// Comparison operators; serialized under the names of their builder methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    #[serde(rename = "lte")]
    LtEq,
    Gt,
    #[serde(rename = "gte")]
    GtEq,
}

impl CmpOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::LtEq => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::GtEq => ordering != Ordering::Less,
        }
    }
}

/// Arithmetic operators for boundary expressions such as `32844*2/5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    /// Integer arithmetic truncates; overflow and division by zero give `Null`
    fn apply(self, lhs: &Value, rhs: &Value) -> Value {
        if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
            let result = match self {
                Self::Add => a.checked_add(b),
                Self::Sub => a.checked_sub(b),
                Self::Mul => a.checked_mul(b),
                Self::Div => a.checked_div(b),
            };
            return result.map_or(Value::Null, Value::Int);
        }
        let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
            return Value::Null;
        };
        match self {
            Self::Add => Value::Float(a + b),
            Self::Sub => Value::Float(a - b),
            Self::Mul => Value::Float(a * b),
            Self::Div if b == 0.0 => Value::Null,
            Self::Div => Value::Float(a / b),
        }
    }
}

/// A value-producing term inside a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Attribute of the record
    Attr(String),
    /// Literal value
    Lit(Value),
    /// Arithmetic over two operands
    Arith {
        op: ArithOp,
        lhs: Box<Operand>,
        rhs: Box<Operand>,
    },
}

/// Reference an attribute by name
#[must_use]
pub fn attr(name: &str) -> Operand {
    Operand::Attr(name.to_string())
}

/// Wrap a literal value
#[must_use]
pub fn lit(value: impl Into<Value>) -> Operand {
    Operand::Lit(value.into())
}

/// Truthiness of an attribute
#[must_use]
pub fn flag(name: &str) -> Expr {
    Expr::Flag(name.to_string())
}

impl Operand {
    fn compare(self, op: CmpOp, rhs: impl Into<Self>) -> Expr {
        Expr::Compare {
            op,
            lhs: self,
            rhs: rhs.into(),
        }
    }

    #[must_use]
    pub fn eq(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::Eq, rhs)
    }

    #[must_use]
    pub fn not_eq(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::NotEq, rhs)
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::Lt, rhs)
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::LtEq, rhs)
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::Gt, rhs)
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Self>) -> Expr {
        self.compare(CmpOp::GtEq, rhs)
    }

    /// Inclusive range check
    #[must_use]
    pub fn between(self, low: impl Into<Self>, high: impl Into<Self>) -> Expr {
        self.clone().gte(low).and(self.lte(high))
    }

    /// Half-open range check `low <= self < high`
    #[must_use]
    pub fn within(self, low: impl Into<Self>, high: impl Into<Self>) -> Expr {
        self.clone().gte(low).and(self.lt(high))
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::In {
            operand: self,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn arith(self, op: ArithOp, rhs: Self) -> Self {
        Self::Arith {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate against a record; `owner` names the variable for error reporting
    pub fn evaluate<'a>(&'a self, record: &'a PatientRecord, owner: &str) -> Result<Cow<'a, Value>> {
        match self {
            Self::Attr(name) => record.require(name, owner).map(Cow::Borrowed),
            Self::Lit(value) => Ok(Cow::Borrowed(value)),
            Self::Arith { op, lhs, rhs } => {
                let lhs = lhs.evaluate(record, owner)?;
                let rhs = rhs.evaluate(record, owner)?;
                Ok(Cow::Owned(op.apply(&lhs, &rhs)))
            }
        }
    }

    fn collect_attributes<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Self::Attr(name) => {
                names.insert(name);
            }
            Self::Lit(_) => {}
            Self::Arith { lhs, rhs, .. } => {
                lhs.collect_attributes(names);
                rhs.collect_attributes(names);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let Self::Arith { op, lhs, rhs } = self else {
            return Ok(());
        };
        lhs.validate()?;
        rhs.validate()?;
        for side in [lhs, rhs] {
            if let Self::Lit(Value::Str(s)) = side.as_ref() {
                return Err(StudyError::InvalidExpression(format!(
                    "string literal '{s}' used in arithmetic: {self}"
                )));
            }
        }
        if *op == ArithOp::Div {
            if let Self::Lit(divisor) = rhs.as_ref() {
                if divisor.as_f64() == Some(0.0) {
                    return Err(StudyError::InvalidExpression(format!(
                        "division by zero: {self}"
                    )));
                }
            }
        }
        Ok(())
    }

    const fn literal(&self) -> Option<&Value> {
        match self {
            Self::Lit(value) => Some(value),
            _ => None,
        }
    }
}

macro_rules! literal_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Lit(value.into())
                }
            }
        )*
    };
}

literal_operand!(Value, bool, i32, i64, f64, &str, String);

impl ops::Add for Operand {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.arith(ArithOp::Add, rhs)
    }
}

impl ops::Sub for Operand {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.arith(ArithOp::Sub, rhs)
    }
}

impl ops::Mul for Operand {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.arith(ArithOp::Mul, rhs)
    }
}

impl ops::Div for Operand {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.arith(ArithOp::Div, rhs)
    }
}

/// A boolean condition over a patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Attribute is truthy
    Flag(String),
    /// Comparison between two operands
    Compare { op: CmpOp, lhs: Operand, rhs: Operand },
    /// Operand equals one of the listed values
    In { operand: Operand, values: Vec<Value> },
    /// Logical AND of expressions
    And(Vec<Expr>),
    /// Logical OR of expressions
    Or(Vec<Expr>),
    /// Logical NOT of an expression
    Not(Box<Expr>),
    /// Always evaluates to true
    AlwaysTrue,
    /// Always evaluates to false
    AlwaysFalse,
}

impl Expr {
    /// Conjunction; nested `And`s are flattened
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        match self {
            Self::And(mut exprs) => {
                exprs.push(rhs);
                Self::And(exprs)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }

    /// Disjunction; nested `Or`s are flattened
    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        match self {
            Self::Or(mut exprs) => {
                exprs.push(rhs);
                Self::Or(exprs)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn all(exprs: impl IntoIterator<Item = Self>) -> Self {
        Self::And(exprs.into_iter().collect())
    }

    #[must_use]
    pub fn any(exprs: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(exprs.into_iter().collect())
    }

    /// OR over a list of flags, the shape of most composite outcomes
    #[must_use]
    pub fn any_flag(names: &[&str]) -> Self {
        Self::any(names.iter().map(|name| flag(name)))
    }

    /// Returns the set of all attribute names referenced by this expression
    #[must_use]
    pub fn required_attributes(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Self::Flag(name) => {
                names.insert(name);
            }
            Self::Compare { lhs, rhs, .. } => {
                lhs.collect_attributes(names);
                rhs.collect_attributes(names);
            }
            Self::In { operand, .. } => operand.collect_attributes(names),
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_attributes(names);
                }
            }
            Self::Not(expr) => expr.collect_attributes(names),
            Self::AlwaysTrue | Self::AlwaysFalse => {}
        }
    }

    /// Reject structurally malformed expressions
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Flag(name) if name.trim().is_empty() => Err(StudyError::InvalidExpression(
                "flag with blank attribute name".to_string(),
            )),
            Self::Flag(_) | Self::AlwaysTrue | Self::AlwaysFalse => Ok(()),
            Self::Compare { lhs, rhs, .. } => {
                lhs.validate()?;
                rhs.validate()?;
                if let (Some(a), Some(b)) = (lhs.literal(), rhs.literal()) {
                    if a.as_str().is_some() != b.as_str().is_some() && !a.is_null() && !b.is_null() {
                        return Err(StudyError::InvalidExpression(format!(
                            "comparison between string and number literals: {self}"
                        )));
                    }
                }
                Ok(())
            }
            Self::In { operand, values } => {
                if values.is_empty() {
                    return Err(StudyError::InvalidExpression(format!(
                        "empty value list for {operand}"
                    )));
                }
                operand.validate()
            }
            Self::And(exprs) | Self::Or(exprs) => {
                if exprs.is_empty() {
                    return Err(StudyError::InvalidExpression(
                        "AND/OR with no operands".to_string(),
                    ));
                }
                exprs.iter().try_for_each(Self::validate)
            }
            Self::Not(expr) => expr.validate(),
        }
    }

    /// Evaluate against a record; `owner` names the variable for error reporting
    pub fn evaluate(&self, record: &PatientRecord, owner: &str) -> Result<bool> {
        match self {
            Self::Flag(name) => Ok(record.require(name, owner)?.is_truthy()),
            Self::Compare { op, lhs, rhs } => {
                let lhs = lhs.evaluate(record, owner)?;
                let rhs = rhs.evaluate(record, owner)?;
                Ok(compare_values(*op, &lhs, &rhs))
            }
            Self::In { operand, values } => {
                let value = operand.evaluate(record, owner)?;
                Ok(values.iter().any(|v| compare_values(CmpOp::Eq, &value, v)))
            }
            Self::And(exprs) => {
                for expr in exprs {
                    if !expr.evaluate(record, owner)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(exprs) => {
                for expr in exprs {
                    if expr.evaluate(record, owner)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(expr) => Ok(!expr.evaluate(record, owner)?),
            Self::AlwaysTrue => Ok(true),
            Self::AlwaysFalse => Ok(false),
        }
    }
}

/// Null compares false, except that `!=` holds when exactly one side is null.
/// Strings only order against strings; numbers compare numerically.
#[must_use]
pub fn compare_values(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => false,
        (Value::Null, _) | (_, Value::Null) => op == CmpOp::NotEq,
        (Value::Str(a), Value::Str(b)) => op.holds(a.cmp(b)),
        _ => {
            let ordering = match (lhs.as_i64(), rhs.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => match (lhs.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
            };
            ordering.map_or(op == CmpOp::NotEq, |ordering| op.holds(ordering))
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attr(name) => f.write_str(name),
            Self::Lit(Value::Str(s)) => write!(f, "'{s}'"),
            Self::Lit(Value::Null) => f.write_str("NULL"),
            Self::Lit(value) => write!(f, "{value}"),
            Self::Arith { op, lhs, rhs } => write!(f, "{lhs}{}{rhs}", op.symbol()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, exprs: &[Self], sep: &str| -> fmt::Result {
            f.write_str("(")?;
            for (i, expr) in exprs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{expr}")?;
            }
            f.write_str(")")
        };
        match self {
            Self::Flag(name) => f.write_str(name),
            Self::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Self::In { operand, values } => {
                write!(f, "{operand} IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Operand::Lit(value.clone()))?;
                }
                f.write_str(")")
            }
            Self::And(exprs) => join(f, exprs, "AND"),
            Self::Or(exprs) => join(f, exprs, "OR"),
            Self::Not(expr) => write!(f, "NOT {expr}"),
            Self::AlwaysTrue => f.write_str("TRUE"),
            Self::AlwaysFalse => f.write_str("FALSE"),
        }
    }
}
