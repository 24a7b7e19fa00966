//! Boolean criteria over patient records
//!
//! Population criteria, numerator conditions and category rules are all
//! expressed as [`Expr`] trees evaluated against a single record.

pub mod expr;

pub use expr::{ArithOp, CmpOp, Expr, Operand, attr, compare_values, flag, lit};
