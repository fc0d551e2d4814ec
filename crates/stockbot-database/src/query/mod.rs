//! Query language: expressions sent to the store and the values it returns.

pub mod expr;
pub mod value;

pub use expr::{Expr, Lambda, Pagination};
pub use value::{RefV, Value};
