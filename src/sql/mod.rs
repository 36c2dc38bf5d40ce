//! Minimal SQL representation: typed expressions, select statements and
//! placeholder binding.

pub mod expr;
pub mod params;
pub mod select;

pub use expr::{Expr, Window};
pub use params::{Params, Value};
pub use select::{Select, Source};
