//! Safe parser for the literal notation used by the simulator logs.
//!
//! Only data is accepted: numbers, strings, booleans, `None`, tuples, lists
//! and mappings. Nothing is ever evaluated.

pub mod parse;
pub mod value;

pub use parse::{parse_literal, parse_literal_pair};
pub use value::Literal;
