//! Readers for the simulator's result logs and power-trace logs.

pub mod parse;
pub mod power;
pub mod record;

pub use parse::read_record_files;
pub use power::{PowerTrace, max_jump_time, read_power_file};
pub use record::{Field, FieldValue, Record};
