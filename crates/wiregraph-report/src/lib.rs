pub mod check;
pub mod dot;
pub mod json;
pub mod text;

pub use check::{evaluate, CheckOutcome, Stability};
