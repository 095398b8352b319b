pub mod constants;
pub mod diff;

pub use constants::*;
pub use diff::{SetDiff, diff_sets};
