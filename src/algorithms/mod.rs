pub mod schedule;


// Re-export the scheduler types
pub use schedule::{Pass, PatternKind, WipeMethod, METHOD_NAMES};
