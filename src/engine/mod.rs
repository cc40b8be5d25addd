pub mod categorize;
pub mod scoring;
pub mod trends;

pub use categorize::*;
pub use scoring::*;
pub use trends::*;
