pub mod candidate;
pub mod cost;
pub mod errors;

pub use candidate::*;
pub use cost::*;
pub use errors::*;
